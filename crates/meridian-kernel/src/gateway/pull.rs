//! Catalog reconciliation ("pull") request types.
//!
//! ```text
//! SelectingEndpoint ─┬─► Diffing ──► Inserting ──► Done
//!        ▲   │       │
//!        └───┘       └─► Failed
//! (next candidate)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered candidate base URLs of remote registries.  Lives for one pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullDescriptor {
    pub urls: Vec<String>,
}

impl PullDescriptor {
    pub fn new(urls: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
        }
    }
}

/// States of one pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullPhase {
    SelectingEndpoint,
    Diffing,
    Inserting,
    Done,
    Failed,
}

impl fmt::Display for PullPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PullPhase::SelectingEndpoint => "selecting-endpoint",
            PullPhase::Diffing => "diffing",
            PullPhase::Inserting => "inserting",
            PullPhase::Done => "done",
            PullPhase::Failed => "failed",
        })
    }
}

/// Join a registry base URL and a path suffix with exactly one `/`.
pub fn join_url(base: &str, suffix: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        suffix.trim_start_matches('/')
    )
}
