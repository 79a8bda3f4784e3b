//! Resolved, per-request pipeline types.
//!
//! An [`ExecutionPlan`] is computed fresh for every request (or served from a
//! cache keyed on the tenant's enabled-set version) and never persisted.
//!
//! ```text
//! pre filters (ascending level) ──► handler ──► post filters (ascending level)
//! ```

use super::descriptor::{FilterType, RouteFilter, RouteHandler};
use serde::Serialize;

/// Level assumed for handlers that do not declare one.
///
/// Filters below this level run before the handler, filters at or above it
/// run after.
pub const DEFAULT_HANDLER_LEVEL: u8 = 30;

/// Where an entry sits relative to the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Pre,
    Handler,
    Post,
}

/// The matched route an entry invokes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntryKind {
    Handler(RouteHandler),
    Filter(RouteFilter),
}

/// One unit of work in a tenant pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineEntry {
    pub module_id: String,
    pub kind: EntryKind,
    pub level: u8,
    pub phase: Phase,
}

impl PipelineEntry {
    pub fn handler(module_id: impl Into<String>, handler: RouteHandler) -> Self {
        Self {
            module_id: module_id.into(),
            level: handler.effective_level(),
            kind: EntryKind::Handler(handler),
            phase: Phase::Handler,
        }
    }

    pub fn filter(module_id: impl Into<String>, filter: RouteFilter, phase: Phase) -> Self {
        Self {
            module_id: module_id.into(),
            level: filter.level,
            kind: EntryKind::Filter(filter),
            phase,
        }
    }

    /// Execution semantics; handlers always behave as `request-response`.
    pub fn filter_type(&self) -> FilterType {
        match &self.kind {
            EntryKind::Handler(_) => FilterType::RequestResponse,
            EntryKind::Filter(f) => f.filter_type,
        }
    }

    pub fn is_handler(&self) -> bool {
        matches!(self.kind, EntryKind::Handler(_))
    }

    /// Target operation name, for handlers that declare one.
    pub fn operation(&self) -> Option<&str> {
        match &self.kind {
            EntryKind::Handler(h) => h.operation.as_deref(),
            EntryKind::Filter(_) => None,
        }
    }
}

/// Ordered sequence of entries: pre filters, exactly one handler, post filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    entries: Vec<PipelineEntry>,
}

impl ExecutionPlan {
    /// Assemble a plan from already-sorted partitions.
    pub fn new(pre: Vec<PipelineEntry>, handler: PipelineEntry, post: Vec<PipelineEntry>) -> Self {
        let mut entries = pre;
        entries.reserve(post.len() + 1);
        entries.push(handler);
        entries.extend(post);
        Self { entries }
    }

    pub fn entries(&self) -> &[PipelineEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &PipelineEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn handler(&self) -> Option<&PipelineEntry> {
        self.entries.iter().find(|e| e.is_handler())
    }

    pub fn pre(&self) -> impl Iterator<Item = &PipelineEntry> {
        self.entries.iter().filter(|e| e.phase == Phase::Pre)
    }

    pub fn post(&self) -> impl Iterator<Item = &PipelineEntry> {
        self.entries.iter().filter(|e| e.phase == Phase::Post)
    }
}
