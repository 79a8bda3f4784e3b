//! Catalog reconciliation against a remote registry.
//!
//! A pull walks the candidate URLs in order and adopts the first one whose
//! version probe answers, fetches that registry's full catalog, and inserts
//! every module the local catalog lacks as one batch.

use crate::error::{GatewayImplError, GatewayResult};
use crate::modules::ModuleManager;
use meridian_kernel::gateway::pull::join_url;
use meridian_kernel::gateway::{
    GatewayError, ModuleBrief, ModuleDescriptor, ModuleFilter, PullDescriptor, PullPhase,
};
use reqwest::{Client, StatusCode};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const VERSION_PATH: &str = "_/version";
const MODULES_PATH: &str = "_/proxy/modules?full=true";

pub struct PullManager {
    client: Client,
    modules: Arc<ModuleManager>,
    probe_timeout: Duration,
}

impl PullManager {
    pub fn new(client: Client, modules: Arc<ModuleManager>, probe_timeout: Duration) -> Self {
        Self {
            client,
            modules,
            probe_timeout,
        }
    }

    /// Run one pull.  Returns the brief form of every module added.
    #[instrument(skip_all, fields(candidates = descriptor.urls.len()))]
    pub async fn pull(&self, descriptor: &PullDescriptor) -> GatewayResult<Vec<ModuleBrief>> {
        let base = self.select_endpoint(&descriptor.urls).await?;

        debug!(phase = %PullPhase::Diffing, url = %base);
        let remote = self.fetch_catalog(&base).await.inspect_err(|e| {
            warn!(phase = %PullPhase::Failed, url = %base, error = %e, "remote catalog fetch failed");
        })?;
        let local = self.modules.list(&ModuleFilter::default()).await?;
        let candidates = pull_candidates(&local, remote);
        info!(phase = %PullPhase::Inserting, count = candidates.len(), "modules to insert");

        let briefs = candidates.iter().map(ModuleDescriptor::brief).collect();
        self.modules.create_list(candidates, true).await?;
        debug!(phase = %PullPhase::Done);
        Ok(briefs)
    }

    /// First candidate whose version probe answers 200 or 202.
    async fn select_endpoint(&self, urls: &[String]) -> GatewayResult<String> {
        for url in urls {
            debug!(phase = %PullPhase::SelectingEndpoint, url = %url, "probing");
            match self.probe(url).await {
                Ok(version) => {
                    info!(url = %url, version = %version, "remote registry selected");
                    return Ok(url.clone());
                }
                Err(message) => warn!(url = %url, error = %message, "registry candidate skipped"),
            }
        }
        warn!(phase = %PullPhase::Failed, "no registry candidate reachable");
        Err(GatewayError::NoRemoteReachable(urls.len()).into())
    }

    async fn probe(&self, base: &str) -> Result<String, String> {
        let resp = self
            .client
            .get(join_url(base, VERSION_PATH))
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let status = resp.status();
        if !accepted(status) {
            return Err(format!("version probe returned {status}"));
        }
        let version = resp.text().await.map_err(|e| e.to_string())?;
        Ok(version.trim().to_string())
    }

    async fn fetch_catalog(&self, base: &str) -> GatewayResult<Vec<ModuleDescriptor>> {
        let url = join_url(base, MODULES_PATH);
        let remote = |message: String| GatewayImplError::Remote {
            url: url.clone(),
            message,
        };
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| remote(e.to_string()))?;
        let status = resp.status();
        if !accepted(status) {
            return Err(remote(format!("module list returned {status}")));
        }
        resp.json::<Vec<ModuleDescriptor>>()
            .await
            .map_err(|e| remote(format!("malformed module list: {e}")))
    }
}

fn accepted(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::ACCEPTED
}

/// Remote modules worth inserting: not the gateway's own product and not
/// already present locally.
pub fn pull_candidates(
    local: &[ModuleDescriptor],
    remote: Vec<ModuleDescriptor>,
) -> Vec<ModuleDescriptor> {
    let known: HashSet<&str> = local.iter().map(|md| md.id.as_str()).collect();
    let mut seen = HashSet::new();
    remote
        .into_iter()
        .filter(|md| !md.is_gateway_module() && !known.contains(md.id.as_str()))
        .filter(|md| seen.insert(md.id.clone()))
        .collect()
}
