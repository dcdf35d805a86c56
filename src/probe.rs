//! Endpoint Probe
//!
//! Map backends usually publish `nodes.json` and `meshviewer.json` side by
//! side. For every configured endpoint pointing at one of them, the probe
//! checks whether `nodes.json` is served next to it and falls back to
//! `meshviewer.json` otherwise. The result is a suggestion; configuration is
//! only rewritten on request, and only the communities that came from a legacy
//! `communities.json` are written back.

use crate::config::{from_legacy_file, CommunityConfig, EndpointConfig};
use crate::fetch::Fetch;
use tracing::{debug, info, warn};

const NODES_JSON: &str = "nodes.json";
const MESHVIEWER_JSON: &str = "meshviewer.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    /// `nodes.json` is available
    NodesJson,
    /// Only `meshviewer.json` is available
    MeshviewerFallback,
    /// Neither file could be fetched; the URL is kept
    Unreachable,
    /// The URL does not end in a known file name; the URL is kept
    Unsupported,
}

impl ProbeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProbeStatus::NodesJson => "nodes.json",
            ProbeStatus::MeshviewerFallback => "meshviewer.json",
            ProbeStatus::Unreachable => "unreachable",
            ProbeStatus::Unsupported => "unsupported",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub community_id: String,
    pub original: String,
    pub suggested: String,
    pub status: ProbeStatus,
}

/// Replace the file name of a `nodes.json`/`meshviewer.json` URL
pub fn sibling_url(url: &str, file: &str) -> Option<String> {
    let (base, last) = url.rsplit_once('/')?;
    matches!(last, NODES_JSON | MESHVIEWER_JSON).then(|| format!("{}/{}", base, file))
}

/// Probe every endpoint, in configuration order
pub async fn probe<F: Fetch>(fetcher: &F, communities: &[CommunityConfig]) -> Vec<ProbeResult> {
    let mut results = Vec::new();
    for community in communities {
        for endpoint in &community.endpoints {
            results.push(probe_endpoint(fetcher, &community.id, &endpoint.url).await);
        }
    }
    results
}

async fn probe_endpoint<F: Fetch>(fetcher: &F, community_id: &str, url: &str) -> ProbeResult {
    let result = |suggested: String, status| ProbeResult {
        community_id: community_id.to_string(),
        original: url.to_string(),
        suggested,
        status,
    };

    let (Some(nodes_url), Some(meshviewer_url)) = (
        sibling_url(url, NODES_JSON),
        sibling_url(url, MESHVIEWER_JSON),
    ) else {
        info!(
            "{}: The URL doesn't contain a supported filename, skipping {}",
            community_id, url
        );
        return result(url.to_string(), ProbeStatus::Unsupported);
    };

    match fetcher.fetch(&nodes_url).await {
        Ok(_) => return result(nodes_url, ProbeStatus::NodesJson),
        Err(e) => debug!("{}: nodes.json not available: {}", community_id, e),
    }

    match fetcher.fetch(&meshviewer_url).await {
        Ok(_) => result(meshviewer_url, ProbeStatus::MeshviewerFallback),
        Err(e) => {
            warn!("{}: neither file is reachable: {}", community_id, e);
            result(url.to_string(), ProbeStatus::Unreachable)
        }
    }
}

/// Communities with every endpoint replaced by its suggestion
///
/// `results` must come from [`probe`] over the same communities.
pub fn apply(communities: &[CommunityConfig], results: &[ProbeResult]) -> Vec<CommunityConfig> {
    let mut results = results.iter();
    communities
        .iter()
        .map(|community| CommunityConfig {
            endpoints: community
                .endpoints
                .iter()
                .map(|endpoint| match results.next() {
                    Some(probed) if probed.suggested != endpoint.url => {
                        EndpointConfig::new(probed.suggested.clone())
                    }
                    _ => endpoint.clone(),
                })
                .collect(),
            ..community.clone()
        })
        .collect()
}

/// Legacy-file communities with the probe results applied, in file order
///
/// Communities from the TOML configuration are left out, so the written file
/// can be loaded next to that configuration again.
pub fn rewrite_legacy(
    communities: &[CommunityConfig],
    results: &[ProbeResult],
) -> Vec<CommunityConfig> {
    from_legacy_file(&apply(communities, results))
}
