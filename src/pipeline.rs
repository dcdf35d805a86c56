//! Census Pipeline
//!
//! Runs one census over all configured communities:
//!
//! 1. Fetch every endpoint concurrently (bounded) and wait for all of them
//! 2. Detect and parse each document
//! 3. Aggregate the parsed endpoints per community
//! 4. Hand the tallies to the [exposition writer](crate::metrics)
//!
//! # Error Handling
//!
//! Endpoint failures are non-fatal: they are logged as warnings, counted in the
//! community's [`EndpointHealth`] and the endpoint is left out of the tally. A
//! community whose endpoints all failed is still reported. Only rendering can
//! fail a run.

use crate::aggregate::{aggregate, CommunityTally, EndpointHealth};
use crate::config::{CommunityConfig, Config};
use crate::detect::{detect, ParsedEndpoint, SchemaMismatch};
use crate::error::Result;
use crate::fetch::{Fetch, FetchError, HttpFetcher};
use crate::metrics;
use futures_util::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{error, info, warn};

/// Why an endpoint was left out of its community's tally
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointFailure {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("schema mismatch: {0}")]
    Schema(#[from] SchemaMismatch),
}

/// A skipped endpoint, kept for diagnostics
#[derive(Debug, Clone)]
pub struct SkippedEndpoint {
    pub community_id: String,
    pub url: String,
    pub failure: EndpointFailure,
}

/// Totals of one run, logged after the census
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub communities: usize,
    pub communities_up: usize,
    pub endpoints_ok: u64,
    pub endpoints_failed: u64,
    pub unique_nodes: u64,
    pub alien_nodes: u64,
    pub duplicates: u64,
}

/// Result of one census run
#[derive(Debug, Clone)]
pub struct CensusReport {
    /// One tally per configured community, in configuration order
    pub tallies: Vec<CommunityTally>,
    pub skipped: Vec<SkippedEndpoint>,
}

impl CensusReport {
    /// Render the snapshot in Prometheus text format
    pub fn render(&self) -> Result<String> {
        metrics::render(&self.tallies)
    }

    pub fn summary(&self) -> RunSummary {
        self.tallies
            .iter()
            .fold(RunSummary::default(), |mut summary, tally| {
                summary.communities += 1;
                summary.communities_up += usize::from(tally.is_up());
                summary.endpoints_ok += tally.endpoints.ok;
                summary.endpoints_failed += tally.endpoints.failed();
                summary.unique_nodes += tally.node_count();
                summary.alien_nodes += tally.alien_count();
                summary.duplicates += tally.duplicates;
                summary
            })
    }

    /// Communities whose breakdowns do not add up to their node count
    ///
    /// Always empty unless aggregation is broken.
    pub fn count_mismatches(&self) -> Vec<&str> {
        self.tallies
            .iter()
            .filter(|tally| {
                let nodes = tally.node_count();
                tally.class_counts.values().sum::<u64>() != nodes
                    || tally.model_counts.values().sum::<u64>() != nodes
                    || tally.domain_counts.values().sum::<u64>() != nodes
                    || tally.source_counts.values().sum::<u64>() != nodes
            })
            .map(|tally| tally.community_id.as_str())
            .collect()
    }

    pub fn log_summary(&self) {
        let summary = self.summary();
        info!(
            "Census finished: {}/{} communities up, {} endpoints ok, {} failed",
            summary.communities_up,
            summary.communities,
            summary.endpoints_ok,
            summary.endpoints_failed
        );
        info!(
            "Summary: {} unique nodes ({} alien), {} duplicates merged",
            summary.unique_nodes, summary.alien_nodes, summary.duplicates
        );

        for community in self.count_mismatches() {
            error!("Node count mismatch in community {}", community);
        }
    }
}

/// Runs censuses with a given fetcher
pub struct Census<F> {
    fetcher: F,
    concurrency: usize,
}

impl Census<HttpFetcher> {
    /// Census over HTTP, configured from `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            HttpFetcher::new(&config.http)?,
            config.census.concurrency,
        ))
    }
}

impl<F: Fetch> Census<F> {
    pub fn new(fetcher: F, concurrency: usize) -> Self {
        Self {
            fetcher,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn run(&self, communities: &[CommunityConfig]) -> CensusReport {
        info!("Collecting census from {} communities", communities.len());

        let requests: Vec<_> = communities
            .iter()
            .flat_map(|c| c.endpoints.iter())
            .map(|endpoint| self.fetcher.fetch(&endpoint.url))
            .collect();

        // Every fetch completes before anything is aggregated, so the snapshot
        // is consistent.
        let fetched: Vec<_> = stream::iter(requests)
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut fetched = fetched.into_iter();
        let mut tallies = Vec::with_capacity(communities.len());
        let mut skipped = Vec::new();

        for community in communities {
            let mut parsed: Vec<ParsedEndpoint> =
                Vec::with_capacity(community.endpoints.len());
            let mut health = EndpointHealth::default();

            for (endpoint, body) in community.endpoints.iter().zip(fetched.by_ref()) {
                let outcome = body.map_err(EndpointFailure::from).and_then(|raw| {
                    detect(&raw, endpoint.kind()).map_err(EndpointFailure::from)
                });

                match outcome {
                    Ok(document) => {
                        info!(
                            "Processing {} ({}, {} nodes) for {}",
                            endpoint.url,
                            document.format,
                            document.nodes.len(),
                            community.id
                        );
                        health.ok += 1;
                        parsed.push(document);
                    }
                    Err(failure) => {
                        warn!(
                            "Skipping endpoint {} of {}: {}",
                            endpoint.url, community.id, failure
                        );
                        match failure {
                            EndpointFailure::Fetch(_) => health.fetch_failed += 1,
                            EndpointFailure::Schema(_) => health.schema_mismatch += 1,
                        }
                        skipped.push(SkippedEndpoint {
                            community_id: community.id.clone(),
                            url: endpoint.url.clone(),
                            failure,
                        });
                    }
                }
            }

            let tally =
                aggregate(&community.id, community.label(), &parsed).with_endpoints(health);
            if community.endpoints.is_empty() {
                warn!("Community {} has no endpoints, reporting it down", community.id);
            } else if !tally.is_up() {
                warn!(
                    "All {} endpoints of community {} failed",
                    health.total(),
                    community.id
                );
            }
            tallies.push(tally);
        }

        CensusReport { tallies, skipped }
    }
}
