//! Prometheus Metrics Definitions
//!
//! This module defines the metric families of the census and renders a set of
//! [`CommunityTally`] values into the Prometheus text exposition format.
//!
//! # Metric Families
//!
//! ## Node Counts
//! - `gluon_nodes_total{community, version}` - distinct nodes per firmware version
//! - `gluon_base_total{community, base, version, vtype}` - distinct Gluon nodes
//!   per classified version
//! - `gluon_alien_total{community, version, vtype}` - distinct nodes that run
//!   something else or report no version
//! - `gluon_model_total{community, model}` - distinct nodes per hardware model
//! - `gluon_domain_total{community, site, domain}` - distinct nodes per site/domain
//! - `gluon_source_total{community, source_type}` - distinct nodes per source format
//!
//! ## Community State
//! - `gluon_community_info{community, name}` - always 1, carries the display name
//! - `gluon_community_up{community}` - 1 if at least one endpoint parsed, else 0
//! - `gluon_community_endpoints{community, state}` - endpoints per outcome
//!   (`ok`, `fetch_failed`, `schema_mismatch`)
//!
//! # Output Guarantees
//!
//! Node-count series only exist for counts above zero; a community whose
//! endpoints all failed shows up through the community state families alone.
//! Families are ordered by name and samples by label values, independent of
//! the order tallies are recorded in. Rendering the same tallies always yields
//! the same bytes.

use crate::aggregate::CommunityTally;
use crate::error::{ExporterError, Result};
use prometheus::{Encoder, IntGaugeVec, Opts, Registry, TextEncoder};

const NAMESPACE: &str = "gluon";

/// Metric families of one census snapshot
pub struct CensusMetrics {
    registry: Registry,

    // Node counts
    pub nodes_total: IntGaugeVec,
    pub base_total: IntGaugeVec,
    pub alien_total: IntGaugeVec,
    pub model_total: IntGaugeVec,
    pub domain_total: IntGaugeVec,
    pub source_total: IntGaugeVec,

    // Community state
    pub community_info: IntGaugeVec,
    pub community_up: IntGaugeVec,
    pub community_endpoints: IntGaugeVec,
}

impl CensusMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let nodes_total = IntGaugeVec::new(
            Opts::new(
                "nodes_total",
                "Number of unique nodes running a certain firmware version",
            )
            .namespace(NAMESPACE),
            &["community", "version"],
        )?;

        let base_total = IntGaugeVec::new(
            Opts::new(
                "base_total",
                "Number of unique nodes running on a certain Gluon base version",
            )
            .namespace(NAMESPACE),
            &["community", "base", "version", "vtype"],
        )?;

        let alien_total = IntGaugeVec::new(
            Opts::new(
                "alien_total",
                "Number of unique nodes running on a non-Gluon version",
            )
            .namespace(NAMESPACE),
            &["community", "version", "vtype"],
        )?;

        let model_total = IntGaugeVec::new(
            Opts::new(
                "model_total",
                "Number of unique nodes using a certain device model",
            )
            .namespace(NAMESPACE),
            &["community", "model"],
        )?;

        let domain_total = IntGaugeVec::new(
            Opts::new(
                "domain_total",
                "Number of unique nodes on a specific site and domain",
            )
            .namespace(NAMESPACE),
            &["community", "site", "domain"],
        )?;

        let source_total = IntGaugeVec::new(
            Opts::new(
                "source_total",
                "Number of unique nodes read from a specific source format",
            )
            .namespace(NAMESPACE),
            &["community", "source_type"],
        )?;

        let community_info = IntGaugeVec::new(
            Opts::new(
                "community_info",
                "Configured community (value is always 1)",
            )
            .namespace(NAMESPACE),
            &["community", "name"],
        )?;

        let community_up = IntGaugeVec::new(
            Opts::new(
                "community_up",
                "Whether any endpoint of the community delivered data (1=up, 0=down)",
            )
            .namespace(NAMESPACE),
            &["community"],
        )?;

        let community_endpoints = IntGaugeVec::new(
            Opts::new(
                "community_endpoints",
                "Number of community endpoints per outcome of the last run",
            )
            .namespace(NAMESPACE),
            &["community", "state"],
        )?;

        // Register all metrics
        registry.register(Box::new(nodes_total.clone()))?;
        registry.register(Box::new(base_total.clone()))?;
        registry.register(Box::new(alien_total.clone()))?;
        registry.register(Box::new(model_total.clone()))?;
        registry.register(Box::new(domain_total.clone()))?;
        registry.register(Box::new(source_total.clone()))?;
        registry.register(Box::new(community_info.clone()))?;
        registry.register(Box::new(community_up.clone()))?;
        registry.register(Box::new(community_endpoints.clone()))?;

        Ok(Self {
            registry,
            nodes_total,
            base_total,
            alien_total,
            model_total,
            domain_total,
            source_total,
            community_info,
            community_up,
            community_endpoints,
        })
    }

    /// Set all series of one community
    pub fn record(&self, tally: &CommunityTally) {
        let community = tally.community_id.as_str();

        for (version, count) in &tally.version_counts {
            set_count(&self.nodes_total, &[community, version.as_str()], *count);
        }
        for (class, count) in &tally.class_counts {
            let (version, vtype) = (class.version.as_str(), class.vtype.as_str());
            if class.vtype.is_gluon() {
                set_count(
                    &self.base_total,
                    &[community, class.base.as_str(), version, vtype],
                    *count,
                );
            } else {
                set_count(&self.alien_total, &[community, version, vtype], *count);
            }
        }
        for (model, count) in &tally.model_counts {
            set_count(&self.model_total, &[community, model.as_str()], *count);
        }
        for ((site, domain), count) in &tally.domain_counts {
            set_count(
                &self.domain_total,
                &[community, site.as_str(), domain.as_str()],
                *count,
            );
        }
        for (source, count) in &tally.source_counts {
            set_count(&self.source_total, &[community, source.name()], *count);
        }

        self.community_info
            .with_label_values(&[community, tally.community_label.as_str()])
            .set(1);
        self.community_up
            .with_label_values(&[community])
            .set(i64::from(tally.is_up()));

        let endpoints = &tally.endpoints;
        for (state, count) in [
            ("ok", endpoints.ok),
            ("fetch_failed", endpoints.fetch_failed),
            ("schema_mismatch", endpoints.schema_mismatch),
        ] {
            self.community_endpoints
                .with_label_values(&[community, state])
                .set(count as i64);
        }
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| ExporterError::Render(e.to_string()))
    }
}

/// Zero counts are never exported as series
fn set_count(vec: &IntGaugeVec, labels: &[&str], count: u64) {
    if count > 0 {
        vec.with_label_values(labels).set(count as i64);
    }
}

/// Render a complete census snapshot
///
/// Builds a fresh registry for every call, so the output depends on `tallies`
/// alone.
pub fn render(tallies: &[CommunityTally]) -> Result<String> {
    let metrics = CensusMetrics::new()?;
    for tally in tallies {
        metrics.record(tally);
    }
    metrics.render()
}
