//! Community Aggregation
//!
//! Merges the nodes reported by all endpoints of one community and tallies
//! them by normalized version (plus version class, model, site/domain and
//! source format).
//!
//! # Merge Rules
//!
//! Node ids are only unique within a community. When the same id shows up more
//! than once, the newer record replaces the kept one unless the kept record has
//! a known version and the newer one does not:
//!
//! - a known version always beats a missing one, whichever endpoint came first
//! - between two records of the same kind the later one (configuration order)
//!   wins
//!
//! Every node that survives the merge is counted exactly once in each
//! breakdown, so each breakdown sums to the number of distinct node ids.

use crate::detect::ParsedEndpoint;
use crate::formats::{Format, ReportedNode};
use crate::normalize::{
    classify_version, is_known, normalize_label, normalize_version, VersionClass,
};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// One observed device after normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub community_id: String,
    pub node_id: String,
    pub raw_version: Option<String>,
    pub normalized_version: String,
    pub class: VersionClass,
    pub model: String,
    pub site: String,
    pub domain: String,
    /// Format of the endpoint this record was read from
    pub source: Format,
}

impl NodeRecord {
    pub fn from_reported(community_id: &str, source: Format, node: &ReportedNode) -> Self {
        let normalized_version = normalize_version(node.raw_version.as_deref());
        Self {
            community_id: community_id.to_string(),
            node_id: node.node_id.clone(),
            raw_version: node.raw_version.clone(),
            class: classify_version(&normalized_version),
            normalized_version,
            model: normalize_label(node.model.as_deref()),
            site: normalize_label(node.site.as_deref()),
            domain: normalize_label(node.domain.as_deref()),
            source,
        }
    }

    pub fn has_known_version(&self) -> bool {
        is_known(&self.normalized_version)
    }
}

/// Outcome counts of a community's endpoints for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointHealth {
    pub ok: u64,
    pub fetch_failed: u64,
    pub schema_mismatch: u64,
}

impl EndpointHealth {
    pub fn total(&self) -> u64 {
        self.ok + self.fetch_failed + self.schema_mismatch
    }

    pub fn failed(&self) -> u64 {
        self.fetch_failed + self.schema_mismatch
    }
}

/// Aggregated census of one community
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommunityTally {
    pub community_id: String,
    pub community_label: String,
    /// Distinct nodes per normalized version
    pub version_counts: BTreeMap<String, u64>,
    /// Distinct nodes per classified version
    pub class_counts: BTreeMap<VersionClass, u64>,
    pub model_counts: BTreeMap<String, u64>,
    /// Distinct nodes per `(site, domain)`
    pub domain_counts: BTreeMap<(String, String), u64>,
    pub source_counts: BTreeMap<Format, u64>,
    /// Records dropped because their node id had already been seen
    pub duplicates: u64,
    pub endpoints: EndpointHealth,
}

impl CommunityTally {
    /// A tally without any nodes, as emitted when every endpoint failed
    pub fn empty(community_id: &str, community_label: &str) -> Self {
        Self {
            community_id: community_id.to_string(),
            community_label: community_label.to_string(),
            ..Self::default()
        }
    }

    /// Number of distinct nodes
    pub fn node_count(&self) -> u64 {
        self.version_counts.values().sum()
    }

    /// Distinct nodes not running Gluon or reporting no version
    pub fn alien_count(&self) -> u64 {
        self.class_counts
            .iter()
            .filter(|(class, _)| !class.vtype.is_gluon())
            .map(|(_, count)| count)
            .sum()
    }

    /// At least one endpoint delivered a parsable document
    pub fn is_up(&self) -> bool {
        self.endpoints.ok > 0
    }

    pub fn with_endpoints(mut self, endpoints: EndpointHealth) -> Self {
        self.endpoints = endpoints;
        self
    }

    fn count(&mut self, record: &NodeRecord) {
        *self
            .version_counts
            .entry(record.normalized_version.clone())
            .or_default() += 1;
        *self.class_counts.entry(record.class.clone()).or_default() += 1;
        *self.model_counts.entry(record.model.clone()).or_default() += 1;
        *self
            .domain_counts
            .entry((record.site.clone(), record.domain.clone()))
            .or_default() += 1;
        *self.source_counts.entry(record.source).or_default() += 1;
    }
}

/// Merge all endpoints of one community into one record per node id
///
/// Returns the surviving records keyed by node id and the number of records
/// that were merged away.
pub fn merge_nodes(
    community_id: &str,
    endpoints: &[ParsedEndpoint],
) -> (BTreeMap<String, NodeRecord>, u64) {
    let mut merged: BTreeMap<String, NodeRecord> = BTreeMap::new();
    let mut duplicates = 0;

    for endpoint in endpoints {
        for node in &endpoint.nodes {
            let record = NodeRecord::from_reported(community_id, endpoint.format, node);
            match merged.entry(record.node_id.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
                Entry::Occupied(mut slot) => {
                    duplicates += 1;
                    if record.has_known_version() || !slot.get().has_known_version() {
                        slot.insert(record);
                    }
                }
            }
        }
    }

    (merged, duplicates)
}

/// Build the tally of one community from its successfully parsed endpoints
///
/// `endpoints` must be in configuration order; the merge tie-break depends on
/// it. Endpoint health counts only the given endpoints as `ok`; callers add
/// their failures.
///
/// # Examples
///
/// ```
/// use gluon_census_exporter::aggregate::aggregate;
/// use gluon_census_exporter::detect::ParsedEndpoint;
/// use gluon_census_exporter::formats::{Format, ReportedNode};
///
/// let legacy = ParsedEndpoint {
///     format: Format::MeshviewerLegacy,
///     nodes: vec![ReportedNode::new("n1", None)],
/// };
/// let current = ParsedEndpoint {
///     format: Format::MeshviewerCurrent,
///     nodes: vec![ReportedNode::new("n1", Some("2022.1.1".into()))],
/// };
///
/// let tally = aggregate("c", "Community C", &[legacy, current]);
/// assert_eq!(tally.version_counts.get("2022.1.1"), Some(&1));
/// assert_eq!(tally.node_count(), 1);
/// ```
pub fn aggregate(
    community_id: &str,
    community_label: &str,
    endpoints: &[ParsedEndpoint],
) -> CommunityTally {
    let (merged, duplicates) = merge_nodes(community_id, endpoints);

    let mut tally = CommunityTally::empty(community_id, community_label);
    for record in merged.values() {
        tally.count(record);
    }
    tally.duplicates = duplicates;
    tally.endpoints.ok = endpoints.len() as u64;
    tally
}
