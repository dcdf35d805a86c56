//! Schema Adapters
//!
//! One adapter per known community metadata format. Each adapter turns the raw
//! bytes of an endpoint into [`ReportedNode`]s or rejects the document with
//! [`NotThisSchema`] when its top-level shape does not match.
//!
//! Adapters never fail because of missing or odd node fields: such nodes are
//! reported with the field absent. They hold no state and can be tried in any
//! order, which is what the [detector](crate::detect) relies on.

use std::fmt;
use thiserror::Error;

pub mod meshviewer;
pub mod nodes_json;
pub mod types;

/// A known community metadata format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Format {
    MeshviewerLegacy,
    MeshviewerCurrent,
    NodesV1,
    NodesV2,
}

impl Format {
    pub const ALL: [Format; 4] = [
        Format::MeshviewerLegacy,
        Format::MeshviewerCurrent,
        Format::NodesV1,
        Format::NodesV2,
    ];

    /// Stable name, used in logs and as the `source_type` label value
    pub fn name(self) -> &'static str {
        match self {
            Format::MeshviewerLegacy => "meshviewer-legacy",
            Format::MeshviewerCurrent => "meshviewer-current",
            Format::NodesV1 => "nodes-v1",
            Format::NodesV2 => "nodes-v2",
        }
    }

    /// Attempt to parse a raw document as this format
    pub fn parse(self, raw: &[u8]) -> Result<Vec<ReportedNode>, NotThisSchema> {
        match self {
            Format::MeshviewerLegacy => meshviewer::parse_legacy(raw),
            Format::MeshviewerCurrent => meshviewer::parse_current(raw),
            Format::NodesV1 => nodes_json::parse_v1(raw),
            Format::NodesV2 => nodes_json::parse_v2(raw),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A node as reported by one endpoint, before merging and normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedNode {
    pub node_id: String,
    pub raw_version: Option<String>,
    pub model: Option<String>,
    pub site: Option<String>,
    pub domain: Option<String>,
}

impl ReportedNode {
    /// A node known only by its id and (possibly absent) version
    pub fn new(node_id: impl Into<String>, raw_version: Option<String>) -> Self {
        Self {
            node_id: node_id.into(),
            raw_version,
            model: None,
            site: None,
            domain: None,
        }
    }
}

/// The document's top-level shape does not match the adapter's format
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct NotThisSchema {
    pub reason: String,
}

impl NotThisSchema {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for NotThisSchema {
    fn from(e: serde_json::Error) -> Self {
        Self::new(e.to_string())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
