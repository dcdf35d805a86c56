//! Format Detection
//!
//! Community metadata documents do not declare their own format reliably, so
//! detection sniffs the content: adapters are tried in a fixed precedence and
//! the first one that accepts the document wins. The precedence depends on what
//! the endpoint claims to serve, which tolerates servers that ship an older or
//! newer generation under the expected file name.

use crate::formats::{Format, NotThisSchema, ReportedNode};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// What an endpoint is declared to serve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    NodesJson,
    Meshviewer,
    #[default]
    Auto,
}

impl EndpointKind {
    /// Infer the kind from the last path segment of a URL
    pub fn from_url(url: &str) -> Self {
        let path = url.split(|c: char| c == '?' || c == '#').next().unwrap_or(url);
        match path.rsplit('/').next() {
            Some("nodes.json") => EndpointKind::NodesJson,
            Some("meshviewer.json") => EndpointKind::Meshviewer,
            _ => EndpointKind::Auto,
        }
    }

    /// Order in which adapters are tried
    pub fn precedence(self) -> [Format; 4] {
        match self {
            EndpointKind::NodesJson => [
                Format::NodesV2,
                Format::NodesV1,
                Format::MeshviewerCurrent,
                Format::MeshviewerLegacy,
            ],
            EndpointKind::Meshviewer => [
                Format::MeshviewerCurrent,
                Format::MeshviewerLegacy,
                Format::NodesV2,
                Format::NodesV1,
            ],
            EndpointKind::Auto => [
                Format::MeshviewerCurrent,
                Format::MeshviewerLegacy,
                Format::NodesV1,
                Format::NodesV2,
            ],
        }
    }
}

/// Nodes of one endpoint together with the format they were parsed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEndpoint {
    pub format: Format,
    pub nodes: Vec<ReportedNode>,
}

/// No known format accepted the document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct SchemaMismatch {
    /// Every adapter tried, in order, with its rejection reason
    pub attempts: Vec<(Format, NotThisSchema)>,
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("no known format matched")?;
        for (i, (format, reason)) in self.attempts.iter().enumerate() {
            let sep = if i == 0 { " (" } else { "; " };
            write!(f, "{}{}: {}", sep, format, reason)?;
        }
        if !self.attempts.is_empty() {
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Detect the format of a raw document and parse it
pub fn detect(raw: &[u8], kind: EndpointKind) -> Result<ParsedEndpoint, SchemaMismatch> {
    let mut attempts = Vec::with_capacity(Format::ALL.len());
    for format in kind.precedence() {
        match format.parse(raw) {
            Ok(nodes) => return Ok(ParsedEndpoint { format, nodes }),
            Err(reason) => attempts.push((format, reason)),
        }
    }
    Err(SchemaMismatch { attempts })
}
