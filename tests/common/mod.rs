//! Shared fixtures for integration tests
//!
//! Documents are shaped like real exports, trimmed to the fields the census
//! reads plus a few it ignores.

#![allow(dead_code)] // Not every test file uses every fixture

use gluon_census_exporter::config::{CommunityConfig, CommunityOrigin, EndpointConfig};
use gluon_census_exporter::fetch::{Fetch, FetchError};
use serde_json::{json, Value};
use std::collections::HashMap;

pub const TIMESTAMP: &str = "2024-03-01T12:00:00+0000";

/// `nodes.json` version 2 with one entry per `(node_id, firmware base)`
pub fn nodes_v2(nodes: &[(&str, Option<&str>)]) -> Vec<u8> {
    let nodes: Vec<Value> = nodes
        .iter()
        .map(|(id, base)| {
            let mut nodeinfo = json!({
                "node_id": id,
                "hostname": format!("node-{}", id),
                "hardware": { "model": "TP-Link TL-WR841N/ND v9", "nproc": 1 },
                "system": { "site_code": "ffhh", "domain_code": "ffhh_sued" }
            });
            if let Some(base) = base {
                nodeinfo["software"] = json!({
                    "firmware": { "base": base, "release": "1.4.2" }
                });
            }
            json!({
                "firstseen": TIMESTAMP,
                "lastseen": TIMESTAMP,
                "flags": { "online": true, "gateway": false },
                "nodeinfo": nodeinfo
            })
        })
        .collect();

    serde_json::to_vec(&json!({
        "timestamp": TIMESTAMP,
        "version": 2,
        "nodes": nodes
    }))
    .unwrap()
}

/// `nodes.json` version 1, nodes keyed by id
pub fn nodes_v1(nodes: &[(&str, Option<&str>)]) -> Vec<u8> {
    let nodes: serde_json::Map<String, Value> = nodes
        .iter()
        .map(|(id, base)| {
            let software = match base {
                Some(base) => json!({ "firmware": { "base": base } }),
                None => json!({}),
            };
            (
                id.to_string(),
                json!({
                    "flags": { "online": true },
                    "nodeinfo": { "node_id": id, "software": software }
                }),
            )
        })
        .collect();

    serde_json::to_vec(&json!({
        "timestamp": TIMESTAMP,
        "version": 1,
        "nodes": nodes
    }))
    .unwrap()
}

/// Current meshviewer export
pub fn meshviewer_current(nodes: &[(&str, Option<&str>)]) -> Vec<u8> {
    let nodes: Vec<Value> = nodes
        .iter()
        .map(|(id, base)| {
            let mut node = json!({
                "node_id": id,
                "hostname": format!("node-{}", id),
                "model": "Ubiquiti UniFi AP",
                "domain": "dom1",
                "is_online": true
            });
            if let Some(base) = base {
                node["firmware"] = json!({ "base": base, "release": "2.0" });
            }
            node
        })
        .collect();

    serde_json::to_vec(&json!({
        "timestamp": TIMESTAMP,
        "nodes": nodes,
        "links": [{ "source": "a", "target": "b", "type": "wifi" }]
    }))
    .unwrap()
}

/// Legacy meshviewer export (`meta.timestamp`, nodeinfo blocks)
pub fn meshviewer_legacy(nodes: &[(&str, Option<&str>)]) -> Vec<u8> {
    let nodes: Vec<Value> = nodes
        .iter()
        .map(|(id, base)| {
            let mut nodeinfo = json!({ "node_id": id, "hardware": { "model": "GL.iNet GL-AR150" } });
            if let Some(base) = base {
                nodeinfo["software"] = json!({ "firmware": { "base": base } });
            }
            json!({ "node_id": id, "nodeinfo": nodeinfo })
        })
        .collect();

    serde_json::to_vec(&json!({
        "meta": { "timestamp": TIMESTAMP },
        "nodes": nodes,
        "links": []
    }))
    .unwrap()
}

pub fn community(id: &str, label: &str, urls: &[&str]) -> CommunityConfig {
    CommunityConfig {
        id: id.to_string(),
        label: Some(label.to_string()),
        endpoints: urls.iter().map(|url| EndpointConfig::new(*url)).collect(),
        origin: CommunityOrigin::ConfigFile,
    }
}

/// In-memory fetcher; unknown URLs fail like an unreachable host
#[derive(Debug, Default)]
pub struct FakeFetcher {
    responses: HashMap<String, Result<Vec<u8>, FetchError>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(mut self, url: &str, body: Vec<u8>) -> Self {
        self.responses.insert(url.to_string(), Ok(body));
        self
    }

    pub fn fail(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(
            url.to_string(),
            Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
        );
        self
    }
}

impl Fetch for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.responses.get(url).cloned().unwrap_or_else(|| {
            Err(FetchError::Network {
                url: url.to_string(),
                reason: "unknown host".to_string(),
            })
        })
    }
}
