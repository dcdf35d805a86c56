//! Community Metadata Document Definitions
//!
//! Rust struct definitions for the JSON documents served by community map
//! backends (meshviewer, hopglass, yanic and friends).
//!
//! # Design Notes
//!
//! - **Required fields** describe the top-level shape of each format. If one is
//!   missing or has the wrong type, deserialization fails and the format is
//!   rejected as a whole.
//! - **Optional fields** use [`lenient`]: a missing, `null` or wrongly typed
//!   value becomes `None` instead of failing the document. Node data in the
//!   wild is frequently incomplete and must never take the endpoint down.
//! - **Node entries** are kept as raw JSON objects until they are read, so a
//!   node list that contains something other than objects rejects the format
//!   while individual node objects are read field by field.
//!
//! # Formats Covered
//!
//! - `meshviewer.json` (current) → [`MeshviewerDocument`]
//! - `meshviewer.json` (legacy, `meta.timestamp`) → [`LegacyMeshviewerDocument`]
//! - `nodes.json` v1 → [`NodesJsonV1Document`]
//! - `nodes.json` v2 → [`NodesJsonV2Document`]

#![allow(dead_code)] // Timestamps and links only take part in the shape check

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Deserialize an optional field, discarding values that do not fit `T`
pub fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Current meshviewer export
#[derive(Debug, Deserialize)]
pub struct MeshviewerDocument {
    pub timestamp: String,
    pub nodes: Vec<JsonObject>,
    pub links: Vec<JsonObject>,
}

/// Legacy meshviewer export with its timestamp nested under `meta`
#[derive(Debug, Deserialize)]
pub struct LegacyMeshviewerDocument {
    pub meta: LegacyMeta,
    pub nodes: LegacyNodes,
    pub links: Vec<JsonObject>,
}

#[derive(Debug, Deserialize)]
pub struct LegacyMeta {
    pub timestamp: String,
}

/// Older exporters emitted the node list either as an array or keyed by node id
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LegacyNodes {
    List(Vec<JsonObject>),
    ById(BTreeMap<String, JsonObject>),
}

#[derive(Debug, Deserialize)]
pub struct NodesJsonV1Document {
    pub timestamp: String,
    pub version: u64,
    pub nodes: BTreeMap<String, JsonObject>,
}

#[derive(Debug, Deserialize)]
pub struct NodesJsonV2Document {
    pub timestamp: String,
    pub version: u64,
    pub nodes: Vec<JsonObject>,
}

/// A node entry of a meshviewer export
///
/// Current exports flatten node data into the entry; legacy ones still carry
/// the announced `nodeinfo` block, which is used as a fallback.
#[derive(Debug, Default, Deserialize)]
pub struct MeshviewerNode {
    #[serde(default, deserialize_with = "lenient")]
    pub node_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub firmware: Option<Firmware>,
    #[serde(default, deserialize_with = "lenient")]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub domain: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub nodeinfo: Option<NodeInfo>,
}

/// A node entry of a `nodes.json` document
#[derive(Debug, Default, Deserialize)]
pub struct NodesJsonNode {
    #[serde(default, deserialize_with = "lenient")]
    pub nodeinfo: Option<NodeInfo>,
}

/// The `nodeinfo` block as announced by the node itself
#[derive(Debug, Default, Deserialize)]
pub struct NodeInfo {
    #[serde(default, deserialize_with = "lenient")]
    pub node_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub software: Option<Software>,
    #[serde(default, deserialize_with = "lenient")]
    pub hardware: Option<Hardware>,
    #[serde(default, deserialize_with = "lenient")]
    pub system: Option<System>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Software {
    #[serde(default, deserialize_with = "lenient")]
    pub firmware: Option<Firmware>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Firmware {
    #[serde(default, deserialize_with = "lenient")]
    pub base: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Hardware {
    #[serde(default, deserialize_with = "lenient")]
    pub model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct System {
    #[serde(default, deserialize_with = "lenient")]
    pub site_code: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub domain_code: Option<String>,
}

impl NodeInfo {
    pub fn firmware_base(&self) -> Option<String> {
        self.software
            .as_ref()
            .and_then(|s| s.firmware.as_ref())
            .and_then(|f| f.base.clone())
    }

    pub fn model(&self) -> Option<String> {
        self.hardware.as_ref().and_then(|h| h.model.clone())
    }

    pub fn site_code(&self) -> Option<String> {
        self.system.as_ref().and_then(|s| s.site_code.clone())
    }

    pub fn domain_code(&self) -> Option<String> {
        self.system.as_ref().and_then(|s| s.domain_code.clone())
    }
}

/// Read a raw node object into its typed form
///
/// Every field is optional and lenient, so this only falls back to the default
/// for objects serde cannot visit at all.
pub fn read_node<T: DeserializeOwned + Default>(object: JsonObject) -> T {
    serde_json::from_value(serde_json::Value::Object(object)).unwrap_or_default()
}
