//! `nodes.json` Adapters
//!
//! Version 1 maps node ids to node objects; version 2 lists node objects and
//! moves the id into `nodeinfo`. Offline nodes in v2 often lack most of their
//! `nodeinfo`, which yields a node without a version rather than an error.

use super::types::{read_node, NodesJsonNode, NodesJsonV1Document, NodesJsonV2Document};
use super::{non_empty, NotThisSchema, ReportedNode};
use tracing::debug;

pub fn parse_v1(raw: &[u8]) -> Result<Vec<ReportedNode>, NotThisSchema> {
    let document: NodesJsonV1Document = serde_json::from_slice(raw)?;
    if document.version != 1 {
        return Err(NotThisSchema::new(format!(
            "expected nodes.json version 1, found {}",
            document.version
        )));
    }

    Ok(document
        .nodes
        .into_iter()
        .filter_map(|(node_id, object)| {
            let Some(node_id) = non_empty(Some(node_id)) else {
                debug!("Skipping nodes.json v1 node with empty id");
                return None;
            };
            let node: NodesJsonNode = read_node(object);
            let nodeinfo = node.nodeinfo.unwrap_or_default();

            // v1 documents only reliably carry the firmware base
            Some(ReportedNode::new(node_id, nodeinfo.firmware_base()))
        })
        .collect())
}

pub fn parse_v2(raw: &[u8]) -> Result<Vec<ReportedNode>, NotThisSchema> {
    let document: NodesJsonV2Document = serde_json::from_slice(raw)?;
    if document.version != 2 {
        return Err(NotThisSchema::new(format!(
            "expected nodes.json version 2, found {}",
            document.version
        )));
    }

    Ok(document
        .nodes
        .into_iter()
        .filter_map(|object| {
            let node: NodesJsonNode = read_node(object);
            let nodeinfo = node.nodeinfo.unwrap_or_default();
            let Some(node_id) = non_empty(nodeinfo.node_id.clone()) else {
                debug!("Skipping nodes.json v2 node without nodeinfo.node_id");
                return None;
            };

            Some(ReportedNode {
                node_id,
                raw_version: nodeinfo.firmware_base(),
                model: nodeinfo.model(),
                site: nodeinfo.site_code(),
                domain: nodeinfo.domain_code(),
            })
        })
        .collect())
}
