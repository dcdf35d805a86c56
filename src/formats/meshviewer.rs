//! Meshviewer Adapters
//!
//! Parses `meshviewer.json` exports in both generations. The two share their
//! node entry shape; they differ in where the timestamp lives and, for very old
//! exports, in whether nodes are listed or keyed by id.

use super::types::{
    read_node, JsonObject, LegacyMeshviewerDocument, LegacyNodes, MeshviewerDocument,
    MeshviewerNode,
};
use super::{non_empty, NotThisSchema, ReportedNode};
use tracing::debug;

/// Parse a current meshviewer export (`timestamp`, `nodes`, `links` at the top)
pub fn parse_current(raw: &[u8]) -> Result<Vec<ReportedNode>, NotThisSchema> {
    let document: MeshviewerDocument = serde_json::from_slice(raw)?;
    Ok(collect_nodes(
        document.nodes.into_iter().map(|object| (None, object)),
    ))
}

/// Parse a legacy meshviewer export (`meta.timestamp`, `nodes`, `links`)
pub fn parse_legacy(raw: &[u8]) -> Result<Vec<ReportedNode>, NotThisSchema> {
    let document: LegacyMeshviewerDocument = serde_json::from_slice(raw)?;
    let entries: Vec<(Option<String>, JsonObject)> = match document.nodes {
        LegacyNodes::List(nodes) => nodes.into_iter().map(|object| (None, object)).collect(),
        LegacyNodes::ById(nodes) => nodes
            .into_iter()
            .map(|(id, object)| (Some(id), object))
            .collect(),
    };
    Ok(collect_nodes(entries))
}

/// Reads node entries, preferring flattened fields over the `nodeinfo` block
///
/// The id comes from the map key when the export is keyed by node id.
fn collect_nodes(
    entries: impl IntoIterator<Item = (Option<String>, JsonObject)>,
) -> Vec<ReportedNode> {
    entries
        .into_iter()
        .filter_map(|(key, object)| {
            let node: MeshviewerNode = read_node(object);
            let nodeinfo = node.nodeinfo.unwrap_or_default();

            let node_id = non_empty(key)
                .or_else(|| non_empty(node.node_id))
                .or_else(|| non_empty(nodeinfo.node_id.clone()));
            let Some(node_id) = node_id else {
                debug!("Skipping meshviewer node without node_id");
                return None;
            };

            Some(ReportedNode {
                node_id,
                raw_version: node
                    .firmware
                    .and_then(|f| f.base)
                    .or_else(|| nodeinfo.firmware_base()),
                model: node.model.or_else(|| nodeinfo.model()),
                site: nodeinfo.site_code(),
                domain: node.domain.or_else(|| nodeinfo.domain_code()),
            })
        })
        .collect()
}
