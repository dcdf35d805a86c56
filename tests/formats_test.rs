//! Schema adapter tests
//!
//! Each adapter must accept its own format, reject the others and tolerate
//! incomplete node entries.

mod common;

use common::{meshviewer_current, meshviewer_legacy, nodes_v1, nodes_v2};
use gluon_census_exporter::formats::{meshviewer, nodes_json, Format, ReportedNode};
use serde_json::json;

fn versions(nodes: &[ReportedNode]) -> Vec<(&str, Option<&str>)> {
    let mut versions: Vec<_> = nodes
        .iter()
        .map(|n| (n.node_id.as_str(), n.raw_version.as_deref()))
        .collect();
    versions.sort();
    versions
}

#[test]
fn test_nodes_v2_reads_nodeinfo() {
    // Given: A nodes.json v2 document
    let raw = nodes_v2(&[("a1", Some("2023.1")), ("a2", Some("2023.2"))]);

    // When: Parsing it as v2
    let nodes = nodes_json::parse_v2(&raw).expect("v2 document rejected");

    // Then: Ids and versions come from nodeinfo
    assert_eq!(versions(&nodes), vec![("a1", Some("2023.1")), ("a2", Some("2023.2"))]);
    assert_eq!(nodes[0].model.as_deref(), Some("TP-Link TL-WR841N/ND v9"));
    assert_eq!(nodes[0].site.as_deref(), Some("ffhh"));
    assert_eq!(nodes[0].domain.as_deref(), Some("ffhh_sued"));
}

#[test]
fn test_nodes_v1_uses_map_keys_as_ids() {
    // Given: A nodes.json v1 document keyed by node id
    let raw = nodes_v1(&[("b1", Some("2022.1.4")), ("b2", None)]);

    // When: Parsing it as v1
    let nodes = nodes_json::parse_v1(&raw).expect("v1 document rejected");

    // Then: Every key becomes a node, missing firmware stays absent
    assert_eq!(versions(&nodes), vec![("b1", Some("2022.1.4")), ("b2", None)]);
}

#[test]
fn test_meshviewer_current_reads_flattened_fields() {
    // Given: A current meshviewer export
    let raw = meshviewer_current(&[("c1", Some("v2021.1.2"))]);

    // When: Parsing it
    let nodes = meshviewer::parse_current(&raw).expect("current export rejected");

    // Then: The raw version is passed through untouched
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].node_id, "c1");
    assert_eq!(nodes[0].raw_version.as_deref(), Some("v2021.1.2"));
    assert_eq!(nodes[0].model.as_deref(), Some("Ubiquiti UniFi AP"));
    assert_eq!(nodes[0].domain.as_deref(), Some("dom1"));
}

#[test]
fn test_meshviewer_legacy_falls_back_to_nodeinfo() {
    // Given: A legacy export whose firmware only lives in nodeinfo
    let raw = meshviewer_legacy(&[("d1", Some("2019.1")), ("d2", None)]);

    // When: Parsing it
    let nodes = meshviewer::parse_legacy(&raw).expect("legacy export rejected");

    // Then: Versions and models are read from nodeinfo
    assert_eq!(versions(&nodes), vec![("d1", Some("2019.1")), ("d2", None)]);
    assert!(nodes
        .iter()
        .all(|n| n.model.as_deref() == Some("GL.iNet GL-AR150")));
}

#[test]
fn test_meshviewer_legacy_accepts_nodes_keyed_by_id() {
    // Given: A very old export with an id-keyed node map
    let raw = serde_json::to_vec(&json!({
        "meta": { "timestamp": "2016-01-01T00:00:00" },
        "nodes": {
            "e1": { "nodeinfo": { "software": { "firmware": { "base": "gluon-v2016.1" } } } }
        },
        "links": []
    }))
    .unwrap();

    // When: Parsing it as legacy meshviewer
    let nodes = meshviewer::parse_legacy(&raw).expect("keyed legacy export rejected");

    // Then: The key is the node id
    assert_eq!(versions(&nodes), vec![("e1", Some("gluon-v2016.1"))]);
}

#[test]
fn test_each_adapter_rejects_the_other_formats() {
    // Given: One fixture per format
    let fixtures = [
        (Format::MeshviewerLegacy, meshviewer_legacy(&[("n", Some("1"))])),
        (Format::MeshviewerCurrent, meshviewer_current(&[("n", Some("1"))])),
        (Format::NodesV1, nodes_v1(&[("n", Some("1"))])),
        (Format::NodesV2, nodes_v2(&[("n", Some("1"))])),
    ];

    // When: Running every adapter over every fixture
    for (fixture_format, raw) in &fixtures {
        for format in Format::ALL {
            let result = format.parse(raw);

            // Then: Only the matching adapter accepts
            assert_eq!(
                result.is_ok(),
                format == *fixture_format,
                "{} on a {} document: {:?}",
                format,
                fixture_format,
                result
            );
        }
    }
}

#[test]
fn test_nodes_json_version_mismatch_is_rejected() {
    // Given: A v2-shaped document claiming version 3
    let raw = serde_json::to_vec(&json!({
        "timestamp": "2024-01-01T00:00:00",
        "version": 3,
        "nodes": []
    }))
    .unwrap();

    // When: Parsing it as v2
    let error = nodes_json::parse_v2(&raw).unwrap_err();

    // Then: The reason names the unexpected version
    assert!(error.reason.contains("found 3"), "{}", error);
}

#[test]
fn test_odd_version_fields_become_absent() {
    // Given: Nodes with a numeric, null and nested-wrong firmware base
    let raw = serde_json::to_vec(&json!({
        "timestamp": "2024-01-01T00:00:00",
        "version": 2,
        "nodes": [
            { "nodeinfo": { "node_id": "f1", "software": { "firmware": { "base": 2023 } } } },
            { "nodeinfo": { "node_id": "f2", "software": { "firmware": { "base": null } } } },
            { "nodeinfo": { "node_id": "f3", "software": { "firmware": "2023.1" } } },
            { "nodeinfo": { "node_id": "f4", "software": "none" } }
        ]
    }))
    .unwrap();

    // When: Parsing the document
    let nodes = nodes_json::parse_v2(&raw).expect("document with odd nodes rejected");

    // Then: All nodes are kept without a version
    assert_eq!(nodes.len(), 4);
    assert!(nodes.iter().all(|n| n.raw_version.is_none()));
}

#[test]
fn test_nodes_without_id_are_skipped() {
    // Given: A v2 node without nodeinfo and a meshviewer node without node_id
    let v2 = serde_json::to_vec(&json!({
        "timestamp": "2024-01-01T00:00:00",
        "version": 2,
        "nodes": [
            { "flags": { "online": false } },
            { "nodeinfo": { "node_id": "g1" } }
        ]
    }))
    .unwrap();
    let current = serde_json::to_vec(&json!({
        "timestamp": "2024-01-01T00:00:00",
        "nodes": [ { "hostname": "anonymous" }, { "node_id": "  " } ],
        "links": []
    }))
    .unwrap();

    // When: Parsing both
    let v2_nodes = nodes_json::parse_v2(&v2).unwrap();
    let current_nodes = meshviewer::parse_current(&current).unwrap();

    // Then: Only identifiable nodes are reported
    assert_eq!(v2_nodes, vec![ReportedNode::new("g1", None)]);
    assert!(current_nodes.is_empty());
}

#[test]
fn test_non_json_is_rejected_by_every_adapter() {
    // Given: An HTML error page served with status 200
    let raw = b"<html><body>502 Bad Gateway</body></html>";

    // When / Then: No adapter accepts it
    for format in Format::ALL {
        assert!(format.parse(raw).is_err(), "{} accepted HTML", format);
    }
}
