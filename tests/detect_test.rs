//! Format detection tests

mod common;

use common::{meshviewer_current, meshviewer_legacy, nodes_v1, nodes_v2};
use gluon_census_exporter::detect::{detect, EndpointKind};
use gluon_census_exporter::formats::Format;

#[test]
fn test_kind_from_url() {
    // Given: URLs as found in community configurations
    let cases = [
        ("https://map.example.net/data/nodes.json", EndpointKind::NodesJson),
        ("https://map.example.net/data/meshviewer.json", EndpointKind::Meshviewer),
        ("https://map.example.net/data/meshviewer.json?t=1", EndpointKind::Meshviewer),
        ("https://map.example.net/nodes.json#latest", EndpointKind::NodesJson),
        ("https://map.example.net/data/export", EndpointKind::Auto),
        ("https://map.example.net/data/", EndpointKind::Auto),
        ("nodes.json", EndpointKind::NodesJson),
    ];

    for (url, expected) in cases {
        // When: Inferring the kind
        // Then: Only the last path segment decides
        assert_eq!(EndpointKind::from_url(url), expected, "{}", url);
    }
}

#[test]
fn test_every_precedence_covers_all_formats() {
    // Given: All endpoint kinds
    for kind in [EndpointKind::NodesJson, EndpointKind::Meshviewer, EndpointKind::Auto] {
        // When: Sorting their precedence
        let mut formats = kind.precedence().to_vec();
        formats.sort();

        // Then: Every format is tried exactly once
        assert_eq!(formats, Format::ALL.to_vec(), "{:?}", kind);
    }
}

#[test]
fn test_declared_kind_prefers_its_own_formats() {
    // Given: The precedence of the declared kinds
    // Then: The declared family comes first, newest generation first
    assert_eq!(EndpointKind::NodesJson.precedence()[0], Format::NodesV2);
    assert_eq!(EndpointKind::NodesJson.precedence()[1], Format::NodesV1);
    assert_eq!(EndpointKind::Meshviewer.precedence()[0], Format::MeshviewerCurrent);
    assert_eq!(EndpointKind::Meshviewer.precedence()[1], Format::MeshviewerLegacy);
}

#[test]
fn test_detects_each_format_regardless_of_kind() {
    // Given: One fixture per format
    let fixtures = [
        (Format::MeshviewerLegacy, meshviewer_legacy(&[("n1", Some("2020.1"))])),
        (Format::MeshviewerCurrent, meshviewer_current(&[("n1", Some("2020.1"))])),
        (Format::NodesV1, nodes_v1(&[("n1", Some("2020.1"))])),
        (Format::NodesV2, nodes_v2(&[("n1", Some("2020.1"))])),
    ];

    for (expected, raw) in &fixtures {
        for kind in [EndpointKind::NodesJson, EndpointKind::Meshviewer, EndpointKind::Auto] {
            // When: Detecting under any declared kind
            let parsed = detect(raw, kind).expect("known format not detected");

            // Then: The actual format wins, since the formats are disjoint
            assert_eq!(parsed.format, *expected, "{:?}", kind);
            assert_eq!(parsed.nodes.len(), 1);
        }
    }
}

#[test]
fn test_meshviewer_url_serving_nodes_json() {
    // Given: A meshviewer.json URL that actually serves nodes.json v2
    let raw = nodes_v2(&[("n1", Some("2023.1")), ("n2", None)]);
    let kind = EndpointKind::from_url("https://map.example.net/meshviewer.json");

    // When: Detecting
    let parsed = detect(&raw, kind).unwrap();

    // Then: The document is still understood
    assert_eq!(parsed.format, Format::NodesV2);
    assert_eq!(parsed.nodes.len(), 2);
}

#[test]
fn test_unknown_document_lists_every_attempt() {
    // Given: Valid JSON in no known format
    let raw = br#"{"status": "maintenance"}"#;

    // When: Detecting with nodes.json precedence
    let mismatch = detect(raw, EndpointKind::NodesJson).unwrap_err();

    // Then: All four adapters were tried in precedence order
    let tried: Vec<Format> = mismatch.attempts.iter().map(|(f, _)| *f).collect();
    assert_eq!(tried, EndpointKind::NodesJson.precedence().to_vec());

    let message = mismatch.to_string();
    assert!(message.starts_with("no known format matched ("), "{}", message);
    for format in Format::ALL {
        assert!(message.contains(format.name()), "{} missing in {}", format, message);
    }
}

#[test]
fn test_empty_body_is_a_mismatch() {
    // Given: An empty response body
    // When: Detecting
    let result = detect(b"", EndpointKind::Auto);

    // Then: It is a schema mismatch rather than an empty node list
    assert!(result.is_err());
}
