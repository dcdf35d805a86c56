//! Field Normalization
//!
//! Canonicalizes the free-form strings nodes report about themselves before they
//! become Prometheus label values.
//!
//! # Rules
//!
//! - Versions are trimmed and a leading `v`/`V` is dropped when what follows is a
//!   version token (`v2023.1` → `2023.1`). Anything else is kept byte-identical:
//!   the exporter reports literal adoption, not a semantic ordering.
//! - Descriptive labels (model, site, domain) get their whitespace runs collapsed.
//! - Missing, empty or unparsable input becomes [`UNKNOWN`], so every series has
//!   a legal, non-empty label value. A node that literally reports `unknown` is
//!   treated the same way: the value carries no information, so it is counted
//!   under the sentinel and loses merges against a real version.
//! - [`classify_version`] sorts a normalized version into a [`VersionType`] and
//!   derives the Gluon base release it was built from.
//!
//! All functions are pure; the normalizers are idempotent.

use regex::Regex;
use std::sync::LazyLock;

/// Label value used when a field is absent or cannot be interpreted
pub const UNKNOWN: &str = "unknown";

/// Label value of the base and version of unclassifiable nodes
pub const UNDEFINED: &str = "undefined";

static VERSION_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d[0-9A-Za-z]*(?:[.\-+~_][0-9A-Za-z]+)*$").expect("invalid version token regex")
});

/// Normalize a reported firmware version
///
/// # Examples
///
/// ```
/// use gluon_census_exporter::normalize::{normalize_version, UNKNOWN};
///
/// assert_eq!(normalize_version(Some(" v2023.1.2 ")), "2023.1.2");
/// assert_eq!(normalize_version(Some("gluon-v2023.1")), "gluon-v2023.1");
/// assert_eq!(normalize_version(Some("   ")), UNKNOWN);
/// assert_eq!(normalize_version(None), UNKNOWN);
/// ```
pub fn normalize_version(raw: Option<&str>) -> String {
    let Some(trimmed) = raw.map(str::trim) else {
        return UNKNOWN.to_string();
    };
    if trimmed.is_empty() || trimmed.chars().any(char::is_control) {
        return UNKNOWN.to_string();
    }

    if let Some(rest) = trimmed.strip_prefix(|c: char| c == 'v' || c == 'V') {
        if VERSION_TOKEN.is_match(rest) {
            return rest.to_string();
        }
    }

    trimmed.to_string()
}

/// Normalize a descriptive label such as a hardware model or domain code
pub fn normalize_label(raw: Option<&str>) -> String {
    let collapsed = raw
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();

    if collapsed.is_empty() || collapsed.chars().any(char::is_control) {
        UNKNOWN.to_string()
    } else {
        collapsed
    }
}

/// Whether a normalized value carries real information
pub fn is_known(normalized: &str) -> bool {
    normalized != UNKNOWN
}

static GLUON_RELEASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<base>gluon-v[0-9]{4}\.[0-9](?:\.[0-9])?)(?P<build>-[0-9]+)?")
        .expect("invalid gluon release regex")
});

static GLUON_COMMIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^gluon-[0-9a-f]{7,}$").expect("invalid gluon commit regex"));

/// Kind of firmware a version string identifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VersionType {
    /// A Gluon release such as `gluon-v2023.1.2`
    GluonBase,
    /// Gluon built without release information
    GluonUnknown,
    /// Gluon built from a commit (`gluon-<hash>`)
    GluonCommitId,
    /// Any other `gluon-` version
    GluonCustom,
    /// Not Gluon at all
    Foreign,
    /// No version reported
    Undefined,
}

impl VersionType {
    pub fn as_str(self) -> &'static str {
        match self {
            VersionType::GluonBase => "gluon-base",
            VersionType::GluonUnknown => "gluon-unknown",
            VersionType::GluonCommitId => "gluon-commitid",
            VersionType::GluonCustom => "gluon-custom",
            VersionType::Foreign => "foreign",
            VersionType::Undefined => "undefined",
        }
    }

    /// Foreign and undefined nodes are reported as aliens
    pub fn is_gluon(self) -> bool {
        !matches!(self, VersionType::Foreign | VersionType::Undefined)
    }
}

/// Classified firmware version of one node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionClass {
    /// Version as exported; Gluon releases are cut after the build number
    pub version: String,
    /// Release the version is based on
    pub base: String,
    pub vtype: VersionType,
}

/// Classify a version as returned by [`normalize_version`]
///
/// # Examples
///
/// ```
/// use gluon_census_exporter::normalize::{classify_version, VersionType};
///
/// let class = classify_version("gluon-v2023.1.2-3-g1a2b3c4");
/// assert_eq!(class.version, "gluon-v2023.1.2-3");
/// assert_eq!(class.base, "gluon-v2023.1.2");
/// assert_eq!(class.vtype, VersionType::GluonBase);
/// ```
pub fn classify_version(normalized: &str) -> VersionClass {
    let class = |version: &str, base: &str, vtype| VersionClass {
        version: version.to_string(),
        base: base.to_string(),
        vtype,
    };

    if !is_known(normalized) || normalized.is_empty() {
        return class(UNDEFINED, UNDEFINED, VersionType::Undefined);
    }

    if let Some(caps) = GLUON_RELEASE.captures(normalized) {
        let version = caps.get(0).map_or(normalized, |m| m.as_str());
        let base = caps.name("base").map_or(normalized, |m| m.as_str());
        return class(version, base, VersionType::GluonBase);
    }

    let vtype = if normalized == "gluon-unknown" {
        VersionType::GluonUnknown
    } else if GLUON_COMMIT.is_match(normalized) {
        VersionType::GluonCommitId
    } else if normalized.starts_with("gluon-") {
        VersionType::GluonCustom
    } else {
        VersionType::Foreign
    };
    class(normalized, normalized, vtype)
}
