//! Static endpoint roster probed every tick.
//!
//! The roster is fixed at process start: either the built-in reference roster
//! (five cameras, four radars, two compute nodes) or a JSON file supplied on
//! the command line. It is never modified during a run.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// What kind of device sits behind an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointCategory {
    Camera,
    Radar,
    Compute,
}

impl std::fmt::Display for EndpointCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Camera => write!(f, "camera"),
            Self::Radar => write!(f, "radar"),
            Self::Compute => write!(f, "compute"),
        }
    }
}

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSpec {
    pub id: String,
    pub address: String,
    pub category: EndpointCategory,
}

impl EndpointSpec {
    pub fn new(id: &str, address: &str, category: EndpointCategory) -> Self {
        Self {
            id: id.to_string(),
            address: address.to_string(),
            category,
        }
    }
}

const REFERENCE: &[(&str, &str, EndpointCategory)] = &[
    ("hazard_cam", "192.168.11.9", EndpointCategory::Camera),
    ("dock_cam", "192.168.11.10", EndpointCategory::Camera),
    ("ptz_cam", "192.168.11.68", EndpointCategory::Camera),
    ("ptz_ir_cam", "192.168.11.69", EndpointCategory::Camera),
    ("bosch_cam", "192.168.11.65", EndpointCategory::Camera),
    ("airy_front", "10.7.5.152", EndpointCategory::Radar),
    ("airy_rear", "10.7.5.153", EndpointCategory::Radar),
    ("e1r_left", "10.7.5.103", EndpointCategory::Radar),
    ("e1r_right", "10.7.5.104", EndpointCategory::Radar),
    ("va_pc", "192.168.140.75", EndpointCategory::Compute),
    ("nav_pc", "192.168.11.88", EndpointCategory::Compute),
];

/// The reference deployment roster (11 endpoints).
pub fn reference_roster() -> Vec<EndpointSpec> {
    REFERENCE
        .iter()
        .map(|(id, addr, cat)| EndpointSpec::new(id, addr, *cat))
        .collect()
}

/// Errors loading a roster file.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("cannot read roster file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid roster JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate endpoint id '{0}'")]
    DuplicateId(String),
    #[error("endpoint '{0}' has an empty address")]
    EmptyAddress(String),
}

/// Load a roster from a JSON array of `{id, address, category}` objects.
pub fn load_roster(path: &Path) -> Result<Vec<EndpointSpec>, RosterError> {
    let text = std::fs::read_to_string(path)?;
    parse_roster(&text)
}

/// Parse and validate a roster JSON document.
pub fn parse_roster(text: &str) -> Result<Vec<EndpointSpec>, RosterError> {
    let roster: Vec<EndpointSpec> = serde_json::from_str(text)?;
    let mut seen = std::collections::HashSet::new();
    for ep in &roster {
        if ep.address.trim().is_empty() {
            return Err(RosterError::EmptyAddress(ep.id.clone()));
        }
        if !seen.insert(ep.id.as_str()) {
            return Err(RosterError::DuplicateId(ep.id.clone()));
        }
    }
    Ok(roster)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_roster_shape() {
        let roster = reference_roster();
        assert_eq!(roster.len(), 11);
        let count = |c| roster.iter().filter(|e| e.category == c).count();
        assert_eq!(count(EndpointCategory::Camera), 5);
        assert_eq!(count(EndpointCategory::Radar), 4);
        assert_eq!(count(EndpointCategory::Compute), 2);
    }

    #[test]
    fn test_reference_roster_ids_unique() {
        let roster = reference_roster();
        let ids: std::collections::HashSet<_> = roster.iter().map(|e| &e.id).collect();
        assert_eq!(ids.len(), roster.len());
    }

    #[test]
    fn test_parse_roster_valid() {
        let json = r#"[
            {"id": "cam", "address": "10.0.0.1", "category": "camera"},
            {"id": "node", "address": "10.0.0.2", "category": "compute"}
        ]"#;
        let roster = parse_roster(json).unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[1].category, EndpointCategory::Compute);
    }

    #[test]
    fn test_parse_roster_rejects_duplicates() {
        let json = r#"[
            {"id": "cam", "address": "10.0.0.1", "category": "camera"},
            {"id": "cam", "address": "10.0.0.2", "category": "camera"}
        ]"#;
        assert!(matches!(
            parse_roster(json),
            Err(RosterError::DuplicateId(id)) if id == "cam"
        ));
    }

    #[test]
    fn test_parse_roster_rejects_empty_address() {
        let json = r#"[{"id": "r", "address": " ", "category": "radar"}]"#;
        assert!(matches!(parse_roster(json), Err(RosterError::EmptyAddress(_))));
    }

    #[test]
    fn test_load_roster_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_roster(&tmp.path().join("nope.json")),
            Err(RosterError::Io(_))
        ));
    }
}
