//! core::state::schema
//!
//! Wire schema for the branch-graph store (v1).
//!
//! # Schema Design
//!
//! The state file is self-describing (`kind` + `schema_version`) and
//! strictly parsed: unknown fields are rejected everywhere except the
//! `change` field, which is deliberately opaque and preserved verbatim.
//!
//! Logical shape:
//!
//! ```json
//! {
//!   "kind": "arbor.state",
//!   "schema_version": 1,
//!   "updated_at": "2024-06-01T12:00:00Z",
//!   "trunk": { "name": "main", "remote": "origin" },
//!   "branches": {
//!     "feature": {
//!       "base": { "name": "main", "hash": "<hex>" },
//!       "upstream": "origin",
//!       "change": { "number": 42 }
//!     }
//!   }
//! }
//! ```
//!
//! `branches` is a `BTreeMap`, so enumeration, and therefore sibling
//! ordering everywhere downstream, is lexicographic by construction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::graph::BranchGraph;
use crate::core::types::{BranchName, Oid, TypeError, UtcTimestamp};

/// The kind identifier for the state file.
pub const STATE_KIND: &str = "arbor.state";

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from schema parsing and validation.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to parse state: {0}")]
    Parse(String),

    #[error("invalid kind '{found}', expected '{STATE_KIND}'")]
    InvalidKind { found: String },

    #[error("unsupported schema version {0}, supported: {SCHEMA_VERSION}")]
    UnsupportedVersion(u32),

    #[error("type validation failed: {0}")]
    Type(#[from] TypeError),

    #[error("state violates graph invariants: {0}")]
    Invariant(Violation),
}

/// A single graph-invariant violation.
///
/// Validation collects all of these rather than failing on the first, so
/// callers can report everything that is wrong with a store at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A record's base names a branch that is neither tracked nor trunk.
    DanglingBase { branch: String, base: String },
    /// The base relation contains a cycle through this branch.
    Cycle { branch: String },
    /// The trunk name appears as a tracked branch record.
    TrunkTracked { trunk: String },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::DanglingBase { branch, base } => {
                write!(f, "branch '{branch}' has unknown base '{base}'")
            }
            Violation::Cycle { branch } => {
                write!(f, "base chain of '{branch}' forms a cycle")
            }
            Violation::TrunkTracked { trunk } => {
                write!(f, "trunk '{trunk}' must not be a tracked branch")
            }
        }
    }
}

/// Envelope for version dispatch before full parsing.
#[derive(Debug, Deserialize)]
struct StateEnvelope {
    kind: String,
    schema_version: u32,
}

/// Parse a state document with version dispatch and full validation.
///
/// # Errors
///
/// Fails when the JSON is malformed, the kind or version is wrong, any
/// name or hash is invalid, or the graph invariants do not hold.
pub fn parse_state(json: &str) -> Result<StateV1, SchemaError> {
    let envelope: StateEnvelope =
        serde_json::from_str(json).map_err(|e| SchemaError::Parse(e.to_string()))?;

    if envelope.kind != STATE_KIND {
        return Err(SchemaError::InvalidKind {
            found: envelope.kind,
        });
    }

    match envelope.schema_version {
        1 => {
            let state: StateV1 =
                serde_json::from_str(json).map_err(|e| SchemaError::Parse(e.to_string()))?;
            state.check()?;
            Ok(state)
        }
        v => Err(SchemaError::UnsupportedVersion(v)),
    }
}

/// The complete persisted state (v1): one trunk record plus the branch map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StateV1 {
    /// Kind identifier (always "arbor.state").
    pub kind: String,

    /// Schema version (always 1 for this struct).
    pub schema_version: u32,

    /// When the state was last written. Informational only.
    pub updated_at: UtcTimestamp,

    /// The trunk record.
    pub trunk: TrunkInfo,

    /// Tracked branches, keyed by name.
    pub branches: BTreeMap<String, BranchRecord>,
}

impl StateV1 {
    /// Fresh state with a trunk and no tracked branches.
    pub fn new(trunk: BranchName, remote: Option<String>) -> Self {
        Self {
            kind: STATE_KIND.to_string(),
            schema_version: SCHEMA_VERSION,
            updated_at: UtcTimestamp::now(),
            trunk: TrunkInfo {
                name: trunk.to_string(),
                remote,
            },
            branches: BTreeMap::new(),
        }
    }

    /// Serialize to the canonical on-disk form.
    pub fn to_json(&self) -> Result<String, SchemaError> {
        serde_json::to_string_pretty(self).map_err(|e| SchemaError::Parse(e.to_string()))
    }

    /// Build the branch forest from the records.
    ///
    /// Bases pointing at trunk become edges to the trunk node, so the trunk
    /// is the root of every tree even though it has no record of its own.
    pub fn graph(&self) -> Result<BranchGraph, TypeError> {
        let mut graph = BranchGraph::new();
        for (name, record) in &self.branches {
            graph.add_edge(
                BranchName::new(name.clone())?,
                BranchName::new(record.base.name.clone())?,
            );
        }
        Ok(graph)
    }

    /// Validate every name and hash, then the graph invariants.
    ///
    /// # Errors
    ///
    /// The first `Violation` found becomes `SchemaError::Invariant`; use
    /// [`StateV1::violations`] to collect all of them.
    pub fn check(&self) -> Result<(), SchemaError> {
        BranchName::new(&self.trunk.name)?;
        for (name, record) in &self.branches {
            BranchName::new(name.clone())?;
            BranchName::new(record.base.name.clone())?;
            Oid::new(record.base.hash.clone())?;
        }
        match self.violations().into_iter().next() {
            Some(violation) => Err(SchemaError::Invariant(violation)),
            None => Ok(()),
        }
    }

    /// Collect every graph-invariant violation in the state.
    ///
    /// Never fails and never stops at the first problem; records whose
    /// names do not even parse are skipped here (type validation reports
    /// them through [`check`]).
    ///
    /// [`check`]: StateV1::check
    pub fn violations(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        if self.branches.contains_key(&self.trunk.name) {
            violations.push(Violation::TrunkTracked {
                trunk: self.trunk.name.clone(),
            });
        }

        for (name, record) in &self.branches {
            let base = &record.base.name;
            if base != &self.trunk.name && !self.branches.contains_key(base) {
                violations.push(Violation::DanglingBase {
                    branch: name.clone(),
                    base: base.clone(),
                });
            }
        }

        let mut graph = BranchGraph::new();
        for (name, record) in &self.branches {
            if let (Ok(child), Ok(parent)) = (
                BranchName::new(name.clone()),
                BranchName::new(record.base.name.clone()),
            ) {
                graph.add_edge(child, parent);
            }
        }
        if let Some(branch) = graph.find_cycle() {
            violations.push(Violation::Cycle {
                branch: branch.to_string(),
            });
        }

        violations
    }
}

/// The trunk record: the one branch stacks grow from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TrunkInfo {
    /// Trunk branch name.
    pub name: String,

    /// Remote the trunk tracks, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
}

/// One tracked branch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BranchRecord {
    /// The branch this one is stacked on.
    pub base: BaseInfo,

    /// Upstream remote name, preserved verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream: Option<String>,

    /// Associated change-request identifier. Opaque to the engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<serde_json::Value>,
}

impl BranchRecord {
    /// A plain record with no extra metadata.
    pub fn new(base_name: &BranchName, base_hash: &Oid) -> Self {
        Self {
            base: BaseInfo {
                name: base_name.to_string(),
                hash: base_hash.to_string(),
            },
            upstream: None,
            change: None,
        }
    }

    /// The validated base branch name.
    pub fn base_name(&self) -> Result<BranchName, TypeError> {
        BranchName::new(self.base.name.clone())
    }

    /// The validated base commit hash.
    pub fn base_hash(&self) -> Result<Oid, TypeError> {
        Oid::new(self.base.hash.clone())
    }

    /// Copy of this record re-based onto a new name and hash.
    ///
    /// Opaque metadata (`upstream`, `change`) rides along unchanged; this is
    /// the only sanctioned way to move a record so nothing is dropped.
    pub fn rebased(&self, base_name: &BranchName, base_hash: &Oid) -> Self {
        Self {
            base: BaseInfo {
                name: base_name.to_string(),
                hash: base_hash.to_string(),
            },
            upstream: self.upstream.clone(),
            change: self.change.clone(),
        }
    }
}

/// Where a branch was forked from: base name plus the base tip at the last
/// alignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BaseInfo {
    /// Base branch name (another record, or the trunk).
    pub name: String,

    /// Tip of the base at the time this branch was last aligned on it.
    pub hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(seed: u8) -> Oid {
        Oid::new(format!("{:040x}", seed as u64)).unwrap()
    }

    fn branch(name: &str) -> BranchName {
        BranchName::new(name).unwrap()
    }

    fn sample_state() -> StateV1 {
        let mut state = StateV1::new(branch("main"), Some("origin".into()));
        state.branches.insert(
            "feat-a".into(),
            BranchRecord::new(&branch("main"), &oid(1)),
        );
        state.branches.insert(
            "feat-b".into(),
            BranchRecord::new(&branch("feat-a"), &oid(2)),
        );
        state
    }

    #[test]
    fn roundtrip_preserves_everything() {
        let mut state = sample_state();
        state.branches.get_mut("feat-a").unwrap().upstream = Some("origin".into());
        state.branches.get_mut("feat-a").unwrap().change =
            Some(serde_json::json!({ "number": 42, "forge": "github" }));

        let json = state.to_json().unwrap();
        let parsed = parse_state(&json).unwrap();
        assert_eq!(state, parsed);
    }

    #[test]
    fn wrong_kind_rejected() {
        let json = r#"{ "kind": "other.tool", "schema_version": 1 }"#;
        assert!(matches!(
            parse_state(json),
            Err(SchemaError::InvalidKind { .. })
        ));
    }

    #[test]
    fn future_version_rejected() {
        let json = r#"{ "kind": "arbor.state", "schema_version": 9 }"#;
        assert!(matches!(
            parse_state(json),
            Err(SchemaError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn unknown_fields_rejected() {
        let mut value: serde_json::Value =
            serde_json::from_str(&sample_state().to_json().unwrap()).unwrap();
        value["surprise"] = serde_json::json!(true);
        assert!(matches!(
            parse_state(&value.to_string()),
            Err(SchemaError::Parse(_))
        ));
    }

    #[test]
    fn invalid_hash_rejected() {
        let mut state = sample_state();
        state.branches.get_mut("feat-a").unwrap().base.hash = "nope".into();
        let json = serde_json::to_string(&state).unwrap();
        assert!(matches!(parse_state(&json), Err(SchemaError::Type(_))));
    }

    #[test]
    fn dangling_base_is_a_violation() {
        let mut state = sample_state();
        state.branches.get_mut("feat-b").unwrap().base.name = "gone".into();
        let violations = state.violations();
        assert_eq!(
            violations,
            vec![Violation::DanglingBase {
                branch: "feat-b".into(),
                base: "gone".into(),
            }]
        );
        assert!(state.check().is_err());
    }

    #[test]
    fn cycle_is_a_violation() {
        let mut state = sample_state();
        state.branches.get_mut("feat-a").unwrap().base.name = "feat-b".into();
        let violations = state.violations();
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::Cycle { .. })));
    }

    #[test]
    fn tracked_trunk_is_a_violation() {
        let mut state = sample_state();
        state
            .branches
            .insert("main".into(), BranchRecord::new(&branch("main"), &oid(9)));
        let violations = state.violations();
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::TrunkTracked { .. })));
    }

    #[test]
    fn valid_state_has_no_violations() {
        assert!(sample_state().violations().is_empty());
        assert!(sample_state().check().is_ok());
    }

    #[test]
    fn rebased_preserves_opaque_metadata() {
        let mut record = BranchRecord::new(&branch("main"), &oid(1));
        record.upstream = Some("origin".into());
        record.change = Some(serde_json::json!("CR-7"));

        let moved = record.rebased(&branch("other"), &oid(2));
        assert_eq!(moved.base.name, "other");
        assert_eq!(moved.base.hash, oid(2).to_string());
        assert_eq!(moved.upstream, record.upstream);
        assert_eq!(moved.change, record.change);
    }

    #[test]
    fn branches_enumerate_in_name_order() {
        let state = sample_state();
        let names: Vec<_> = state.branches.keys().cloned().collect();
        assert_eq!(names, vec!["feat-a".to_string(), "feat-b".to_string()]);
    }
}
