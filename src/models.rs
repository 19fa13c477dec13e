use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Upper bound on repeated activity column groups per instructor row.
pub const MAX_FIELD_GROUPS: usize = 16;

/// Password material attached to an instructor row. At most one scheme is
/// consulted per login attempt; see `auth::verifier` for the ordering.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// Current scheme: lowercase hex of a 32-byte Argon2id output.
    pub strong_hash: Option<String>,
    /// Legacy scheme: hex SHA-256 of `salt ‖ code`.
    pub legacy_salted_hash: Option<String>,
    /// Legacy scheme: hex SHA-256 of the bare code. Verification against this
    /// column is gated behind the `ALLOW_LEGACY_SHA` flag.
    pub legacy_hash: Option<String>,
    /// Salt used by the strong scheme and the salted legacy scheme. Always
    /// present: explicit column, else derived from the employee id, else a
    /// fixed default.
    pub salt: String,
}

/// One of the up-to-16 repeated column groups on an instructor row, kept raw.
/// Activities are materialized from these per request, never stored.
#[derive(Debug, Clone, Default)]
pub struct FieldGroup {
    /// Raw date cell: an ISO-8601 string or an Excel serial number.
    pub date: Option<Value>,
    pub start_time: String,
    pub end_time: String,
    pub manager: String,
    pub school: String,
    pub class: String,
    pub authority: String,
    pub program: String,
    /// True when the cancellation cell is present (non-empty) for this group.
    pub cancelled: bool,
}

#[derive(Debug, Clone)]
pub struct Instructor {
    pub employee_id: String,
    pub name: String,
    pub credentials: Credentials,
    pub field_groups: Vec<FieldGroup>,
}

/// A schedule entry derived from one field group.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub date: DateTime<Utc>,
    pub start_time: String,
    pub end_time: String,
    pub manager: String,
    pub school: String,
    pub class: String,
    pub authority: String,
    pub program: String,
    /// Trimmed, case-folded program name; equals the key used in the
    /// program-rule map.
    pub program_key: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RuleNote {
    #[serde(rename = "type")]
    pub note_type: String,
    pub text: String,
}

/// Program key -> meeting number -> notes, in source column order.
pub type ProgramRules = HashMap<String, BTreeMap<u32, Vec<RuleNote>>>;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GlobalMessage {
    pub text: String,
    #[serde(rename = "type")]
    pub message_type: String,
}

/// One reload cycle's worth of data. Immutable once built; the active
/// snapshot is replaced wholesale, never mutated in place.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub instructors: HashMap<String, Instructor>,
    pub program_rules: ProgramRules,
    pub global_messages: Vec<GlobalMessage>,
}

/// Trimmed, Unicode-lowercased program key. Applied identically on the rule
/// side and the activity side so lookups compare equal.
pub fn normalize_program_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}
