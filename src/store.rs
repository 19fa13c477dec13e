use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::auth::verifier;
use crate::env::AppConfig;
use crate::error::AppError;
use crate::models::{
    Activity, Credentials, FieldGroup, GlobalMessage, Instructor, MAX_FIELD_GROUPS, ProgramRules,
    RuleNote, Snapshot, normalize_program_key,
};
use crate::sheets::SheetReader;

/// Handle on the active snapshot. Readers clone the inner `Arc` once per
/// request; the reload task replaces it with a single pointer assignment, so
/// a request sees either the whole old snapshot or the whole new one.
#[derive(Clone)]
pub struct SharedSnapshot {
    inner: Arc<RwLock<Arc<Snapshot>>>,
}

impl SharedSnapshot {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    pub fn current(&self) -> Arc<Snapshot> {
        self.inner.read().unwrap().clone()
    }

    pub fn replace(&self, snapshot: Snapshot) {
        *self.inner.write().unwrap() = Arc::new(snapshot);
    }
}

/// Re-reads the three source workbooks and builds a fresh snapshot. All three
/// must parse before anything is returned; a failure leaves the caller's
/// current snapshot untouched.
#[instrument(skip_all)]
pub async fn load_snapshot(
    reader: &dyn SheetReader,
    config: &AppConfig,
) -> Result<Snapshot, AppError> {
    let instructor_rows = reader.read_objects(&config.instructor_path()).await?;
    let rule_rows = reader.read_rows(&config.program_rules_path()).await?;
    let message_rows = reader.read_objects(&config.global_messages_path()).await?;

    let snapshot = Snapshot {
        instructors: normalize_instructors(instructor_rows),
        program_rules: normalize_program_rules(rule_rows),
        global_messages: normalize_messages(message_rows),
    };

    info!(
        instructors = snapshot.instructors.len(),
        programs = snapshot.program_rules.len(),
        messages = snapshot.global_messages.len(),
        "Loaded data snapshot"
    );

    Ok(snapshot)
}

fn normalize_instructors(rows: Vec<Map<String, Value>>) -> HashMap<String, Instructor> {
    let mut instructors = HashMap::new();
    let mut without_id = 0usize;

    for row in rows {
        let employee_id = cell_text(row.get("EmployeeID"));
        let name = cell_text(row.get("Name"));

        let explicit_salt = non_empty(cell_text(row.get("Salt")));
        let salt = verifier::derive_salt(explicit_salt.as_deref(), &employee_id);

        let mut strong_hash = non_empty(cell_text(row.get("PasswordHash")));
        if strong_hash.is_none() {
            // Legacy plaintext-equivalent column: upgrade it to the current
            // scheme in memory and drop the plaintext. The source file is
            // never written back.
            if let Some(code) = non_empty(cell_text(row.get("Code"))) {
                match verifier::strong_hash_hex(&code, &salt) {
                    Ok(hash) => strong_hash = Some(hash),
                    Err(e) => warn!(
                        employee_id = %employee_id,
                        error = %e,
                        "Failed to upgrade legacy code column"
                    ),
                }
            }
        }

        let credentials = Credentials {
            strong_hash,
            legacy_salted_hash: non_empty(cell_text(row.get("SaltedSha256"))),
            legacy_hash: non_empty(cell_text(row.get("Sha256"))),
            salt,
        };

        let field_groups = collect_field_groups(&row);

        if employee_id.is_empty() {
            without_id += 1;
            continue;
        }

        instructors.insert(
            employee_id.clone(),
            Instructor {
                employee_id,
                name,
                credentials,
                field_groups,
            },
        );
    }

    if without_id > 0 {
        info!(
            count = without_id,
            "Instructor rows without an employee id cannot log in"
        );
    }

    instructors
}

fn collect_field_groups(row: &Map<String, Value>) -> Vec<FieldGroup> {
    (1..=MAX_FIELD_GROUPS)
        .map(|index| FieldGroup {
            date: group_cell(row, "Date", index).filter(cell_truthy).cloned(),
            start_time: cell_text(group_cell(row, "StartTime", index)),
            end_time: cell_text(group_cell(row, "EndTime", index)),
            manager: cell_text(group_cell(row, "Manager", index)),
            school: cell_text(group_cell(row, "School", index)),
            class: cell_text(group_cell(row, "Class", index)),
            authority: cell_text(group_cell(row, "Authority", index)),
            program: cell_text(group_cell(row, "Program", index)),
            cancelled: group_cell(row, "Cancelled", index)
                .map(|v| cell_truthy(&v))
                .unwrap_or(false),
        })
        .collect()
}

/// Group 1 also accepts the unsuffixed column spelling from older layouts;
/// the suffixed cell takes precedence when it holds a value.
fn group_cell<'a>(row: &'a Map<String, Value>, base: &str, index: usize) -> Option<&'a Value> {
    let suffixed = row.get(&format!("{}{}", base, index)).filter(cell_truthy);
    if index == 1 {
        suffixed.or_else(|| row.get(base))
    } else {
        suffixed
    }
}

fn normalize_program_rules(rows: Vec<Vec<Value>>) -> ProgramRules {
    let mut rules = ProgramRules::new();

    // First row is the header.
    for row in rows.into_iter().skip(1) {
        let key = normalize_program_key(&cell_text(row.first()));
        if key.is_empty() {
            continue;
        }

        let meeting = match cell_meeting_number(row.get(1)) {
            Some(meeting) => meeting,
            None => {
                debug!(program = %key, "Skipping rule row with non-numeric meeting number");
                continue;
            }
        };

        let notes = rules.entry(key).or_default().entry(meeting).or_default();

        for pair in row.get(2..).unwrap_or(&[]).chunks(2) {
            let note_type = cell_text(pair.first());
            let text = cell_text(pair.get(1));
            if !note_type.is_empty() && !text.is_empty() {
                notes.push(RuleNote { note_type, text });
            }
        }
    }

    rules
}

fn normalize_messages(rows: Vec<Map<String, Value>>) -> Vec<GlobalMessage> {
    rows.into_iter()
        .filter_map(|row| {
            let text = cell_text(row.get("Message"));
            if text.is_empty() {
                return None;
            }

            let mut message_type = cell_text(row.get("Type"));
            if message_type.is_empty() {
                message_type = "Info".to_string();
            }

            Some(GlobalMessage { text, message_type })
        })
        .collect()
}

/// Materializes the activity list for one instructor, in field-group order.
/// A group without a date never yields an activity; a cancellation marker
/// suppresses the group regardless of its date.
pub fn extract_activities(record: &Instructor) -> Vec<Activity> {
    let mut activities = Vec::new();

    for group in &record.field_groups {
        let raw_date = match &group.date {
            Some(value) => value,
            None => continue,
        };

        if group.cancelled {
            continue;
        }

        let date = match parse_cell_date(raw_date) {
            Some(date) => date,
            None => {
                debug!(
                    employee_id = %record.employee_id,
                    raw = %raw_date,
                    "Skipping field group with unparseable date"
                );
                continue;
            }
        };

        activities.push(Activity {
            date,
            start_time: group.start_time.clone(),
            end_time: group.end_time.clone(),
            manager: group.manager.clone(),
            school: group.school.clone(),
            class: group.class.clone(),
            authority: group.authority.clone(),
            program: group.program.clone(),
            program_key: normalize_program_key(&group.program),
        });
    }

    activities
}

/// Date cells arrive either as ISO-8601 strings (date-styled cells) or as raw
/// Excel serial numbers (base 1899-12-30).
fn parse_cell_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(raw) => {
            let raw = raw.trim();
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(dt.and_utc());
            }
            if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
                return Some(dt.with_timezone(&Utc));
            }
            None
        }
        Value::Number(n) => excel_serial_to_datetime(n.as_f64()?),
        _ => None,
    }
}

fn excel_serial_to_datetime(serial: f64) -> Option<DateTime<Utc>> {
    if !serial.is_finite() {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    base.checked_add_signed(chrono::Duration::seconds(seconds))
        .map(|dt| dt.and_utc())
}

/// Meeting numbers must parse as a finite number; anything else drops the row.
fn cell_meeting_number(value: Option<&Value>) -> Option<u32> {
    let number = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(raw) => raw.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    if !number.is_finite() || number < 0.0 || number.fract() != 0.0 {
        return None;
    }

    Some(number as u32)
}

/// Trimmed textual rendering of a cell; empty for missing or null cells.
fn cell_text<V: std::borrow::Borrow<Value>>(value: Option<V>) -> String {
    match value {
        Some(value) => match value.borrow() {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => String::new(),
        },
        None => String::new(),
    }
}

/// Cell presence follows the source convention: empty strings, zero, false,
/// and null all count as absent.
fn cell_truthy(value: &&Value) -> bool {
    match value {
        Value::String(s) => !s.trim().is_empty(),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::Bool(b) => *b,
        _ => false,
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}
