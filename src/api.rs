use rocket::Request;
use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::auth::{Session, SessionStore, verifier};
use crate::env::AppConfig;
use crate::error::AppError;
use crate::models::{Activity, GlobalMessage, ProgramRules};
use crate::store::{SharedSnapshot, extract_activities};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub employee_name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResponse {
    pub employee_name: String,
    pub activities: Vec<Activity>,
    pub program_rules: ProgramRules,
    pub global_messages: Vec<GlobalMessage>,
}

// The body is deserialized by hand: a syntactically broken payload goes
// through the internal-error path, and only missing credentials get the
// dedicated 400.
#[post("/login", data = "<body>")]
pub async fn api_login(
    body: &str,
    data: &State<SharedSnapshot>,
    sessions: &State<SessionStore>,
    config: &State<AppConfig>,
) -> Result<Json<LoginResponse>, AppError> {
    let request: LoginRequest = serde_json::from_str(body)
        .map_err(|e| AppError::Internal(format!("unreadable login request: {}", e)))?;

    let employee_id = request
        .employee_id
        .as_deref()
        .map(str::trim)
        .unwrap_or_default();
    let code = request.code.as_deref().unwrap_or_default();

    if employee_id.is_empty() || code.is_empty() {
        return Err(AppError::Validation(
            "employeeId and code are required".to_string(),
        ));
    }

    let snapshot = data.current();

    // Unknown ids and wrong codes get the same rejection so employee ids
    // cannot be enumerated.
    let record = snapshot
        .instructors
        .get(employee_id)
        .filter(|record| verifier::verify(record, code, config.allow_legacy_sha))
        .ok_or_else(|| AppError::Authentication("invalid employee id or code".to_string()))?;

    let session = sessions.create(&record.employee_id, &record.name);
    info!(employee_id = %record.employee_id, "Login succeeded");

    Ok(Json(LoginResponse {
        token: session.token,
        employee_name: session.employee_name,
    }))
}

#[get("/me/schedule")]
pub async fn api_schedule(
    session: Session,
    data: &State<SharedSnapshot>,
) -> Result<Json<ScheduleResponse>, AppError> {
    let snapshot = data.current();

    let record = snapshot.instructors.get(&session.employee_id).ok_or_else(|| {
        AppError::NotFound(format!(
            "employee {} is no longer on the roster",
            session.employee_id
        ))
    })?;

    Ok(Json(ScheduleResponse {
        employee_name: record.name.clone(),
        activities: extract_activities(record),
        program_rules: snapshot.program_rules.clone(),
        global_messages: snapshot.global_messages.clone(),
    }))
}

#[post("/logout")]
pub async fn api_logout(session: Session, sessions: &State<SessionStore>) -> Status {
    sessions.revoke(&session.token);
    info!(employee_id = %session.employee_id, "Logged out");
    Status::NoContent
}

#[get("/health")]
pub fn health() -> Status {
    Status::Ok
}

#[catch(401)]
pub fn unauthorized_api(_req: &Request) -> Custom<Json<Value>> {
    Custom(
        Status::Unauthorized,
        Json(json!({
            "error": "unauthorized",
            "detail": "Authentication required"
        })),
    )
}

#[catch(404)]
pub fn not_found(_req: &Request) -> &'static str {
    "Not Found"
}

#[catch(500)]
pub fn internal_error(_req: &Request) -> Custom<Json<Value>> {
    Custom(
        Status::InternalServerError,
        Json(json!({
            "error": "internal",
            "detail": "unexpected server error"
        })),
    )
}
