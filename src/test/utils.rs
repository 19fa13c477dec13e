#[cfg(test)]
pub mod test_utils {
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    use crate::auth::{SessionStore, verifier};
    use crate::env::{AppConfig, GLOBAL_MESSAGES_FILE, INSTRUCTOR_FILE, PROGRAM_RULES_FILE};
    use crate::error::AppError;
    use crate::init_rocket;
    use crate::models::Snapshot;
    use crate::sheets::{RowShape, SheetReader};
    use crate::store::{SharedSnapshot, load_snapshot};

    pub const TEST_EMPLOYEE_ID: &str = "1001";
    pub const TEST_EMPLOYEE_NAME: &str = "Dana Levi";
    pub const TEST_CODE: &str = "abc123";

    /// In-memory stand-in for the subprocess workbook parser, keyed by file
    /// name.
    pub struct FakeSheetReader {
        payloads: HashMap<String, Value>,
    }

    impl FakeSheetReader {
        pub fn new(instructors: Value, rules: Value, messages: Value) -> Self {
            let mut payloads = HashMap::new();
            payloads.insert(INSTRUCTOR_FILE.to_string(), instructors);
            payloads.insert(PROGRAM_RULES_FILE.to_string(), rules);
            payloads.insert(GLOBAL_MESSAGES_FILE.to_string(), messages);
            Self { payloads }
        }
    }

    #[rocket::async_trait]
    impl SheetReader for FakeSheetReader {
        async fn read(&self, path: &Path, _shape: RowShape) -> Result<Value, AppError> {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            self.payloads.get(name).cloned().ok_or_else(|| {
                AppError::ExternalService(format!("no fixture registered for {}", name))
            })
        }
    }

    pub fn test_config(static_dir: &Path) -> AppConfig {
        AppConfig {
            port: 0,
            data_dir: PathBuf::from("data"),
            static_dir: static_dir.to_path_buf(),
            allow_legacy_sha: false,
            parser_command: "python3".to_string(),
            parser_script: PathBuf::from("scripts/parse_xlsx.py"),
            parser_timeout: Duration::from_secs(5),
            reload_interval: Duration::from_secs(300),
        }
    }

    /// Instructor row carrying a current-scheme hash for `code` and a single
    /// scheduled activity.
    pub fn instructor_row(employee_id: &str, name: &str, code: &str) -> Value {
        let salt = verifier::derive_salt(None, employee_id);
        let hash = verifier::strong_hash_hex(code, &salt).expect("hashing fixture code");

        json!({
            "EmployeeID": employee_id,
            "Name": name,
            "PasswordHash": hash,
            "Date1": "2026-03-02T00:00:00",
            "StartTime1": "09:00",
            "EndTime1": "10:30",
            "Manager1": "Noa",
            "School1": "Herzl Elementary",
            "Class1": "4B",
            "Authority1": "Tel Aviv",
            "Program1": "Robotics",
        })
    }

    pub fn standard_rules() -> Value {
        json!([
            ["Program", "Meeting", "NoteType", "NoteText"],
            ["Robotics", 1, "Prep", "Bring the kit"],
        ])
    }

    pub fn standard_messages() -> Value {
        json!([
            {"Message": "Office closed on Friday", "Type": "Notice"},
        ])
    }

    pub async fn snapshot_from(instructors: Value, rules: Value, messages: Value) -> Snapshot {
        let reader = FakeSheetReader::new(instructors, rules, messages);
        let config = test_config(Path::new("public"));
        load_snapshot(&reader, &config)
            .await
            .expect("building test snapshot")
    }

    pub async fn standard_snapshot() -> Snapshot {
        snapshot_from(
            json!([instructor_row(TEST_EMPLOYEE_ID, TEST_EMPLOYEE_NAME, TEST_CODE)]),
            standard_rules(),
            standard_messages(),
        )
        .await
    }

    /// Local client over the full rocket with a temp static directory seeded
    /// with an index page. The `TempDir` must outlive the client.
    pub async fn setup_client(snapshot: Snapshot, allow_legacy_sha: bool) -> (Client, TempDir) {
        let static_dir = TempDir::new().expect("creating static dir");
        std::fs::write(
            static_dir.path().join("index.html"),
            "<!doctype html><title>portal</title>",
        )
        .expect("seeding index.html");

        let mut config = test_config(static_dir.path());
        config.allow_legacy_sha = allow_legacy_sha;

        let rocket = init_rocket(config, SharedSnapshot::new(snapshot), SessionStore::new());
        let client = Client::tracked(rocket).await.expect("valid rocket instance");

        (client, static_dir)
    }

    pub async fn login(client: &Client, employee_id: &str, code: &str) -> String {
        let response = client
            .post("/api/login")
            .header(ContentType::JSON)
            .body(json!({"employeeId": employee_id, "code": code}).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);

        let body: Value =
            serde_json::from_str(&response.into_string().await.expect("login body")).unwrap();
        body["token"].as_str().expect("token in response").to_string()
    }
}
