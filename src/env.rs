use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

pub const INSTRUCTOR_FILE: &str = "InstructorData.xlsx";
pub const PROGRAM_RULES_FILE: &str = "ProgramRules.xlsx";
pub const GLOBAL_MESSAGES_FILE: &str = "GlobalMessages.xlsx";

pub fn load_environment() -> Result<(), Box<dyn std::error::Error>> {
    let is_production =
        dotenvy::var("ROCKET_PROFILE").unwrap_or("development".to_string()) == "production";

    let env_files = if is_production {
        vec!["config/common.env", "config/prod.env", ".secrets.env"]
    } else {
        vec!["config/common.env", "config/dev.env", ".secrets.env"]
    };

    for env_file in env_files {
        load_env_file(env_file)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !Path::new(path).exists() {
        warn!("Warning: Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path)?;
    info!("Loaded environment from: {}", path);
    Ok(())
}

/// Runtime settings resolved from the process environment after the layered
/// env files have been applied.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    /// Opt-in for verifying against the unsalted legacy digest column.
    pub allow_legacy_sha: bool,
    pub parser_command: String,
    pub parser_script: PathBuf,
    pub parser_timeout: Duration,
    pub reload_interval: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_parsed("PORT", 8080),
            data_dir: PathBuf::from(env_or("DATA_DIR", "data")),
            static_dir: PathBuf::from(env_or("STATIC_DIR", "public")),
            allow_legacy_sha: env_flag("ALLOW_LEGACY_SHA"),
            parser_command: env_or("SHEET_PARSER_CMD", "python3"),
            parser_script: PathBuf::from(env_or("SHEET_PARSER_SCRIPT", "scripts/parse_xlsx.py")),
            parser_timeout: Duration::from_secs(env_parsed("SHEET_PARSER_TIMEOUT_SECS", 30)),
            reload_interval: Duration::from_secs(env_parsed("RELOAD_INTERVAL_SECS", 300)),
        }
    }

    pub fn instructor_path(&self) -> PathBuf {
        self.data_dir.join(INSTRUCTOR_FILE)
    }

    pub fn program_rules_path(&self) -> PathBuf {
        self.data_dir.join(PROGRAM_RULES_FILE)
    }

    pub fn global_messages_path(&self) -> PathBuf {
        self.data_dir.join(GLOBAL_MESSAGES_FILE)
    }

    /// The three source workbooks, all of which must exist at startup.
    pub fn source_paths(&self) -> [PathBuf; 3] {
        [
            self.instructor_path(),
            self.program_rules_path(),
            self.global_messages_path(),
        ]
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Invalid value for {}: {:?}, using default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_flag(key: &str) -> bool {
    matches!(
        std::env::var(key).unwrap_or_default().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
