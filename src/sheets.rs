use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::AppError;

/// Row shape requested from the external parser. `Objects` keys each data row
/// by the trimmed header names and drops all-empty rows; `Arrays` returns
/// every row, header included, as a plain list of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowShape {
    Objects,
    Arrays,
}

impl RowShape {
    fn mode_arg(self) -> &'static str {
        match self {
            RowShape::Objects => "objects",
            RowShape::Arrays => "arrays",
        }
    }
}

/// Source of tabular data. The production implementation shells out to the
/// workbook parser; tests substitute an in-memory fake.
#[rocket::async_trait]
pub trait SheetReader: Send + Sync {
    async fn read(&self, path: &Path, shape: RowShape) -> Result<Value, AppError>;

    async fn read_objects(&self, path: &Path) -> Result<Vec<Map<String, Value>>, AppError> {
        match self.read(path, RowShape::Objects).await? {
            Value::Array(rows) => rows
                .into_iter()
                .map(|row| match row {
                    Value::Object(map) => Ok(map),
                    other => Err(AppError::ExternalService(format!(
                        "parser returned a non-object row: {}",
                        other
                    ))),
                })
                .collect(),
            other => Err(AppError::ExternalService(format!(
                "parser returned a non-array payload: {}",
                other
            ))),
        }
    }

    async fn read_rows(&self, path: &Path) -> Result<Vec<Vec<Value>>, AppError> {
        match self.read(path, RowShape::Arrays).await? {
            Value::Array(rows) => rows
                .into_iter()
                .map(|row| match row {
                    Value::Array(cells) => Ok(cells),
                    other => Err(AppError::ExternalService(format!(
                        "parser returned a non-array row: {}",
                        other
                    ))),
                })
                .collect(),
            other => Err(AppError::ExternalService(format!(
                "parser returned a non-array payload: {}",
                other
            ))),
        }
    }
}

/// Invokes the workbook parser as a child process and reads JSON rows from
/// its stdout. The call runs under a timeout; a parser that hangs is killed
/// and reported like any other read failure.
pub struct SubprocessSheetReader {
    command: String,
    script: PathBuf,
    timeout: Duration,
}

impl SubprocessSheetReader {
    pub fn new(command: String, script: PathBuf, timeout: Duration) -> Self {
        Self {
            command,
            script,
            timeout,
        }
    }
}

#[rocket::async_trait]
impl SheetReader for SubprocessSheetReader {
    #[instrument(skip(self), fields(command = %self.command))]
    async fn read(&self, path: &Path, shape: RowShape) -> Result<Value, AppError> {
        debug!("Invoking workbook parser");

        let child = Command::new(&self.command)
            .arg(&self.script)
            .arg(path)
            .arg(shape.mode_arg())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| {
                AppError::ExternalService(format!(
                    "workbook parser timed out after {}s on {}",
                    self.timeout.as_secs(),
                    path.display()
                ))
            })?
            .map_err(|e| {
                AppError::ExternalService(format!("failed to spawn workbook parser: {}", e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::ExternalService(format!(
                "workbook parser exited with {} on {}: {}",
                output.status,
                path.display(),
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            AppError::ExternalService(format!(
                "workbook parser produced invalid JSON for {}: {}",
                path.display(),
                e
            ))
        })
    }
}
