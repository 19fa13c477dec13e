use std::path::{Path, PathBuf};

use rocket::State;
use rocket::fs::NamedFile;
use rocket::http::Status;

use crate::env::AppConfig;

#[get("/")]
pub async fn index(config: &State<AppConfig>) -> Option<NamedFile> {
    NamedFile::open(config.static_dir.join("index.html")).await.ok()
}

/// Serves the app shell assets. Source workbooks are never downloadable,
/// whatever the filesystem holds; everything else answers 404 when missing.
#[get("/<file..>", rank = 20)]
pub async fn static_asset(
    file: PathBuf,
    config: &State<AppConfig>,
) -> Result<Option<NamedFile>, Status> {
    if is_workbook(&file) {
        return Err(Status::Forbidden);
    }

    Ok(NamedFile::open(config.static_dir.join(file)).await.ok())
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("xlsx"))
        .unwrap_or(false)
}
