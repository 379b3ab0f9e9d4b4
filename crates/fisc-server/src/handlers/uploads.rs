//! Spreadsheet/CSV upload handler

use std::io::Write;
use std::sync::Arc;

use axum::{extract::Multipart, extract::State, Extension, Json};
use tracing::info;

use fisc_core::db::IMPORT_TIME_BUDGET;
use fisc_core::import::{parse_file, ACCEPTED_EXTENSIONS};

use crate::events::broadcast_dashboard_summary;
use crate::{AppError, AppState, AuthUser};

/// POST /api/uploads/budget-data - Bulk-import a CSV or Excel file
///
/// The upload is spooled to a `NamedTempFile`, so the transient file is
/// removed on every exit path, including validation failures and panics.
/// Unsupported extensions are rejected before any byte is parsed.
pub async fn upload_budget_data(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let extension = std::path::Path::new(&file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if !ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(AppError::bad_request(
                "Only .csv, .xls and .xlsx files are accepted",
            ));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::bad_request(&format!("Failed to read upload: {}", e)))?;

        let mut spool = tempfile::Builder::new()
            .prefix("fisc-upload-")
            .suffix(&format!(".{}", extension))
            .tempfile()
            .map_err(fisc_core::Error::Io)?;
        spool.write_all(&data).map_err(fisc_core::Error::Io)?;

        let rows = parse_file(spool.path(), &extension)?;
        let imported = state.db.import_rows(&rows, user.0, IMPORT_TIME_BUDGET)?;

        info!(user_id = user.0, imported, file = %file_name, "Bulk import finished");

        broadcast_dashboard_summary(&state.events, &state.db);

        return Ok(Json(serde_json::json!({
            "imported": imported,
            "file": file_name,
        })));
    }

    Err(AppError::bad_request("Missing 'file' field in upload"))
}
