//! CSV upload management: object storage plus metadata rows.

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::api::AppState;
use crate::error::AppError;
use crate::store::{NewUploadedFile, UploadedFile};

pub const DEFAULT_BUSINESS: &str = "default_business";
const CSV_CONTENT_TYPE: &str = "text/csv";

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.\-]").unwrap());
static SEPARATOR_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[_.\-]{2,}").unwrap());

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub status: String,
    pub message: String,
    pub file_id: i64,
    pub filename: String,
    pub storage_path: String,
    pub file_url: String,
    pub file_size: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileListing {
    pub id: i64,
    pub name: String,
    pub date: String,
    pub size: String,
    pub status: String,
    pub file_url: String,
    pub storage_path: String,
}

impl From<UploadedFile> for FileListing {
    fn from(file: UploadedFile) -> Self {
        Self {
            id: file.id,
            name: file.filename,
            date: file.uploaded_at.format("%Y-%m-%d").to_string(),
            size: format_size(file.file_size),
            status: "uploaded".to_string(),
            file_url: file.file_url,
            storage_path: file.storage_path,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FilesResponse {
    pub status: String,
    pub files: Vec<FileListing>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct BusinessQuery {
    pub business_name: Option<String>,
}

/// Makes an uploaded filename safe to use as part of an object key.
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename.chars().filter(|c| c.is_ascii()).collect();
    let replaced = UNSAFE_CHARS.replace_all(&ascii, "_");
    let collapsed = SEPARATOR_RUNS.replace_all(&replaced, |caps: &regex::Captures| {
        caps[0].chars().next().map(String::from).unwrap_or_default()
    });
    let trimmed = collapsed.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn is_csv(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("csv"))
}

fn format_size(bytes: i64) -> String {
    format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
}

fn storage_path(business: &str, filename: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!(
        "orders/{}_{}_{}_{}",
        secure_filename(business),
        Utc::now().format("%Y%m%d_%H%M%S"),
        &id[..8],
        filename
    )
}

fn business_or_default(name: Option<String>) -> String {
    name.map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_BUSINESS.to_string())
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    if e.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

#[utoipa::path(
    post,
    path = "/upload-csv",
    tag = "files",
    responses(
        (status = 200, description = "File stored", body = UploadResponse),
        (status = 400, description = "Missing or non-CSV file"),
        (status = 413, description = "File too large")
    )
)]
pub async fn upload_csv(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut business_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "csv_file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                upload = Some((filename, bytes.to_vec()));
            }
            "business_name" => {
                business_name = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let (raw_filename, bytes) =
        upload.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;
    if !is_csv(&raw_filename) {
        return Err(AppError::BadRequest("Only CSV files are allowed".to_string()));
    }
    if bytes.len() > state.max_upload_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "File size exceeds {:.0}MB limit",
            state.max_upload_bytes as f64 / (1024.0 * 1024.0)
        )));
    }

    let business = business_or_default(business_name);
    let filename = secure_filename(&raw_filename);
    let path = storage_path(&business, &filename);
    let file_size = bytes.len() as i64;

    state.objects.put_object(&path, bytes, CSV_CONTENT_TYPE).await?;
    let file_url = state.objects.public_url(&path);

    let record = NewUploadedFile {
        filename: filename.clone(),
        storage_path: path.clone(),
        file_url: file_url.clone(),
        business_name: business.clone(),
        file_size,
        file_type: "csv".to_string(),
    };

    let stored = match state.files.insert_file(record).await {
        Ok(stored) => stored,
        Err(e) => {
            // Do not leave an object behind that no metadata row points to.
            if let Err(cleanup) = state.objects.delete_object(&path).await {
                error!(path = %path, error = %cleanup, "Failed to remove orphaned upload");
            }
            return Err(e.into());
        }
    };

    info!(business = %business, path = %path, bytes = file_size, "📤 CSV uploaded");

    Ok(Json(UploadResponse {
        status: "success".to_string(),
        message: "File uploaded successfully".to_string(),
        file_id: stored.id,
        filename: stored.filename,
        storage_path: stored.storage_path,
        file_url: stored.file_url,
        file_size,
    }))
}

#[utoipa::path(
    get,
    path = "/uploaded-files",
    tag = "files",
    params(BusinessQuery),
    responses((status = 200, description = "Files for a business, newest first", body = FilesResponse))
)]
pub async fn list_uploaded_files(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BusinessQuery>,
) -> Result<Json<FilesResponse>, AppError> {
    let business = business_or_default(query.business_name);
    let files = state.files.list_files(&business).await?;

    Ok(Json(FilesResponse {
        status: "success".to_string(),
        files: files.into_iter().map(FileListing::from).collect(),
    }))
}

#[utoipa::path(
    delete,
    path = "/delete-file/{file_id}",
    tag = "files",
    params(("file_id" = i64, Path, description = "Uploaded file id")),
    responses(
        (status = 200, description = "File deleted", body = DeleteResponse),
        (status = 404, description = "Unknown file")
    )
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<i64>,
) -> Result<Json<DeleteResponse>, AppError> {
    let file = state
        .files
        .get_file(file_id)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    if let Err(e) = state.objects.delete_object(&file.storage_path).await {
        warn!(path = %file.storage_path, error = %e, "Object delete failed, removing metadata anyway");
    }
    state.files.delete_file(file_id).await?;

    info!(file_id, path = %file.storage_path, "🗑️ Uploaded file deleted");

    Ok(Json(DeleteResponse {
        status: "success".to_string(),
        message: "File deleted successfully".to_string(),
    }))
}
