use std::io;

use actix_web::{web, HttpResponse};
use log::error;

use crate::errors::AppError;
use crate::utils::upload::UploadStore;

/// Serves a previously uploaded image read-only.
pub async fn serve_upload(
    uploads: web::Data<UploadStore>,
    file_name: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let not_found = || AppError::NotFound("File not found".to_string());
    let path = uploads.resolve(&file_name).ok_or_else(not_found)?;

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(not_found()),
        Err(err) => {
            error!("Failed to read upload {}: {:?}", path.display(), err);
            return Err(AppError::InternalServerError("Failed to read file".to_string()));
        }
    };

    let content_type = infer::get(&bytes)
        .map(|kind| kind.mime_type())
        .unwrap_or("application/octet-stream");

    Ok(HttpResponse::Ok().content_type(content_type).body(bytes))
}
