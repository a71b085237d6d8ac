use actix_multipart::{Field, Multipart, MultipartError};
use actix_web::{web, HttpMessage, HttpRequest};
use futures_util::StreamExt;

use crate::errors::AppError;
use crate::models::employee::EmployeeChanges;
use crate::utils::upload::UploadStore;

/// Shared by the employee body reader and the `JsonConfig` extractor limit.
pub(crate) const MAX_JSON_BYTES: usize = 64 * 1024;
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// Decodes employee fields from a multipart form or a JSON body. An uploaded
/// `image` part is written to `uploads` and its stored path recorded; if
/// decoding fails afterwards the file is removed again.
pub async fn decode_employee(
    req: &HttpRequest,
    payload: web::Payload,
    uploads: &UploadStore,
) -> Result<EmployeeChanges, AppError> {
    let content_type = req.content_type().to_ascii_lowercase();

    let changes = match content_type.as_str() {
        "multipart/form-data" => {
            let mut changes = EmployeeChanges::default();
            let multipart = Multipart::new(req.headers(), payload);
            if let Err(err) = read_multipart(multipart, uploads, &mut changes).await {
                if let Some(image) = changes.image.take() {
                    uploads.remove(&image).await;
                }
                return Err(err);
            }
            changes
        }
        "" | "application/json" => read_json(payload).await?,
        other => {
            return Err(AppError::BadRequest(format!(
                "Unsupported content type: {}",
                other
            )))
        }
    };

    Ok(changes.normalized())
}

async fn read_json(mut payload: web::Payload) -> Result<EmployeeChanges, AppError> {
    let mut body = Vec::new();
    while let Some(chunk) = payload.next().await {
        let chunk =
            chunk.map_err(|err| AppError::BadRequest(format!("Failed to read body: {}", err)))?;
        if body.len() + chunk.len() > MAX_JSON_BYTES {
            return Err(AppError::PayloadTooLarge("Request body is too large".to_string()));
        }
        body.extend_from_slice(&chunk);
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(EmployeeChanges::default());
    }

    serde_json::from_slice(&body)
        .map_err(|err| AppError::BadRequest(format!("Invalid JSON body: {}", err)))
}

async fn read_multipart(
    mut multipart: Multipart,
    uploads: &UploadStore,
    changes: &mut EmployeeChanges,
) -> Result<(), AppError> {
    while let Some(item) = multipart.next().await {
        let mut field = item.map_err(multipart_error)?;
        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let file_name = disposition.get_filename().map(str::to_string);

        match name.as_str() {
            "image" => {
                let bytes = read_field(&mut field, uploads.max_bytes()).await?;
                // Browsers send an empty part when no file was chosen.
                if bytes.is_empty() {
                    continue;
                }
                if changes.image.is_some() {
                    return Err(AppError::BadRequest(
                        "Only one image may be uploaded".to_string(),
                    ));
                }
                changes.image = Some(uploads.save(file_name.as_deref(), &bytes).await?);
            }
            "name" => changes.name = Some(read_text(&mut field).await?),
            "email" => changes.email = Some(read_text(&mut field).await?),
            "mobile" => changes.mobile = Some(read_text(&mut field).await?),
            "designation" => changes.designation = Some(read_text(&mut field).await?),
            "gender" => changes.gender = Some(read_text(&mut field).await?),
            "courses" | "courses[]" => {
                let text = read_text(&mut field).await?;
                changes
                    .courses
                    .get_or_insert_with(Vec::new)
                    .extend(parse_courses(&text)?);
            }
            _ => {
                read_field(&mut field, MAX_TEXT_FIELD_BYTES).await?;
            }
        }
    }
    Ok(())
}

async fn read_field(field: &mut Field, limit: usize) -> Result<Vec<u8>, AppError> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(multipart_error)?;
        if buf.len() + chunk.len() > limit {
            return Err(AppError::PayloadTooLarge(format!(
                "Form field exceeds the {} byte limit",
                limit
            )));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

async fn read_text(field: &mut Field) -> Result<String, AppError> {
    let bytes = read_field(field, MAX_TEXT_FIELD_BYTES).await?;
    String::from_utf8(bytes)
        .map_err(|_| AppError::BadRequest("Form fields must be valid UTF-8".to_string()))
}

/// A `courses` part holds one course, or a JSON array of courses.
fn parse_courses(text: &str) -> Result<Vec<String>, AppError> {
    let trimmed = text.trim();
    if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)
            .map_err(|_| AppError::BadRequest("courses must be a list of strings".to_string()))
    } else {
        Ok(vec![trimmed.to_string()])
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::BadRequest(format!("Invalid multipart payload: {}", err))
}
