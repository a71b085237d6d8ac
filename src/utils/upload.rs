use std::io;
use std::path::PathBuf;

use chrono::Utc;
use log::warn;
use uuid::Uuid;

use crate::errors::AppError;

/// Public path prefix that stored image paths carry, e.g. `uploads/<file>`.
pub const PUBLIC_PREFIX: &str = "uploads";

const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Local directory holding uploaded employee images. Employee records keep
/// only the returned path, never the bytes.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    pub async fn init(dir: impl Into<PathBuf>, max_bytes: usize) -> io::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir, max_bytes })
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Validates an uploaded image and writes it under a fresh name.
    /// Returns the stored path (`uploads/<file>`).
    pub async fn save(&self, original_name: Option<&str>, bytes: &[u8]) -> Result<String, AppError> {
        if bytes.len() > self.max_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "Image exceeds the {} byte limit",
                self.max_bytes
            )));
        }

        let kind = infer::get(bytes)
            .filter(|kind| ALLOWED_IMAGE_TYPES.contains(&kind.mime_type()))
            .ok_or_else(|| {
                AppError::BadRequest("Only JPEG, PNG, GIF and WebP images are allowed".to_string())
            })?;

        let original = original_name
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("image.{}", kind.extension()));
        let file_name = unique_file_name(&original);

        tokio::fs::write(self.dir.join(&file_name), bytes)
            .await
            .map_err(|err| {
                log::error!("Failed to write upload {}: {:?}", file_name, err);
                AppError::InternalServerError("Failed to store image".to_string())
            })?;

        Ok(format!("{}/{}", PUBLIC_PREFIX, file_name))
    }

    /// Best-effort removal of a stored path. Failures are only logged.
    pub async fn remove(&self, stored_path: &str) {
        let Some(path) = stored_path
            .strip_prefix(PUBLIC_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .and_then(|file| self.resolve(file))
        else {
            warn!("Refusing to remove unexpected image path {:?}", stored_path);
            return;
        };

        if let Err(err) = tokio::fs::remove_file(&path).await {
            if err.kind() != io::ErrorKind::NotFound {
                warn!("Failed to remove image {}: {:?}", path.display(), err);
            }
        }
    }

    /// Maps a public file name to its location on disk. Anything that could
    /// escape the upload directory is refused.
    pub fn resolve(&self, file_name: &str) -> Option<PathBuf> {
        if file_name.is_empty()
            || file_name == "."
            || file_name.contains("..")
            || file_name.contains('/')
            || file_name.contains('\\')
        {
            return None;
        }
        Some(self.dir.join(file_name))
    }
}

/// `<unix millis>-<8 hex chars>-<sanitized basename>`.
pub fn unique_file_name(original: &str) -> String {
    let basename = original
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let mut sanitized: String = basename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    // No hidden files or `..` sequences.
    while sanitized.contains("..") {
        sanitized = sanitized.replace("..", ".");
    }
    let sanitized = sanitized.trim_start_matches('.');
    let sanitized = if sanitized.is_empty() { "upload" } else { sanitized };

    let nonce = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", Utc::now().timestamp_millis(), &nonce[..8], sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    #[test]
    fn file_names_are_unique_and_sanitized() {
        let a = unique_file_name("my photo.png");
        let b = unique_file_name("my photo.png");
        assert_ne!(a, b);
        assert!(a.ends_with("-my_photo.png"));

        let sneaky = unique_file_name("../../etc/passwd");
        assert!(sneaky.ends_with("-passwd"));
        assert!(!sneaky.contains('/'));

        let dotted = unique_file_name("..hidden..png");
        assert!(!dotted.contains(".."));
        assert!(dotted.ends_with("-hidden.png"));
    }

    #[test]
    fn resolve_refuses_traversal() {
        let store = UploadStore {
            dir: PathBuf::from("uploads"),
            max_bytes: 1024,
        };
        assert!(store.resolve("a.png").is_some());
        assert!(store.resolve("../a.png").is_none());
        assert!(store.resolve("nested/a.png").is_none());
        assert!(store.resolve("").is_none());
    }

    #[actix_web::test]
    async fn saves_and_removes_images() {
        let tmp = tempfile::tempdir().unwrap();
        let store = UploadStore::init(tmp.path(), 1024).await.unwrap();

        let stored = store.save(Some("me.png"), PNG).await.unwrap();
        assert!(stored.starts_with("uploads/"));
        assert!(stored.ends_with("-me.png"));

        let file = store.resolve(stored.trim_start_matches("uploads/")).unwrap();
        assert!(file.exists());

        store.remove(&stored).await;
        assert!(!file.exists());
    }

    #[actix_web::test]
    async fn names_anonymous_uploads_from_content() {
        let tmp = tempfile::tempdir().unwrap();
        let store = UploadStore::init(tmp.path(), 1024).await.unwrap();

        let stored = store.save(None, PNG).await.unwrap();
        assert!(stored.ends_with("-image.png"));
    }

    #[actix_web::test]
    async fn rejects_non_images_and_oversized_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = UploadStore::init(tmp.path(), 8).await.unwrap();

        assert!(matches!(
            store.save(Some("notes.txt"), b"hello").await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            store.save(Some("me.png"), PNG).await,
            Err(AppError::PayloadTooLarge(_))
        ));
    }
}
