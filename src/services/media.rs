use crate::config::MediaConfig;
use crate::error::ApiError;
use actix_multipart::Multipart;
use futures::{StreamExt, TryStreamExt};
use mongodb::bson::oid::ObjectId;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

/// A fully-read multipart form: text fields plus uploaded files keyed by
/// field name. Uploads are buffered in memory before hitting the store.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    /// Non-empty text field, or a 400 naming the missing field.
    pub fn require(&self, name: &str) -> Result<&str, ApiError> {
        match self.fields.get(name).map(String::as_str) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ApiError::bad_request(format!("{} is required", name))),
        }
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name)
    }

    /// Uploaded file, or a 400 naming the missing file field.
    pub fn require_file(&self, name: &str) -> Result<&UploadedFile, ApiError> {
        self.files
            .get(name)
            .ok_or_else(|| ApiError::bad_request(format!("{} file is required", name)))
    }
}

pub async fn read_form(mut payload: Multipart) -> Result<MultipartForm, ApiError> {
    let mut form = MultipartForm::default();

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart payload: {}", e)))?
    {
        let disposition = field.content_disposition();
        let name = match disposition.get_name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        let filename = disposition.get_filename().map(|f| f.to_string());

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk
                .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;
            data.extend_from_slice(&chunk);
        }

        match filename {
            Some(filename) => {
                form.files.insert(name, UploadedFile { filename, data });
            }
            None => {
                let value = String::from_utf8(data)
                    .map_err(|_| ApiError::bad_request("Form fields must be valid UTF-8"))?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}

/// Local-disk media store. Uploaded files get a generated name under the
/// configured root and are served back at `{base_url}/{name}`.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    base_url: String,
}

impl MediaStore {
    pub fn new(config: &MediaConfig) -> Self {
        MediaStore {
            root: PathBuf::from(&config.root),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Persists the upload and returns its public URL.
    pub async fn store(&self, file: &UploadedFile) -> Result<String, ApiError> {
        if file.data.is_empty() {
            return Err(ApiError::bad_request("Uploaded file is empty"));
        }

        let name = match extension(&file.filename) {
            Some(ext) => format!("{}.{}", ObjectId::new().to_hex(), ext),
            None => ObjectId::new().to_hex(),
        };

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to prepare media root: {}", e)))?;
        tokio::fs::write(self.root.join(&name), &file.data)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to store upload: {}", e)))?;

        Ok(format!("{}/{}", self.base_url, name))
    }

    /// Best-effort removal of a stored file by its public URL, for undoing an
    /// upload whose owning write was rolled back.
    pub async fn remove(&self, url: &str) {
        let name = match url.strip_prefix(self.base_url.as_str()) {
            Some(rest) => rest.trim_start_matches('/'),
            None => return,
        };
        if name.is_empty() || name.contains('/') {
            return;
        }
        if let Err(e) = tokio::fs::remove_file(self.root.join(name)).await {
            log::warn!("Failed to remove stored file {}: {}", name, e);
        }
    }
}

fn extension(filename: &str) -> Option<&str> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &Path) -> MediaStore {
        MediaStore::new(&MediaConfig {
            root: dir.to_string_lossy().to_string(),
            base_url: "http://localhost:8000/media/".to_string(),
        })
    }

    #[test]
    fn require_rejects_missing_and_blank_fields() {
        let mut form = MultipartForm::default();
        form.fields.insert("fullname".to_string(), "  ".to_string());

        assert!(form.require("fullname").is_err());
        assert!(form.require("email").is_err());

        form.fields
            .insert("email".to_string(), "chai@example.com".to_string());
        assert_eq!(form.require("email").unwrap(), "chai@example.com");
    }

    #[actix_web::test]
    async fn stored_file_lands_under_root_with_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let url = store
            .store(&UploadedFile {
                filename: "avatar.png".to_string(),
                data: vec![1, 2, 3],
            })
            .await
            .unwrap();

        assert!(url.starts_with("http://localhost:8000/media/"));
        assert!(url.ends_with(".png"));

        let name = url.rsplit('/').next().unwrap();
        let on_disk = std::fs::read(dir.path().join(name)).unwrap();
        assert_eq!(on_disk, vec![1, 2, 3]);
    }

    #[actix_web::test]
    async fn empty_upload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let err = store
            .store(&UploadedFile {
                filename: "avatar.png".to_string(),
                data: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[actix_web::test]
    async fn removing_by_url_deletes_the_stored_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let url = store
            .store(&UploadedFile {
                filename: "avatar.png".to_string(),
                data: vec![1, 2, 3],
            })
            .await
            .unwrap();
        let name = url.rsplit('/').next().unwrap().to_string();
        assert!(dir.path().join(&name).exists());

        store.remove(&url).await;
        assert!(!dir.path().join(&name).exists());

        // URLs outside the store are left alone.
        store.remove("http://elsewhere.example.com/media/x.png").await;
    }

    #[test]
    fn suspicious_extensions_are_dropped() {
        assert_eq!(extension("a.png"), Some("png"));
        assert_eq!(extension("noext"), None);
        assert_eq!(extension("weird.p/ng"), None);
    }
}
