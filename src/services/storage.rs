use std::path::{Component, Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDateTime;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("The {0} field is required.")]
    MissingFile(&'static str),
    #[error("{0}")]
    InvalidType(&'static str),
    #[error("{0}")]
    TooLarge(&'static str),
    #[error("File not found")]
    NotFound,
    #[error("Invalid file path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Image,
    Document,
}

impl UploadKind {
    /// Multipart field carrying the file
    pub fn field(&self) -> &'static str {
        match self {
            UploadKind::Image => "image",
            UploadKind::Document => "document",
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            UploadKind::Image => &["jpg", "jpeg", "png", "gif", "webp", "svg"],
            UploadKind::Document => &["pdf", "doc", "docx", "ppt", "pptx", "xls", "xlsx", "txt", "rtf"],
        }
    }

    pub fn max_bytes(&self) -> usize {
        match self {
            UploadKind::Image => 5 * 1024 * 1024,
            UploadKind::Document => 15 * 1024 * 1024,
        }
    }

    pub fn default_dir(&self) -> &'static str {
        match self {
            UploadKind::Image => "images",
            UploadKind::Document => "documents",
        }
    }

    fn too_large(&self) -> StorageError {
        StorageError::TooLarge(match self {
            UploadKind::Image => "The image must not be larger than 5 MB.",
            UploadKind::Document => "The document must not be larger than 15 MB.",
        })
    }

    fn invalid_type(&self) -> StorageError {
        StorageError::InvalidType(match self {
            UploadKind::Image => "The image must be a file of type: JPG, JPEG, PNG, GIF, WEBP, or SVG.",
            UploadKind::Document => "The document must be a file of type: PDF, DOC, DOCX, PPT, PPTX, XLS, XLSX, TXT, or RTF.",
        })
    }

    /// Lowercased extension of an acceptable file
    pub fn validate(&self, original_name: &str, size: usize) -> Result<String, StorageError> {
        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .filter(|e| self.extensions().contains(&e.as_str()))
            .ok_or_else(|| self.invalid_type())?;
        if size > self.max_bytes() {
            return Err(self.too_large());
        }
        Ok(ext)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    pub filename: String,
    /// Path relative to the upload root, `/`-separated
    pub relative_path: String,
    pub size: usize,
    pub mime_type: &'static str,
}

/// `{"path": "..."}` as carried by the base64 segment of `/view/file/{..}`
#[derive(Debug, Deserialize)]
struct ViewRequest {
    path: String,
}

/// Upload root on local disk
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn save(
        &self,
        kind: UploadKind,
        file_path: Option<&str>,
        original_name: &str,
        bytes: &[u8],
        now: NaiveDateTime,
    ) -> Result<StoredFile, StorageError> {
        let ext = kind.validate(original_name, bytes.len())?;
        let dir = sanitize_dir(file_path, kind);
        let filename = generate_filename(&ext, now);

        let target_dir = self.resolve_dir(&dir)?;
        tokio::fs::create_dir_all(&target_dir).await?;
        tokio::fs::write(target_dir.join(&filename), bytes).await?;

        tracing::info!("Stored {} ({} bytes) under {}", filename, bytes.len(), dir);
        Ok(StoredFile {
            relative_path: format!("{}/{}", dir, filename),
            filename,
            size: bytes.len(),
            mime_type: mime_for(&ext),
        })
    }

    /// Existing file under the root; anything that would climb out is rejected
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let path = self.resolve_dir(relative)?;
        if path.is_file() {
            Ok(path)
        } else {
            Err(StorageError::NotFound)
        }
    }

    /// Target of a `/view/file/{base64}` link
    pub fn resolve_view(&self, encoded: &str) -> Result<PathBuf, StorageError> {
        let raw = STANDARD.decode(encoded.trim()).map_err(|_| StorageError::InvalidPath)?;
        let request: ViewRequest = serde_json::from_slice(&raw).map_err(|_| StorageError::InvalidPath)?;
        self.resolve(&request.path.replace("/storage", ""))
    }

    fn resolve_dir(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let mut path = self.root.clone();
        for component in Path::new(relative.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => return Err(StorageError::InvalidPath),
            }
        }
        Ok(path)
    }
}

/// Client supplied sub-directory with `..` and `\` removed; empty falls back to the kind's default
pub fn sanitize_dir(file_path: Option<&str>, kind: UploadKind) -> String {
    let cleaned = file_path.unwrap_or_default().replace("..", "").replace('\\', "");
    let cleaned = cleaned.trim_matches('/');
    if cleaned.is_empty() {
        kind.default_dir().to_string()
    } else {
        cleaned.to_string()
    }
}

/// `YYYYmmddHHMMSS_{12 alphanumerics}.{ext}`
pub fn generate_filename(ext: &str, now: NaiveDateTime) -> String {
    let suffix: String = rand::thread_rng().sample_iter(&Alphanumeric).take(12).map(char::from).collect();
    format!("{}_{}.{}", now.format("%Y%m%d%H%M%S"), suffix, ext)
}

pub fn mime_for(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "txt" => "text/plain",
        "rtf" => "application/rtf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap().and_hms_opt(14, 5, 9).unwrap()
    }

    #[test]
    fn filenames_carry_timestamp_and_random_suffix() {
        let name = generate_filename("png", now());
        let (stamp, rest) = name.split_once('_').unwrap();
        assert_eq!(stamp, "20250301140509");
        let (random, ext) = rest.split_once('.').unwrap();
        assert_eq!(random.len(), 12);
        assert!(random.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(ext, "png");
        assert_ne!(name, generate_filename("png", now()));
    }

    #[test]
    fn directories_are_sanitised() {
        assert_eq!(sanitize_dir(None, UploadKind::Image), "images");
        assert_eq!(sanitize_dir(Some(""), UploadKind::Document), "documents");
        assert_eq!(sanitize_dir(Some("../../etc"), UploadKind::Image), "etc");
        assert_eq!(sanitize_dir(Some("avatars\\..\\x"), UploadKind::Image), "avatarsx");
        assert_eq!(sanitize_dir(Some("/profile/2025/"), UploadKind::Image), "profile/2025");
    }

    #[test]
    fn validation_checks_extension_and_size() {
        assert_eq!(UploadKind::Image.validate("Photo.JPG", 10).unwrap(), "jpg");
        assert!(matches!(UploadKind::Image.validate("doc.pdf", 10), Err(StorageError::InvalidType(_))));
        assert!(matches!(UploadKind::Image.validate("noext", 10), Err(StorageError::InvalidType(_))));
        assert!(matches!(
            UploadKind::Image.validate("big.png", 5 * 1024 * 1024 + 1),
            Err(StorageError::TooLarge(_))
        ));
        assert_eq!(UploadKind::Document.validate("deck.pptx", 15 * 1024 * 1024).unwrap(), "pptx");
    }

    #[tokio::test]
    async fn save_then_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        let stored = storage
            .save(UploadKind::Document, None, "notes.txt", b"hello", now())
            .await
            .unwrap();
        assert!(stored.relative_path.starts_with("documents/20250301140509_"));
        assert_eq!(stored.size, 5);
        assert_eq!(stored.mime_type, "text/plain");

        let path = storage.resolve(&stored.relative_path).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"hello");
    }

    #[test]
    fn traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        assert!(matches!(storage.resolve("../secret"), Err(StorageError::InvalidPath)));
        assert!(matches!(storage.resolve("images/../../secret"), Err(StorageError::InvalidPath)));
        assert!(matches!(storage.resolve("images/missing.png"), Err(StorageError::NotFound)));
    }

    #[test]
    fn view_links_decode_and_strip_storage_prefix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("images")).unwrap();
        std::fs::write(dir.path().join("images/a.png"), b"png").unwrap();
        let storage = FileStorage::new(dir.path());

        let encoded = STANDARD.encode(r#"{"path":"/storage/images/a.png"}"#);
        assert_eq!(storage.resolve_view(&encoded).unwrap(), dir.path().join("images/a.png"));

        let escape = STANDARD.encode(r#"{"path":"/storage/../../etc/passwd"}"#);
        assert!(matches!(storage.resolve_view(&escape), Err(StorageError::InvalidPath)));
        assert!(matches!(storage.resolve_view("%%%"), Err(StorageError::InvalidPath)));
    }
}
