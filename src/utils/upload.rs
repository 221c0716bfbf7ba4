// utils/upload.rs
use std::path::{Path, PathBuf};

use uuid::Uuid;

pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Accepted extensions and the MIME types a client may declare for each.
const ALLOWED_TYPES: &[(&str, &[&str])] = &[
    ("jpeg", &["image/jpeg"]),
    ("jpg", &["image/jpeg"]),
    ("png", &["image/png"]),
    ("pdf", &["application/pdf"]),
    ("doc", &["application/msword"]),
    (
        "docx",
        &["application/vnd.openxmlformats-officedocument.wordprocessingml.document"],
    ),
    (
        "zip",
        &["application/zip", "application/x-zip-compressed", "application/octet-stream"],
    ),
    (
        "rar",
        &["application/vnd.rar", "application/x-rar-compressed", "application/octet-stream"],
    ),
    ("txt", &["text/plain"]),
    ("psd", &["image/vnd.adobe.photoshop", "application/octet-stream"]),
    (
        "ai",
        &["application/postscript", "application/illustrator", "application/pdf", "application/octet-stream"],
    ),
    ("fig", &["application/octet-stream"]),
];

pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '_' || *c == '-')
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Checks size, extension and declared MIME type. Returns the normalised extension.
pub fn validate_upload(file_name: &str, mime_type: &str, size: usize) -> Result<String, String> {
    if size == 0 {
        return Err("Uploaded file is empty".to_string());
    }
    if size > MAX_UPLOAD_BYTES {
        return Err("File exceeds the 50MB limit".to_string());
    }

    let extension = extension_of(file_name)
        .ok_or_else(|| "File must have an extension".to_string())?;
    let mime = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let (_, mimes) = ALLOWED_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .ok_or_else(|| format!("File type .{} is not allowed", extension))?;

    if !mimes.contains(&mime.as_str()) {
        return Err(format!(
            "Declared content type {} does not match .{} files",
            mime, extension
        ));
    }

    Ok(extension)
}

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub path: String,
    pub file_name: String,
    pub size: i64,
    pub mime_type: String,
}

/// Local disk storage for submitted work, one directory per project.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn save(
        &self,
        project_id: Uuid,
        original_name: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> std::io::Result<StoredFile> {
        let file_name = sanitize_file_name(original_name);
        let dir = self.root.join(project_id.to_string());
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(format!("{}_{}", Uuid::new_v4().simple(), file_name));
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!("Stored upload {} ({} bytes)", path.display(), bytes.len());

        Ok(StoredFile {
            path: path.to_string_lossy().into_owned(),
            file_name,
            size: bytes.len() as i64,
            mime_type: mime_type.to_string(),
        })
    }

    pub async fn read(&self, path: &str) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    pub async fn remove(&self, path: &str) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!("Failed to remove orphaned upload {}: {}", path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_matching_extension_and_mime() {
        assert_eq!(validate_upload("Logo.PNG", "image/png", 1024), Ok("png".to_string()));
        assert_eq!(validate_upload("brief.pdf", "application/pdf", 10), Ok("pdf".to_string()));
        assert_eq!(
            validate_upload("notes.txt", "text/plain; charset=utf-8", 10),
            Ok("txt".to_string())
        );
        assert_eq!(
            validate_upload("design.fig", "application/octet-stream", 10),
            Ok("fig".to_string())
        );
    }

    #[test]
    fn test_rejects_mismatched_mime() {
        assert!(validate_upload("photo.jpg", "application/pdf", 10).is_err());
        assert!(validate_upload("archive.zip", "image/png", 10).is_err());
    }

    #[test]
    fn test_rejects_unknown_extension() {
        let err = validate_upload("payload.exe", "application/octet-stream", 10).unwrap_err();
        assert_eq!(err, "File type .exe is not allowed");
        assert!(validate_upload("README", "text/plain", 10).is_err());
    }

    #[test]
    fn test_enforces_size_limits() {
        assert!(validate_upload("a.png", "image/png", 0).is_err());
        assert!(validate_upload("a.png", "image/png", MAX_UPLOAD_BYTES).is_ok());
        assert!(validate_upload("a.png", "image/png", MAX_UPLOAD_BYTES + 1).is_err());
    }

    #[test]
    fn test_sanitize_strips_paths() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\work\\final logo.png"), "finallogo.png");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name("///"), "upload");
    }

    #[tokio::test]
    async fn test_store_round_trip() {
        let root = std::env::temp_dir().join(format!("skill-vault-test-{}", Uuid::new_v4()));
        let store = FileStore::new(&root);
        let project = Uuid::new_v4();

        let stored = store.save(project, "draft v1.png", "image/png", b"png-bytes").await.unwrap();
        assert_eq!(stored.file_name, "draftv1.png");
        assert_eq!(stored.size, 9);
        assert!(stored.path.contains(&project.to_string()));
        assert_eq!(store.read(&stored.path).await.unwrap(), b"png-bytes");

        store.remove(&stored.path).await;
        assert!(store.read(&stored.path).await.is_err());
        let _ = tokio::fs::remove_dir_all(root).await;
    }
}
