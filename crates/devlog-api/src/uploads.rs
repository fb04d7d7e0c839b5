use anyhow::Result;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

/// URL prefix the public directory serves uploads under.
pub const UPLOADS_PREFIX: &str = "/uploads";

/// Bytes that cannot appear raw in a single URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Release archives on disk.
///
/// Each upload is stored as `{dir}/{millis}-{original name}`. Published
/// archives are never removed; only uploads from a rejected publish are.
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Upload directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn file_path(&self, stored_name: &str) -> PathBuf {
        self.dir.join(stored_name)
    }

    /// Open a fresh file for an incoming upload. The caller streams the body
    /// into it.
    pub async fn create(&self, original_name: Option<&str>) -> Result<(String, fs::File)> {
        let stored_name = stored_name(original_name, chrono::Utc::now().timestamp_millis());
        let file = fs::File::create(self.file_path(&stored_name)).await?;
        Ok((stored_name, file))
    }

    /// Delete an upload that will not be published.
    pub async fn delete(&self, stored_name: &str) -> Result<()> {
        match fs::remove_file(self.file_path(stored_name)).await {
            Ok(()) => {
                info!("Deleted upload {}", stored_name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Upload {} already gone", stored_name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// `{millis}-{name}`, keeping only the final path component of the client's name.
pub fn stored_name(original_name: Option<&str>, millis: i64) -> String {
    let name = original_name
        .and_then(|n| Path::new(n).file_name())
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("upload");

    format!("{}-{}", millis, name)
}

/// Public link for a stored upload. The name is percent-encoded as one path
/// segment.
pub fn download_url(public_url: &str, stored_name: &str) -> String {
    format!(
        "{}{}/{}",
        public_url.trim_end_matches('/'),
        UPLOADS_PREFIX,
        utf8_percent_encode(stored_name, PATH_SEGMENT)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn stored_name_strips_directories() {
        assert_eq!(stored_name(Some("editor-1.4.zip"), 42), "42-editor-1.4.zip");
        assert_eq!(stored_name(Some("../../etc/passwd"), 42), "42-passwd");
        assert_eq!(stored_name(Some(""), 42), "42-upload");
        assert_eq!(stored_name(None, 42), "42-upload");
    }

    #[test]
    fn download_url_joins_prefix() {
        assert_eq!(download_url("", "1-a.zip"), "/uploads/1-a.zip");
        assert_eq!(
            download_url("http://localhost:3000/", "1-a.zip"),
            "http://localhost:3000/uploads/1-a.zip"
        );
    }

    #[test]
    fn download_url_escapes_reserved_characters() {
        assert_eq!(
            download_url("", "7-ModelEditor#2.zip"),
            "/uploads/7-ModelEditor%232.zip"
        );
        assert_eq!(
            download_url("", "7-what? 100%.zip"),
            "/uploads/7-what%3F%20100%25.zip"
        );
        assert_eq!(download_url("", "7-bygg-åtta.zip"), "/uploads/7-bygg-%C3%A5tta.zip");
    }

    #[tokio::test]
    async fn created_upload_lands_in_dir_and_can_be_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().join("uploads")).await.unwrap();

        let (name, mut file) = store.create(Some("build.zip")).await.unwrap();
        assert!(name.ends_with("-build.zip"));
        file.write_all(b"PK\x03\x04").await.unwrap();
        file.flush().await.unwrap();
        drop(file);

        let bytes = tokio::fs::read(store.file_path(&name)).await.unwrap();
        assert_eq!(bytes, b"PK\x03\x04");

        store.delete(&name).await.unwrap();
        assert!(!store.file_path(&name).exists());
        // Deleting twice is not an error
        store.delete(&name).await.unwrap();
    }
}
