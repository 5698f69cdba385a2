/// Uploaded image storage
///
/// Files live under `MEDIA_ROOT/posts/`; the database keeps the path relative
/// to the media root (`posts/<name>`), which is also the `/media/` URL tail.
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::path::{Component, Path, PathBuf};

use crate::error::Result;

pub const UPLOAD_DIR: &str = "posts";
pub const MEDIA_URL: &str = "/media/";
const CLASH_SUFFIX_LEN: usize = 7;
/// Longest stored file name before a clash suffix is added.
pub const MAX_NAME_LEN: usize = 100;
const MAX_EXT_LEN: usize = 10;

#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store an upload and return its path relative to the media root.
    pub async fn save(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        let dir = self.root.join(UPLOAD_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let name = available_name(&dir, &sanitize_filename(filename)).await;
        tokio::fs::write(dir.join(&name), bytes).await?;

        let relative = format!("{}/{}", UPLOAD_DIR, name);
        tracing::debug!(path = %relative, size = bytes.len(), "stored upload");
        Ok(relative)
    }

    /// Delete a stored upload; used when the row referencing it was not written.
    pub async fn remove(&self, relative: &str) {
        let Some(path) = self.resolve(relative) else {
            return;
        };
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!(path = %relative, "failed to remove orphaned upload: {}", e);
        }
    }

    /// Map a `/media/` URL tail to a file under the root; `None` when the
    /// tail tries to leave it.
    pub fn resolve(&self, tail: &str) -> Option<PathBuf> {
        if tail.is_empty() || tail.contains('\\') {
            return None;
        }
        let relative = Path::new(tail);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

/// URL of a stored media path.
pub fn media_url(relative: &str) -> String {
    format!("{}{}", MEDIA_URL, relative)
}

/// Keep the base name and replace anything outside `[A-Za-z0-9._-]`.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        truncate_name(cleaned)
    }
}

/// Shorten an ASCII name to `MAX_NAME_LEN`, keeping a short extension.
fn truncate_name(name: &str) -> String {
    if name.len() <= MAX_NAME_LEN {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() <= MAX_EXT_LEN => {
            let keep = MAX_NAME_LEN - ext.len() - 1;
            format!("{}.{}", &stem[..stem.len().min(keep)], ext)
        }
        _ => name[..MAX_NAME_LEN].to_string(),
    }
}

/// `name`, or `stem_XXXXXXX.ext` when `name` is already taken in `dir`.
async fn available_name(dir: &Path, name: &str) -> String {
    let mut candidate = name.to_string();
    while tokio::fs::try_exists(dir.join(&candidate))
        .await
        .unwrap_or(false)
    {
        candidate = with_suffix(name, &random_suffix());
    }
    candidate
}

fn with_suffix(name: &str, suffix: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, suffix, ext),
        _ => format!("{}_{}", name, suffix),
    }
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CLASH_SUFFIX_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories_and_odd_chars() {
        assert_eq!(sanitize_filename("small.gif"), "small.gif");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\photos\\my cat.png"), "my_cat.png");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename(""), "upload");
    }

    #[test]
    fn long_names_are_truncated_keeping_extension() {
        let long = format!("{}.gif", "b".repeat(300));
        let name = sanitize_filename(&long);
        assert_eq!(name.len(), MAX_NAME_LEN);
        assert!(name.ends_with(".gif"));

        let no_ext = sanitize_filename(&"c".repeat(300));
        assert_eq!(no_ext.len(), MAX_NAME_LEN);

        let stored = format!("{}/{}", UPLOAD_DIR, with_suffix(&name, &random_suffix()));
        assert!(stored.len() <= 255);
    }

    #[test]
    fn suffix_goes_before_extension() {
        assert_eq!(with_suffix("cat.gif", "abcdefg"), "cat_abcdefg.gif");
        assert_eq!(with_suffix("cat", "abcdefg"), "cat_abcdefg");
        assert_eq!(random_suffix().len(), CLASH_SUFFIX_LEN);
    }

    #[test]
    fn resolve_rejects_traversal() {
        let storage = MediaStorage::new("/srv/media");
        assert_eq!(
            storage.resolve("posts/cat.gif"),
            Some(PathBuf::from("/srv/media/posts/cat.gif"))
        );
        assert_eq!(storage.resolve("../secret"), None);
        assert_eq!(storage.resolve("/etc/passwd"), None);
        assert_eq!(storage.resolve("posts\\..\\x"), None);
        assert_eq!(storage.resolve(""), None);
    }

    #[tokio::test]
    async fn clashing_names_get_a_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path());

        let first = storage.save("small.gif", b"GIF89a").await.unwrap();
        let second = storage.save("small.gif", b"GIF89a").await.unwrap();

        assert_eq!(first, "posts/small.gif");
        assert_ne!(first, second);
        assert!(second.starts_with("posts/small_"));
        assert!(second.ends_with(".gif"));
        assert!(dir.path().join(&second).exists());
        assert_eq!(media_url(&first), "/media/posts/small.gif");
    }

    #[tokio::test]
    async fn remove_deletes_stored_upload() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path());

        let stored = storage.save("small.gif", b"GIF89a").await.unwrap();
        storage.remove(&stored).await;
        assert!(!dir.path().join(&stored).exists());

        storage.remove("posts/missing.gif").await;
        storage.remove("../outside.gif").await;
    }
}
