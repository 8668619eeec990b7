//! Filesystem storage for user-uploaded song photos.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::fs;
use uuid::Uuid;

/// Directory under the media root; mirrored in the URL space, so a stored
/// path `song_photos/<name>` is served at `/media/song_photos/<name>`.
const SONG_PHOTO_DIR: &str = "song_photos";

#[derive(Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist an uploaded photo and return the media-relative path to store
    /// on the song row. A random prefix keeps concurrent uploads of files
    /// with the same name from clobbering each other.
    pub async fn save_song_photo(
        &self,
        original_name: &str,
        bytes: &[u8],
    ) -> anyhow::Result<String> {
        let dir = self.root.join(SONG_PHOTO_DIR);
        fs::create_dir_all(&dir)
            .await
            .context("failed to create media directory")?;

        let file_name = format!("{}_{}", Uuid::new_v4(), sanitize_file_name(original_name));
        let path = dir.join(&file_name);
        fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(format!("{SONG_PHOTO_DIR}/{file_name}"))
    }
}

/// Reduce a client-supplied file name to characters safe in both file
/// systems and URLs. The output is pure ASCII.
fn sanitize_file_name(name: &str) -> String {
    let mut cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.len() > 80 {
        // Keep the tail so the extension survives.
        cleaned = cleaned[cleaned.len() - 80..].to_string();
    }
    if cleaned.trim_matches(['.', '_']).is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
