/// Avatar file storage
///
/// Files live under `<upload_dir>/avatars/` and are served at
/// `/uploads/avatars/<file>`. Only the public path is stored on the user.

use bytes::Bytes;
use rand::Rng;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Largest accepted avatar, in bytes (5 MiB)
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// URL prefix avatars are served under
pub const PUBLIC_PREFIX: &str = "/uploads/avatars/";

/// Error type for avatar storage
#[derive(Debug, thiserror::Error)]
pub enum AvatarError {
    #[error("Only JPEG, PNG and GIF images are allowed.")]
    UnsupportedType,

    #[error("Avatar must be at most 5 MB.")]
    TooLarge,

    #[error("No file uploaded.")]
    Empty,

    #[error("Avatar storage failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Accepted image kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
}

impl ImageKind {
    /// Resolves the kind from a MIME type, falling back to the file extension
    pub fn detect(content_type: Option<&str>, file_name: Option<&str>) -> Option<Self> {
        let by_mime = content_type.and_then(|ct| match ct.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(ImageKind::Jpeg),
            "image/png" => Some(ImageKind::Png),
            "image/gif" => Some(ImageKind::Gif),
            _ => None,
        });

        by_mime.or_else(|| {
            let ext = Path::new(file_name?).extension()?.to_str()?.to_ascii_lowercase();
            match ext.as_str() {
                "jpg" | "jpeg" => Some(ImageKind::Jpeg),
                "png" => Some(ImageKind::Png),
                "gif" => Some(ImageKind::Gif),
                _ => None,
            }
        })
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Gif => "gif",
        }
    }
}

/// Writes and removes avatar files under an upload root
#[derive(Debug, Clone)]
pub struct AvatarStore {
    root: PathBuf,
}

impl AvatarStore {
    /// `upload_dir` is the directory served at `/uploads`
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: upload_dir.into(),
        }
    }

    fn avatar_dir(&self) -> PathBuf {
        self.root.join("avatars")
    }

    /// Stores an uploaded image and returns its public path
    ///
    /// # Errors
    ///
    /// `Empty`, `TooLarge` or `UnsupportedType` for rejected uploads; `Io`
    /// if the file cannot be written.
    pub async fn save(
        &self,
        content_type: Option<&str>,
        file_name: Option<&str>,
        data: Bytes,
    ) -> Result<String, AvatarError> {
        if data.is_empty() {
            return Err(AvatarError::Empty);
        }
        if data.len() > MAX_AVATAR_BYTES {
            return Err(AvatarError::TooLarge);
        }
        let kind = ImageKind::detect(content_type, file_name).ok_or(AvatarError::UnsupportedType)?;

        let file_name = format!(
            "avatar-{}-{}.{}",
            chrono::Utc::now().timestamp_millis(),
            rand::thread_rng().gen_range(0..1_000_000_000u32),
            kind.extension()
        );

        let dir = self.avatar_dir();
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&file_name), &data).await?;

        debug!(file = %file_name, bytes = data.len(), "Avatar stored");
        Ok(format!("{}{}", PUBLIC_PREFIX, file_name))
    }

    /// Deletes the file behind a public avatar path
    ///
    /// Paths outside the avatar directory and already missing files are
    /// ignored.
    pub async fn remove(&self, public_path: &str) -> Result<(), AvatarError> {
        let Some(file_name) = public_path.strip_prefix(PUBLIC_PREFIX) else {
            warn!(path = %public_path, "Ignoring avatar path outside upload directory");
            return Ok(());
        };
        if file_name.is_empty() || file_name.contains(|c: char| c == '/' || c == '\\') || file_name.contains("..") {
            warn!(path = %public_path, "Ignoring malformed avatar path");
            return Ok(());
        }

        match tokio::fs::remove_file(self.avatar_dir().join(file_name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Filesystem location of a public avatar path, if it is one
    pub fn resolve(&self, public_path: &str) -> Option<PathBuf> {
        let file_name = public_path.strip_prefix(PUBLIC_PREFIX)?;
        Some(self.avatar_dir().join(file_name))
    }
}
