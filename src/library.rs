// SPDX-License-Identifier: MPL-2.0

//! Photo library
//!
//! Saved photos go to a directory under the XDG pictures dir
//! (`~/Pictures/snapcam` by default). Files are named after the save time and
//! never overwrite an existing photo.

use crate::constants::{PHOTO_DIR_NAME, PHOTO_FILE_PREFIX};
use crate::errors::SaveError;
use image::ImageFormat;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Destination for saved photos
///
/// Writes are blocking; callers run them on the worker context.
pub trait PhotoLibrary: Send + Sync {
    /// Store already encoded photo bytes and return where they ended up
    fn write(&self, bytes: &[u8], format: ImageFormat) -> Result<PathBuf, SaveError>;
}

/// Photo library backed by a directory on disk
#[derive(Debug, Clone)]
pub struct PicturesLibrary {
    dir: PathBuf,
}

impl PicturesLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Library in the configured directory, or the default one
    pub fn from_config(save_directory: Option<&str>) -> Self {
        match save_directory.filter(|dir| !dir.trim().is_empty()) {
            Some(dir) => Self::new(dir),
            None => Self::new(default_photo_dir()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl PhotoLibrary for PicturesLibrary {
    fn write(&self, bytes: &[u8], format: ImageFormat) -> Result<PathBuf, SaveError> {
        std::fs::create_dir_all(&self.dir)?;

        let extension = format.extensions_str().first().copied().unwrap_or("jpg");
        let stem = photo_file_stem(&chrono::Local::now());

        for attempt in 0u32.. {
            let filename = if attempt == 0 {
                format!("{}.{}", stem, extension)
            } else {
                format!("{}_{}.{}", stem, attempt, extension)
            };
            let path = self.dir.join(filename);

            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "Photo name taken, trying next");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            file.write_all(bytes)?;
            file.sync_all()?;

            info!(path = %path.display(), size = bytes.len(), "Photo saved");
            return Ok(path);
        }

        Err(SaveError::Write("No free file name".to_string()))
    }
}

/// Library that writes the photo to one fixed path
///
/// Used by `snapcam photo --output FILE`. The file is replaced if it exists,
/// and the extension must match the photo's format.
#[derive(Debug, Clone)]
pub struct FileTarget {
    path: PathBuf,
}

impl FileTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PhotoLibrary for FileTarget {
    fn write(&self, bytes: &[u8], format: ImageFormat) -> Result<PathBuf, SaveError> {
        let matches = self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                format
                    .extensions_str()
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            });
        if !matches {
            return Err(SaveError::Write(format!(
                "{} does not have a {:?} extension",
                self.path.display(),
                format
            )));
        }

        std::fs::write(&self.path, bytes)?;
        info!(path = %self.path.display(), size = bytes.len(), "Photo saved");
        Ok(self.path.clone())
    }
}

/// `~/Pictures/snapcam`, falling back to the home directory
pub fn default_photo_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(PHOTO_DIR_NAME)
}

/// `IMG_YYYYMMDD_HHMMSS`
pub fn photo_file_stem(time: &chrono::DateTime<chrono::Local>) -> String {
    format!("{}_{}", PHOTO_FILE_PREFIX, time.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "snapcam-library-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_file_stem_format() {
        let time = chrono::Local
            .with_ymd_and_hms(2024, 3, 9, 7, 5, 1)
            .unwrap();
        assert_eq!(photo_file_stem(&time), "IMG_20240309_070501");
    }

    #[test]
    fn test_write_never_overwrites() {
        let dir = temp_dir("collide");
        let library = PicturesLibrary::new(&dir);

        let first = library.write(b"one", ImageFormat::Jpeg).unwrap();
        let second = library.write(b"two", ImageFormat::Jpeg).unwrap();

        assert_ne!(first, second);
        assert_eq!(std::fs::read(&first).unwrap(), b"one");
        assert_eq!(std::fs::read(&second).unwrap(), b"two");
        assert_eq!(first.extension().unwrap(), "jpg");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_png_extension() {
        let dir = temp_dir("png");
        let path = PicturesLibrary::new(&dir)
            .write(b"png", ImageFormat::Png)
            .unwrap();
        assert_eq!(path.extension().unwrap(), "png");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_target_checks_extension() {
        let dir = temp_dir("target");
        std::fs::create_dir_all(&dir).unwrap();

        let png = FileTarget::new(dir.join("shot.png"));
        assert!(matches!(
            png.write(b"jpeg bytes", ImageFormat::Jpeg),
            Err(SaveError::Write(_))
        ));
        assert!(!dir.join("shot.png").exists());

        let jpeg = FileTarget::new(dir.join("shot.JPG"));
        let path = jpeg.write(b"jpeg bytes", ImageFormat::Jpeg).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"jpeg bytes");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_blank_config_dir_uses_default() {
        let library = PicturesLibrary::from_config(Some("  "));
        assert!(library.dir().ends_with(PHOTO_DIR_NAME));
    }
}
