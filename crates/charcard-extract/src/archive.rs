//! Embedded archive detection and entry lookup.
//!
//! CharX files are plain ZIP archives; JPEG cards are a JPEG body with a CharX
//! archive appended. Both are located by the first local-file-header magic.

use crate::error::ExtractResult;

/// ZIP local-file-header magic (`PK\x03\x04`).
pub const ZIP_LOCAL_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Read access to named entries of an archive region.
///
/// Implementations receive the region starting at the local-file-header
/// magic. Entry names are returned in archive order.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveReader: Send + Sync {
    /// List entry names.
    fn entry_names(&self, region: &[u8]) -> ExtractResult<Vec<String>>;

    /// Read the full contents of one entry.
    fn read_entry(&self, region: &[u8], name: &str) -> ExtractResult<Vec<u8>>;
}

/// Offset of the first archive magic anywhere in `data`.
pub fn locate_archive(data: &[u8]) -> Option<usize> {
    data.windows(ZIP_LOCAL_MAGIC.len())
        .position(|w| w == ZIP_LOCAL_MAGIC)
}

/// First entry whose name ends with `card.json`, ignoring case.
pub fn find_card_entry(names: &[String]) -> Option<&str> {
    names
        .iter()
        .map(String::as_str)
        .find(|name| name.to_ascii_lowercase().ends_with("card.json"))
}

/// Whether `name` is an icon image: `assets/`, then `icon/image/`, then a
/// `.png` suffix.
pub fn is_icon_asset(name: &str) -> bool {
    let Some(assets) = name.find("assets/") else {
        return false;
    };
    let after_assets = &name[assets + "assets/".len()..];
    let Some(icon) = after_assets.find("icon/image/") else {
        return false;
    };
    let tail = &after_assets[icon + "icon/image/".len()..];
    tail.ends_with(".png")
}

/// First icon image entry, in archive order.
pub fn find_icon_entry(names: &[String]) -> Option<&str> {
    names.iter().map(String::as_str).find(|n| is_icon_asset(n))
}

#[cfg(feature = "charx")]
pub use self::zip_reader::ZipArchiveReader;

#[cfg(feature = "charx")]
mod zip_reader {
    use std::io::{Cursor, Read};

    use super::ArchiveReader;
    use crate::error::{ExtractError, ExtractResult};

    /// [`ArchiveReader`] backed by the `zip` crate, with size bounds.
    #[derive(Debug, Clone)]
    pub struct ZipArchiveReader {
        max_entry_bytes: u64,
        max_entries: usize,
    }

    impl ZipArchiveReader {
        pub fn new(max_entry_bytes: u64, max_entries: usize) -> Self {
            Self {
                max_entry_bytes,
                max_entries,
            }
        }

        fn open<'a>(&self, region: &'a [u8]) -> ExtractResult<zip::ZipArchive<Cursor<&'a [u8]>>> {
            let archive = zip::ZipArchive::new(Cursor::new(region))?;
            if archive.len() > self.max_entries {
                return Err(ExtractError::limit(format!(
                    "archive lists {} entries, limit is {}",
                    archive.len(),
                    self.max_entries
                )));
            }
            Ok(archive)
        }
    }

    impl Default for ZipArchiveReader {
        fn default() -> Self {
            let config = crate::config::ExtractConfig::default();
            Self::new(config.max_entry_bytes, config.max_archive_entries)
        }
    }

    impl ArchiveReader for ZipArchiveReader {
        fn entry_names(&self, region: &[u8]) -> ExtractResult<Vec<String>> {
            let archive = self.open(region)?;
            Ok(archive.file_names().map(str::to_owned).collect())
        }

        fn read_entry(&self, region: &[u8], name: &str) -> ExtractResult<Vec<u8>> {
            let mut archive = self.open(region)?;
            let entry = archive.by_name(name)?;

            let mut out = Vec::new();
            entry
                .take(self.max_entry_bytes.saturating_add(1))
                .read_to_end(&mut out)
                .map_err(|e| ExtractError::corrupt(format!("failed to inflate {}: {}", name, e)))?;
            if out.len() as u64 > self.max_entry_bytes {
                return Err(ExtractError::limit(format!(
                    "entry {} exceeds {} bytes",
                    name, self.max_entry_bytes
                )));
            }
            Ok(out)
        }
    }
}
