//! CharX and JPEG-with-appended-CharX extraction.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::archive::{
    find_card_entry, find_icon_entry, locate_archive, ArchiveReader, ZipArchiveReader,
};
use crate::avatar::{to_data_url, ImageMime};
use crate::card::RawCard;
use crate::error::{ExtractError, ExtractResult};
use crate::json::parse_json;
use crate::types::{CardInput, NormalizedCharacterInfo};
use crate::CardExtractor;

/// Extractor for archive-packaged cards.
///
/// Reads the first `*card.json` entry (V2/V3 only) and picks the avatar from
/// an `assets/**/icon/image/*.png` entry, else the JPEG body preceding the
/// archive, else the whole file. Decompression runs on a blocking worker.
pub struct CharxExtractor {
    reader: Arc<dyn ArchiveReader>,
    include_avatar: bool,
}

impl CharxExtractor {
    /// Create extractor backed by the zip reader with default limits.
    pub fn new() -> Self {
        Self::with_reader(Arc::new(ZipArchiveReader::default()))
    }

    /// Create extractor with a custom archive reader.
    pub fn with_reader(reader: Arc<dyn ArchiveReader>) -> Self {
        Self {
            reader,
            include_avatar: true,
        }
    }

    /// Configure whether the avatar is materialized.
    pub fn with_avatar(mut self, include: bool) -> Self {
        self.include_avatar = include;
        self
    }

    /// Read the card synchronously (called within spawn_blocking).
    fn extract_sync(
        reader: &dyn ArchiveReader,
        data: &[u8],
        jpeg_carrier: bool,
        include_avatar: bool,
    ) -> ExtractResult<NormalizedCharacterInfo> {
        let offset = locate_archive(data)
            .ok_or_else(|| ExtractError::malformed("no archive header found"))?;
        let region = &data[offset..];

        let names = reader.entry_names(region)?;
        let card_name = find_card_entry(&names)
            .ok_or_else(|| ExtractError::malformed("archive has no card.json entry"))?;
        let value = parse_json(&reader.read_entry(region, card_name)?)?;
        let info = RawCard::structured(&value)?.normalize();

        if !include_avatar {
            return Ok(info);
        }

        if let Some(icon) = find_icon_entry(&names) {
            match reader.read_entry(region, icon) {
                Ok(bytes) => return Ok(info.with_avatar(to_data_url(&bytes, ImageMime::Png))),
                Err(e) => debug!("Icon entry {} unreadable, falling back: {}", icon, e),
            }
        }

        let avatar = if jpeg_carrier && offset > 0 {
            &data[..offset]
        } else {
            data
        };
        Ok(info.with_avatar(to_data_url(avatar, ImageMime::Jpeg)))
    }
}

impl Default for CharxExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CardExtractor for CharxExtractor {
    async fn extract(&self, input: &CardInput) -> ExtractResult<NormalizedCharacterInfo> {
        let buffer = input.buffer.clone();
        let reader = Arc::clone(&self.reader);
        let jpeg_carrier = matches!(input.extension.as_str(), "jpg" | "jpeg");
        let include_avatar = self.include_avatar;

        // Without a Tokio runtime there is no blocking pool to hand off to.
        if tokio::runtime::Handle::try_current().is_err() {
            return Self::extract_sync(reader.as_ref(), &buffer, jpeg_carrier, include_avatar);
        }

        tokio::task::spawn_blocking(move || {
            Self::extract_sync(reader.as_ref(), &buffer, jpeg_carrier, include_avatar)
        })
        .await?
    }

    fn supported_extensions(&self) -> &[&str] {
        &["charx", "jpg", "jpeg"]
    }

    fn name(&self) -> &str {
        "charx"
    }
}
