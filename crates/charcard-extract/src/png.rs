//! PNG card extraction via marker scanning.
//!
//! Two extractors are registered for `.png`, one per marker. The pipeline
//! tries `ccv3` first and falls back to `chara`.

use async_trait::async_trait;

use crate::avatar::{to_data_url, ImageMime};
use crate::card::RawCard;
use crate::config::DEFAULT_MAX_PAYLOAD_CHARS;
use crate::error::{ExtractError, ExtractResult};
use crate::scan::{decode_payload, marker_payload, Marker, MarkerLayout, MarkerPayload};
use crate::types::{CardInput, NormalizedCharacterInfo};
use crate::CardExtractor;

/// Extractor for a card embedded after one marker literal.
///
/// The `ccv3` variant accepts only V2/V3 payloads. The `chara` variant
/// also reads legacy flat cards and refuses payloads with the reserved
/// `rcc||` prefix outright.
#[derive(Debug, Clone)]
pub struct MarkerExtractor {
    marker: Marker,
    max_payload_chars: usize,
    include_avatar: bool,
}

impl MarkerExtractor {
    /// Create extractor for the given marker with default settings.
    pub fn new(marker: Marker) -> Self {
        Self {
            marker,
            max_payload_chars: DEFAULT_MAX_PAYLOAD_CHARS,
            include_avatar: true,
        }
    }

    /// Extractor for the `ccv3` marker.
    pub fn ccv3() -> Self {
        Self::new(Marker::Ccv3)
    }

    /// Extractor for the `chara` marker.
    pub fn chara() -> Self {
        Self::new(Marker::Chara)
    }

    /// Configure the base64 collection cap.
    pub fn with_max_payload_chars(mut self, max: usize) -> Self {
        self.max_payload_chars = max;
        self
    }

    /// Configure whether the carrier PNG becomes the avatar.
    pub fn with_avatar(mut self, include: bool) -> Self {
        self.include_avatar = include;
        self
    }

    pub fn marker(&self) -> Marker {
        self.marker
    }

    fn decode(&self, data: &[u8]) -> ExtractResult<RawCard> {
        let layout = MarkerLayout::locate(data);
        let pos = layout.position(self.marker).ok_or_else(|| {
            ExtractError::malformed(format!("no {} marker before IEND", self.marker.as_str()))
        })?;

        let run = match marker_payload(
            data,
            self.marker,
            pos,
            layout.boundary,
            self.max_payload_chars,
        ) {
            MarkerPayload::Encoded(run) => run,
            MarkerPayload::Reserved => {
                return Err(ExtractError::schema("reserved non-card payload"));
            }
        };

        let value = decode_payload(run)?;
        match self.marker {
            Marker::Ccv3 => RawCard::structured(&value),
            Marker::Chara => {
                RawCard::structured(&value).or_else(|_| RawCard::legacy_fallback(&value))
            }
        }
    }
}

#[async_trait]
impl CardExtractor for MarkerExtractor {
    async fn extract(&self, input: &CardInput) -> ExtractResult<NormalizedCharacterInfo> {
        let data = input.bytes();
        let info = self.decode(data)?.normalize();

        // The carrier image is the avatar.
        if self.include_avatar {
            Ok(info.with_avatar(to_data_url(data, ImageMime::Png)))
        } else {
            Ok(info)
        }
    }

    fn supported_extensions(&self) -> &[&str] {
        &["png"]
    }

    fn name(&self) -> &str {
        match self.marker {
            Marker::Ccv3 => "png-ccv3",
            Marker::Chara => "png-chara",
        }
    }
}
