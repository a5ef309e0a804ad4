//! Factory for creating card extractors.

use std::sync::Arc;

use crate::config::ExtractConfig;
use crate::error::{ExtractError, ExtractResult};
use crate::json::JsonCardExtractor;
use crate::png::MarkerExtractor;
use crate::CardExtractor;

#[cfg(feature = "charx")]
use crate::archive::{ArchiveReader, ZipArchiveReader};
#[cfg(feature = "charx")]
use crate::CharxExtractor;

/// Factory for creating card extractors.
pub struct ExtractorFactory;

impl ExtractorFactory {
    /// Create a plain JSON card extractor.
    pub fn json() -> Arc<dyn CardExtractor> {
        Arc::new(JsonCardExtractor::new())
    }

    /// Create the PNG `ccv3` marker extractor.
    pub fn png_ccv3(config: &ExtractConfig) -> Arc<dyn CardExtractor> {
        Arc::new(
            MarkerExtractor::ccv3()
                .with_max_payload_chars(config.max_payload_chars)
                .with_avatar(config.include_avatar),
        )
    }

    /// Create the PNG `chara` marker extractor.
    pub fn png_chara(config: &ExtractConfig) -> Arc<dyn CardExtractor> {
        Arc::new(
            MarkerExtractor::chara()
                .with_max_payload_chars(config.max_payload_chars)
                .with_avatar(config.include_avatar),
        )
    }

    /// Create the CharX extractor, bounded by the configured archive limits.
    #[cfg(feature = "charx")]
    pub fn charx(config: &ExtractConfig) -> Arc<dyn CardExtractor> {
        let reader = ZipArchiveReader::new(config.max_entry_bytes, config.max_archive_entries);
        Self::charx_with_reader(Arc::new(reader), config)
    }

    /// Create the CharX extractor with a custom archive reader.
    #[cfg(feature = "charx")]
    pub fn charx_with_reader(
        reader: Arc<dyn ArchiveReader>,
        config: &ExtractConfig,
    ) -> Arc<dyn CardExtractor> {
        Arc::new(CharxExtractor::with_reader(reader).with_avatar(config.include_avatar))
    }

    /// Create the extractors for a given file extension, in fallback order.
    pub fn for_extension(
        extension: &str,
        config: &ExtractConfig,
    ) -> ExtractResult<Vec<Arc<dyn CardExtractor>>> {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        let chain: Vec<Arc<dyn CardExtractor>> = Self::all(config)
            .into_iter()
            .filter(|e| e.supports(&extension))
            .collect();

        if chain.is_empty() {
            return Err(ExtractError::UnsupportedFormat(format!(".{}", extension)));
        }
        Ok(chain)
    }

    /// Get all available extractors, in dispatch order.
    #[allow(clippy::vec_init_then_push)]
    pub fn all(config: &ExtractConfig) -> Vec<Arc<dyn CardExtractor>> {
        let mut extractors: Vec<Arc<dyn CardExtractor>> = Vec::new();

        extractors.push(Self::json());
        extractors.push(Self::png_ccv3(config));
        extractors.push(Self::png_chara(config));

        #[cfg(feature = "charx")]
        extractors.push(Self::charx(config));

        extractors
    }
}
