//! charcard-extract - Character card recovery from image and archive containers.
//!
//! Recovers character metadata (name, description, personality, scenario,
//! opening line, tags, avatar) from:
//!
//! - PNG images carrying a base64 card after a `ccv3` or `chara` marker
//! - CharX archives, and JPEG images with a CharX archive appended
//! - Plain card JSON files
//!
//! and normalizes V2, V3 and legacy card schemas into one
//! [`NormalizedCharacterInfo`].
//!
//! # Features
//!
//! - `charx` (default) - CharX / appended archive reading via `zip`
//!
//! # Example
//!
//! ```ignore
//! use charcard_extract::{ByteSource, ExtractionPipeline};
//!
//! let pipeline = ExtractionPipeline::with_defaults();
//! if let Some(card) = pipeline.extract("aria.png", ByteSource::from(png_bytes)).await {
//!     println!("{} ({})", card.name, card.spec.as_str());
//! }
//! ```

mod avatar;
mod card;
mod config;
mod error;
mod factory;
mod json;
mod pipeline;
mod png;
mod source;
mod types;

pub mod archive;
pub mod scan;

#[cfg(feature = "charx")]
mod charx;

pub use avatar::{decode_data_url, to_data_url, ImageMime};
pub use card::{
    CardAsset, CardData, CardExtensions, CharacterBook, LegacyCard, RawCard, RisuExtension, SpecCard,
};
pub use config::{ExtractConfig, ExtractConfigBuilder, DEFAULT_MAX_PAYLOAD_CHARS};
pub use error::{ErrorKind, ExtractError, ExtractResult};
pub use factory::ExtractorFactory;
pub use json::JsonCardExtractor;
pub use pipeline::ExtractionPipeline;
pub use png::MarkerExtractor;
pub use source::{ByteBuffer, ByteSource};
pub use types::{
    file_extension, CardInput, CardSpec, CharacterVersion, NormalizedCharacterInfo, SPEC_V2,
    SPEC_V3,
};

#[cfg(feature = "charx")]
pub use charx::CharxExtractor;

use async_trait::async_trait;

/// Core CardExtractor trait - every container strategy implements this.
///
/// Each implementation is one independent parse attempt; the pipeline runs
/// the attempts that support an input's extension in registration order.
#[async_trait]
pub trait CardExtractor: Send + Sync {
    /// Recover a card from a drained input.
    async fn extract(&self, input: &CardInput) -> ExtractResult<NormalizedCharacterInfo>;

    /// Lowercase file extensions (without dot) this extractor handles.
    fn supported_extensions(&self) -> &[&str];

    /// Check if this extractor handles the given extension.
    fn supports(&self, extension: &str) -> bool {
        self.supported_extensions().contains(&extension)
    }

    /// Human-readable name for this extractor.
    fn name(&self) -> &str;
}

/// Run the default pipeline once. Never fails; `None` means nothing was
/// recovered.
pub async fn extract(file_name: &str, source: ByteSource) -> Option<NormalizedCharacterInfo> {
    ExtractionPipeline::with_defaults()
        .extract(file_name, source)
        .await
}
