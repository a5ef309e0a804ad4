//! Extraction pipeline: the public entry point.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::ExtractConfig;
use crate::error::{ExtractError, ExtractResult};
use crate::source::ByteSource;
use crate::types::{file_extension, CardInput, NormalizedCharacterInfo};
use crate::CardExtractor;

/// Pipeline that routes inputs to card extractors by file extension.
///
/// Every extractor supporting the extension is tried in registration order;
/// the first success wins. This ordered list is the only fallback
/// mechanism: `ccv3` before `chara` for PNG, the archive path for CharX
/// and JPEG, direct parsing for JSON.
pub struct ExtractionPipeline {
    extractors: Vec<Arc<dyn CardExtractor>>,
    config: ExtractConfig,
}

impl ExtractionPipeline {
    /// Create new empty pipeline.
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
            config: ExtractConfig::default(),
        }
    }

    /// Create pipeline with all available extractors.
    pub fn with_defaults() -> Self {
        Self::with_config(ExtractConfig::default())
    }

    /// Create pipeline with all available extractors, configured.
    pub fn with_config(config: ExtractConfig) -> Self {
        Self {
            extractors: crate::ExtractorFactory::all(&config),
            config,
        }
    }

    /// Add an extractor to the end of the chain.
    pub fn add_extractor(mut self, extractor: Arc<dyn CardExtractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Recover a card, or `None` when nothing could be recovered.
    ///
    /// Never fails: unsupported extensions, unreadable sources and every
    /// decoding failure all resolve to `None`.
    ///
    /// Does not require a Tokio runtime: without one, files are read and
    /// archives unpacked on the calling thread. A `ByteSource::Reader` whose
    /// stream depends on a runtime still needs one.
    pub async fn extract(
        &self,
        file_name: &str,
        source: ByteSource,
    ) -> Option<NormalizedCharacterInfo> {
        match self.try_extract(file_name, source).await {
            Ok(card) => Some(card),
            Err(e) => {
                debug!(
                    code = e.kind().as_str(),
                    "No card recovered from {}: {}", file_name, e
                );
                None
            }
        }
    }

    /// Recover a card from a file on disk, named after its path.
    pub async fn extract_path(&self, path: impl AsRef<Path>) -> Option<NormalizedCharacterInfo> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.extract(&file_name, ByteSource::Path(path.to_path_buf()))
            .await
    }

    /// Like [`extract`](Self::extract), but reports why nothing was
    /// recovered. When every extractor fails, the last one's error is
    /// returned.
    pub async fn try_extract(
        &self,
        file_name: &str,
        source: ByteSource,
    ) -> ExtractResult<NormalizedCharacterInfo> {
        let extension = file_extension(file_name);
        let chain: Vec<&Arc<dyn CardExtractor>> = self
            .extractors
            .iter()
            .filter(|e| e.supports(&extension))
            .collect();

        if chain.is_empty() {
            return Err(ExtractError::UnsupportedFormat(if extension.is_empty() {
                file_name.to_string()
            } else {
                format!(".{}", extension)
            }));
        }

        let buffer = source.into_buffer(self.config.max_input_bytes).await?;
        let input = CardInput::new(file_name, buffer);

        let mut last_error = None;
        for extractor in chain {
            match extractor.extract(&input).await {
                Ok(card) => {
                    info!(
                        extractor = extractor.name(),
                        spec = card.spec.as_str(),
                        "Recovered card '{}' from {}",
                        card.name,
                        file_name
                    );
                    return Ok(card);
                }
                Err(e) => {
                    debug!(
                        extractor = extractor.name(),
                        code = e.kind().as_str(),
                        "Extractor failed on {}: {}",
                        file_name,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ExtractError::UnsupportedFormat(extension)))
    }

    /// Check if pipeline can handle a given extension.
    pub fn supports(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        self.extractors.iter().any(|e| e.supports(&extension))
    }

    /// List all supported extensions, deduplicated, in chain order.
    pub fn supported_extensions(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for ext in self
            .extractors
            .iter()
            .flat_map(|e| e.supported_extensions().iter().copied())
        {
            if !out.contains(&ext) {
                out.push(ext);
            }
        }
        out
    }

    /// Get the number of registered extractors.
    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    /// Check if the pipeline has no registered extractors.
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

impl Default for ExtractionPipeline {
    fn default() -> Self {
        Self::with_defaults()
    }
}
