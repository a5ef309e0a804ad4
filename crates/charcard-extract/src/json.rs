//! Plain card JSON files.

use async_trait::async_trait;

use crate::card::RawCard;
use crate::error::ExtractResult;
use crate::types::{CardInput, NormalizedCharacterInfo};
use crate::CardExtractor;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parse a whole buffer as UTF-8 JSON, tolerating a leading BOM.
pub(crate) fn parse_json(bytes: &[u8]) -> ExtractResult<serde_json::Value> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = std::str::from_utf8(bytes)?;
    Ok(serde_json::from_str(text)?)
}

/// Extractor for `.json` card files: V2, V3 or legacy by the `spec` field.
#[derive(Debug, Clone, Default)]
pub struct JsonCardExtractor;

impl JsonCardExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CardExtractor for JsonCardExtractor {
    async fn extract(&self, input: &CardInput) -> ExtractResult<NormalizedCharacterInfo> {
        let value = parse_json(input.bytes())?;
        Ok(RawCard::from_value(&value)?.normalize())
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json"]
    }

    fn name(&self) -> &str {
        "json"
    }
}
