//! Core types for card extraction.

use serde::{Deserialize, Serialize};

use crate::source::ByteBuffer;

/// Discriminator value of a V2 card.
pub const SPEC_V2: &str = "chara_card_v2";

/// Discriminator value of a V3 card.
pub const SPEC_V3: &str = "chara_card_v3";

/// Schema generation a card JSON object follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardSpec {
    /// `chara_card_v2`.
    V2,
    /// `chara_card_v3`.
    V3,
    /// Pre-spec flat shape without a `spec` field.
    Legacy,
    /// A `spec` field with an unrecognized value.
    Unknown,
}

impl CardSpec {
    /// Classify a JSON value by its top-level `spec` field.
    pub fn detect(value: &serde_json::Value) -> Self {
        match value.get("spec") {
            None => CardSpec::Legacy,
            Some(serde_json::Value::String(s)) if s == SPEC_V2 => CardSpec::V2,
            Some(serde_json::Value::String(s)) if s == SPEC_V3 => CardSpec::V3,
            Some(_) => CardSpec::Unknown,
        }
    }

    /// Whether this is one of the structured spec generations.
    pub fn is_structured(&self) -> bool {
        matches!(self, CardSpec::V2 | CardSpec::V3)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CardSpec::V2 => "v2",
            CardSpec::V3 => "v3",
            CardSpec::Legacy => "legacy",
            CardSpec::Unknown => "unknown",
        }
    }
}

/// Character version as found in the wild: cards carry either a string
/// (`"1.2"`) or a bare number (`3`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CharacterVersion {
    Text(String),
    Number(serde_json::Number),
}

impl std::fmt::Display for CharacterVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CharacterVersion::Text(s) => f.write_str(s),
            CharacterVersion::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Canonical character record produced by every extraction path.
///
/// Owns all of its data; nothing borrows from the source buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedCharacterInfo {
    /// Schema generation the card was decoded from.
    pub spec: CardSpec,

    /// Version string declared by the card, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub spec_version: Option<String>,

    /// Character name. Always present, possibly empty.
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub personality: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub scenario: Option<String>,

    /// Opening line of the character.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub first_message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub creator: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub character_version: Option<CharacterVersion>,

    /// Card carries a non-empty lore book.
    pub has_lore: bool,

    /// Card carries emotion images.
    pub has_emotion: bool,

    /// Card carries additional assets.
    pub has_asset: bool,

    /// Self-contained `data:` URL of the avatar image.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub avatar_data_url: Option<String>,
}

impl NormalizedCharacterInfo {
    /// Create an empty record for the given spec.
    pub fn new(spec: CardSpec) -> Self {
        Self {
            spec,
            spec_version: None,
            name: String::new(),
            description: None,
            personality: None,
            scenario: None,
            first_message: None,
            creator: None,
            tags: Vec::new(),
            character_version: None,
            has_lore: false,
            has_emotion: false,
            has_asset: false,
            avatar_data_url: None,
        }
    }

    /// Attach an avatar data URL.
    pub fn with_avatar(mut self, data_url: impl Into<String>) -> Self {
        self.avatar_data_url = Some(data_url.into());
        self
    }

    /// Check if the record carries an avatar.
    pub fn has_avatar(&self) -> bool {
        self.avatar_data_url.is_some()
    }
}

/// Lowercased extension of a file name, without the dot. Empty when the
/// name has none.
pub fn file_extension(file_name: &str) -> String {
    let base = file_name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(file_name);
    base.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// A drained input together with the name it was submitted under.
#[derive(Debug, Clone)]
pub struct CardInput {
    /// File name as given by the caller.
    pub file_name: String,
    /// Lowercased extension used for dispatch.
    pub extension: String,
    pub buffer: ByteBuffer,
}

impl CardInput {
    pub fn new(file_name: impl Into<String>, buffer: ByteBuffer) -> Self {
        let file_name = file_name.into();
        let extension = file_extension(&file_name);
        Self {
            file_name,
            extension,
            buffer,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        self.buffer.as_slice()
    }
}
