//! Card schemas and normalization into [`NormalizedCharacterInfo`].
//!
//! Three shapes are understood:
//!
//! - V2 (`chara_card_v2`): fields under `data`, vendor extensions under
//!   `data.extensions.risuai`.
//! - V3 (`chara_card_v3`): fields under `data`, typed `data.assets` list.
//! - Legacy: pre-spec cards with the same fields at the top level.
//!
//! Decoding is lenient per field: a field of the wrong JSON type reads as
//! absent instead of rejecting the whole card.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{ExtractError, ExtractResult};
use crate::types::{CardSpec, CharacterVersion, NormalizedCharacterInfo};

/// Top-level keys that identify a legacy flat card.
const LEGACY_FIELDS: &[&str] = &["name", "description", "personality", "scenario", "first_mes"];

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect()),
        _ => Ok(Vec::new()),
    }
}

/// Lore book section; only entry presence matters here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CharacterBook {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub entries: Vec<Value>,
}

/// Typed asset of a V3 card.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardAsset {
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub uri: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub ext: Option<String>,
}

impl CardAsset {
    fn is(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }
}

/// RisuAI vendor extension block of a V2 card.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RisuExtension {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub emotions: Vec<Value>,
    #[serde(rename = "additionalAssets", default, deserialize_with = "lenient_vec")]
    pub additional_assets: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardExtensions {
    #[serde(default, deserialize_with = "lenient")]
    pub risuai: Option<RisuExtension>,
}

/// Character fields shared by every shape. For V2/V3 this is the `data`
/// section; for legacy cards it is the top-level object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardData {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub personality: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub scenario: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub first_mes: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub creator: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub character_version: Option<CharacterVersion>,
    #[serde(default, deserialize_with = "lenient")]
    pub character_book: Option<CharacterBook>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub assets: Vec<CardAsset>,
    #[serde(default, deserialize_with = "lenient")]
    pub extensions: Option<CardExtensions>,
}

impl CardData {
    fn has_lore(&self) -> bool {
        self.character_book
            .as_ref()
            .map_or(false, |book| !book.entries.is_empty())
    }

    fn risu(&self) -> Option<&RisuExtension> {
        self.extensions.as_ref().and_then(|e| e.risuai.as_ref())
    }
}

/// A V2 or V3 card.
#[derive(Debug, Clone, Deserialize)]
pub struct SpecCard {
    #[serde(default, deserialize_with = "lenient")]
    pub spec_version: Option<String>,
    pub data: CardData,
}

/// A pre-spec flat card.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyCard {
    #[serde(default, deserialize_with = "lenient")]
    pub spec_version: Option<String>,
    #[serde(flatten)]
    pub data: CardData,
}

/// Card payload tagged by schema generation.
#[derive(Debug, Clone)]
pub enum RawCard {
    V2(SpecCard),
    V3(SpecCard),
    Legacy(LegacyCard),
}

impl RawCard {
    /// Decode by the `spec` discriminator: V2/V3 when tagged, legacy when
    /// untagged. Unknown tags are a schema mismatch.
    pub fn from_value(value: &Value) -> ExtractResult<Self> {
        match CardSpec::detect(value) {
            CardSpec::V2 | CardSpec::V3 => Self::structured(value),
            CardSpec::Legacy => Self::legacy(value),
            CardSpec::Unknown => Err(ExtractError::schema(format!(
                "unknown card spec {}",
                value.get("spec").unwrap_or(&Value::Null)
            ))),
        }
    }

    /// Decode a V2/V3 card; anything else is a schema mismatch.
    pub fn structured(value: &Value) -> ExtractResult<Self> {
        let spec = CardSpec::detect(value);
        if !spec.is_structured() {
            return Err(ExtractError::schema(format!(
                "expected chara_card_v2 or chara_card_v3, got {}",
                spec.as_str()
            )));
        }
        if !value.get("data").map_or(false, Value::is_object) {
            return Err(ExtractError::schema("card has no data section"));
        }

        let card = SpecCard::deserialize(value)
            .map_err(|e| ExtractError::schema(format!("invalid card: {}", e)))?;
        Ok(match spec {
            CardSpec::V3 => RawCard::V3(card),
            _ => RawCard::V2(card),
        })
    }

    /// Read any JSON object as a legacy flat card, ignoring any `spec` tag.
    /// Missing fields take their defaults.
    pub fn legacy(value: &Value) -> ExtractResult<Self> {
        if !value.is_object() {
            return Err(ExtractError::schema("card is not a JSON object"));
        }

        let card = LegacyCard::deserialize(value)
            .map_err(|e| ExtractError::schema(format!("invalid legacy card: {}", e)))?;
        Ok(RawCard::Legacy(card))
    }

    /// Like [`legacy`](Self::legacy), but only for objects carrying at least
    /// one flat character field as a string. Used where an arbitrary object
    /// must not pass for a card.
    pub fn legacy_fallback(value: &Value) -> ExtractResult<Self> {
        let recognized = value.as_object().map_or(false, |object| {
            LEGACY_FIELDS
                .iter()
                .any(|key| object.get(*key).map_or(false, Value::is_string))
        });
        if !recognized {
            return Err(ExtractError::schema("object carries no character fields"));
        }
        Self::legacy(value)
    }

    pub fn spec(&self) -> CardSpec {
        match self {
            RawCard::V2(_) => CardSpec::V2,
            RawCard::V3(_) => CardSpec::V3,
            RawCard::Legacy(_) => CardSpec::Legacy,
        }
    }

    /// Map into the canonical record, deriving the capability flags.
    pub fn normalize(self) -> NormalizedCharacterInfo {
        let spec = self.spec();
        let (spec_version, data, has_emotion, has_asset) = match self {
            RawCard::V3(card) => {
                let has_emotion = card.data.assets.iter().any(|a| a.is("emotion"));
                let has_asset = card
                    .data
                    .assets
                    .iter()
                    .any(|a| a.is("x-risu-asset") || a.is("icon"));
                (card.spec_version, card.data, has_emotion, has_asset)
            }
            RawCard::V2(card) => {
                let (has_emotion, has_asset) = card.data.risu().map_or((false, false), |risu| {
                    (!risu.emotions.is_empty(), !risu.additional_assets.is_empty())
                });
                (card.spec_version, card.data, has_emotion, has_asset)
            }
            RawCard::Legacy(card) => (card.spec_version, card.data, false, false),
        };

        let has_lore = spec != CardSpec::Legacy && data.has_lore();

        NormalizedCharacterInfo {
            spec,
            spec_version,
            name: data.name.unwrap_or_default(),
            description: data.description,
            personality: data.personality,
            scenario: data.scenario,
            first_message: data.first_mes,
            creator: data.creator,
            tags: data.tags,
            character_version: data.character_version,
            has_lore,
            has_emotion,
            has_asset,
            avatar_data_url: None,
        }
    }
}
