//! Avatar materialization as self-contained data URLs.

use base64::{engine::general_purpose::STANDARD, Engine};

/// Image MIME types an avatar can be emitted as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    Png,
    Jpeg,
}

impl ImageMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Png => "image/png",
            ImageMime::Jpeg => "image/jpeg",
        }
    }
}

/// Encode raw image bytes as a `data:<mime>;base64,<payload>` URL.
pub fn to_data_url(bytes: &[u8], mime: ImageMime) -> String {
    format!("data:{};base64,{}", mime.as_str(), STANDARD.encode(bytes))
}

/// Split a base64 data URL back into its MIME type and raw bytes.
///
/// Returns `None` for anything that is not a base64 `data:` URL.
pub fn decode_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let rest = url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload).ok()?;
    Some((mime.to_string(), bytes))
}
