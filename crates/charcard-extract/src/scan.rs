//! PNG boundary computation and marker-based payload scanning.
//!
//! Cards embedded in PNG files live in text chunks keyed `ccv3` (newer) or
//! `chara` (older). Rather than parsing text chunks, the scanner looks for
//! the key literals themselves and lifts the base64 run that follows, which
//! also catches payloads written by tools that do not emit well-formed chunks.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};

use crate::error::{ExtractError, ExtractResult};

/// Fixed PNG file signature.
pub const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Payload prefix marking an opaque, non-card blob after the `chara` marker.
pub const RESERVED_PREFIX: &[u8] = b"rcc||";

const IEND: &[u8; 4] = b"IEND";

/// Accepts unpadded input and stray low bits, the way most card writers'
/// base64 implementations tolerate them.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Marker literals preceding an embedded card payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// `ccv3`, written by V3-aware tools.
    Ccv3,
    /// `chara`, the older key.
    Chara,
}

impl Marker {
    pub fn literal(&self) -> &'static [u8] {
        match self {
            Marker::Ccv3 => b"ccv3",
            Marker::Chara => b"chara",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Marker::Ccv3 => "ccv3",
            Marker::Chara => "chara",
        }
    }
}

/// Offset just past the `IEND` chunk's CRC, or `data.len()` if the chunk
/// structure breaks down before an `IEND` is reached.
pub fn png_boundary(data: &[u8]) -> usize {
    let mut pos = PNG_MAGIC.len();
    loop {
        let Some(header) = data.get(pos..pos + 8) else {
            return data.len();
        };
        let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let end = match pos
            .checked_add(12)
            .and_then(|p| p.checked_add(length))
        {
            Some(end) if end <= data.len() => end,
            _ => return data.len(),
        };
        if &header[4..8] == IEND {
            return end;
        }
        pos = end;
    }
}

/// First position of `needle` in `data[start..end]`, as an absolute offset.
pub fn find_marker(data: &[u8], needle: &[u8], start: usize, end: usize) -> Option<usize> {
    let end = end.min(data.len());
    if start >= end || needle.is_empty() {
        return None;
    }
    data[start..end]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| start + i)
}

/// Where each marker sits within the scannable region of a PNG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerLayout {
    /// Scannable region is `[0, boundary)`.
    pub boundary: usize,
    pub ccv3: Option<usize>,
    pub chara: Option<usize>,
}

impl MarkerLayout {
    /// Locate both markers. The `chara` search starts right after the `ccv3`
    /// marker when one exists, so it never lands inside the region that
    /// precedes the newer payload.
    pub fn locate(data: &[u8]) -> Self {
        let boundary = png_boundary(data);
        let ccv3 = find_marker(data, Marker::Ccv3.literal(), 0, boundary);
        let chara_start = ccv3.map_or(0, |p| p + Marker::Ccv3.literal().len());
        let chara = find_marker(data, Marker::Chara.literal(), chara_start, boundary);
        Self {
            boundary,
            ccv3,
            chara,
        }
    }

    pub fn position(&self, marker: Marker) -> Option<usize> {
        match marker {
            Marker::Ccv3 => self.ccv3,
            Marker::Chara => self.chara,
        }
    }
}

fn is_separator(b: u8) -> bool {
    matches!(b, 0 | b':' | b'=' | b' ' | b'|' | b'\t' | b'\n' | b'\r')
}

fn is_base64(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=')
}

/// Offset of the first non-separator byte at or after `start`, bounded by `end`.
pub fn skip_separators(data: &[u8], start: usize, end: usize) -> usize {
    let end = end.min(data.len());
    let mut i = start;
    while i < end && is_separator(data[i]) {
        i += 1;
    }
    i
}

/// Maximal run of base64 alphabet bytes in `data[start..end]`, capped at
/// `max_chars`.
pub fn collect_base64(data: &[u8], start: usize, end: usize, max_chars: usize) -> &[u8] {
    let end = end.min(data.len());
    if start >= end {
        return &[];
    }
    let limit = end.min(start.saturating_add(max_chars));
    let len = data[start..limit]
        .iter()
        .position(|&b| !is_base64(b))
        .unwrap_or(limit - start);
    &data[start..start + len]
}

/// Decode a collected run into the JSON value it carries.
///
/// Padding is optional and anything after the first `=` is ignored. The
/// first JSON value is parsed and trailing bytes after it are dropped.
pub fn decode_payload(run: &[u8]) -> ExtractResult<serde_json::Value> {
    let body_end = run.iter().position(|&b| b == b'=').unwrap_or(run.len());
    let mut body = &run[..body_end];
    if body.len() % 4 == 1 {
        body = &body[..body.len() - 1];
    }
    if body.is_empty() {
        return Err(ExtractError::corrupt("empty payload"));
    }

    let decoded = LENIENT.decode(body)?;
    let mut values = serde_json::Deserializer::from_slice(&decoded).into_iter::<serde_json::Value>();
    match values.next() {
        Some(value) => Ok(value?),
        None => Err(ExtractError::corrupt("payload decoded to no JSON value")),
    }
}

/// Outcome of lifting the payload behind a marker.
#[derive(Debug)]
pub enum MarkerPayload<'a> {
    /// Base64 run ready for decoding.
    Encoded(&'a [u8]),
    /// Payload carries the reserved non-card prefix.
    Reserved,
}

/// Lift the payload that follows the marker at `marker_pos`.
pub fn marker_payload(
    data: &[u8],
    marker: Marker,
    marker_pos: usize,
    boundary: usize,
    max_chars: usize,
) -> MarkerPayload<'_> {
    let boundary = boundary.min(data.len());
    let start = skip_separators(data, marker_pos + marker.literal().len(), boundary);
    let reserved = data
        .get(start..boundary)
        .map_or(false, |rest| rest.starts_with(RESERVED_PREFIX));
    if reserved {
        return MarkerPayload::Reserved;
    }
    MarkerPayload::Encoded(collect_base64(data, start, boundary, max_chars))
}
