//! Integration tests for card extraction.
//!
//! Builds real PNG, CharX and JPEG containers in memory and runs them through
//! the default pipeline.

use base64::{engine::general_purpose::STANDARD, Engine};
use charcard_extract::{
    decode_data_url, extract, ByteSource, CardSpec, CharacterVersion, ExtractConfig,
    ExtractionPipeline, NormalizedCharacterInfo,
};
use serde_json::json;

const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// A `tEXt` chunk carrying `keyword\0<base64 payload>`.
fn text_chunk(keyword: &str, payload: &[u8]) -> Vec<u8> {
    let mut data = keyword.as_bytes().to_vec();
    data.push(0);
    data.extend_from_slice(payload);
    let mut out = (data.len() as u32).to_be_bytes().to_vec();
    out.extend_from_slice(b"tEXt");
    out.extend_from_slice(&data);
    out.extend_from_slice(&[0x12, 0x34, 0x56, 0x78]);
    out
}

fn card_chunk(keyword: &str, card: &serde_json::Value) -> Vec<u8> {
    text_chunk(keyword, STANDARD.encode(card.to_string()).as_bytes())
}

fn png_with(chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = PNG_MAGIC.to_vec();
    // IHDR for a 1x1 image.
    out.extend_from_slice(&13u32.to_be_bytes());
    out.extend_from_slice(b"IHDR");
    out.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 1, 8, 6, 0, 0, 0]);
    out.extend_from_slice(&[0x1F, 0x15, 0xC4, 0x89]);
    for chunk in chunks {
        out.extend_from_slice(chunk);
    }
    out.extend_from_slice(&0u32.to_be_bytes());
    out.extend_from_slice(b"IEND");
    out.extend_from_slice(&[0xAE, 0x42, 0x60, 0x82]);
    out
}

fn v3_card(name: &str) -> serde_json::Value {
    json!({
        "spec": "chara_card_v3",
        "spec_version": "3.0",
        "data": {
            "name": name,
            "description": "A wandering bard.",
            "personality": "cheerful",
            "scenario": "A tavern at dusk.",
            "first_mes": "Care for a song?",
            "creator": "someone",
            "tags": ["fantasy"],
            "character_version": "1.2",
            "character_book": {"entries": [{"keys": ["lute"], "content": "Old lute."}]},
            "assets": [
                {"type": "icon", "uri": "ccdefault:", "name": "main", "ext": "png"},
                {"type": "emotion", "uri": "embeded://happy.png", "name": "happy", "ext": "png"}
            ]
        }
    })
}

fn avatar_of(card: &NormalizedCharacterInfo) -> (String, Vec<u8>) {
    decode_data_url(card.avatar_data_url.as_deref().expect("avatar expected"))
        .expect("valid data URL")
}

#[tokio::test]
async fn test_png_ccv3_card() {
    let png = png_with(&[card_chunk("ccv3", &v3_card("Aria"))]);
    let card = extract("aria.png", ByteSource::from(png.clone()))
        .await
        .expect("card expected");

    let expected = NormalizedCharacterInfo {
        spec: CardSpec::V3,
        spec_version: Some("3.0".to_string()),
        name: "Aria".to_string(),
        description: Some("A wandering bard.".to_string()),
        personality: Some("cheerful".to_string()),
        scenario: Some("A tavern at dusk.".to_string()),
        first_message: Some("Care for a song?".to_string()),
        creator: Some("someone".to_string()),
        tags: vec!["fantasy".to_string()],
        character_version: Some(CharacterVersion::Text("1.2".to_string())),
        has_lore: true,
        has_emotion: true,
        has_asset: true,
        avatar_data_url: card.avatar_data_url.clone(),
    };
    assert_eq!(card, expected);

    let (mime, bytes) = avatar_of(&card);
    assert_eq!(mime, "image/png");
    assert_eq!(bytes, png);
}

#[tokio::test]
async fn test_png_chara_only_v2_card() {
    let v2 = json!({
        "spec": "chara_card_v2",
        "spec_version": "2.0",
        "data": {
            "name": "Kai",
            "extensions": {"risuai": {"emotions": [["happy", "a.png"]]}}
        }
    });
    let png = png_with(&[card_chunk("chara", &v2)]);
    let card = extract("kai.png", png.into()).await.expect("card expected");

    assert_eq!(card.spec, CardSpec::V2);
    assert_eq!(card.name, "Kai");
    assert!(card.has_emotion);
    assert!(!card.has_asset);
    assert!(!card.has_lore);
}

#[tokio::test]
async fn test_png_chara_only_legacy_card() {
    let legacy = json!({"name": "Old", "personality": "grumpy", "first_mes": "What?"});
    let png = png_with(&[card_chunk("chara", &legacy)]);
    let card = extract("old.png", png.into()).await.expect("card expected");

    assert_eq!(card.spec, CardSpec::Legacy);
    assert_eq!(card.name, "Old");
    assert_eq!(card.personality.as_deref(), Some("grumpy"));
    assert!(!card.has_lore && !card.has_emotion && !card.has_asset);
}

#[tokio::test]
async fn test_png_prefers_ccv3_over_chara() {
    let legacy = json!({"name": "Legacy Copy"});
    let png = png_with(&[
        card_chunk("ccv3", &v3_card("Newer")),
        card_chunk("chara", &legacy),
    ]);
    let card = extract("both.png", png.into()).await.expect("card expected");

    assert_eq!(card.spec, CardSpec::V3);
    assert_eq!(card.name, "Newer");
}

#[tokio::test]
async fn test_png_falls_back_to_chara_after_broken_ccv3() {
    let legacy = json!({"name": "Survivor"});
    let png = png_with(&[
        text_chunk("ccv3", b"!!!not base64!!!"),
        card_chunk("chara", &legacy),
    ]);
    let card = extract("fallback.png", png.into()).await.expect("card expected");

    assert_eq!(card.spec, CardSpec::Legacy);
    assert_eq!(card.name, "Survivor");
}

#[tokio::test]
async fn test_png_chara_before_ccv3_is_not_found() {
    let legacy = json!({"name": "Hidden"});
    let png = png_with(&[
        card_chunk("chara", &legacy),
        text_chunk("ccv3", b"!!!not base64!!!"),
    ]);
    assert!(extract("hidden.png", png.into()).await.is_none());
}

#[tokio::test]
async fn test_png_reserved_payload_is_rejected() {
    let png = png_with(&[text_chunk("chara", b"rcc||eyJuYW1lIjoiWCJ9")]);
    assert!(extract("reserved.png", png.into()).await.is_none());
}

#[tokio::test]
async fn test_png_marker_after_iend_is_ignored() {
    let mut png = png_with(&[]);
    png.extend_from_slice(&card_chunk("chara", &json!({"name": "Trailer"})));
    assert!(extract("trailer.png", png.into()).await.is_none());
}

#[tokio::test]
async fn test_png_without_markers() {
    let png = png_with(&[text_chunk("Comment", b"hello")]);
    assert!(extract("plain.png", png.into()).await.is_none());
}

#[tokio::test]
async fn test_uppercase_extension() {
    let png = png_with(&[card_chunk("ccv3", &v3_card("Loud"))]);
    let card = extract("C:\\cards\\LOUD.PNG", png.into())
        .await
        .expect("card expected");
    assert_eq!(card.name, "Loud");
}

#[tokio::test]
async fn test_json_legacy_card() {
    let body = json!({"name": "Flat", "description": "Just JSON", "scenario": "Nowhere"});
    let card = extract("flat.json", body.to_string().into_bytes().into())
        .await
        .expect("card expected");

    assert_eq!(card.spec, CardSpec::Legacy);
    assert_eq!(card.scenario.as_deref(), Some("Nowhere"));
    assert!(!card.has_lore && !card.has_emotion && !card.has_asset);
    assert!(card.avatar_data_url.is_none());
}

#[tokio::test]
async fn test_json_partial_legacy_card() {
    let body = json!({"creator": "someone", "tags": ["a", "b"], "character_version": "1"});
    let card = extract("partial.json", body.to_string().into_bytes().into())
        .await
        .expect("card expected");
    assert_eq!(card.spec, CardSpec::Legacy);
    assert_eq!(card.name, "");
    assert_eq!(card.tags, vec!["a".to_string(), "b".to_string()]);

    let empty = extract("empty.json", b"{}".as_slice().into())
        .await
        .expect("card expected");
    assert_eq!(empty.spec, CardSpec::Legacy);
}

#[tokio::test]
async fn test_unsupported_extension() {
    assert!(extract("notes.txt", b"chara:eyJ9".as_slice().into()).await.is_none());
    assert!(extract("no_extension", b"{}".as_slice().into()).await.is_none());
}

#[tokio::test]
async fn test_garbage_never_fails() {
    let garbage: Vec<u8> = (0..4096u32).map(|i| (i * 31 % 251) as u8).collect();
    for name in ["g.png", "g.json", "g.charx", "g.jpg", "g.jpeg"] {
        assert!(extract(name, garbage.clone().into()).await.is_none());
    }
}

#[tokio::test]
async fn test_path_file_and_reader_sources() {
    let png = png_with(&[card_chunk("ccv3", &v3_card("Disk"))]);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("disk.png");
    std::fs::write(&path, &png).unwrap();

    let pipeline = ExtractionPipeline::with_defaults();

    let from_path = pipeline.extract_path(&path).await.expect("card expected");
    assert_eq!(from_path.name, "Disk");

    let file = tokio::fs::File::open(&path).await.unwrap();
    let from_file = pipeline
        .extract("disk.png", ByteSource::from(file))
        .await
        .expect("card expected");
    assert_eq!(from_file, from_path);

    let reader = ByteSource::reader(std::io::Cursor::new(png));
    let from_reader = pipeline
        .extract("disk.png", reader)
        .await
        .expect("card expected");
    assert_eq!(from_reader, from_path);
}

#[tokio::test]
async fn test_config_disables_avatar() {
    let png = png_with(&[card_chunk("ccv3", &v3_card("Faceless"))]);
    let config = ExtractConfig::builder().include_avatar(false).build();
    let pipeline = ExtractionPipeline::with_config(config);

    let card = pipeline
        .extract("faceless.png", png.into())
        .await
        .expect("card expected");
    assert_eq!(card.name, "Faceless");
    assert!(!card.has_avatar());
}

#[tokio::test]
async fn test_serialized_shape() {
    let png = png_with(&[card_chunk("ccv3", &v3_card("Shape"))]);
    let card = extract("shape.png", png.into()).await.expect("card expected");
    let value = serde_json::to_value(&card).unwrap();

    assert_eq!(value["spec"], "v3");
    assert_eq!(value["firstMessage"], "Care for a song?");
    assert_eq!(value["hasLore"], true);
    assert!(value["avatarDataUrl"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));
}

#[cfg(feature = "charx")]
mod charx {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn zip_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, body) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(body).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[tokio::test]
    async fn test_charx_icon_asset_avatar() {
        let card = v3_card("Packed").to_string();
        let icon = png_with(&[]);
        let archive = zip_with(&[
            ("card.json", card.as_bytes()),
            ("assets/x/icon/image/a.png", icon.as_slice()),
        ]);

        let info = extract("packed.charx", archive.into())
            .await
            .expect("card expected");
        assert_eq!(info.spec, CardSpec::V3);
        assert_eq!(info.name, "Packed");

        let (mime, bytes) = avatar_of(&info);
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, icon);
    }

    #[tokio::test]
    async fn test_charx_without_icon_uses_whole_file() {
        let card = v3_card("Bare").to_string();
        let archive = zip_with(&[("card.json", card.as_bytes())]);

        let info = extract("bare.charx", archive.clone().into())
            .await
            .expect("card expected");
        let (mime, bytes) = avatar_of(&info);
        assert_eq!(mime, "image/jpeg");
        assert_eq!(bytes, archive);
    }

    #[tokio::test]
    async fn test_charx_rejects_legacy_card() {
        let archive = zip_with(&[("card.json", br#"{"name":"Flat"}"#.as_slice())]);
        assert!(extract("flat.charx", archive.into()).await.is_none());
    }

    #[tokio::test]
    async fn test_jpeg_with_appended_charx() {
        let jpeg_body: &[u8] = b"\xFF\xD8\xFF\xE0fake-jpeg-body\xFF\xD9";
        let card = json!({
            "spec": "chara_card_v2",
            "spec_version": "2.0",
            "data": {"name": "Hybrid", "tags": ["photo"]}
        })
        .to_string();
        let mut file = jpeg_body.to_vec();
        file.extend_from_slice(&zip_with(&[("nested/Card.JSON", card.as_bytes())]));

        let info = extract("hybrid.jpg", file.into()).await.expect("card expected");
        assert_eq!(info.spec, CardSpec::V2);
        assert_eq!(info.name, "Hybrid");
        assert_eq!(info.tags, vec!["photo".to_string()]);

        let (mime, bytes) = avatar_of(&info);
        assert_eq!(mime, "image/jpeg");
        assert_eq!(bytes, jpeg_body);
    }

    #[test]
    fn test_archive_path_without_tokio_runtime() {
        let junk = b"PK\x03\x04junk".as_slice();
        assert!(futures::executor::block_on(extract("a.charx", junk.into())).is_none());

        let card = v3_card("Portable").to_string();
        let archive = zip_with(&[("card.json", card.as_bytes())]);
        let info = futures::executor::block_on(extract("portable.charx", archive.into()))
            .expect("card expected");
        assert_eq!(info.name, "Portable");
    }

    #[tokio::test]
    async fn test_plain_jpeg_has_no_card() {
        let jpeg: &[u8] = b"\xFF\xD8\xFF\xE0just-a-photo\xFF\xD9";
        assert!(extract("photo.jpeg", jpeg.into()).await.is_none());
    }

    #[tokio::test]
    async fn test_archive_entry_limit() {
        let card = v3_card("Crowded").to_string();
        let archive = zip_with(&[
            ("card.json", card.as_bytes()),
            ("a.txt", b"a".as_slice()),
            ("b.txt", b"b".as_slice()),
        ]);
        let config = ExtractConfig::builder().max_archive_entries(2).build();
        let pipeline = ExtractionPipeline::with_config(config);

        assert!(pipeline.extract("crowded.charx", archive.clone().into()).await.is_none());
        assert!(ExtractionPipeline::with_defaults()
            .extract("crowded.charx", archive.into())
            .await
            .is_some());
    }
}
