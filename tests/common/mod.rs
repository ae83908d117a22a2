//! Synthetic PSD/PSB fixtures
//!
//! Builds minimal but structurally complete documents: header, empty color
//! mode data and image resources, a layer and mask section with real layer
//! records (names, section dividers, type tool blocks) and a tiny composite.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// Layer description for a fixture
#[derive(Debug, Clone)]
pub enum Fixture {
    Pixel(&'static str),
    /// Text layer: one style run per font entry
    Text(&'static str, Vec<&'static str>),
    /// Text layer whose engine data is stored verbatim
    RawText(&'static str, Vec<u8>),
    Group(&'static str, Vec<Fixture>),
}

pub fn text(name: &'static str, fonts: &[&'static str]) -> Fixture {
    Fixture::Text(name, fonts.to_vec())
}

pub fn group(name: &'static str, children: Vec<Fixture>) -> Fixture {
    Fixture::Group(name, children)
}

/// Where the layer info lives
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayerStorage {
    /// Regular layer info section (8-bit documents)
    LayerInfo,
    /// Empty layer info, layers in a global `Lr16` block (16-bit documents)
    Lr16Block,
}

/// Build a PSD (`large = false`) or PSB (`large = true`) file image
pub fn build_document(layers: &[Fixture], large: bool, storage: LayerStorage) -> Vec<u8> {
    let mut out = Vec::new();

    // Header
    out.extend_from_slice(b"8BPS");
    out.extend_from_slice(&(if large { 2u16 } else { 1u16 }).to_be_bytes());
    out.extend_from_slice(&[0u8; 6]);
    out.extend_from_slice(&3u16.to_be_bytes()); // channels
    out.extend_from_slice(&1u32.to_be_bytes()); // height
    out.extend_from_slice(&1u32.to_be_bytes()); // width
    out.extend_from_slice(&8u16.to_be_bytes()); // depth
    out.extend_from_slice(&3u16.to_be_bytes()); // RGB

    // Color mode data, image resources (one dummy resource)
    out.extend_from_slice(&0u32.to_be_bytes());
    let resource = {
        let mut r = b"8BIM".to_vec();
        r.extend_from_slice(&1005u16.to_be_bytes());
        r.extend_from_slice(&[0, 0]); // empty pascal name, padded
        r.extend_from_slice(&4u32.to_be_bytes());
        r.extend_from_slice(&[0, 0, 0, 0]);
        r
    };
    out.extend_from_slice(&(resource.len() as u32).to_be_bytes());
    out.extend(resource);

    // Layer info body: count, records, channel image data
    let mut records = Vec::new();
    flatten(layers, &mut records);
    let mut body = Vec::new();
    body.extend_from_slice(&(records.len() as i16).to_be_bytes());
    for record in &records {
        body.extend(layer_record(record, large));
    }
    for _ in &records {
        body.extend_from_slice(&[0, 0]); // raw compression, zero-size channel
    }
    if body.len() % 2 == 1 {
        body.push(0);
    }

    let mut section = Vec::new();
    match storage {
        LayerStorage::LayerInfo => {
            push_length(&mut section, body.len(), large);
            section.extend(body);
            section.extend_from_slice(&0u32.to_be_bytes()); // global mask
        }
        LayerStorage::Lr16Block => {
            push_length(&mut section, 0, large);
            section.extend_from_slice(&0u32.to_be_bytes()); // global mask
            // An unrelated global block first, then the layers
            section.extend(tagged_block(b"Patt", &[], large));
            section.extend(tagged_block(b"Lr16", &body, large));
        }
    }

    push_length(&mut out, section.len(), large);
    out.extend(section);

    // Composite image data: raw, 1x1 RGB
    out.extend_from_slice(&[0, 0, 0, 0, 0]);
    out
}

/// Write a fixture document to `dir/name` and return its path
pub fn write_document(dir: &Path, name: &str, layers: &[Fixture]) -> PathBuf {
    let large = name.to_lowercase().ends_with(".psb");
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, build_document(layers, large, LayerStorage::LayerInfo)).unwrap();
    path
}

/// Write bytes that start like a PSD but break off inside the layer section
pub fn write_corrupt(dir: &Path, name: &str) -> PathBuf {
    let mut bytes = build_document(&[text("Title", &["Arial"])], false, LayerStorage::LayerInfo);
    bytes.truncate(60);
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

struct Record {
    name: String,
    divider: Option<u32>,
    engine: Option<Vec<u8>>,
}

/// Flatten the tree into file order (bottom-most first)
fn flatten(layers: &[Fixture], out: &mut Vec<Record>) {
    for layer in layers {
        match layer {
            Fixture::Pixel(name) => out.push(Record { name: name.to_string(), divider: None, engine: None }),
            Fixture::Text(name, fonts) => out.push(Record {
                name: name.to_string(),
                divider: None,
                engine: Some(engine_data(fonts)),
            }),
            Fixture::RawText(name, engine) => out.push(Record {
                name: name.to_string(),
                divider: None,
                engine: Some(engine.clone()),
            }),
            Fixture::Group(name, children) => {
                out.push(Record { name: "</Layer group>".to_string(), divider: Some(3), engine: None });
                flatten(children, out);
                out.push(Record { name: name.to_string(), divider: Some(1), engine: None });
            }
        }
    }
}

fn layer_record(record: &Record, large: bool) -> Vec<u8> {
    let mut out = vec![0u8; 16]; // bounds
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&0i16.to_be_bytes());
    push_length(&mut out, 2, large);
    out.extend_from_slice(b"8BIMnorm");
    out.extend_from_slice(&[255, 0, 0, 0]);

    let mut extra = Vec::new();
    extra.extend_from_slice(&0u32.to_be_bytes()); // mask
    extra.extend_from_slice(&0u32.to_be_bytes()); // blending ranges

    // Pascal name (ASCII only), padded to 4
    let ascii: Vec<u8> = record.name.bytes().map(|b| if b.is_ascii() { b } else { b'?' }).collect();
    extra.push(ascii.len() as u8);
    extra.extend_from_slice(&ascii);
    while extra.len() % 4 != 0 {
        extra.push(0);
    }

    extra.extend(tagged_block(b"luni", &unicode_string(&record.name), large));
    if let Some(divider) = record.divider {
        extra.extend(tagged_block(b"lsct", &divider.to_be_bytes(), large));
    }
    if let Some(engine) = &record.engine {
        extra.extend(tagged_block(b"TySh", &type_tool(&record.name, engine), large));
    }

    out.extend_from_slice(&(extra.len() as u32).to_be_bytes());
    out.extend(extra);
    out
}

fn tagged_block(key: &[u8; 4], data: &[u8], large: bool) -> Vec<u8> {
    let mut padded = data.to_vec();
    while padded.len() % 4 != 0 {
        padded.push(0);
    }
    let mut out = b"8BIM".to_vec();
    out.extend_from_slice(key);
    let wide = large && matches!(key, b"Lr16" | b"Lr32" | b"Layr" | b"LMsk");
    if wide {
        out.extend_from_slice(&(padded.len() as u64).to_be_bytes());
    } else {
        out.extend_from_slice(&(padded.len() as u32).to_be_bytes());
    }
    out.extend(padded);
    out
}

fn push_length(out: &mut Vec<u8>, len: usize, large: bool) {
    if large {
        out.extend_from_slice(&(len as u64).to_be_bytes());
    } else {
        out.extend_from_slice(&(len as u32).to_be_bytes());
    }
}

fn unicode_string(text: &str) -> Vec<u8> {
    let units: Vec<u16> = text.encode_utf16().collect();
    let mut out = (units.len() as u32).to_be_bytes().to_vec();
    for unit in units {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

/// `TySh` payload: transform, text descriptor with Txt and EngineData items
fn type_tool(text: &str, engine: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&1u16.to_be_bytes());
    for value in [1.0f64, 0.0, 0.0, 1.0, 10.0, 20.0] {
        out.extend_from_slice(&value.to_be_bytes());
    }
    out.extend_from_slice(&50u16.to_be_bytes());
    out.extend_from_slice(&16u32.to_be_bytes());

    // Descriptor: unicode name, class id, item count
    out.extend(unicode_string(""));
    out.extend_from_slice(&0u32.to_be_bytes());
    out.extend_from_slice(b"TxLr");
    out.extend_from_slice(&2u32.to_be_bytes());

    out.extend_from_slice(&0u32.to_be_bytes());
    out.extend_from_slice(b"Txt TEXT");
    out.extend(unicode_string(text));

    out.extend_from_slice(&10u32.to_be_bytes());
    out.extend_from_slice(b"EngineDatatdta");
    out.extend_from_slice(&(engine.len() as u32).to_be_bytes());
    out.extend_from_slice(engine);

    // Warp version and descriptor version, then bounds
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&16u32.to_be_bytes());
    out.extend_from_slice(&[0u8; 32]);
    out
}

/// Engine data with one style run per entry of `fonts`; the font set lists
/// each distinct font once plus the invisible font Photoshop always adds
fn engine_data(fonts: &[&str]) -> Vec<u8> {
    let mut font_set: Vec<&str> = Vec::new();
    for font in fonts {
        if !font_set.contains(font) {
            font_set.push(font);
        }
    }
    font_set.push("AdobeInvisFont");

    let mut out = b"\n\n<<\n\t/EngineDict\n\t<<\n\t\t/Editor\n\t\t<<\n\t\t\t/Text (\xfe\xff\x00H\x00i\x00\\r)\n\t\t>>\n\t\t/StyleRun\n\t\t<<\n\t\t\t/DefaultRunData\n\t\t\t<<\n\t\t\t\t/StyleSheet << /StyleSheetData << >> >>\n\t\t\t>>\n\t\t\t/RunArray [".to_vec();
    for font in fonts {
        let index = font_set.iter().position(|f| f == font).unwrap();
        out.extend(
            format!(
                "\n\t\t\t<<\n\t\t\t\t/StyleSheet\n\t\t\t\t<<\n\t\t\t\t\t/StyleSheetData\n\t\t\t\t\t<<\n\t\t\t\t\t\t/Font {}\n\t\t\t\t\t\t/FontSize 24.0\n\t\t\t\t\t\t/FauxBold false\n\t\t\t\t\t\t/Tracking 0\n\t\t\t\t\t\t/Leading .5\n\t\t\t\t\t>>\n\t\t\t\t>>\n\t\t\t>>",
                index
            )
            .bytes(),
        );
    }
    out.extend(b"\n\t\t\t]\n\t\t\t/RunLengthArray [");
    for _ in fonts {
        out.extend(b" 1");
    }
    out.extend(b" ]\n\t\t\t/IsJoinable 1\n\t\t>>\n\t>>\n\t/ResourceDict\n\t<<\n\t\t/FontSet\n\t\t[");
    for font in &font_set {
        out.extend(b"\n\t\t\t<<\n\t\t\t\t/Name ");
        out.extend(ps_string(font));
        out.extend(b"\n\t\t\t\t/Script 0\n\t\t\t\t/FontType 1\n\t\t\t\t/Synthetic 0\n\t\t\t>>");
    }
    out.extend(b"\n\t\t]\n\t>>\n>>");
    out
}

/// Parenthesized UTF-16BE string with the byte order mark and escapes
fn ps_string(text: &str) -> Vec<u8> {
    let mut out = vec![b'(', 0xFE, 0xFF];
    for unit in text.encode_utf16() {
        for byte in unit.to_be_bytes() {
            if matches!(byte, b'(' | b')' | b'\\') {
                out.push(b'\\');
            }
            out.push(byte);
        }
    }
    out.push(b')');
    out
}
