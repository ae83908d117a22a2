//! PSD/PSB layer section reader
//!
//! Only the parts of the file needed to rebuild the layer tree are read:
//! the header, the layer records and their tagged blocks. Color mode data,
//! image resources and all channel image data are skipped with seeks, so
//! large PSB files are never loaded into memory.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;
use crate::error::{Error, Result};
use crate::psd::document::{Layer, LayerKind, PsdDocument, PsdVersion, TextLayer};
use crate::psd::engine::{parse_engine_data, style_runs};

const FILE_SIGNATURE: &[u8; 4] = b"8BPS";
const BLEND_SIGNATURE: &[u8; 4] = b"8BIM";
const BLOCK_SIGNATURES: [&[u8; 4]; 2] = [b"8BIM", b"8B64"];

/// Tagged block keys whose length field is 64-bit in PSB files
const LARGE_BLOCK_KEYS: [&[u8; 4]; 13] = [
    b"LMsk", b"Lr16", b"Lr32", b"Layr", b"Mt16", b"Mt32", b"Mtrn",
    b"Alph", b"FMsk", b"lnk2", b"FEid", b"FXid", b"PxSD",
];

/// Global tagged blocks that carry the layer info of 16/32-bit documents
const LAYER_INFO_KEYS: [&[u8; 4]; 3] = [b"Lr16", b"Lr32", b"Layr"];

/// Marker of the engine data item inside a type tool descriptor:
/// the key "EngineData" followed by its "tdta" (raw data) type tag
const ENGINE_DATA_MARKER: &[u8] = b"EngineDatatdta";

/// Section divider types from `lsct` blocks
const DIVIDER_OPEN_FOLDER: u32 = 1;
const DIVIDER_CLOSED_FOLDER: u32 = 2;
const DIVIDER_BOUNDING: u32 = 3;

/// Read a PSD/PSB file from disk
///
/// The file handle is dropped before returning, on success and on error.
pub fn read_psd(path: &Path) -> Result<PsdDocument> {
    let file = File::open(path)?;
    read_document(BufReader::new(file))
}

/// Read a PSD/PSB document from any seekable source
pub fn read_document<R: Read + Seek>(reader: R) -> Result<PsdDocument> {
    let mut src = Source { inner: reader };

    // File header: signature, version, 6 reserved bytes, channel count,
    // height, width, depth, color mode
    let signature: [u8; 4] = src.array("file header")?;
    if &signature != FILE_SIGNATURE {
        return Err(Error::InvalidSignature);
    }

    let raw_version = src.u16("file header")?;
    let version = PsdVersion::from_header(raw_version)
        .ok_or(Error::UnsupportedVersion(raw_version))?;

    src.skip(6 + 2, "file header")?;
    let height = src.u32("file header")?;
    let width = src.u32("file header")?;
    src.skip(2 + 2, "file header")?;

    let color_mode_len = src.u32("color mode data")?;
    src.skip(color_mode_len.into(), "color mode data")?;

    let resources_len = src.u32("image resources")?;
    src.skip(resources_len.into(), "image resources")?;

    let records = read_layer_and_mask(&mut src, version)?;
    debug!("Read {} layer records ({:?}, {}x{})", records.len(), version, width, height);

    Ok(PsdDocument {
        version,
        width,
        height,
        layers: build_tree(records),
    })
}

/// A layer record reduced to what the tree builder needs
#[derive(Debug, Clone, PartialEq)]
struct LayerRecord {
    name: String,
    divider: Option<u32>,
    text: Option<TextLayer>,
}

impl LayerRecord {
    fn into_layer(self) -> Layer {
        let kind = match self.text {
            Some(text) => LayerKind::Text(text),
            None => LayerKind::Pixel,
        };
        Layer { name: self.name, kind }
    }
}

fn read_layer_and_mask<R: Read + Seek>(src: &mut Source<R>, version: PsdVersion) -> Result<Vec<LayerRecord>> {
    let section_len = src.length(version, "layer and mask information")?;
    if section_len == 0 {
        return Ok(Vec::new());
    }
    let section_end = src.position()?.saturating_add(section_len);

    let layer_info_len = src.length(version, "layer info")?;
    if layer_info_len > 0 {
        return read_layer_info(src, version);
    }

    // 16 and 32 bit documents leave the layer info empty and store it in a
    // global tagged block after the global layer mask info instead
    let mask_len = src.u32("global layer mask info")?;
    src.skip(mask_len.into(), "global layer mask info")?;

    while src.seek_block_signature(section_end)? {
        let key: [u8; 4] = src.array("tagged block")?;
        let len = if version.is_large() && LARGE_BLOCK_KEYS.contains(&&key) {
            src.u64("tagged block")?
        } else {
            src.u32("tagged block")?.into()
        };

        if LAYER_INFO_KEYS.contains(&&key) {
            return read_layer_info(src, version);
        }

        src.skip(len, "tagged block")?;
    }

    Ok(Vec::new())
}

/// Read the layer count and every layer record; channel image data that
/// follows the records is left unread
fn read_layer_info<R: Read + Seek>(src: &mut Source<R>, version: PsdVersion) -> Result<Vec<LayerRecord>> {
    // A negative count only flags a transparency alpha channel
    let count = src.i16("layer count")?.unsigned_abs();
    (0..count).map(|_| read_layer_record(src, version)).collect()
}

fn read_layer_record<R: Read + Seek>(src: &mut Source<R>, version: PsdVersion) -> Result<LayerRecord> {
    // Bounds: top, left, bottom, right
    src.skip(16, "layer record")?;

    // Channel info: id (2 bytes) + data length (4 bytes, 8 in PSB)
    let channels = src.u16("layer record")?;
    let channel_entry: u64 = if version.is_large() { 10 } else { 6 };
    src.skip(u64::from(channels) * channel_entry, "layer record")?;

    let blend_signature: [u8; 4] = src.array("layer record")?;
    if &blend_signature != BLEND_SIGNATURE {
        return Err(Error::InvalidLayerRecord(format!(
            "bad blend mode signature {:?}",
            String::from_utf8_lossy(&blend_signature)
        )));
    }

    // Blend mode key, opacity, clipping, flags, filler
    src.skip(4 + 4, "layer record")?;

    let extra_len = src.u32("layer extra data")?;
    let extra = src.bytes(extra_len.into(), "layer extra data")?;
    parse_extra_data(&extra, version)
}

/// Parse the per-layer extra data: mask, blending ranges, name, tagged blocks
fn parse_extra_data(extra: &[u8], version: PsdVersion) -> Result<LayerRecord> {
    let mut cur = Bytes { data: extra, pos: 0 };

    let mask_len = cur.u32("layer mask data")?;
    cur.skip(mask_len as usize, "layer mask data")?;

    let blending_len = cur.u32("layer blending ranges")?;
    cur.skip(blending_len as usize, "layer blending ranges")?;

    // Pascal string, padded so that length byte + text is a multiple of 4
    let name_len = usize::from(cur.u8("layer name")?);
    let name_bytes = cur.take(name_len, "layer name")?;
    let padding = (4 - (1 + name_len) % 4) % 4;
    cur.pos = (cur.pos + padding).min(extra.len());

    let mut record = LayerRecord {
        name: String::from_utf8_lossy(name_bytes).into_owned(),
        divider: None,
        text: None,
    };

    for block in TaggedBlocks::new(cur.rest(), version) {
        let block = block?;
        match &block.key {
            b"luni" => {
                if let Some(name) = decode_unicode_name(block.data) {
                    record.name = name;
                }
            }
            b"lsct" | b"lsdk" => {
                record.divider = block
                    .data
                    .get(..4)
                    .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]));
            }
            b"TySh" => record.text = Some(read_type_tool(block.data)?),
            _ => {}
        }
    }

    Ok(record)
}

/// Extract the style runs of a type layer from its `TySh` block
fn read_type_tool(data: &[u8]) -> Result<TextLayer> {
    let engine_data = find_engine_data(data)?;
    let engine = parse_engine_data(engine_data)?;
    Ok(TextLayer { runs: style_runs(&engine)? })
}

fn find_engine_data(data: &[u8]) -> Result<&[u8]> {
    let at = data
        .windows(ENGINE_DATA_MARKER.len())
        .position(|window| window == ENGINE_DATA_MARKER)
        .ok_or_else(|| Error::MalformedTextData("type layer has no engine data".to_string()))?;

    let mut cur = Bytes { data, pos: at + ENGINE_DATA_MARKER.len() };
    let len = cur.u32("engine data")? as usize;
    cur.take(len, "engine data")
}

/// `luni` payload: UTF-16BE character count followed by the characters
fn decode_unicode_name(data: &[u8]) -> Option<String> {
    let mut cur = Bytes { data, pos: 0 };
    let count = cur.u32("unicode layer name").ok()? as usize;
    let chars = cur.take(count.checked_mul(2)?, "unicode layer name").ok()?;
    let units: Vec<u16> = chars
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    Some(String::from_utf16_lossy(&units).trim_end_matches('\0').to_string())
}

/// Rebuild the group hierarchy from flat layer records
///
/// Records are stored bottom-most first. Walking them top-down, a folder
/// divider opens a group and the matching bounding divider closes it.
fn build_tree(records: Vec<LayerRecord>) -> Vec<Layer> {
    let mut root: Vec<Layer> = Vec::new();
    let mut open: Vec<(String, Vec<Layer>)> = Vec::new();

    for record in records.into_iter().rev() {
        match record.divider {
            Some(DIVIDER_OPEN_FOLDER) | Some(DIVIDER_CLOSED_FOLDER) => {
                open.push((record.name, Vec::new()));
            }
            Some(DIVIDER_BOUNDING) => {
                // A stray divider with no open group is ignored
                if let Some((name, children)) = open.pop() {
                    push_group(&mut root, &mut open, name, children);
                }
            }
            _ => match open.last_mut() {
                Some((_, children)) => children.push(record.into_layer()),
                None => root.push(record.into_layer()),
            },
        }
    }

    // Groups left open by a truncated tree still keep their children
    while let Some((name, children)) = open.pop() {
        push_group(&mut root, &mut open, name, children);
    }

    root.reverse();
    root
}

fn push_group(root: &mut Vec<Layer>, open: &mut [(String, Vec<Layer>)], name: String, mut children: Vec<Layer>) {
    children.reverse();
    let group = Layer::group(name, children);
    match open.last_mut() {
        Some((_, parent)) => parent.push(group),
        None => root.push(group),
    }
}

/// A tagged ("additional layer information") block
#[derive(Debug)]
struct TaggedBlock<'a> {
    key: [u8; 4],
    data: &'a [u8],
}

/// Iterator over the tagged blocks in a byte slice
///
/// Writers disagree on block padding (2 or 4 bytes), so up to three filler
/// bytes before a block signature are skipped.
struct TaggedBlocks<'a> {
    data: &'a [u8],
    pos: usize,
    large: bool,
}

impl<'a> TaggedBlocks<'a> {
    fn new(data: &'a [u8], version: PsdVersion) -> Self {
        Self { data, pos: 0, large: version.is_large() }
    }

    fn find_signature(&mut self) -> bool {
        for _ in 0..4 {
            match self.data.get(self.pos..self.pos + 4) {
                Some(sig) if BLOCK_SIGNATURES.iter().any(|known| known.as_slice() == sig) => return true,
                Some(_) => self.pos += 1,
                None => return false,
            }
        }
        false
    }

    /// Read key, length and data; the cursor starts right after the signature
    fn read_block(&self, cur: &mut Bytes<'a>) -> Result<TaggedBlock<'a>> {
        let key_bytes = cur.take(4, "tagged block")?;
        let key = [key_bytes[0], key_bytes[1], key_bytes[2], key_bytes[3]];
        let len = if self.large && LARGE_BLOCK_KEYS.contains(&&key) {
            usize::try_from(cur.u64("tagged block")?).map_err(|_| Error::Truncated("tagged block"))?
        } else {
            cur.u32("tagged block")? as usize
        };
        let data = cur.take(len, "tagged block")?;
        Ok(TaggedBlock { key, data })
    }
}

impl<'a> Iterator for TaggedBlocks<'a> {
    type Item = Result<TaggedBlock<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.find_signature() {
            return None;
        }

        let mut cur = Bytes { data: self.data, pos: self.pos + 4 };
        let block = self.read_block(&mut cur);

        // Stop after an error; otherwise continue after the block
        self.pos = if block.is_ok() { cur.pos } else { self.data.len() };
        Some(block)
    }
}

/// Big-endian reader over an in-memory slice
struct Bytes<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Bytes<'a> {
    fn take(&mut self, n: usize, context: &'static str) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(Error::Truncated(context))?;
        let slice = self.data.get(self.pos..end).ok_or(Error::Truncated(context))?;
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, n: usize, context: &'static str) -> Result<()> {
        self.take(n, context).map(|_| ())
    }

    fn u8(&mut self, context: &'static str) -> Result<u8> {
        Ok(self.take(1, context)?[0])
    }

    fn u32(&mut self, context: &'static str) -> Result<u32> {
        let b = self.take(4, context)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self, context: &'static str) -> Result<u64> {
        let b = self.take(8, context)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_be_bytes(buf))
    }

    fn rest(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }
}

/// Big-endian reader over a seekable stream
struct Source<R> {
    inner: R,
}

impl<R: Read + Seek> Source<R> {
    fn array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf).map_err(|e| eof_as_truncated(e, context))?;
        Ok(buf)
    }

    fn u16(&mut self, context: &'static str) -> Result<u16> {
        Ok(u16::from_be_bytes(self.array(context)?))
    }

    fn i16(&mut self, context: &'static str) -> Result<i16> {
        Ok(i16::from_be_bytes(self.array(context)?))
    }

    fn u32(&mut self, context: &'static str) -> Result<u32> {
        Ok(u32::from_be_bytes(self.array(context)?))
    }

    fn u64(&mut self, context: &'static str) -> Result<u64> {
        Ok(u64::from_be_bytes(self.array(context)?))
    }

    /// Section length: 32-bit in PSD, 64-bit in PSB
    fn length(&mut self, version: PsdVersion, context: &'static str) -> Result<u64> {
        if version.is_large() {
            self.u64(context)
        } else {
            Ok(self.u32(context)?.into())
        }
    }

    fn skip(&mut self, n: u64, context: &'static str) -> Result<()> {
        let offset = i64::try_from(n).map_err(|_| Error::Truncated(context))?;
        self.inner.seek(SeekFrom::Current(offset))?;
        Ok(())
    }

    fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Read exactly `n` bytes without trusting `n` for the allocation
    fn bytes(&mut self, n: u64, context: &'static str) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        (&mut self.inner).take(n).read_to_end(&mut buf)?;
        if buf.len() as u64 != n {
            return Err(Error::Truncated(context));
        }
        Ok(buf)
    }

    /// Position the stream on the next tagged block signature before `end`,
    /// skipping up to three filler bytes
    fn seek_block_signature(&mut self, end: u64) -> Result<bool> {
        for _ in 0..4 {
            let pos = self.position()?;
            if pos.saturating_add(12) > end {
                return Ok(false);
            }
            let sig: [u8; 4] = self.array("tagged block")?;
            if BLOCK_SIGNATURES.contains(&&sig) {
                return Ok(true);
            }
            self.inner.seek(SeekFrom::Start(pos + 1))?;
        }
        Ok(false)
    }
}

fn eof_as_truncated(err: io::Error, context: &'static str) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::Truncated(context)
    } else {
        Error::Io(err)
    }
}
