//! Text engine data parsing
//!
//! Type layers store their styling as a PostScript-like dictionary blob
//! ("EngineData"):
//!
//! ```text
//! <<
//!     /EngineDict << /StyleRun << /RunArray [ ... ] /RunLengthArray [ 5 ] >> >>
//!     /ResourceDict << /FontSet [ << /Name (\xfe\xff\x00A...) >> ] >>
//! >>
//! ```
//!
//! This module turns the blob into an [`EngineValue`] tree and resolves the
//! font used by each style run.

use crate::error::{Error, Result};
use crate::psd::document::StyleRun;

/// A value in the text engine dictionary
#[derive(Debug, Clone, PartialEq)]
pub enum EngineValue {
    /// `<< /Key value ... >>`, entries in file order
    Dict(Vec<(String, EngineValue)>),
    /// `[ value ... ]`
    Array(Vec<EngineValue>),
    Integer(i64),
    Number(f64),
    Bool(bool),
    /// `( ... )` with escapes removed, raw bytes
    String(Vec<u8>),
    /// `/Name` in value position
    Name(String),
}

impl EngineValue {
    /// Look up a key in a dictionary (first match)
    pub fn get(&self, key: &str) -> Option<&EngineValue> {
        match self {
            EngineValue::Dict(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Follow a chain of dictionary keys
    pub fn path(&self, keys: &[&str]) -> Option<&EngineValue> {
        keys.iter().try_fold(self, |value, key| value.get(key))
    }

    pub fn as_array(&self) -> Option<&[EngineValue]> {
        match self {
            EngineValue::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Integer value; whole-number reals are accepted too
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            EngineValue::Integer(n) => Some(*n),
            EngineValue::Number(n) if n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        }
    }

    /// Decode a string value
    ///
    /// Strings that start with the UTF-16BE byte order mark are decoded as
    /// UTF-16BE, anything else as UTF-8. Invalid sequences are replaced.
    pub fn as_text(&self) -> Option<String> {
        match self {
            EngineValue::String(bytes) => Some(decode_text(bytes)),
            _ => None,
        }
    }
}

fn decode_text(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Parse an engine data blob; the top-level value must be a dictionary
pub fn parse_engine_data(data: &[u8]) -> Result<EngineValue> {
    let mut parser = Parser { data, pos: 0, depth: 0 };
    parser.skip_whitespace();
    match parser.parse_value()? {
        value @ EngineValue::Dict(_) => Ok(value),
        _ => Err(malformed("engine data is not a dictionary")),
    }
}

/// Resolve the font of every style run of a type layer
///
/// Each entry of `EngineDict/StyleRun/RunArray` is paired with the entry at
/// the same index of `RunLengthArray`; the run's `StyleSheetData/Font` index
/// selects an entry of `ResourceDict/FontSet`. Runs that omit the font inherit
/// it from `DefaultRunData`.
pub fn style_runs(engine: &EngineValue) -> Result<Vec<StyleRun>> {
    let font_set = engine
        .path(&["ResourceDict", "FontSet"])
        .and_then(EngineValue::as_array)
        .ok_or_else(|| malformed("missing ResourceDict/FontSet"))?;

    let style_run = engine
        .path(&["EngineDict", "StyleRun"])
        .ok_or_else(|| malformed("missing EngineDict/StyleRun"))?;

    let run_array = style_run
        .get("RunArray")
        .and_then(EngineValue::as_array)
        .ok_or_else(|| malformed("missing StyleRun/RunArray"))?;

    let run_lengths = style_run
        .get("RunLengthArray")
        .and_then(EngineValue::as_array)
        .ok_or_else(|| malformed("missing StyleRun/RunLengthArray"))?;

    let default_font = style_run
        .path(&["DefaultRunData", "StyleSheet", "StyleSheetData", "Font"])
        .and_then(EngineValue::as_integer);

    let mut runs = Vec::with_capacity(run_array.len().min(run_lengths.len()));

    for (length, style) in run_lengths.iter().zip(run_array) {
        let index = style
            .path(&["StyleSheet", "StyleSheetData", "Font"])
            .and_then(EngineValue::as_integer)
            .or(default_font)
            .ok_or_else(|| malformed("style run has no font"))?;

        let font = usize::try_from(index)
            .ok()
            .and_then(|i| font_set.get(i))
            .ok_or_else(|| malformed(format!("font index {} out of range", index)))?;

        let name = font
            .get("Name")
            .and_then(EngineValue::as_text)
            .ok_or_else(|| malformed(format!("font {} has no name", index)))?;

        runs.push(StyleRun {
            length: length.as_integer().and_then(|n| u32::try_from(n).ok()).unwrap_or(0),
            font: name.trim_matches('\'').to_string(),
        });
    }

    Ok(runs)
}

fn malformed(reason: impl Into<String>) -> Error {
    Error::MalformedTextData(reason.into())
}

fn is_delimiter(byte: u8) -> bool {
    matches!(byte, b'/' | b'[' | b']' | b'<' | b'>' | b'(' | b')')
}

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n' | b'\0' | 0x0C)
}

/// Deepest `<< >>` / `[ ]` nesting accepted in engine data
const MAX_NESTING: usize = 256;

struct Parser<'a> {
    data: &'a [u8],
    pos: usize,
    /// Open dictionaries and arrays around the cursor
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn starts_with(&self, token: &[u8]) -> bool {
        self.data[self.pos..].starts_with(token)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(is_whitespace) {
            self.pos += 1;
        }
    }

    fn parse_value(&mut self) -> Result<EngineValue> {
        match self.peek() {
            None => Err(malformed("unexpected end of engine data")),
            Some(b'<') if self.starts_with(b"<<") => self.nested(Self::parse_dict),
            Some(b'[') => self.nested(Self::parse_array),
            Some(b'(') => self.parse_string(),
            Some(b'/') => Ok(EngineValue::Name(self.parse_name())),
            Some(_) => self.parse_bareword(),
        }
    }

    fn nested(&mut self, parse: fn(&mut Self) -> Result<EngineValue>) -> Result<EngineValue> {
        if self.depth >= MAX_NESTING {
            return Err(malformed(format!("nesting too deep at offset {}", self.pos)));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn parse_dict(&mut self) -> Result<EngineValue> {
        self.pos += 2;
        let mut entries = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(malformed("unterminated dictionary")),
                Some(b'>') if self.starts_with(b">>") => {
                    self.pos += 2;
                    return Ok(EngineValue::Dict(entries));
                }
                Some(b'/') => {
                    let key = self.parse_name();
                    self.skip_whitespace();
                    let value = self.parse_value()?;
                    entries.push((key, value));
                }
                Some(other) => {
                    return Err(malformed(format!(
                        "expected key at offset {}, found {:?}",
                        self.pos, other as char
                    )));
                }
            }
        }
    }

    fn parse_array(&mut self) -> Result<EngineValue> {
        self.pos += 1;
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(malformed("unterminated array")),
                Some(b']') => {
                    self.pos += 1;
                    return Ok(EngineValue::Array(items));
                }
                Some(_) => items.push(self.parse_value()?),
            }
        }
    }

    fn parse_string(&mut self) -> Result<EngineValue> {
        self.pos += 1;
        let mut bytes = Vec::new();

        while let Some(byte) = self.peek() {
            self.pos += 1;
            match byte {
                b'\\' => {
                    let escaped = self.peek().ok_or_else(|| malformed("unterminated string"))?;
                    bytes.push(escaped);
                    self.pos += 1;
                }
                b')' => return Ok(EngineValue::String(bytes)),
                _ => bytes.push(byte),
            }
        }

        Err(malformed("unterminated string"))
    }

    /// Reads `/Name`; the leading slash must be at the cursor
    fn parse_name(&mut self) -> String {
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|b| !is_whitespace(b) && !is_delimiter(b)) {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.data[start..self.pos]).into_owned()
    }

    fn parse_bareword(&mut self) -> Result<EngineValue> {
        let start = self.pos;
        while self.peek().is_some_and(|b| !is_whitespace(b) && !is_delimiter(b)) {
            self.pos += 1;
        }
        let word = &self.data[start..self.pos];

        match word {
            b"" => Err(malformed(format!("unexpected byte at offset {}", start))),
            b"true" => Ok(EngineValue::Bool(true)),
            b"false" => Ok(EngineValue::Bool(false)),
            _ => {
                let text = std::str::from_utf8(word)
                    .map_err(|_| malformed(format!("invalid token at offset {}", start)))?;
                if let Ok(n) = text.parse::<i64>() {
                    Ok(EngineValue::Integer(n))
                } else if let Ok(n) = text.parse::<f64>() {
                    Ok(EngineValue::Number(n))
                } else {
                    Err(malformed(format!("unknown token {:?} at offset {}", text, start)))
                }
            }
        }
    }
}
