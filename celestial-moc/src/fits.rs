//! Minimal FITS container support: header cards, HDU splitting and writing.
//!
//! Only what MOC files need is covered: an empty primary HDU followed by
//! binary-table extensions. Header cards that are read and written back
//! unchanged keep their original 80-byte text.

use crate::error::{MocError, MocResult};
use std::fmt;
use std::str;

pub const CARD_SIZE: usize = 80;
pub const BLOCK_SIZE: usize = 2880;

#[derive(Debug, Clone, PartialEq)]
pub enum KeywordValue {
    Logical(bool),
    Integer(i64),
    Real(f64),
    String(String),
}

impl KeywordValue {
    pub fn as_logical(&self) -> Option<bool> {
        match self {
            Self::Logical(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    fn to_fixed_format(&self) -> String {
        match self {
            Self::Logical(b) => format!("{:>20}", if *b { "T" } else { "F" }),
            Self::Integer(i) => format!("{:>20}", i),
            Self::Real(r) => format!("{:>20}", format_real(*r)),
            Self::String(s) => {
                let escaped = s.replace('\'', "''");
                format!("'{:<8}'", escaped)
            }
        }
    }
}

impl fmt::Display for KeywordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logical(b) => write!(f, "{}", if *b { "T" } else { "F" }),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Real(r) => write!(f, "{}", format_real(*r)),
            Self::String(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<bool> for KeywordValue {
    fn from(value: bool) -> Self {
        Self::Logical(value)
    }
}

impl From<i64> for KeywordValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for KeywordValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for KeywordValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

fn format_real(value: f64) -> String {
    let text = format!("{:?}", value);
    if text.contains('.') || text.contains('e') || text.contains("inf") || text.contains("NaN") {
        text.replace('e', "E")
    } else {
        format!("{}.0", text)
    }
}

/// One 80-character header record.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub keyword: String,
    pub value: Option<KeywordValue>,
    pub comment: Option<String>,
    raw: Option<[u8; CARD_SIZE]>,
}

impl Card {
    pub fn new(keyword: impl Into<String>, value: impl Into<KeywordValue>) -> Self {
        Self {
            keyword: keyword.into(),
            value: Some(value.into()),
            comment: None,
            raw: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self.raw = None;
        self
    }

    pub fn parse(data: &[u8]) -> MocResult<Self> {
        let raw: [u8; CARD_SIZE] = data
            .try_into()
            .map_err(|_| MocError::invalid_format("header card is not 80 bytes"))?;
        let text = str::from_utf8(&raw)
            .ok()
            .filter(|s| s.is_ascii())
            .ok_or_else(|| MocError::invalid_format("non-ASCII header card"))?;

        let keyword = text[0..8].trim().to_string();
        let (value, comment) = if &text[8..10] == "= " {
            parse_value_and_comment(&keyword, &text[10..])?
        } else {
            let rest = text[8..].trim();
            (None, (!rest.is_empty()).then(|| rest.to_string()))
        };

        Ok(Self {
            keyword,
            value,
            comment,
            raw: Some(raw),
        })
    }

    pub fn to_bytes(&self) -> [u8; CARD_SIZE] {
        if let Some(raw) = self.raw {
            return raw;
        }
        let mut text = format!("{:<8}", self.keyword);
        match &self.value {
            Some(value) => {
                text.push_str("= ");
                text.push_str(&value.to_fixed_format());
                if let Some(comment) = &self.comment {
                    text.push_str(" / ");
                    text.push_str(comment);
                }
            }
            None => {
                if let Some(comment) = &self.comment {
                    text.push_str(comment);
                }
            }
        }

        let mut out = [b' '; CARD_SIZE];
        for (slot, byte) in out.iter_mut().zip(text.bytes()) {
            *slot = byte;
        }
        out
    }
}

fn parse_value_and_comment(
    keyword: &str,
    field: &str,
) -> MocResult<(Option<KeywordValue>, Option<String>)> {
    let trimmed = field.trim_start();
    if let Some(body) = trimmed.strip_prefix('\'') {
        let end = closing_quote(body)
            .ok_or_else(|| MocError::invalid_keyword_value(keyword, field.trim()))?;
        let content = body[..end].replace("''", "'");
        let value = KeywordValue::String(content.trim_end().to_string());
        return Ok((Some(value), comment_after(&body[end + 1..])));
    }

    let (value_text, rest) = match trimmed.find('/') {
        Some(pos) => (trimmed[..pos].trim(), &trimmed[pos..]),
        None => (trimmed.trim(), ""),
    };

    let value = if value_text.is_empty() {
        None
    } else {
        Some(parse_scalar(keyword, value_text)?)
    };
    Ok((value, comment_after(rest)))
}

fn closing_quote(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return Some(i);
        }
        i += 1;
    }
    None
}

fn comment_after(rest: &str) -> Option<String> {
    let comment = rest.trim_start().strip_prefix('/')?.trim();
    (!comment.is_empty()).then(|| comment.to_string())
}

fn parse_scalar(keyword: &str, text: &str) -> MocResult<KeywordValue> {
    match text {
        "T" => return Ok(KeywordValue::Logical(true)),
        "F" => return Ok(KeywordValue::Logical(false)),
        _ => {}
    }
    if let Ok(int_val) = text.parse::<i64>() {
        return Ok(KeywordValue::Integer(int_val));
    }
    if let Ok(float_val) = text.replace('D', "E").parse::<f64>() {
        return Ok(KeywordValue::Real(float_val));
    }
    Err(MocError::invalid_keyword_value(keyword, text))
}

/// An ordered list of header cards, `END` excluded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn get(&self, keyword: &str) -> Option<&KeywordValue> {
        self.cards
            .iter()
            .find(|c| c.keyword == keyword)
            .and_then(|c| c.value.as_ref())
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.cards.iter().any(|c| c.keyword == keyword)
    }

    pub fn integer(&self, keyword: &str) -> MocResult<i64> {
        let value = self
            .get(keyword)
            .ok_or_else(|| MocError::keyword_not_found(keyword))?;
        value
            .as_integer()
            .ok_or_else(|| MocError::invalid_keyword_value(keyword, value.to_string()))
    }

    pub fn optional_integer(&self, keyword: &str) -> MocResult<Option<i64>> {
        match self.get(keyword) {
            None => Ok(None),
            Some(value) => value
                .as_integer()
                .map(Some)
                .ok_or_else(|| MocError::invalid_keyword_value(keyword, value.to_string())),
        }
    }

    pub fn string(&self, keyword: &str) -> Option<&str> {
        self.get(keyword).and_then(|v| v.as_string())
    }

    /// Replace the value of `keyword` in place, or append a new card.
    pub fn set(&mut self, keyword: &str, value: impl Into<KeywordValue>) {
        let value = value.into();
        match self.cards.iter_mut().find(|c| c.keyword == keyword) {
            Some(card) => {
                card.value = Some(value);
                card.raw = None;
            }
            None => self.cards.push(Card::new(keyword, value)),
        }
    }

    /// Parse a header starting at `bytes[0]`, returning it with the number
    /// of bytes it occupies (always a multiple of [`BLOCK_SIZE`]).
    pub fn parse(bytes: &[u8]) -> MocResult<(Self, usize)> {
        let mut header = Header::new();
        let mut offset = 0;
        loop {
            let card_bytes = bytes
                .get(offset..offset + CARD_SIZE)
                .ok_or(MocError::UnexpectedEof)?;
            offset += CARD_SIZE;
            let card = Card::parse(card_bytes)?;
            if card.keyword == "END" {
                break;
            }
            header.push(card);
        }
        Ok((header, padded_len(offset)))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(padded_len((self.cards.len() + 1) * CARD_SIZE));
        for card in &self.cards {
            out.extend_from_slice(&card.to_bytes());
        }
        out.extend_from_slice(&end_card());
        out.resize(padded_len(out.len()), b' ');
        out
    }

    /// Size in bytes of the data unit that follows this header, unpadded.
    pub fn data_size(&self) -> MocResult<usize> {
        let naxis = self.integer("NAXIS")?;
        if naxis == 0 {
            return Ok(0);
        }
        let bitpix = self.integer("BITPIX")?;
        let mut elements: usize = 1;
        for axis in 1..=naxis {
            let dim = self.integer(&format!("NAXIS{}", axis))?;
            let dim = usize::try_from(dim).map_err(|_| {
                MocError::invalid_keyword_value(format!("NAXIS{}", axis), dim.to_string())
            })?;
            elements = elements
                .checked_mul(dim)
                .ok_or_else(|| MocError::invalid_format("data dimensions too large"))?;
        }
        let pcount = self.count_keyword("PCOUNT", 0)?;
        let gcount = self.count_keyword("GCOUNT", 1)?.max(1);
        let bytes_per_element = (bitpix.unsigned_abs() / 8) as usize;
        pcount
            .checked_add(elements)
            .and_then(|n| n.checked_mul(gcount))
            .and_then(|n| n.checked_mul(bytes_per_element))
            .ok_or_else(|| MocError::invalid_format("data dimensions too large"))
    }

    fn count_keyword(&self, keyword: &str, default: i64) -> MocResult<usize> {
        let value = self.optional_integer(keyword)?.unwrap_or(default);
        usize::try_from(value)
            .map_err(|_| MocError::invalid_keyword_value(keyword, value.to_string()))
    }
}

fn end_card() -> [u8; CARD_SIZE] {
    let mut out = [b' '; CARD_SIZE];
    out[..3].copy_from_slice(b"END");
    out
}

/// Round `len` up to the next FITS block boundary.
#[inline]
pub fn padded_len(len: usize) -> usize {
    len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

/// One header-data unit borrowed from a FITS byte buffer.
#[derive(Debug, Clone)]
pub struct Hdu<'a> {
    pub header: Header,
    pub data: &'a [u8],
}

/// Split a FITS file into its header-data units.
///
/// The first HDU must carry `SIMPLE = T`. Missing zero padding after the
/// last data unit is tolerated.
pub fn read_hdus(bytes: &[u8]) -> MocResult<Vec<Hdu<'_>>> {
    let mut hdus = Vec::new();
    let mut offset = 0;
    while offset < bytes.len() {
        let (header, header_len) = Header::parse(&bytes[offset..])?;
        if hdus.is_empty() && header.get("SIMPLE").and_then(|v| v.as_logical()) != Some(true) {
            return Err(MocError::invalid_format("primary header lacks SIMPLE = T"));
        }
        offset = (offset + header_len).min(bytes.len());
        let size = header.data_size()?;
        let data = offset
            .checked_add(size)
            .and_then(|end| bytes.get(offset..end))
            .ok_or(MocError::UnexpectedEof)?;
        offset = (offset + padded_len(size)).min(bytes.len());
        hdus.push(Hdu { header, data });
    }
    if hdus.is_empty() {
        return Err(MocError::invalid_format("empty file"));
    }
    Ok(hdus)
}

/// Serialize header-data units, padding each data unit with zeros.
pub fn write_hdus<'a>(hdus: impl IntoIterator<Item = (&'a Header, &'a [u8])>) -> Vec<u8> {
    let mut out = Vec::new();
    for (header, data) in hdus {
        out.extend_from_slice(&header.to_bytes());
        out.extend_from_slice(data);
        out.resize(padded_len(out.len()), 0);
    }
    out
}

/// Byte width of one element of a binary-table `TFORM` data type.
pub fn element_size(data_type: char) -> MocResult<usize> {
    match data_type {
        'L' | 'X' | 'B' | 'A' => Ok(1),
        'I' => Ok(2),
        'J' | 'E' => Ok(4),
        'K' | 'D' | 'C' | 'P' => Ok(8),
        'M' | 'Q' => Ok(16),
        _ => Err(MocError::invalid_format(format!(
            "Unknown binary table format: {}",
            data_type
        ))),
    }
}

/// Split a `TFORMn` value such as `1K` into its repeat count and type code.
pub fn parse_tform(format: &str) -> MocResult<(usize, char)> {
    let format = format.trim();
    let digits_end = format
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| MocError::invalid_format(format!("missing data type in '{}'", format)))?;
    let repeat = if digits_end == 0 {
        1
    } else {
        format[..digits_end]
            .parse()
            .map_err(|_| MocError::invalid_format(format!("invalid repeat count in '{}'", format)))?
    };
    let data_type = format[digits_end..]
        .chars()
        .next()
        .ok_or_else(|| MocError::invalid_format(format!("missing data type in '{}'", format)))?;
    Ok((repeat, data_type))
}
