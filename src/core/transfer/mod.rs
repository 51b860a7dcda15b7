//! CSV exchange formats
//!
//! Files are semicolon-delimited with a header row. They come from Excel on
//! French Windows, so they are read as UTF-8 (with or without BOM) or
//! Windows-1252, and written as Windows-1252 unless asked otherwise.

mod catalog;
mod dpgf;

pub use catalog::{
    parse_catalog, read_catalog, write_catalog, ParsedCatalog, CATALOG_COLUMNS, REQUIRED_COLUMNS,
};
pub use dpgf::{copy_documents, write_dpgf, CopyReport, DPGF_COLUMNS};

use std::fmt;
use std::str::FromStr;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Characters for bytes 0x80..=0x9F; `None` marks the five unassigned bytes
const CP1252_HIGH: [Option<char>; 32] = [
    Some('€'), None, Some('‚'), Some('ƒ'), Some('„'), Some('…'), Some('†'), Some('‡'),
    Some('ˆ'), Some('‰'), Some('Š'), Some('‹'), Some('Œ'), None, Some('Ž'), None,
    None, Some('‘'), Some('’'), Some('“'), Some('”'), Some('•'), Some('–'), Some('—'),
    Some('˜'), Some('™'), Some('š'), Some('›'), Some('œ'), None, Some('ž'), Some('Ÿ'),
];

/// Text encoding of a CSV file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Windows-1252 (Excel "CSV (separator: semicolon)" on French Windows)
    #[default]
    Cp1252,
    /// UTF-8 with a byte-order mark
    Utf8Bom,
    /// UTF-8 without BOM; only produced by detection
    Utf8,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Cp1252 => write!(f, "cp1252"),
            Encoding::Utf8Bom => write!(f, "utf8-bom"),
            Encoding::Utf8 => write!(f, "utf8"),
        }
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "cp1252" | "windows1252" | "ansi" | "latin1" => Ok(Encoding::Cp1252),
            "utf8" | "utf8bom" | "utf8sig" => Ok(Encoding::Utf8Bom),
            _ => Err(format!(
                "unsupported encoding '{}'. Supported: cp1252, utf8",
                s
            )),
        }
    }
}

/// Decode file contents, detecting the encoding
pub fn decode(bytes: &[u8]) -> (String, Encoding) {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        return (String::from_utf8_lossy(rest).into_owned(), Encoding::Utf8Bom);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => (s.to_string(), Encoding::Utf8),
        Err(_) => (decode_cp1252(bytes), Encoding::Cp1252),
    }
}

fn decode_cp1252(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            0x80..=0x9F => CP1252_HIGH[(b - 0x80) as usize].unwrap_or(b as char),
            _ => b as char,
        })
        .collect()
}

/// Encode text for writing; unmappable characters become `?` in Windows-1252
pub fn encode(text: &str, encoding: Encoding) -> Vec<u8> {
    match encoding {
        Encoding::Utf8Bom => {
            let mut out = UTF8_BOM.to_vec();
            out.extend_from_slice(text.as_bytes());
            out
        }
        Encoding::Utf8 => text.as_bytes().to_vec(),
        Encoding::Cp1252 => text.chars().map(encode_cp1252_char).collect(),
    }
}

fn encode_cp1252_char(c: char) -> u8 {
    let code = c as u32;
    if code < 0x80 || (0xA0..=0xFF).contains(&code) {
        return code as u8;
    }
    if let Some(pos) = CP1252_HIGH.iter().position(|&m| m == Some(c)) {
        return 0x80 + pos as u8;
    }
    // Unassigned bytes decode to the matching C1 control; map them back
    if (0x80..=0x9F).contains(&code) && CP1252_HIGH[(code - 0x80) as usize].is_none() {
        return code as u8;
    }
    b'?'
}

/// Parse a French- or English-formatted price
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '€' | ' ' | '\u{a0}' | '\u{202f}'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let normalized = if cleaned.contains(',') && cleaned.contains('.') {
        // 1.234,50
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned.replace(',', ".")
    };
    normalized.parse::<f64>().ok().filter(|p| p.is_finite())
}

/// Format a price with a decimal comma and two decimals
pub fn format_price(price: f64) -> String {
    format!("{:.2}", price).replace('.', ",")
}
