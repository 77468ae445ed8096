//! Gate keywords from a FITS file, via `fitsrs`.

use std::io::Cursor;

use fitsrs::card::Value;
use fitsrs::{Fits, HDU};
use thiserror::Error;
use tracing::debug;

use super::types::{HeaderKeywords, HeaderValue};

/// Keywords the quality gate consults.
pub const GATE_KEYWORDS: [&str; 5] = ["OBS_MODE", "GRATING", "INSTRUME", "READMODE", "DTYCYCLE"];

#[derive(Debug, Error, PartialEq)]
pub enum FitsError {
    #[error("not a readable FITS file: {0}")]
    Format(String),

    #[error("file has no header")]
    Empty,
}

/// Reads the gate keywords of every HDU in `bytes`.
///
/// Keywords of later HDUs replace those of earlier ones, so the result
/// holds the extension's view on top of the primary header. A damaged HDU
/// after the primary one ends the scan; what was read so far is kept.
pub fn read_keywords(bytes: &[u8]) -> Result<HeaderKeywords, FitsError> {
    let hdus = Fits::from_reader(Cursor::new(bytes.to_vec()));
    let mut keywords = HeaderKeywords::new();
    let mut read = 0;

    for hdu in hdus {
        let hdu = match hdu {
            Ok(hdu) => hdu,
            Err(e) if read == 0 => return Err(FitsError::Format(e.to_string())),
            Err(e) => {
                debug!("Stopping after {} HDUs: {}", read, e);
                break;
            }
        };
        let found = match &hdu {
            HDU::Primary(h) => gate_keywords(|key| h.get_header().get(key)),
            HDU::XImage(h) => gate_keywords(|key| h.get_header().get(key)),
            HDU::XBinaryTable(h) => gate_keywords(|key| h.get_header().get(key)),
            HDU::XASCIITable(h) => gate_keywords(|key| h.get_header().get(key)),
        };
        keywords.merge(found);
        read += 1;
    }

    if read == 0 {
        return Err(FitsError::Empty);
    }
    Ok(keywords)
}

/// Looks up each gate keyword through `lookup`.
fn gate_keywords<'a>(lookup: impl Fn(&str) -> Option<&'a Value>) -> HeaderKeywords {
    let mut found = HeaderKeywords::new();
    for name in GATE_KEYWORDS {
        if let Some(value) = lookup(name).and_then(convert) {
            found.insert(name, value);
        }
    }
    found
}

/// Keyword as it sits in a card: eight bytes, space padded.
#[cfg_attr(not(test), allow(dead_code))]
fn card_key(name: &str) -> [u8; 8] {
    let mut key = [b' '; 8];
    for (slot, byte) in key.iter_mut().zip(name.bytes()) {
        *slot = byte;
    }
    key
}

fn convert(value: &Value) -> Option<HeaderValue> {
    match value {
        Value::String { value: s, .. } => Some(HeaderValue::Str(s.trim().to_string())),
        Value::Integer { value: i, .. } => Some(HeaderValue::Int(*i)),
        Value::Float { value: f, .. } => Some(HeaderValue::Float(*f)),
        Value::Logical { value: b, .. } => Some(HeaderValue::Bool(*b)),
        _ => None,
    }
}
