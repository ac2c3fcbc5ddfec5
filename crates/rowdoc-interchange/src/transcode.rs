//! Three-way text transcoding
//!
//! The converter deals with three encodings: the legacy single-byte code
//! page the source stores non-Unicode text in (windows-1252 for the whole
//! run), the wide two-byte encoding of its Unicode columns (UTF-16 code
//! units), and UTF-8 as the document encoding.
//!
//! Legacy → UTF-8 is total: every one of the 256 byte values maps to a
//! character and round-trips exactly. The reverse direction is the one lossy
//! boundary of the system: a character outside the windows-1252 repertoire
//! cannot survive UTF-8 → Legacy and is substituted with `SUBSTITUTE`
//! (`'?'`). That degradation is deliberate and deterministic, not an error.

use encoding_rs::{EncoderResult, WINDOWS_1252};
use thiserror::Error;

/// Substitution byte for characters outside the legacy repertoire.
pub const SUBSTITUTE: u8 = b'?';

/// Errors during encoding conversion
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// Non-empty input for which the conversion produced no output units.
    #[error("conversion to {encoding} produced no output for non-empty input")]
    Unconvertible { encoding: &'static str },

    /// Wide input that is not well-formed UTF-16 (unpaired surrogate).
    #[error("wide text is not valid UTF-16: {0}")]
    InvalidWide(String),
}

/// Decode legacy (windows-1252) bytes into UTF-8.
pub fn legacy_to_utf8(bytes: &[u8]) -> Result<String, TranscodeError> {
    if bytes.is_empty() {
        return Ok(String::new());
    }
    let (text, _had_errors) = WINDOWS_1252.decode_without_bom_handling(bytes);
    if text.is_empty() {
        return Err(TranscodeError::Unconvertible { encoding: "UTF-8" });
    }
    Ok(text.into_owned())
}

/// Encode UTF-8 text into legacy (windows-1252) bytes.
///
/// Characters with no windows-1252 mapping become `SUBSTITUTE`.
pub fn utf8_to_legacy(text: &str) -> Result<Vec<u8>, TranscodeError> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    let mut encoder = WINDOWS_1252.new_encoder();
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 1024];
    let mut remaining = text;
    loop {
        let (result, read, written) =
            encoder.encode_from_utf8_without_replacement(remaining, &mut buf, true);
        out.extend_from_slice(&buf[..written]);
        remaining = &remaining[read..];
        match result {
            EncoderResult::InputEmpty => break,
            EncoderResult::OutputFull => continue,
            EncoderResult::Unmappable(_) => out.push(SUBSTITUTE),
        }
    }
    if out.is_empty() {
        return Err(TranscodeError::Unconvertible {
            encoding: "windows-1252",
        });
    }
    Ok(out)
}

/// Decode wide (UTF-16) code units into UTF-8.
pub fn wide_to_utf8(units: &[u16]) -> Result<String, TranscodeError> {
    if units.is_empty() {
        return Ok(String::new());
    }
    let text =
        String::from_utf16(units).map_err(|e| TranscodeError::InvalidWide(e.to_string()))?;
    if text.is_empty() {
        return Err(TranscodeError::Unconvertible { encoding: "UTF-8" });
    }
    Ok(text)
}

/// Encode UTF-8 text into wide (UTF-16) code units. Total.
pub fn utf8_to_wide(text: &str) -> Vec<u16> {
    text.encode_utf16().collect()
}

/// Legacy bytes to wide code units.
pub fn legacy_to_wide(bytes: &[u8]) -> Result<Vec<u16>, TranscodeError> {
    Ok(utf8_to_wide(&legacy_to_utf8(bytes)?))
}

/// Wide code units to legacy bytes, substituting outside the repertoire.
pub fn wide_to_legacy(units: &[u16]) -> Result<Vec<u8>, TranscodeError> {
    if units.is_empty() {
        return Ok(Vec::new());
    }
    utf8_to_legacy(&wide_to_utf8(units)?)
}
