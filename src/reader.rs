/*!
 * Content reading with encoding fallback
 */

use std::fs;
use std::path::Path;

use crate::classifier::{decode_latin1, decode_windows_1251};

/// Substituted for the content of a file no decoder could read
pub const DECODE_FAILURE: &str = "[ERROR: Could not decode file]";

/// Read a file already classified as text.
///
/// Tries UTF-8, then Windows-1251, then Latin-1 on the whole file and
/// returns the first successful decoding with line breaks normalized to
/// `\n`. When the file cannot be read at all, [`DECODE_FAILURE`] is
/// returned in place of the content.
pub fn read_file_content(path: &Path) -> String {
    match fs::read(path) {
        Ok(bytes) => decode_content(bytes),
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", path.display(), e);
            DECODE_FAILURE.to_string()
        }
    }
}

/// Decode a whole file's bytes with the fallback chain
pub fn decode_content(bytes: Vec<u8>) -> String {
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            let bytes = e.into_bytes();
            decode_windows_1251(&bytes).unwrap_or_else(|| decode_latin1(&bytes))
        }
    };
    normalize_newlines(text)
}

/// Turn `\r\n` and lone `\r` line breaks into `\n`
pub fn normalize_newlines(text: String) -> String {
    if !text.contains('\r') {
        return text;
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}
