/*!
 * Binary/text classification by byte inspection
 *
 * Cheap rejects come first: known magic numbers, then null-byte density.
 * Only then is the sample decoded with a list of candidate encodings, and
 * it counts as text if any decoding yields few control characters.
 */

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use encoding_rs::{Encoding, WINDOWS_1251, WINDOWS_1252};

/// Number of leading bytes inspected
pub const SAMPLE_SIZE: usize = 8192;

/// Fraction of null bytes above which a sample is binary
const MAX_NULL_RATIO: f64 = 0.1;

/// Fraction of non-printable characters above which a decoding is rejected
const MAX_CONTROL_RATIO: f64 = 0.1;

/// Magic numbers of common binary formats, checked in order
pub const BINARY_SIGNATURES: &[(&[u8], &str)] = &[
    // Images
    (b"\x89PNG", "png"),
    (b"\xff\xd8\xff", "jpeg"),
    (b"GIF8", "gif"),
    (b"RIFF", "riff"),
    // Archives
    (b"PK\x03\x04", "zip"),
    (b"PK\x05\x06", "zip"),
    (b"PK\x07\x08", "zip"),
    (b"Rar!\x1a\x07", "rar"),
    (b"7z\xbc\xaf\x27\x1c", "7z"),
    (b"\x1f\x8b", "gzip"),
    (b"BZh", "bzip2"),
    // Documents
    (b"%PDF", "pdf"),
    (b"\xd0\xcf\x11\xe0", "ole"),
    // Audio/Video
    (b"fLaC", "flac"),
    (b"ID3", "mp3"),
    (b"OggS", "ogg"),
    (b"\x00\x00\x00\x20ftyp", "mp4"),
    // Executables
    (b"MZ", "pe"),
    (b"\x7fELF", "elf"),
    // Databases
    (b"SQLite", "sqlite"),
];

/// Why content was judged binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryReason {
    /// Starts with a known magic number
    Signature(&'static str),
    /// More than 10% null bytes
    NullBytes,
    /// No candidate encoding produced mostly printable text
    Undecodable,
    /// The file could not be opened or read
    Unreadable,
}

/// Result of classifying a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Text,
    Binary(BinaryReason),
}

impl Classification {
    pub fn is_text(&self) -> bool {
        matches!(self, Classification::Text)
    }
}

/// Candidate decodings tried on the sample, in order
#[derive(Debug, Clone, Copy)]
enum SampleEncoding {
    Utf8,
    Utf8Bom,
    Windows1252,
    Latin1,
    Windows1251,
}

// Bytes the cp1252 and cp1251 code pages leave unassigned. encoding_rs maps
// them to C1 controls, so they are rejected before decoding.
const WINDOWS_1252_UNASSIGNED: &[u8] = &[0x81, 0x8d, 0x8f, 0x90, 0x9d];
const WINDOWS_1251_UNASSIGNED: &[u8] = &[0x98];

const SAMPLE_ENCODINGS: [SampleEncoding; 5] = [
    SampleEncoding::Utf8,
    SampleEncoding::Utf8Bom,
    SampleEncoding::Windows1252,
    SampleEncoding::Latin1,
    SampleEncoding::Windows1251,
];

/// Classify the file at `path`, reading at most [`SAMPLE_SIZE`] bytes
pub fn classify_file(path: &Path) -> Classification {
    match read_sample(path) {
        Ok((sample, truncated)) => classify_sample(&sample, truncated),
        Err(e) => {
            tracing::debug!("Unable to sample {}: {}", path.display(), e);
            Classification::Binary(BinaryReason::Unreadable)
        }
    }
}

/// Classify a complete in-memory buffer
pub fn classify_bytes(data: &[u8]) -> Classification {
    let len = data.len().min(SAMPLE_SIZE);
    classify_sample(&data[..len], data.len() > SAMPLE_SIZE)
}

fn read_sample(path: &Path) -> io::Result<(Vec<u8>, bool)> {
    let file = File::open(path)?;
    let mut sample = Vec::with_capacity(SAMPLE_SIZE);
    // One extra byte tells us whether the sample cut the file short
    file.take(SAMPLE_SIZE as u64 + 1).read_to_end(&mut sample)?;
    let truncated = sample.len() > SAMPLE_SIZE;
    sample.truncate(SAMPLE_SIZE);
    Ok((sample, truncated))
}

/// `truncated` is set when the sample is a strict prefix of the file
fn classify_sample(sample: &[u8], truncated: bool) -> Classification {
    if sample.is_empty() {
        return Classification::Text;
    }

    if let Some(label) = binary_signature(sample) {
        return Classification::Binary(BinaryReason::Signature(label));
    }

    let nulls = sample.iter().filter(|&&b| b == 0).count();
    if nulls as f64 / sample.len() as f64 > MAX_NULL_RATIO {
        return Classification::Binary(BinaryReason::NullBytes);
    }

    for encoding in SAMPLE_ENCODINGS {
        let Some(decoded) = decode_sample(sample, encoding, truncated) else {
            continue;
        };
        if control_ratio(&decoded) <= MAX_CONTROL_RATIO {
            return Classification::Text;
        }
    }

    Classification::Binary(BinaryReason::Undecodable)
}

/// Label of the first signature `data` starts with
pub fn binary_signature(data: &[u8]) -> Option<&'static str> {
    BINARY_SIGNATURES
        .iter()
        .find(|(magic, _)| data.starts_with(magic))
        .map(|(_, label)| *label)
}

fn decode_sample(sample: &[u8], encoding: SampleEncoding, truncated: bool) -> Option<String> {
    match encoding {
        SampleEncoding::Utf8 => decode_utf8_prefix(sample, truncated),
        SampleEncoding::Utf8Bom => {
            let body = sample.strip_prefix(b"\xef\xbb\xbf").unwrap_or(sample);
            decode_utf8_prefix(body, truncated)
        }
        SampleEncoding::Windows1252 => decode_windows_1252(sample),
        SampleEncoding::Latin1 => Some(decode_latin1(sample)),
        SampleEncoding::Windows1251 => decode_windows_1251(sample),
    }
}

/// Strict Windows-1252 decoding; `None` if any byte is unassigned
pub fn decode_windows_1252(bytes: &[u8]) -> Option<String> {
    decode_code_page(WINDOWS_1252, WINDOWS_1252_UNASSIGNED, bytes)
}

/// Strict Windows-1251 decoding; `None` if any byte is unassigned
pub fn decode_windows_1251(bytes: &[u8]) -> Option<String> {
    decode_code_page(WINDOWS_1251, WINDOWS_1251_UNASSIGNED, bytes)
}

fn decode_code_page(
    encoding: &'static Encoding,
    unassigned: &[u8],
    bytes: &[u8],
) -> Option<String> {
    if bytes.iter().any(|b| unassigned.contains(b)) {
        return None;
    }
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|s| s.into_owned())
}

// A multi-byte sequence split by the sample boundary is not an error
fn decode_utf8_prefix(bytes: &[u8], truncated: bool) -> Option<String> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Some(s.to_string()),
        Err(e) if truncated && e.error_len().is_none() => {
            Some(String::from_utf8_lossy(&bytes[..e.valid_up_to()]).into_owned())
        }
        Err(_) => None,
    }
}

/// ISO-8859-1: every byte maps to the code point of the same value
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Fraction of characters that are neither printable nor `\n`, `\r`, `\t`
pub fn control_ratio(text: &str) -> f64 {
    let mut total = 0usize;
    let mut control = 0usize;
    for c in text.chars() {
        total += 1;
        if !matches!(c, '\n' | '\r' | '\t') && !is_printable(c) {
            control += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        control as f64 / total as f64
    }
}

/// Printable means not a control, format, separator or private-use character;
/// the plain space is printable.
///
/// Format characters (Cf) are listed as of Unicode 15.1. Unassigned code
/// points are not tracked and count as printable.
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() || c.is_whitespace() {
        return false;
    }
    !matches!(c,
        '\u{00AD}'
        | '\u{0600}'..='\u{0605}'
        | '\u{061C}'
        | '\u{06DD}'
        | '\u{070F}'
        | '\u{0890}'..='\u{0891}'
        | '\u{08E2}'
        | '\u{180E}'
        | '\u{200B}'..='\u{200F}'
        | '\u{202A}'..='\u{202E}'
        | '\u{2060}'..='\u{2064}'
        | '\u{2066}'..='\u{206F}'
        | '\u{FEFF}'
        | '\u{FFF9}'..='\u{FFFB}'
        | '\u{110BD}'
        | '\u{110CD}'
        | '\u{13430}'..='\u{1343F}'
        | '\u{1BCA0}'..='\u{1BCA3}'
        | '\u{1D173}'..='\u{1D17A}'
        | '\u{E0001}'
        | '\u{E0020}'..='\u{E007F}'
        | '\u{E000}'..='\u{F8FF}'
        | '\u{F0000}'..='\u{FFFFD}'
        | '\u{100000}'..='\u{10FFFD}'
    )
}
