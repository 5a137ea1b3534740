//! Content type detection by magic bytes.
//!
//! Used by the facade when a backend returns no content type for an object.
//! Detection never fails; unknown content degrades to [`DEFAULT_CONTENT_TYPE`].

/// Generic binary type returned when nothing else matches.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const TEXT_CONTENT_TYPE: &str = "text/plain";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const UTF16LE_BOM: &[u8] = b"\xFF\xFE";
const UTF16BE_BOM: &[u8] = b"\xFE\xFF";

/// All parts must match at their offsets.
struct Signature {
    parts: &'static [(usize, &'static [u8])],
    mime: &'static str,
}

impl Signature {
    fn matches(&self, data: &[u8]) -> bool {
        self.parts.iter().all(|(offset, magic)| {
            data.get(*offset..offset + magic.len())
                .is_some_and(|window| window == *magic)
        })
    }
}

// More specific entries come before the ones they overlap with (RIFF, ftyp).
const SIGNATURES: &[Signature] = &[
    Signature { parts: &[(0, b"\x89PNG\r\n\x1a\n")], mime: "image/png" },
    Signature { parts: &[(0, b"\xFF\xD8\xFF")], mime: "image/jpeg" },
    Signature { parts: &[(0, b"GIF87a")], mime: "image/gif" },
    Signature { parts: &[(0, b"GIF89a")], mime: "image/gif" },
    Signature { parts: &[(0, b"RIFF"), (8, b"WEBP")], mime: "image/webp" },
    Signature { parts: &[(0, b"RIFF"), (8, b"WAVE")], mime: "audio/wav" },
    Signature { parts: &[(0, b"RIFF"), (8, b"AVI ")], mime: "video/x-msvideo" },
    Signature { parts: &[(0, b"BM")], mime: "image/bmp" },
    Signature { parts: &[(0, b"II*\x00")], mime: "image/tiff" },
    Signature { parts: &[(0, b"MM\x00*")], mime: "image/tiff" },
    Signature { parts: &[(0, b"\x00\x00\x01\x00")], mime: "image/vnd.microsoft.icon" },
    Signature { parts: &[(0, b"%PDF-")], mime: "application/pdf" },
    Signature { parts: &[(0, b"PK\x03\x04")], mime: "application/zip" },
    Signature { parts: &[(0, b"PK\x05\x06")], mime: "application/zip" },
    Signature { parts: &[(0, b"\x1F\x8B")], mime: "application/gzip" },
    Signature { parts: &[(0, b"7z\xBC\xAF\x27\x1C")], mime: "application/x-7z-compressed" },
    Signature { parts: &[(0, b"Rar!\x1A\x07")], mime: "application/vnd.rar" },
    Signature { parts: &[(257, b"ustar")], mime: "application/x-tar" },
    Signature { parts: &[(0, b"ID3")], mime: "audio/mpeg" },
    Signature { parts: &[(4, b"ftypqt  ")], mime: "video/quicktime" },
    Signature { parts: &[(4, b"ftypM4A ")], mime: "audio/mp4" },
    Signature { parts: &[(4, b"ftyp")], mime: "video/mp4" },
    Signature { parts: &[(0, b"OggS")], mime: "audio/ogg" },
    Signature { parts: &[(0, b"fLaC")], mime: "audio/flac" },
    Signature { parts: &[(0, b"\x1A\x45\xDF\xA3")], mime: "video/webm" },
    Signature { parts: &[(0, b"SQLite format 3\x00")], mime: "application/vnd.sqlite3" },
];

/// Detect a MIME type from the leading bytes of an object.
pub fn detect(data: &[u8]) -> &'static str {
    if let Some(signature) = SIGNATURES.iter().find(|s| s.matches(data)) {
        return signature.mime;
    }

    if is_utf16_text(data) {
        return TEXT_CONTENT_TYPE;
    }

    if is_mpeg_frame_sync(data) {
        return "audio/mpeg";
    }

    let text = match std::str::from_utf8(data.strip_prefix(UTF8_BOM).unwrap_or(data)) {
        Ok(text) if !text.is_empty() && !text.contains('\0') => text,
        _ => return DEFAULT_CONTENT_TYPE,
    };

    detect_text(text.trim_start())
}

// The UTF-16LE byte order mark is also a syntactically valid MPEG frame
// sync, so text with a BOM has to be recognised first.
fn is_utf16_text(data: &[u8]) -> bool {
    let (body, little_endian) = if let Some(body) = data.strip_prefix(UTF16LE_BOM) {
        (body, true)
    } else if let Some(body) = data.strip_prefix(UTF16BE_BOM) {
        (body, false)
    } else {
        return false;
    };
    if body.len() % 2 != 0 {
        return false;
    }

    let units = body.chunks_exact(2).map(|pair| {
        if little_endian {
            u16::from_le_bytes([pair[0], pair[1]])
        } else {
            u16::from_be_bytes([pair[0], pair[1]])
        }
    });
    char::decode_utf16(units).all(|c| c.is_ok_and(|c| c != '\0'))
}

// MPEG audio without an ID3 tag starts with an 11-bit frame sync followed by
// a version, layer, bitrate and sample rate that are not reserved values.
fn is_mpeg_frame_sync(data: &[u8]) -> bool {
    let [0xFF, second, third, ..] = data else {
        return false;
    };
    let version = (second >> 3) & 0b11;
    let layer = (second >> 1) & 0b11;
    let bitrate = third >> 4;
    let sample_rate = (third >> 2) & 0b11;

    second & 0xE0 == 0xE0
        && version != 0b01
        && layer != 0b00
        && bitrate != 0b1111
        && sample_rate != 0b11
}

fn detect_text(text: &str) -> &'static str {
    let head = text.chars().take(64).collect::<String>().to_ascii_lowercase();

    if head.starts_with("<?xml") {
        if text.contains("<svg") {
            return "image/svg+xml";
        }
        return "application/xml";
    }
    if head.starts_with("<!doctype html") || head.starts_with("<html") {
        return "text/html";
    }
    if head.starts_with("<svg") {
        return "image/svg+xml";
    }

    let trimmed = text.trim_end();
    if (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'))
    {
        return "application/json";
    }

    TEXT_CONTENT_TYPE
}
