//! Frame payload validation
//!
//! A frame payload is accepted when it carries the JPEG start-of-image and
//! end-of-image markers, allowing for trailing padding (NUL/CR/LF) that some
//! streamers append after the compressed data. Buffers that match neither
//! marker check get one full structural decode attempt before rejection.

/// JPEG start-of-image marker
const SOI: [u8; 2] = [0xFF, 0xD8];

/// JPEG end-of-image marker
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Smallest payload worth inspecting
pub const MIN_FRAME_LEN: usize = 10;

/// Strip trailing NUL/CR/LF padding from a payload
pub fn strip_padding(buf: &[u8]) -> &[u8] {
    let mut end = buf.len();
    while end > 0 && matches!(buf[end - 1], 0x00 | 0x0D | 0x0A) {
        end -= 1;
    }
    &buf[..end]
}

/// Decide whether a byte buffer is a complete, well-formed frame
///
/// Pure predicate, no side effects. Checks run in order of cost: marker
/// comparison, header-tag comparison, then a full decode as the last resort.
pub fn is_valid_frame(buf: &[u8]) -> bool {
    if buf.len() < MIN_FRAME_LEN {
        return false;
    }

    if buf[0..2] == SOI {
        if buf.ends_with(&EOI) {
            return true;
        }
        if strip_padding(buf).ends_with(&EOI) {
            return true;
        }
    }

    // JFIF/Exif application header at offset 6 identifies a JPEG container
    // even when the leading bytes were not matched above; the trailer check
    // is authoritative for those.
    if buf.len() > 20 && (&buf[6..10] == b"JFIF" || &buf[6..10] == b"Exif") {
        return strip_padding(buf).ends_with(&EOI);
    }

    image::load_from_memory(buf).is_ok()
}
