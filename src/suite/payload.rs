//! Fixed-size, NUL-padded byte messages.
//!
//! Every text payload travels as a zero-filled buffer of a fixed length with
//! the text at the front. Receivers compare only the bytes before the first
//! NUL, so a buffer that was never written reads as the empty string.

/// Size of the short messages used by most cases.
pub const SHORT: usize = 64;

/// Size of the medium message sent by the blocking send case.
pub const MEDIUM: usize = 100 * 1024;

/// Size of the large message sent by the blocking send case.
pub const LARGE: usize = 256 * 1024;

/// A zero-filled buffer of `len` bytes.
pub fn blank(len: usize) -> Vec<u8> {
    vec![0u8; len]
}

/// A `len`-byte buffer holding `text` followed by NUL padding.
///
/// The text is cut so at least one terminating NUL always remains.
pub fn message(text: &str, len: usize) -> Vec<u8> {
    let mut buf = blank(len);
    write_text(&mut buf, text);
    buf
}

/// A short (64-byte) message.
pub fn short(text: &str) -> Vec<u8> {
    message(text, SHORT)
}

/// Overwrite `buf` with `text` and clear the rest.
pub fn write_text(buf: &mut [u8], text: &str) {
    buf.fill(0);
    let n = text.len().min(buf.len().saturating_sub(1));
    buf[..n].copy_from_slice(&text.as_bytes()[..n]);
}

/// The bytes of `buf` before the first NUL.
pub fn c_str(buf: &[u8]) -> &[u8] {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    &buf[..end]
}

/// Whether `buf` holds `text`, cut the same way [`message`] cuts it.
pub fn holds(buf: &[u8], text: &str) -> bool {
    let n = text.len().min(buf.len().saturating_sub(1));
    c_str(buf) == &text.as_bytes()[..n]
}

/// Printable rendering of the text in `buf`, for mismatch reports.
pub fn show(buf: &[u8]) -> String {
    String::from_utf8_lossy(c_str(buf)).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_is_padded_with_nul() {
        let buf = message("abc", 8);
        assert_eq!(buf, b"abc\0\0\0\0\0");
    }

    #[test]
    fn message_keeps_a_terminator_when_text_is_too_long() {
        let buf = message("abcdefgh", 4);
        assert_eq!(buf, b"abc\0");
        assert!(holds(&buf, "abcdefgh"));
    }

    #[test]
    fn c_str_stops_at_first_nul() {
        assert_eq!(c_str(b"hi\0there"), b"hi");
        assert_eq!(c_str(b"\0\0"), b"");
        assert_eq!(c_str(b"full"), b"full");
    }

    #[test]
    fn blank_buffer_reads_as_empty_text() {
        let buf = blank(SHORT);
        assert!(holds(&buf, ""));
        assert!(!holds(&buf, "x"));
    }

    #[test]
    fn write_text_clears_previous_content() {
        let mut buf = short("a much longer first message");
        write_text(&mut buf, "short");
        assert!(holds(&buf, "short"));
        assert!(buf[5..].iter().all(|&b| b == 0));
    }

    #[test]
    fn holds_rejects_prefixes_and_extensions() {
        let buf = short("Send 64 byte message");
        assert!(holds(&buf, "Send 64 byte message"));
        assert!(!holds(&buf, "Send 64 byte"));
        assert!(!holds(&buf, "Send 64 byte message!"));
    }

    #[test]
    fn show_renders_text_only() {
        assert_eq!(show(&short("hello")), "hello");
    }

    #[test]
    fn sizes_match_message_classes() {
        assert_eq!(SHORT, 64);
        assert_eq!(MEDIUM, 102_400);
        assert_eq!(LARGE, 262_144);
    }
}
