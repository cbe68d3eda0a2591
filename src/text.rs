//! Bidirectional LF/CRLF conversion for text-mode entries.
//!
//! Text files are archived in their on-disk form (CRLF line endings) and
//! handed back to callers in normal form (LF). The to-disk direction
//! precomputes the exact output size so the buffer is allocated once.

/// Length of `data` after every LF is expanded to CRLF.
pub fn disk_text_size(data: &[u8]) -> usize {
    data.len() + data.iter().filter(|&&b| b == b'\n').count()
}

/// Copy text data into the form appropriate for disk: LF becomes CRLF.
pub fn text_to_disk(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(disk_text_size(data));
    for &b in data {
        if b == b'\n' {
            out.push(b'\r');
        }
        out.push(b);
    }
    out
}

/// Copy text data from its disk form back to a normal string: CRLF
/// becomes LF. A CR not followed by LF passes through unchanged.
pub fn text_from_disk(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i] == b'\r' && data.get(i + 1) == Some(&b'\n') {
            out.push(b'\n');
            i += 2;
            continue;
        }
        out.push(data[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn expands_lf_to_crlf() {
        assert_eq!(text_to_disk(b"x\ny\n"), b"x\r\ny\r\n");
        assert_eq!(disk_text_size(b"x\ny\n"), 6);
    }

    #[test]
    fn collapses_crlf_to_lf() {
        assert_eq!(text_from_disk(b"x\r\ny\r\n"), b"x\ny\n");
    }

    #[test]
    fn lone_carriage_return_passes_through() {
        assert_eq!(text_from_disk(b"a\rb"), b"a\rb");
        assert_eq!(text_to_disk(b"a\rb"), b"a\rb");
    }

    #[test]
    fn round_trip() {
        let original = b"line one\nline two\nno trailing newline";
        assert_eq!(text_from_disk(&text_to_disk(original)), original);
    }

    #[test]
    fn empty_input() {
        assert_eq!(text_to_disk(b""), b"");
        assert_eq!(text_from_disk(b""), b"");
    }
}
