//! Dot-stuffing for SMTP DATA (RFC 5321 §4.5.2).
//!
//! A `.` that begins a body line must be doubled so that the bare `.`
//! line stays reserved for the DATA terminator. Line boundaries may
//! cross write calls, so the stuffer carries the last two bytes it
//! emitted and consults them when the next chunk arrives.

/// Escapes leading dots in a DATA body streamed in arbitrary chunks.
#[derive(Debug)]
pub struct DotStuffer {
    escape: bool,
    /// Up to two most recently emitted bytes.
    last: Vec<u8>,
    started: bool,
}

impl DotStuffer {
    /// Creates a stuffer; `escape = false` turns it into a pass-through.
    #[must_use]
    pub fn new(escape: bool) -> Self {
        Self {
            escape,
            last: Vec::with_capacity(2),
            started: false,
        }
    }

    /// Escapes one chunk and returns the bytes to put on the wire.
    ///
    /// A dot is doubled when the previously emitted byte was `\n`, or
    /// when the dot is the very first byte of the stream. The carry is
    /// tracked even with escaping disabled so [`end`](Self::end) can
    /// still normalize the terminator.
    pub fn write(&mut self, chunk: &[u8]) -> Vec<u8> {
        if chunk.is_empty() {
            return Vec::new();
        }

        let out = if self.escape {
            let mut out = Vec::with_capacity(chunk.len() + 2);
            let mut prev = self.last.last().copied();
            for &b in chunk {
                if b == b'.' {
                    let line_start = match prev {
                        Some(p) => p == b'\n',
                        None => !self.started,
                    };
                    if line_start {
                        out.push(b'.');
                    }
                }
                out.push(b);
                prev = Some(b);
            }
            out
        } else {
            chunk.to_vec()
        };

        self.remember(&out);
        self.started = true;
        out
    }

    /// Returns the body terminator, normalized against the bytes already
    /// sent, and resets the stuffer.
    ///
    /// `\r\n.\r\n` in full, shortened to `.\r\n` when the stream already
    /// ends with CRLF, or completed to `\n.\r\n` after a dangling CR.
    pub fn end(&mut self) -> Vec<u8> {
        let terminator: &[u8] = if self.last.ends_with(b"\r\n") {
            b".\r\n"
        } else if self.last.ends_with(b"\r") {
            b"\n.\r\n"
        } else {
            b"\r\n.\r\n"
        };
        self.reset();
        terminator.to_vec()
    }

    /// Clears the carry, as after a completed or aborted transaction.
    pub fn reset(&mut self) {
        self.last.clear();
        self.started = false;
    }

    fn remember(&mut self, out: &[u8]) {
        match out.len() {
            0 => {}
            1 => {
                self.last.push(out[0]);
                if self.last.len() > 2 {
                    self.last.remove(0);
                }
            }
            n => {
                self.last.clear();
                self.last.extend_from_slice(&out[n - 2..]);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn dot_after_crlf_is_doubled() {
        let mut s = DotStuffer::new(true);
        assert_eq!(s.write(b"a\r\n.b\r\n"), b"a\r\n..b\r\n");
    }

    #[test]
    fn dot_at_stream_start_is_doubled() {
        let mut s = DotStuffer::new(true);
        assert_eq!(s.write(b".start"), b"..start");
    }

    #[test]
    fn dot_mid_line_is_untouched() {
        let mut s = DotStuffer::new(true);
        assert_eq!(s.write(b"a.b.c\r\nd.e"), b"a.b.c\r\nd.e");
    }

    #[test]
    fn escaping_across_chunk_boundaries() {
        // Line boundaries land on every awkward split.
        let mut s = DotStuffer::new(true);
        assert_eq!(s.write(b".a\r\n.b\r"), b"..a\r\n..b\r");
        assert_eq!(s.write(b"\n.c\r\n"), b"\n..c\r\n");
        assert_eq!(s.write(b".d"), b"..d");
    }

    #[test]
    fn disabled_escaping_passes_bytes_through() {
        let mut s = DotStuffer::new(false);
        assert_eq!(s.write(b".a\r\n.b\r"), b".a\r\n.b\r");
        assert_eq!(s.write(b"\n.c\r\n"), b"\n.c\r\n");
        assert_eq!(s.write(b".d"), b".d");
    }

    #[test]
    fn terminator_after_complete_line() {
        let mut s = DotStuffer::new(true);
        s.write(b"body\r\n");
        assert_eq!(s.end(), b".\r\n");
    }

    #[test]
    fn terminator_after_dangling_cr() {
        let mut s = DotStuffer::new(true);
        s.write(b"body\r");
        assert_eq!(s.end(), b"\n.\r\n");
    }

    #[test]
    fn terminator_after_unterminated_line() {
        let mut s = DotStuffer::new(true);
        s.write(b"Subject: x\r\n\r\nBody");
        assert_eq!(s.end(), b"\r\n.\r\n");
    }

    #[test]
    fn terminator_on_empty_stream() {
        let mut s = DotStuffer::new(true);
        assert_eq!(s.end(), b"\r\n.\r\n");
    }

    #[test]
    fn terminator_normalized_when_escaping_disabled() {
        let mut s = DotStuffer::new(false);
        s.write(b"body\r\n");
        assert_eq!(s.end(), b".\r\n");
    }

    #[test]
    fn single_byte_writes_keep_the_carry_accurate() {
        let mut s = DotStuffer::new(true);
        s.write(b"a");
        s.write(b"\r");
        s.write(b"\n");
        assert_eq!(s.write(b"."), b"..");
        assert_eq!(s.end(), b"\r\n.\r\n");
    }

    #[test]
    fn end_resets_for_reuse() {
        let mut s = DotStuffer::new(true);
        s.write(b"x\r\n");
        s.end();
        // A fresh stream: the leading dot is at the stream start again.
        assert_eq!(s.write(b".y"), b"..y");
    }

    #[test]
    fn no_bare_dot_line_in_stuffed_output() {
        let mut s = DotStuffer::new(true);
        let mut wire = Vec::new();
        for chunk in [&b"Hi\r\n"[..], b".", b"\r\nBye\r\n", b".tail\r\n"] {
            wire.extend(s.write(chunk));
        }
        wire.extend(s.end());

        let mut lines: Vec<&[u8]> = Vec::new();
        let mut rest: &[u8] = &wire;
        while let Some(pos) = rest.windows(2).position(|w| w == b"\r\n") {
            lines.push(&rest[..pos]);
            rest = &rest[pos + 2..];
        }
        lines.push(rest);

        let dot_lines = lines.iter().filter(|l| **l == [b'.']).count();
        assert_eq!(dot_lines, 1, "only the terminator may be a bare dot");
        assert_eq!(lines.last().map(|l| l.is_empty()), Some(true));
    }
}
