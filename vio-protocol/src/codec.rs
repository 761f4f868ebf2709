/// Line framing of the byte stream and interpretation of response lines
use std::io::{self, Write};

use crate::protocol::{Command, ErrorCode, Response};

/// Delimiter of lines received from the device.
pub const LINE_DELIMITER: &[u8; 2] = b"\r\n";

/// Reassembles `\r\n` delimited lines from arbitrarily split chunks of a byte stream.
///
/// Bytes after the last delimiter are kept until the next chunk completes the line.
#[derive(Debug, Default, Clone)]
pub struct LineBuffer {
    buf: Vec<u8>,
    // Position from which the next search for a delimiter starts.
    next_index: usize,
}

impl LineBuffer {
    pub fn new() -> LineBuffer {
        LineBuffer::default()
    }

    /// Appends a chunk and returns every line it completed, without the delimiter.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut consumed = 0;
        let mut search = self.next_index;
        while let Some(pos) = self.buf[search..]
            .windows(LINE_DELIMITER.len())
            .position(|w| w == LINE_DELIMITER)
        {
            let end = search + pos;
            lines.push(String::from_utf8_lossy(&self.buf[consumed..end]).into_owned());
            consumed = end + LINE_DELIMITER.len();
            search = consumed;
        }
        self.buf.drain(..consumed);

        // The last byte may be the first half of a delimiter
        self.next_index = self.buf.len().saturating_sub(LINE_DELIMITER.len() - 1);
        lines
    }

    /// Bytes of the incomplete line received so far.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Discards any incomplete line.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.next_index = 0;
    }
}

type Matcher = fn(&str) -> Option<Response>;

impl Response {
    const MATCHERS: [Matcher; 5] = [
        Self::match_connection_count,
        Self::match_device,
        Self::match_version,
        Self::match_readback_idle,
        Self::match_error,
    ];

    /// Interprets a line received from the device.
    ///
    /// Every known pattern is searched for independently, anywhere in the line,
    /// so a line may produce several responses. They are returned in a fixed order:
    /// controller count, device, version, readback state, error.
    /// Unknown lines produce no response.
    pub fn parse_all(line: &str) -> Vec<Response> {
        Self::MATCHERS
            .iter()
            .filter_map(|matcher| matcher(line))
            .collect()
    }

    /// `TPcon<d>`, a single digit
    fn match_connection_count(line: &str) -> Option<Response> {
        find_after(line, "TPcon", |rest| {
            let (digits, _) = leading_digits(rest, 1);
            digits.parse().ok().map(Response::ConnectionCount)
        })
    }

    /// `DEV<n>`
    fn match_device(line: &str) -> Option<Response> {
        find_after(line, "DEV", |rest| {
            let (digits, _) = leading_digits(rest, usize::MAX);
            saturating_number(digits).map(Response::Device)
        })
    }

    /// `TPver<i>,<v>`
    fn match_version(line: &str) -> Option<Response> {
        find_after(line, "TPver", |rest| {
            let (index, rest) = leading_digits(rest, usize::MAX);
            let (version, _) = leading_digits(rest.strip_prefix(',')?, usize::MAX);
            Some(Response::Version {
                index: saturating_number(index)?,
                command_set: saturating_number(version)?,
            })
        })
    }

    fn match_readback_idle(line: &str) -> Option<Response> {
        line.contains("TPdie0").then_some(Response::ReadbackIdle)
    }

    /// `E<nn>`, exactly two digits
    fn match_error(line: &str) -> Option<Response> {
        find_after(line, "E", |rest| {
            let (digits, _) = leading_digits(rest, 2);
            if digits.len() != 2 {
                return None;
            }
            digits
                .parse()
                .ok()
                .map(|code| Response::Error(ErrorCode::from_code(code)))
        })
    }
}

/// Applies `extract` to the text following each occurrence of `prefix` and
/// returns the first successful extraction.
fn find_after<T>(line: &str, prefix: &str, extract: impl Fn(&str) -> Option<T>) -> Option<T> {
    line.match_indices(prefix)
        .find_map(|(pos, _)| extract(&line[pos + prefix.len()..]))
}

/// Splits off at most `max` leading ASCII digits.
fn leading_digits(s: &str, max: usize) -> (&str, &str) {
    let len = s
        .bytes()
        .take(max)
        .take_while(|b| b.is_ascii_digit())
        .count();
    s.split_at(len)
}

/// Parses a run of ASCII digits, clamping values that do not fit into `u32`.
fn saturating_number(digits: &str) -> Option<u32> {
    if digits.is_empty() {
        return None;
    }
    Some(digits.parse().unwrap_or(u32::MAX))
}

impl Command {
    /// Writes the command followed by the line terminator.
    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        writer.write_all(self.as_str().as_bytes())?;
        writer.write_all(&[Self::TERMINATOR])
    }

    /// The command as transmitted, including the line terminator.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.as_str().len() + 1);
        out.extend_from_slice(self.as_str().as_bytes());
        out.push(Self::TERMINATOR);
        out
    }
}

#[test]
fn write_command() {
    let mut out = Vec::new();
    Command::version_request().write_to(&mut out).unwrap();
    assert_eq!(out, b"0,TPver\n".to_vec());
    assert_eq!(Command::diagnostic().to_bytes(), b"\n".to_vec());
}
