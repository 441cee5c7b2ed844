//! Delimiter-based reading on top of a single-byte line reader.

use bytes::{Bytes, BytesMut};

use crate::protocol::Result;

/// Something that can hand out input up to and including a delimiter byte.
pub trait LineRead {
    /// Read until `delim` is seen; the returned bytes end with `delim`.
    fn read_line(&mut self, delim: u8) -> Result<Bytes>;
}

/// Read until the multi-byte `delimiter` has been seen and return what came
/// before it.
///
/// Lines are requested up to the delimiter's last byte and accumulated until
/// the collected bytes end with the full delimiter, so prompts such as
/// `"cmd: "` are matched even when the last byte also appears earlier.
pub fn read_delimited<R: LineRead + ?Sized>(reader: &mut R, delimiter: &[u8]) -> Result<Bytes> {
    let Some(&last) = delimiter.last() else {
        return Ok(Bytes::new());
    };
    let mut line = BytesMut::new();
    loop {
        let chunk = reader.read_line(last)?;
        line.extend_from_slice(&chunk);
        if line.ends_with(delimiter) {
            line.truncate(line.len() - delimiter.len());
            return Ok(line.freeze());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::protocol::Error;

    struct Scripted(VecDeque<u8>);

    impl LineRead for Scripted {
        fn read_line(&mut self, delim: u8) -> Result<Bytes> {
            let mut out = Vec::new();
            while let Some(byte) = self.0.pop_front() {
                out.push(byte);
                if byte == delim {
                    return Ok(Bytes::from(out));
                }
            }
            Err(Error::Timeout {
                expected: out.len() + 1,
                received: out.len(),
            })
        }
    }

    fn scripted(input: &[u8]) -> Scripted {
        Scripted(input.iter().copied().collect())
    }

    #[test]
    fn strips_multi_byte_delimiter() {
        let mut reader = scripted(b"QUIT\r\ncmd: rest");
        let line = read_delimited(&mut reader, b"cmd: ").unwrap();
        assert_eq!(line.as_ref(), b"QUIT\r\n");
        assert_eq!(reader.0.len(), 4);
    }

    #[test]
    fn keeps_going_past_partial_matches() {
        // The trailing space of the prompt shows up twice before the real prompt.
        let mut reader = scripted(b"a b cmd: ");
        let line = read_delimited(&mut reader, b"cmd: ").unwrap();
        assert_eq!(line.as_ref(), b"a b ");
    }

    #[test]
    fn null_terminated_body() {
        let mut reader = scripted(b"0 0 0 0 0 4\0");
        let line = read_delimited(&mut reader, &[0]).unwrap();
        assert_eq!(line.as_ref(), b"0 0 0 0 0 4");
    }

    #[test]
    fn propagates_read_errors() {
        let mut reader = scripted(b"cmd");
        assert!(matches!(
            read_delimited(&mut reader, b"cmd: "),
            Err(Error::Timeout { .. })
        ));
    }
}
