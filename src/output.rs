//! Output sinks for the PRN instruction.
//!
//! The CPU writes every printed value as a single raw byte. [`DecimalSink`]
//! is an opt-in adapter that renders each byte as a decimal line instead.

use serde::{Serialize, Deserialize};
use std::io::{self, Write};

/// How PRN output is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// One raw byte per PRN.
    #[default]
    Raw,
    /// One decimal number per line.
    Decimal,
}

/// Writer adapter turning each byte into a decimal line.
pub struct DecimalSink<W: Write> {
    inner: W,
}

impl<W: Write> DecimalSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Recover the wrapped writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for DecimalSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for byte in buf {
            writeln!(self.inner, "{}", byte)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Wrap `inner` according to `mode`.
pub fn sink<'a, W: Write + 'a>(mode: OutputMode, inner: W) -> Box<dyn Write + 'a> {
    match mode {
        OutputMode::Raw => Box::new(inner),
        OutputMode::Decimal => Box::new(DecimalSink::new(inner)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_sink() {
        let mut sink = DecimalSink::new(Vec::new());
        sink.write_all(&[15, 0, 255]).unwrap();

        assert_eq!(sink.into_inner(), b"15\n0\n255\n".to_vec());
    }

    #[test]
    fn test_raw_sink() {
        let mut buf = Vec::new();
        {
            let mut out = sink(OutputMode::Raw, &mut buf);
            out.write_all(&[7]).unwrap();
        }
        assert_eq!(buf, vec![7]);
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(serde_json::to_string(&OutputMode::Decimal).unwrap(), "\"decimal\"");
        assert_eq!(serde_json::from_str::<OutputMode>("\"raw\"").unwrap(), OutputMode::Raw);
    }
}
