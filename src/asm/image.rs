//! LS-8 program image format.
//!
//! A program image is a simple text format:
//! - One byte per line, written as a binary literal (`10011001`)
//! - `#` starts a comment, anywhere on the line
//! - Blank and comment-only lines are ignored
//!
//! Bytes are loaded into memory from address 0 in file order.

use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// A loaded program image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramImage {
    /// The program bytes.
    pub bytes: Vec<u8>,
    /// Original source lines (for debugging).
    pub source_lines: Vec<String>,
}

impl ProgramImage {
    /// Create a new empty image.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an image from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
            source_lines: bytes.iter().map(|b| format!("{:08b}", b)).collect(),
        }
    }

    /// Add a byte.
    pub fn push(&mut self, byte: u8, source: &str) {
        self.bytes.push(byte);
        self.source_lines.push(source.to_string());
    }

    /// Get the number of bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Parse image text.
pub fn parse_image(text: &str) -> Result<ProgramImage, ImageError> {
    let mut image = ProgramImage::new();

    for (line_num, line) in text.lines().enumerate() {
        let code = match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        };

        let token = match code.split_whitespace().next() {
            Some(token) => token,
            None => continue,
        };

        let byte = parse_binary(token).ok_or_else(|| ImageError::ParseError {
            line: line_num + 1,
            message: format!("expected a binary byte, found `{}`", token),
        })?;

        image.push(byte, line.trim());
    }

    Ok(image)
}

fn parse_binary(token: &str) -> Option<u8> {
    let valid = !token.is_empty()
        && token.len() <= 8
        && token.chars().all(|c| c == '0' || c == '1');
    if !valid {
        return None;
    }
    u8::from_str_radix(token, 2).ok()
}

/// Load an image file from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<ProgramImage, ImageError> {
    let text = std::fs::read_to_string(path.as_ref())
        .map_err(|e| ImageError::IoError(e.to_string()))?;
    parse_image(&text)
}

/// Render an image as text, one annotated byte per line.
pub fn write_image<W: Write>(out: &mut W, image: &ProgramImage) -> std::io::Result<()> {
    writeln!(out, "# LS-8 program image")?;
    writeln!(out, "# {} bytes", image.len())?;
    writeln!(out)?;

    for (addr, byte) in image.bytes.iter().enumerate() {
        writeln!(out, "{:08b} # {:03}", byte, addr)?;
    }

    Ok(())
}

/// Save an image file to disk.
pub fn save_image<P: AsRef<Path>>(path: P, image: &ProgramImage) -> Result<(), ImageError> {
    let mut file = std::fs::File::create(path.as_ref())
        .map_err(|e| ImageError::IoError(e.to_string()))?;
    write_image(&mut file, image)
        .map_err(|e| ImageError::IoError(e.to_string()))
}

/// Errors that can occur during image operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },
}
