//! Binary image files.
//!
//! Two on-disk formats hold the same byte stream:
//! - `bin`: the raw bytes
//! - `bits`: one byte per line as eight `0`/`1` characters, MSB first.
//!   Blank lines and `;` comments are ignored on load.

use crate::isa::MEMORY_BYTES;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// A program image: instruction words followed by the data segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    bytes: Vec<u8>,
    /// Instruction and variable counts, when the image came from the assembler.
    layout: Option<(usize, usize)>,
}

impl Image {
    /// Wrap raw bytes of unknown layout.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ImageError> {
        check_size(bytes.len())?;
        Ok(Self { bytes, layout: None })
    }

    /// An image produced by the assembler.
    pub fn assembled(
        bytes: Vec<u8>,
        instruction_count: usize,
        variable_count: usize,
    ) -> Result<Self, ImageError> {
        check_size(bytes.len())?;
        Ok(Self {
            bytes,
            layout: Some((instruction_count, variable_count)),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of instruction words. For loaded images every whole word counts.
    pub fn instruction_count(&self) -> usize {
        match self.layout {
            Some((instructions, _)) => instructions,
            None => self.bytes.len() / 2,
        }
    }

    /// Number of data-segment bytes, if known.
    pub fn variable_count(&self) -> Option<usize> {
        self.layout.map(|(_, vars)| vars)
    }

    /// Render in the textual `bits` format.
    pub fn to_bits(&self) -> String {
        let mut out = String::with_capacity(self.bytes.len() * 9);
        for byte in &self.bytes {
            // Writing to a String cannot fail
            let _ = writeln!(out, "{:08b}", byte);
        }
        out
    }

    /// Parse the textual `bits` format.
    pub fn from_bits(text: &str) -> Result<Self, ImageError> {
        let mut bytes = Vec::new();
        for (number, line) in text.lines().enumerate() {
            let code = line.split(';').next().unwrap_or("").trim();
            if code.is_empty() {
                continue;
            }
            if !is_bits_line(code) {
                return Err(ImageError::BadBitsLine {
                    line: number + 1,
                    text: code.to_string(),
                });
            }
            bytes.push(u8::from_str_radix(code, 2).map_err(|_| ImageError::BadBitsLine {
                line: number + 1,
                text: code.to_string(),
            })?);
        }
        Self::from_bytes(bytes)
    }
}

fn check_size(size: usize) -> Result<(), ImageError> {
    if size > MEMORY_BYTES {
        return Err(ImageError::TooLarge {
            size,
            available: MEMORY_BYTES,
        });
    }
    Ok(())
}

fn is_bits_line(code: &str) -> bool {
    code.len() == 8 && code.bytes().all(|b| b == b'0' || b == b'1')
}

/// On-disk image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// Pick `Bits` if the file looks like it, else `Binary`.
    #[default]
    Auto,
    Binary,
    Bits,
}

impl ImageFormat {
    /// Resolve `Auto` against a file's contents.
    pub fn detect(self, contents: &[u8]) -> ImageFormat {
        if self != ImageFormat::Auto {
            return self;
        }

        let text = match std::str::from_utf8(contents) {
            Ok(text) => text,
            Err(_) => return ImageFormat::Binary,
        };

        let mut lines = text
            .lines()
            .map(|l| l.split(';').next().unwrap_or("").trim())
            .filter(|l| !l.is_empty())
            .peekable();

        if lines.peek().is_some() && lines.all(is_bits_line) {
            ImageFormat::Bits
        } else {
            ImageFormat::Binary
        }
    }
}

impl FromStr for ImageFormat {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ImageFormat::Auto),
            "bin" | "binary" => Ok(ImageFormat::Binary),
            "bits" | "text" => Ok(ImageFormat::Bits),
            _ => Err(ImageError::UnknownFormat(s.to_string())),
        }
    }
}

/// Decode file contents in the given format.
pub fn parse_image(contents: Vec<u8>, format: ImageFormat) -> Result<Image, ImageError> {
    match format.detect(&contents) {
        ImageFormat::Bits => {
            let text = String::from_utf8(contents).map_err(|_| ImageError::NotText)?;
            Image::from_bits(&text)
        }
        _ => Image::from_bytes(contents),
    }
}

/// Load an image file from disk.
pub fn load_image<P: AsRef<Path>>(path: P, format: ImageFormat) -> Result<Image, ImageError> {
    let contents = fs::read(path.as_ref())?;
    parse_image(contents, format)
}

/// Save an image to disk. `Auto` saves raw bytes.
pub fn save_image<P: AsRef<Path>>(path: P, image: &Image, format: ImageFormat) -> Result<(), ImageError> {
    match format {
        ImageFormat::Bits => fs::write(path.as_ref(), image.to_bits())?,
        _ => fs::write(path.as_ref(), image.bytes())?,
    }
    Ok(())
}

/// Errors that can occur reading or writing images.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("image of {size} bytes exceeds the {available}-byte address space")]
    TooLarge { size: usize, available: usize },

    #[error("line {line}: expected 8 binary digits, found \"{text}\"")]
    BadBitsLine { line: usize, text: String },

    #[error("bits image is not valid UTF-8")]
    NotText,

    #[error("unknown image format \"{0}\" (expected auto, bin or bits)")]
    UnknownFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_roundtrip() {
        let image = Image::from_bytes(vec![0x29, 0x60, 0x00, 0x08]).unwrap();
        let text = image.to_bits();
        assert_eq!(text, "00101001\n01100000\n00000000\n00001000\n");
        assert_eq!(Image::from_bits(&text).unwrap(), image);
    }

    #[test]
    fn test_bits_ignores_comments_and_blanks() {
        let image = Image::from_bits("; header\n\n00000001 ; first\n  11111111\n").unwrap();
        assert_eq!(image.bytes(), &[1, 255]);
    }

    #[test]
    fn test_bits_rejects_bad_lines() {
        assert!(matches!(
            Image::from_bits("00000001\n0101\n"),
            Err(ImageError::BadBitsLine { line: 2, .. })
        ));
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(ImageFormat::Auto.detect(b"00000001\n10000000\n"), ImageFormat::Bits);
        assert_eq!(ImageFormat::Auto.detect(&[0x29, 0x60, 0x00, 0x08]), ImageFormat::Binary);
        assert_eq!(ImageFormat::Auto.detect(b""), ImageFormat::Binary);
        assert_eq!(ImageFormat::Binary.detect(b"00000001\n"), ImageFormat::Binary);
    }

    #[test]
    fn test_size_limit() {
        assert!(Image::from_bytes(vec![0; MEMORY_BYTES]).is_ok());
        assert!(matches!(
            Image::from_bytes(vec![0; MEMORY_BYTES + 1]),
            Err(ImageError::TooLarge { size: 2049, .. })
        ));
    }

    #[test]
    fn test_counts() {
        let loaded = Image::from_bytes(vec![0; 5]).unwrap();
        assert_eq!(loaded.instruction_count(), 2);
        assert_eq!(loaded.variable_count(), None);

        let assembled = Image::assembled(vec![0; 5], 2, 1).unwrap();
        assert_eq!(assembled.variable_count(), Some(1));
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("BIN".parse::<ImageFormat>().unwrap(), ImageFormat::Binary);
        assert_eq!("bits".parse::<ImageFormat>().unwrap(), ImageFormat::Bits);
        assert!("hex".parse::<ImageFormat>().is_err());
    }
}
