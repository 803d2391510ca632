use std::fs;
use std::path::Path;

use miette::{miette, IntoDiagnostic, Result, Severity};

use crate::memory::MEMORY_MAX;

/// Program image: load address followed by the words to place there.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    orig: u16,
    words: Vec<u16>,
}

impl Image {
    pub fn new(orig: u16, words: Vec<u16>) -> Result<Self> {
        if orig as usize + words.len() > MEMORY_MAX {
            return Err(image_too_long(orig, words.len()));
        }
        Ok(Image { orig, words })
    }

    /// First word is the origin, the rest is the program.
    pub fn from_words(raw: &[u16]) -> Result<Self> {
        let Some((&orig, words)) = raw.split_first() else {
            return Err(image_empty());
        };
        Self::new(orig, words.to_vec())
    }

    /// Decode a big-endian object file.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 2 != 0 {
            return Err(miette!(
                severity = Severity::Error,
                code = "image::unaligned",
                help = "object files are a sequence of big-endian 16-bit words",
                "File is not aligned to 16 bits ({} bytes)",
                bytes.len()
            ));
        }
        let words: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|word| u16::from_be_bytes([word[0], word[1]]))
            .collect();
        Self::from_words(&words)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = fs::read(path.as_ref()).into_diagnostic()?;
        Self::from_bytes(&bytes)
    }

    pub fn orig(&self) -> u16 {
        self.orig
    }

    pub fn words(&self) -> &[u16] {
        &self.words
    }

    /// Serialise back to the object file format.
    pub fn to_bytes(&self) -> Vec<u8> {
        std::iter::once(self.orig)
            .chain(self.words.iter().copied())
            .flat_map(u16::to_be_bytes)
            .collect()
    }
}

fn image_empty() -> miette::Report {
    miette!(
        severity = Severity::Error,
        code = "image::empty",
        help = "an object file starts with its origin address, e.g. x3000",
        "Program image is empty",
    )
}

fn image_too_long(orig: u16, len: usize) -> miette::Report {
    miette!(
        severity = Severity::Error,
        code = "image::too_long",
        help = "try a lower origin address",
        "Program of {} words at origin 0x{:04x} does not fit in memory",
        len,
        orig
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_endian_words() {
        let image = Image::from_bytes(&[0x30, 0x00, 0xF0, 0x25, 0x12, 0x34]).unwrap();
        assert_eq!(image.orig(), 0x3000);
        assert_eq!(image.words(), &[0xF025, 0x1234]);
        assert_eq!(image.to_bytes(), vec![0x30, 0x00, 0xF0, 0x25, 0x12, 0x34]);
    }

    #[test]
    fn origin_only() {
        let image = Image::from_bytes(&[0x40, 0x00]).unwrap();
        assert_eq!(image.orig(), 0x4000);
        assert!(image.words().is_empty());
    }

    #[test]
    fn rejects_malformed() {
        let unaligned = Image::from_bytes(&[0x30, 0x00, 0xF0]).unwrap_err();
        assert!(unaligned.to_string().contains("not aligned"));
        let empty = Image::from_bytes(&[]).unwrap_err();
        assert!(empty.to_string().contains("empty"));
    }

    #[test]
    fn rejects_overflowing_image() {
        assert!(Image::new(0xFFFF, vec![1]).is_ok());
        assert!(Image::new(0xFFFF, vec![1, 2]).is_err());
        assert!(Image::from_words(&[0xFFFE, 1, 2, 3]).is_err());
    }
}
