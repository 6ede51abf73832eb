//! SHA-256 digests for downloaded artifacts
//!
//! Digests are stored as raw 32-byte arrays and compared bytewise, so the
//! case of the catalog's hex string does not matter.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// A SHA-256 digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha256Digest([u8; 32]);

/// Hex string that is not a SHA-256 digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDigest(pub String);

impl fmt::Display for InvalidDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not a SHA-256 hex digest: {}", self.0)
    }
}

impl std::error::Error for InvalidDigest {}

impl Sha256Digest {
    /// Parse a 64-character hex string (case insensitive)
    pub fn from_hex(hex: &str) -> Result<Self, InvalidDigest> {
        let hex = hex.trim();
        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(InvalidDigest(hex.to_string()));
        }

        let mut bytes = [0u8; 32];
        for (i, pair) in hex.as_bytes().chunks(2).enumerate() {
            let high = hex_value(pair[0]);
            let low = hex_value(pair[1]);
            bytes[i] = (high << 4) | low;
        }
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Lowercase hex representation
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

fn hex_value(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Sha256Digest {
    type Err = InvalidDigest;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// Digest of a file's contents, read in fixed-size chunks
pub async fn sha256_file(path: &Path) -> std::io::Result<Sha256Digest> {
    let mut file = File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(Sha256Digest(hasher.finalize().into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn test_hex_round_trip_and_case() {
        let lower = Sha256Digest::from_hex(HELLO_SHA256).unwrap();
        let upper = Sha256Digest::from_hex(&HELLO_SHA256.to_uppercase()).unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.to_hex(), HELLO_SHA256);
        assert_eq!(lower.to_string(), HELLO_SHA256);
    }

    #[test]
    fn test_invalid_hex_rejected() {
        assert!(Sha256Digest::from_hex("abc").is_err());
        assert!(Sha256Digest::from_hex(&"z".repeat(64)).is_err());
        assert!("".parse::<Sha256Digest>().is_err());
    }

    #[tokio::test]
    async fn test_file_digest() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hello.txt");
        tokio::fs::write(&path, b"hello").await.unwrap();

        let digest = sha256_file(&path).await.unwrap();
        assert_eq!(digest.to_hex(), HELLO_SHA256);
    }

    #[tokio::test]
    async fn test_missing_file_errors() {
        let temp_dir = TempDir::new().unwrap();
        assert!(sha256_file(&temp_dir.path().join("absent")).await.is_err());
    }
}
