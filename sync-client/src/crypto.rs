//! End-to-end payload codec for shadow.
//!
//! This module provides:
//! - Key derivation from a human-shareable secret (SHA-256, domain separated)
//! - ChaCha20-Poly1305 sealing with a fresh random 96-bit nonce per message
//! - Share key generation for session links
//!
//! # Security Notes
//!
//! - Peers typing the same secret derive the same key; there is no key exchange
//! - The relay only ever sees `base64(nonce ++ ciphertext)`
//! - Key material is zeroized on drop and redacted from `Debug`

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroizing;

/// Nonce size for ChaCha20-Poly1305 (96 bits = 12 bytes).
pub const NONCE_SIZE: usize = 12;

/// Key size for ChaCha20-Poly1305 (256 bits = 32 bytes).
pub const KEY_SIZE: usize = 32;

/// Random bytes in a generated share key.
pub const SHARE_KEY_BYTES: usize = 32;

const KEY_DOMAIN: &str = "shadow-e2e-v1:";

/// Crypto errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Empty or whitespace-only secret.
    #[error("missing E2E key")]
    MissingKey,

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Sealed payload is not valid base64.
    #[error("invalid E2E payload encoding: {0}")]
    InvalidEncoding(String),

    /// Sealed payload shorter than a nonce.
    #[error("invalid E2E payload size: {0} bytes")]
    Truncated(usize),

    /// Decryption failed (tampered, truncated, or wrong key).
    #[error("decryption failed: authentication error")]
    DecryptionFailed,
}

/// Symmetric codec keyed by a shared secret.
#[derive(Clone)]
pub struct Codec {
    key: Zeroizing<[u8; KEY_SIZE]>,
}

impl Codec {
    /// Derive the codec key from `secret`.
    ///
    /// Surrounding whitespace is ignored so that a copied link and a typed
    /// key produce the same codec.
    pub fn new(secret: &str) -> Result<Self, CryptoError> {
        let trimmed = secret.trim();
        if trimmed.is_empty() {
            return Err(CryptoError::MissingKey);
        }

        let mut hasher = Sha256::new();
        hasher.update(KEY_DOMAIN.as_bytes());
        hasher.update(trimmed.as_bytes());
        let key = Zeroizing::new(hasher.finalize().into());

        Ok(Self { key })
    }

    fn cipher(&self) -> Result<ChaCha20Poly1305, CryptoError> {
        ChaCha20Poly1305::new_from_slice(self.key.as_slice())
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
    }

    /// Seal `plaintext`, returning `base64(nonce ++ ciphertext)`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce_bytes)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let sealed = self
            .cipher()?
            .encrypt(nonce, plaintext)
            .map_err(|_| CryptoError::EncryptionFailed("aead encrypt failed".into()))?;

        let mut payload = Vec::with_capacity(NONCE_SIZE + sealed.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&sealed);
        Ok(STANDARD.encode(payload))
    }

    /// Open a payload produced by [`Codec::encrypt`].
    pub fn decrypt(&self, encoded: &str) -> Result<Vec<u8>, CryptoError> {
        let payload = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
        if payload.len() < NONCE_SIZE {
            return Err(CryptoError::Truncated(payload.len()));
        }

        let (nonce, ciphertext) = payload.split_at(NONCE_SIZE);
        self.cipher()?
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}

// Don't leak keys in debug output
impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Codec {{ key: [REDACTED] }}")
    }
}

/// Generate a random share key (256 bits, URL-safe base64 without padding).
pub fn generate_share_key() -> Result<String, CryptoError> {
    let mut raw = Zeroizing::new([0u8; SHARE_KEY_BYTES]);
    getrandom::getrandom(raw.as_mut_slice())
        .map_err(|e| CryptoError::EncryptionFailed(format!("share key generation: {}", e)))?;
    Ok(URL_SAFE_NO_PAD.encode(raw.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===========================================
    // Key Derivation Tests
    // ===========================================

    #[test]
    fn empty_secret_rejected() {
        assert_eq!(Codec::new("").unwrap_err(), CryptoError::MissingKey);
        assert_eq!(Codec::new(" \t\n ").unwrap_err(), CryptoError::MissingKey);
    }

    #[test]
    fn surrounding_whitespace_ignored() {
        let a = Codec::new("shared-secret").unwrap();
        let b = Codec::new("  shared-secret\n").unwrap();

        let sealed = a.encrypt(b"hello").unwrap();
        assert_eq!(b.decrypt(&sealed).unwrap(), b"hello");
    }

    #[test]
    fn key_is_domain_separated_sha256() {
        let codec = Codec::new("abc").unwrap();
        let expected: [u8; KEY_SIZE] = Sha256::digest(b"shadow-e2e-v1:abc").into();
        assert_eq!(*codec.key, expected);
    }

    // ===========================================
    // Seal / Open Tests
    // ===========================================

    #[test]
    fn roundtrip() {
        let codec = Codec::new("k").unwrap();
        let plaintext = b"notes/todo.md|aGVsbG8=";

        let sealed = codec.encrypt(plaintext).unwrap();
        assert_eq!(codec.decrypt(&sealed).unwrap(), plaintext.as_slice());
    }

    #[test]
    fn payload_layout_is_nonce_then_ciphertext() {
        let codec = Codec::new("k").unwrap();
        let sealed = codec.encrypt(b"abc").unwrap();
        let raw = STANDARD.decode(sealed).unwrap();
        // nonce + plaintext + 16-byte Poly1305 tag
        assert_eq!(raw.len(), NONCE_SIZE + 3 + 16);
    }

    #[test]
    fn fresh_nonce_per_message() {
        let codec = Codec::new("k").unwrap();

        let s1 = codec.encrypt(b"Same message").unwrap();
        let s2 = codec.encrypt(b"Same message").unwrap();

        assert_ne!(s1, s2);
        let n1 = &STANDARD.decode(&s1).unwrap()[..NONCE_SIZE];
        let n2 = &STANDARD.decode(&s2).unwrap()[..NONCE_SIZE];
        assert_ne!(n1, n2);
    }

    #[test]
    fn wrong_secret_fails_decryption() {
        let sealed = Codec::new("alpha").unwrap().encrypt(b"secret").unwrap();
        let result = Codec::new("bravo").unwrap().decrypt(&sealed);
        assert_eq!(result, Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn any_flipped_bit_fails_decryption() {
        let codec = Codec::new("k").unwrap();
        let raw = STANDARD.decode(codec.encrypt(b"tamper me").unwrap()).unwrap();

        for byte in 0..raw.len() {
            for bit in [0u8, 3, 7] {
                let mut mutated = raw.clone();
                mutated[byte] ^= 1 << bit;
                assert_eq!(
                    codec.decrypt(&STANDARD.encode(&mutated)),
                    Err(CryptoError::DecryptionFailed),
                    "byte {} bit {}",
                    byte,
                    bit
                );
            }
        }
    }

    #[test]
    fn truncated_payload_rejected() {
        let codec = Codec::new("k").unwrap();
        let short = STANDARD.encode([0u8; NONCE_SIZE - 1]);
        assert_eq!(
            codec.decrypt(&short),
            Err(CryptoError::Truncated(NONCE_SIZE - 1))
        );

        // Nonce present but no tag
        let nonce_only = STANDARD.encode([0u8; NONCE_SIZE]);
        assert_eq!(
            codec.decrypt(&nonce_only),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn invalid_base64_rejected() {
        let codec = Codec::new("k").unwrap();
        assert!(matches!(
            codec.decrypt("***not base64***"),
            Err(CryptoError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn empty_plaintext_encrypts() {
        let codec = Codec::new("k").unwrap();
        let sealed = codec.encrypt(b"").unwrap();
        assert!(codec.decrypt(&sealed).unwrap().is_empty());
    }

    #[test]
    fn large_plaintext_encrypts() {
        let codec = Codec::new("k").unwrap();
        let plaintext = vec![0x42u8; 1024 * 1024]; // 1 MiB

        let sealed = codec.encrypt(&plaintext).unwrap();
        assert_eq!(codec.decrypt(&sealed).unwrap(), plaintext);
    }

    // ===========================================
    // Share Key Tests
    // ===========================================

    #[test]
    fn share_key_is_256_bit_url_safe() {
        let key = generate_share_key().unwrap();
        assert_eq!(URL_SAFE_NO_PAD.decode(&key).unwrap().len(), SHARE_KEY_BYTES);
        assert!(key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn share_keys_differ() {
        assert_ne!(generate_share_key().unwrap(), generate_share_key().unwrap());
    }

    #[test]
    fn share_key_drives_a_codec() {
        let key = generate_share_key().unwrap();
        let codec = Codec::new(&key).unwrap();
        let sealed = codec.encrypt(b"x").unwrap();
        assert_eq!(Codec::new(&key).unwrap().decrypt(&sealed).unwrap(), b"x");
    }

    #[test]
    fn codec_debug_is_redacted() {
        let codec = Codec::new("hunter2").unwrap();
        let debug = format!("{:?}", codec);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("hunter2"));
    }
}
