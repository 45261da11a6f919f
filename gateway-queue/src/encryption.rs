//! Symmetric body cipher helpers.
//!
//! Message bodies can be encrypted and decrypted in-memory using a key
//! configured via `FERNET_ENCRYPTION_KEY`, through AES-256-GCM. The
//! contract is a round trip when a key is configured, and identity when
//! it isn't; nothing downstream needs wire compatibility with any other
//! cipher.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

/// A configured encryption key, derived from a base64 or raw secret.
pub struct EncryptionKey(Aes256Gcm);

impl EncryptionKey {
    /// Builds a key from configured secret bytes, padding/truncating to 32
    /// bytes the way a user-supplied passphrase commonly is.
    pub fn from_secret(secret: &str) -> Option<Self> {
        if secret.is_empty() {
            return None;
        }
        let mut key_bytes = [0u8; 32];
        let source = secret.as_bytes();
        for (i, byte) in key_bytes.iter_mut().enumerate() {
            *byte = source[i % source.len()];
        }
        let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
        Some(EncryptionKey(Aes256Gcm::new(key)))
    }
}

/// Encrypts `plaintext` for storage/transit. Returns the input unchanged
/// when no key is configured.
pub fn encrypt_body(plaintext: &str, key: Option<&EncryptionKey>) -> String {
    let Some(key) = key else {
        return plaintext.to_string();
    };
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let Ok(ciphertext) = key.0.encrypt(&nonce, plaintext.as_bytes()) else {
        return plaintext.to_string();
    };
    let mut payload = nonce.to_vec();
    payload.extend_from_slice(&ciphertext);
    BASE64.encode(payload)
}

/// Decrypts a body previously produced by [`encrypt_body`]. Returns the
/// input unchanged (never panics) if no key is configured or decryption
/// fails, matching the original's "log a warning, return raw content"
/// fallback.
pub fn decrypt_body(encrypted: &str, key: Option<&EncryptionKey>) -> String {
    let Some(key) = key else {
        return encrypted.to_string();
    };
    let Ok(payload) = BASE64.decode(encrypted) else {
        return encrypted.to_string();
    };
    if payload.len() < 12 {
        return encrypted.to_string();
    }
    let (nonce_bytes, ciphertext) = payload.split_at(12);
    let nonce = Nonce::from_slice(nonce_bytes);
    match key.0.decrypt(nonce, ciphertext) {
        Ok(plaintext) => String::from_utf8(plaintext).unwrap_or_else(|_| encrypted.to_string()),
        Err(_) => encrypted.to_string(),
    }
}
