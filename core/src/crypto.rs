//! Save-file encryption.
//!
//! Key = SHA-256(passphrase). Each call to `encrypt` draws a fresh 16-byte
//! IV from the OS RNG and emits `base64(iv || ciphertext || tag)` using
//! AES-256-GCM with a 16-byte nonce.
//!
//! The passphrase ships with the game, so this only keeps casual editors
//! out of the save file.

use crate::error::{DecryptionError, SaveError, SaveResult};
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::AesGcm;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

pub const IV_LEN:  usize = 16;
pub const TAG_LEN: usize = 16;

type SaveCipher = AesGcm<Aes256, U16>;

/// 256-bit key derived from a passphrase.
#[derive(Clone, PartialEq, Eq)]
pub struct SaveKey([u8; 32]);

impl SaveKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for SaveKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SaveKey(..)")
    }
}

pub fn derive_key(passphrase: &str) -> SaveKey {
    let digest: [u8; 32] = Sha256::digest(passphrase.as_bytes()).into();
    SaveKey(digest)
}

pub fn encrypt(plaintext: &str, key: &SaveKey) -> SaveResult<String> {
    let cipher = SaveCipher::new(GenericArray::from_slice(key.as_bytes()));

    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let ciphertext = cipher
        .encrypt(GenericArray::from_slice(&iv), plaintext.as_bytes())
        .map_err(|e| SaveError::Encryption(e.to_string()))?;

    let mut blob = Vec::with_capacity(IV_LEN + ciphertext.len());
    blob.extend_from_slice(&iv);
    blob.extend_from_slice(&ciphertext);
    Ok(BASE64_STANDARD.encode(blob))
}

pub fn decrypt(ciphertext_b64: &str, key: &SaveKey) -> Result<String, DecryptionError> {
    let blob = BASE64_STANDARD
        .decode(ciphertext_b64.trim())
        .map_err(|_| DecryptionError::Base64)?;

    if blob.len() < IV_LEN + TAG_LEN {
        return Err(DecryptionError::Truncated { len: blob.len() });
    }

    let (iv, body) = blob.split_at(IV_LEN);
    let cipher = SaveCipher::new(GenericArray::from_slice(key.as_bytes()));
    let plain = cipher
        .decrypt(GenericArray::from_slice(iv), body)
        .map_err(|_| DecryptionError::Authentication)?;

    String::from_utf8(plain).map_err(|_| DecryptionError::Utf8)
}
