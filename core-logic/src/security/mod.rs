use aes_gcm::{
    aead::{Aead, NewAead}, // NewAead for 0.9/0.4
    Aes256Gcm,
    Nonce,
};
use anyhow::{Context, Result};
use rand::RngCore;

use crate::error::SecurityError;

/// Hex-encoded pieces of an encrypted wallet block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedComponents {
    pub ciphertext: String,
    pub iv: String,
    pub salt: String,
    pub tag: String,
}

pub struct SecurityUtils;

impl SecurityUtils {
    const TAG_LEN: usize = 16;

    // Matches Node's crypto.scryptSync defaults (N=16384, r=8, p=1) so files
    // produced by the wallet generator decrypt here.
    fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; 32]> {
        let params = scrypt::Params::new(14, 8, 1, 32)
            .map_err(|e| anyhow::anyhow!("Invalid scrypt params: {}", e))?;
        let mut key = [0u8; 32];
        scrypt::scrypt(password.as_bytes(), salt, &params, &mut key)
            .map_err(|e| anyhow::anyhow!("Scrypt failed: {}", e))?;
        Ok(key)
    }

    pub fn decrypt_components(
        ciphertext_hex: &str,
        iv_hex: &str,
        salt_hex: &str,
        tag_hex: &str,
        password: &str,
    ) -> Result<String> {
        let ciphertext = hex::decode(ciphertext_hex).context("Invalid ciphertext hex")?;
        let iv = hex::decode(iv_hex).context("Invalid IV hex")?;
        let salt = hex::decode(salt_hex).context("Invalid salt hex")?;
        let mut tag = hex::decode(tag_hex).context("Invalid tag hex")?;

        if iv.len() != 12 {
            return Err(SecurityError::CryptographyFailed {
                reason: format!("IV must be 12 bytes, got {}", iv.len()),
            }
            .into());
        }

        let key = Self::derive_key(password, &salt)?;
        let cipher = Aes256Gcm::new(&key.into());
        let nonce = Nonce::from_slice(&iv);

        let mut full_payload = ciphertext;
        full_payload.append(&mut tag);

        let plaintext = cipher.decrypt(nonce, full_payload.as_ref()).map_err(|e| {
            SecurityError::CryptographyFailed {
                reason: e.to_string(),
            }
        })?;

        String::from_utf8(plaintext).context("Decrypted data is not valid UTF-8")
    }

    /// Produces the same layout `decrypt_components` reads, with fresh salt and IV.
    pub fn encrypt_components(plaintext: &str, password: &str) -> Result<EncryptedComponents> {
        let mut rng = rand::thread_rng();
        let mut salt = [0u8; 16];
        let mut iv = [0u8; 12];
        rng.fill_bytes(&mut salt);
        rng.fill_bytes(&mut iv);

        let key = Self::derive_key(password, &salt)?;
        let cipher = Aes256Gcm::new(&key.into());
        let mut sealed = cipher
            .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
            .map_err(|e| SecurityError::CryptographyFailed {
                reason: e.to_string(),
            })?;

        let tag = sealed.split_off(sealed.len() - Self::TAG_LEN);
        Ok(EncryptedComponents {
            ciphertext: hex::encode(sealed),
            iv: hex::encode(iv),
            salt: hex::encode(salt),
            tag: hex::encode(tag),
        })
    }
}
