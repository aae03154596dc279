//! Encryption of payment gateway secrets at rest.
//!
//! AES-256-GCM with a key derived as SHA-256 of `ENCRYPTION_KEY`. Stored
//! values are `hex(nonce):hex(ciphertext)`.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use sha2::{Digest, Sha256};
use thiserror::Error;

const NONCE_LEN: usize = 12;
const MASK_PREFIX: &str = "***";

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption failed")]
    Encrypt,
    #[error("malformed ciphertext")]
    Malformed,
    #[error("decryption failed")]
    Decrypt,
}

/// Symmetric cipher for stored secrets.
#[derive(Clone)]
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretCipher([REDACTED])")
    }
}

impl SecretCipher {
    #[must_use]
    pub fn new(encryption_key: &str) -> Self {
        let digest = Sha256::digest(encryption_key.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(&digest);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Encrypt `plaintext` under a fresh random nonce.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Encrypt` if the cipher fails.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;
        Ok(format!("{}:{}", hex::encode(nonce), hex::encode(ciphertext)))
    }

    /// Decrypt a value produced by [`Self::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Malformed` if the value is not `nonce:ciphertext`
    /// hex, and `CryptoError::Decrypt` if authentication fails.
    pub fn decrypt(&self, stored: &str) -> Result<String, CryptoError> {
        let (nonce_hex, ct_hex) = stored.split_once(':').ok_or(CryptoError::Malformed)?;
        let nonce_bytes = hex::decode(nonce_hex).map_err(|_| CryptoError::Malformed)?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(CryptoError::Malformed);
        }
        let ciphertext = hex::decode(ct_hex).map_err(|_| CryptoError::Malformed)?;
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|_| CryptoError::Decrypt)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::Decrypt)
    }
}

/// `***` followed by the last four characters of `secret`.
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    let tail: String = secret.chars().skip(count.saturating_sub(4)).collect();
    format!("{MASK_PREFIX}{tail}")
}

/// Whether `value` is a masked secret echoed back by the admin UI.
#[must_use]
pub fn is_masked(value: &str) -> bool {
    value.starts_with(MASK_PREFIX)
}

/// Encrypt a submitted secret for storage.
///
/// Returns `None` (keep what is stored) for absent, empty and masked values.
///
/// # Errors
///
/// Propagates encryption failures.
pub fn seal_submitted(
    cipher: &SecretCipher,
    value: Option<&str>,
) -> Result<Option<String>, CryptoError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() && !is_masked(v) => cipher.encrypt(v).map(Some),
        _ => Ok(None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cipher() -> SecretCipher {
        SecretCipher::new("unit-test-encryption-key-with-some-length")
    }

    #[test]
    fn test_roundtrip_uses_fresh_nonce() {
        let c = cipher();
        let a = c.encrypt("sk_live_51HxYz").unwrap();
        let b = c.encrypt("sk_live_51HxYz").unwrap();
        assert_ne!(a, b);
        assert_eq!(a.split_once(':').unwrap().0.len(), NONCE_LEN * 2);
        assert_eq!(c.decrypt(&a).unwrap(), "sk_live_51HxYz");
        assert_eq!(c.decrypt(&b).unwrap(), "sk_live_51HxYz");
    }

    #[test]
    fn test_decrypt_rejects_bad_input() {
        let c = cipher();
        assert!(matches!(c.decrypt("no-separator"), Err(CryptoError::Malformed)));
        assert!(matches!(c.decrypt("abcd:00ff"), Err(CryptoError::Malformed)));
        assert!(matches!(c.decrypt("zz:00"), Err(CryptoError::Malformed)));

        let other = SecretCipher::new("a-completely-different-encryption-key");
        let sealed = other.encrypt("secret").unwrap();
        assert!(matches!(c.decrypt(&sealed), Err(CryptoError::Decrypt)));
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask_secret("sk_live_abcd1234"), "***1234");
        assert_eq!(mask_secret("ab"), "***ab");
        assert!(is_masked("***1234"));
        assert!(!is_masked("sk_live"));
    }

    #[test]
    fn test_seal_submitted_passes_masked_through() {
        let c = cipher();
        assert!(seal_submitted(&c, Some("***1234")).unwrap().is_none());
        assert!(seal_submitted(&c, Some("  ")).unwrap().is_none());
        assert!(seal_submitted(&c, None).unwrap().is_none());
        let sealed = seal_submitted(&c, Some("new-secret")).unwrap().unwrap();
        assert_eq!(c.decrypt(&sealed).unwrap(), "new-secret");
    }
}
