use crate::error::{VaultError, VaultResult};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce as AesNonce};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use zeroize::Zeroizing;

// AES-256-GCM envelope encryption.
//
// A fresh random nonce is drawn for every encryption and travels with the
// ciphertext. Tokens are text-safe: base64url(version || nonce || ciphertext).

pub const NONCE_SIZE: usize = 12; // AES-GCM standard nonce size
pub const TOKEN_VERSION: u8 = 0x01;

/// Encrypted envelope: nonce + ciphertext (includes GCM tag).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    pub nonce: [u8; NONCE_SIZE],
    pub ciphertext: Vec<u8>,
}

impl EncryptedEnvelope {
    /// Encode as a base64url token.
    pub fn to_token(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(1 + NONCE_SIZE + self.ciphertext.len());
        raw.push(TOKEN_VERSION);
        raw.extend_from_slice(&self.nonce);
        raw.extend_from_slice(&self.ciphertext);
        URL_SAFE_NO_PAD.encode(raw).into_bytes()
    }

    /// Decode a base64url token. Surrounding whitespace is ignored.
    pub fn from_token(token: &[u8]) -> VaultResult<Self> {
        let text = std::str::from_utf8(token)
            .map_err(|_| VaultError::MalformedToken("token is not valid UTF-8".into()))?;
        let raw = URL_SAFE_NO_PAD
            .decode(text.trim())
            .map_err(|_| VaultError::MalformedToken("token is not valid base64url".into()))?;

        if raw.len() < 1 + NONCE_SIZE {
            return Err(VaultError::MalformedToken("token too short".into()));
        }
        if raw[0] != TOKEN_VERSION {
            return Err(VaultError::MalformedToken(format!(
                "unsupported token version {}",
                raw[0]
            )));
        }

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&raw[1..1 + NONCE_SIZE]);
        Ok(Self {
            nonce,
            ciphertext: raw[1 + NONCE_SIZE..].to_vec(),
        })
    }
}

/// Encrypt plaintext using AES-256-GCM with the given key.
pub fn encrypt(key: &Zeroizing<[u8; 32]>, plaintext: &[u8]) -> VaultResult<EncryptedEnvelope> {
    let cipher = Aes256Gcm::new_from_slice(&**key)
        .map_err(|e| VaultError::Encryption(format!("cipher init failed: {}", e)))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = AesNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| VaultError::Encryption(format!("encryption failed: {}", e)))?;

    Ok(EncryptedEnvelope {
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Decrypt an encrypted envelope using AES-256-GCM with the given key.
pub fn decrypt(key: &Zeroizing<[u8; 32]>, envelope: &EncryptedEnvelope) -> VaultResult<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(&**key).map_err(|_| VaultError::Decryption)?;
    let nonce = AesNonce::from_slice(&envelope.nonce);

    cipher
        .decrypt(nonce, envelope.ciphertext.as_ref())
        .map_err(|_| VaultError::Decryption)
}
