use std::path::Path;
use zeroize::Zeroizing;

use tagward_core::{Cipher, TagwardResult};

use crate::envelope::{self, EncryptedEnvelope};
use crate::error::VaultResult;
use crate::keyfile::{self, KeySource, KEY_SIZE};

/// AES-256-GCM implementation of the `Cipher` encryption service.
pub struct EnvelopeCipher {
    key: Zeroizing<[u8; KEY_SIZE]>,
}

impl EnvelopeCipher {
    pub fn new(key: Zeroizing<[u8; KEY_SIZE]>) -> Self {
        Self { key }
    }

    /// Open a cipher from an existing key file.
    pub fn from_key_file(path: &Path) -> VaultResult<Self> {
        Ok(Self::new(keyfile::load_key(path)?))
    }

    /// Open a cipher from a key file, creating the key if it does not exist.
    pub fn from_key_file_or_generate(path: &Path) -> VaultResult<(Self, KeySource)> {
        let (key, source) = keyfile::load_or_generate_key(path)?;
        Ok((Self::new(key), source))
    }

    pub fn seal(&self, plaintext: &[u8]) -> VaultResult<Vec<u8>> {
        Ok(envelope::encrypt(&self.key, plaintext)?.to_token())
    }

    pub fn open(&self, token: &[u8]) -> VaultResult<Vec<u8>> {
        let envelope = EncryptedEnvelope::from_token(token)?;
        envelope::decrypt(&self.key, &envelope)
    }
}

impl Cipher for EnvelopeCipher {
    fn encrypt(&self, plaintext: &[u8]) -> TagwardResult<Vec<u8>> {
        Ok(self.seal(plaintext)?)
    }

    fn decrypt(&self, token: &[u8]) -> TagwardResult<Vec<u8>> {
        Ok(self.open(token)?)
    }
}

/// Encrypt the file at `input` and write the token to `output`.
/// Returns the number of plaintext bytes read.
pub fn encrypt_file(cipher: &dyn Cipher, input: &Path, output: &Path) -> TagwardResult<usize> {
    let plaintext = Zeroizing::new(read_file(input)?);
    let token = cipher.encrypt(&plaintext)?;
    write_file(output, &token)?;
    tracing::info!(input = %input.display(), output = %output.display(), "file encrypted");
    Ok(plaintext.len())
}

/// Decrypt the token at `input` and write the plaintext to `output`.
/// Returns the number of plaintext bytes written.
pub fn decrypt_file(cipher: &dyn Cipher, input: &Path, output: &Path) -> TagwardResult<usize> {
    let token = read_file(input)?;
    let plaintext = Zeroizing::new(cipher.decrypt(&token)?);
    write_file(output, &plaintext)?;
    tracing::info!(input = %input.display(), output = %output.display(), "file decrypted");
    Ok(plaintext.len())
}

fn read_file(path: &Path) -> TagwardResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        tagward_core::TagwardError::Internal(format!("failed to read {}: {}", path.display(), e))
    })
}

fn write_file(path: &Path, data: &[u8]) -> TagwardResult<()> {
    std::fs::write(path, data).map_err(|e| {
        tagward_core::TagwardError::Internal(format!("failed to write {}: {}", path.display(), e))
    })
}
