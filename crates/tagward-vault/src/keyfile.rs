//! Key file management.
//!
//! A key file holds a single 32-byte AES key, base64url encoded on one line.
//! The sender side creates one on first use; the receiving side requires it
//! to exist already.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use crate::error::{VaultError, VaultResult};

pub const KEY_SIZE: usize = 32;

/// Where a key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Loaded,
    Generated,
}

/// Draw a fresh random key.
pub fn generate_key() -> Zeroizing<[u8; KEY_SIZE]> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    rand::rngs::OsRng.fill_bytes(&mut *key);
    key
}

pub fn encode_key(key: &Zeroizing<[u8; KEY_SIZE]>) -> Zeroizing<String> {
    Zeroizing::new(URL_SAFE_NO_PAD.encode(&**key))
}

pub fn decode_key(encoded: &str) -> VaultResult<Zeroizing<[u8; KEY_SIZE]>> {
    let bytes = Zeroizing::new(
        URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map_err(|_| VaultError::InvalidKey("key is not valid base64url".into()))?,
    );
    if bytes.len() != KEY_SIZE {
        return Err(VaultError::InvalidKey(format!(
            "expected {} key bytes, got {}",
            KEY_SIZE,
            bytes.len()
        )));
    }
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    key.copy_from_slice(&bytes);
    Ok(key)
}

/// Load an existing key file.
pub fn load_key(path: &Path) -> VaultResult<Zeroizing<[u8; KEY_SIZE]>> {
    if !path.exists() {
        return Err(VaultError::KeyFileMissing(path.display().to_string()));
    }
    let contents = Zeroizing::new(std::fs::read_to_string(path)?);
    decode_key(&contents)
}

/// Load the key at `path`, or generate and persist a new one if absent.
///
/// Creation is exclusive: if another process writes the file first, its key
/// is loaded instead of being overwritten.
pub fn load_or_generate_key(path: &Path) -> VaultResult<(Zeroizing<[u8; KEY_SIZE]>, KeySource)> {
    let key = generate_key();
    match create_key_file(path, &key) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "generated new key");
            Ok((key, KeySource::Generated))
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            let key = load_key(path)?;
            tracing::info!(path = %path.display(), "loaded existing key");
            Ok((key, KeySource::Loaded))
        }
        Err(e) => Err(e.into()),
    }
}

// The key is written to a private (0600) staging file and then hard-linked
// into place, so `path` only ever appears complete and is never replaced.
fn create_key_file(path: &Path, key: &Zeroizing<[u8; KEY_SIZE]>) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let staging = staging_path(path);
    let result = write_private(&staging, key).and_then(|_| std::fs::hard_link(&staging, path));
    let _ = std::fs::remove_file(&staging);
    result
}

fn staging_path(path: &Path) -> PathBuf {
    let mut suffix = [0u8; 8];
    rand::rngs::OsRng.fill_bytes(&mut suffix);
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".{}.tmp", hex::encode(suffix)));
    path.with_file_name(name)
}

fn write_private(path: &Path, key: &Zeroizing<[u8; KEY_SIZE]>) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(encode_key(key).as_bytes())?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> std::path::PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "tagward-keyfile-{}-{}",
            std::process::id(),
            id
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_generate_keys_differ() {
        assert_ne!(*generate_key(), *generate_key());
    }

    #[test]
    fn test_encode_decode_key() {
        let key = generate_key();
        let decoded = decode_key(&encode_key(&key)).unwrap();
        assert_eq!(*decoded, *key);
    }

    #[test]
    fn test_decode_key_wrong_length() {
        let short = URL_SAFE_NO_PAD.encode([0u8; 16]);
        assert!(matches!(decode_key(&short), Err(VaultError::InvalidKey(_))));
    }

    #[test]
    fn test_load_missing_key() {
        let dir = temp_dir();
        let result = load_key(&dir.join("secret.key"));
        assert!(matches!(result, Err(VaultError::KeyFileMissing(_))));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_load_or_generate_creates_then_reuses() {
        let dir = temp_dir();
        let path = dir.join("nested").join("secret.key");

        let (first, source) = load_or_generate_key(&path).unwrap();
        assert_eq!(source, KeySource::Generated);
        assert!(path.exists());

        let (second, source) = load_or_generate_key(&path).unwrap();
        assert_eq!(source, KeySource::Loaded);
        assert_eq!(*first, *second);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[cfg(unix)]
    #[test]
    fn test_generated_key_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = temp_dir();
        let path = dir.join("secret.key");
        load_or_generate_key(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[cfg(unix)]
    #[test]
    fn test_reused_key_file_keeps_private_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = temp_dir();
        let path = dir.join("secret.key");

        let (first, _) = load_or_generate_key(&path).unwrap();
        let (second, source) = load_or_generate_key(&path).unwrap();
        assert_eq!(source, KeySource::Loaded);
        assert_eq!(*first, *second);

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_concurrent_generate_agrees_on_one_key() {
        let dir = temp_dir();
        let path = dir.join("secret.key");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let path = path.clone();
                std::thread::spawn(move || *load_or_generate_key(&path).unwrap().0)
            })
            .collect();
        let keys: Vec<[u8; KEY_SIZE]> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let on_disk = load_key(&path).unwrap();
        assert!(keys.iter().all(|k| k == &*on_disk));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_existing_key_file_is_not_overwritten() {
        let dir = temp_dir();
        let path = dir.join("secret.key");
        let original = generate_key();
        std::fs::write(&path, encode_key(&original).as_bytes()).unwrap();

        let (loaded, source) = load_or_generate_key(&path).unwrap();
        assert_eq!(source, KeySource::Loaded);
        assert_eq!(*loaded, *original);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_load_corrupt_key_file() {
        let dir = temp_dir();
        let path = dir.join("secret.key");
        std::fs::write(&path, "not a key").unwrap();
        assert!(load_key(&path).is_err());
        assert!(load_or_generate_key(&path).is_err());
        let _ = std::fs::remove_dir_all(dir);
    }
}
