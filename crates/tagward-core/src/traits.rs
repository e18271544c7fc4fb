use crate::error::TagwardResult;

// ---------------------------------------------------------------------------
// Cipher: symmetric encryption service
//
// Turns bytes into an opaque token and back. Callers never inspect the token
// layout; only the implementation that produced it can open it.
// ---------------------------------------------------------------------------

pub trait Cipher: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> TagwardResult<Vec<u8>>;
    fn decrypt(&self, token: &[u8]) -> TagwardResult<Vec<u8>>;
}
