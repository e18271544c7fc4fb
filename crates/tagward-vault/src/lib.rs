pub mod cipher;
pub mod envelope;
pub mod error;
pub mod keyfile;

pub use cipher::{decrypt_file, encrypt_file, EnvelopeCipher};
pub use error::*;
pub use keyfile::KeySource;
