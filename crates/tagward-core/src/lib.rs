pub mod error;
pub mod read;
pub mod traits;
pub mod types;

pub use error::*;
pub use read::attempt_read;
pub use traits::*;
pub use types::*;
