pub mod error;
pub mod metadata;

pub use error::*;
pub use metadata::*;
