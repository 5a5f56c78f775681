//! Credential values and the typed classification of authentication failures.

pub mod credential;
pub mod rejection;

pub use credential::*;
pub use rejection::*;
