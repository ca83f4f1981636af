//! Swift and Kotlin bindings.
//!
//! [`CredentialManager`] is the entry point for the app's UI layer. Its
//! methods report failures as [`CredentialError`], a flat copy of the core
//! taxonomy in which storage statuses travel as raw codes.

mod error;
mod manager;

pub use error::CredentialError;
pub use manager::CredentialManager;
