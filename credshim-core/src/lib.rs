//! Credential storage shim.
//!
//! Stores, retrieves and deletes a secret keyed by (service, user) in the
//! platform's secure storage, reached through a C-ABI component. The shim can
//! talk to that component in three calling conventions (see [`Convention`]);
//! whichever is active, failures surface as the same [`CredentialError`]s.
//!
//! ```
//! use credshim_core::{Convention, CredentialError, CredentialShim, ShimConfig};
//!
//! let config = ShimConfig { convention: Convention::FixedBuffer, ..ShimConfig::default() };
//! let shim = CredentialShim::from_config(&config).expect("valid config");
//!
//! shim.set("com.example.doc", "alice", "hunter2")?;
//! assert_eq!(shim.get("com.example.doc", "alice")?, "hunter2");
//! shim.delete("com.example.doc", "alice")?;
//! assert_eq!(shim.get("com.example.doc", "alice"), Err(CredentialError::NotFound));
//! # Ok::<(), CredentialError>(())
//! ```
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod backend;
pub use backend::{BackingStore, Convention, ForeignStore, StoreVTable};

mod config;
pub use config::{ConfigError, ShimConfig, BUFFER_CAPACITY_ENV, CONVENTION_ENV};

mod error;
pub use error::{CredentialError, CredentialResult, Operation};

pub mod ffi;
pub mod logger;
pub mod native;
pub mod platform;

mod shim;
pub use shim::{delete_credential, get_credential, set_credential, CredentialShim};

pub mod status;
pub use status::{OsStatus, StatusCode};

uniffi::setup_scaffolding!("credshim_core");
