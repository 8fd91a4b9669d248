//! Services module - the logic behind swapping `openvr_api.dll`.
//!
//! # Components
//!
//! - [`VariantManager`]: classifies the installed DLL by content hash, detects
//!   drift, bootstraps a missing target and swaps variants.
//! - [`hashing`]: whole-file MD5 digests and digest comparison.
//!
//! The services have no UI dependencies. A shell (the bundled CLI or a GUI)
//! only calls [`VariantManager::current_state`] and
//! [`VariantManager::request_swap`], and renders what comes back.
//!
//! # Usage Example
//!
//! ```ignore
//! use ocswapper::{ConfigStore, VariantManager};
//!
//! let store = ConfigStore::new("config.ini")?;
//! let config = store.load()?;
//! let mut manager = VariantManager::new(store, config);
//!
//! manager.initialize()?;
//! let outcome = manager.request_swap()?;
//! if let Some(drift) = outcome.drift {
//!     eprintln!("warning: {drift}");
//! }
//! ```

pub mod hashing;
pub mod variant_manager;

pub use hashing::{digests_match, hash_bytes, hash_file};
pub use variant_manager::{
    DriftWarning, StartupReport, SwapError, SwapOutcome, VariantManager, classify_digest,
};
