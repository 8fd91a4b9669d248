//! Data models for OC Swapper.
//!
//! - [`Configuration`]: the persisted contents of `config.ini`
//! - [`ResolvedConfig`]: the same configuration with directories joined into full file paths
//! - [`Variant`]: SteamVR or OpenComposite
//! - [`InstalledState`]: what is currently sitting at the target path
//!
//! Variant identity is always decided by hashing the target file. Nothing in
//! here is trusted without that check, including the `LastUsed` hint.

pub mod config;
pub mod variant;

pub use config::{
    Configuration, DEFAULT_OPENCOMPOSITE_STORAGE_DIR, DEFAULT_STEAMVR_STORAGE_DIR,
    ResolvedConfig, TARGET_FILE_NAME,
};
pub use variant::{InstalledState, Variant};
