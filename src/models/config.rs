use super::Variant;
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::sync::LazyLock;

/// File name appended to every configured directory
pub const TARGET_FILE_NAME: &str = "openvr_api.dll";

/// Default folder holding the SteamVR copy of the DLL
pub const DEFAULT_STEAMVR_STORAGE_DIR: &str = "SteamVR Files";

/// Default folder holding the OpenComposite copy of the DLL
pub const DEFAULT_OPENCOMPOSITE_STORAGE_DIR: &str = "OpenComposite Files";

static MD5_HEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{32}$").expect("Invalid MD5 regex"));

/// Persisted configuration from config.ini
///
/// Holds the expected digest of each variant and the three directories as
/// written by the operator. Built once at load time and never mutated;
/// [`with_last_used`](Self::with_last_used) returns a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    /// `FILES.SteamFile`
    pub steamvr_hash: String,

    /// `FILES.OpenCompositeFile`
    pub opencomposite_hash: String,

    /// `FILES.OpenVRDLLFilePath`
    pub target_dir: String,

    /// `FILES.SteamVRStorageFolder`
    pub steamvr_storage_dir: String,

    /// `FILES.OpenCompositeStorageFolder`
    pub opencomposite_storage_dir: String,

    /// `RUNTIME.LastUsed`, a hint that is always re-verified by hashing
    pub last_used: Option<Variant>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            steamvr_hash: String::new(),
            opencomposite_hash: String::new(),
            target_dir: String::new(),
            steamvr_storage_dir: DEFAULT_STEAMVR_STORAGE_DIR.to_string(),
            opencomposite_storage_dir: DEFAULT_OPENCOMPOSITE_STORAGE_DIR.to_string(),
            last_used: Some(Variant::SteamVr),
        }
    }
}

impl Configuration {
    /// Expected digest for a variant
    pub fn hash_for(&self, variant: Variant) -> &str {
        match variant {
            Variant::SteamVr => &self.steamvr_hash,
            Variant::OpenComposite => &self.opencomposite_hash,
        }
    }

    /// Copy of this configuration with a different `LastUsed` hint
    pub fn with_last_used(&self, variant: Variant) -> Self {
        Self {
            last_used: Some(variant),
            ..self.clone()
        }
    }

    /// INI keys of required fields that are still empty
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("SteamFile", &self.steamvr_hash),
            ("OpenCompositeFile", &self.opencomposite_hash),
            ("OpenVRDLLFilePath", &self.target_dir),
            ("SteamVRStorageFolder", &self.steamvr_storage_dir),
            ("OpenCompositeStorageFolder", &self.opencomposite_storage_dir),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(key, _)| key)
        .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Human-readable warnings for hashes that don't look like an MD5 digest.
    ///
    /// Empty hashes are reported by [`missing_fields`](Self::missing_fields) instead.
    pub fn hash_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for (key, value) in [
            ("SteamFile", &self.steamvr_hash),
            ("OpenCompositeFile", &self.opencomposite_hash),
        ] {
            let value = value.trim();
            if !value.is_empty() && !MD5_HEX.is_match(value) {
                warnings.push(format!(
                    "{} is not a 32 character hex digest: {:?}",
                    key, value
                ));
            }
        }

        if !self.steamvr_hash.trim().is_empty()
            && self
                .steamvr_hash
                .trim()
                .eq_ignore_ascii_case(self.opencomposite_hash.trim())
        {
            warnings.push(
                "SteamFile and OpenCompositeFile are identical, OpenComposite can never be detected"
                    .to_string(),
            );
        }

        warnings
    }

    /// Join every configured directory with [`TARGET_FILE_NAME`].
    ///
    /// Relative directories are taken relative to `base_dir`; absolute ones
    /// replace it. No normalization beyond what `Utf8Path::join` does.
    pub fn resolve(&self, base_dir: &Utf8Path) -> ResolvedConfig {
        let file_in = |dir: &str| base_dir.join(dir).join(TARGET_FILE_NAME);

        ResolvedConfig {
            steamvr_hash: self.steamvr_hash.trim().to_string(),
            opencomposite_hash: self.opencomposite_hash.trim().to_string(),
            target_path: file_in(&self.target_dir),
            steamvr_storage_path: file_in(&self.steamvr_storage_dir),
            opencomposite_storage_path: file_in(&self.opencomposite_storage_dir),
        }
    }
}

/// Configuration with full file paths, as consumed by the variant manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub steamvr_hash: String,
    pub opencomposite_hash: String,
    pub target_path: Utf8PathBuf,
    pub steamvr_storage_path: Utf8PathBuf,
    pub opencomposite_storage_path: Utf8PathBuf,
}

impl ResolvedConfig {
    pub fn hash_for(&self, variant: Variant) -> &str {
        match variant {
            Variant::SteamVr => &self.steamvr_hash,
            Variant::OpenComposite => &self.opencomposite_hash,
        }
    }

    pub fn storage_path(&self, variant: Variant) -> &Utf8Path {
        match variant {
            Variant::SteamVr => &self.steamvr_storage_path,
            Variant::OpenComposite => &self.opencomposite_storage_path,
        }
    }
}
