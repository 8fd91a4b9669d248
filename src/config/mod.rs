use crate::models::{Configuration, ResolvedConfig, Variant};
use camino::{Utf8Path, Utf8PathBuf};
use ini::{EscapePolicy, Ini, LineSeparator, ParseOption, WriteOption};
use std::fs;
use std::io::{self, Write};
use thiserror::Error;

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "config.ini";

const FILES_SECTION: &str = "FILES";
const RUNTIME_SECTION: &str = "RUNTIME";

const KEY_STEAMVR_HASH: &str = "SteamFile";
const KEY_OPENCOMPOSITE_HASH: &str = "OpenCompositeFile";
const KEY_TARGET_DIR: &str = "OpenVRDLLFilePath";
const KEY_STEAMVR_STORAGE: &str = "SteamVRStorageFolder";
const KEY_OPENCOMPOSITE_STORAGE: &str = "OpenCompositeStorageFolder";
const KEY_LAST_USED: &str = "LastUsed";

/// Errors raised while loading or saving config.ini.
///
/// All of them are recoverable; the caller decides whether to continue.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to create config directory {path}: {source}")]
    CreateDir {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config file {path} at line {line}: {message}")]
    Parse {
        path: Utf8PathBuf,
        line: usize,
        message: String,
    },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Loads, creates and saves `config.ini`.
///
/// The store owns no runtime state beyond its file location. Relative
/// directories in the config are resolved against the directory holding the
/// config file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: Utf8PathBuf,
    base_dir: Utf8PathBuf,
}

impl ConfigStore {
    /// Create a store backed by `config_path`, creating its parent directory if needed.
    pub fn new<P: AsRef<Utf8Path>>(config_path: P) -> Result<Self, ConfigError> {
        let config_path = config_path.as_ref().to_path_buf();
        let base_dir = match config_path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
            _ => Utf8PathBuf::from("."),
        };

        if !base_dir.exists() {
            fs::create_dir_all(&base_dir).map_err(|source| ConfigError::CreateDir {
                path: base_dir.clone(),
                source,
            })?;
        }

        Ok(Self {
            config_path,
            base_dir,
        })
    }

    /// Create a store for `config.ini` inside `dir`
    pub fn in_dir<P: AsRef<Utf8Path>>(dir: P) -> Result<Self, ConfigError> {
        Self::new(dir.as_ref().join(CONFIG_FILE_NAME))
    }

    /// Load the configuration.
    ///
    /// On first run (no file) a default configuration is written and returned.
    /// A present but malformed file yields [`ConfigError::Parse`]; it is never
    /// overwritten.
    pub fn load(&self) -> Result<Configuration, ConfigError> {
        if !self.config_path.exists() {
            tracing::warn!(
                "Config file not found at {}, creating defaults",
                self.config_path
            );
            let config = Configuration::default();
            self.save(&config)?;
            return Ok(config);
        }

        let contents = self.read_contents()?;
        let doc = self.parse(&contents)?;

        if doc.section(Some(FILES_SECTION)).is_none() {
            tracing::warn!(
                "{} has no [{}] section, all paths and hashes are empty",
                self.config_path,
                FILES_SECTION
            );
        }

        let field = |key: &str| {
            doc.get_from(Some(FILES_SECTION), key)
                .map(str::to_string)
                .unwrap_or_default()
        };

        let last_used = match doc.get_from(Some(RUNTIME_SECTION), KEY_LAST_USED) {
            Some(raw) => {
                let hint = Variant::from_index(raw);
                if hint.is_none() {
                    tracing::debug!("Ignoring unrecognized {}={:?}", KEY_LAST_USED, raw);
                }
                hint
            }
            None => None,
        };

        let config = Configuration {
            steamvr_hash: field(KEY_STEAMVR_HASH),
            opencomposite_hash: field(KEY_OPENCOMPOSITE_HASH),
            target_dir: field(KEY_TARGET_DIR),
            steamvr_storage_dir: field(KEY_STEAMVR_STORAGE),
            opencomposite_storage_dir: field(KEY_OPENCOMPOSITE_STORAGE),
            last_used,
        };

        for warning in config.hash_warnings() {
            tracing::warn!("{}", warning);
        }

        tracing::info!("Loaded config from {}", self.config_path);
        Ok(config)
    }

    /// Save the configuration.
    ///
    /// Written to a temporary file beside the config and renamed over it, so
    /// a crash never leaves a half-written config.ini.
    pub fn save(&self, config: &Configuration) -> Result<(), ConfigError> {
        let mut contents = Vec::new();
        Self::document(config)
            .write_to_opt(&mut contents, write_options())
            .map_err(|source| ConfigError::Write {
                path: self.config_path.clone(),
                source,
            })?;

        self.write_atomically(&contents)?;
        tracing::info!("Saved config to {}", self.config_path);
        Ok(())
    }

    /// Record `variant` as `RUNTIME.LastUsed`.
    ///
    /// Only the `LastUsed` line is rewritten. Comments, unknown keys and extra
    /// sections the operator added are left as they are. Returns `false` when
    /// the file already holds that value and nothing was written.
    pub fn record_last_used(&self, variant: Variant) -> Result<bool, ConfigError> {
        let contents = self.read_contents()?;
        let doc = self.parse(&contents)?;

        let value = variant.as_index().to_string();
        if doc.get_from(Some(RUNTIME_SECTION), KEY_LAST_USED) == Some(value.as_str()) {
            return Ok(false);
        }

        let updated = with_last_used_line(&contents, &value);
        self.write_atomically(updated.as_bytes())?;
        tracing::debug!("Recorded {}={} in {}", KEY_LAST_USED, value, self.config_path);
        Ok(true)
    }

    /// Join the configured directories into full file paths
    pub fn resolve(&self, config: &Configuration) -> ResolvedConfig {
        config.resolve(&self.base_dir)
    }

    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }

    /// Directory relative config paths are resolved against
    pub fn base_dir(&self) -> &Utf8Path {
        &self.base_dir
    }

    fn read_contents(&self) -> Result<String, ConfigError> {
        fs::read_to_string(&self.config_path).map_err(|source| ConfigError::Read {
            path: self.config_path.clone(),
            source,
        })
    }

    fn parse(&self, contents: &str) -> Result<Ini, ConfigError> {
        let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);
        Ini::load_from_str_opt(contents, parse_options()).map_err(|e| ConfigError::Parse {
            path: self.config_path.clone(),
            line: e.line + 1,
            message: e.msg.to_string(),
        })
    }

    /// Write to a temporary file beside the config and rename it over the config
    fn write_atomically(&self, contents: &[u8]) -> Result<(), ConfigError> {
        let write_err = |source: io::Error| ConfigError::Write {
            path: self.config_path.clone(),
            source,
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&self.base_dir).map_err(write_err)?;
        tmp.write_all(contents).map_err(write_err)?;
        tmp.flush().map_err(write_err)?;
        tmp.persist(&self.config_path)
            .map_err(|e| write_err(e.error))?;
        Ok(())
    }

    fn document(config: &Configuration) -> Ini {
        let last_used = config
            .last_used
            .map(|v| v.as_index().to_string())
            .unwrap_or_default();

        let mut doc = Ini::new();
        doc.with_section(Some(FILES_SECTION))
            .set(KEY_STEAMVR_HASH, config.steamvr_hash.as_str())
            .set(KEY_OPENCOMPOSITE_HASH, config.opencomposite_hash.as_str())
            .set(KEY_TARGET_DIR, config.target_dir.as_str())
            .set(KEY_STEAMVR_STORAGE, config.steamvr_storage_dir.as_str())
            .set(KEY_OPENCOMPOSITE_STORAGE, config.opencomposite_storage_dir.as_str());
        doc.with_section(Some(RUNTIME_SECTION))
            .set(KEY_LAST_USED, last_used);
        doc
    }
}

/// Windows paths are stored verbatim, so backslashes and quotes are not special
fn parse_options() -> ParseOption {
    ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    }
}

fn write_options() -> WriteOption {
    WriteOption {
        escape_policy: EscapePolicy::Nothing,
        line_separator: LineSeparator::CR,
        ..WriteOption::default()
    }
}

/// Replace the value of `LastUsed` under `[RUNTIME]`, adding the key or the
/// section when absent. Every other line is copied through untouched.
fn with_last_used_line(contents: &str, value: &str) -> String {
    let newline = if contents.contains("\r\n") { "\r\n" } else { "\n" };
    let entry = format!("{}={}", KEY_LAST_USED, value);

    let mut out = String::with_capacity(contents.len() + entry.len() + 16);
    let mut in_runtime = false;
    let mut runtime_seen = false;
    let mut written = false;

    for line in contents.split_inclusive('\n') {
        let body = line.trim_end_matches(['\r', '\n']);
        let ending = &line[body.len()..];
        let trimmed = body.trim();

        if let Some(name) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            if in_runtime && !written {
                out.push_str(&entry);
                out.push_str(newline);
                written = true;
            }
            in_runtime = name.trim() == RUNTIME_SECTION;
            runtime_seen |= in_runtime;
        } else if in_runtime
            && !written
            && trimmed
                .split_once('=')
                .is_some_and(|(key, _)| key.trim() == KEY_LAST_USED)
        {
            out.push_str(&entry);
            out.push_str(ending);
            written = true;
            continue;
        }

        out.push_str(line);
    }

    if !written {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push_str(newline);
        }
        if !runtime_seen {
            if !out.is_empty() {
                out.push_str(newline);
            }
            out.push('[');
            out.push_str(RUNTIME_SECTION);
            out.push(']');
            out.push_str(newline);
        }
        out.push_str(&entry);
        out.push_str(newline);
    }

    out
}
