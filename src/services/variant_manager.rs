use super::hashing::{self, digests_match};
use crate::config::ConfigStore;
use crate::metrics::Metrics;
use crate::models::{Configuration, InstalledState, ResolvedConfig, Variant};
use crate::state::{RuntimeState, StateChange, StateManager};
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::fs::File;
use std::io;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors that can occur while classifying or swapping
#[derive(Error, Debug)]
pub enum SwapError {
    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("openvr_api.dll is missing at {0}")]
    TargetMissing(Utf8PathBuf),

    #[error("Failed to install {variant} binaries from {from} to {to}: {source}")]
    CopyFailed {
        variant: Variant,
        from: Utf8PathBuf,
        to: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "{path} (hash {digest}) matches neither the SteamVR nor the OpenComposite hash, install a variant explicitly"
    )]
    UnrecognizedTarget { path: Utf8PathBuf, digest: String },

    #[error("Configuration is incomplete, missing: {}", .0.join(", "))]
    IncompleteConfiguration(Vec<&'static str>),
}

/// The target no longer holds what was last observed.
///
/// A warning, never an error: the operation that noticed it carries on with
/// the freshly observed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftWarning {
    pub expected: InstalledState,
    pub observed: InstalledState,
}

impl fmt::Display for DriftWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "openvr_api.dll changed while OC Swapper wasn't looking: expected {}, found {}",
            self.expected, self.observed
        )
    }
}

/// Result of [`VariantManager::initialize`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupReport {
    pub state: InstalledState,

    /// The target was missing and the SteamVR build was copied into place
    pub bootstrapped: bool,

    /// The observed state disagrees with the `LastUsed` hint from config.ini
    pub drift_since_last_run: Option<DriftWarning>,
}

/// Result of a completed [`VariantManager::request_swap`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOutcome {
    pub previous: Variant,
    pub current: Variant,
    pub drift: Option<DriftWarning>,
}

#[derive(Debug)]
struct Observation {
    state: InstalledState,
    digest: Option<String>,
}

/// Classify a digest against the two configured hashes.
///
/// SteamVR is checked first, so identical configured hashes resolve to SteamVR.
pub fn classify_digest(digest: &str, steamvr_hash: &str, opencomposite_hash: &str) -> InstalledState {
    if digests_match(digest, steamvr_hash) {
        InstalledState::Installed(Variant::SteamVr)
    } else if digests_match(digest, opencomposite_hash) {
        InstalledState::Installed(Variant::OpenComposite)
    } else {
        InstalledState::Unknown
    }
}

/// Classifies the installed `openvr_api.dll` and swaps between variants.
///
/// The installed variant is always decided by hashing the target, never by
/// trusting prior state. Swaps copy the new variant to a temporary file next
/// to the target and rename it over the target, so a failed copy leaves the
/// old file in place.
///
/// # Known limitation
///
/// There is no inter-process locking. Two instances pointed at the same
/// target can race; only run one at a time.
pub struct VariantManager {
    store: ConfigStore,
    config: Configuration,
    resolved: ResolvedConfig,
    state: StateManager,
    metrics: Metrics,
}

impl VariantManager {
    /// Create a manager for `config`. Call [`initialize`](Self::initialize)
    /// before use; until then the state is `Unknown`.
    pub fn new(store: ConfigStore, config: Configuration) -> Self {
        let resolved = store.resolve(&config);
        Self {
            store,
            config,
            resolved,
            state: StateManager::new(),
            metrics: Metrics::new(),
        }
    }

    /// Startup classification.
    ///
    /// A missing target gets the SteamVR build installed so that a fresh setup
    /// always starts on SteamVR. Otherwise the observation is compared with the
    /// `LastUsed` hint and any disagreement is reported.
    pub fn initialize(&mut self) -> Result<StartupReport, SwapError> {
        let observation = self.inspect_target()?;

        if observation.state == InstalledState::Missing {
            self.state.observe(InstalledState::Missing, None);
            tracing::warn!(
                "{} is missing, installing {} binaries",
                self.resolved.target_path,
                Variant::SteamVr
            );
            self.ensure_complete()?;

            let digest = self.install_file(Variant::SteamVr)?;
            self.state
                .observe(InstalledState::Installed(Variant::SteamVr), digest);
            self.state.notify(StateChange::Bootstrapped);
            self.metrics.record_bootstrap();
            self.persist_hint(Variant::SteamVr);

            return Ok(StartupReport {
                state: InstalledState::Installed(Variant::SteamVr),
                bootstrapped: true,
                drift_since_last_run: None,
            });
        }

        self.state.observe(observation.state, observation.digest);

        let drift_since_last_run = match self.config.last_used {
            Some(hint) if observation.state != InstalledState::Installed(hint) => {
                let warning = DriftWarning {
                    expected: InstalledState::Installed(hint),
                    observed: observation.state,
                };
                self.report_drift(warning);
                Some(warning)
            }
            _ => None,
        };

        if let Some(variant) = observation.state.variant() {
            self.persist_hint(variant);
        }

        tracing::info!("Currently using {}", observation.state);

        Ok(StartupReport {
            state: observation.state,
            bootstrapped: false,
            drift_since_last_run,
        })
    }

    /// Hash the target and record what it is
    pub fn classify(&self) -> Result<InstalledState, SwapError> {
        let observation = self.inspect_target()?;
        self.state.observe(observation.state, observation.digest);
        Ok(observation.state)
    }

    /// What the manager currently believes is installed
    pub fn current_state(&self) -> InstalledState {
        self.state.installed()
    }

    /// Swap to the other variant.
    ///
    /// The target is re-classified first. If it no longer matches the last
    /// known state a [`DriftWarning`] is included in the outcome and the swap
    /// goes ahead from what was actually found. Swapping from an unrecognized
    /// or missing target is an error.
    pub fn request_swap(&mut self) -> Result<SwapOutcome, SwapError> {
        let result = self.try_swap();
        match &result {
            Ok(outcome) => {
                self.metrics.record_swap_completed();
                tracing::info!("Swapped {} -> {}", outcome.previous, outcome.current);
            }
            Err(e) => {
                self.metrics.record_swap_failed();
                tracing::error!("Swap failed: {}", e);
            }
        }
        result
    }

    /// Install a specific variant regardless of what is there now.
    ///
    /// This is the way out of `Unknown` and `Missing`, which
    /// [`request_swap`](Self::request_swap) refuses.
    pub fn install(&mut self, variant: Variant) -> Result<InstalledState, SwapError> {
        self.ensure_complete()?;

        let previous = self.state.installed();
        let digest = self.install_file(variant)?;
        let installed = InstalledState::Installed(variant);
        self.state.observe(installed, digest);

        if let Some(from) = previous.variant().filter(|from| *from != variant) {
            self.state.notify(StateChange::VariantSwapped { from, to: variant });
        }
        self.persist_hint(variant);

        tracing::info!("Installed {} binaries", variant);
        Ok(installed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> RuntimeState {
        self.state.snapshot()
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn resolved(&self) -> &ResolvedConfig {
        &self.resolved
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    fn try_swap(&mut self) -> Result<SwapOutcome, SwapError> {
        self.ensure_complete()?;

        let expected = self.state.installed();
        let observation = self.inspect_target()?;

        let drift = if observation.state != expected {
            let warning = DriftWarning {
                expected,
                observed: observation.state,
            };
            self.report_drift(warning);
            Some(warning)
        } else {
            None
        };

        let observed_digest = observation.digest.clone();
        self.state.observe(observation.state, observation.digest);

        let from = match observation.state {
            InstalledState::Installed(variant) => variant,
            InstalledState::Unknown => {
                return Err(SwapError::UnrecognizedTarget {
                    path: self.resolved.target_path.clone(),
                    digest: observed_digest.unwrap_or_default(),
                });
            }
            InstalledState::Missing => {
                return Err(SwapError::TargetMissing(self.resolved.target_path.clone()));
            }
        };

        let to = from.other();
        let digest = self.install_file(to)?;
        self.state.observe(InstalledState::Installed(to), digest);
        self.state.notify(StateChange::VariantSwapped { from, to });
        self.persist_hint(to);

        Ok(SwapOutcome {
            previous: from,
            current: to,
            drift,
        })
    }

    fn ensure_complete(&self) -> Result<(), SwapError> {
        let missing = self.config.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SwapError::IncompleteConfiguration(missing))
        }
    }

    /// Hash the target without touching recorded state
    fn inspect_target(&self) -> Result<Observation, SwapError> {
        let path = &self.resolved.target_path;
        self.metrics.record_classification();

        match hashing::hash_file(path) {
            Ok(digest) => {
                let state = classify_digest(
                    &digest,
                    &self.resolved.steamvr_hash,
                    &self.resolved.opencomposite_hash,
                );
                tracing::debug!("{} classified as {:?}", path, state);
                Ok(Observation {
                    state,
                    digest: Some(digest),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Observation {
                state: InstalledState::Missing,
                digest: None,
            }),
            Err(source) => Err(SwapError::FileRead {
                path: path.clone(),
                source,
            }),
        }
    }

    /// Copy a variant's storage file over the target, returning the new target digest
    fn install_file(&self, variant: Variant) -> Result<Option<String>, SwapError> {
        let from = self.resolved.storage_path(variant);
        let to = &self.resolved.target_path;

        let started = Instant::now();
        replace_atomically(from, to).map_err(|source| SwapError::CopyFailed {
            variant,
            from: from.to_path_buf(),
            to: to.clone(),
            source,
        })?;
        self.metrics.record_copy_time(started.elapsed());

        let digest = match hashing::hash_file(to) {
            Ok(digest) => {
                if !digests_match(&digest, self.resolved.hash_for(variant)) {
                    tracing::warn!(
                        "{} does not match the configured {} hash, check config.ini",
                        from,
                        variant
                    );
                }
                Some(digest)
            }
            Err(e) => {
                tracing::warn!("Could not re-hash {} after install: {}", to, e);
                None
            }
        };

        Ok(digest)
    }

    fn report_drift(&self, warning: DriftWarning) {
        tracing::warn!("{}", warning);
        self.metrics.record_drift();
        self.state.notify(StateChange::DriftDetected {
            expected: warning.expected,
            observed: warning.observed,
        });
    }

    /// Remember `variant` as `LastUsed`. Failure only costs the hint, so it is logged.
    fn persist_hint(&mut self, variant: Variant) {
        if self.config.last_used == Some(variant) {
            return;
        }

        match self.store.record_last_used(variant) {
            Ok(_) => self.config = self.config.with_last_used(variant),
            Err(e) => tracing::warn!("Could not record last used variant: {}", e),
        }
    }
}

/// Copy `from` into a temporary file beside `to`, then rename it over `to`
fn replace_atomically(from: &Utf8Path, to: &Utf8Path) -> io::Result<()> {
    let dir = match to.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };

    let mut source = File::open(from)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    io::copy(&mut source, tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(to).map_err(|e| e.error)?;
    Ok(())
}
