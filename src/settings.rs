use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
    time::Duration,
};

use crate::scoring::ScoringConfig;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// Timing and scoring knobs for a hold session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    /// Countdown length in ticks before holding starts
    pub countdown_steps: u32,
    /// Period of the countdown tick and the per-second averaging tick
    pub tick_interval_ms: u64,
    /// Hints shown live while holding, capped at 3
    pub live_hint_limit: usize,
    pub scoring: ScoringConfig,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            countdown_steps: 3,
            tick_interval_ms: 1_000,
            live_hint_limit: 3,
            scoring: ScoringConfig::default(),
        }
    }
}

impl EngineSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<EngineSettings>,
}

impl SettingsStore {
    /// Missing file means defaults; an unreadable one is an error; a malformed
    /// one falls back to defaults with a warning.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            Self::read(&path)?
        } else {
            EngineSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn engine(&self) -> EngineSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn reload(&self) -> Result<()> {
        let data = Self::read(&self.path)?;
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = data;
        Ok(())
    }

    fn read(path: &Path) -> Result<EngineSettings> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        Ok(serde_json::from_str(&contents).unwrap_or_else(|err| {
            log_warn!("Ignoring malformed settings in {}: {}", path.display(), err);
            EngineSettings::default()
        }))
    }
}
