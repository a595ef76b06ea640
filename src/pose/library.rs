use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use super::models::PoseDefinition;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// Ordered list of poses; a challenge plays them as consecutive levels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoseLibrary {
    pub poses: Vec<PoseDefinition>,
}

impl PoseLibrary {
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read pose library from {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("Invalid pose library in {}", path.display()))
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let library: PoseLibrary = serde_json::from_str(contents)?;
        library.validate()?;
        Ok(library)
    }

    pub fn get(&self, id: &str) -> Option<&PoseDefinition> {
        self.poses.iter().find(|pose| pose.id == id)
    }

    /// Rejects poses that can never complete; warns about angles that will be
    /// silently skipped or never score.
    pub fn validate(&self) -> Result<()> {
        if self.poses.is_empty() {
            bail!("pose library contains no poses");
        }

        for pose in &self.poses {
            if !(pose.hold_seconds.is_finite() && pose.hold_seconds > 0.0) {
                bail!(
                    "pose {} has invalid hold duration {}",
                    pose.id,
                    pose.hold_seconds
                );
            }

            for angle in pose.target.incomplete_angles() {
                log_warn!(
                    "pose {}: angle {} is missing a target, tolerance or weight and will not be scored",
                    pose.id,
                    angle
                );
            }

            for (angle, tolerance) in &pose.target.tolerances {
                if *tolerance <= 0.0 {
                    log_warn!(
                        "pose {}: tolerance {} for {} is not positive; this angle always scores 0",
                        pose.id,
                        tolerance,
                        angle
                    );
                }
            }
        }

        Ok(())
    }
}
