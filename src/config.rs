//! # Configuration Module
//!
//! Tuning constants for automatic selection and the platform location of the
//! file that overrides them.
//!
//! ## Data Storage
//!
//! Tanda reads its tuning file from the platform-standard config directory:
//! - Linux: `~/.config/tanda/autoselection.json`
//! - macOS: `~/Library/Application Support/tanda/autoselection.json`
//! - Windows: `%APPDATA%\tanda\autoselection.json`
//!
//! Every field is optional in the file; missing values keep their defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const TUNING_FILE_NAME: &str = "autoselection.json";
const DB_FILE_NAME: &str = "tanda.db";
const DANCES_FILE_NAME: &str = "dances.json";

/// Read-only numeric constants consumed by the dance and song selectors.
///
/// Divisors are applied to a dance's base weight when the corresponding
/// history condition holds, so larger values mean stronger suppression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    /// Selections at the start of a session during which fast dances are held back
    pub begin_count: usize,
    /// Divisor for a fast dance during the first `begin_count` selections
    pub begin_fast: f64,
    /// Divisor when this dance and the previous dance are both fast
    pub both_fast: f64,
    /// Divisor when this dance and the dance two back are both fast
    pub fast_prior: f64,
    /// Divisor when the dance type matches the previous dance
    pub type_match: f64,
    /// Divisor when a tag is shared with the previous dance
    pub prev_tag_match: f64,
    /// Base divisor for a tag shared with an older dance
    pub tag_match: f64,
    /// Exponent applied to the history distance for `tag_match`
    pub prior_exp: f64,
    /// Number of prior selections examined
    pub hist_distance: usize,
    pub rating_weight: f64,
    pub level_weight: f64,
    pub tag_weight: f64,
    /// Windowed base weight when the window opens within one selection
    pub windowed_diff_a: f64,
    /// Windowed base weight when the window opens within two selections
    pub windowed_diff_b: f64,
    /// Windowed base weight when the window opens within three selections
    pub windowed_diff_c: f64,
    /// Subtracted from `base_total / count` when sizing a dance's window
    pub window_shrink: f64,
    /// Base weight added per retry when no dance is eligible
    pub relax_step: f64,
    pub max_relax_tries: usize,
    /// Tag-dimension weight for a song matching the session tag list
    pub song_tag_weight: f64,
    /// Tentative song picks tried before a session gives up on a dance
    pub valid_song_attempts: usize,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            begin_count: 3,
            begin_fast: 30000.0,
            both_fast: 1000.0,
            fast_prior: 100.0,
            type_match: 50.0,
            prev_tag_match: 80.0,
            tag_match: 20.0,
            prior_exp: 1.3,
            hist_distance: 5,
            rating_weight: 0.8,
            level_weight: 0.1,
            tag_weight: 0.1,
            windowed_diff_a: 0.5,
            windowed_diff_b: 0.25,
            windowed_diff_c: 0.1,
            window_shrink: 0.3,
            relax_step: 0.1,
            max_relax_tries: 10,
            song_tag_weight: 5.0,
            valid_song_attempts: 10,
        }
    }
}

impl TuningConfig {
    /// Load a tuning file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// holds values that fail [`TuningConfig::validate`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read tuning file: {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("Invalid tuning file: {}", path.display()))
    }

    /// Load a tuning file if it exists, falling back to the defaults otherwise.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("No tuning file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).context("Failed to parse tuning configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize tuning configuration")
    }

    /// Write the configuration, creating parent directories as needed.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write tuning file: {}", path.display()))
    }

    /// Reject values that would make the selectors misbehave.
    ///
    /// # Errors
    ///
    /// - any divisor is not a positive finite number
    /// - a song weight or windowed weight is negative
    /// - all three song weights are zero
    /// - relaxation cannot raise a held-back dance (`relax_step` or
    ///   `max_relax_tries` is zero)
    /// - `window_shrink` is not finite or is 1.0 or more
    pub fn validate(&self) -> Result<()> {
        let divisors = [
            ("begin_fast", self.begin_fast),
            ("both_fast", self.both_fast),
            ("fast_prior", self.fast_prior),
            ("type_match", self.type_match),
            ("prev_tag_match", self.prev_tag_match),
            ("tag_match", self.tag_match),
        ];
        for (name, value) in divisors {
            if !(value.is_finite() && value > 0.0) {
                anyhow::bail!("`{name}` must be a positive number, got {value}");
            }
        }

        let weights = [
            ("rating_weight", self.rating_weight),
            ("level_weight", self.level_weight),
            ("tag_weight", self.tag_weight),
            ("windowed_diff_a", self.windowed_diff_a),
            ("windowed_diff_b", self.windowed_diff_b),
            ("windowed_diff_c", self.windowed_diff_c),
            ("song_tag_weight", self.song_tag_weight),
        ];
        for (name, value) in weights {
            if !(value.is_finite() && value >= 0.0) {
                anyhow::bail!("`{name}` must not be negative, got {value}");
            }
        }

        if self.rating_weight + self.level_weight + self.tag_weight <= 0.0 {
            anyhow::bail!("At least one of rating/level/tag weight must be positive");
        }
        if !self.prior_exp.is_finite() {
            anyhow::bail!("`prior_exp` must be finite");
        }

        // A positive relaxation ceiling keeps selection from stalling.
        if !(self.relax_step.is_finite() && self.relax_step > 0.0) {
            anyhow::bail!("`relax_step` must be a positive number, got {}", self.relax_step);
        }
        if self.max_relax_tries == 0 {
            anyhow::bail!("`max_relax_tries` must be at least 1");
        }
        if !(self.window_shrink.is_finite() && self.window_shrink < 1.0) {
            anyhow::bail!("`window_shrink` must be below 1.0, got {}", self.window_shrink);
        }
        Ok(())
    }
}

/// Returns the platform-appropriate config directory for Tanda, creating it if needed.
///
/// # Errors
///
/// This function will return an error if:
/// - The system config directory cannot be determined
/// - The tanda subdirectory cannot be created due to permissions
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system config directory. Please ensure your platform supports standard config directories."
        )
    })?;

    let tanda_dir = config_dir.join("tanda");
    fs::create_dir_all(&tanda_dir).with_context(|| {
        format!(
            "Failed to create Tanda config directory at {}. Please check file permissions.",
            tanda_dir.display()
        )
    })?;

    Ok(tanda_dir)
}

/// Returns the path of the tuning file inside [`get_config_dir`].
pub fn get_tuning_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(TUNING_FILE_NAME))
}

/// Returns the default song database path.
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(DB_FILE_NAME))
}

/// Returns the default dance catalog path.
pub fn get_dances_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(DANCES_FILE_NAME))
}
