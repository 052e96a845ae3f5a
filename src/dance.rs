//! Dance catalog: static reference data about each dance.
//!
//! The selectors only hold [`DanceId`]s and query a [`DanceCatalog`] for the
//! speed, type and tags they need.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DanceId(pub u32);

impl fmt::Display for DanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<u32> for DanceId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speed {
    Slow,
    #[default]
    Normal,
    Fast,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeSignature {
    #[serde(rename = "2/4")]
    TwoFour,
    #[serde(rename = "3/4")]
    ThreeFour,
    #[default]
    #[serde(rename = "4/4")]
    FourFour,
    #[serde(rename = "4/8")]
    FourEight,
}

/// One entry of the dance catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dance {
    pub id: DanceId,
    pub name: String,
    #[serde(default)]
    pub speed: Speed,
    #[serde(default)]
    pub time_sig: TimeSignature,
    /// Classifier such as "standard", "latin" or "club"
    #[serde(default)]
    pub dance_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Reference to an announcement clip played before the dance
    #[serde(default)]
    pub announcement: Option<String>,
}

impl Dance {
    pub fn new(id: impl Into<DanceId>, name: &str) -> Self {
        Self {
            id: id.into(),
            name: name.to_string(),
            speed: Speed::default(),
            time_sig: TimeSignature::default(),
            dance_type: String::new(),
            tags: Vec::new(),
            announcement: None,
        }
    }

    pub fn with_speed(mut self, speed: Speed) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_type(mut self, dance_type: &str) -> Self {
        self.dance_type = dance_type.to_string();
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| (*t).to_string()).collect();
        self
    }

    pub fn with_time_sig(mut self, time_sig: TimeSignature) -> Self {
        self.time_sig = time_sig;
        self
    }

    pub fn is_fast(&self) -> bool {
        self.speed == Speed::Fast
    }

    /// True when both dances carry at least one common tag.
    pub fn shares_tag(&self, other: &Dance) -> bool {
        self.tags.iter().any(|tag| other.tags.contains(tag))
    }

    /// An empty type never matches, not even another empty type.
    pub fn same_type(&self, other: &Dance) -> bool {
        !self.dance_type.is_empty() && self.dance_type == other.dance_type
    }
}

/// Read-only access to dance reference data.
pub trait DanceCatalog {
    fn get(&self, id: DanceId) -> Option<&Dance>;

    fn name(&self, id: DanceId) -> String {
        self.get(id)
            .map_or_else(|| format!("#{id}"), |dance| dance.name.clone())
    }
}

/// In-memory dance catalog ordered by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dances {
    dances: BTreeMap<DanceId, Dance>,
}

impl Dances {
    pub fn new(dances: impl IntoIterator<Item = Dance>) -> Self {
        Self {
            dances: dances.into_iter().map(|d| (d.id, d)).collect(),
        }
    }

    /// Load the catalog from a JSON array of dances.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read dance catalog: {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("Invalid dance catalog: {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let dances: Vec<Dance> =
            serde_json::from_str(json).context("Failed to parse dance catalog")?;
        Ok(Self::new(dances))
    }

    pub fn by_name(&self, name: &str) -> Option<&Dance> {
        self.dances
            .values()
            .find(|dance| dance.name.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dance> {
        self.dances.values()
    }

    pub fn len(&self) -> usize {
        self.dances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dances.is_empty()
    }
}

impl DanceCatalog for Dances {
    fn get(&self, id: DanceId) -> Option<&Dance> {
        self.dances.get(&id)
    }
}
