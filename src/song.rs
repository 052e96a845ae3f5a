//! Song candidates as seen by the song selector.
//!
//! A candidate carries three independent weight dimensions (rating, level
//! and tag affinity) plus an optional same-song group shared by alternate
//! renditions of one underlying track.

use crate::dance::DanceId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Database id of a song.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(pub i64);

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Songs that are takes or edits of the same track share this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SameSongId(pub i64);

/// Per-dimension song weights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AttrWeights {
    pub rating: f64,
    pub level: f64,
    pub tag: f64,
}

impl AttrWeights {
    #[must_use]
    pub const fn new(rating: f64, level: f64, tag: f64) -> Self {
        Self { rating, level, tag }
    }

    pub fn is_zero(&self) -> bool {
        self.rating == 0.0 && self.level == 0.0 && self.tag == 0.0
    }
}

impl Add for AttrWeights {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            rating: self.rating + rhs.rating,
            level: self.level + rhs.level,
            tag: self.tag + rhs.tag,
        }
    }
}

impl AddAssign for AttrWeights {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for AttrWeights {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            rating: self.rating - rhs.rating,
            level: self.level - rhs.level,
            tag: self.tag - rhs.tag,
        }
    }
}

impl SubAssign for AttrWeights {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl std::iter::Sum for AttrWeights {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Input to the song selector: one eligible song for one dance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongEntry {
    pub id: SongId,
    pub dance: DanceId,
    pub weights: AttrWeights,
    pub same_song: Option<SameSongId>,
}

impl SongEntry {
    pub fn new(id: i64, dance: impl Into<DanceId>, weights: AttrWeights) -> Self {
        Self {
            id: SongId(id),
            dance: dance.into(),
            weights,
            same_song: None,
        }
    }

    #[must_use]
    pub fn with_same_song(mut self, group: i64) -> Self {
        self.same_song = Some(SameSongId(group));
        self
    }
}

/// True when any of the song's tags appears in the session's tag list.
pub fn tag_affinity<S: AsRef<str>>(song_tags: &[S], wanted: &[S]) -> bool {
    song_tags
        .iter()
        .any(|tag| wanted.iter().any(|w| w.as_ref().eq_ignore_ascii_case(tag.as_ref())))
}

/// Split a stored tag string (`"a, b;c"`) into trimmed tags.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
