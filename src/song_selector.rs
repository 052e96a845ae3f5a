//! Song selection without replacement.
//!
//! Every dance has its own pool. A pool's *cycle* holds the songs not yet
//! used in the current lap; a song leaves the cycle when its selection is
//! finalized, together with every other take of the same underlying track,
//! and the cycle is rebuilt from the full pool once it runs dry.
//!
//! Within a cycle each song is weighted by its share of the cycle's rating,
//! level and tag totals, scaled by the tuning weights for those dimensions.

use crate::config::TuningConfig;
use crate::dance::DanceId;
use crate::probability::ProbTable;
use crate::song::{AttrWeights, SameSongId, SongEntry, SongId};
use log::{debug, trace};
use rand::Rng;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

#[derive(Debug, Clone)]
struct SongPool {
    songs: Vec<SongEntry>,
    origin_totals: AttrWeights,
    /// Indices into `songs` still available in this lap, in pool order
    cycle: VecDeque<usize>,
    members: HashSet<usize>,
    current_totals: AttrWeights,
    groups: HashMap<SameSongId, Vec<usize>>,
    index: HashMap<SongId, usize>,
}

impl SongPool {
    fn new(songs: Vec<SongEntry>) -> Self {
        let origin_totals: AttrWeights = songs.iter().map(|s| s.weights).sum();
        let mut groups: HashMap<SameSongId, Vec<usize>> = HashMap::new();
        let mut index = HashMap::with_capacity(songs.len());
        for (idx, song) in songs.iter().enumerate() {
            index.entry(song.id).or_insert(idx);
            if let Some(group) = song.same_song {
                groups.entry(group).or_default().push(idx);
            }
        }

        let mut pool = Self {
            songs,
            origin_totals,
            cycle: VecDeque::new(),
            members: HashSet::new(),
            current_totals: origin_totals,
            groups,
            index,
        };
        pool.rebuild();
        pool
    }

    fn rebuild(&mut self) {
        self.cycle = (0..self.songs.len()).collect();
        self.members = self.cycle.iter().copied().collect();
        self.current_totals = self.origin_totals;
    }

    /// Combined weight of every song in the cycle, in cycle order.
    ///
    /// Dimensions with nothing left in the cycle drop out and the remaining
    /// tuning weights are renormalized.
    fn cycle_weights(&self, tuning: &AttrWeights) -> Vec<(usize, f64)> {
        let dims = [
            (self.current_totals.rating, tuning.rating),
            (self.current_totals.level, tuning.level),
            (self.current_totals.tag, tuning.tag),
        ];
        let tuning_sum: f64 = dims.iter().filter(|(total, _)| *total > 0.0).map(|(_, t)| t).sum();

        self.cycle
            .iter()
            .map(|&idx| {
                let w = self.songs[idx].weights;
                let raw = [w.rating, w.level, w.tag];
                let weight = if tuning_sum > 0.0 {
                    raw.iter()
                        .zip(dims.iter())
                        .filter(|(_, (total, _))| *total > 0.0)
                        .map(|(value, (total, tune))| value / total * tune)
                        .sum::<f64>()
                        / tuning_sum
                } else {
                    0.0
                };
                (idx, weight)
            })
            .collect()
    }

    /// Remove a song and its whole same-song group from the cycle.
    fn consume(&mut self, idx: usize) -> usize {
        let mut removed = vec![idx];
        if let Some(group) = self.songs[idx].same_song.and_then(|g| self.groups.get(&g)) {
            removed.extend(group.iter().copied().filter(|&i| i != idx));
        }

        let mut count = 0;
        for i in removed {
            if self.members.remove(&i) {
                self.current_totals -= self.songs[i].weights;
                count += 1;
            }
        }
        let members = &self.members;
        self.cycle.retain(|i| members.contains(i));
        count
    }
}

/// Per-dance song pools with a preview/commit selection protocol.
#[derive(Debug, Clone)]
pub struct SongSelector {
    tuning: AttrWeights,
    pools: BTreeMap<DanceId, SongPool>,
    last: Option<(DanceId, usize)>,
}

impl SongSelector {
    pub fn new<I>(songs: I, tuning: &TuningConfig) -> Self
    where
        I: IntoIterator<Item = SongEntry>,
    {
        let mut by_dance: BTreeMap<DanceId, Vec<SongEntry>> = BTreeMap::new();
        for song in songs {
            by_dance.entry(song.dance).or_default().push(song);
        }

        let pools = by_dance
            .into_iter()
            .map(|(dance, songs)| {
                debug!("song pool for dance {dance}: {} songs", songs.len());
                (dance, SongPool::new(songs))
            })
            .collect();

        Self {
            tuning: AttrWeights::new(tuning.rating_weight, tuning.level_weight, tuning.tag_weight),
            pools,
            last: None,
        }
    }

    /// Dances that have at least one song.
    pub fn dances(&self) -> impl Iterator<Item = DanceId> + '_ {
        self.pools.keys().copied()
    }

    pub fn pool_len(&self, dance: DanceId) -> usize {
        self.pools.get(&dance).map_or(0, |p| p.songs.len())
    }

    pub fn cycle_len(&self, dance: DanceId) -> usize {
        self.pools.get(&dance).map_or(0, |p| p.cycle.len())
    }

    pub fn in_cycle(&self, dance: DanceId, song: SongId) -> bool {
        self.pools
            .get(&dance)
            .is_some_and(|p| p.index.get(&song).is_some_and(|idx| p.members.contains(idx)))
    }

    pub fn current_totals(&self, dance: DanceId) -> Option<AttrWeights> {
        self.pools.get(&dance).map(|p| p.current_totals)
    }

    /// The tentative selection awaiting [`SongSelector::select_finalize`].
    pub fn pending(&self) -> Option<(DanceId, SongId)> {
        self.last
            .and_then(|(dance, idx)| self.pools.get(&dance).map(|p| (dance, p.songs[idx].id)))
    }

    /// Normalized selection weights of the songs in a dance's current cycle.
    pub fn weights(&self, dance: DanceId) -> Vec<(SongId, f64)> {
        let Some(pool) = self.pools.get(&dance) else {
            return Vec::new();
        };
        let weights = pool.cycle_weights(&self.tuning);
        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        weights
            .into_iter()
            .map(|(idx, w)| (pool.songs[idx].id, if total > 0.0 { w / total } else { 0.0 }))
            .collect()
    }

    /// Tentatively pick a song for `dance`. Nothing leaves the cycle until
    /// the pick is finalized; another `select` replaces the tentative pick.
    pub fn select<R: Rng + ?Sized>(&mut self, dance: DanceId, rng: &mut R) -> Option<SongId> {
        self.last = None;
        let pool = self.pools.get_mut(&dance)?;
        if pool.songs.is_empty() {
            return None;
        }
        if pool.cycle.is_empty() {
            debug!("dance {dance}: cycle exhausted, rebuilding");
            pool.rebuild();
        }

        let table = ProbTable::from_weights(pool.cycle_weights(&self.tuning));
        let idx = match table.draw(rng) {
            Some(&idx) => idx,
            None => {
                // Nothing weighted: every song in the cycle is equally likely.
                let pos = rng.gen_range(0..pool.cycle.len());
                pool.cycle[pos]
            }
        };

        let song = pool.songs[idx].id;
        trace!("dance {dance}: tentative song {song} ({} in cycle)", pool.cycle.len());
        self.last = Some((dance, idx));
        Some(song)
    }

    /// Commit the tentative pick for `dance`.
    ///
    /// Does nothing unless the last `select` was for the same dance.
    pub fn select_finalize(&mut self, dance: DanceId) {
        let Some((last_dance, idx)) = self.last else {
            return;
        };
        if last_dance != dance {
            debug!("finalize for dance {dance} ignored: pending selection is for {last_dance}");
            return;
        }
        self.last = None;

        let Some(pool) = self.pools.get_mut(&dance) else {
            return;
        };
        let removed = pool.consume(idx);
        debug!(
            "dance {dance}: finalized song {}, {removed} removed, {} left in cycle",
            pool.songs[idx].id,
            pool.cycle.len()
        );
        if pool.cycle.is_empty() {
            debug!("dance {dance}: cycle complete, rebuilding");
            pool.rebuild();
        }
    }
}
