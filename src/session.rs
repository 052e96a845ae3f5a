//! Selection sessions: the loop that drives both selectors.
//!
//! [`AutoSession`] builds an automatic playlist one dance at a time. Picks
//! are queued until the player reports them as played; the queue is what
//! the dance selector sees as recent history.
//!
//! [`mix`] reorders an existing list of songs so that their dances follow
//! the same spacing rules.

use crate::config::TuningConfig;
use crate::dance::{DanceCatalog, DanceId};
use crate::dance_selector::DanceSelector;
use crate::song::{SongEntry, SongId};
use crate::song_selector::SongSelector;
use log::{debug, info, trace, warn};
use rand::Rng;
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

/// One committed selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pick {
    pub dance: DanceId,
    pub song: SongId,
}

type Queue = Rc<RefCell<VecDeque<Pick>>>;

/// An automatic playlist run.
pub struct AutoSession<'a> {
    dance_sel: DanceSelector<'a>,
    song_sel: SongSelector,
    queue: Queue,
    valid_song_attempts: usize,
    stop_after: Option<usize>,
    committed: usize,
}

impl<'a> AutoSession<'a> {
    /// Start a session with target counts per dance and the eligible songs.
    pub fn new<I>(counts: I, songs: Vec<SongEntry>, dances: &'a dyn DanceCatalog, tuning: &TuningConfig) -> Self
    where
        I: IntoIterator<Item = (DanceId, u32)>,
    {
        let queue: Queue = Rc::new(RefCell::new(VecDeque::new()));
        let lookup_queue = Rc::clone(&queue);
        let dance_sel = DanceSelector::new(counts, dances, tuning).with_history(move |idx: isize| {
            let idx = usize::try_from(idx).ok()?;
            lookup_queue.borrow().get(idx).map(|pick| pick.dance)
        });

        Self {
            dance_sel,
            song_sel: SongSelector::new(songs, tuning),
            queue,
            valid_song_attempts: tuning.valid_song_attempts.max(1),
            stop_after: None,
            committed: 0,
        }
    }

    /// End the session after `limit` committed selections.
    #[must_use]
    pub fn with_stop_after(mut self, limit: usize) -> Self {
        self.stop_after = Some(limit);
        self
    }

    pub fn is_finished(&self) -> bool {
        self.stop_after.is_some_and(|limit| self.committed >= limit)
    }

    pub fn committed(&self) -> usize {
        self.committed
    }

    /// Selections not yet reported as played, oldest first.
    pub fn queued(&self) -> Vec<Pick> {
        self.queue.borrow().iter().copied().collect()
    }

    pub fn dance_selector(&self) -> &DanceSelector<'a> {
        &self.dance_sel
    }

    pub fn song_selector(&self) -> &SongSelector {
        &self.song_sel
    }

    /// Select, commit and queue the next dance and song.
    ///
    /// `accept` may veto tentative songs (e.g. already in the playlist).
    /// Returns `None` when the session is finished, no dance is eligible,
    /// or no acceptable song turned up for the chosen dance.
    pub fn next<R, F>(&mut self, rng: &mut R, mut accept: F) -> Option<Pick>
    where
        R: Rng + ?Sized,
        F: FnMut(SongId) -> bool,
    {
        if self.is_finished() {
            debug!("session finished after {} selections", self.committed);
            return None;
        }

        let prior = self.queue.borrow().len();
        let Some(dance) = self.dance_sel.select(prior, rng) else {
            warn!("no dance available for selection");
            return None;
        };

        let mut song = None;
        for attempt in 0..self.valid_song_attempts {
            let Some(candidate) = self.song_sel.select(dance, rng) else {
                break;
            };
            if accept(candidate) {
                song = Some(candidate);
                break;
            }
            debug!("dance {dance}: song {candidate} rejected (attempt {})", attempt + 1);
        }
        let Some(song) = song else {
            warn!("dance {dance}: no acceptable song found");
            return None;
        };

        self.song_sel.select_finalize(dance);
        self.dance_sel.add_count(dance);

        let pick = Pick { dance, song };
        self.queue.borrow_mut().push_back(pick);
        self.committed += 1;
        info!("selected dance {dance} song {song}");
        Some(pick)
    }

    /// The player finished the oldest queued selection.
    pub fn mark_played(&mut self) -> Option<Pick> {
        let pick = self.queue.borrow_mut().pop_front()?;
        self.dance_sel.add_played(pick.dance);
        Some(pick)
    }
}

/// Reorder `items` so that their dances are spaced like an automatic playlist.
///
/// `entry_of` describes each item to the song selector: its dance, weights
/// and same-song group. Its `id` is ignored; items are told apart by
/// position. The dance counts are taken from the items themselves, and
/// within a dance the next item is drawn by the song selector. The result
/// is always a permutation of the input.
pub fn mix<T, F, R>(items: Vec<T>, entry_of: F, dances: &dyn DanceCatalog, tuning: &TuningConfig, rng: &mut R) -> Vec<T>
where
    F: Fn(&T) -> SongEntry,
    R: Rng + ?Sized,
{
    let total = items.len();
    let mut entries = Vec::with_capacity(total);
    let mut left: BTreeMap<DanceId, u32> = BTreeMap::new();
    for (pos, item) in items.iter().enumerate() {
        let entry = SongEntry {
            id: SongId(pos as i64),
            ..entry_of(item)
        };
        *left.entry(entry.dance).or_default() += 1;
        entries.push(entry);
    }
    let dance_at: Vec<DanceId> = entries.iter().map(|e| e.dance).collect();
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();

    let mixed_dances: Rc<RefCell<Vec<DanceId>>> = Rc::new(RefCell::new(Vec::with_capacity(total)));
    let lookup = Rc::clone(&mixed_dances);
    let mut selector = DanceSelector::new(left.clone(), dances, tuning).with_history(move |idx: isize| {
        let idx = usize::try_from(idx).ok()?;
        lookup.borrow().get(idx).copied()
    });
    let mut song_sel = SongSelector::new(entries, tuning);

    let mut mixed = Vec::with_capacity(total);
    while mixed.len() < total {
        let prior = mixed.len();
        let Some(dance) = selector.select(prior, rng) else {
            warn!("mix: no dance eligible after {prior} songs, keeping remaining order");
            break;
        };
        let Some(remaining) = left.get_mut(&dance).filter(|n| **n > 0) else {
            warn!("mix: dance {dance} selected with no songs left");
            selector.decrement_base(dance);
            continue;
        };

        let Some(pos) = draw_unplaced(&mut song_sel, dance, &slots, &dance_at, rng) else {
            warn!("mix: no song left for dance {dance}");
            *remaining = 0;
            selector.decrement_base(dance);
            continue;
        };
        let Some(item) = slots[pos].take() else {
            continue;
        };

        *remaining -= 1;
        selector.add_count(dance);
        selector.decrement_base(dance);
        mixed_dances.borrow_mut().push(dance);
        mixed.push(item);
    }

    mixed.extend(slots.into_iter().flatten());
    debug!("mix: reordered {total} songs");
    mixed
}

/// Position of the next item for `dance`, drawn through the song selector.
///
/// A pool that was rebuilt can offer items already placed; those are
/// finalized and drawn past. Falls back to the first unplaced item.
fn draw_unplaced<T, R>(
    song_sel: &mut SongSelector,
    dance: DanceId,
    slots: &[Option<T>],
    dance_at: &[DanceId],
    rng: &mut R,
) -> Option<usize>
where
    R: Rng + ?Sized,
{
    for _ in 0..=song_sel.pool_len(dance) {
        let song = song_sel.select(dance, rng)?;
        song_sel.select_finalize(dance);
        let pos = usize::try_from(song.0).ok()?;
        if slots.get(pos).is_some_and(Option::is_some) {
            return Some(pos);
        }
        trace!("mix: song at {pos} already placed, drawing again");
    }
    slots
        .iter()
        .zip(dance_at)
        .position(|(slot, d)| slot.is_some() && *d == dance)
}
