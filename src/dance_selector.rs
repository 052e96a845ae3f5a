//! Dance selection for automatic playlists.
//!
//! Each dance gets a *window*: the ideal number of selections between two
//! picks of that dance, derived from its share of the target counts
//! (`base_total / count - window_shrink`). After a dance is committed its
//! *decrement* counts the selections made since; while the decrement is
//! still inside the window the dance's base weight drops sharply, easing back
//! towards `1.0` as the window reopens. Recent history then divides the
//! weight further (fast after fast, same type, shared tags) before a single
//! weighted draw picks the dance.
//!
//! `select` is a preview: only [`DanceSelector::add_count`] commits a pick.

use crate::config::TuningConfig;
use crate::dance::{Dance, DanceCatalog, DanceId};
use crate::probability::ProbTable;
use log::{debug, trace};
use rand::Rng;
use std::collections::{BTreeMap, VecDeque};

/// Source of the dances already queued by the caller.
///
/// `index` counts positions in the caller's queue; `None` means nothing is
/// known there. Negative positions fall back to the selector's own played
/// history (`-1` is the most recently played dance).
pub trait HistoryLookup {
    fn dance_at(&self, index: isize) -> Option<DanceId>;
}

impl<F> HistoryLookup for F
where
    F: Fn(isize) -> Option<DanceId>,
{
    fn dance_at(&self, index: isize) -> Option<DanceId> {
        self(index)
    }
}

/// Per-dance windowed state.
#[derive(Debug, Clone, PartialEq)]
struct DanceState {
    /// Remaining target count
    base: u32,
    window: f64,
    /// Selections since this dance's window last started
    decrement: f64,
    early_selected: bool,
}

impl DanceState {
    fn inside_window(&self) -> bool {
        self.decrement > 0.0 && self.decrement < self.window
    }
}

/// Result of one history position lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prior {
    Dance(DanceId),
    Empty,
    End,
}

pub struct DanceSelector<'a> {
    dances: &'a dyn DanceCatalog,
    lookup: Option<Box<dyn HistoryLookup + 'a>>,
    tuning: TuningConfig,
    states: BTreeMap<DanceId, DanceState>,
    base_total: f64,
    played: VecDeque<DanceId>,
    selection_count: usize,
}

impl<'a> DanceSelector<'a> {
    /// Build a selector from target counts.
    ///
    /// Dances with a zero count are ignored; an empty mapping produces a
    /// selector whose `select` always returns `None`.
    pub fn new<I>(counts: I, dances: &'a dyn DanceCatalog, tuning: &TuningConfig) -> Self
    where
        I: IntoIterator<Item = (DanceId, u32)>,
    {
        let mut states = BTreeMap::new();
        let mut base_total = 0.0;

        for (id, count) in counts {
            if count == 0 {
                continue;
            }
            debug!("base: {}/{}: {count}", id, dances.name(id));
            base_total += f64::from(count);
            states.insert(
                id,
                DanceState {
                    base: count,
                    window: 0.0,
                    decrement: 0.0,
                    early_selected: false,
                },
            );
        }

        let mut selector = Self {
            dances,
            lookup: None,
            tuning: tuning.clone(),
            states,
            base_total,
            played: VecDeque::new(),
            selection_count: 0,
        };
        selector.update_windows();
        selector
    }

    /// Attach the caller's queue lookup.
    #[must_use]
    pub fn with_history<H>(mut self, lookup: H) -> Self
    where
        H: HistoryLookup + 'a,
    {
        self.lookup = Some(Box::new(lookup));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn base_count(&self, id: DanceId) -> Option<u32> {
        self.states.get(&id).map(|s| s.base)
    }

    pub fn base_total(&self) -> f64 {
        self.base_total
    }

    pub fn window_size(&self, id: DanceId) -> Option<f64> {
        self.states.get(&id).map(|s| s.window)
    }

    pub fn decrement(&self, id: DanceId) -> Option<f64> {
        self.states.get(&id).map(|s| s.decrement)
    }

    pub fn is_early_selected(&self, id: DanceId) -> bool {
        self.states.get(&id).is_some_and(|s| s.early_selected)
    }

    pub fn selection_count(&self) -> usize {
        self.selection_count
    }

    /// Played history, most recent first.
    pub fn played(&self) -> impl Iterator<Item = DanceId> + '_ {
        self.played.iter().copied()
    }

    /// Consume one instance of a dance outside of normal selection (e.g. a mix).
    pub fn decrement_base(&mut self, id: DanceId) {
        let Some(state) = self.states.get_mut(&id) else {
            return;
        };
        if state.base == 0 {
            debug!("decrement {}: already at zero", self.dances.name(id));
            return;
        }

        state.base -= 1;
        self.base_total -= 1.0;
        debug!(
            "decrement {}/{} now {} total {:.0}",
            id,
            self.dances.name(id),
            state.base,
            self.base_total
        );
        self.update_windows();
    }

    /// Commit a selected dance.
    pub fn add_count(&mut self, id: DanceId) {
        let Some(state) = self.states.get_mut(&id) else {
            return;
        };

        if state.early_selected || state.inside_window() {
            trace!("early selection of {id}: restarting its window");
            state.decrement = 0.0;
            state.early_selected = false;
        }

        self.selection_count += 1;
        for (&other, state) in &mut self.states {
            if state.decrement > 0.0 || other == id {
                state.decrement += 1.0;
            }
            if state.decrement >= state.window {
                state.decrement = 0.0;
            }
        }
    }

    /// Push a dance onto the played history (most recent first).
    pub fn add_played(&mut self, id: DanceId) {
        self.played.push_front(id);
    }

    /// Pick the next dance, given how many dances the caller has already queued.
    ///
    /// Returns `None` only when no dance is eligible at all.
    pub fn select<R: Rng + ?Sized>(&mut self, prior_hist_count: usize, rng: &mut R) -> Option<DanceId> {
        for state in self.states.values_mut() {
            state.early_selected = false;
        }

        let weights = self.adjusted_weights(prior_hist_count);
        let table = ProbTable::from_weights(weights);
        for (id, cumulative) in table.iter() {
            trace!("final prob: {}/{}: {cumulative:.6}", id, self.dances.name(*id));
        }

        let picked = table.draw(rng).copied()?;
        if let Some(state) = self.states.get_mut(&picked) {
            if state.inside_window() {
                state.early_selected = true;
            }
        }
        debug!("== select {}/{}", picked, self.dances.name(picked));
        Some(picked)
    }

    /// Pre-normalization weight of every eligible dance, in dance order.
    ///
    /// When every eligible dance comes out at zero the pass is repeated with
    /// the windowed base weight raised by `relax_step` per retry.
    pub fn adjusted_weights(&self, prior_hist_count: usize) -> Vec<(DanceId, f64)> {
        let history = self.history(prior_hist_count);
        if let Some(Some(prev)) = history.first() {
            debug!("found previous dance {}/{}", prev.id, prev.name);
        }

        let mut weights = Vec::new();
        for tries in 0..=self.tuning.max_relax_tries {
            let relax = tries as f64 * self.tuning.relax_step;
            weights = self
                .states
                .iter()
                .filter(|(_, state)| state.window > 0.0)
                .map(|(&id, state)| (id, self.dance_weight(id, state, relax, &history)))
                .collect();

            if weights.iter().any(|(_, w)| *w > 0.0) {
                break;
            }
            debug!("no dance eligible (try {tries}), relaxing windows");
        }
        weights
    }

    fn dance_weight(&self, id: DanceId, state: &DanceState, relax: f64, history: &[Option<&Dance>]) -> f64 {
        let mut abase = self.window_weight(state, relax);
        if abase <= 0.0 {
            return 0.0;
        }

        // No catalog data, no history-based adjustment.
        let Some(dance) = self.dances.get(id) else {
            return abase;
        };

        if self.selection_count < self.tuning.begin_count && dance.is_fast() {
            abase /= self.tuning.begin_fast;
            trace!("  {}: fast / begin of playlist: {abase:.6}", dance.name);
        }

        if let Some(Some(prev)) = history.first() {
            if prev.is_fast() && dance.is_fast() {
                abase /= self.tuning.both_fast;
                trace!("  {}: fast and previous fast: {abase:.6}", dance.name);
            }
            if dance.same_type(prev) {
                abase /= self.tuning.type_match;
                trace!("  {}: matched type with previous: {abase:.6}", dance.name);
            }
            if dance.shares_tag(prev) {
                abase /= self.tuning.prev_tag_match;
                trace!("  {}: matched tags with previous: {abase:.6}", dance.name);
            }
        }

        let mut tag_matched = false;
        for (dist, prior) in history.iter().enumerate().skip(1) {
            let Some(prior) = prior else {
                continue;
            };

            if dist == 1 && prior.is_fast() && dance.is_fast() {
                abase /= self.tuning.fast_prior;
                trace!("  {}: fast two back: {abase:.6}", dance.name);
            }

            if !tag_matched && dance.shares_tag(prior) {
                let divisor = (self.tuning.tag_match / (dist as f64).powf(self.tuning.prior_exp)).max(1.0);
                abase /= divisor;
                tag_matched = true;
                trace!("  {}: matched tags at dist {dist}: {abase:.6}", dance.name);
            }
        }

        abase
    }

    /// Base weight from the dance's position inside its window.
    fn window_weight(&self, state: &DanceState, relax: f64) -> f64 {
        if !state.inside_window() {
            return 1.0;
        }

        let diff = state.window - state.decrement;
        let weight = if diff <= 1.0 {
            self.tuning.windowed_diff_a
        } else if diff <= 2.0 {
            self.tuning.windowed_diff_b
        } else if diff <= 3.0 {
            self.tuning.windowed_diff_c
        } else {
            0.0
        };
        weight.max(relax)
    }

    /// Catalog entries for the last `hist_distance` dances, previous dance first.
    fn history(&self, prior_hist_count: usize) -> Vec<Option<&'a Dance>> {
        let mut history = Vec::with_capacity(self.tuning.hist_distance);
        let mut index = prior_hist_count as isize - 1;

        while history.len() < self.tuning.hist_distance {
            match self.prior(index) {
                Prior::Dance(id) => history.push(self.dances.get(id)),
                Prior::Empty => history.push(None),
                Prior::End => break,
            }
            index -= 1;
        }
        history
    }

    fn prior(&self, index: isize) -> Prior {
        if let Some(id) = self.lookup.as_ref().and_then(|l| l.dance_at(index)) {
            return Prior::Dance(id);
        }
        if index >= 0 {
            return Prior::Empty;
        }

        let played_idx = (-index - 1) as usize;
        match self.played.get(played_idx) {
            Some(&id) => Prior::Dance(id),
            None => Prior::End,
        }
    }

    fn update_windows(&mut self) {
        let total = self.base_total;
        let shrink = self.tuning.window_shrink;
        for (id, state) in &mut self.states {
            state.window = if state.base == 0 {
                0.0
            } else {
                total / f64::from(state.base) - shrink
            };
            trace!("window: {id}: {:.2}", state.window);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dance::{Dances, Speed};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::RefCell;
    use std::rc::Rc;

    const A: DanceId = DanceId(1);
    const B: DanceId = DanceId(2);
    const C: DanceId = DanceId(3);
    const D: DanceId = DanceId(4);

    fn weight_of(weights: &[(DanceId, f64)], id: DanceId) -> f64 {
        weights
            .iter()
            .find(|(d, _)| *d == id)
            .map(|(_, w)| *w)
            .expect("dance should be eligible")
    }

    #[test]
    fn test_empty_counts_select_nothing() {
        let dances = Dances::default();
        let mut selector = DanceSelector::new(Vec::<(DanceId, u32)>::new(), &dances, &TuningConfig::default());
        let mut rng = StdRng::seed_from_u64(1);

        assert!(selector.is_empty());
        assert_eq!(selector.select(0, &mut rng), None);

        let zeros = DanceSelector::new([(A, 0)], &dances, &TuningConfig::default());
        assert!(zeros.is_empty(), "zero counts are ignored");
    }

    #[test]
    fn test_single_dance_always_chosen() {
        let dances = Dances::default();
        let mut selector = DanceSelector::new([(A, 5)], &dances, &TuningConfig::default());
        let mut rng = StdRng::seed_from_u64(2);

        for _ in 0..16 {
            let picked = selector.select(0, &mut rng);
            assert_eq!(picked, Some(A));
            selector.add_count(A);
        }
    }

    #[test]
    fn test_window_sizes() {
        let dances = Dances::default();
        let selector = DanceSelector::new([(A, 6), (B, 3), (C, 1)], &dances, &TuningConfig::default());

        assert_eq!(selector.base_total(), 10.0);
        assert!((selector.window_size(A).unwrap() - (10.0 / 6.0 - 0.3)).abs() < 1e-12);
        assert!((selector.window_size(B).unwrap() - (10.0 / 3.0 - 0.3)).abs() < 1e-12);
        assert!((selector.window_size(C).unwrap() - 9.7).abs() < 1e-12);
        assert_eq!(selector.window_size(D), None);
    }

    #[test]
    fn test_select_without_commit_does_not_mutate() {
        let dances = Dances::default();
        let mut selector = DanceSelector::new([(A, 6), (B, 3), (C, 1)], &dances, &TuningConfig::default());
        let mut rng = StdRng::seed_from_u64(3);

        selector.add_count(C);
        let before: Vec<_> = [A, B, C]
            .iter()
            .map(|&d| (selector.base_count(d), selector.decrement(d)))
            .collect();

        for _ in 0..50 {
            selector.select(0, &mut rng);
        }

        let after: Vec<_> = [A, B, C]
            .iter()
            .map(|&d| (selector.base_count(d), selector.decrement(d)))
            .collect();
        assert_eq!(before, after);
        assert_eq!(selector.selection_count(), 1);
    }

    #[test]
    fn test_distribution_converges_to_targets() {
        let dances = Dances::default();
        let mut selector = DanceSelector::new([(A, 6), (B, 3), (C, 1)], &dances, &TuningConfig::default());
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts: BTreeMap<DanceId, usize> = BTreeMap::new();

        let rounds = 10_000;
        for _ in 0..rounds {
            let picked = selector.select(0, &mut rng).expect("always a dance");
            selector.add_count(picked);
            *counts.entry(picked).or_default() += 1;
        }

        for (id, target) in [(A, 0.6), (B, 0.3), (C, 0.1)] {
            let ratio = counts.get(&id).copied().unwrap_or(0) as f64 / rounds as f64;
            assert!(
                (ratio - target).abs() < 0.05,
                "dance {id} selected {ratio:.3}, expected about {target}"
            );
        }
    }

    #[test]
    fn test_equal_counts_respect_window() {
        // Both windows are 1.7: the last dance committed sits one selection
        // into its window, weighted down to `windowed_diff_a`.
        let dances = Dances::default();
        let tuning = TuningConfig::default();
        let mut selector = DanceSelector::new([(A, 5), (B, 5)], &dances, &tuning);
        let mut rng = StdRng::seed_from_u64(11);

        let mut previous: Option<DanceId> = None;
        let mut repeats = 0;
        for i in 0..40 {
            let picked = selector.select(0, &mut rng).expect("a dance");
            assert_eq!(
                selector.is_early_selected(picked),
                previous == Some(picked),
                "selection {i}: only a repeat is early"
            );
            if previous == Some(picked) {
                repeats += 1;
            }

            selector.add_count(picked);
            let other = if picked == A { B } else { A };
            assert_eq!(selector.decrement(picked), Some(1.0));
            assert_eq!(selector.decrement(other), Some(0.0));

            let weights = selector.adjusted_weights(0);
            assert_eq!(weight_of(&weights, picked), tuning.windowed_diff_a);
            assert_eq!(weight_of(&weights, other), 1.0);
            previous = Some(picked);
        }

        // A repeat weighs 0.5 against 1.0: about a third of the picks.
        assert!(repeats < 25, "{repeats} back-to-back repeats in 40 selections");
    }

    #[test]
    fn test_smallest_valid_relaxation_still_selects() {
        let dances = Dances::default();
        let tuning = TuningConfig::from_json(r#"{ "max_relax_tries": 1, "window_shrink": -10.0 }"#)
            .expect("valid tuning");
        let mut selector = DanceSelector::new([(A, 1), (B, 1)], &dances, &tuning);
        let mut rng = StdRng::seed_from_u64(9);

        selector.add_count(A);
        selector.add_count(B);

        for _ in 0..10 {
            let picked = selector.select(0, &mut rng).expect("selection keeps making progress");
            selector.add_count(picked);
        }
    }

    #[test]
    fn test_rare_dance_waits_out_its_window() {
        // A's window is 9.7; it has zero weight until at most three selections remain.
        let dances = Dances::default();

        for seed in 0..20 {
            let mut selector =
                DanceSelector::new([(A, 1), (B, 3), (C, 3), (D, 3)], &dances, &TuningConfig::default());
            let mut rng = StdRng::seed_from_u64(seed);
            let mut last_a: Option<usize> = None;

            for i in 0..60 {
                let picked = selector.select(0, &mut rng).expect("a dance");
                if picked == A {
                    if let Some(last) = last_a {
                        assert!(i - last >= 7, "seed {seed}: A repeated after {}", i - last);
                    }
                    last_a = Some(i);
                }
                selector.add_count(picked);
            }
        }
    }

    #[test]
    fn test_decrement_tracks_window() {
        let dances = Dances::default();
        let mut selector = DanceSelector::new([(A, 1), (B, 3), (C, 3), (D, 3)], &dances, &TuningConfig::default());

        selector.add_count(A);
        assert_eq!(selector.decrement(A), Some(1.0));
        assert_eq!(selector.decrement(B), Some(0.0), "untouched dances carry no debt");

        for expected in 2..=9 {
            selector.add_count(B);
            assert_eq!(selector.decrement(A), Some(f64::from(expected)));
        }

        // 10 >= 9.7: the window has reopened.
        selector.add_count(B);
        assert_eq!(selector.decrement(A), Some(0.0));
        let weights = selector.adjusted_weights(0);
        assert_eq!(weight_of(&weights, A), 1.0);
    }

    #[test]
    fn test_window_weight_thresholds() {
        let dances = Dances::default();
        let tuning = TuningConfig::default();
        let mut selector = DanceSelector::new([(A, 1), (B, 9)], &dances, &tuning);
        // window(A) = 9.7
        selector.add_count(A);

        let mut seen = Vec::new();
        for _ in 0..9 {
            seen.push(weight_of(&selector.adjusted_weights(0), A));
            selector.add_count(B);
        }

        // decrement 1..=9 → diff 8.7 .. 0.7
        assert_eq!(
            seen,
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.1, 0.25, 0.5],
            "penalty eases as the window reopens"
        );
    }

    #[test]
    fn test_relaxation_when_every_dance_is_held_back() {
        let dances = Dances::default();
        let tuning = TuningConfig {
            window_shrink: -10.0,
            ..TuningConfig::default()
        };
        let mut selector = DanceSelector::new([(A, 1), (B, 1)], &dances, &tuning);
        let mut rng = StdRng::seed_from_u64(5);

        selector.add_count(A);
        selector.add_count(B);

        let weights = selector.adjusted_weights(0);
        assert!((weight_of(&weights, A) - 0.1).abs() < 1e-12);
        assert!((weight_of(&weights, B) - 0.1).abs() < 1e-12);

        let picked = selector.select(0, &mut rng).expect("relaxation must find a dance");
        assert!(selector.is_early_selected(picked));

        selector.add_count(picked);
        assert_eq!(selector.decrement(picked), Some(1.0), "early selection restarts the window");
        assert!(!selector.is_early_selected(picked));
    }

    #[test]
    fn test_fast_after_fast_is_penalized() {
        let dances = Dances::new([
            Dance::new(1, "Quickstep").with_speed(Speed::Fast).with_type("standard"),
            Dance::new(2, "Jive").with_speed(Speed::Fast).with_type("latin"),
            Dance::new(3, "Waltz").with_speed(Speed::Slow).with_type("smooth"),
        ]);
        let tuning = TuningConfig {
            begin_count: 0,
            ..TuningConfig::default()
        };

        let after_fast = DanceSelector::new([(A, 2), (B, 2), (C, 2)], &dances, &tuning)
            .with_history(|idx: isize| (idx == 0).then_some(B));
        let after_slow = DanceSelector::new([(A, 2), (B, 2), (C, 2)], &dances, &tuning)
            .with_history(|idx: isize| (idx == 0).then_some(C));

        let fast_weight = weight_of(&after_fast.adjusted_weights(1), A);
        let slow_weight = weight_of(&after_slow.adjusted_weights(1), A);

        assert!(fast_weight < slow_weight);
        assert!((slow_weight / fast_weight - tuning.both_fast).abs() < 1e-6);
    }

    #[test]
    fn test_type_and_tag_penalties() {
        let dances = Dances::new([
            Dance::new(1, "Waltz").with_type("standard").with_tags(&["smooth"]),
            Dance::new(2, "Foxtrot").with_type("standard"),
            Dance::new(3, "Rumba").with_type("latin").with_tags(&["smooth"]),
            Dance::new(4, "Samba").with_type("latin"),
        ]);
        let tuning = TuningConfig::default();
        let selector = DanceSelector::new([(A, 1), (B, 1), (C, 1), (D, 1)], &dances, &tuning)
            .with_history(|idx: isize| (idx == 0).then_some(A));

        let weights = selector.adjusted_weights(1);
        assert!((weight_of(&weights, B) - 1.0 / tuning.type_match).abs() < 1e-12);
        assert!((weight_of(&weights, C) - 1.0 / tuning.prev_tag_match).abs() < 1e-12);
        assert_eq!(weight_of(&weights, D), 1.0);
    }

    #[test]
    fn test_begin_fast_penalty() {
        let dances = Dances::new([
            Dance::new(1, "Quickstep").with_speed(Speed::Fast),
            Dance::new(2, "Waltz").with_speed(Speed::Slow),
        ]);
        let tuning = TuningConfig::default();
        let mut selector = DanceSelector::new([(A, 50), (B, 50)], &dances, &tuning);

        let weights = selector.adjusted_weights(0);
        assert!((weight_of(&weights, A) - 1.0 / tuning.begin_fast).abs() < 1e-12);

        for _ in 0..tuning.begin_count {
            selector.add_count(B);
        }
        let weights = selector.adjusted_weights(0);
        assert_eq!(weight_of(&weights, A), 1.0, "penalty ends after the opening selections");
    }

    #[test]
    fn test_tag_match_decays_with_distance() {
        let dances = Dances::new([
            Dance::new(1, "Waltz").with_tags(&["smooth"]),
            Dance::new(2, "Foxtrot"),
            Dance::new(3, "Rumba").with_tags(&["smooth"]),
        ]);
        let tuning = TuningConfig::default();

        // History, most recent first: Foxtrot, Rumba (dist 1), ...
        let near = DanceSelector::new([(A, 1), (B, 1), (C, 1)], &dances, &tuning)
            .with_history(|idx: isize| match idx {
                1 => Some(B),
                0 => Some(C),
                _ => None,
            });
        // Foxtrot, Foxtrot, Foxtrot, Rumba (dist 3)
        let far = DanceSelector::new([(A, 1), (B, 1), (C, 1)], &dances, &tuning)
            .with_history(|idx: isize| match idx {
                1..=3 => Some(B),
                0 => Some(C),
                _ => None,
            });

        let near_weight = weight_of(&near.adjusted_weights(2), A);
        let far_weight = weight_of(&far.adjusted_weights(4), A);

        assert!((near_weight - 1.0 / tuning.tag_match).abs() < 1e-12);
        let expected_far = 1.0 / (tuning.tag_match / 3f64.powf(tuning.prior_exp));
        assert!((far_weight - expected_far).abs() < 1e-12);
        assert!(near_weight < far_weight);
    }

    #[test]
    fn test_played_history_fallback() {
        let dances = Dances::new([
            Dance::new(1, "Quickstep").with_speed(Speed::Fast),
            Dance::new(2, "Jive").with_speed(Speed::Fast),
        ]);
        let tuning = TuningConfig {
            begin_count: 0,
            ..TuningConfig::default()
        };
        let mut selector = DanceSelector::new([(A, 1), (B, 1)], &dances, &tuning);

        assert_eq!(weight_of(&selector.adjusted_weights(0), A), 1.0);

        selector.add_played(B);
        assert_eq!(selector.played().collect::<Vec<_>>(), vec![B]);
        let weights = selector.adjusted_weights(0);
        assert!((weight_of(&weights, A) - 1.0 / tuning.both_fast).abs() < 1e-12);
    }

    #[test]
    fn test_queue_lookup_precedes_played_history() {
        let dances = Dances::new([
            Dance::new(1, "Quickstep").with_speed(Speed::Fast),
            Dance::new(2, "Jive").with_speed(Speed::Fast),
            Dance::new(3, "Waltz").with_speed(Speed::Slow),
        ]);
        let tuning = TuningConfig {
            begin_count: 0,
            ..TuningConfig::default()
        };
        let queue = Rc::new(RefCell::new(vec![C]));
        let shared = Rc::clone(&queue);
        let mut selector = DanceSelector::new([(A, 1), (B, 1), (C, 1)], &dances, &tuning)
            .with_history(move |idx: isize| usize::try_from(idx).ok().and_then(|i| shared.borrow().get(i).copied()));

        selector.add_played(B);
        let weights = selector.adjusted_weights(queue.borrow().len());
        // Previous is the queued Waltz, not the played Jive; Jive sits two back.
        assert!((weight_of(&weights, A) - 1.0 / tuning.fast_prior).abs() < 1e-12);
    }

    #[test]
    fn test_decrement_base() {
        let dances = Dances::default();
        let mut selector = DanceSelector::new([(A, 2), (B, 2)], &dances, &TuningConfig::default());

        selector.decrement_base(A);
        assert_eq!(selector.base_count(A), Some(1));
        assert_eq!(selector.base_total(), 3.0);
        assert!((selector.window_size(B).unwrap() - (3.0 / 2.0 - 0.3)).abs() < 1e-12);

        selector.decrement_base(A);
        assert_eq!(selector.window_size(A), Some(0.0));
        let weights = selector.adjusted_weights(0);
        assert!(weights.iter().all(|(d, _)| *d != A), "exhausted dance is ineligible");

        selector.decrement_base(A);
        assert_eq!(selector.base_count(A), Some(0));
        assert_eq!(selector.base_total(), 2.0);
    }

    #[test]
    fn test_unknown_dance_is_noop() {
        let dances = Dances::default();
        let mut selector = DanceSelector::new([(A, 2)], &dances, &TuningConfig::default());

        selector.add_count(D);
        selector.decrement_base(D);

        assert_eq!(selector.selection_count(), 0);
        assert_eq!(selector.base_total(), 2.0);
        assert_eq!(selector.base_count(D), None);
    }
}
