//! Cumulative probability tables.
//!
//! Both selectors turn a list of `(key, weight)` pairs into a running-total
//! table over `[0, 1]` and convert a single uniform draw into a key.
//!
//! ```
//! use tanda::probability::ProbTable;
//!
//! let table = ProbTable::from_weights([("x", 1.0), ("y", 2.0), ("z", 1.0)]);
//! assert_eq!(table.search(0.0), Some(&"x"));
//! assert_eq!(table.search(0.26), Some(&"y"));
//! assert_eq!(table.search(0.999_999), Some(&"z"));
//! ```

use rand::Rng;

/// A non-decreasing cumulative distribution whose last entry is exactly `1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbTable<K> {
    entries: Vec<Entry<K>>,
}

#[derive(Debug, Clone, PartialEq)]
struct Entry<K> {
    key: K,
    cumulative: f64,
    /// Zero-width entries can never be returned by a search.
    width: f64,
}

impl<K> ProbTable<K> {
    /// Build a table from weights, computing the total from the weights themselves.
    ///
    /// Negative and non-finite weights count as zero. A table whose total is
    /// not positive is empty.
    pub fn from_weights<I>(weights: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
    {
        let weights: Vec<(K, f64)> = weights
            .into_iter()
            .map(|(key, weight)| (key, sanitize(weight)))
            .collect();
        let total = weights.iter().map(|(_, w)| w).sum::<f64>();
        Self::with_total(weights, total)
    }

    /// Build a table from weights and a caller-supplied total.
    pub fn with_total<I>(weights: I, total: f64) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
    {
        if !(total > 0.0 && total.is_finite()) {
            return Self { entries: Vec::new() };
        }

        let mut running = 0.0;
        let mut entries: Vec<Entry<K>> = weights
            .into_iter()
            .map(|(key, weight)| {
                let width = sanitize(weight) / total;
                running += width;
                Entry {
                    key,
                    cumulative: running.min(1.0),
                    width,
                }
            })
            .collect();

        // Absorb floating-point drift so a draw just below 1.0 always matches.
        // Everything from the last positive-width entry on ends at 1.0.
        let tail = entries
            .iter()
            .rposition(|e| e.width > 0.0)
            .unwrap_or_else(|| entries.len().saturating_sub(1));
        for entry in entries.iter_mut().skip(tail) {
            entry.cumulative = 1.0;
        }

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(key, cumulative)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, f64)> {
        self.entries.iter().map(|e| (&e.key, e.cumulative))
    }

    /// Index of the first positive-width entry whose cumulative value is `>= x`.
    pub fn search_index(&self, x: f64) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }

        let start = self.entries.partition_point(|e| e.cumulative < x);
        let found = self.entries[start.min(self.entries.len() - 1)..]
            .iter()
            .position(|e| e.width > 0.0)
            .map(|offset| start.min(self.entries.len() - 1) + offset);

        // A draw beyond the last boundary belongs to the last positive entry.
        found.or_else(|| self.entries.iter().rposition(|e| e.width > 0.0))
    }

    /// The key selected by the draw `x ∈ [0, 1)`. Ties go to the earliest key.
    pub fn search(&self, x: f64) -> Option<&K> {
        self.search_index(x).map(|idx| &self.entries[idx].key)
    }

    /// Draw a key using a uniform value from `rng`.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&K> {
        if self.entries.is_empty() {
            return None;
        }
        let x: f64 = rng.gen();
        let key = self.search(x);
        log::trace!("probability draw {x:.6} over {} entries", self.entries.len());
        key
    }
}

#[inline]
fn sanitize(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}
