//! Automatic dance and song selection for unattended DJ playback.
//!
//! Core modules:
//! - [`dance_selector`] - Which dance plays next
//! - [`song_selector`] - Which song plays for a dance
//! - [`probability`] - Cumulative probability tables shared by both
//! - [`session`] - The loop driving both selectors, and playlist mixing
//!
//! ### Supporting Modules
//!
//! - [`config`] - Tuning constants and data file locations
//! - [`dance`] - The dance catalog
//! - [`song`] - Song candidates and weight dimensions
//! - [`db`] - The SQLite song catalog
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```
//! use tanda::config::TuningConfig;
//! use tanda::dance::{Dance, DanceCatalog, DanceId, Dances, Speed};
//! use tanda::session::AutoSession;
//! use tanda::song::{AttrWeights, SongEntry};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let dances = Dances::new([
//!     Dance::new(1, "Waltz").with_speed(Speed::Slow),
//!     Dance::new(2, "Quickstep").with_speed(Speed::Fast),
//! ]);
//! let songs = vec![
//!     SongEntry::new(10, 1, AttrWeights::new(5.0, 1.0, 0.0)),
//!     SongEntry::new(11, 1, AttrWeights::new(7.0, 1.0, 0.0)),
//!     SongEntry::new(20, 2, AttrWeights::new(5.0, 1.0, 0.0)),
//! ];
//! let tuning = TuningConfig::default();
//! let mut session = AutoSession::new([(DanceId(1), 2), (DanceId(2), 1)], songs, &dances, &tuning)
//!     .with_stop_after(6);
//!
//! let mut rng = StdRng::seed_from_u64(1);
//! while let Some(pick) = session.next(&mut rng, |_| true) {
//!     println!("{} -> song {}", dances.name(pick.dance), pick.song);
//! }
//! assert_eq!(session.committed(), 6);
//! ```
//!
//! ## Dance Selection
//!
//! Each dance has a target count. Its *window* is the ideal spacing between
//! two of its selections, `total / count - window_shrink`. A dance picked
//! recently sits inside its window and weighs little or nothing until the
//! window reopens. Recent history then divides the weight further:
//! - fast dances at the start of a session
//! - fast after fast
//! - the same dance type as the previous dance
//! - tags shared with the previous dance, or with older dances (decaying
//!   with distance)
//!
//! ## Song Selection
//!
//! Songs for a dance are drawn without replacement: a song, and every other
//! take of the same track, leaves the cycle once its pick is finalized.
//!
//! ## Preview and Commit
//!
//! Both selectors separate a side-effect free `select` from the call that
//! commits it (`add_count` / `select_finalize`), so a caller can reject a
//! tentative pick without disturbing the selector.

pub mod cli;
pub mod completion;
pub mod config;
pub mod dance;
pub mod dance_selector;
pub mod db;
pub mod probability;
pub mod session;
pub mod song;
pub mod song_selector;
