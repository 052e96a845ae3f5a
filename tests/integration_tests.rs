//! # Integration Tests for Tanda
//!
//! End-to-end runs: a song database on disk feeding an automatic session,
//! and the `tanda` binary itself.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::process::Command;
use tanda::config::TuningConfig;
use tanda::dance::{Dance, DanceCatalog, DanceId, Dances, Speed};
use tanda::db::{MusicDb, NewSong};
use tanda::session::{self, AutoSession};
use tempfile::TempDir;

const WALTZ: u32 = 1;
const TANGO: u32 = 2;
const QUICKSTEP: u32 = 3;
const JIVE: u32 = 4;

fn catalog() -> Dances {
    Dances::new([
        Dance::new(WALTZ, "Waltz").with_speed(Speed::Slow).with_type("standard"),
        Dance::new(TANGO, "Tango").with_type("argentine").with_tags(&["dramatic"]),
        Dance::new(QUICKSTEP, "Quickstep").with_speed(Speed::Fast).with_type("standard"),
        Dance::new(JIVE, "Jive").with_speed(Speed::Fast).with_type("latin"),
    ])
}

/// Test helper to create a temporary database with sample data
fn create_test_database() -> Result<(TempDir, PathBuf)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test_tanda.db");

    let mut db = MusicDb::open(&db_path)?;
    db.init_schema()?;
    let good = db.insert_rating("Good", 5.0)?;
    let great = db.insert_rating("Great", 8.0)?;
    let normal = db.insert_level("Normal", 6.0)?;

    let mut songs = Vec::new();
    for (dance, n) in [(WALTZ, 6), (TANGO, 4), (QUICKSTEP, 3), (JIVE, 3)] {
        for i in 0..n {
            songs.push(NewSong {
                path: format!("/music/{dance}/{i}.flac"),
                title: format!("Song {dance}-{i}"),
                dance,
                rating: Some(if i % 2 == 0 { good } else { great }),
                level: Some(normal),
                tags: if i == 0 { vec!["party".to_string()] } else { Vec::new() },
                // The first two waltzes are takes of the same track.
                same_song: (dance == WALTZ && i < 2).then_some(1),
            });
        }
    }
    db.insert_songs(&songs)?;

    Ok((temp_dir, db_path))
}

#[cfg(test)]
mod session_integration_tests {
    use super::*;

    #[test]
    fn test_session_from_database() -> Result<()> {
        let (_dir, db_path) = create_test_database()?;
        let db = MusicDb::open(&db_path)?;
        let dances = catalog();
        let tuning = TuningConfig::default();

        let counts = db.dance_counts()?;
        let ids: Vec<DanceId> = counts.keys().copied().collect();
        let songs = db.songs_for_dances(&ids, &["party".to_string()], tuning.song_tag_weight)?;
        assert_eq!(songs.len(), 16);

        let mut session = AutoSession::new(counts.clone(), songs, &dances, &tuning).with_stop_after(32);
        let mut rng = StdRng::seed_from_u64(2024);

        let mut per_dance: BTreeMap<DanceId, Vec<i64>> = BTreeMap::new();
        while let Some(pick) = session.next(&mut rng, |_| true) {
            let record = db.song(pick.song)?.expect("selected song exists");
            assert_eq!(record.dance, pick.dance, "song belongs to the selected dance");
            per_dance.entry(pick.dance).or_default().push(pick.song.0);
            session.mark_played();
        }

        assert_eq!(session.committed(), 32);
        assert_eq!(per_dance.len(), 4, "every dance gets played");

        // Tango has four distinct tracks: the first lap never repeats.
        let tangos = &per_dance[&DanceId(TANGO)];
        let lap: HashSet<_> = tangos.iter().take(4).collect();
        assert_eq!(lap.len(), tangos.len().min(4));
        Ok(())
    }

    #[test]
    fn test_same_track_takes_are_not_back_to_back() -> Result<()> {
        let (_dir, db_path) = create_test_database()?;
        let db = MusicDb::open(&db_path)?;
        let dances = catalog();
        let tuning = TuningConfig::default();

        let songs = db.songs_for_dances(&[DanceId(WALTZ)], &[], tuning.song_tag_weight)?;
        let mut session = AutoSession::new([(DanceId(WALTZ), 6)], songs, &dances, &tuning).with_stop_after(5);
        let mut rng = StdRng::seed_from_u64(77);

        // One lap over five distinct tracks (two takes count as one).
        let mut groups = HashSet::new();
        while let Some(pick) = session.next(&mut rng, |_| true) {
            let record = db.song(pick.song)?.expect("song exists");
            let key = record.same_song.map_or(-record.id.0, |g| g.0 + 1000);
            assert!(groups.insert(key), "track {key} repeated within a lap");
        }
        assert_eq!(groups.len(), 5);
        Ok(())
    }

    #[test]
    fn test_session_opens_without_fast_dances() {
        let dances = catalog();
        let tuning = TuningConfig::default();
        let counts = [(DanceId(WALTZ), 3), (DanceId(TANGO), 3), (DanceId(QUICKSTEP), 3), (DanceId(JIVE), 3)];
        let songs = (1..=12)
            .map(|i| tanda::song::SongEntry::new(i, ((i - 1) / 3 + 1) as u32, tanda::song::AttrWeights::new(1.0, 1.0, 0.0)))
            .collect();

        let mut session = AutoSession::new(counts, songs, &dances, &tuning).with_stop_after(tuning.begin_count);
        let mut rng = StdRng::seed_from_u64(5);

        while let Some(pick) = session.next(&mut rng, |_| true) {
            let dance = dances.get(pick.dance).expect("catalog entry");
            assert!(!dance.is_fast(), "{} selected during the opening", dance.name);
        }
    }

    #[test]
    fn test_mix_database_songs() -> Result<()> {
        let (_dir, db_path) = create_test_database()?;
        let db = MusicDb::open(&db_path)?;
        let dances = catalog();
        let tuning = TuningConfig::default();
        let records = db.songs()?;
        let ids: Vec<DanceId> = db.dance_counts()?.keys().copied().collect();
        let entries = db.songs_for_dances(&ids, &[], tuning.song_tag_weight)?;
        let mut rng = StdRng::seed_from_u64(99);

        let mixed = session::mix(
            records.clone(),
            |r| entries.iter().find(|e| e.id == r.id).cloned().expect("entry for every song"),
            &dances,
            &tuning,
            &mut rng,
        );

        assert_eq!(mixed.len(), records.len());
        let before: HashSet<_> = records.iter().map(|r| r.id).collect();
        let after: HashSet<_> = mixed.iter().map(|r| r.id).collect();
        assert_eq!(before, after);

        // The second take of the shared track waits until every other waltz is placed.
        let waltzes: Vec<_> = mixed.iter().filter(|r| r.dance == DanceId(WALTZ)).collect();
        let takes: Vec<usize> = waltzes
            .iter()
            .enumerate()
            .filter(|(_, r)| r.same_song.is_some())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(takes.len(), 2);
        assert_eq!(takes[1], waltzes.len() - 1, "second take comes last");
        Ok(())
    }
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    fn tanda(dir: &TempDir) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_tanda"));
        cmd.env("TANDA_TUNING", dir.path().join("autoselection.json"))
            .env("TANDA_DB", dir.path().join("tanda.db"))
            .env("TANDA_DANCES", dir.path().join("dances.json"))
            .env_remove("RUST_LOG");
        cmd
    }

    #[test]
    fn test_cli_help_displays_correctly() {
        let dir = TempDir::new().expect("temp dir");
        let output = tanda(&dir).arg("--help").output().expect("Failed to run help command");

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(output.status.success());
        assert!(stdout.contains("simulate"));
        assert!(stdout.contains("mix"));
        assert!(stdout.contains("init-db"));
    }

    #[test]
    fn test_completion_generation() {
        let dir = TempDir::new().expect("temp dir");
        let output = tanda(&dir)
            .args(["completion", "bash"])
            .output()
            .expect("Failed to run completion command");

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("_tanda"));
        assert!(stdout.contains("complete"));
    }

    #[test]
    fn test_simulate_from_counts() {
        let dir = TempDir::new().expect("temp dir");
        let output = tanda(&dir)
            .args(["simulate", "--counts", "1=3,2=1", "-n", "8", "--seed", "3"])
            .output()
            .expect("Failed to run simulate");

        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert_eq!(stdout.lines().count(), 8);
        assert!(stdout.lines().all(|line| line.contains("#1") || line.contains("#2")));
    }

    #[test]
    fn test_simulate_without_songs_fails() {
        let dir = TempDir::new().expect("temp dir");
        assert!(tanda(&dir).arg("init-db").status().expect("init-db").success());

        let output = tanda(&dir).arg("simulate").output().expect("Failed to run simulate");
        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("--counts"));
    }

    #[test]
    fn test_config_init_writes_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let output = tanda(&dir)
            .args(["config", "--init"])
            .output()
            .expect("Failed to run config");

        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("begin_count"));

        let saved = TuningConfig::load(dir.path().join("autoselection.json")).expect("saved tuning");
        assert_eq!(saved, TuningConfig::default());
    }
}
