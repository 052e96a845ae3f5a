//! # Tanda - Automatic Dance Selection
//!
//! Command-line front end for the selection engine.
//!
//! ## Usage
//!
//! ```bash
//! # Create the song database
//! tanda init-db
//!
//! # Run a 30 selection session from the database
//! tanda simulate -n 30 --summary
//!
//! # Without a database, from target counts alone
//! tanda simulate --counts waltz=6,tango=3,foxtrot=1
//!
//! # Reorder songs
//! tanda mix 12 4 9 31 7
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tanda::cli::{self, Args, Command};
use tanda::config::{self, TuningConfig};
use tanda::dance::{DanceCatalog, DanceId, Dances};
use tanda::db::MusicDb;
use tanda::session::{self, AutoSession};
use tanda::song::{AttrWeights, SongEntry, SongId};
use tanda::completion;

/// Main entry point.
///
/// # Logging
///
/// Initializes environment logger which can be controlled via `RUST_LOG`:
/// - `RUST_LOG=debug tanda simulate` - Enable debug logging
/// - `RUST_LOG=tanda::dance_selector=trace tanda simulate` - Per-dance weights
fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    match &args.command {
        Command::Simulate {
            counts,
            count,
            seed,
            tags,
            summary,
        } => simulate(&args, counts, *count, *seed, tags, *summary)?,
        Command::Mix { songs, seed } => mix(&args, songs, *seed)?,
        Command::InitDb { force } => {
            let path = db_path(&args)?;
            if *force && path.exists() {
                info!("Removing existing database {}", path.display());
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
            MusicDb::open(&path)?.init_defaults()?;
            println!("Initialized {}", path.display());
        }
        Command::Config { init } => {
            let path = tuning_path(&args)?;
            if *init && !path.exists() {
                TuningConfig::default().save(&path)?;
                println!("Wrote {}", path.display());
            }
            let tuning = TuningConfig::load_or_default(&path)?;
            println!("# {}", path.display());
            println!("{}", tuning.to_json()?);
        }
        Command::Completion { shell } => {
            let mut cmd = Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(shell), &mut cmd);
        }
    }

    Ok(())
}

fn tuning_path(args: &Args) -> Result<PathBuf> {
    args.tuning.clone().map_or_else(config::get_tuning_path, Ok)
}

fn db_path(args: &Args) -> Result<PathBuf> {
    args.db.clone().map_or_else(config::get_db_path, Ok)
}

fn load_tuning(args: &Args) -> Result<TuningConfig> {
    TuningConfig::load_or_default(tuning_path(args)?)
}

fn load_dances(args: &Args) -> Result<Dances> {
    let path = args.dances.clone().map_or_else(config::get_dances_path, Ok)?;
    if path.exists() {
        Dances::load(&path)
    } else {
        warn!("No dance catalog at {}; speed, type and tag rules are off", path.display());
        Ok(Dances::default())
    }
}

/// Open the song database only if it exists.
fn open_existing_db(path: &Path) -> Result<Option<MusicDb>> {
    if path.exists() {
        Ok(Some(MusicDb::open(path)?))
    } else {
        debug!("No song database at {}", path.display());
        Ok(None)
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}

/// Resolve `dance=count` arguments against the catalog (by name or id).
fn resolve_counts(raw: &[String], dances: &Dances) -> Result<BTreeMap<DanceId, u32>> {
    let mut counts = BTreeMap::new();
    for item in raw {
        let (name, count) = cli::parse_count(item)?;
        let id = match dances.by_name(&name) {
            Some(dance) => dance.id,
            None => DanceId(
                name.parse()
                    .with_context(|| format!("Unknown dance `{name}`"))?,
            ),
        };
        counts.insert(id, count);
    }
    Ok(counts)
}

fn simulate(args: &Args, raw_counts: &[String], count: usize, seed: Option<u64>, tags: &[String], summary: bool) -> Result<()> {
    let tuning = load_tuning(args)?;
    let dances = load_dances(args)?;
    let db = open_existing_db(&db_path(args)?)?;

    let counts = if raw_counts.is_empty() {
        db.as_ref()
            .map(MusicDb::dance_counts)
            .transpose()?
            .filter(|counts| !counts.is_empty())
            .context("No songs in the database; pass --counts")?
    } else {
        resolve_counts(raw_counts, &dances)?
    };

    let dance_ids: Vec<DanceId> = counts.keys().copied().collect();
    let songs = match &db {
        Some(db) => db.songs_for_dances(&dance_ids, tags, tuning.song_tag_weight)?,
        None => synthetic_songs(&counts),
    };
    info!("Simulating {count} selections over {} dances, {} songs", counts.len(), songs.len());

    let mut rng = make_rng(seed);
    let mut session = AutoSession::new(counts.clone(), songs, &dances, &tuning).with_stop_after(count);
    let mut tally: BTreeMap<DanceId, usize> = BTreeMap::new();

    let mut n = 0;
    while let Some(pick) = session.next(&mut rng, |_| true) {
        n += 1;
        *tally.entry(pick.dance).or_default() += 1;

        let title = match &db {
            Some(db) => db.song(pick.song)?.map(|s| s.title).unwrap_or_default(),
            None => String::new(),
        };
        println!("{n:>4}. {:<16} {:>6}  {title}", dances.name(pick.dance), pick.song);

        // Keep history short, as a player would.
        if session.queued().len() > 1 {
            session.mark_played();
        }
    }

    if n < count {
        warn!("Session ended after {n} of {count} selections");
    }

    if summary {
        let target_total: u32 = counts.values().sum();
        println!();
        println!("{:<16} {:>8} {:>8}", "dance", "target", "actual");
        for (id, target) in &counts {
            let actual = tally.get(id).copied().unwrap_or(0) as f64 / n.max(1) as f64;
            let target = f64::from(*target) / f64::from(target_total.max(1));
            println!("{:<16} {:>7.1}% {:>7.1}%", dances.name(*id), target * 100.0, actual * 100.0);
        }
    }

    Ok(())
}

/// One unweighted song per count unit, for runs without a database.
fn synthetic_songs(counts: &BTreeMap<DanceId, u32>) -> Vec<SongEntry> {
    let mut next_id = 1;
    let mut songs = Vec::new();
    for (&dance, &count) in counts {
        for _ in 0..count {
            songs.push(SongEntry::new(next_id, dance, AttrWeights::new(1.0, 1.0, 0.0)));
            next_id += 1;
        }
    }
    songs
}

fn mix(args: &Args, song_ids: &[i64], seed: Option<u64>) -> Result<()> {
    let tuning = load_tuning(args)?;
    let dances = load_dances(args)?;
    let path = db_path(args)?;
    let db = open_existing_db(&path)?
        .with_context(|| format!("No song database at {}", path.display()))?;

    let mut records = Vec::with_capacity(song_ids.len());
    for &id in song_ids {
        let record = db
            .song(SongId(id))?
            .with_context(|| format!("Song {id} not found"))?;
        records.push(record);
    }

    // Selector weights for the songs being mixed.
    let mut dance_ids: Vec<DanceId> = records.iter().map(|r| r.dance).collect();
    dance_ids.sort_unstable();
    dance_ids.dedup();
    let entries: HashMap<SongId, SongEntry> = db
        .songs_for_dances(&dance_ids, &[], tuning.song_tag_weight)?
        .into_iter()
        .map(|entry| (entry.id, entry))
        .collect();

    let mut rng = make_rng(seed);
    let mixed = session::mix(
        records,
        |record| {
            entries
                .get(&record.id)
                .cloned()
                .unwrap_or_else(|| SongEntry::new(record.id.0, record.dance, AttrWeights::default()))
        },
        &dances,
        &tuning,
        &mut rng,
    );
    for record in mixed {
        println!("{:>6}  {:<16} {}", record.id, dances.name(record.dance), record.title);
    }
    Ok(())
}
