//! # Command-Line Interface Module
//!
//! Clap derive definitions for the `tanda` binary.
//!
//! ## Commands
//!
//! - `simulate`: run an automatic playlist session and print the picks
//! - `mix`: reorder a list of songs by dance
//! - `init-db`: create the song database with default ratings and levels
//! - `config`: show or create the tuning file
//! - `completion`: generate shell completions
//!
//! ## Examples
//!
//! ```bash
//! tanda init-db
//! tanda simulate --counts waltz=6,tango=3,foxtrot=1 -n 30 --seed 7
//! tanda mix 12 4 9 31 7
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "tanda")]
#[command(about = "Tanda: automatic dance & song selection for unattended DJ playback")]
#[command(version)]
pub struct Args {
    /// Tuning file (defaults to the platform config directory)
    #[arg(long, global = true, env = "TANDA_TUNING")]
    pub tuning: Option<PathBuf>,

    /// Song database
    #[arg(long, global = true, env = "TANDA_DB")]
    pub db: Option<PathBuf>,

    /// Dance catalog (JSON array of dances)
    #[arg(long, global = true, env = "TANDA_DANCES")]
    pub dances: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run an automatic playlist session and print each selection
    ///
    /// Target counts default to the number of songs per dance in the
    /// database. Without a database, `--counts` is required and every
    /// count unit becomes one synthetic song.
    Simulate {
        /// Target counts as `dance=count` pairs (dance name or id)
        #[arg(long, value_delimiter = ',')]
        counts: Vec<String>,

        /// Number of selections to make
        #[arg(short = 'n', long, default_value = "20")]
        count: usize,

        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        /// Session tags; matching songs get the tag weight
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Print the final distribution per dance
        #[arg(short, long)]
        summary: bool,
    },

    /// Reorder songs so their dances are spaced out
    Mix {
        /// Song ids, in their current order
        #[arg(required = true)]
        songs: Vec<i64>,

        /// Seed for a reproducible mix
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Create the song database schema with default ratings and levels
    InitDb {
        /// Delete an existing database first
        #[arg(long)]
        force: bool,
    },

    /// Show the effective tuning configuration
    Config {
        /// Write the defaults to the tuning file if it does not exist
        #[arg(long)]
        init: bool,
    },

    /// Generate shell completions
    ///
    /// Usage: tanda completion bash > ~/.local/share/bash-completion/completions/tanda
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Parse a `dance=count` argument.
pub fn parse_count(raw: &str) -> anyhow::Result<(String, u32)> {
    let (dance, count) = raw
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Expected `dance=count`, got `{raw}`"))?;
    let count = count
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid count in `{raw}`: {e}"))?;
    Ok((dance.trim().to_string(), count))
}
