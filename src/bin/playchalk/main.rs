//! CLI tool for play files and on-disk play libraries.
//!
//! Usage:
//!   playchalk validate play.json
//!   playchalk migrate old.json [--output new.json]
//!   playchalk info play.json
//!   playchalk sample --preset horns --output horns.json
//!   playchalk library --dir ./plays list

mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use playchalk::library::migration::{migrate, record_version, CURRENT_SCHEMA_VERSION};
use playchalk::play::formation::presets;
use playchalk::{DirStore, PlayEngine, PlayFile, PlayLibrary};

#[derive(Parser, Debug)]
#[command(
    name = "playchalk",
    about = "Inspect, upgrade and manage basketball play files",
    version
)]
struct Args {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that a play file imports cleanly
    Validate {
        file: PathBuf,
    },

    /// Upgrade a play file to the current schema version
    Migrate {
        input: PathBuf,

        /// Output path (defaults to overwriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print frame and token statistics
    Info {
        file: PathBuf,
    },

    /// Generate a demo play from a formation preset
    Sample {
        /// Formation preset id
        #[arg(short, long, default_value = "5-out")]
        preset: String,

        /// Number of frames to generate
        #[arg(short, long, default_value_t = 4)]
        frames: usize,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Manage a directory of saved plays
    Library {
        /// Library root directory
        #[arg(short, long, env = "PLAYCHALK_LIBRARY")]
        dir: PathBuf,

        #[command(subcommand)]
        action: LibraryAction,
    },
}

#[derive(Subcommand, Debug)]
enum LibraryAction {
    /// List saved plays, newest first
    List {
        /// Only plays in this category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Import a play file as a new saved play
    Import {
        file: PathBuf,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        tags: Vec<String>,
    },
    /// Export a saved play to a play file
    Export {
        id: String,
        output: PathBuf,
    },
    /// Delete a saved play
    Delete {
        id: String,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn read_file(path: &Path) -> Result<String> {
    if !path.exists() {
        anyhow::bail!("Input file does not exist: {}", path.display());
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn load_play_file(path: &Path) -> Result<PlayFile> {
    let json = read_file(path)?;
    PlayFile::parse(&json).with_context(|| format!("{} is not a valid play file", path.display()))
}

fn write_play_file(path: &Path, file: &PlayFile) -> Result<()> {
    let json = file.to_json_pretty().context("Failed to serialize play")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Validate { file } => {
            let play = load_play_file(&file)?;
            println!(
                "✓ {} is valid ({} frames, schema v{})",
                file.display(),
                play.frames.len(),
                play.version
            );
        }

        Command::Migrate { input, output } => {
            let raw = read_file(&input)?;
            let value: serde_json::Value =
                serde_json::from_str(&raw).context("Failed to parse JSON")?;
            let from = record_version(&value).context("Unreadable schema version")?;
            let upgraded = migrate(value).context("Migration failed")?;

            // Round-trip through the typed format so the output is known-good.
            let file = PlayFile::parse(&upgraded.to_string()).context("Migrated file is invalid")?;
            let output = output.unwrap_or_else(|| input.clone());
            write_play_file(&output, &file)?;
            println!(
                "Migrated {} (v{} → v{}) → {}",
                input.display(),
                from,
                CURRENT_SCHEMA_VERSION,
                output.display()
            );
        }

        Command::Info { file } => {
            let play = load_play_file(&file)?;
            report::print_play_info(&play);
        }

        Command::Sample {
            preset,
            frames,
            output,
        } => {
            if playchalk::play::find_preset(&preset).is_none() {
                let known: Vec<&str> = presets().iter().map(|p| p.id).collect();
                anyhow::bail!("Unknown preset '{}' (known: {})", preset, known.join(", "));
            }
            let engine = build_sample(&preset, frames)?;
            write_play_file(&output, &engine.export_play())?;
            println!("Wrote {}-frame sample play to {}", engine.frame_count(), output.display());
        }

        Command::Library { dir, action } => {
            let store = DirStore::open(&dir)
                .with_context(|| format!("Failed to open library at {}", dir.display()))?;
            let mut library = PlayLibrary::new(store);
            run_library(&mut library, action)?;
        }
    }

    Ok(())
}

const BASKET: (f64, f64) = (400.0, 520.0);
const SAMPLE_DRIFT: f64 = 0.2;

/// Builds a play where every token drifts toward the basket frame by frame.
fn build_sample(preset: &str, frames: usize) -> Result<PlayEngine> {
    let mut engine = PlayEngine::new();
    engine.set_play_name(format!("Sample: {preset}"));
    let ids = engine.apply_formation_preset(preset)?;

    for _ in 1..frames.max(1) {
        engine.add_frame();
        let index = engine.current_frame_index();
        for id in &ids {
            let Some(object) = engine.current_frame().object(id) else {
                continue;
            };
            let (x, y) = (object.x, object.y);
            engine.move_object(
                index,
                id,
                x + (BASKET.0 - x) * SAMPLE_DRIFT,
                y + (BASKET.1 - y) * SAMPLE_DRIFT,
            )?;
        }
    }
    engine.set_current_frame(0)?;
    Ok(engine)
}

fn run_library(library: &mut PlayLibrary<DirStore>, action: LibraryAction) -> Result<()> {
    match action {
        LibraryAction::List { category } => {
            let plays = match category {
                Some(c) => library.plays_in_category(&c)?,
                None => library.list_plays()?,
            };
            report::print_library(&plays);
        }

        LibraryAction::Import {
            file,
            category,
            tags,
        } => {
            let json = read_file(&file)?;
            let mut engine = PlayEngine::new();
            engine
                .import_play(&json)
                .with_context(|| format!("{} is not a valid play file", file.display()))?;
            if let Some(category) = category {
                engine.set_play_category(category);
            }
            engine.set_play_tags(tags);
            let saved = engine.save_play(library)?;
            println!("Imported '{}' as {}", saved.name, saved.id);
        }

        LibraryAction::Export { id, output } => {
            let mut engine = PlayEngine::new();
            engine.load_play(library, &id)?;
            write_play_file(&output, &engine.export_play())?;
            println!("Exported '{}' → {}", engine.name(), output.display());
        }

        LibraryAction::Delete { id } => {
            if library.delete_play(&id)? {
                println!("Deleted {}", id);
            } else {
                anyhow::bail!("No saved play with id {}", id);
            }
        }
    }
    Ok(())
}
