//! Catalog Import Tool
//!
//! Loads scraped JSON dumps into the SQLite catalog, exports the catalog back
//! to the static JSON files served by the fallback store, and checks a dump
//! against what is stored.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use mxcatalog_server::catalog_store::{CatalogStore, ItemType, SqliteCatalogStore};
use mxcatalog_server::ingestion::{
    export_catalog, import_dump, load_dump_file, verify_dump, ConversionOptions,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "catalog-import")]
#[command(about = "Move motocross catalog dumps in and out of the SQLite database")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a JSON dump into the database
    Import {
        #[arg(value_name = "DUMP")]
        dump: PathBuf,

        /// Path to the SQLite database file, created if missing
        #[arg(long)]
        db: PathBuf,

        /// Item type of the records. Guessed from the file name when omitted
        #[arg(long = "type", value_parser = parse_item_type)]
        item_type: Option<ItemType>,

        /// Also collect download links written in the descriptions
        #[arg(long, default_value_t = false)]
        scan_descriptions: bool,
    },
    /// Write mods.json and tracks.json from the database
    Export {
        #[arg(long)]
        db: PathBuf,

        #[arg(value_name = "OUT_DIR")]
        out_dir: PathBuf,
    },
    /// Check that every record of a dump is stored with the same links
    Verify {
        #[arg(value_name = "DUMP")]
        dump: PathBuf,

        #[arg(long)]
        db: PathBuf,

        #[arg(long = "type", value_parser = parse_item_type)]
        item_type: Option<ItemType>,

        #[arg(long, default_value_t = false)]
        scan_descriptions: bool,
    },
}

fn parse_item_type(s: &str) -> Result<ItemType> {
    s.parse()
}

/// `tracks.json`, `mxb_tracks_min.json` and friends are tracks, everything
/// else with "mod" in its name is a mod.
fn guess_item_type(path: &Path) -> Option<ItemType> {
    let name = path.file_name()?.to_str()?.to_lowercase();
    if name.contains("track") {
        Some(ItemType::Track)
    } else if name.contains("mod") {
        Some(ItemType::Mod)
    } else {
        None
    }
}

fn resolve_item_type(explicit: Option<ItemType>, dump: &Path) -> Result<ItemType> {
    match explicit.or_else(|| guess_item_type(dump)) {
        Some(item_type) => Ok(item_type),
        None => bail!(
            "Cannot tell whether {} holds mods or tracks, pass --type",
            dump.display()
        ),
    }
}

fn run_import(
    dump_path: &Path,
    db: &Path,
    item_type: ItemType,
    options: ConversionOptions,
) -> Result<()> {
    info!("Catalog Import Tool");
    info!("===================");
    info!("Dump: {}", dump_path.display());
    info!("Database: {}", db.display());
    info!("Item type: {}", item_type.to_db_str());

    let dump = load_dump_file(dump_path)?;
    let store = SqliteCatalogStore::new(db, 1)?;
    let stats = import_dump(&store, &dump, item_type, options)?;

    info!("");
    info!("Import Summary");
    info!("==============");
    info!("Items imported: {}", stats.imported);
    info!("Already stored: {}", stats.duplicates);
    if stats.rejected > 0 {
        warn!("Records rejected: {}", stats.rejected);
    }

    let counts = store.get_counts()?;
    info!("");
    info!("Database contains:");
    info!("  Mods: {}", counts.mods);
    info!("  Tracks: {}", counts.tracks);
    Ok(())
}

fn run_export(db: &Path, out_dir: &Path) -> Result<()> {
    if !db.exists() {
        bail!("Database does not exist: {}", db.display());
    }
    let store = SqliteCatalogStore::new(db, 1)?;
    let records = store.all_records()?;
    for path in export_catalog(&records, out_dir)? {
        info!("Wrote {}", path.display());
    }
    info!("Exported {} items", records.len());
    Ok(())
}

fn run_verify(
    dump_path: &Path,
    db: &Path,
    item_type: ItemType,
    options: ConversionOptions,
) -> Result<()> {
    if !db.exists() {
        bail!("Database does not exist: {}", db.display());
    }
    let dump = load_dump_file(dump_path)?;
    let store = SqliteCatalogStore::new(db, 1)?;
    let report = verify_dump(&store, &dump, item_type, options)?;

    info!("Verification Summary");
    info!("====================");
    info!("Records checked: {}", report.checked);
    for url in &report.missing {
        warn!("Missing: {}", url);
    }
    for url in &report.link_mismatches {
        warn!("Links differ: {}", url);
    }

    if !report.is_clean() {
        bail!(
            "{} missing and {} mismatched items",
            report.missing.len(),
            report.link_mismatches.len()
        );
    }
    info!("All records match");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Args::parse().command {
        Command::Import {
            dump,
            db,
            item_type,
            scan_descriptions,
        } => {
            let item_type = resolve_item_type(item_type, &dump)?;
            run_import(&dump, &db, item_type, ConversionOptions { scan_descriptions })
        }
        Command::Export { db, out_dir } => run_export(&db, &out_dir),
        Command::Verify {
            dump,
            db,
            item_type,
            scan_descriptions,
        } => {
            let item_type = resolve_item_type(item_type, &dump)?;
            run_verify(&dump, &db, item_type, ConversionOptions { scan_descriptions })
        }
    }
}
