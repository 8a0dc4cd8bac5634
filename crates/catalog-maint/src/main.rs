//! catalog-maint: maintenance jobs for the media catalog store.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, brings its schema up to date, and runs one job.
//!
//! ```text
//! catalog-maint gc --retention-days 14
//! catalog-maint --json report-retired
//! catalog-maint retire-series 42
//! ```

mod config;

use std::path::PathBuf;

use anyhow::Context as _;
use catalog_core::{gc, media, reconcile::Verdict};
use catalog_store_sqlite::{SchemaReport, SqliteStore};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::MaintConfig;

#[derive(Parser)]
#[command(author, version, about = "Media catalog maintenance jobs")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print results as JSON instead of text.
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create missing tables, columns, and indexes.
  Migrate,

  /// Count active, retired, and expired rows per table.
  ReportRetired {
    #[arg(long)]
    retention_days: Option<u32>,
  },

  /// Hard-delete retired rows older than the retention window.
  Gc {
    /// Overrides `retention_days` from the configuration.
    #[arg(long)]
    retention_days: Option<u32>,
  },

  /// Retire a series and everything it owns.
  RetireSeries { id: i64 },

  /// Reconcile two episodes that share a TVDB id.
  ResolveDuplicates { a: i64, b: i64 },
}

fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let cfg = MaintConfig::load(&cli.config).context("failed to read configuration")?;
  let store_path = cfg.store_path();

  if let Some(parent) = store_path.parent() {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let schema = media::schema().context("invalid media schema")?;
  let migrated = store
    .ensure_schema(&schema)
    .context("failed to bring schema up to date")?;

  match cli.command {
    Command::Migrate => print_schema_report(&migrated, cli.json)?,

    Command::ReportRetired { retention_days } => {
      let days = retention_days.unwrap_or(cfg.retention_days);
      let counts = gc::retired_counts(&store, &schema, days, Utc::now());
      emit(&counts, cli.json, |counts| {
        for c in counts {
          println!(
            "{:<26} active {:>7}  retired {:>7}  expired {:>7}",
            c.table, c.active, c.retired, c.expired
          );
        }
      })?;
    }

    Command::Gc { retention_days } => {
      let days = retention_days.unwrap_or(cfg.retention_days);
      let report = gc::sweep(&store, &schema, days);
      emit(&report, cli.json, |r| {
        println!("cutoff {}; propagated {}", r.cutoff, r.propagated);
        for t in &r.tables {
          match &t.error {
            None => println!(
              "{:<26} deleted {:>7}  edges {:>5}  propagated {:>5}",
              t.table, t.deleted, t.edges_deleted, t.propagated
            ),
            Some(e) => println!("{:<26} FAILED: {e}", t.table),
          }
        }
        println!("total deleted {}", r.total_deleted());
      })?;
      if report.failures().next().is_some() {
        anyhow::bail!("garbage collection skipped one or more tables");
      }
    }

    Command::RetireSeries { id } => {
      let report = media::retire_series(&store, id)
        .with_context(|| format!("failed to retire series {id}"))?;
      emit(&report, cli.json, |r| {
        for step in &r.steps {
          match &step.error {
            None => println!("{:<9} {:<24} {:>5}", step.action, step.table, step.rows),
            Some(e) => println!("{:<9} {:<24} FAILED: {e}", step.action, step.table),
          }
        }
      })?;
      if !report.is_complete() {
        anyhow::bail!(
          "series {id} retired, but some cascade steps failed; re-run to finish"
        );
      }
    }

    Command::ResolveDuplicates { a, b } => {
      let resolution = media::resolve_duplicate_episodes(&store, a, b)
        .with_context(|| format!("failed to reconcile episodes {a} and {b}"))?;
      emit(&resolution, cli.json, |r| match r.verdict {
        Verdict::KeysDiffer => {
          println!("episodes {a} and {b} differ in season/episode; nothing changed")
        }
        Verdict::Survivor { winner, loser, reason } => println!(
          "kept {winner}, retired {loser} ({reason}); {} dependent rows cascaded",
          r.cascaded
        ),
      })?;
    }
  }

  Ok(())
}

/// Print `value` as JSON, or through `text` for humans.
fn emit<T: Serialize>(
  value: &T,
  json: bool,
  text: impl FnOnce(&T),
) -> anyhow::Result<()> {
  if json {
    println!(
      "{}",
      serde_json::to_string_pretty(value).context("failed to serialise report")?
    );
  } else {
    text(value);
  }
  Ok(())
}

fn print_schema_report(report: &SchemaReport, json: bool) -> anyhow::Result<()> {
  #[derive(Serialize)]
  struct Migration<'a> {
    created: &'a [&'static str],
    added:   Vec<String>,
  }

  let added = report
    .added
    .iter()
    .map(|(table, column)| format!("{table}.{column}"))
    .collect();
  emit(&Migration { created: &report.created, added }, json, |m| {
    if m.created.is_empty() && m.added.is_empty() {
      println!("schema up to date");
    }
    for table in m.created {
      println!("created {table}");
    }
    for column in &m.added {
      println!("added   {column}");
    }
  })
}
