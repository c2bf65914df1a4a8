//! CSV rendering and all-or-nothing output.
//!
//! Files are rendered in memory, staged next to their final path with a
//! `.tmp` suffix, and only renamed into place once every file of the run
//! has been staged. Replaced outputs are kept as `.bak` until the whole
//! set is in place.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use screener_core::{AggregateRecord, ScoredHeadline};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const BUCKET_HEADERS: &[&str] = &["symbol", "score"];
pub const SNAPSHOT_HEADERS: &[&str] = &["symbol", "headline", "source", "score"];
pub const MOMENTUM_HEADERS: &[&str] = &["symbol", "momentum_pct", "news_score"];
pub const FINBRAIN_HEADERS: &[&str] = &["symbol", "prediction_diff_pct", "NewsScore"];

/// A rendered file waiting to be written
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFile {
    pub file_name: String,
    pub contents: Vec<u8>,
}

#[derive(Serialize)]
struct BucketRow<'a> {
    symbol: &'a str,
    score: f64,
}

#[derive(Serialize)]
struct SnapshotRow<'a> {
    symbol: &'a str,
    headline: &'a str,
    source: &'a str,
    score: f64,
}

#[derive(Serialize)]
struct MomentumRow<'a> {
    symbol: &'a str,
    momentum_pct: Option<f64>,
    news_score: f64,
}

#[derive(Serialize)]
struct FinBrainRow<'a> {
    symbol: &'a str,
    prediction_diff_pct: Option<f64>,
    #[serde(rename = "NewsScore")]
    news_score: f64,
}

/// `<bucket>_<YYYY-MM-DD>.csv`
pub fn dated_file_name(bucket: &str, date: NaiveDate) -> String {
    format!("{}_{}.csv", bucket, date.format("%Y-%m-%d"))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Header row first, always, so empty tables still carry their columns.
fn render<R: Serialize>(headers: &[&str], rows: impl IntoIterator<Item = R>) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(headers)?;
    for row in rows {
        writer.serialize(row)?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV buffer: {}", e))
}

pub fn render_bucket(file_name: String, records: &[AggregateRecord]) -> Result<OutputFile> {
    let contents = render(
        BUCKET_HEADERS,
        records.iter().map(|r| BucketRow {
            symbol: r.symbol.as_str(),
            score: r.mean_score,
        }),
    )?;
    Ok(OutputFile { file_name, contents })
}

pub fn render_snapshot(file_name: String, scored: &[ScoredHeadline]) -> Result<OutputFile> {
    let contents = render(
        SNAPSHOT_HEADERS,
        scored.iter().map(|s| SnapshotRow {
            symbol: s.record.symbol.as_str(),
            headline: &s.record.text,
            source: s.record.source.name(),
            score: s.score,
        }),
    )?;
    Ok(OutputFile { file_name, contents })
}

pub fn render_momentum(file_name: String, records: &[AggregateRecord]) -> Result<OutputFile> {
    let contents = render(
        MOMENTUM_HEADERS,
        records.iter().map(|r| MomentumRow {
            symbol: r.symbol.as_str(),
            momentum_pct: r.metric,
            news_score: round2(r.mean_score),
        }),
    )?;
    Ok(OutputFile { file_name, contents })
}

pub fn render_finbrain(file_name: String, records: &[AggregateRecord]) -> Result<OutputFile> {
    let contents = render(
        FINBRAIN_HEADERS,
        records.iter().map(|r| FinBrainRow {
            symbol: r.symbol.as_str(),
            prediction_diff_pct: r.metric,
            news_score: r.mean_score,
        }),
    )?;
    Ok(OutputFile { file_name, contents })
}

fn staged_path(dir: &Path, file_name: &str) -> PathBuf {
    dir.join(format!("{}.tmp", file_name))
}

fn backup_path(dir: &Path, file_name: &str) -> PathBuf {
    dir.join(format!("{}.bak", file_name))
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove {}: {}", path.display(), e);
        }
    }
}

/// A target that was replaced, with the previous file moved aside if there was one
struct Swapped {
    target: PathBuf,
    backup: Option<PathBuf>,
}

/// Move the previous output aside, then move the staged file into place.
fn swap_in(dir: &Path, file_name: &str, staged: &Path) -> Result<Swapped> {
    let target = dir.join(file_name);
    let backup = if target.exists() {
        let backup = backup_path(dir, file_name);
        fs::rename(&target, &backup)
            .with_context(|| format!("Failed to move aside {}", target.display()))?;
        Some(backup)
    } else {
        None
    };

    if let Err(e) = fs::rename(staged, &target) {
        if let Some(backup) = &backup {
            if let Err(restore) = fs::rename(backup, &target) {
                warn!("Could not restore {}: {}", target.display(), restore);
            }
        }
        return Err(e).with_context(|| format!("Failed to move {} into place", target.display()));
    }

    Ok(Swapped { target, backup })
}

/// Undo completed swaps, newest first.
fn roll_back(swapped: &[Swapped]) {
    for swap in swapped.iter().rev() {
        match &swap.backup {
            Some(backup) => {
                if let Err(e) = fs::rename(backup, &swap.target) {
                    warn!("Could not restore {}: {}", swap.target.display(), e);
                }
            }
            None => remove_quietly(&swap.target),
        }
    }
}

/// Write every file or none of them.
///
/// Files are staged first, then swapped in with the previous outputs kept
/// aside. Any failure removes the staged files and restores the previous
/// outputs.
pub fn commit_outputs(dir: &Path, files: Vec<OutputFile>) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    for file in &files {
        let target = dir.join(&file.file_name);
        if target.is_dir() {
            bail!("Output path {} is a directory", target.display());
        }
    }

    let mut staged = Vec::with_capacity(files.len());
    for file in &files {
        let tmp = staged_path(dir, &file.file_name);
        if let Err(e) = fs::write(&tmp, &file.contents) {
            for path in staged.iter().chain(std::iter::once(&tmp)) {
                remove_quietly(path);
            }
            return Err(e).with_context(|| format!("Failed to stage {}", tmp.display()));
        }
        staged.push(tmp);
    }

    let mut swapped = Vec::with_capacity(files.len());
    for (i, file) in files.iter().enumerate() {
        match swap_in(dir, &file.file_name, &staged[i]) {
            Ok(swap) => swapped.push(swap),
            Err(e) => {
                roll_back(&swapped);
                for tmp in &staged[i..] {
                    remove_quietly(tmp);
                }
                return Err(e);
            }
        }
    }

    for swap in &swapped {
        if let Some(backup) = &swap.backup {
            remove_quietly(backup);
        }
    }

    Ok(swapped.into_iter().map(|swap| swap.target).collect())
}
