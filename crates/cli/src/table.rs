//! Tabular outputs: one CSV row per search, parquet for trunk samples.
//!
//! CSV columns: `seed, n_point, F, bestcp, fallback`. `bestcp` holds the
//! point as a JSON list so a row stays one cell per field.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::path::Path;

use anyhow::{Context, Result};
use centerpoint::api::{SampleBucket, SearchResult};
use polars::prelude::*;

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    Ok(())
}

/// Append one result row, writing the header only for a new or empty file.
pub fn append_result_row(path: &Path, seed: u64, n_point: i64, res: &SearchResult) -> Result<()> {
    ensure_parent(path)?;
    let fresh = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let bestcp = serde_json::to_string(&res.point.iter().collect::<Vec<_>>())?;
    let mut df = df!(
        "seed" => [seed as i64],
        "n_point" => [n_point],
        "F" => [res.score],
        "bestcp" => [bestcp.as_str()],
        "fallback" => [res.fallback],
    )?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    CsvWriter::new(file)
        .include_header(fresh)
        .finish(&mut df)
        .with_context(|| format!("appending to {}", path.display()))?;
    Ok(())
}

/// Seeds already recorded for `n_point`; empty when the file does not exist.
pub fn recorded_seeds(path: &Path, n_point: i64) -> Result<BTreeSet<u64>> {
    if fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true) {
        return Ok(BTreeSet::new());
    }
    let df = LazyCsvReader::new(path)
        .with_infer_schema_length(Some(100))
        .finish()?
        .filter(col("n_point").eq(lit(n_point)))
        .select([col("seed")])
        .collect()
        .with_context(|| format!("reading {}", path.display()))?;
    let seeds = df.column("seed")?.i64()?;
    Ok(seeds.into_iter().flatten().map(|s| s as u64).collect())
}

/// Write bucket points as parquet, one column `p1..pd` per coordinate.
pub fn write_points_parquet(path: &Path, bucket: &SampleBucket) -> Result<()> {
    ensure_parent(path)?;
    let columns: Vec<Series> = (0..bucket.dim)
        .map(|j| {
            let name = format!("p{}", j + 1);
            let values: Vec<f64> = bucket.iter().map(|p| p[j]).collect();
            Series::new(name.as_str().into(), values)
        })
        .collect();
    let mut df = DataFrame::new(columns)?;
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    ParquetWriter::new(file)
        .finish(&mut df)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
