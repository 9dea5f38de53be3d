use anyhow::{bail, Context, Result};
use centerpoint::api::{
    estimate_volumes, fill_samples, search_centerpoint, BatchPolicy, FiberSet, FillCfg, SearchCfg,
    SearchResult, VolumeCfg,
};
use centerpoint::sampling::master_rng;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::fmt::SubscriberBuilder;

mod provenance;
mod source;
mod table;

use provenance::{write_sidecar, Provenance};
use source::PolytopeSource;

#[derive(Parser)]
#[command(name = "cli")]
#[command(about = "Centerpoint experiments on fibered polytopes")]
struct Cmd {
    /// Log at debug level
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// One centerpoint search; optionally append a CSV row and archive low-F hulls
    Search {
        #[command(flatten)]
        run: RunArgs,
        #[arg(long)]
        seed: Option<u64>,
        /// Full result as JSON, with a provenance sidecar
        #[arg(long)]
        result_json: Option<PathBuf>,
    },
    /// Searches for seeds start..start+count, skipping seeds already in --out
    Sweep {
        #[command(flatten)]
        run: RunArgs,
        #[arg(long, default_value_t = 1)]
        start: u64,
        #[arg(long, default_value_t = 10)]
        count: u64,
    },
    /// Per-fiber volume estimates as JSON
    Volume {
        #[command(flatten)]
        poly: PolyArgs,
        #[arg(long, default_value_t = 80_000)]
        draws: usize,
        #[command(flatten)]
        batch: BatchArgs,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Parallel rejection sampling of one fiber; prints stats JSON
    Fill {
        #[command(flatten)]
        poly: PolyArgs,
        #[arg(long, default_value_t = 0)]
        fiber: i64,
        #[arg(long, default_value_t = 10_000)]
        target: usize,
        #[arg(long, default_value_t = 50_000)]
        chunk_size: usize,
        #[arg(long)]
        workers: Option<usize>,
        #[arg(long)]
        max_draws: Option<u64>,
        #[arg(long)]
        seed: Option<u64>,
        /// Accepted points as parquet (stats go to a provenance sidecar)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print a small provenance JSON block
    Report,
}

#[derive(Args, Clone, Debug)]
struct PolyArgs {
    /// `cube`, `prism`, or an H-rep JSON file
    #[arg(long, default_value = "cube")]
    polytope: PolytopeSource,
    #[arg(long, default_value_t = 2)]
    d: usize,
    #[arg(long, value_delimiter = ',', default_value = "0,1", allow_negative_numbers = true)]
    fibers: Vec<i64>,
}

#[derive(Args, Clone, Debug)]
struct BatchArgs {
    /// Fixed batch size; default plans from --target-mb
    #[arg(long)]
    batch: Option<usize>,
    #[arg(long, default_value_t = 64.0)]
    target_mb: f64,
}

impl BatchArgs {
    fn policy(&self) -> BatchPolicy {
        match self.batch {
            Some(n) => BatchPolicy::Fixed(n),
            None => BatchPolicy::Auto {
                target_mb: self.target_mb,
            },
        }
    }
}

#[derive(Args, Clone, Debug)]
struct RunArgs {
    #[command(flatten)]
    poly: PolyArgs,
    #[arg(long, default_value_t = 50)]
    n_cp: usize,
    #[arg(long, default_value_t = 1000)]
    n_hip: usize,
    #[arg(long, default_value_t = 80_000)]
    draws: usize,
    #[command(flatten)]
    batch: BatchArgs,
    #[arg(long, default_value_t = 20)]
    max_trials_per_cp: usize,
    #[arg(long, default_value_t = 1000)]
    fallback_draws: usize,
    #[arg(long, default_value_t = 1e-9)]
    tol: f64,
    /// Label of the hull family (e.g. vertices per fiber), recorded per row
    #[arg(long, default_value_t = 0)]
    n_point: i64,
    /// CSV to append one row per search
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long)]
    save_hull_dir: Option<PathBuf>,
    /// Archive the polytope when F falls below this
    #[arg(long, default_value_t = 0.18)]
    f_threshold: f64,
}

impl RunArgs {
    fn search_cfg(&self) -> SearchCfg {
        SearchCfg {
            fibers: FiberSet::new(self.poly.fibers.iter().copied()),
            n_candidates: self.n_cp,
            n_directions: self.n_hip,
            draws: self.draws,
            tol: self.tol,
            batch: self.batch.policy(),
            max_trials_per_cp: self.max_trials_per_cp,
            fallback_draws: self.fallback_draws,
        }
    }
}

fn main() -> Result<()> {
    let cmd = Cmd::parse();
    let level = if cmd.verbose { Level::DEBUG } else { Level::INFO };
    SubscriberBuilder::default()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    match cmd.action {
        Action::Search {
            run,
            seed,
            result_json,
        } => search(&run, seed, result_json.as_deref()).map(|_| ()),
        Action::Sweep { run, start, count } => sweep(&run, start, count),
        Action::Volume {
            poly,
            draws,
            batch,
            seed,
        } => volume(&poly, draws, &batch, seed),
        Action::Fill {
            poly,
            fiber,
            target,
            chunk_size,
            workers,
            max_draws,
            seed,
            out,
        } => {
            let cfg = FillCfg {
                target,
                chunk_size,
                max_workers: workers,
                max_draws,
                ..FillCfg::default()
            };
            fill(&poly, fiber, &cfg, seed, out.as_deref())
        }
        Action::Report => report(),
    }
}

fn search(run: &RunArgs, seed: Option<u64>, result_json: Option<&Path>) -> Result<SearchResult> {
    // CSV rows are keyed by seed; `sweep` skips seeds already recorded.
    if run.out.is_some() && seed.is_none() {
        bail!("--out records rows by seed; pass --seed");
    }
    let cfg = run.search_cfg();
    let poly = run.poly.polytope.load(run.poly.d, &cfg.fibers)?;
    tracing::info!(
        polytope = %run.poly.polytope.label(),
        d = run.poly.d,
        seed = ?seed,
        n_cp = cfg.n_candidates,
        n_hip = cfg.n_directions,
        draws = cfg.draws,
        "search"
    );
    let res = search_centerpoint(&poly, run.poly.d, &cfg, seed)
        .with_context(|| format!("search failed for seed {seed:?}"))?;
    println!(
        "Seed {}: BestCP = {:?}, F ~= {}{}",
        seed.map_or("-".to_string(), |s| s.to_string()),
        res.point.as_slice(),
        res.score,
        if res.fallback { " (fallback)" } else { "" }
    );

    if let (Some(dir), Some(seed)) = (&run.save_hull_dir, seed) {
        if res.score < run.f_threshold {
            let path = dir.join(format!("hull_seed_{seed}_npoint_{}.json", run.n_point));
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
            // `{"a", "b"}` at top level so `--polytope <file>` reloads it.
            let mut doc = serde_json::to_value(&poly)?;
            doc["seed"] = json!(seed);
            doc["n_point"] = json!(run.n_point);
            doc["F"] = json!(res.score);
            fs::write(&path, serde_json::to_vec_pretty(&doc)?)
                .with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), f = res.score, "hull_saved");
        }
    }
    if let (Some(out), Some(seed)) = (&run.out, seed) {
        table::append_result_row(out, seed, run.n_point, &res)?;
    }
    if let Some(path) = result_json {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(&res)?)
            .with_context(|| format!("writing {}", path.display()))?;
        let params = json!({
            "polytope": run.poly.polytope.label(),
            "d": run.poly.d,
            "n_point": run.n_point,
            "cfg": cfg,
        });
        write_sidecar(path, Provenance::new("search", seed, params))?;
    }
    Ok(res)
}

fn sweep(run: &RunArgs, start: u64, count: u64) -> Result<()> {
    let recorded = match &run.out {
        Some(out) => table::recorded_seeds(out, run.n_point)?,
        None => Default::default(),
    };
    let seeds: Vec<u64> = (start..start.saturating_add(count))
        .filter(|s| !recorded.contains(s))
        .collect();
    tracing::info!(
        jobs = seeds.len(),
        skipped = count as usize - seeds.len(),
        "sweep"
    );
    let (mut ok, mut err) = (0usize, 0usize);
    for (i, &seed) in seeds.iter().enumerate() {
        match search(run, Some(seed), None) {
            Ok(_) => ok += 1,
            Err(e) => {
                err += 1;
                tracing::error!(seed, n_point = run.n_point, error = %format!("{e:#}"), "sweep_seed_failed");
            }
        }
        if (i + 1) % 20 == 0 {
            tracing::info!(done = i + 1, total = seeds.len(), "sweep_progress");
        }
    }
    println!("=== DONE: OK={ok} ERR={err} ===");
    Ok(())
}

fn volume(poly: &PolyArgs, draws: usize, batch: &BatchArgs, seed: Option<u64>) -> Result<()> {
    let fibers = FiberSet::new(poly.fibers.iter().copied());
    let p = poly.polytope.load(poly.d, &fibers)?;
    let cfg = VolumeCfg {
        draws,
        batch: batch.policy(),
        ..VolumeCfg::default()
    };
    let vols = estimate_volumes(&p, poly.d, &fibers, &cfg, &mut master_rng(seed))?;
    let obj = json!({
        "per_fiber": vols,
        "total": vols.total(),
        "draws": draws,
        "seed": seed,
    });
    println!("{}", serde_json::to_string_pretty(&obj)?);
    Ok(())
}

fn fill(poly: &PolyArgs, fiber: i64, cfg: &FillCfg, seed: Option<u64>, out: Option<&Path>) -> Result<()> {
    let p = poly
        .polytope
        .load(poly.d, &FiberSet::new(poly.fibers.iter().copied()))?;
    let (bucket, stats) = fill_samples(&p, poly.d, fiber, cfg, seed)?;
    if stats.failed_tasks > 0 {
        tracing::warn!(failed = stats.failed_tasks, draws = stats.failed_draws, "fill_degraded");
    }
    if let Some(out) = out {
        table::write_points_parquet(out, &bucket)?;
        let params = json!({
            "polytope": poly.polytope.label(),
            "d": poly.d,
            "fiber": fiber,
            "cfg": cfg,
            "stats": stats,
        });
        write_sidecar(out, Provenance::new("fill", seed, params))?;
    }
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn report() -> Result<()> {
    let obj = Provenance::new("report", None, json!({}));
    println!("{}", serde_json::to_string_pretty(&obj)?);
    Ok(())
}
