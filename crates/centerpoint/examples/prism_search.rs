//! Timing probe: one centerpoint search on the triangle prism.
//!
//! Purpose
//! - A reproducible data point for "how long does one search with default
//!   direction and draw counts take, and what score does it reach?"
//! - The prism slice is the triangle `(0,0), (0,1), (1/2,1)`; its centroid is
//!   `(1/6, 2/3)`, so the printed best point should land nearby.

use std::time::Instant;

use centerpoint::api::{search_centerpoint, triangle_prism, SearchCfg};

fn main() {
    let poly = triangle_prism();
    let cfg = SearchCfg {
        n_candidates: 20,
        n_directions: 200,
        draws: 20_000,
        ..SearchCfg::default()
    };
    let start = Instant::now();
    let res = search_centerpoint(&poly, 2, &cfg, Some(0)).expect("search succeeds on the prism");
    let elapsed = start.elapsed().as_secs_f64();

    println!(
        "F={:.4} point=({:.0}, {:.4}, {:.4}) scored={} trials={} fallback={}",
        res.score, res.point[0], res.point[1], res.point[2], res.candidates_scored, res.trials, res.fallback
    );
    println!("volume_total={:.4} elapsed_s={elapsed:.2}", res.volumes.total());
}
