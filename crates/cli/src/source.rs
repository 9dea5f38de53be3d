//! Where a run's polytope comes from: a built-in family or an H-rep JSON file.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use centerpoint::api::{triangle_prism, unit_cube, FiberPolytope, FiberSet};

/// `cube`, `prism`, or a path to `{"a": [[..], ..], "b": [..]}`.
#[derive(Clone, Debug, PartialEq)]
pub enum PolytopeSource {
    Cube,
    Prism,
    File(PathBuf),
}

impl FromStr for PolytopeSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "cube" => PolytopeSource::Cube,
            "prism" => PolytopeSource::Prism,
            path => PolytopeSource::File(PathBuf::from(path)),
        })
    }
}

impl PolytopeSource {
    /// Build or load the polytope. The cube spans exactly the fibers' range.
    pub fn load(&self, d: usize, fibers: &FiberSet) -> Result<FiberPolytope> {
        let poly = match self {
            PolytopeSource::Cube => {
                let (Some(&lo), Some(&hi)) = (fibers.as_slice().first(), fibers.as_slice().last()) else {
                    bail!("cube needs at least one fiber");
                };
                unit_cube(d, lo, hi)
            }
            PolytopeSource::Prism => {
                if d != 2 {
                    bail!("prism is 2-dimensional, got --d {d}");
                }
                triangle_prism()
            }
            PolytopeSource::File(path) => {
                let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
                serde_json::from_reader(BufReader::new(file))
                    .with_context(|| format!("parsing polytope {}", path.display()))?
            }
        };
        poly.check_dim(d)?;
        Ok(poly)
    }

    pub fn label(&self) -> String {
        match self {
            PolytopeSource::Cube => "cube".to_string(),
            PolytopeSource::Prism => "prism".to_string(),
            PolytopeSource::File(path) => path.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn names_map_to_families() {
        assert_eq!("cube".parse::<PolytopeSource>().unwrap(), PolytopeSource::Cube);
        assert_eq!("prism".parse::<PolytopeSource>().unwrap(), PolytopeSource::Prism);
        assert_eq!(
            "hulls/a.json".parse::<PolytopeSource>().unwrap(),
            PolytopeSource::File(PathBuf::from("hulls/a.json"))
        );
    }

    #[test]
    fn cube_spans_fiber_range() {
        let poly = PolytopeSource::Cube.load(3, &FiberSet::new([2, 0, 5])).unwrap();
        assert_eq!(poly.dim(), 3);
        assert!(poly.contains_parts(5, &[0.5, 0.5, 0.5], 1e-9));
        assert!(!poly.contains_parts(6, &[0.5, 0.5, 0.5], 1e-9));
    }

    #[test]
    fn prism_rejects_other_dims() {
        assert!(PolytopeSource::Prism.load(3, &FiberSet::default()).is_err());
        assert!(PolytopeSource::Prism.load(2, &FiberSet::default()).is_ok());
    }

    #[test]
    fn file_is_checked_against_d() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("square.json");
        fs::write(
            &path,
            r#"{"a": [[0, 1, 0], [0, -1, 0], [0, 0, 1], [0, 0, -1]], "b": [1, 0, 1, 0]}"#,
        )
        .unwrap();
        let src = PolytopeSource::File(path);
        let poly = src.load(2, &FiberSet::default()).unwrap();
        assert_eq!(poly.n_ineq(), 4);
        let err = src.load(3, &FiberSet::default()).unwrap_err();
        assert!(err.to_string().contains("expected A.cols = 4"), "{err}");
    }
}
