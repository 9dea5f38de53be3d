use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Contents of a `<artifact>.provenance.json` sidecar.
#[derive(Debug, Serialize)]
pub struct Provenance {
    pub code_rev: String,
    pub core_version: &'static str,
    pub action: &'static str,
    pub seed: Option<u64>,
    pub params: Value,
    pub outputs: Vec<String>,
}

impl Provenance {
    pub fn new(action: &'static str, seed: Option<u64>, params: Value) -> Self {
        Self {
            code_rev: current_git_rev(),
            core_version: centerpoint::VERSION,
            action,
            seed,
            params,
            outputs: Vec::new(),
        }
    }
}

/// Write the sidecar next to `artifact`, listing it as the output.
pub fn write_sidecar<P: AsRef<Path>>(artifact: P, mut prov: Provenance) -> Result<PathBuf> {
    let artifact = artifact.as_ref();
    let path = provenance_path(artifact);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating provenance dir {}", parent.display()))?;
        }
    }
    prov.outputs.push(artifact.to_string_lossy().into_owned());
    fs::write(&path, serde_json::to_vec_pretty(&prov)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

fn provenance_path(artifact: &Path) -> PathBuf {
    let mut name = artifact
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| OsString::from("artifact"));
    name.push(".provenance.json");
    artifact.with_file_name(name)
}

/// Build-time `GIT_COMMIT`, then the runtime variable, then `git rev-parse`.
pub fn current_git_rev() -> String {
    if let Some(rev) = option_env!("GIT_COMMIT").filter(|s| !s.is_empty()) {
        return rev.to_string();
    }
    if let Ok(rev) = std::env::var("GIT_COMMIT") {
        if !rev.is_empty() {
            return rev;
        }
    }
    Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn sidecar_sits_next_to_artifact() {
        let derived = provenance_path(Path::new("/tmp/runs/seed_3.json"));
        assert_eq!(derived, Path::new("/tmp/runs/seed_3.provenance.json"));
    }

    #[test]
    fn sidecar_records_action_seed_and_output() {
        let dir = tempdir().unwrap();
        let artifact = dir.path().join("result.json");
        fs::write(&artifact, "{}").unwrap();
        let prov = Provenance::new("search", Some(7), json!({"d": 2}));
        let path = write_sidecar(&artifact, prov).unwrap();
        let parsed: Value = serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
        assert_eq!(parsed["action"], "search");
        assert_eq!(parsed["seed"], 7);
        assert_eq!(parsed["params"]["d"], 2);
        assert_eq!(parsed["outputs"][0], artifact.to_string_lossy().as_ref());
    }
}
