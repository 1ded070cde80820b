// tierline-core/src/application/clean.rs

use crate::error::TierlineError;
use crate::infrastructure::config::ProjectConfig;
use std::fs;
use std::path::{Component, Path};

/// Removes the configured build artifacts. Returns what was actually removed.
pub fn clean_project(project_dir: &Path, config: &ProjectConfig) -> Result<Vec<String>, TierlineError> {
    tracing::info!("🧹 Initializing Tierline cleanup sequence...");

    let targets = if config.clean_targets.is_empty() {
        vec![config.target_path.clone()]
    } else {
        config.clean_targets.clone()
    };

    let mut removed = Vec::new();
    for target_rel_path in targets {
        // Zero-Trust Path Traversal Guard
        let rel = Path::new(&target_rel_path);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || target_rel_path.trim().is_empty() {
            return Err(TierlineError::UnsafePath(target_rel_path));
        }

        let full_path = project_dir.join(rel);
        if full_path.exists() {
            if full_path.is_dir() {
                fs::remove_dir_all(&full_path)?;
            } else {
                fs::remove_file(&full_path)?;
            }
            tracing::info!("   🗑️  Artifact removed: {}", target_rel_path);
            removed.push(target_rel_path);
        }
    }

    Ok(removed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn config(targets: &[&str]) -> ProjectConfig {
        let mut config: ProjectConfig = serde_yaml::from_str("name: retail").unwrap();
        config.clean_targets = targets.iter().map(|s| s.to_string()).collect();
        config
    }

    #[test]
    fn test_removes_targets() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("target/snapshots"))?;
        fs::write(dir.path().join("tierline.duckdb"), "")?;

        let removed = clean_project(dir.path(), &config(&["target", "tierline.duckdb", "logs"]))?;
        assert_eq!(removed, vec!["target", "tierline.duckdb"]);
        assert!(!dir.path().join("target").exists());
        Ok(())
    }

    #[test]
    fn test_rejects_traversal() -> Result<()> {
        let dir = tempfile::tempdir()?;
        for bad in ["../outside", "/etc", "target/../../x", ""] {
            let err = clean_project(dir.path(), &config(&[bad])).unwrap_err();
            assert!(matches!(err, TierlineError::UnsafePath(_)), "{bad}");
        }
        Ok(())
    }
}
