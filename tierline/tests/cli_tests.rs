use anyhow::{Context, Result};
use assert_cmd::prelude::*;
use datafusion::prelude::*;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// A private copy of the retail demo project.
struct TierlineTestEnv {
    _tmp: TempDir,
    root: PathBuf,
}

impl TierlineTestEnv {
    fn new() -> Result<Self> {
        let tmp = tempfile::tempdir()?;
        let project_root = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .context("Workspace root not found")?
            .join("demos/retail");

        let dest = tmp.path().join("retail");
        Self::copy_dir(&project_root, &dest)?;

        Ok(Self {
            _tmp: tmp,
            root: dest,
        })
    }

    fn copy_dir(src: &Path, dst: &Path) -> std::io::Result<()> {
        let mut options = fs_extra::dir::CopyOptions::new();
        options.skip_exist = true;
        options.content_only = true;

        std::fs::create_dir_all(dst)?;
        fs_extra::dir::copy(src, dst, &options)
            .map(|_| ())
            .map_err(|e| std::io::Error::other(e.to_string()))
    }

    fn tierline(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tierline"));
        cmd.current_dir(&self.root);
        cmd
    }

    fn run_pipeline(&self) -> Result<()> {
        self.tierline().arg("run").assert().success();
        Ok(())
    }

    fn read_json(&self, relative: &str) -> Result<serde_json::Value> {
        let content = std::fs::read_to_string(self.root.join(relative))
            .with_context(|| format!("{} not written", relative))?;
        Ok(serde_json::from_str(&content)?)
    }

    fn quarantine_ids(&self) -> Result<Vec<String>> {
        let records = self.read_json("target/quarantine.json")?;
        Ok(records
            .as_array()
            .context("quarantine.json is not an array")?
            .iter()
            .filter_map(|r| r["id"].as_str().map(String::from))
            .collect())
    }
}

#[test]
fn test_run_writes_results_and_quarantines_gold_failure() -> Result<()> {
    let env = TierlineTestEnv::new()?;
    env.run_pipeline()?;

    let results = env.read_json("target/run_results.json")?;
    assert_eq!(results["status"], "completed");

    let stages = results["stages"].as_array().context("stages missing")?;
    let ids: Vec<&str> = stages
        .iter()
        .filter_map(|s| s["stage_id"].as_str())
        .collect();
    assert_eq!(
        ids,
        vec![
            "load_customers",
            "load_orders",
            "bronze_to_silver",
            "compute_metrics",
            "silver_to_gold"
        ]
    );

    let silver = &stages[2];
    assert_eq!(silver["output_table"], "silver_orders");
    assert_eq!(silver["validation"]["passed"], true);

    // Programmatic stage: 4 calculations + 1 detection model
    assert_eq!(stages[3]["steps"].as_array().map(Vec::len), Some(5));

    let gold = &stages[4];
    assert_eq!(gold["status"], "completed");
    assert_eq!(gold["output_table"], "gold_published");
    assert_eq!(gold["validation"]["passed"], false);
    assert!(gold["quarantine_id"].is_string());

    assert_eq!(env.quarantine_ids()?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_calculation_snapshot_is_readable_parquet() -> Result<()> {
    let env = TierlineTestEnv::new()?;
    env.run_pipeline()?;

    let snapshot_dir = env.root.join("target/snapshots");
    let mut totals_path = None;
    for entry in walkdir::WalkDir::new(&snapshot_dir) {
        let entry = entry?;
        if entry.path().is_file()
            && entry.path().extension().and_then(|s| s.to_str()) == Some("parquet")
            && entry.file_name().to_string_lossy() == "calc_customer_totals.parquet"
        {
            totals_path = Some(entry.path().to_path_buf());
            break;
        }
    }
    let parquet_path = totals_path.context("Snapshot for calc_customer_totals not found")?;

    let ctx = SessionContext::new();
    let df = ctx
        .read_parquet(
            parquet_path.to_str().context("non UTF-8 path")?,
            ParquetReadOptions::default(),
        )
        .await?;

    let columns: Vec<String> = df
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    assert_eq!(columns, vec!["customer_id", "orders", "total"]);

    // Run-level min_amount = 0 drops only the refund: c1 and c2 remain
    assert_eq!(df.count().await?, 2);

    // No temporary file left next to the snapshot
    let leftovers = std::fs::read_dir(&snapshot_dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .count();
    assert_eq!(leftovers, 0);
    Ok(())
}

#[test]
fn test_dag_lists_dependencies_first() -> Result<()> {
    let env = TierlineTestEnv::new()?;
    let output = env.tierline().arg("dag").output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    let position = |id: &str| stdout.find(id).with_context(|| format!("{} missing", id));
    assert!(position("order_amounts")? < position("customer_totals")?);
    assert!(position("customer_totals")? < position("customer_tier")?);
    assert!(stdout.contains("4 calculation(s)"));
    Ok(())
}

#[test]
fn test_quarantine_review_lifecycle() -> Result<()> {
    let env = TierlineTestEnv::new()?;
    env.run_pipeline()?;
    let id = env.quarantine_ids()?.remove(0);

    env.tierline()
        .args(["quarantine", "list", "--status", "pending"])
        .assert()
        .success()
        .stdout(predicate::str::contains(&id))
        .stdout(predicate::str::contains("silver->gold"));

    // Blank notes are refused
    env.tierline()
        .args(["quarantine", "override", &id, "--notes", "  "])
        .assert()
        .failure();

    env.tierline()
        .args(["quarantine", "retry", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("retried"));

    env.tierline()
        .args(["quarantine", "discard", &id])
        .assert()
        .success();

    // Discarded is terminal, and the record is kept
    env.tierline()
        .args(["quarantine", "retry", &id])
        .assert()
        .failure();

    env.tierline()
        .args(["quarantine", "summary"])
        .assert()
        .success()
        .stdout(predicate::str::contains("range_check"))
        .stdout(predicate::str::contains("discarded"));

    let records = env.read_json("target/quarantine.json")?;
    assert_eq!(records[0]["status"], "discarded");
    assert_eq!(records[0]["retry_count"], 1);
    assert_eq!(records[0]["history"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[test]
fn test_quarantine_unknown_id_fails() -> Result<()> {
    let env = TierlineTestEnv::new()?;
    env.tierline()
        .args(["quarantine", "discard", "does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
    Ok(())
}

#[test]
fn test_validate_score_and_profile_gold() -> Result<()> {
    let env = TierlineTestEnv::new()?;
    env.run_pipeline()?;

    env.tierline()
        .args(["validate", "--contract", "orders_gold"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("range_check"))
        .stderr(predicate::str::contains("1 rule(s) violated"));

    env.tierline()
        .args(["validate", "--contract", "orders_silver"])
        .assert()
        .success();

    env.tierline()
        .args(["score", "--contract", "orders_gold"])
        .assert()
        .success()
        .stdout(predicate::str::contains("accuracy"))
        .stdout(predicate::str::contains("Overall"));

    env.tierline()
        .args(["profile", "--table", "gold_published"])
        .assert()
        .success()
        .stdout(predicate::str::contains("customer_tier"))
        .stdout(predicate::str::contains("5 rows"));
    Ok(())
}

#[test]
fn test_unknown_contract_is_reported() -> Result<()> {
    let env = TierlineTestEnv::new()?;
    env.tierline()
        .args(["validate", "--contract", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("orders_gold"));
    Ok(())
}

#[test]
fn test_single_stage_run() -> Result<()> {
    let env = TierlineTestEnv::new()?;
    env.tierline()
        .args(["run", "--stage", "load_orders"])
        .assert()
        .success();

    let result = env.read_json("target/run_results.json")?;
    assert_eq!(result["stage_id"], "load_orders");
    assert_eq!(result["status"], "completed");

    env.tierline()
        .args(["run", "--stage", "ghost"])
        .assert()
        .failure();
    Ok(())
}

#[test]
fn test_calc_select_runs_closure() -> Result<()> {
    let env = TierlineTestEnv::new()?;
    env.tierline()
        .args(["run", "--stage", "load_orders"])
        .assert()
        .success();
    env.tierline()
        .args(["run", "--stage", "load_customers"])
        .assert()
        .success();
    env.tierline()
        .args(["run", "--stage", "bronze_to_silver"])
        .assert()
        .success();

    env.tierline()
        .args(["calc", "--select", "customer_totals"])
        .assert()
        .success()
        .stdout(predicate::str::contains("order_amounts"))
        .stdout(predicate::str::contains("customer_tier").not());
    Ok(())
}

#[test]
fn test_clean_removes_target() -> Result<()> {
    let env = TierlineTestEnv::new()?;
    env.run_pipeline()?;
    assert!(env.root.join("target").exists());

    env.tierline().arg("clean").assert().success();
    assert!(!env.root.join("target").exists());
    assert!(env.root.join("catalog").exists());
    Ok(())
}

#[test]
fn test_missing_project_config() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    Command::new(assert_cmd::cargo::cargo_bin!("tierline"))
        .current_dir(tmp.path())
        .arg("run")
        .assert()
        .failure();
    Ok(())
}
