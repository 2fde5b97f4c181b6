use anyhow::{Context, Result};
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const ORDERS_CSV: &str = "\
order_id,user_id,amount,quantity,created_at,status
o1,u1,10.0,1,2024-01-01T10:00:00Z,Paid
o2,u2,12.5,2,2024-01-02 11:30:00,refunded
o3,u1,11,1,,paid
o4,u3,900,1,2024-01-05 08:00:00,paid
";

const USERS_CSV: &str = "\
user_id,country,city,segment
u1,Saudi Arabia,Riyadh,VIP
u2,UAE,Dubai,regular
";

/// A throwaway quarry project with raw extracts in `data/raw`.
struct QuarryTestEnv {
    _tmp: TempDir,
    root: PathBuf,
}

impl QuarryTestEnv {
    fn new(orders: &str, users: &str) -> Result<Self> {
        let tmp = tempfile::tempdir()?;
        let root = tmp.path().join("project");
        let raw = root.join("data/raw");
        fs::create_dir_all(&raw)?;
        fs::write(raw.join("orders.csv"), orders)?;
        fs::write(raw.join("users.csv"), users)?;
        Ok(Self { _tmp: tmp, root })
    }

    fn quarry(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("quarry"));
        cmd.current_dir(&self.root);
        cmd
    }

    fn processed(&self, file: &str) -> PathBuf {
        self.root.join("data/processed").join(file)
    }
}

fn count_rows(parquet: &Path) -> Result<i64> {
    let conn = duckdb::Connection::open_in_memory()?;
    let n = conn.query_row(
        &format!("SELECT count(*) FROM read_parquet('{}')", parquet.display()),
        [],
        |row| row.get(0),
    )?;
    Ok(n)
}

#[test]
fn test_run_writes_outputs_and_metadata() -> Result<()> {
    let env = QuarryTestEnv::new(ORDERS_CSV, USERS_CSV)?;

    env.quarry()
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("SUCCESS"));

    assert_eq!(count_rows(&env.processed("orders_clean.parquet"))?, 4);
    assert_eq!(count_rows(&env.processed("analytics_table.parquet"))?, 4);
    assert!(env.processed("users.parquet").exists());
    assert!(env.root.join("reports/missingness_orders.csv").exists());

    let meta: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(env.processed("_run_meta.json"))?)?;
    assert_eq!(meta["rows_in_orders_raw"], 4);
    assert_eq!(meta["missing_created_at"], 1);
    assert_eq!(meta["amount_outliers"], 1);
    assert_eq!(meta["join_match_rate"], 0.75);
    assert_eq!(meta["config"]["name"], "orders_etl");
    Ok(())
}

#[test]
fn test_run_fails_on_duplicate_users_without_writing() -> Result<()> {
    let users = "user_id,country\nu1,SA\nu1,AE\n";
    let env = QuarryTestEnv::new(ORDERS_CSV, users)?;

    env.quarry()
        .arg("run")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("QUALITY GATE FAILED"))
        .stderr(predicate::str::contains("user_id"));

    assert!(!env.root.join("data/processed").exists());
    Ok(())
}

#[test]
fn test_run_honours_config_file() -> Result<()> {
    let env = QuarryTestEnv::new(ORDERS_CSV, USERS_CSV)?;
    fs::write(
        env.root.join("quarry.yaml"),
        "name: nightly\npaths:\n  processed: out\n",
    )?;

    env.quarry()
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("nightly"));

    assert!(env.root.join("out/analytics_table.parquet").exists());
    Ok(())
}

#[test]
fn test_stages_then_inspect() -> Result<()> {
    let env = QuarryTestEnv::new(ORDERS_CSV, USERS_CSV)?;

    for stage in ["load", "clean", "analytics"] {
        env.quarry()
            .args(["stage", stage])
            .assert()
            .success();
    }
    assert!(env.processed("_run_meta_analytics.json").exists());

    let analytics = env.processed("analytics_table.parquet");
    env.quarry()
        .args(["inspect", "--input"])
        .arg(&analytics)
        .args(["--limit", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4 rows"))
        .stdout(predicate::str::contains("order_id"));
    Ok(())
}

#[test]
fn test_report_csv_format() -> Result<()> {
    let env = QuarryTestEnv::new(ORDERS_CSV, USERS_CSV)?;
    let input = env.root.join("data/raw/orders.csv");

    let output = env
        .quarry()
        .args(["report", "--format", "csv", "--input"])
        .arg(&input)
        .output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("column,n_missing,p_missing"));
    // created_at is the only column with a gap.
    let first = lines.next().context("report has no rows")?;
    assert_eq!(first, "created_at,1,0.25");
    Ok(())
}

#[test]
fn test_inspect_missing_file() -> Result<()> {
    let env = QuarryTestEnv::new(ORDERS_CSV, USERS_CSV)?;
    env.quarry()
        .args(["inspect", "--input", "nope.parquet"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
    Ok(())
}
