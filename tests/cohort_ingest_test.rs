use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const RAW_EXPORT: &str = "Monthly cohort,Cohort Start,Cohort End,Page path and screen class,Visitors,Purchases,Percentage\n\
1,20240101-20240201,x,/,100,15,0.15\n\
0,20240101-20240101,x,RESERVED_TOTAL,400,20,0.05\n\
\n\
0,20240101-20240101,x,/,100,10,0.1\n\
0,20240201-20240201,x,/pricing,50,5,0.1\n";

const CANONICAL: &str = "Monthly cohort,Cohort Start,Cohort End,Page path and screen class,Visitors,Purchases,Percentage\n\
0,2024-01-01,2024-01-01,/,100,10,10.00%\n\
1,2024-01-01,2024-02-01,/,100,15,15.00%\n\
0,2024-02-01,2024-02-01,/pricing,50,5,10.00%\n\
0,2024-01-01,2024-01-01,RESERVED_TOTAL,400,20,5.00%";

fn cohort_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("cohort-lens");
    cmd.current_dir(home)
        .env("COHORT_HOME", home)
        .env("COHORT_CONFIG_PATH", home.join("missing-config.toml"));
    cmd
}

#[test]
fn ingest_writes_sorted_canonical_csv() {
    let tmp = tempdir().expect("tempdir");
    let input = tmp.path().join("export.csv");
    let output = tmp.path().join("canonical.csv");
    fs::write(&input, RAW_EXPORT).expect("write export");

    cohort_cmd(tmp.path())
        .arg("ingest")
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("ingest: ok"))
        .stdout(predicate::str::contains("lines.valid=4"))
        .stdout(predicate::str::contains("cohort_start.first=2024-01-01"))
        .stdout(predicate::str::contains("cohort_start.last=2024-02-01"));

    let written = fs::read_to_string(&output).expect("read canonical");
    assert_eq!(written, CANONICAL);
}

#[test]
fn reingesting_canonical_output_is_a_fixed_point() {
    let tmp = tempdir().expect("tempdir");
    let first = tmp.path().join("first.csv");
    let second = tmp.path().join("second.csv");
    fs::write(&first, CANONICAL).expect("write canonical");

    let assert = cohort_cmd(tmp.path())
        .arg("--json")
        .arg("ingest")
        .arg("-i")
        .arg(&first)
        .arg("-o")
        .arg(&second)
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let report: serde_json::Value = serde_json::from_str(&stdout).expect("json report");
    assert_eq!(report["ok"], true);
    assert_eq!(report["data"]["stats"]["valid"], 4);
    assert_eq!(report["data"]["stats"]["skipped"], 1);

    let rewritten = fs::read_to_string(&second).expect("read second");
    assert_eq!(rewritten, CANONICAL);
}

#[test]
fn ingest_without_output_prints_csv_to_stdout() {
    let tmp = tempdir().expect("tempdir");
    let input = tmp.path().join("export.csv");
    fs::write(&input, RAW_EXPORT).expect("write export");

    cohort_cmd(tmp.path())
        .args(["ingest", "-i"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Monthly cohort,Cohort Start"))
        .stdout(predicate::str::contains("0,2024-02-01,2024-02-01,/pricing,50,5,10.00%"))
        .stderr(predicate::str::contains("ingest: ok"));
}

#[test]
fn malformed_rows_are_skipped_with_warning() {
    let tmp = tempdir().expect("tempdir");
    let input = tmp.path().join("export.csv");
    fs::write(&input, "0,20240101-20240131,x,/,10,1,0.1\nnot,enough\n").expect("write export");

    cohort_cmd(tmp.path())
        .args(["ingest", "-i"])
        .arg(&input)
        .arg("-o")
        .arg(tmp.path().join("out.csv"))
        .assert()
        .success()
        .stdout(predicate::str::contains("lines.skipped=1"))
        .stderr(predicate::str::contains(
            "COHORT_WARN code=ROWS_TOO_FEW_FIELDS stage=ingest",
        ));
}

#[test]
fn empty_export_is_not_an_error() {
    let tmp = tempdir().expect("tempdir");
    let input = tmp.path().join("empty.csv");
    let output = tmp.path().join("out.csv");
    fs::write(&input, "").expect("write export");

    cohort_cmd(tmp.path())
        .args(["ingest", "-i"])
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("no valid cohort rows found"));

    let written = fs::read_to_string(&output).expect("read output");
    assert_eq!(
        written,
        "Monthly cohort,Cohort Start,Cohort End,Page path and screen class,Visitors,Purchases,Percentage"
    );
}

#[test]
fn oversized_export_is_rejected_with_code() {
    let tmp = tempdir().expect("tempdir");
    let input = tmp.path().join("export.csv");
    fs::write(&input, RAW_EXPORT).expect("write export");

    cohort_cmd(tmp.path())
        .env("COHORT_MAX_INPUT_BYTES", "16")
        .args(["ingest", "-i"])
        .arg(&input)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error[E002_INPUT_TOO_LARGE]"));
}

#[test]
fn unformatted_start_dates_survive_reingestion() {
    let tmp = tempdir().expect("tempdir");
    let input = tmp.path().join("export.csv");
    let first = tmp.path().join("first.csv");
    let second = tmp.path().join("second.csv");
    fs::write(
        &input,
        "0,2024011-20240131,x,/a,5,2,0.4\n0,-20240131,x,/b,5,2,0.4\n",
    )
    .expect("write export");

    cohort_cmd(tmp.path())
        .args(["ingest", "-i"])
        .arg(&input)
        .arg("-o")
        .arg(&first)
        .assert()
        .success()
        .stdout(predicate::str::contains("lines.valid=2"));

    cohort_cmd(tmp.path())
        .args(["ingest", "-i"])
        .arg(&first)
        .arg("-o")
        .arg(&second)
        .assert()
        .success()
        .stdout(predicate::str::contains("lines.valid=2"))
        .stdout(predicate::str::contains("lines.skipped=1"));

    assert_eq!(
        fs::read_to_string(&first).expect("first"),
        fs::read_to_string(&second).expect("second")
    );
}
