//! Drives the `holo-tweets` binary against an on-disk keyspace.

mod common;

use std::path::Path;
use std::process::{Command, Output};

use common::{tweets_csv, write_csv, Tweet};
use tempfile::TempDir;

fn holo_tweets(data_dir: &Path, args: &[&str]) -> Output {
    let output = Command::new(env!("CARGO_BIN_EXE_holo-tweets"))
        .arg("--data-dir")
        .arg(data_dir)
        .args(args)
        .env("NO_COLOR", "1")
        .env("RUST_LOG", "warn")
        .output()
        .expect("spawn holo-tweets");
    assert!(
        output.status.success(),
        "holo-tweets {args:?} failed\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn schema_ingest_analyze_and_versions_round_trip() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("data");
    let input = write_csv(
        dir.path(),
        "tweets.csv",
        &tweets_csv(&[
            Tweet::new("amy", "2020-07-25 09:00:00").location("NY").verified(true),
            Tweet::new("bob", "2020-07-25 10:00:00").location("CA"),
        ]),
    );

    let schema = stdout(&holo_tweets(&data_dir, &["schema"]));
    assert!(schema.contains("created"));
    assert!(schema.contains("identity: max_versions=3"));
    let again = stdout(&holo_tweets(&data_dir, &["schema"]));
    assert!(again.contains("exists"));

    let summary = stdout(&holo_tweets(
        &data_dir,
        &["ingest", "--input", input.to_str().unwrap()],
    ));
    assert!(summary.contains("written: 2"));

    let reports = dir.path().join("reports");
    holo_tweets(
        &data_dir,
        &["analyze", "tweets-by-location", "--output-dir", reports.to_str().unwrap()],
    );
    assert_eq!(
        std::fs::read_to_string(reports.join("tweets_by_location.txt")).unwrap(),
        "NY: 1\nCA: 1\n"
    );

    let recorded = stdout(&holo_tweets(
        &data_dir,
        &[
            "versions",
            "record",
            "--row-key",
            "user1",
            "--description",
            "one",
            "--description",
            "two",
        ],
    ));
    let lines: Vec<_> = recorded.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with(": two"));

    let missing = stdout(&holo_tweets(&data_dir, &["versions", "get", "--row-key", "nobody"]));
    assert_eq!(missing.trim(), "no versions");
}

#[test]
fn versions_get_on_fresh_store_leaves_it_untouched() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("data");

    let missing = stdout(&holo_tweets(&data_dir, &["versions", "get", "--row-key", "nobody"]));
    assert_eq!(missing.trim(), "no versions");

    let schema = stdout(&holo_tweets(&data_dir, &["schema"]));
    assert!(schema.contains("(created)"), "table existed before schema ran:\n{schema}");
}

#[test]
fn account_age_report_uses_local_date_of_the_run() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("data");
    let input = write_csv(
        dir.path(),
        "tweets.csv",
        &tweets_csv(&[Tweet::new("amy", "2020-07-25 09:00:00").verified(true)]),
    );
    holo_tweets(&data_dir, &["ingest", "--input", input.to_str().unwrap()]);

    let reports = dir.path().join("reports");
    let before = chrono::Local::now().date_naive();
    holo_tweets(&data_dir, &["analyze", "all", "--output-dir", reports.to_str().unwrap()]);
    let after = chrono::Local::now().date_naive();

    let ages = std::fs::read_to_string(reports.join("account_age.txt")).unwrap();
    let first = ages.lines().next().unwrap();
    assert!(
        first == format!("Reference date: {before}") || first == format!("Reference date: {after}"),
        "unexpected reference line {first:?}"
    );
}
