//! Analytic jobs over ingested tweets, from scan to report file.

mod common;

use chrono::NaiveDate;
use common::{tweets_csv, with_engines, FaultyScanStore, Tweet};
use holo_table::{MemTable, TableStore};
use holo_tweets::account_age::{account_age, AgeBucket};
use holo_tweets::analytics::{influential_users, tweets_by_location};
use holo_tweets::{
    AnalyticsConfig, IngestConfig, IngestPipeline, Job, JobError, JobRunner, ScanEngine,
    TableConfig,
};
use tempfile::TempDir;

fn load(store: &dyn TableStore, tweets: &[Tweet]) {
    IngestPipeline::new(store, TableConfig::default(), IngestConfig::default())
        .ingest_reader(tweets_csv(tweets).as_bytes())
        .expect("ingest");
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

#[test]
fn location_counts_with_and_without_verification() {
    with_engines(|store| {
        load(
            store,
            &[
                Tweet::new("u1", "2020-07-25 12:00:01").location("NY").verified(true).text("a"),
                Tweet::new("u2", "2020-07-25 12:00:02").location("NY").verified(false).text("b"),
                Tweet::new("u3", "2020-07-25 12:00:03").location("CA").verified(true).text("c"),
            ],
        );
        let engine = ScanEngine::new(store, "CovidData");

        let all = tweets_by_location(&engine, false).unwrap().output;
        assert_eq!(all, vec![("NY".to_string(), 2), ("CA".to_string(), 1)]);

        let verified = tweets_by_location(&engine, true).unwrap().output;
        assert_eq!(verified, vec![("NY".to_string(), 1), ("CA".to_string(), 1)]);
    });
}

#[test]
fn influential_users_are_deduplicated_with_first_seen_followers() {
    with_engines(|store| {
        load(
            store,
            &[
                Tweet::new("star", "2020-07-25 09:00:00").verified(true).followers("10001"),
                Tweet::new("star", "2020-07-25 10:00:00").verified(true).followers("10050"),
                Tweet::new("almost", "2020-07-25 11:00:00").verified(true).followers("9999"),
                Tweet::new("crowd", "2020-07-25 12:00:00").verified(false).followers("50000"),
            ],
        );
        let engine = ScanEngine::new(store, "CovidData");
        let users = influential_users(&engine, 10_000).unwrap().output;
        assert_eq!(users, vec![("star".to_string(), 10_001)]);
    });
}

#[test]
fn account_age_buckets_against_reference_date() {
    with_engines(|store| {
        load(
            store,
            &[
                Tweet::new("exactly_one", "2020-07-25 09:00:00").created("2023-03-01 00:00:00").verified(true),
                Tweet::new("fresh", "2020-07-25 09:00:00").created("2023-12-24 10:00:00"),
                Tweet::new("veteran", "2020-07-25 09:00:00").created("2010-01-01 00:00:00").verified(true),
                Tweet::new("broken", "2020-07-25 09:00:00").created("not a date"),
            ],
        );
        let engine = ScanEngine::new(store, "CovidData");
        let outcome = account_age(&engine, "%Y-%m-%d %H:%M:%S", today()).unwrap();
        let summary = outcome.output;

        assert_eq!(summary.verified.count(AgeBucket::OneToThreeYears), 1);
        assert_eq!(summary.verified.count(AgeBucket::OverThreeYears), 1);
        assert_eq!(summary.non_verified.count(AgeBucket::UnderOneYear), 1);
        assert_eq!(summary.verified.average_years(), 7.5);
        assert_eq!(outcome.stats.rows_malformed, 1);
    });
}

#[test]
fn all_jobs_write_their_reports() {
    let store = MemTable::new();
    load(
        &store,
        &[
            Tweet::new("amy", "2020-07-25 09:00:00")
                .location("NY")
                .verified(true)
                .followers("20000")
                .hashtags("['COVID19']")
                .source("Twitter for Android")
                .text("stay safe"),
            Tweet::new("bob", "2020-07-25 10:00:00").location("CA").text("hello"),
        ],
    );
    let dir = TempDir::new().unwrap();
    let config = AnalyticsConfig {
        output_dir: dir.path().join("reports"),
        ..AnalyticsConfig::default()
    };
    let runner = JobRunner::new(&store, "CovidData", &config);
    for job in Job::ALL {
        let report = runner.run(job, today()).unwrap();
        assert!(report.path.ends_with(job.report_name()));
    }

    let read = |name: &str| std::fs::read_to_string(dir.path().join("reports").join(name)).unwrap();
    assert_eq!(read("tweets_by_location.txt"), "NY: 1\nCA: 1\n");
    assert_eq!(read("verified_tweets_by_location.txt"), "NY: 1\n");
    assert_eq!(read("hashtag_source_tweets.txt"), "stay safe\n");
    assert_eq!(
        read("tweet_counts_by_verification.txt"),
        "Total tweets by verified users: 1\nTotal tweets by non-verified users: 1\n"
    );
    assert_eq!(
        read("influential_users.txt"),
        "Verified users with more than 10000 followers:\namy: 20000\n"
    );
    let ages = read("account_age.txt");
    assert!(ages.starts_with("Reference date: 2024-03-01\n"));
    assert!(ages.contains("All, more than 3 years: 2\n"));
}

#[test]
fn scan_fault_fails_only_that_job_with_progress() {
    let store = FaultyScanStore {
        inner: MemTable::new(),
        rows_before_fault: 2,
    };
    load(
        &store,
        &[
            Tweet::new("a", "2020-07-25 09:00:00").location("NY"),
            Tweet::new("b", "2020-07-25 09:00:00").location("NY"),
            Tweet::new("c", "2020-07-25 09:00:00").location("NY"),
        ],
    );
    let dir = TempDir::new().unwrap();
    let config = AnalyticsConfig {
        output_dir: dir.path().to_path_buf(),
        ..AnalyticsConfig::default()
    };
    let runner = JobRunner::new(&store, "CovidData", &config);

    match runner.run(Job::TweetsByLocation, today()) {
        Err(JobError::Scan(failure)) => assert_eq!(failure.rows_processed, 2),
        other => panic!("expected scan failure, got {other:?}"),
    }
    assert!(!dir.path().join(Job::TweetsByLocation.report_name()).exists());
}
