//! Named analytic jobs: one scan, one report file each.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use holo_table::TableStore;

use crate::account_age::{account_age, AgeBucket};
use crate::analytics::{
    hashtag_source_tweets, influential_users, tweets_by_location, verification_volume,
};
use crate::config::AnalyticsConfig;
use crate::error::JobError;
use crate::report::{ReportLine, ReportWriter};
use crate::scan::{ScanEngine, ScanStats};

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Job {
    TweetsByLocation,
    VerifiedTweetsByLocation,
    HashtagSourceTweets,
    VerificationVolume,
    InfluentialUsers,
    AccountAge,
}

impl Job {
    pub const ALL: [Job; 6] = [
        Job::TweetsByLocation,
        Job::VerifiedTweetsByLocation,
        Job::HashtagSourceTweets,
        Job::VerificationVolume,
        Job::InfluentialUsers,
        Job::AccountAge,
    ];

    pub fn report_name(self) -> &'static str {
        match self {
            Job::TweetsByLocation => "tweets_by_location.txt",
            Job::VerifiedTweetsByLocation => "verified_tweets_by_location.txt",
            Job::HashtagSourceTweets => "hashtag_source_tweets.txt",
            Job::VerificationVolume => "tweet_counts_by_verification.txt",
            Job::InfluentialUsers => "influential_users.txt",
            Job::AccountAge => "account_age.txt",
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Job::TweetsByLocation => "tweets-by-location",
            Job::VerifiedTweetsByLocation => "verified-tweets-by-location",
            Job::HashtagSourceTweets => "hashtag-source-tweets",
            Job::VerificationVolume => "verification-volume",
            Job::InfluentialUsers => "influential-users",
            Job::AccountAge => "account-age",
        })
    }
}

/// One job by name, or `all` of them in their fixed order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobSelection(pub Vec<Job>);

impl FromStr for JobSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(JobSelection(Job::ALL.to_vec()));
        }
        <Job as clap::ValueEnum>::from_str(s, true).map(|job| JobSelection(vec![job]))
    }
}

/// What a finished job produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobReport {
    pub job: Job,
    pub path: PathBuf,
    pub lines: usize,
    pub stats: ScanStats,
}

/// Runs jobs against one table and writes their reports.
pub struct JobRunner<'a> {
    engine: ScanEngine<'a>,
    config: &'a AnalyticsConfig,
    writer: ReportWriter,
}

impl<'a> JobRunner<'a> {
    pub fn new(store: &'a dyn TableStore, table: &'a str, config: &'a AnalyticsConfig) -> Self {
        Self {
            engine: ScanEngine::new(store, table),
            config,
            writer: ReportWriter::new(config.output_dir.clone()),
        }
    }

    /// Run one job. `today` is the reference date for account ages.
    pub fn run(&self, job: Job, today: NaiveDate) -> Result<JobReport, JobError> {
        tracing::info!(job = %job, table = self.engine.table(), "running job");
        let (lines, stats) = self.scan(job, today)?;
        let (path, lines) = self.writer.write(job.report_name(), lines)?;
        tracing::info!(
            job = %job,
            path = %path.display(),
            lines,
            rows_scanned = stats.rows_scanned,
            rows_malformed = stats.rows_malformed,
            "job finished"
        );
        Ok(JobReport {
            job,
            path,
            lines,
            stats,
        })
    }

    fn scan(&self, job: Job, today: NaiveDate) -> Result<(Vec<ReportLine>, ScanStats), JobError> {
        let engine = &self.engine;
        let config = self.config;
        Ok(match job {
            Job::TweetsByLocation | Job::VerifiedTweetsByLocation => {
                let outcome = tweets_by_location(engine, job == Job::VerifiedTweetsByLocation)?;
                let lines = outcome
                    .output
                    .into_iter()
                    .map(|(location, count)| ReportLine::pair(location, count))
                    .collect();
                (lines, outcome.stats)
            }
            Job::HashtagSourceTweets => {
                let outcome =
                    hashtag_source_tweets(engine, &config.hashtag_filter, &config.source_filter)?;
                let lines = outcome.output.into_iter().map(ReportLine::Plain).collect();
                (lines, outcome.stats)
            }
            Job::VerificationVolume => {
                let outcome = verification_volume(engine)?;
                let lines = vec![
                    ReportLine::pair("Total tweets by verified users", outcome.output.verified),
                    ReportLine::pair(
                        "Total tweets by non-verified users",
                        outcome.output.non_verified,
                    ),
                ];
                (lines, outcome.stats)
            }
            Job::InfluentialUsers => {
                let outcome = influential_users(engine, config.influencer_threshold)?;
                let mut lines = vec![ReportLine::plain(format!(
                    "Verified users with more than {} followers:",
                    config.influencer_threshold
                ))];
                lines.extend(
                    outcome
                        .output
                        .into_iter()
                        .map(|(name, followers)| ReportLine::pair(name, followers)),
                );
                (lines, outcome.stats)
            }
            Job::AccountAge => {
                let outcome = account_age(engine, &config.created_format, today)?;
                let summary = outcome.output;
                let mut lines = vec![ReportLine::pair("Reference date", summary.reference)];
                for bucket in AgeBucket::ALL {
                    lines.push(ReportLine::pair(format!("All, {bucket}"), summary.total(bucket)));
                }
                for (status, tally) in [
                    ("Verified", &summary.verified),
                    ("Non-verified", &summary.non_verified),
                ] {
                    for bucket in AgeBucket::ALL {
                        lines.push(ReportLine::pair(format!("{status}, {bucket}"), tally.count(bucket)));
                    }
                }
                lines.push(ReportLine::pair(
                    "Verified, average years",
                    format!("{:.2}", summary.verified.average_years()),
                ));
                lines.push(ReportLine::pair(
                    "Non-verified, average years",
                    format!("{:.2}", summary.non_verified.average_years()),
                ));
                (lines, outcome.stats)
            }
        })
    }
}
