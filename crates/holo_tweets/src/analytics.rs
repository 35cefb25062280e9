//! Descriptive tweet analytics built on [`ScanEngine`].

use crate::error::ScanFailure;
use crate::scan::{Accumulator, CollectValues, CountByGroup, FirstSeen, ScanEngine, ScanOutcome};
use crate::schema::{GROUP_CONTENT, GROUP_CONTEXT, GROUP_IDENTITY};

const ALL_GROUPS: [&str; 3] = [GROUP_IDENTITY, GROUP_CONTENT, GROUP_CONTEXT];

/// Tweet count per location, highest first. Rows need both a location and
/// a text; `verified_only` further restricts to verified users.
pub fn tweets_by_location(
    engine: &ScanEngine<'_>,
    verified_only: bool,
) -> Result<ScanOutcome<Vec<(String, u64)>>, ScanFailure> {
    engine.run(
        &ALL_GROUPS,
        |row| {
            Ok(row.location().is_some()
                && row.text().is_some()
                && (!verified_only || row.verified() == Some(true)))
        },
        |row| Ok((row.location().unwrap_or_default().to_string(), ())),
        CountByGroup::default(),
    )
}

/// Texts of tweets whose hashtags contain `hashtag` and whose source client
/// contains `source`, in scan order.
pub fn hashtag_source_tweets(
    engine: &ScanEngine<'_>,
    hashtag: &str,
    source: &str,
) -> Result<ScanOutcome<Vec<String>>, ScanFailure> {
    engine.run(
        &[GROUP_CONTENT, GROUP_CONTEXT],
        |row| {
            Ok(row.text().is_some()
                && row.hashtags().is_some_and(|tags| tags.contains(hashtag))
                && row.source().is_some_and(|client| client.contains(source)))
        },
        |row| Ok(((), row.text().unwrap_or_default().to_string())),
        CollectValues::default(),
    )
}

/// Tweet volume of verified and non-verified users.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VerificationCounts {
    pub verified: u64,
    pub non_verified: u64,
}

/// Two counters keyed by verification status.
#[derive(Debug, Default)]
pub struct VerificationVolume {
    counts: VerificationCounts,
}

impl Accumulator for VerificationVolume {
    type Key = bool;
    type Value = ();
    type Output = VerificationCounts;

    fn accumulate(&mut self, verified: bool, _value: ()) {
        if verified {
            self.counts.verified += 1;
        } else {
            self.counts.non_verified += 1;
        }
    }

    fn finish(self) -> VerificationCounts {
        self.counts
    }
}

/// Rows with an empty text count for neither side; a missing flag counts as
/// non-verified.
pub fn verification_volume(
    engine: &ScanEngine<'_>,
) -> Result<ScanOutcome<VerificationCounts>, ScanFailure> {
    engine.run(
        &[GROUP_IDENTITY, GROUP_CONTENT],
        |row| Ok(row.text().is_some()),
        |row| Ok((row.verified() == Some(true), ())),
        VerificationVolume::default(),
    )
}

/// Verified users with more than `threshold` followers, each name once with
/// the follower count of its first qualifying row, in first-seen order.
pub fn influential_users(
    engine: &ScanEngine<'_>,
    threshold: u64,
) -> Result<ScanOutcome<Vec<(String, u64)>>, ScanFailure> {
    engine.run(
        &[GROUP_IDENTITY, GROUP_CONTEXT],
        |row| {
            if row.verified() != Some(true) || row.name().is_none() {
                return Ok(false);
            }
            Ok(row.followers()?.is_some_and(|followers| followers > threshold))
        },
        |row| {
            let followers = row.followers()?.unwrap_or_default();
            Ok((row.name().unwrap_or_default().to_string(), followers))
        },
        FirstSeen::default(),
    )
}
