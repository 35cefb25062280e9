//! Account age bucketing by verification status.
//!
//! Ages are whole calendar years between the account creation date and a
//! reference date captured once when the job starts. Results therefore change
//! from one run to the next as the reference date moves.

use std::fmt;

use chrono::{Datelike, NaiveDate};

use crate::error::ScanFailure;
use crate::scan::{Accumulator, ScanEngine, ScanOutcome};
use crate::schema::GROUP_IDENTITY;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgeBucket {
    UnderOneYear,
    OneToThreeYears,
    OverThreeYears,
}

impl AgeBucket {
    pub const ALL: [AgeBucket; 3] = [
        AgeBucket::UnderOneYear,
        AgeBucket::OneToThreeYears,
        AgeBucket::OverThreeYears,
    ];

    /// `<1`, `[1, 3]`, `>3`. Creation dates after the reference date give a
    /// negative age and land in the first bucket.
    pub fn for_years(years: i64) -> Self {
        if years < 1 {
            AgeBucket::UnderOneYear
        } else if years <= 3 {
            AgeBucket::OneToThreeYears
        } else {
            AgeBucket::OverThreeYears
        }
    }

    fn index(self) -> usize {
        match self {
            AgeBucket::UnderOneYear => 0,
            AgeBucket::OneToThreeYears => 1,
            AgeBucket::OverThreeYears => 2,
        }
    }
}

impl fmt::Display for AgeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AgeBucket::UnderOneYear => "less than 1 year",
            AgeBucket::OneToThreeYears => "1-3 years",
            AgeBucket::OverThreeYears => "more than 3 years",
        })
    }
}

/// Whole calendar years from `start` to `end`, truncated toward zero.
pub fn whole_years_between(start: NaiveDate, end: NaiveDate) -> i64 {
    let mut years = i64::from(end.year() - start.year());
    let end_md = (end.month(), end.day());
    let start_md = (start.month(), start.day());
    if years > 0 && end_md < start_md {
        years -= 1;
    } else if years < 0 && end_md > start_md {
        years += 1;
    }
    years
}

/// Bucket counts plus the running sum used for the average.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AgeTally {
    buckets: [u64; 3],
    pub total_years: i64,
    pub accounts: u64,
}

impl AgeTally {
    fn add(&mut self, years: i64) {
        self.buckets[AgeBucket::for_years(years).index()] += 1;
        self.total_years += years;
        self.accounts += 1;
    }

    pub fn count(&self, bucket: AgeBucket) -> u64 {
        self.buckets[bucket.index()]
    }

    /// Mean age in years; zero without accounts.
    pub fn average_years(&self) -> f64 {
        if self.accounts == 0 {
            0.0
        } else {
            self.total_years as f64 / self.accounts as f64
        }
    }
}

/// Cross-tab of age buckets by verification status.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AccountAgeSummary {
    /// Date every age was measured against.
    pub reference: NaiveDate,
    pub verified: AgeTally,
    pub non_verified: AgeTally,
}

impl AccountAgeSummary {
    pub fn total(&self, bucket: AgeBucket) -> u64 {
        self.verified.count(bucket) + self.non_verified.count(bucket)
    }
}

/// Accumulates `(verified, age in years)` pairs.
#[derive(Debug)]
pub struct AccountAges {
    summary: AccountAgeSummary,
}

impl AccountAges {
    pub fn new(reference: NaiveDate) -> Self {
        Self {
            summary: AccountAgeSummary {
                reference,
                verified: AgeTally::default(),
                non_verified: AgeTally::default(),
            },
        }
    }
}

impl Accumulator for AccountAges {
    type Key = bool;
    type Value = i64;
    type Output = AccountAgeSummary;

    fn accumulate(&mut self, verified: bool, years: i64) {
        if verified {
            self.summary.verified.add(years);
        } else {
            self.summary.non_verified.add(years);
        }
    }

    fn finish(self) -> AccountAgeSummary {
        self.summary
    }
}

/// Ages of every row carrying both a creation time (in `created_format`) and
/// a verification flag, measured against `reference`.
pub fn account_age(
    engine: &ScanEngine<'_>,
    created_format: &str,
    reference: NaiveDate,
) -> Result<ScanOutcome<AccountAgeSummary>, ScanFailure> {
    engine.run(
        &[GROUP_IDENTITY],
        |row| Ok(row.verified().is_some() && row.created(created_format)?.is_some()),
        |row| {
            let created = row.created(created_format)?.map(|c| c.date()).unwrap_or(reference);
            Ok((
                row.verified() == Some(true),
                whole_years_between(created, reference),
            ))
        },
        AccountAges::new(reference),
    )
}
