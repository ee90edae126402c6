//! Fixed-offset spaced repetition schedule.
//!
//! Every card is reviewed on day 1. Harder cards come back sooner:
//!
//! | difficulty | buckets                  |
//! |------------|--------------------------|
//! | hard       | day_1, day_3, day_7      |
//! | medium     | day_1, day_7, day_14     |
//! | easy       | day_1, day_14, day_30    |
//!
//! Each bucket holds its own copy of the card.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{Difficulty, Flashcard};

/// A review offset from the day the schedule starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReviewBucket {
    #[serde(rename = "day_1")]
    Day1,
    #[serde(rename = "day_3")]
    Day3,
    #[serde(rename = "day_7")]
    Day7,
    #[serde(rename = "day_14")]
    Day14,
    #[serde(rename = "day_30")]
    Day30,
}

impl ReviewBucket {
    pub const ALL: [ReviewBucket; 5] = [
        ReviewBucket::Day1,
        ReviewBucket::Day3,
        ReviewBucket::Day7,
        ReviewBucket::Day14,
        ReviewBucket::Day30,
    ];

    pub fn offset_days(self) -> u32 {
        match self {
            Self::Day1 => 1,
            Self::Day3 => 3,
            Self::Day7 => 7,
            Self::Day14 => 14,
            Self::Day30 => 30,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day1 => "day_1",
            Self::Day3 => "day_3",
            Self::Day7 => "day_7",
            Self::Day14 => "day_14",
            Self::Day30 => "day_30",
        }
    }

    /// Calendar date of this review for a schedule starting on `start`.
    pub fn due_on(self, start: NaiveDate) -> NaiveDate {
        start + Duration::days(i64::from(self.offset_days()))
    }
}

impl Difficulty {
    /// Buckets a card of this difficulty is reviewed in.
    pub fn review_buckets(self) -> [ReviewBucket; 3] {
        match self {
            Difficulty::Hard => [ReviewBucket::Day1, ReviewBucket::Day3, ReviewBucket::Day7],
            Difficulty::Medium => [ReviewBucket::Day1, ReviewBucket::Day7, ReviewBucket::Day14],
            Difficulty::Easy => [ReviewBucket::Day1, ReviewBucket::Day14, ReviewBucket::Day30],
        }
    }
}

/// Cards grouped by review bucket. All five buckets are always present.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ReviewSchedule {
    buckets: BTreeMap<ReviewBucket, Vec<Flashcard>>,
}

/// One bucket resolved to a calendar date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledReview {
    pub bucket: ReviewBucket,
    pub due_date: NaiveDate,
    pub cards: Vec<Flashcard>,
}

impl ReviewSchedule {
    /// Distribute `cards` across buckets by difficulty, keeping input order
    /// within each bucket.
    pub fn build(cards: &[Flashcard]) -> Self {
        let mut buckets: BTreeMap<ReviewBucket, Vec<Flashcard>> =
            ReviewBucket::ALL.iter().map(|b| (*b, Vec::new())).collect();

        for card in cards {
            for bucket in card.difficulty.review_buckets() {
                buckets.entry(bucket).or_default().push(card.clone());
            }
        }

        Self { buckets }
    }

    /// Cards due in `bucket`.
    pub fn cards(&self, bucket: ReviewBucket) -> &[Flashcard] {
        self.buckets.get(&bucket).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Buckets in offset order.
    pub fn iter(&self) -> impl Iterator<Item = (ReviewBucket, &[Flashcard])> {
        self.buckets.iter().map(|(b, cards)| (*b, cards.as_slice()))
    }

    /// Buckets that contain `card`.
    pub fn buckets_containing(&self, card: &Flashcard) -> Vec<ReviewBucket> {
        self.iter()
            .filter(|(_, cards)| cards.contains(card))
            .map(|(bucket, _)| bucket)
            .collect()
    }

    /// Total review assignments across all buckets.
    pub fn total_reviews(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Resolve every bucket to a due date counted from `start`.
    pub fn with_due_dates(&self, start: NaiveDate) -> Vec<ScheduledReview> {
        self.iter()
            .map(|(bucket, cards)| ScheduledReview {
                bucket,
                due_date: bucket.due_on(start),
                cards: cards.to_vec(),
            })
            .collect()
    }
}

/// Build the review schedule for a set of cards.
pub fn build_schedule(cards: &[Flashcard]) -> ReviewSchedule {
    ReviewSchedule::build(cards)
}
