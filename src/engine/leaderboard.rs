//! Aggregates over submissions: the public leaderboard and per-author totals.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::model::{Submission, SubmissionType};

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub author_id: Uuid,
    /// Name on the first submission seen for this author.
    pub author_name: String,
    pub total_stars: f64,
    pub submission_count: u32,
}

struct Group {
    author_id: Uuid,
    author_name: String,
    half_stars: u32,
    count: u32,
}

/// Rank authors by the stars their approved submissions of `kind` earned.
///
/// `submissions` must be in creation order. Ties on stars are broken by
/// submission count; remaining ties keep first-seen order.
pub fn rank<'a, I>(kind: SubmissionType, submissions: I) -> Vec<LeaderboardEntry>
where
    I: IntoIterator<Item = &'a Submission>,
{
    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();

    for submission in submissions {
        if !submission.approved || submission.kind != kind {
            continue;
        }

        let slot = *index.entry(submission.author.user_id).or_insert_with(|| {
            groups.push(Group {
                author_id: submission.author.user_id,
                author_name: submission.author.name.clone(),
                half_stars: 0,
                count: 0,
            });
            groups.len() - 1
        });

        let group = &mut groups[slot];
        group.count += 1;
        if let Some(rating) = submission.rating {
            group.half_stars += u32::from(rating.half_stars());
        }
    }

    // Stable sort, so equal keys stay in first-seen order.
    groups.sort_by(|a, b| {
        b.half_stars
            .cmp(&a.half_stars)
            .then_with(|| b.count.cmp(&a.count))
    });

    groups
        .into_iter()
        .map(|g| LeaderboardEntry {
            author_id: g.author_id,
            author_name: g.author_name,
            total_stars: f64::from(g.half_stars) / 2.0,
            submission_count: g.count,
        })
        .collect()
}

/// Profile aggregates derived from one author's submissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthorTotals {
    /// Approved submissions.
    pub poems_count: u32,
    /// Sum of rating points.
    pub points: u32,
}

impl AuthorTotals {
    pub fn tally<'a, I>(submissions: I) -> Self
    where
        I: IntoIterator<Item = &'a Submission>,
    {
        submissions
            .into_iter()
            .filter(|s| s.approved)
            .fold(Self::default(), |mut totals, s| {
                totals.poems_count += 1;
                totals.points += s.rating.map(|r| r.points()).unwrap_or(0);
                totals
            })
    }
}
