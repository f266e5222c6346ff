//! Rating aggregation.
//!
//! Averages are rebuilt from the raw submissions on every change; nothing is
//! accumulated across calls.

use crate::models::{Entry, Field, Score, Submission, MAX_SCORE};
use tracing::debug;

/// Running sum and sample count for one field.
#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    sum: f64,
    count: u32,
}

impl Accumulator {
    /// Add one submission's score.
    ///
    /// `N/A` contributes the running average of the samples seen so far, or
    /// nothing when it is the first sample. The count grows either way.
    fn push(&mut self, score: Score) {
        self.sum += match score {
            Score::Rated(v) => f64::from(v),
            Score::NotApplicable if self.count > 0 => self.sum / f64::from(self.count),
            Score::NotApplicable => 0.0,
        };
        self.count += 1;
    }

    fn push_total(&mut self, total: i64) {
        self.sum += total as f64;
        self.count += 1;
    }

    /// Mean, capped at the maximum score. No floor is applied.
    fn average(&self) -> f64 {
        (self.sum / f64::from(self.count)).min(f64::from(MAX_SCORE))
    }
}

/// Averages derived from a set of submissions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Averages {
    pub instrumentals: f64,
    pub vocals: f64,
    pub lyrics: f64,
    pub emotion: f64,
    pub overall: f64,
}

/// Compute averages over submissions, in iteration order.
///
/// Returns `None` when there are no submissions.
pub fn compute_averages<'a, I>(submissions: I) -> Option<Averages>
where
    I: IntoIterator<Item = &'a Submission>,
{
    let mut fields = [Accumulator::default(); 4];
    let mut overall = Accumulator::default();

    for submission in submissions {
        for (acc, field) in fields.iter_mut().zip(Field::SUB_SCORES) {
            if let Some(score) = submission.score(field) {
                acc.push(score);
            }
        }
        overall.push_total(submission.overall);
    }

    if overall.count == 0 {
        return None;
    }

    let [instrumentals, vocals, lyrics, emotion] = fields.map(|acc| acc.average());

    Some(Averages {
        instrumentals,
        vocals,
        lyrics,
        emotion,
        overall: overall.average(),
    })
}

/// Recompute an entry's averages from its ratings.
///
/// An entry without ratings keeps its current averages.
pub fn recompute(entry: &mut Entry) {
    let Some(averages) = compute_averages(entry.ratings.values()) else {
        debug!("No ratings for `{}`, keeping averages", entry.name);
        return;
    };

    entry.avg_ins = averages.instrumentals;
    entry.avg_voc = averages.vocals;
    entry.avg_lyr = averages.lyrics;
    entry.avg_emo = averages.emotion;
    entry.avg_ovr = averages.overall;

    debug!(
        "Recomputed `{}` over {} ratings: {:?}",
        entry.name,
        entry.ratings.len(),
        averages
    );
}
