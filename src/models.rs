//! Data models for the rating engine.
//!
//! The serde layout of these types is the on-disk document format, so field
//! names and declaration order are part of the file contract.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::num::IntErrorKind;

/// Lowest numeric score a rater can give.
pub const MIN_SCORE: u8 = 1;
/// Highest numeric score a rater can give; also the ceiling of every average.
pub const MAX_SCORE: u8 = 5;

/// Marker stored in place of a score the rater declined to give.
pub const NOT_APPLICABLE: &str = "N/A";

/// One sub-score of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawScore", into = "RawScore")]
pub enum Score {
    /// A numeric score in `[MIN_SCORE, MAX_SCORE]`.
    Rated(u8),
    /// The `N/A` sentinel.
    NotApplicable,
}

impl Score {
    /// Interpret free-text input from a rater.
    ///
    /// Integers are clamped into range, anything else becomes `N/A`.
    pub fn parse_input(input: &str) -> Self {
        match input.trim().parse::<i64>() {
            Ok(value) => Score::Rated(value.clamp(MIN_SCORE as i64, MAX_SCORE as i64) as u8),
            Err(e) => match e.kind() {
                IntErrorKind::PosOverflow => Score::Rated(MAX_SCORE),
                IntErrorKind::NegOverflow => Score::Rated(MIN_SCORE),
                _ => Score::NotApplicable,
            },
        }
    }

    /// Numeric value, if any.
    pub fn value(&self) -> Option<u8> {
        match self {
            Score::Rated(v) => Some(*v),
            Score::NotApplicable => None,
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Rated(v) => write!(f, "{}", v),
            Score::NotApplicable => write!(f, "{}", NOT_APPLICABLE),
        }
    }
}

/// Wire form of a score: a bare integer or the `"N/A"` string.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawScore {
    Number(i64),
    Text(String),
}

impl TryFrom<RawScore> for Score {
    type Error = String;

    fn try_from(raw: RawScore) -> Result<Self, Self::Error> {
        match raw {
            RawScore::Number(n) if (MIN_SCORE as i64..=MAX_SCORE as i64).contains(&n) => {
                Ok(Score::Rated(n as u8))
            }
            RawScore::Number(n) => Err(format!(
                "score {} is outside {}..={}",
                n, MIN_SCORE, MAX_SCORE
            )),
            RawScore::Text(s) if s == NOT_APPLICABLE => Ok(Score::NotApplicable),
            RawScore::Text(s) => Err(format!("invalid score `{}`", s)),
        }
    }
}

impl From<Score> for RawScore {
    fn from(score: Score) -> Self {
        match score {
            Score::Rated(v) => RawScore::Number(v as i64),
            Score::NotApplicable => RawScore::Text(NOT_APPLICABLE.to_string()),
        }
    }
}

/// The four raw text inputs of a rating form, in form order.
#[derive(Debug, Clone, Default)]
pub struct RawScores {
    pub instrumentals: String,
    pub vocals: String,
    pub lyrics: String,
    pub emotion: String,
}

impl RawScores {
    pub fn new(
        instrumentals: impl Into<String>,
        vocals: impl Into<String>,
        lyrics: impl Into<String>,
        emotion: impl Into<String>,
    ) -> Self {
        Self {
            instrumentals: instrumentals.into(),
            vocals: vocals.into(),
            lyrics: lyrics.into(),
            emotion: emotion.into(),
        }
    }
}

/// One rater's vote on one entry.
// Field order matches the sorted key order written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(rename = "Comments", default)]
    pub comments: String,
    #[serde(rename = "Emotion/Feeling")]
    pub emotion: Score,
    #[serde(rename = "Instrumentals")]
    pub instrumentals: Score,
    #[serde(rename = "Lyrics")]
    pub lyrics: Score,
    /// Sum of the numeric sub-scores.
    #[serde(rename = "Overall")]
    pub overall: i64,
    #[serde(rename = "Vocals")]
    pub vocals: Score,
}

impl Submission {
    /// Build a submission from raw form input.
    pub fn from_raw(raw: &RawScores, comments: &str) -> Self {
        let instrumentals = Score::parse_input(&raw.instrumentals);
        let vocals = Score::parse_input(&raw.vocals);
        let lyrics = Score::parse_input(&raw.lyrics);
        let emotion = Score::parse_input(&raw.emotion);

        let overall = [instrumentals, vocals, lyrics, emotion]
            .iter()
            .filter_map(Score::value)
            .map(i64::from)
            .sum();

        Self {
            comments: comments.to_string(),
            emotion,
            instrumentals,
            lyrics,
            overall,
            vocals,
        }
    }

    /// The sub-score for a field. `Overall` is always numeric.
    pub fn score(&self, field: Field) -> Option<Score> {
        match field {
            Field::Instrumentals => Some(self.instrumentals),
            Field::Vocals => Some(self.vocals),
            Field::Lyrics => Some(self.lyrics),
            Field::Emotion => Some(self.emotion),
            Field::Overall => None,
        }
    }
}

/// A named piece of content open for peer rating.
// Field order matches the sorted key order written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Map key in the document; not stored inside the entry object.
    #[serde(skip)]
    pub name: String,
    #[serde(default, deserialize_with = "decimal::deserialize")]
    pub avg_emo: f64,
    #[serde(default, deserialize_with = "decimal::deserialize")]
    pub avg_ins: f64,
    #[serde(default, deserialize_with = "decimal::deserialize")]
    pub avg_lyr: f64,
    #[serde(default, deserialize_with = "decimal::deserialize")]
    pub avg_ovr: f64,
    #[serde(default, deserialize_with = "decimal::deserialize")]
    pub avg_voc: f64,
    pub content: String,
    #[serde(default)]
    pub ratings: BTreeMap<String, Submission>,
}

impl Entry {
    /// A fresh entry with no ratings and zeroed averages.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            avg_emo: 0.0,
            avg_ins: 0.0,
            avg_lyr: 0.0,
            avg_ovr: 0.0,
            avg_voc: 0.0,
            content: content.into(),
            ratings: BTreeMap::new(),
        }
    }

    /// The derived average for a field.
    pub fn average(&self, field: Field) -> f64 {
        match field {
            Field::Instrumentals => self.avg_ins,
            Field::Vocals => self.avg_voc,
            Field::Lyrics => self.avg_lyr,
            Field::Emotion => self.avg_emo,
            Field::Overall => self.avg_ovr,
        }
    }

    /// Pull every average into `[0, MAX_SCORE]`.
    pub fn clamp_averages(&mut self) {
        let max = f64::from(MAX_SCORE);
        for avg in [
            &mut self.avg_emo,
            &mut self.avg_ins,
            &mut self.avg_lyr,
            &mut self.avg_ovr,
            &mut self.avg_voc,
        ] {
            *avg = avg.clamp(0.0, max);
        }
    }

    /// Whether `rater` has already submitted a rating.
    pub fn is_rated_by(&self, rater: &str) -> bool {
        self.ratings.contains_key(rater)
    }
}

/// A rated field, as offered to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Field {
    Instrumentals,
    Vocals,
    Lyrics,
    /// Emotion/Feeling
    Emotion,
    Overall,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Instrumentals,
        Field::Vocals,
        Field::Lyrics,
        Field::Emotion,
        Field::Overall,
    ];

    /// The four fields a rater scores directly.
    pub const SUB_SCORES: [Field; 4] = [
        Field::Instrumentals,
        Field::Vocals,
        Field::Lyrics,
        Field::Emotion,
    ];
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Instrumentals => write!(f, "Instrumentals"),
            Field::Vocals => write!(f, "Vocals"),
            Field::Lyrics => write!(f, "Lyrics"),
            Field::Emotion => write!(f, "Emotion/Feeling"),
            Field::Overall => write!(f, "Overall"),
        }
    }
}

/// Direction of an extremal query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Extreme {
    Highest,
    Lowest,
}

impl fmt::Display for Extreme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extreme::Highest => write!(f, "highest"),
            Extreme::Lowest => write!(f, "lowest"),
        }
    }
}

/// Averages may be stored as JSON numbers or as decimal strings.
mod decimal {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Decimal {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = match Decimal::deserialize(deserializer)? {
            Decimal::Number(n) => n,
            Decimal::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| D::Error::custom(format!("invalid decimal `{}`", s)))?,
        };

        if !value.is_finite() {
            return Err(D::Error::custom(format!("average `{}` is not finite", value)));
        }
        Ok(value)
    }
}
