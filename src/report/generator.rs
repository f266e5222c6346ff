//! Text and JSON views of the rating book.
//!
//! Everything here is read-only formatting over entries handed in by the
//! caller.

use crate::error::Result;
use crate::models::{Entry, Extreme, Field, MAX_SCORE};
use crate::store::Entries;
use serde::Serialize;

/// Default label width for chart rows.
pub const DEFAULT_LABEL_WIDTH: usize = 12;

/// One bar of a chart: entry name and its average for the charted field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRow {
    pub label: String,
    pub value: f64,
}

/// Flat view of one entry for display.
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    pub name: String,
    pub content: String,
    pub ratings: usize,
    pub instrumentals: f64,
    pub vocals: f64,
    pub lyrics: f64,
    pub emotion: f64,
    pub overall: f64,
}

impl From<&Entry> for EntrySummary {
    fn from(entry: &Entry) -> Self {
        Self {
            name: entry.name.clone(),
            content: entry.content.clone(),
            ratings: entry.ratings.len(),
            instrumentals: entry.avg_ins,
            vocals: entry.avg_voc,
            lyrics: entry.avg_lyr,
            emotion: entry.avg_emo,
            overall: entry.avg_ovr,
        }
    }
}

/// Format an average with at most two decimals and no trailing zeros.
pub fn format_average(value: f64) -> String {
    let s = format!("{:.2}", value);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Announcement posted when new content is submitted.
pub fn new_entry_announcement(submitter: &str, name: &str, content: &str) -> String {
    format!(
        "{} has submitted `{}` for rating by you, their peers!\n\t\t{}\nTo rate this content, please use the `/rating submit {}` command.",
        submitter, name, content, name
    )
}

/// Answer to a highest/lowest query.
pub fn stats_sentence(extreme: Extreme, field: Field, result: Option<&(String, f64)>) -> String {
    match result {
        Some((name, value)) => format!(
            "The submission with the {} `{}` score is `{}` at `{}`!",
            extreme,
            field,
            name,
            format_average(*value)
        ),
        None => "There are no submissions to compare yet.".to_string(),
    }
}

/// All comments on an entry.
pub fn comments_text(name: &str, comments: &[String]) -> String {
    if comments.is_empty() {
        return format!("Nobody has commented on {} yet.", name);
    }
    format!(
        "Here is what people are saying about {}:\n\n\t{}",
        name,
        comments.join("\n\t")
    )
}

/// Entries a rater still has to rate.
pub fn pending_text(rater: &str, names: &[String]) -> String {
    if names.is_empty() {
        return format!("{} has rated every submission.", rater);
    }
    let mut text = format!("{} has not rated yet:\n", rater);
    for name in names {
        text.push_str(&format!("\t{}\n", name));
    }
    text
}

/// Averages and rating count of one entry.
pub fn entry_summary(entry: &Entry) -> String {
    let mut text = String::new();

    text.push_str(&format!("`{}`: {}\n", entry.name, entry.content));
    text.push_str(&format!("Ratings: {}\n", entry.ratings.len()));
    for field in Field::ALL {
        text.push_str(&format!(
            "  {:<16} {}\n",
            field.to_string(),
            format_average(entry.average(field))
        ));
    }

    text
}

/// Greedy word wrap. Words longer than `width` get a line of their own.
pub fn wrap_label(label: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in label.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines.join("\n")
}

/// One chart row per entry, in name order.
pub fn chart_rows(entries: &Entries, field: Field, width: usize) -> Vec<ChartRow> {
    entries
        .values()
        .map(|entry| ChartRow {
            label: wrap_label(&entry.name, width),
            value: entry.average(field),
        })
        .collect()
}

/// Render rows as a horizontal text bar chart scaled to `bar_width`.
pub fn render_chart(field: Field, rows: &[ChartRow], bar_width: usize) -> String {
    let mut chart = format!("Average {} score\n\n", field);

    if rows.is_empty() {
        chart.push_str("(no submissions)\n");
        return chart;
    }

    let label_width = rows
        .iter()
        .flat_map(|r| r.label.lines())
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0);

    for row in rows {
        let filled = ((row.value / f64::from(MAX_SCORE)) * bar_width as f64).round() as usize;
        let bar = "█".repeat(filled.min(bar_width));

        for (i, line) in row.label.lines().enumerate() {
            if i == 0 {
                chart.push_str(&format!(
                    "{:<lw$} | {} {}\n",
                    line,
                    bar,
                    format_average(row.value),
                    lw = label_width
                ));
            } else {
                chart.push_str(&format!("{:<lw$} |\n", line, lw = label_width));
            }
        }
    }

    chart
}

/// Pretty JSON for any view.
pub fn generate_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}
