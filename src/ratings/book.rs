//! The rating book: every entry, its lifecycle, and the queries over it.

use crate::analysis::recompute;
use crate::error::{RatingError, Result};
use crate::models::{Entry, Extreme, Field, RawScores, Submission};
use crate::store::{render, Entries, JsonStore};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Chat platforms cap autocomplete lists at this many choices.
pub const MAX_SUGGESTIONS: usize = 25;

/// In-memory entries backed by a [`JsonStore`].
///
/// Mutations run under one lock: the change is applied to a copy, saved, and
/// only then committed, so a failed save leaves memory as it was.
#[derive(Debug)]
pub struct RatingBook {
    store: JsonStore,
    entries: Mutex<Entries>,
}

impl RatingBook {
    /// Load the book from its store.
    pub fn open(store: JsonStore) -> Result<Self> {
        let entries = store.load()?;
        Ok(Self {
            store,
            entries: Mutex::new(entries),
        })
    }

    /// The backing store.
    pub fn store(&self) -> &JsonStore {
        &self.store
    }

    // The map is only ever replaced wholesale after a successful save, so a
    // poisoned lock still guards a consistent value.
    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mutate<T>(&self, change: impl FnOnce(&mut Entries) -> Result<T>) -> Result<T> {
        let mut entries = self.lock();
        let mut draft = entries.clone();
        let out = change(&mut draft)?;
        self.store.save(&draft)?;
        *entries = draft;
        Ok(out)
    }

    /// Add a new entry with no ratings.
    pub fn create(&self, name: &str, content: &str) -> Result<Entry> {
        let name = name.trim();
        let content = content.trim();

        let entry = self.mutate(|entries| {
            if entries.contains_key(name) {
                return Err(RatingError::DuplicateName(name.to_string()));
            }
            let entry = Entry::new(name, content);
            entries.insert(name.to_string(), entry.clone());
            Ok(entry)
        })?;

        info!("Created entry `{}`", entry.name);
        Ok(entry)
    }

    /// Record `rater`'s vote on an entry, replacing any earlier vote.
    pub fn rate(
        &self,
        name: &str,
        rater: &str,
        scores: &RawScores,
        comments: &str,
    ) -> Result<Entry> {
        let name = name.trim();
        let submission = Submission::from_raw(scores, comments);

        let entry = self.mutate(|entries| {
            let entry = entries
                .get_mut(name)
                .ok_or_else(|| RatingError::EntryNotFound(name.to_string()))?;
            if entry.ratings.insert(rater.to_string(), submission).is_some() {
                debug!("Replacing rating of `{}` by {}", name, rater);
            }
            recompute(entry);
            Ok(entry.clone())
        })?;

        info!(
            "{} rated `{}` ({} ratings)",
            rater,
            entry.name,
            entry.ratings.len()
        );
        Ok(entry)
    }

    /// Remove an entry and all its ratings.
    pub fn drop_entry(&self, name: &str) -> Result<Entry> {
        let name = name.trim();

        let entry = self.mutate(|entries| {
            entries
                .remove(name)
                .ok_or_else(|| RatingError::EntryNotFound(name.to_string()))
        })?;

        info!("Dropped entry `{}`", entry.name);
        Ok(entry)
    }

    /// A copy of one entry.
    pub fn get(&self, name: &str) -> Option<Entry> {
        self.lock().get(name.trim()).cloned()
    }

    /// A copy of every entry.
    pub fn snapshot(&self) -> Entries {
        self.lock().clone()
    }

    /// Entry names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// The entry with the highest or lowest average for `field`.
    ///
    /// Entries are scanned in name order and the first one reaching the
    /// extreme wins a tie. `None` when the book is empty.
    pub fn extremal(&self, field: Field, extreme: Extreme) -> Option<(String, f64)> {
        let entries = self.lock();
        let mut best: Option<(&String, f64)> = None;

        for (name, entry) in entries.iter() {
            let value = entry.average(field);
            let better = match best {
                None => true,
                Some((_, current)) => match extreme {
                    Extreme::Highest => value > current,
                    Extreme::Lowest => value < current,
                },
            };
            if better {
                best = Some((name, value));
            }
        }

        best.map(|(name, value)| (name.clone(), value))
    }

    /// Names of entries `rater` has not rated yet.
    pub fn pending(&self, rater: &str) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(_, entry)| !entry.is_rated_by(rater))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Non-empty comments on an entry, in rater order.
    pub fn comments(&self, name: &str) -> Result<Vec<String>> {
        let name = name.trim();
        let entries = self.lock();
        let entry = entries
            .get(name)
            .ok_or_else(|| RatingError::EntryNotFound(name.to_string()))?;

        Ok(entry
            .ratings
            .values()
            .filter(|s| !s.comments.is_empty())
            .map(|s| s.comments.clone())
            .collect())
    }

    /// Entry names containing `current`, ignoring case.
    pub fn suggest(&self, current: &str) -> Vec<String> {
        let needle = current.to_lowercase();
        self.lock()
            .keys()
            .filter(|name| name.to_lowercase().contains(&needle))
            .take(MAX_SUGGESTIONS)
            .cloned()
            .collect()
    }

    /// Save the current entries and return the document text.
    pub fn export_json(&self) -> Result<String> {
        let entries = self.lock();
        self.store.save(&entries)?;
        render(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn open_book(dir: &TempDir) -> RatingBook {
        RatingBook::open(JsonStore::new(dir.path().join("ratings.json"))).unwrap()
    }

    fn scores(values: [&str; 4]) -> RawScores {
        RawScores::new(values[0], values[1], values[2], values[3])
    }

    #[test]
    fn test_create_trims_and_persists() {
        let dir = TempDir::new().unwrap();
        let book = open_book(&dir);

        let entry = book.create("  SongA ", " http://x ").unwrap();

        assert_eq!(entry.name, "SongA");
        assert_eq!(entry.content, "http://x");
        assert_eq!(entry.avg_ovr, 0.0);
        assert!(entry.ratings.is_empty());

        let reopened = open_book(&dir);
        assert_eq!(reopened.get("SongA"), Some(entry));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let dir = TempDir::new().unwrap();
        let book = open_book(&dir);
        book.create("SongA", "first").unwrap();

        let err = book.create(" SongA", "second").unwrap_err();

        assert!(matches!(err, RatingError::DuplicateName(ref n) if n == "SongA"));
        assert_eq!(book.len(), 1);
        assert_eq!(book.get("SongA").unwrap().content, "first");
    }

    #[test]
    fn test_rate_scenario() {
        let dir = TempDir::new().unwrap();
        let book = open_book(&dir);
        book.create("SongA", "http://x").unwrap();

        let entry = book
            .rate("SongA", "alice", &scores(["5", "4", "N/A", "3"]), "nice")
            .unwrap();

        let alice = &entry.ratings["alice"];
        assert_eq!(alice.overall, 12);
        assert_eq!(alice.comments, "nice");
        assert_eq!(entry.avg_ins, 5.0);
        assert_eq!(entry.avg_voc, 4.0);
        assert_eq!(entry.avg_lyr, 0.0);
        assert_eq!(entry.avg_emo, 3.0);
        assert_eq!(entry.avg_ovr, 5.0);

        assert_eq!(open_book(&dir).get("SongA"), Some(entry));
    }

    #[test]
    fn test_rate_clamps_and_coerces() {
        let dir = TempDir::new().unwrap();
        let book = open_book(&dir);
        book.create("SongA", "").unwrap();

        let entry = book
            .rate("SongA", "bob", &scores(["9", "0", "abc", "2"]), "")
            .unwrap();

        let bob = &entry.ratings["bob"];
        assert_eq!(bob.instrumentals.value(), Some(5));
        assert_eq!(bob.vocals.value(), Some(1));
        assert_eq!(bob.lyrics.value(), None);
        assert_eq!(bob.overall, 8);
    }

    #[test]
    fn test_rerating_overwrites() {
        let dir = TempDir::new().unwrap();
        let book = open_book(&dir);
        book.create("SongA", "").unwrap();
        book.rate("SongA", "alice", &scores(["1", "1", "1", "1"]), "meh")
            .unwrap();

        let entry = book
            .rate("SongA", "alice", &scores(["5", "5", "5", "5"]), "")
            .unwrap();

        assert_eq!(entry.ratings.len(), 1);
        assert_eq!(entry.avg_ins, 5.0);
        assert!(book.comments("SongA").unwrap().is_empty());
    }

    #[test]
    fn test_rate_unknown_entry() {
        let dir = TempDir::new().unwrap();
        let book = open_book(&dir);

        let err = book
            .rate("Nope", "alice", &scores(["1", "1", "1", "1"]), "")
            .unwrap_err();

        assert!(matches!(err, RatingError::EntryNotFound(_)));
        assert!(book.is_empty());
    }

    #[test]
    fn test_failed_save_leaves_memory_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ratings.json");
        let book = RatingBook::open(JsonStore::new(&path)).unwrap();
        book.create("SongA", "").unwrap();

        // A directory at the target path makes the rename fail.
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        let err = book.create("SongB", "").unwrap_err();
        assert!(matches!(err, RatingError::Persistence { .. }));
        assert_eq!(book.names(), vec!["SongA".to_string()]);

        let err = book
            .rate("SongA", "alice", &scores(["5", "5", "5", "5"]), "")
            .unwrap_err();
        assert!(matches!(err, RatingError::Persistence { .. }));
        assert!(book.get("SongA").unwrap().ratings.is_empty());
    }

    #[test]
    fn test_drop_entry() {
        let dir = TempDir::new().unwrap();
        let book = open_book(&dir);
        book.create("SongA", "").unwrap();

        book.drop_entry("SongA").unwrap();

        assert!(book.is_empty());
        assert!(open_book(&dir).is_empty());
        assert!(matches!(
            book.drop_entry("SongA"),
            Err(RatingError::EntryNotFound(_))
        ));
    }

    #[test]
    fn test_extremal_tie_break() {
        let dir = TempDir::new().unwrap();
        let book = open_book(&dir);
        book.create("A", "").unwrap();
        book.create("B", "").unwrap();
        book.create("C", "").unwrap();
        // avg_ovr: A = 3, B = 5, C = 5
        book.rate("A", "x", &scores(["1", "1", "1", "N/A"]), "").unwrap();
        book.rate("B", "x", &scores(["2", "2", "1", "N/A"]), "").unwrap();
        book.rate("C", "x", &scores(["5", "5", "5", "5"]), "").unwrap();

        assert_eq!(
            book.extremal(Field::Overall, Extreme::Highest),
            Some(("B".to_string(), 5.0))
        );
        assert_eq!(
            book.extremal(Field::Overall, Extreme::Lowest),
            Some(("A".to_string(), 3.0))
        );
        assert_eq!(
            book.extremal(Field::Instrumentals, Extreme::Highest),
            Some(("C".to_string(), 5.0))
        );
    }

    #[test]
    fn test_extremal_ignores_inflated_stored_averages() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("ratings.json"),
            r#"{"SongA": {"content": "x", "avg_ovr": "20", "ratings": {"alice": {
                "Instrumentals": 5, "Vocals": 5, "Lyrics": 5,
                "Emotion/Feeling": 5, "Overall": 20, "Comments": ""}}}}"#,
        )
        .unwrap();
        let book = open_book(&dir);

        assert_eq!(
            book.extremal(Field::Overall, Extreme::Highest),
            Some(("SongA".to_string(), 5.0))
        );
    }

    #[test]
    fn test_extremal_empty_book() {
        let dir = TempDir::new().unwrap();
        let book = open_book(&dir);
        assert_eq!(book.extremal(Field::Vocals, Extreme::Lowest), None);
    }

    #[test]
    fn test_pending_and_comments() {
        let dir = TempDir::new().unwrap();
        let book = open_book(&dir);
        book.create("A", "").unwrap();
        book.create("B", "").unwrap();
        book.rate("A", "alice", &scores(["3", "3", "3", "3"]), "good")
            .unwrap();
        book.rate("A", "bob", &scores(["3", "3", "3", "3"]), "").unwrap();
        book.rate("A", "carol", &scores(["3", "3", "3", "3"]), "fine")
            .unwrap();

        assert_eq!(book.pending("alice"), vec!["B".to_string()]);
        assert_eq!(book.pending("dave"), vec!["A".to_string(), "B".to_string()]);
        assert_eq!(
            book.comments("A").unwrap(),
            vec!["good".to_string(), "fine".to_string()]
        );
        assert!(matches!(
            book.comments("Z"),
            Err(RatingError::EntryNotFound(_))
        ));
    }

    #[test]
    fn test_suggest_is_case_insensitive_and_capped() {
        let dir = TempDir::new().unwrap();
        let book = open_book(&dir);
        for i in 0..30 {
            book.create(&format!("Song {:02}", i), "").unwrap();
        }
        book.create("Ballad", "").unwrap();

        assert_eq!(book.suggest("song").len(), MAX_SUGGESTIONS);
        assert_eq!(book.suggest("BALL"), vec!["Ballad".to_string()]);
    }

    #[test]
    fn test_export_json() {
        let dir = TempDir::new().unwrap();
        let book = open_book(&dir);
        book.create("SongA", "http://x").unwrap();

        let document = book.export_json().unwrap();

        assert!(document.contains("\"SongA\""));
        assert_eq!(
            fs::read_to_string(book.store().path()).unwrap(),
            document
        );
    }
}
