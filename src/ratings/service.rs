//! Command-facing operations: the rating book plus its collaborators.

use crate::error::{RatingError, Result};
use crate::models::{Entry, RawScores};
use crate::notify::Notifier;
use crate::ratings::book::RatingBook;
use crate::ratings::identity::IdentityProvider;
use crate::report::new_entry_announcement;
use tracing::{info, warn};

/// Who may run destructive commands.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    /// Identities that may not drop entries.
    pub drop_deny: Vec<String>,
}

impl AccessPolicy {
    pub fn can_drop(&self, identity: &str) -> bool {
        !self.drop_deny.iter().any(|denied| denied == identity)
    }
}

/// Result of submitting a new entry.
#[derive(Debug)]
pub struct Created {
    /// The persisted entry.
    pub entry: Entry,
    /// Outcome of the announcement; a link to it when the sink returns one.
    pub notification: Result<Option<String>>,
}

/// Rating operations as invoked by chat commands.
///
/// New entries are saved before they are announced; a failed announcement
/// never undoes the save.
pub struct RatingService<N> {
    book: RatingBook,
    notifier: N,
    channel: String,
    policy: AccessPolicy,
}

impl<N: Notifier> RatingService<N> {
    pub fn new(
        book: RatingBook,
        notifier: N,
        channel: impl Into<String>,
        policy: AccessPolicy,
    ) -> Self {
        Self {
            book,
            notifier,
            channel: channel.into(),
            policy,
        }
    }

    /// Read access for queries.
    pub fn book(&self) -> &RatingBook {
        &self.book
    }

    /// Submit new content for rating and announce it.
    pub async fn submit_new(
        &self,
        caller: &impl IdentityProvider,
        name: &str,
        content: &str,
    ) -> Result<Created> {
        let submitter = caller.rater_identity();
        let entry = self.book.create(name, content)?;

        let message = new_entry_announcement(&submitter, &entry.name, &entry.content);
        let notification = self.notifier.notify(&self.channel, &message).await;
        if let Err(ref e) = notification {
            warn!("Entry `{}` saved but not announced: {}", entry.name, e);
        }

        Ok(Created {
            entry,
            notification,
        })
    }

    /// Record the caller's rating of an entry.
    pub fn submit_rating(
        &self,
        caller: &impl IdentityProvider,
        name: &str,
        scores: &RawScores,
        comments: &str,
    ) -> Result<Entry> {
        self.book.rate(name, &caller.rater_identity(), scores, comments)
    }

    /// Entries the caller has not rated yet.
    pub fn pending(&self, caller: &impl IdentityProvider) -> Vec<String> {
        self.book.pending(&caller.rater_identity())
    }

    /// Drop an entry, unless the caller is denied.
    pub fn drop_entry(&self, caller: &impl IdentityProvider, name: &str) -> Result<Entry> {
        let identity = caller.rater_identity();
        if !self.policy.can_drop(&identity) {
            info!("Refused drop of `{}` by {}", name.trim(), identity);
            return Err(RatingError::Forbidden(identity));
        }
        self.book.drop_entry(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratings::identity::StaticIdentity;
    use crate::store::JsonStore;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records posts, or fails every post when `fail` is set.
    #[derive(Default)]
    struct RecordingNotifier {
        posts: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl Notifier for RecordingNotifier {
        async fn notify(&self, channel: &str, message: &str) -> Result<Option<String>> {
            if self.fail {
                return Err(RatingError::MissingCollaboratorChannel(channel.to_string()));
            }
            self.posts
                .lock()
                .unwrap()
                .push((channel.to_string(), message.to_string()));
            Ok(Some("https://chat.example/m/1".to_string()))
        }
    }

    fn service(dir: &TempDir, notifier: RecordingNotifier) -> RatingService<RecordingNotifier> {
        let book = RatingBook::open(JsonStore::new(dir.path().join("ratings.json"))).unwrap();
        let policy = AccessPolicy {
            drop_deny: vec!["mallory".to_string()],
        };
        RatingService::new(book, notifier, "music-ratings", policy)
    }

    #[tokio::test]
    async fn test_submit_new_announces_after_saving() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir, RecordingNotifier::default());
        let alice = StaticIdentity::new("alice");

        let created = svc.submit_new(&alice, "SongA", "http://x").await.unwrap();

        assert_eq!(created.entry.name, "SongA");
        assert_eq!(
            created.notification.unwrap().as_deref(),
            Some("https://chat.example/m/1")
        );
        let posts = svc.notifier.posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, "music-ratings");
        assert!(posts[0].1.contains("alice"));
        assert!(posts[0].1.contains("SongA"));
    }

    #[tokio::test]
    async fn test_failed_announcement_keeps_entry() {
        let dir = TempDir::new().unwrap();
        let notifier = RecordingNotifier {
            fail: true,
            ..Default::default()
        };
        let svc = service(&dir, notifier);
        let alice = StaticIdentity::new("alice");

        let created = svc.submit_new(&alice, "SongA", "http://x").await.unwrap();

        assert!(matches!(
            created.notification,
            Err(RatingError::MissingCollaboratorChannel(_))
        ));
        let reopened =
            RatingBook::open(JsonStore::new(dir.path().join("ratings.json"))).unwrap();
        assert!(reopened.get("SongA").is_some());
    }

    #[tokio::test]
    async fn test_duplicate_is_not_announced() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir, RecordingNotifier::default());
        let alice = StaticIdentity::new("alice");
        svc.submit_new(&alice, "SongA", "first").await.unwrap();

        let err = svc.submit_new(&alice, "SongA", "second").await.unwrap_err();

        assert!(matches!(err, RatingError::DuplicateName(_)));
        assert_eq!(svc.notifier.posts.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_rating_and_pending_use_caller_identity() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir, RecordingNotifier::default());
        let bob = StaticIdentity::new("bob");
        svc.book().create("SongA", "").unwrap();
        svc.book().create("SongB", "").unwrap();

        svc.submit_rating(&bob, "SongA", &RawScores::new("4", "4", "4", "4"), "ok")
            .unwrap();

        assert!(svc.book().get("SongA").unwrap().is_rated_by("bob"));
        assert_eq!(svc.pending(&bob), vec!["SongB".to_string()]);
    }

    #[test]
    fn test_drop_deny_list() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir, RecordingNotifier::default());
        svc.book().create("SongA", "").unwrap();

        let err = svc
            .drop_entry(&StaticIdentity::new("mallory"), "SongA")
            .unwrap_err();
        assert!(matches!(err, RatingError::Forbidden(_)));
        assert_eq!(svc.book().len(), 1);

        svc.drop_entry(&StaticIdentity::new("alice"), "SongA")
            .unwrap();
        assert!(svc.book().is_empty());
    }
}
