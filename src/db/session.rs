use log::warn;

use crate::db::SessionStore;
use crate::error::StorageError;
use crate::models::Topic;
use crate::voting::ballot::VoteList;

pub const ANONYMOUS: &str = "Anonymous";

/// The respondent's browsing state, loaded when a page is entered and
/// written back at the transitions that change it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub topic: Option<Topic>,
    pub votes: VoteList,
    pub user_name: Option<String>,
}

impl Session {
    /// Unreadable values are dropped with a warning, so a corrupt entry
    /// behaves like a missing one.
    pub async fn load(store: &SessionStore) -> Result<Self, StorageError> {
        let topic = match store.load_topic().await {
            Ok(topic) => topic,
            Err(StorageError::Serde { key, source }) => {
                warn!("Ignoring unreadable session value '{}': {}", key, source);
                None
            }
            Err(e) => return Err(e),
        };

        let votes = match store.load_votes().await {
            Ok(votes) => votes.unwrap_or_default(),
            Err(StorageError::Serde { key, source }) => {
                warn!("Ignoring unreadable session value '{}': {}", key, source);
                VoteList::new()
            }
            Err(e) => return Err(e),
        };

        let user_name = store.load_user_name().await?;

        Ok(Self {
            topic,
            votes,
            user_name,
        })
    }

    pub fn display_name(&self) -> &str {
        match self.user_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => ANONYMOUS,
        }
    }

    /// Saves everything a finished poll leaves behind for the results page.
    pub async fn save_completed(&self, store: &SessionStore) -> Result<(), StorageError> {
        if let Some(topic) = &self.topic {
            store.save_topic(topic).await?;
        }
        store.save_votes(&self.votes).await?;
        store
            .save_user_name(self.user_name.as_deref().unwrap_or_default())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CURRENT_TOPIC_KEY, POLL_VOTES_KEY};
    use crate::models::VoteResponse;
    use crate::test_support::sample_topic;

    #[tokio::test]
    async fn empty_store_loads_empty_session() {
        let store = SessionStore::in_memory().await.unwrap();
        let session = Session::load(&store).await.unwrap();
        assert_eq!(session, Session::default());
        assert_eq!(session.display_name(), ANONYMOUS);
    }

    #[tokio::test]
    async fn completed_session_round_trips() {
        let store = SessionStore::in_memory().await.unwrap();
        let mut votes = VoteList::new();
        votes.upsert(0, VoteResponse::Agree);
        let session = Session {
            topic: Some(sample_topic()),
            votes,
            user_name: Some("Robin".to_string()),
        };
        session.save_completed(&store).await.unwrap();

        let loaded = Session::load(&store).await.unwrap();
        assert_eq!(loaded, session);
        assert_eq!(loaded.display_name(), "Robin");
    }

    #[tokio::test]
    async fn corrupt_values_load_as_missing() {
        let store = SessionStore::in_memory().await.unwrap();
        store.set_item(CURRENT_TOPIC_KEY, "[]").await.unwrap();
        store.set_item(POLL_VOTES_KEY, "oops").await.unwrap();
        store.save_user_name("   ").await.unwrap();

        let session = Session::load(&store).await.unwrap();
        assert!(session.topic.is_none());
        assert!(session.votes.is_empty());
        assert_eq!(session.display_name(), ANONYMOUS);
    }
}
