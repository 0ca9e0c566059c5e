use log::{info, warn};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::analytics::track_user_engagement;
use crate::api::PollStore;
use crate::voting::ballot::VoteList;

pub const COMPLETED_EVENT: &str = "shared_poll_completed";
pub const PARTIAL_RESULTS_EVENT: &str = "shared_poll_partial_results";

/// Submits shared poll answers in the background. The voting flow never
/// waits on it; the handle resolves to whether the store accepted the votes.
/// `event` names the engagement event recorded once the store has answered.
pub fn spawn_submission(
    store: Arc<dyn PollStore>,
    poll_id: String,
    participant_name: String,
    votes: VoteList,
    event: &'static str,
) -> JoinHandle<bool> {
    tokio::spawn(async move {
        let submitted = match store
            .submit_responses(&poll_id, &participant_name, votes.as_slice())
            .await
        {
            Ok(()) => {
                info!("Submitted {} responses for poll {}", votes.len(), poll_id);
                true
            }
            Err(e) => {
                warn!(
                    "Failed to submit responses for poll {}, keeping local results only: {}",
                    poll_id, e
                );
                false
            }
        };

        track_user_engagement(
            event,
            Some(&format!(
                "poll_id: {}, votes: {}, submitted: {}",
                poll_id,
                votes.len(),
                submitted
            )),
        );
        submitted
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VoteResponse;
    use crate::test_support::FakeBackend;

    fn votes() -> VoteList {
        let mut votes = VoteList::new();
        votes.upsert(0, VoteResponse::Agree);
        votes.upsert(1, VoteResponse::Skip);
        votes
    }

    #[tokio::test]
    async fn successful_submission_reaches_the_store() {
        let backend = Arc::new(FakeBackend::default());
        let handle = spawn_submission(
            backend.clone(),
            "p1".into(),
            "Robin".into(),
            votes(),
            COMPLETED_EVENT,
        );
        assert!(handle.await.unwrap());

        let submissions = backend.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].0, "p1");
        assert_eq!(submissions[0].1, "Robin");
        assert_eq!(submissions[0].2.len(), 2);
    }

    #[tokio::test]
    async fn failed_submission_resolves_false() {
        let backend = Arc::new(FakeBackend {
            fail_submissions: true,
            ..FakeBackend::default()
        });
        let handle = spawn_submission(
            backend.clone(),
            "p1".into(),
            String::new(),
            votes(),
            PARTIAL_RESULTS_EVENT,
        );
        assert!(!handle.await.unwrap());
        assert!(backend.submissions().is_empty());
    }
}
