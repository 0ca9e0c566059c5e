use async_trait::async_trait;
use std::sync::Mutex;

use crate::api::{PollStore, TopicService};
use crate::error::ApiError;
use crate::models::{
    AggregateResult, Cluster, ParticipantStatus, SharedPoll, Statement, Topic, TopicMetadata,
    TopicRequest, Vote,
};

pub fn sample_topic() -> Topic {
    Topic {
        title: "Springfield Transit".to_string(),
        description: "Getting around town".to_string(),
        main_theme: Some("How should Springfield move?".to_string()),
        statements: vec![
            Statement {
                text: "Add bus lanes downtown".to_string(),
                category: "transit".to_string(),
                expected_cluster: "Transit First".to_string(),
            },
            Statement {
                text: "Build more parking garages".to_string(),
                category: "parking".to_string(),
                expected_cluster: "Drivers".to_string(),
            },
            Statement {
                text: "Make buses free".to_string(),
                category: "transit".to_string(),
                expected_cluster: "Transit First".to_string(),
            },
        ],
        expected_clusters: vec![
            Cluster {
                name: "Transit First".to_string(),
                description: "Prioritise buses and bikes".to_string(),
            },
            Cluster {
                name: "Drivers".to_string(),
                description: "Keep cars moving".to_string(),
            },
        ],
        metadata: TopicMetadata {
            generation_method: Some("demo".to_string()),
            ..TopicMetadata::default()
        },
    }
}

pub fn sample_shared_poll(poll_id: &str) -> SharedPoll {
    SharedPoll {
        poll_id: poll_id.to_string(),
        topic: sample_topic(),
        created_at: None,
        creator_name: Some("Sam".to_string()),
    }
}

fn unavailable() -> ApiError {
    ApiError::Status {
        status: 503,
        body: "service unavailable".to_string(),
    }
}

/// In-memory stand-in for the polling backend.
#[derive(Default)]
pub struct FakeBackend {
    pub topic: Option<Topic>,
    pub shared_poll: Option<SharedPoll>,
    pub participant: ParticipantStatus,
    pub aggregate: Option<AggregateResult>,
    pub fail_submissions: bool,
    pub fail_saves: bool,
    pub topic_requests: Mutex<Vec<TopicRequest>>,
    pub saved: Mutex<Vec<(Topic, String)>>,
    pub submitted: Mutex<Vec<(String, String, Vec<Vote>)>>,
}

impl FakeBackend {
    pub fn submissions(&self) -> Vec<(String, String, Vec<Vote>)> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl TopicService for FakeBackend {
    async fn generate(&self, request: &TopicRequest) -> Result<Topic, ApiError> {
        self.topic_requests.lock().unwrap().push(request.clone());
        self.topic.clone().ok_or_else(unavailable)
    }
}

#[async_trait]
impl PollStore for FakeBackend {
    async fn save(&self, topic: &Topic, creator_name: &str) -> Result<String, ApiError> {
        if self.fail_saves {
            return Err(unavailable());
        }
        let mut saved = self.saved.lock().unwrap();
        saved.push((topic.clone(), creator_name.to_string()));
        Ok(format!("poll-{}", saved.len()))
    }

    async fn fetch(&self, poll_id: &str) -> Result<SharedPoll, ApiError> {
        match &self.shared_poll {
            Some(poll) if poll.poll_id == poll_id => Ok(poll.clone()),
            _ => Err(ApiError::NotFound),
        }
    }

    async fn submit_responses(
        &self,
        poll_id: &str,
        participant_name: &str,
        votes: &[Vote],
    ) -> Result<(), ApiError> {
        if self.fail_submissions {
            return Err(unavailable());
        }
        self.submitted.lock().unwrap().push((
            poll_id.to_string(),
            participant_name.to_string(),
            votes.to_vec(),
        ));
        Ok(())
    }

    async fn check_participant(
        &self,
        _poll_id: &str,
        _name: &str,
    ) -> Result<ParticipantStatus, ApiError> {
        Ok(self.participant.clone())
    }

    async fn fetch_aggregate(&self, _poll_id: &str) -> Result<AggregateResult, ApiError> {
        self.aggregate.clone().ok_or_else(unavailable)
    }
}
