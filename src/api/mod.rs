mod client;

pub use client::HttpApi;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::models::{AggregateResult, ParticipantStatus, SharedPoll, Topic, TopicRequest, Vote};

/// Generates discussion topics for a community.
#[async_trait]
pub trait TopicService: Send + Sync {
    async fn generate(&self, request: &TopicRequest) -> Result<Topic, ApiError>;
}

/// Server-side storage for shareable polls and their responses.
#[async_trait]
pub trait PollStore: Send + Sync {
    /// Persists a topic for sharing and returns its poll id.
    async fn save(&self, topic: &Topic, creator_name: &str) -> Result<String, ApiError>;

    async fn fetch(&self, poll_id: &str) -> Result<SharedPoll, ApiError>;

    async fn submit_responses(
        &self,
        poll_id: &str,
        participant_name: &str,
        votes: &[Vote],
    ) -> Result<(), ApiError>;

    async fn check_participant(
        &self,
        poll_id: &str,
        name: &str,
    ) -> Result<ParticipantStatus, ApiError>;

    async fn fetch_aggregate(&self, poll_id: &str) -> Result<AggregateResult, ApiError>;
}
