use async_trait::async_trait;
use log::{info, warn};
use reqwest::{Client, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::api::{PollStore, TopicService};
use crate::db::ANONYMOUS;
use crate::error::ApiError;
use crate::models::{AggregateResult, ParticipantStatus, SharedPoll, Topic, TopicRequest, Vote};

/// HTTP client for the polling backend, which serves both the topic
/// service and the poll store.
#[derive(Clone)]
pub struct HttpApi {
    http: Client,
    base: Url,
}

#[derive(Serialize)]
struct SavePollRequest<'a> {
    topic: &'a Topic,
    creator_name: &'a str,
}

#[derive(Deserialize)]
struct SavePollResponse {
    poll_id: String,
}

#[derive(Serialize)]
struct SubmitResponsesRequest<'a> {
    poll_id: &'a str,
    participant_name: &'a str,
    responses: &'a [Vote],
}

impl HttpApi {
    pub fn new(base: Url) -> Self {
        Self {
            http: Client::new(),
            base,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidRequest(format!("'{}' is not a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn poll_endpoint(&self, poll_id: &str, rest: &[&str]) -> Result<Url, ApiError> {
        let poll_id = poll_id.trim();
        if poll_id.is_empty() {
            return Err(ApiError::InvalidRequest("poll id is empty".to_string()));
        }
        let mut segments = vec!["poll", poll_id];
        segments.extend_from_slice(rest);
        self.endpoint(&segments)
    }

    async fn send_json<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<Response, ApiError> {
        self.http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(ApiError::Unavailable)
    }

    async fn get(&self, url: Url) -> Result<Response, ApiError> {
        self.http.get(url).send().await.map_err(ApiError::Unavailable)
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn read_json<T: DeserializeOwned>(response: Response, context: &'static str) -> Result<T, ApiError> {
    let body = response.text().await.map_err(ApiError::Unavailable)?;
    serde_json::from_str(&body).map_err(|e| ApiError::decode(context, e))
}

#[async_trait]
impl TopicService for HttpApi {
    async fn generate(&self, request: &TopicRequest) -> Result<Topic, ApiError> {
        if request.community_context.location.trim().is_empty() {
            return Err(ApiError::InvalidRequest("location is required".to_string()));
        }
        info!(
            "Requesting topic for '{}' (domain: {})",
            request.community_context.location,
            request.topic_domain.as_deref().unwrap_or("auto")
        );

        let url = self.endpoint(&["generate-topic"])?;
        let response = check_status(self.send_json(url, request).await?).await?;
        read_json(response, "generated topic").await
    }
}

#[async_trait]
impl PollStore for HttpApi {
    async fn save(&self, topic: &Topic, creator_name: &str) -> Result<String, ApiError> {
        let creator_name = match creator_name.trim() {
            "" => ANONYMOUS,
            name => name,
        };
        let url = self.endpoint(&["save-poll"])?;
        let body = SavePollRequest { topic, creator_name };
        let response = check_status(self.send_json(url, &body).await?).await?;
        let saved: SavePollResponse = read_json(response, "saved poll").await?;
        info!("Saved poll '{}' as {}", topic.title, saved.poll_id);
        Ok(saved.poll_id)
    }

    async fn fetch(&self, poll_id: &str) -> Result<SharedPoll, ApiError> {
        let url = self.poll_endpoint(poll_id, &[])?;
        let response = self.get(url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            warn!("Shared poll {} not found", poll_id);
            return Err(ApiError::NotFound);
        }
        let response = check_status(response).await?;
        read_json(response, "shared poll").await
    }

    async fn submit_responses(
        &self,
        poll_id: &str,
        participant_name: &str,
        votes: &[Vote],
    ) -> Result<(), ApiError> {
        let participant_name = match participant_name.trim() {
            "" => ANONYMOUS,
            name => name,
        };
        let url = self.poll_endpoint(poll_id, &["responses"])?;
        let body = SubmitResponsesRequest {
            poll_id,
            participant_name,
            responses: votes,
        };
        check_status(self.send_json(url, &body).await?).await?;
        Ok(())
    }

    async fn check_participant(
        &self,
        poll_id: &str,
        name: &str,
    ) -> Result<ParticipantStatus, ApiError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(ParticipantStatus::default());
        }
        let url = self.poll_endpoint(poll_id, &["participant", name])?;
        let response = check_status(self.get(url).await?).await?;
        read_json(response, "participant status").await
    }

    async fn fetch_aggregate(&self, poll_id: &str) -> Result<AggregateResult, ApiError> {
        let url = self.poll_endpoint(poll_id, &["results"])?;
        let response = check_status(self.get(url).await?).await?;
        let body = response.text().await.map_err(ApiError::Unavailable)?;
        AggregateResult::decode(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> HttpApi {
        HttpApi::new(Url::parse(base).unwrap())
    }

    #[test]
    fn endpoints_join_onto_base_path() {
        let api = client("https://polls.example.com/api/");
        let url = api.endpoint(&["generate-topic"]).unwrap();
        assert_eq!(url.as_str(), "https://polls.example.com/api/generate-topic");

        let api = client("http://localhost:8001");
        let url = api.poll_endpoint("abc", &["responses"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8001/poll/abc/responses");
    }

    #[test]
    fn participant_names_are_percent_encoded() {
        let api = client("http://localhost:8001");
        let url = api.poll_endpoint("abc", &["participant", "Jo Anne/B"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8001/poll/abc/participant/Jo%20Anne%2FB"
        );
    }

    #[test]
    fn empty_poll_id_is_rejected() {
        let api = client("http://localhost:8001");
        assert!(matches!(
            api.poll_endpoint("  ", &[]),
            Err(ApiError::InvalidRequest(_))
        ));
    }

    #[test]
    fn submission_body_matches_the_store_format() {
        let votes = vec![Vote {
            statement_index: 2,
            response: crate::models::VoteResponse::Skip,
        }];
        let body = SubmitResponsesRequest {
            poll_id: "abc",
            participant_name: "Robin",
            responses: &votes,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "poll_id": "abc",
                "participant_name": "Robin",
                "responses": [{"statementIndex": 2, "response": "skip"}]
            })
        );
    }

    #[tokio::test]
    async fn blank_names_skip_the_participant_lookup() {
        // Unroutable base: a request would fail, so Ok proves none was sent
        let api = client("http://127.0.0.1:9");
        let status = api.check_participant("abc", "   ").await.unwrap();
        assert!(!status.has_responded);
    }

    #[tokio::test]
    async fn missing_location_is_rejected_before_sending() {
        let api = client("http://127.0.0.1:9");
        let request = TopicRequest::new(crate::models::CommunityContext::new(" ", None), None);
        assert!(matches!(
            api.generate(&request).await,
            Err(ApiError::InvalidRequest(_))
        ));
    }
}
