use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub text: String,
    pub category: String,
    pub expected_cluster: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Free-form metadata attached to a topic. The fields the client reads are
/// typed, everything else the service sends is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_id: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_shared_poll: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_theme: Option<String>,
    pub statements: Vec<Statement>,
    pub expected_clusters: Vec<Cluster>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: TopicMetadata,
}

impl Topic {
    pub fn cluster(&self, name: &str) -> Option<&Cluster> {
        self.expected_clusters.iter().find(|cluster| cluster.name == name)
    }

    /// Poll id of the shared poll this topic was taken from, if any.
    pub fn shared_poll_id(&self) -> Option<&str> {
        if self.metadata.is_shared_poll {
            self.metadata.poll_id.as_deref()
        } else {
            None
        }
    }
}

/// A topic persisted by the poll store under a shareable id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedPoll {
    pub poll_id: String,
    #[serde(flatten)]
    pub topic: Topic,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_name: Option<String>,
}

impl SharedPoll {
    /// The topic as it is kept in the session once the poll has been taken,
    /// tagged so the results page knows to ask for community aggregates.
    pub fn into_session_topic(self) -> Topic {
        let mut topic = self.topic;
        topic.metadata.poll_id = Some(self.poll_id);
        topic.metadata.is_shared_poll = true;
        topic
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteResponse {
    Agree,
    Disagree,
    Skip,
}

impl VoteResponse {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteResponse::Agree => "agree",
            VoteResponse::Disagree => "disagree",
            VoteResponse::Skip => "skip",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VoteResponse::Agree => "Agree",
            VoteResponse::Disagree => "Disagree",
            VoteResponse::Skip => "Skip",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub statement_index: usize,
    pub response: VoteResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityContext {
    pub location: String,
    pub population_size: Option<u64>,
    #[serde(default)]
    pub current_issues: Vec<String>,
    #[serde(default)]
    pub previous_topics: Vec<String>,
}

impl CommunityContext {
    pub fn new(location: impl Into<String>, population_size: Option<u64>) -> Self {
        Self {
            location: location.into(),
            population_size,
            current_issues: Vec::new(),
            previous_topics: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRequest {
    pub community_context: CommunityContext,
    pub topic_domain: Option<String>,
}

impl TopicRequest {
    /// "auto" leaves the domain choice to the service.
    pub fn new(community_context: CommunityContext, topic_domain: Option<&str>) -> Self {
        let topic_domain = topic_domain
            .map(str::trim)
            .filter(|domain| !domain.is_empty() && *domain != "auto")
            .map(str::to_string);
        Self {
            community_context,
            topic_domain,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantStatus {
    pub has_responded: bool,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_taken: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseTally {
    #[serde(default)]
    pub agree: u32,
    #[serde(default)]
    pub disagree: u32,
    #[serde(default)]
    pub skip: u32,
}

impl ResponseTally {
    pub fn record(&mut self, response: VoteResponse) {
        match response {
            VoteResponse::Agree => self.agree += 1,
            VoteResponse::Disagree => self.disagree += 1,
            VoteResponse::Skip => self.skip += 1,
        }
    }

    #[cfg(test)]
    pub fn total(&self) -> u32 {
        self.agree + self.disagree + self.skip
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterAgreement {
    pub cluster_name: String,
    pub cluster_description: String,
    pub agreement_percentage: f64,
    pub responses: ResponseTally,
}

/// Community-wide statistics for a shared poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub total_participants: u32,
    /// Response counts keyed by statement index.
    pub response_summary: BTreeMap<usize, ResponseTally>,
    pub per_cluster_agreement: Vec<ClusterAgreement>,
}

#[derive(Debug, Deserialize)]
struct AggregatePayload {
    total_participants: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    response_summary: BTreeMap<usize, ResponseTally>,
    #[serde(default, deserialize_with = "null_as_default")]
    cluster_analysis: Vec<ClusterAnalysisPayload>,
}

#[derive(Debug, Deserialize)]
struct ClusterAnalysisPayload {
    cluster_name: String,
    #[serde(default)]
    cluster_description: Option<String>,
    agreement_percentage: f64,
    #[serde(default)]
    responses: ResponseTally,
}

impl AggregateResult {
    /// Decodes and validates the aggregate payload returned by the poll store.
    pub fn decode(body: &str) -> Result<Self, ApiError> {
        let payload: AggregatePayload =
            serde_json::from_str(body).map_err(|e| ApiError::decode("aggregate results", e))?;

        let total_participants = u32::try_from(payload.total_participants).map_err(|_| {
            ApiError::decode(
                "aggregate results",
                format!("total_participants out of range: {}", payload.total_participants),
            )
        })?;

        let mut per_cluster_agreement = Vec::with_capacity(payload.cluster_analysis.len());
        for entry in payload.cluster_analysis {
            if entry.cluster_name.trim().is_empty() {
                return Err(ApiError::decode("aggregate results", "cluster with empty name"));
            }
            if !entry.agreement_percentage.is_finite()
                || !(0.0..=100.0).contains(&entry.agreement_percentage)
            {
                return Err(ApiError::decode(
                    "aggregate results",
                    format!(
                        "agreement_percentage {} for '{}' is outside 0..=100",
                        entry.agreement_percentage, entry.cluster_name
                    ),
                ));
            }
            per_cluster_agreement.push(ClusterAgreement {
                cluster_name: entry.cluster_name,
                cluster_description: entry.cluster_description.unwrap_or_default(),
                agreement_percentage: entry.agreement_percentage,
                responses: entry.responses,
            });
        }

        Ok(Self {
            total_participants,
            response_summary: payload.response_summary,
            per_cluster_agreement,
        })
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) mod timestamp {
    use super::*;

    /// Accepts RFC 3339 as well as the naive ISO timestamps the service
    /// emits, which are taken to be UTC.
    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }

    pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", raw))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn vote_uses_camel_case_index_and_lowercase_response() {
        let vote = Vote {
            statement_index: 3,
            response: VoteResponse::Disagree,
        };
        let json = serde_json::to_string(&vote).unwrap();
        assert_eq!(json, r#"{"statementIndex":3,"response":"disagree"}"#);
    }

    #[test]
    fn topic_tolerates_missing_and_null_metadata() {
        let json = r#"{
            "title": "Housing",
            "description": "Rents",
            "statements": [{"text": "Build more", "category": "supply", "expected_cluster": "YIMBY"}],
            "expected_clusters": [{"name": "YIMBY", "description": "Pro building"}],
            "metadata": null
        }"#;
        let topic: Topic = serde_json::from_str(json).unwrap();
        assert_eq!(topic.metadata, TopicMetadata::default());
        assert_eq!(topic.shared_poll_id(), None);
        assert_eq!(topic.cluster("YIMBY").unwrap().description, "Pro building");
        assert!(topic.cluster("NIMBY").is_none());
    }

    #[test]
    fn metadata_keeps_unknown_fields() {
        let json = r#"{"generation_method": "demo", "domain": "housing", "statement_count": 10}"#;
        let metadata: TopicMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.generation_method.as_deref(), Some("demo"));
        assert_eq!(metadata.extra.get("domain").and_then(|v| v.as_str()), Some("housing"));

        let back = serde_json::to_value(&metadata).unwrap();
        assert_eq!(back["statement_count"], 10);
        assert!(back.get("is_shared_poll").is_none());
    }

    #[test]
    fn shared_poll_becomes_tagged_session_topic() {
        let json = r#"{
            "poll_id": "abc123",
            "title": "Transit",
            "description": "Buses",
            "main_theme": "How should we get around?",
            "statements": [],
            "expected_clusters": [],
            "metadata": {"generation_method": "llm"},
            "created_at": "2024-05-01T10:15:30.123456",
            "creator_name": "Sam"
        }"#;
        let poll: SharedPoll = serde_json::from_str(json).unwrap();
        let created = poll.created_at.unwrap();
        assert_eq!((created.year(), created.month(), created.hour()), (2024, 5, 10));
        assert_eq!(poll.creator_name.as_deref(), Some("Sam"));

        let topic = poll.into_session_topic();
        assert_eq!(topic.shared_poll_id(), Some("abc123"));
        assert_eq!(topic.metadata.generation_method.as_deref(), Some("llm"));
    }

    #[test]
    fn participant_status_parses_rfc3339_and_missing_timestamp() {
        let status: ParticipantStatus =
            serde_json::from_str(r#"{"has_responded": true, "last_taken": "2024-02-03T04:05:06Z"}"#)
                .unwrap();
        assert!(status.has_responded);
        assert_eq!(status.last_taken.unwrap().day(), 3);

        let status: ParticipantStatus =
            serde_json::from_str(r#"{"has_responded": false, "last_taken": null}"#).unwrap();
        assert_eq!(status, ParticipantStatus::default());
    }

    #[test]
    fn topic_request_drops_auto_domain() {
        let context = CommunityContext::new("Springfield", Some(50_000));
        assert_eq!(TopicRequest::new(context.clone(), Some("auto")).topic_domain, None);
        assert_eq!(
            TopicRequest::new(context, Some("transportation")).topic_domain.as_deref(),
            Some("transportation")
        );
    }

    #[test]
    fn aggregate_decodes_cluster_analysis() {
        let body = r#"{
            "total_participants": 12,
            "response_summary": {"0": {"agree": 7, "disagree": 3, "skip": 2}},
            "cluster_analysis": [
                {"cluster_name": "Builders", "cluster_description": "More homes",
                 "agreement_percentage": 62.5, "responses": {"agree": 10, "disagree": 4, "skip": 2}}
            ]
        }"#;
        let aggregate = AggregateResult::decode(body).unwrap();
        assert_eq!(aggregate.total_participants, 12);
        assert_eq!(aggregate.response_summary[&0].total(), 12);
        assert_eq!(aggregate.per_cluster_agreement[0].cluster_name, "Builders");
        assert_eq!(aggregate.per_cluster_agreement[0].responses.agree, 10);
    }

    #[test]
    fn aggregate_rejects_out_of_range_percentage() {
        let body = r#"{"total_participants": 1, "cluster_analysis": [
            {"cluster_name": "A", "agreement_percentage": 140.0}
        ]}"#;
        assert!(matches!(
            AggregateResult::decode(body),
            Err(ApiError::Decode { .. })
        ));
    }

    #[test]
    fn aggregate_rejects_negative_participants_and_bad_shape() {
        assert!(matches!(
            AggregateResult::decode(r#"{"total_participants": -1}"#),
            Err(ApiError::Decode { .. })
        ));
        assert!(matches!(
            AggregateResult::decode(r#"{"cluster_analysis": "nope"}"#),
            Err(ApiError::Decode { .. })
        ));
    }
}
