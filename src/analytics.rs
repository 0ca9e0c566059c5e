use log::info;

use crate::models::VoteResponse;

const TARGET: &str = "analytics";

// Engagement events are recorded as log lines under the "analytics" target
pub fn track_event(action: &str, category: &str, label: Option<&str>, value: Option<u64>) {
    match value {
        Some(value) => info!(
            target: TARGET,
            "event={} category={} label={} value={}",
            action,
            category,
            label.unwrap_or(""),
            value
        ),
        None => info!(
            target: TARGET,
            "event={} category={} label={}",
            action,
            category,
            label.unwrap_or("")
        ),
    }
}

pub fn track_topic_generation(location: &str, topic_domain: &str, method: &str) {
    track_event(
        "generate_topic",
        "polling",
        Some(&format!("{}_{}_{}", location, topic_domain, method)),
        None,
    );
}

pub fn track_poll_launch(topic_title: &str) {
    track_event("launch_poll", "polling", Some(topic_title), None);
}

pub fn track_vote(statement_index: usize, response: VoteResponse) {
    track_event(
        "vote",
        "polling",
        Some(&format!("statement_{}_{}", statement_index, response.as_str())),
        None,
    );
}

pub fn track_poll_completion(total_votes: usize, user_name: &str) {
    let label = if user_name.trim().is_empty() {
        "anonymous"
    } else {
        "named_user"
    };
    track_event("complete_poll", "polling", Some(label), Some(total_votes as u64));
}

pub fn track_poll_share(poll_id: &str, method: &str) {
    track_event("share_poll", "sharing", Some(&format!("{}_{}", poll_id, method)), None);
}

pub fn track_user_engagement(action: &str, details: Option<&str>) {
    track_event(action, "engagement", details, None);
}
