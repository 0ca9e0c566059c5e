use lazy_static::lazy_static;
use log::error;
use regex::Regex;
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::db::Session;
use crate::error::PollResult;
use crate::handlers::topic::{community_type, share_topic, COMMUNITY_TYPES};
use crate::handlers::{require_topic, App, PageOutcome, Terminal};

lazy_static! {
    static ref SHARED_POLL_URL: Regex = Regex::new(r"/poll/shared/([A-Za-z0-9_-]+)/?(?:[?#].*)?$").unwrap();
    static ref POLL_ID: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

/// Accepts either a bare poll id or a full share link.
pub fn parse_poll_reference(reference: &str) -> Option<String> {
    let reference = reference.trim();
    if POLL_ID.is_match(reference) {
        return Some(reference.to_string());
    }
    SHARED_POLL_URL
        .captures(reference)
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str().to_string())
}

// Shares the topic currently held in the session
pub async fn handle_share_command<R, W>(app: &App, term: &mut Terminal<R, W>) -> PollResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let session = Session::load(&app.storage).await?;
    let topic = match require_topic(&session) {
        PageOutcome::Ready(topic) => topic,
        PageOutcome::Redirect(_) => {
            term.say("No topic to share yet. Run `community-poll generate` first.").await?;
            return Ok(());
        }
    };

    match share_topic(app, topic).await {
        Ok(link) => term.say(&format!("Share this link: {}", link)).await?,
        Err(e) => {
            error!("Error sharing poll: {}", e);
            term.say("Failed to create shareable link. Please try again.").await?;
        }
    }
    Ok(())
}

pub async fn handle_domains_command<R, W>(
    term: &mut Terminal<R, W>,
    community: Option<&str>,
) -> PollResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let communities = match community {
        Some(name) => vec![community_type(name)],
        None => COMMUNITY_TYPES.iter().collect(),
    };

    for community in communities {
        term.say(&format!("{}:", community.name)).await?;
        for (value, label) in community.domains {
            term.say(&format!("  {:<28} {}", value, label)).await?;
        }
    }
    Ok(())
}
