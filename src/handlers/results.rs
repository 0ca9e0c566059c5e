use log::{info, warn};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::db::Session;
use crate::error::PollResult;
use crate::handlers::{redirect, require_results, App, Page, PageOutcome, Terminal};
use crate::models::{AggregateResult, Topic};
use crate::voting::alignment::{calculate_alignments, AlignmentLevel};
use crate::voting::ballot::VoteList;
use crate::voting::ClusterAlignment;

const BAR_WIDTH: usize = 20;
const SUBMISSION_WAIT: Duration = Duration::from_secs(10);

fn bar(alignment: u8) -> String {
    let filled = (alignment as usize * BAR_WIDTH) / 100;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

pub fn render_overview(topic: &Topic, votes: &VoteList, user_name: &str) -> String {
    let tally = votes.tally();
    format!(
        "\n=== Results: {} ===\nRespondent: {}\nTotal votes: {} of {} statements (agree {}, disagree {}, skip {})",
        topic.title,
        user_name,
        votes.len(),
        topic.statements.len(),
        tally.agree,
        tally.disagree,
        tally.skip
    )
}

pub fn render_alignments(alignments: &[ClusterAlignment]) -> String {
    let mut text = String::from("\nYour opinion cluster alignment:\n");
    for (i, alignment) in alignments.iter().enumerate() {
        text.push_str(&format!(
            "  {}. {:<28} {} {:>3}%  {} ({} relevant votes)\n",
            i + 1,
            alignment.cluster,
            bar(alignment.alignment),
            alignment.alignment,
            AlignmentLevel::from_score(alignment.alignment).label(),
            alignment.votes
        ));
    }
    text
}

pub fn render_cluster_details(
    topic: &Topic,
    votes: &VoteList,
    alignment: &ClusterAlignment,
) -> String {
    let mut text = format!("\n{} ({}%)\n", alignment.cluster, alignment.alignment);
    if let Some(cluster) = topic.cluster(&alignment.cluster) {
        if !cluster.description.is_empty() {
            text.push_str(&format!("{}\n", cluster.description));
        }
    }
    if alignment.matching_statements.is_empty() {
        text.push_str("  No statements belong to this cluster.\n");
    }
    for &index in &alignment.matching_statements {
        let Some(statement) = topic.statements.get(index) else {
            continue;
        };
        let vote = votes.get(index).map(|response| response.label()).unwrap_or("No vote");
        text.push_str(&format!("  [{:<8}] {}\n", vote, statement.text));
    }
    text
}

pub fn render_community(topic: &Topic, aggregate: &AggregateResult) -> String {
    let mut text = format!(
        "\nCommunity results ({} participants):\n",
        aggregate.total_participants
    );
    if aggregate.per_cluster_agreement.is_empty() {
        text.push_str("  No community responses yet.\n");
    }
    for cluster in &aggregate.per_cluster_agreement {
        text.push_str(&format!(
            "  {:<28} {:>5.1}% agreement (agree {}, disagree {}, skip {})\n",
            cluster.cluster_name,
            cluster.agreement_percentage,
            cluster.responses.agree,
            cluster.responses.disagree,
            cluster.responses.skip
        ));
    }
    if !aggregate.response_summary.is_empty() {
        text.push_str("\nCommunity responses per statement:\n");
    }
    for (&index, tally) in &aggregate.response_summary {
        let Some(statement) = topic.statements.get(index) else {
            continue;
        };
        text.push_str(&format!(
            "  {}. {} (agree {}, disagree {}, skip {})\n",
            index + 1,
            statement.text,
            tally.agree,
            tally.disagree,
            tally.skip
        ));
    }
    text
}

// Community statistics never block the individual breakdown. A submission
// still running after `wait` keeps going in the background.
async fn community_section(
    app: &App,
    topic: &Topic,
    poll_id: &str,
    pending: Option<JoinHandle<bool>>,
    wait: Duration,
) -> String {
    let submitted = match pending {
        Some(handle) => match timeout(wait, handle).await {
            Ok(Ok(submitted)) => Some(submitted),
            Ok(Err(e)) => {
                warn!("Response submission task for poll {} failed: {}", poll_id, e);
                Some(false)
            }
            Err(_) => {
                warn!(
                    "Response submission for poll {} still pending after {:?}",
                    poll_id, wait
                );
                None
            }
        },
        None => Some(true),
    };

    let mut text = String::new();
    match submitted {
        Some(true) => {}
        Some(false) => text.push_str(
            "\nYour responses could not be sent to the community poll; they are kept on this device only.",
        ),
        None => text.push_str(
            "\nYour responses are still being sent; community results may not include them yet.",
        ),
    }

    match app.polls.fetch_aggregate(poll_id).await {
        Ok(aggregate) => text.push_str(&render_community(topic, &aggregate)),
        Err(e) => {
            warn!("Community results for poll {} unavailable: {}", poll_id, e);
            text.push_str("\nCommunity results are unavailable right now; showing your individual results only.");
        }
    }
    text
}

pub async fn results_page<R, W>(
    app: &App,
    term: &mut Terminal<R, W>,
    pending: Option<JoinHandle<bool>>,
) -> PollResult<Page>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let session = Session::load(&app.storage).await?;
    let (topic, votes) = match require_results(&session) {
        PageOutcome::Ready(ready) => ready,
        PageOutcome::Redirect(reason) => return redirect(term, reason).await,
    };

    let alignments = calculate_alignments(topic, votes.as_slice());
    info!(
        "Computed {} cluster alignments from {} votes",
        alignments.len(),
        votes.len()
    );

    term.say(&render_overview(topic, votes, session.display_name())).await?;
    term.say(&render_alignments(&alignments)).await?;

    if let Some(poll_id) = topic.shared_poll_id() {
        let community = community_section(app, topic, poll_id, pending, SUBMISSION_WAIT).await;
        term.say(&community).await?;
    }

    loop {
        let Some(input) = term
            .prompt("Cluster number for details, [r]etake poll, [g]enerate new topic, [q]uit >")
            .await?
        else {
            return Ok(Page::Exit);
        };

        let input = input.trim().to_ascii_lowercase();
        match input.as_str() {
            "r" | "retake" => return Ok(Page::Poll),
            "g" | "generate" => return Ok(Page::Entry),
            "q" | "quit" => return Ok(Page::Exit),
            _ => match input.parse::<usize>() {
                Ok(n) if (1..=alignments.len()).contains(&n) => {
                    term.say(&render_cluster_details(topic, votes, &alignments[n - 1]))
                        .await?;
                }
                _ => term.say("Please enter a cluster number, r, g or q.").await?,
            },
        }
    }
}
