use log::{info, warn};
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::analytics::{track_poll_completion, track_user_engagement, track_vote};
use crate::db::Session;
use crate::error::{ApiError, PollResult};
use crate::handlers::{redirect, require_topic, App, Page, PageOutcome, Terminal};
use crate::models::{Topic, VoteResponse};
use crate::tasks::submission::{spawn_submission, COMPLETED_EVENT, PARTIAL_RESULTS_EVENT};
use crate::voting::flow::{FlowState, Transition, VotingFlow};

const VOTE_PROMPT: &str = "[a]gree [d]isagree [s]kip | [p]revious [n]ext [r]estart [q]uit >";
const SHARED_VOTE_PROMPT: &str =
    "[a]gree [d]isagree [s]kip | [p]revious [n]ext [r]estart [v]iew results [q]uit >";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Vote(VoteResponse),
    Previous,
    Next,
    Restart,
    ViewResults,
    Quit,
}

fn parse_action(input: &str) -> Option<Action> {
    match input.trim().to_ascii_lowercase().as_str() {
        "a" | "agree" => Some(Action::Vote(VoteResponse::Agree)),
        "d" | "disagree" => Some(Action::Vote(VoteResponse::Disagree)),
        "s" | "skip" => Some(Action::Vote(VoteResponse::Skip)),
        "p" | "prev" | "previous" => Some(Action::Previous),
        "n" | "next" => Some(Action::Next),
        "r" | "restart" => Some(Action::Restart),
        "v" | "view" | "results" => Some(Action::ViewResults),
        "q" | "quit" => Some(Action::Quit),
        _ => None,
    }
}

fn render_statement(topic: &Topic, flow: &VotingFlow, position: usize) -> String {
    let statement = &topic.statements[position];
    let mut text = format!(
        "\nStatement {} of {} ({} answered) [{}]\n  {}",
        position + 1,
        flow.statement_count(),
        flow.votes().len(),
        statement.category,
        statement.text
    );
    if let Some(response) = flow.current_vote() {
        text.push_str(&format!("\n  Your vote: {}", response.label()));
    }
    text
}

enum FlowEnd {
    Completed,
    // Shared polls only: leave early and show results for the votes so far
    PartialResults,
    Quit,
}

// Drives the flow from its current position until it completes or the user leaves
async fn collect_votes<R, W>(
    term: &mut Terminal<R, W>,
    topic: &Topic,
    flow: &mut VotingFlow,
    shared_poll_id: Option<&str>,
) -> PollResult<FlowEnd>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let position = match flow.state() {
            FlowState::Voting { position } => position,
            FlowState::Complete => return Ok(FlowEnd::Completed),
            FlowState::AwaitingName => return Ok(FlowEnd::Quit),
        };

        let can_view_results = shared_poll_id.is_some() && !flow.votes().is_empty();
        let prompt = if can_view_results {
            SHARED_VOTE_PROMPT
        } else {
            VOTE_PROMPT
        };

        term.say(&render_statement(topic, flow, position)).await?;
        let Some(input) = term.prompt(prompt).await? else {
            return Ok(FlowEnd::Quit);
        };

        match parse_action(&input) {
            Some(Action::Vote(response)) => {
                match shared_poll_id {
                    Some(poll_id) => track_user_engagement(
                        "vote_on_shared_poll",
                        Some(&format!(
                            "poll_id: {}, statement: {}, response: {}",
                            poll_id,
                            position,
                            response.as_str()
                        )),
                    ),
                    None => track_vote(position, response),
                }
                flow.vote(response);
            }
            Some(Action::Previous) => {
                if flow.back() == Transition::Ignored {
                    term.say("Already at the first statement.").await?;
                }
            }
            Some(Action::Next) => {
                if flow.forward() == Transition::Ignored {
                    term.say("Already at the last statement.").await?;
                }
            }
            Some(Action::Restart) => {
                flow.restart();
                term.say("Votes cleared, starting over.").await?;
            }
            Some(Action::ViewResults) if can_view_results => {
                return Ok(FlowEnd::PartialResults);
            }
            Some(Action::ViewResults) if shared_poll_id.is_some() => {
                term.say("Vote on at least one statement to see results.").await?;
            }
            Some(Action::Quit) => return Ok(FlowEnd::Quit),
            Some(Action::ViewResults) | None => {
                term.say("Please choose a, d, s, p, n, r or q.").await?
            }
        }
    }
}

/// Votes on the topic kept in the session.
pub async fn local_poll_page<R, W>(app: &App, term: &mut Terminal<R, W>) -> PollResult<Page>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let session = Session::load(&app.storage).await?;
    let topic = match require_topic(&session) {
        PageOutcome::Ready(topic) => topic.clone(),
        PageOutcome::Redirect(reason) => return redirect(term, reason).await,
    };

    // Answers to a shared poll belong in its poll store too
    if let Some(poll_id) = topic.shared_poll_id() {
        info!("Retaking shared poll {}", poll_id);
        return Ok(Page::SharedPoll(poll_id.to_string()));
    }

    term.say(&format!("\n{}\n{}", topic.title, topic.description)).await?;
    let Some(name) = term
        .prompt("Your name (optional, press Enter to stay anonymous):")
        .await?
    else {
        return Ok(Page::Exit);
    };

    let mut flow = VotingFlow::new(topic.statements.len());
    flow.confirm_name(&name);
    if !flow.user_name().is_empty() {
        app.storage.save_user_name(flow.user_name()).await?;
    }

    if let FlowEnd::Quit = collect_votes(term, &topic, &mut flow, None).await? {
        info!("Poll abandoned after {} votes", flow.votes().len());
        return Ok(Page::Exit);
    }

    let user_name = flow.user_name().to_string();
    let completed = Session {
        topic: Some(topic),
        votes: flow.into_votes(),
        user_name: Some(user_name),
    };
    completed.save_completed(&app.storage).await?;
    track_poll_completion(
        completed.votes.len(),
        completed.user_name.as_deref().unwrap_or_default(),
    );

    Ok(Page::Results(None))
}

/// Takes a poll somebody shared, then submits the answers in the background.
pub async fn shared_poll_page<R, W>(
    app: &App,
    term: &mut Terminal<R, W>,
    poll_id: &str,
) -> PollResult<Page>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let poll = match app.polls.fetch(poll_id).await {
        Ok(poll) => poll,
        Err(ApiError::NotFound) => {
            term.say("Poll not found. The link may be invalid or the poll may have been removed.")
                .await?;
            return offer_topic_creation(term).await;
        }
        Err(e) => {
            warn!("Error loading shared poll {}: {}", poll_id, e);
            term.say("Failed to load poll. Please check your connection and try again later.")
                .await?;
            return offer_topic_creation(term).await;
        }
    };
    track_user_engagement("shared_poll_accessed", Some(&format!("poll_id: {}", poll_id)));

    term.say(&format!(
        "\nYou're about to participate in: {}\n{}",
        poll.topic.title, poll.topic.description
    ))
    .await?;
    if let Some(creator) = &poll.creator_name {
        term.say(&format!("Created by {}", creator)).await?;
    }

    let Some(name) = term
        .prompt("Your name (optional, press Enter to stay anonymous):")
        .await?
    else {
        return Ok(Page::Exit);
    };

    let mut retaking = false;
    if !name.trim().is_empty() {
        match app.polls.check_participant(poll_id, name.trim()).await {
            Ok(status) if status.has_responded => {
                retaking = true;
                let when = status
                    .last_taken
                    .map(|at| format!(" on {}", at.format("%Y-%m-%d %H:%M UTC")))
                    .unwrap_or_default();
                term.say(&format!(
                    "You have already taken this poll{}. Your new answers will be recorded as another response.",
                    when
                ))
                .await?;
            }
            Ok(_) => {}
            // Carry on as a first-time participant
            Err(e) => warn!("Error checking participant status for poll {}: {}", poll_id, e),
        }
    }

    let topic = poll.into_session_topic();
    let mut flow = VotingFlow::new(topic.statements.len());
    flow.confirm_name(&name);
    if !flow.user_name().is_empty() {
        app.storage.save_user_name(flow.user_name()).await?;
    }
    let event = if retaking {
        "shared_poll_retaken"
    } else {
        "shared_poll_started"
    };
    track_user_engagement(
        event,
        Some(&format!("poll_id: {}, user: {}", poll_id, flow.user_name())),
    );

    let submission_event = match collect_votes(term, &topic, &mut flow, Some(poll_id)).await? {
        FlowEnd::Completed => COMPLETED_EVENT,
        FlowEnd::PartialResults => {
            info!(
                "Showing partial results for shared poll {} after {} of {} statements",
                poll_id,
                flow.votes().len(),
                flow.statement_count()
            );
            PARTIAL_RESULTS_EVENT
        }
        FlowEnd::Quit => {
            info!("Shared poll {} abandoned after {} votes", poll_id, flow.votes().len());
            return Ok(Page::Exit);
        }
    };

    let user_name = flow.user_name().to_string();
    let completed = Session {
        topic: Some(topic),
        votes: flow.into_votes(),
        user_name: Some(user_name.clone()),
    };
    completed.save_completed(&app.storage).await?;

    let pending = spawn_submission(
        app.polls.clone(),
        poll_id.to_string(),
        user_name,
        completed.votes.clone(),
        submission_event,
    );
    Ok(Page::Results(Some(pending)))
}

async fn offer_topic_creation<R, W>(term: &mut Terminal<R, W>) -> PollResult<Page>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match term.prompt("Create your own poll instead? [y/N]").await? {
        Some(answer) if answer.trim().eq_ignore_ascii_case("y") => Ok(Page::Entry),
        _ => Ok(Page::Exit),
    }
}
