pub mod results;
pub mod topic;
pub mod vote;

use log::info;
use reqwest::Url;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;

use crate::api::{PollStore, TopicService};
use crate::db::{Session, SessionStore};
use crate::error::PollResult;
use crate::models::Topic;
use crate::voting::ballot::VoteList;

/// Everything a page needs to talk to the outside world.
pub struct App {
    pub storage: SessionStore,
    pub topics: Arc<dyn TopicService>,
    pub polls: Arc<dyn PollStore>,
    pub share_base_url: Url,
}

/// Where the user goes next.
#[derive(Debug)]
pub enum Page {
    Entry,
    Poll,
    SharedPoll(String),
    // Carries the in-flight response submission of a shared poll, if any
    Results(Option<JoinHandle<bool>>),
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    MissingTopic,
    MissingVotes,
}

impl RedirectReason {
    pub fn message(&self) -> &'static str {
        match self {
            RedirectReason::MissingTopic => "No active topic found. Let's create one first.",
            RedirectReason::MissingVotes => "No votes recorded yet. Let's start with a topic.",
        }
    }
}

/// Result of a page's precondition check on the loaded session.
#[derive(Debug, PartialEq)]
pub enum PageOutcome<T> {
    Ready(T),
    Redirect(RedirectReason),
}

pub fn require_topic(session: &Session) -> PageOutcome<&Topic> {
    match &session.topic {
        Some(topic) => PageOutcome::Ready(topic),
        None => PageOutcome::Redirect(RedirectReason::MissingTopic),
    }
}

pub fn require_results(session: &Session) -> PageOutcome<(&Topic, &VoteList)> {
    match (&session.topic, session.votes.is_empty()) {
        (None, _) => PageOutcome::Redirect(RedirectReason::MissingTopic),
        (Some(_), true) => PageOutcome::Redirect(RedirectReason::MissingVotes),
        (Some(topic), false) => PageOutcome::Ready((topic, &session.votes)),
    }
}

/// Line-oriented console the pages read from and write to.
pub struct Terminal<R, W> {
    input: R,
    output: W,
}

impl<R, W> Terminal<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub async fn say(&mut self, text: &str) -> io::Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await
    }

    /// Returns `None` once input is exhausted.
    pub async fn prompt(&mut self, question: &str) -> io::Result<Option<String>> {
        self.output.write_all(question.as_bytes()).await?;
        self.output.write_all(b" ").await?;
        self.output.flush().await?;

        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }
}

pub(crate) async fn redirect<R, W>(
    term: &mut Terminal<R, W>,
    reason: RedirectReason,
) -> PollResult<Page>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("Redirecting to entry page: {:?}", reason);
    term.say(reason.message()).await?;
    Ok(Page::Entry)
}

/// Runs pages until one of them exits.
pub async fn run<R, W>(app: &App, term: &mut Terminal<R, W>, start: Page) -> PollResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut page = start;
    loop {
        info!("Entering page: {:?}", page);
        page = match page {
            Page::Entry => topic::entry_page(app, term).await?,
            Page::Poll => vote::local_poll_page(app, term).await?,
            Page::SharedPoll(poll_id) => vote::shared_poll_page(app, term, &poll_id).await?,
            Page::Results(pending) => results::results_page(app, term, pending).await?,
            Page::Exit => return Ok(()),
        };
    }
}
