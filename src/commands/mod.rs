pub mod poll;

use log::info;
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::error::PollResult;
use crate::handlers::{self, App, Page, Terminal};

pub const USAGE: &str = "\
Usage: community-poll [command]

Commands:
  generate            Generate a topic and launch or share it (default)
  poll                Vote on the current topic
  results             Show results for the current topic
  shared <id|link>    Take a poll somebody shared with you
  share               Create a shareable link for the current topic
  domains [community] List topic domains per community type";

pub async fn handle_command<R, W>(
    app: &App,
    term: &mut Terminal<R, W>,
    name: &str,
    args: &[String],
) -> PollResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("Received command: {}", name);
    match name {
        "generate" => handlers::run(app, term, Page::Entry).await?,
        "poll" => handlers::run(app, term, Page::Poll).await?,
        "results" => handlers::run(app, term, Page::Results(None)).await?,
        "shared" => match args.first().and_then(|arg| poll::parse_poll_reference(arg)) {
            Some(poll_id) => handlers::run(app, term, Page::SharedPoll(poll_id)).await?,
            None => term.say("Usage: community-poll shared <poll id or share link>").await?,
        },
        "share" => poll::handle_share_command(app, term).await?,
        "domains" => {
            let community = (!args.is_empty()).then(|| args.join(" "));
            poll::handle_domains_command(term, community.as_deref()).await?
        }
        "help" | "--help" | "-h" => term.say(USAGE).await?,
        _ => {
            term.say(&format!("Unknown command: {}", name)).await?;
            term.say(USAGE).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::tests::{app_with, output, terminal};
    use crate::test_support::FakeBackend;
    use std::sync::Arc;

    #[tokio::test]
    async fn unknown_commands_print_usage() {
        let app = app_with(Arc::new(FakeBackend::default())).await;
        let mut term = terminal("");
        handle_command(&app, &mut term, "vote-now", &[]).await.unwrap();
        let text = output(term);
        assert!(text.contains("Unknown command: vote-now"));
        assert!(text.contains("shared <id|link>"));
    }

    #[tokio::test]
    async fn shared_requires_a_reference() {
        let app = app_with(Arc::new(FakeBackend::default())).await;
        let mut term = terminal("");
        handle_command(&app, &mut term, "shared", &[]).await.unwrap();
        assert!(output(term).contains("Usage: community-poll shared"));
    }

    #[tokio::test]
    async fn shared_link_is_resolved_to_its_poll() {
        let app = app_with(Arc::new(FakeBackend::default())).await;
        // The fake has no such poll, so the page reports it and exits on "n"
        let mut term = terminal("n\n");
        let args = vec!["http://localhost:3000/poll/shared/p404".to_string()];
        handle_command(&app, &mut term, "shared", &args).await.unwrap();
        assert!(output(term).contains("Poll not found"));
    }
}
