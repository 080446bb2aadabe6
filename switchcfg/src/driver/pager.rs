//! Paginated command execution.
//!
//! Sends one command and keeps answering `-- MORE --` with a space until
//! the exec prompt comes back, collecting everything in between.
//!
//! There is no iteration bound unless `max_pages` is set: a device whose
//! output never ends keeps the loop going as long as each page arrives
//! within the page timeout.

use std::time::Instant;

use log::{debug, info};

use crate::channel::{Expect, PromptKind, PromptSet, Session};
use crate::driver::CapturedOutput;
use crate::error::ExecError;
use crate::job::Timeouts;
use crate::transport::Transport;

/// Keystroke that asks the device for the next page.
const MORE_KEY: &str = " ";

/// Run `command` and capture its complete, possibly paginated, output.
pub async fn execute<T: Transport>(
    session: &mut Session<T>,
    command: &str,
    prompts: &PromptSet,
    timeouts: &Timeouts,
    max_pages: Option<usize>,
) -> Result<CapturedOutput, ExecError> {
    info!("{}: executing '{}'", session.host(), command);

    let start = Instant::now();
    let mut captured = CapturedOutput::new(command);

    session.send_line(command).await?;

    loop {
        match session
            .expect_any(&[&prompts.pagination, &prompts.exec], timeouts.page)
            .await?
        {
            Expect::Matched(m) if m.kind == PromptKind::Pagination => {
                captured.push(m.before);

                if let Some(limit) = max_pages.filter(|limit| captured.pages() >= *limit) {
                    return Err(ExecError::PageLimit {
                        limit,
                        partial: captured.finish(String::new(), start.elapsed()),
                    });
                }

                debug!("{}: pagination detected, sending space", session.host());
                session.send(MORE_KEY).await?;
                captured.page_advanced();
            }
            Expect::Matched(m) => {
                captured.push(m.before);
                let captured = captured.finish(m.matched, start.elapsed());
                debug!(
                    "{}: final prompt detected after {} page(s)",
                    session.host(),
                    captured.pages()
                );
                return Ok(captured);
            }
            Expect::Timeout { pending } => {
                if !pending.is_empty() {
                    captured.push(pending);
                }
                return Err(ExecError::Stalled {
                    partial: captured.finish(String::new(), start.elapsed()),
                });
            }
            Expect::Eof { .. } => {
                return Err(ExecError::SessionClosed {
                    command: command.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::transport::mock::{MockTransport, lock};

    const COMMAND: &str = "show running-config";

    fn timeouts() -> Timeouts {
        Timeouts::uniform(Duration::from_millis(50))
    }

    /// A device that echoes the command, then shows each page followed by
    /// a pagination marker, then `last` and the prompt.
    fn paged_device(pages: &[&str], last: &str) -> MockTransport {
        let mut replies: Vec<String> = pages
            .iter()
            .map(|page| format!("{}-- MORE --, next page: Space", page))
            .collect();
        replies.push(format!("{}switch# ", last));

        let mut replies = replies.into_iter();
        let first = format!("{}\r\n{}", COMMAND, replies.next().unwrap_or_default());
        let mut transport = MockTransport::new().on_line(COMMAND, &first);
        for reply in replies {
            transport = transport.on(" ", &reply);
        }
        transport
    }

    #[tokio::test]
    async fn test_single_page() {
        let prompts = PromptSet::standard().unwrap();
        let transport = paged_device(&[], "hostname \"sw1\"\r\n");
        let log = transport.log();
        let mut session = Session::new("sw1", transport, Duration::from_millis(50));

        let captured = execute(&mut session, COMMAND, &prompts, &timeouts(), None)
            .await
            .unwrap();
        session.close().await.unwrap();

        assert_eq!(captured.pages(), 0);
        assert_eq!(captured.prompt(), "switch#");
        assert_eq!(captured.text(), b"show running-config\r\nhostname \"sw1\"\r\n");
        assert_eq!(lock(&log).writes, vec!["show running-config\n"]);
    }

    #[tokio::test]
    async fn test_n_markers_send_n_spaces() {
        let prompts = PromptSet::standard().unwrap();
        let pages = ["page one\r\n", "page two\r\n", "page three\r\n"];
        let transport = paged_device(&pages, "last page\r\n");
        let log = transport.log();
        let mut session = Session::new("sw1", transport, Duration::from_millis(50));

        let captured = execute(&mut session, COMMAND, &prompts, &timeouts(), None)
            .await
            .unwrap();
        session.close().await.unwrap();

        assert_eq!(captured.pages(), 3);
        assert_eq!(captured.chunks().len(), 4);
        assert_eq!(
            captured.text(),
            b"show running-config\r\npage one\r\npage two\r\npage three\r\nlast page\r\n"
        );

        let log = lock(&log);
        let spaces = log.writes.iter().filter(|w| w.as_str() == " ").count();
        assert_eq!(spaces, 3);
    }

    #[tokio::test]
    async fn test_stall_keeps_partial_output() {
        let prompts = PromptSet::standard().unwrap();
        let transport = MockTransport::new()
            .on_line(COMMAND, "show running-config\r\npage one\r\n-- MORE --")
            .on(" ", "page two, then silence");
        let mut session = Session::new("sw1", transport, Duration::from_millis(50));

        let err = execute(&mut session, COMMAND, &prompts, &timeouts(), None)
            .await
            .unwrap_err();
        session.close().await.unwrap();

        let partial = err.partial().unwrap();
        assert!(matches!(err, ExecError::Stalled { .. }));
        assert_eq!(partial.pages(), 1);
        assert_eq!(
            partial.text(),
            b"show running-config\r\npage one\r\npage two, then silence"
        );
    }

    #[tokio::test]
    async fn test_non_utf8_output_survives_capture() {
        let prompts = PromptSet::standard().unwrap();
        let transport = MockTransport::new().on_bytes(
            "show running-config\n",
            b"show running-config\r\nhostname \"caf\xe9\"\r\nswitch# ",
        );
        let mut session = Session::new("sw1", transport, Duration::from_millis(50));

        let captured = execute(&mut session, COMMAND, &prompts, &timeouts(), None)
            .await
            .unwrap();
        session.close().await.unwrap();

        assert_eq!(
            captured.text(),
            b"show running-config\r\nhostname \"caf\xe9\"\r\n"
        );
    }

    #[tokio::test]
    async fn test_session_closed_mid_command() {
        let prompts = PromptSet::standard().unwrap();
        let transport = MockTransport::new()
            .on_line(COMMAND, "show running-config\r\n")
            .then_eof();
        let mut session = Session::new("sw1", transport, Duration::from_millis(50));

        let err = execute(&mut session, COMMAND, &prompts, &timeouts(), None)
            .await
            .unwrap_err();
        session.close().await.unwrap();

        assert!(matches!(err, ExecError::SessionClosed { ref command } if command == COMMAND));
        assert!(err.partial().is_none());
    }

    #[tokio::test]
    async fn test_page_limit() {
        let prompts = PromptSet::standard().unwrap();
        let pages = ["one\r\n", "two\r\n", "three\r\n"];
        let transport = paged_device(&pages, "end\r\n");
        let log = transport.log();
        let mut session = Session::new("sw1", transport, Duration::from_millis(50));

        let err = execute(&mut session, COMMAND, &prompts, &timeouts(), Some(2))
            .await
            .unwrap_err();
        session.close().await.unwrap();

        match err {
            ExecError::PageLimit { limit, partial } => {
                assert_eq!(limit, 2);
                assert_eq!(partial.pages(), 2);
                assert_eq!(partial.chunks().len(), 3);
            }
            other => panic!("unexpected {:?}", other),
        }
        let spaces = lock(&log).writes.iter().filter(|w| w.as_str() == " ").count();
        assert_eq!(spaces, 2);
    }
}
