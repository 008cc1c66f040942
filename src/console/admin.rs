use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast::error::RecvError;

use super::ConsoleError;
use crate::FlagHandle;
use crate::flag::FlagState;

pub const DEFAULT_ADMIN_LABEL: &str = "Test feature number one";

const HELP: &str = "Commands: [t]oggle (or just Enter), [r]efresh, [q]uit\n";

pub fn render_admin(state: &FlagState, label: &str) -> String {
    if state.enabled {
        format!("[x] {label}: ON\n")
    } else {
        format!("[ ] {label}: OFF\n")
    }
}

enum Command {
    Toggle,
    Refresh,
    Quit,
    Unknown,
}

impl Command {
    fn parse(line: &str) -> Self {
        match line.trim() {
            "" | "t" | "toggle" => Self::Toggle,
            "r" | "refresh" => Self::Refresh,
            "q" | "quit" => Self::Quit,
            _ => Self::Unknown,
        }
    }
}

/// Drive the admin control from line-oriented input.
///
/// Stops on `quit` or at the end of the input.
pub async fn run_admin<R, W>(
    handle: FlagHandle,
    input: R,
    out: &mut W,
    label: &str,
) -> Result<(), ConsoleError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let Some(mut changes) = handle.subscribe().await else {
        return Err(crate::HandleError::SubscribeFailed.into());
    };

    out.write_all(HELP.as_bytes()).await?;
    let mut shown = handle.state().await?;
    out.write_all(render_admin(&shown, label).as_bytes()).await?;
    out.flush().await?;

    let mut lines = input.lines();

    loop {
        let state = tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::debug!("Admin input closed");
                    return Ok(());
                };

                match Command::parse(&line) {
                    Command::Toggle => {
                        // A failure is already logged by the poller; show what we still have.
                        if let Err(e) = handle.toggle().await {
                            tracing::debug!(%e, "Toggle failed");
                        }
                        handle.state().await?
                    }
                    Command::Refresh => handle.refresh().await?,
                    Command::Quit => return Ok(()),
                    Command::Unknown => {
                        out.write_all(HELP.as_bytes()).await?;
                        out.flush().await?;
                        continue;
                    }
                }
            }
            change = changes.recv() => match change {
                Ok(state) if state.enabled == shown.enabled => continue,
                Ok(state) => state,
                Err(RecvError::Lagged(_)) => handle.state().await?,
                Err(RecvError::Closed) => return Ok(()),
            },
        };

        out.write_all(render_admin(&state, label).as_bytes()).await?;
        out.flush().await?;
        shown = state;
    }
}

#[cfg(test)]
mod test {
    use super::render_admin;
    use crate::flag::FlagState;

    #[test]
    fn test_render() {
        let mut state = FlagState::default();
        assert_eq!(render_admin(&state, "Uno"), "[ ] Uno: OFF\n");

        state.confirm(true, chrono::Utc::now());
        assert_eq!(render_admin(&state, "Uno"), "[x] Uno: ON\n");
    }
}
