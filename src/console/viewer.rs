use std::future::Future;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast::error::RecvError;

use super::ConsoleError;
use crate::FlagHandle;
use crate::flag::{FlagState, ViewerBranch};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub fn render_viewer(state: &FlagState) -> String {
    match state.branch() {
        ViewerBranch::Loading => "Loading...\n".to_string(),
        ViewerBranch::On => concat!(
            "== The new feature is live! ==\n",
            "You see this because the flag service said \"true\".\n",
        )
        .to_string(),
        ViewerBranch::Off => concat!(
            "== No new features here. ==\n",
            "You see this because the flag service said \"false\".\n",
        )
        .to_string(),
    }
}

async fn show<W: AsyncWrite + Unpin>(
    out: &mut W,
    format: OutputFormat,
    state: &FlagState,
) -> Result<(), ConsoleError> {
    match format {
        OutputFormat::Text => out.write_all(render_viewer(state).as_bytes()).await?,
        OutputFormat::Json => {
            let mut line = serde_json::to_vec(state)?;
            line.push(b'\n');
            out.write_all(&line).await?;
        }
    }

    out.flush().await?;

    Ok(())
}

/// Render the flag, then re-render on every change until `shutdown` resolves
/// or the poller goes away.
pub async fn run_viewer<W, S>(
    handle: FlagHandle,
    out: &mut W,
    format: OutputFormat,
    shutdown: S,
) -> Result<(), ConsoleError>
where
    W: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    let Some(mut changes) = handle.subscribe().await else {
        return Err(crate::HandleError::SubscribeFailed.into());
    };

    let mut shown = handle.state().await?;
    show(out, format, &shown).await?;

    tokio::pin!(shutdown);

    loop {
        let state = tokio::select! {
            _ = &mut shutdown => {
                tracing::debug!("Viewer shutting down");
                return Ok(());
            }
            change = changes.recv() => match change {
                Ok(state) => state,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Viewer fell behind, re-reading the flag");
                    handle.state().await?
                }
                Err(RecvError::Closed) => {
                    tracing::debug!("Poller went away, stopping the viewer");
                    return Ok(());
                }
            },
        };

        if state.branch() != shown.branch() {
            show(out, format, &state).await?;
        }
        shown = state;
    }
}
