use tokio::sync::broadcast;
use tokio::sync::mpsc::Sender;
use tokio::sync::oneshot::channel as oneshot;
use tracing::Instrument;

use crate::flag::{FlagState, Health};
use crate::poller::PollerSignal;

#[derive(thiserror::Error, Debug)]
pub enum HandleError {
    #[error("Timed out waiting for the first flag sync: {0:?}")]
    WaitForSync(#[from] tokio::time::error::Elapsed),

    #[error("Failed to subscribe to flag changes")]
    SubscribeFailed,

    #[error(transparent)]
    Subscription(#[from] tokio::sync::broadcast::error::RecvError),

    #[error("Failed to signal the poller: '{0}'")]
    SendToPoller(String),

    #[error(transparent)]
    Response(#[from] tokio::sync::oneshot::error::RecvError),

    #[error("The flag update was not accepted: {0}")]
    Write(String),

    #[error("The flag service is unhealthy: {0}")]
    Health(String),
}

/// A client's way into its poller.
///
/// Clones share the same poller. Once every clone is dropped the poller stops
/// its timer and exits.
#[derive(Clone)]
pub struct FlagHandle {
    to_poller: Sender<PollerSignal>,
}

impl std::fmt::Debug for FlagHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlagHandle").finish()
    }
}

impl FlagHandle {
    pub(crate) fn new(to_poller: Sender<PollerSignal>) -> Self {
        Self { to_poller }
    }

    async fn request<V>(
        &self,
        signal: impl FnOnce(tokio::sync::oneshot::Sender<V>) -> PollerSignal,
    ) -> Result<V, HandleError> {
        let (tx, rx) = oneshot();

        self.to_poller
            .send(signal(tx))
            .instrument(tracing::trace_span!("signalling the poller"))
            .await
            .map_err(|e| HandleError::SendToPoller(format!("{e:?}")))?;

        Ok(rx
            .instrument(tracing::trace_span!("waiting for the poller"))
            .await?)
    }

    #[cfg_attr(feature = "tracing-instrument", tracing::instrument(skip(self), ret(level = tracing::Level::TRACE)))]
    pub async fn state(&self) -> Result<FlagState, HandleError> {
        self.request(PollerSignal::GetState).await
    }

    pub async fn enabled(&self) -> Result<bool, HandleError> {
        Ok(self.state().await?.enabled)
    }

    /// Poll the service now instead of waiting for the next tick.
    #[cfg_attr(feature = "tracing-instrument", tracing::instrument(skip(self), ret(level = tracing::Level::TRACE)))]
    pub async fn refresh(&self) -> Result<FlagState, HandleError> {
        self.request(PollerSignal::RefreshNow).await
    }

    /// Ask the service to flip the flag, and adopt the new value once it says ok.
    ///
    /// On failure the local state is left untouched.
    #[cfg_attr(feature = "tracing-instrument", tracing::instrument(skip(self), ret(level = tracing::Level::TRACE)))]
    pub async fn toggle(&self) -> Result<bool, HandleError> {
        self.request(PollerSignal::Toggle)
            .await?
            .map_err(HandleError::Write)
    }

    pub async fn health(&self) -> Result<Health, HandleError> {
        self.request(PollerSignal::CheckHealth)
            .await?
            .map_err(HandleError::Health)
    }

    pub async fn subscribe(&self) -> Option<broadcast::Receiver<FlagState>> {
        self.request(PollerSignal::Subscribe)
            .await
            .inspect_err(|e| tracing::debug!(%e, "Error subscribing to flag changes"))
            .ok()
    }

    /// Wait until the first fetch attempt has settled, successfully or not.
    pub async fn wait_for_sync(
        &self,
        duration: Option<std::time::Duration>,
    ) -> Result<FlagState, HandleError> {
        let subscription = self.subscribe().await;

        let state = self.state().await?;
        if !state.loading {
            return Ok(state);
        }

        let Some(mut subscription) = subscription else {
            return Err(HandleError::SubscribeFailed);
        };

        let settled = async {
            loop {
                let state = match subscription.recv().await {
                    Ok(state) => state,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Fell behind on flag changes, re-reading the flag");
                        self.state().await?
                    }
                    Err(e) => return Err(e.into()),
                };

                if !state.loading {
                    return Ok::<_, HandleError>(state);
                }
            }
        };

        if let Some(duration) = duration {
            tokio::time::timeout(duration, settled).await?
        } else {
            settled.await
        }
    }
}
