use std::time::Duration;

use tokio::sync::mpsc::channel;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::FlagHandle;
use crate::poller::Poller;
use crate::transport::Transport;

pub struct Worker {
    poller_task: JoinHandle<()>,
}

impl Worker {
    #[cfg_attr(
        feature = "tracing-instrument",
        tracing::instrument(skip(transport))
    )]
    pub(crate) fn new<T: Transport>(
        transport: T,
        flag_key: String,
        poll_interval: Duration,
    ) -> (FlagHandle, Worker) {
        // Message flow:
        //
        // FlagHandle --> Poller <--> Transport

        let (to_poller, poller_rx) = channel(1000);

        let handle = FlagHandle::new(to_poller);
        let poller = Poller::new(transport, flag_key, poll_interval, poller_rx);

        let span = tracing::debug_span!("spawned flag poller");
        let poller_task = tokio::spawn(poller.execute().instrument(span));

        (handle, Self { poller_task })
    }

    /// Wait for the poller to stop.
    ///
    /// The poller keeps running for as long as any `FlagHandle` is alive, so
    /// drop them before waiting.
    #[cfg_attr(feature = "tracing-instrument", tracing::instrument(skip(self)))]
    pub async fn wait(self) {
        if let Err(e) = self.poller_task.await {
            tracing::trace!(%e, "Flag poller task ended with an error");
        }
    }
}
