use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tokio::sync::oneshot::Sender as OneshotSender;

use crate::flag::{FlagState, FlagUpdate, Health};
use crate::transport::Transport;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub(crate) enum PollerSignal {
    GetState(OneshotSender<FlagState>),
    RefreshNow(OneshotSender<FlagState>),
    Toggle(OneshotSender<Result<bool, String>>),
    CheckHealth(OneshotSender<Result<Health, String>>),
    Subscribe(OneshotSender<broadcast::Receiver<FlagState>>),
}

/// Owns one client's flag state. Polls, writes, and answers handles, one at a time.
pub(crate) struct Poller<T: Transport> {
    state: FlagState,
    flag_key: String,
    period: Duration,
    transport: T,
    incoming: mpsc::Receiver<PollerSignal>,
    change_notifier: broadcast::Sender<FlagState>,
}

impl<T: Transport> Poller<T> {
    pub(crate) fn new(
        transport: T,
        flag_key: String,
        period: Duration,
        incoming: mpsc::Receiver<PollerSignal>,
    ) -> Self {
        Self {
            state: FlagState::default(),
            flag_key,
            period,
            transport,
            incoming,
            change_notifier: broadcast::Sender::new(16),
        }
    }

    #[cfg_attr(feature = "tracing-instrument", tracing::instrument(skip(self)))]
    pub(crate) async fn execute(mut self) {
        // The first tick completes immediately, so the flag is read on startup.
        let mut poll_interval = tokio::time::interval(self.period);
        poll_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                signal = self.incoming.recv() => {
                    let Some(signal) = signal else {
                        tracing::debug!("Flag handles hung up, stopping the poller");

                        return;
                    };

                    match signal {
                        PollerSignal::GetState(reply) => {
                            self.reply(reply, self.state);
                        }
                        PollerSignal::RefreshNow(reply) => {
                            self.poll_now().await;
                            self.reply(reply, self.state);
                            poll_interval.reset();
                        }
                        PollerSignal::Toggle(reply) => {
                            let result = self.toggle().await;
                            self.reply(reply, result);
                        }
                        PollerSignal::CheckHealth(reply) => {
                            let result = self
                                .transport
                                .health()
                                .await
                                .map_err(|e| e.to_string());
                            self.reply(reply, result);
                        }
                        PollerSignal::Subscribe(reply) => {
                            self.reply(reply, self.change_notifier.subscribe());
                        }
                    }
                },
                _ = poll_interval.tick() => {
                    self.poll_now().await;
                },
            };
        }
    }

    fn reply<V>(&self, reply: OneshotSender<V>, value: V) {
        if reply.send(value).is_err() {
            tracing::debug!("A flag handle stopped waiting for its reply");
        }
    }

    async fn poll_now(&mut self) {
        let fetched = self
            .transport
            .fetch_flags()
            .await
            .map_err(|e| e.to_string())
            .and_then(|doc| doc.enabled(&self.flag_key).map_err(|e| e.to_string()));

        let changed = match fetched {
            Ok(enabled) => {
                tracing::trace!(flag = %self.flag_key, enabled, "Fetched the flag");
                self.state.confirm(enabled, chrono::Utc::now())
            }
            Err(e) => {
                tracing::warn!(flag = %self.flag_key, %e, "Error getting the flag state");
                self.state.settle_failure()
            }
        };

        if changed {
            self.notify();
        }
    }

    async fn toggle(&mut self) -> Result<bool, String> {
        let desired = !self.state.enabled;

        match self
            .transport
            .write_flag(FlagUpdate { state: desired })
            .await
        {
            Ok(()) => {
                tracing::info!(flag = %self.flag_key, enabled = desired, "Synced the flag with the service");

                if self.state.confirm(desired, chrono::Utc::now()) {
                    self.notify();
                }

                Ok(desired)
            }
            Err(e) => {
                tracing::error!(flag = %self.flag_key, desired, %e, "The flag service rejected the update");

                Err(e.to_string())
            }
        }
    }

    fn notify(&self) {
        if let Err(e) = self.change_notifier.send(self.state) {
            tracing::trace!(%e, "No subscribers for the flag change");
        }
    }
}
