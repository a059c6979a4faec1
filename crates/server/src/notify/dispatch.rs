//! Dispatch engine.
//!
//! Delivers one rendered message to every address of a [`RecipientSet`],
//! sequentially and in set order. Each recipient gets at most one attempt per
//! run; failures are recorded and the run always covers the whole set.

use crate::notify::recipients::RecipientSet;
use crate::notify::transport::{MailTransport, RenderedMessage};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Admission control between two consecutive sends of one run.
#[async_trait]
pub trait SendPacer: Send + Sync {
    async fn pace(&self);
}

/// Paces sends at a fixed number of messages per second.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedRate {
    delay: Option<Duration>,
}

impl FixedRate {
    /// `0` (or anything non-positive) disables pacing, as does a rate so
    /// low that its delay does not fit a [`Duration`].
    pub fn per_second(messages_per_second: f64) -> Self {
        Self {
            delay: delay_for_rate(messages_per_second),
        }
    }

    pub fn unthrottled() -> Self {
        Self { delay: None }
    }

    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }
}

/// Time between two sends at `messages_per_second`, `None` when pacing is off
/// or the delay is not representable.
pub fn delay_for_rate(messages_per_second: f64) -> Option<Duration> {
    if !messages_per_second.is_finite() || messages_per_second <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / messages_per_second).ok()
}

#[async_trait]
impl SendPacer for FixedRate {
    async fn pace(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryState {
    Pending,
    Sending,
    Sent,
    Failed(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub address: String,
    pub state: DeliveryState,
}

/// Aggregate outcome of one dispatch run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
    pub failed_addresses: Vec<String>,
}

/// Book-keeping for a single pass over a recipient set.
#[derive(Debug)]
pub struct DispatchRun {
    state: RunState,
    deliveries: Vec<Delivery>,
}

impl DispatchRun {
    pub fn new(recipients: RecipientSet) -> Self {
        let deliveries = recipients
            .into_iter()
            .map(|address| Delivery {
                address,
                state: DeliveryState::Pending,
            })
            .collect();
        Self {
            state: RunState::Idle,
            deliveries,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn deliveries(&self) -> &[Delivery] {
        &self.deliveries
    }

    fn start(&mut self) {
        debug_assert_eq!(self.state, RunState::Idle);
        self.state = RunState::Running;
    }

    fn mark_sending(&mut self, idx: usize) {
        debug_assert_eq!(self.deliveries[idx].state, DeliveryState::Pending);
        self.deliveries[idx].state = DeliveryState::Sending;
    }

    fn settle(&mut self, idx: usize, outcome: DeliveryState) {
        debug_assert_eq!(self.deliveries[idx].state, DeliveryState::Sending);
        self.deliveries[idx].state = outcome;
    }

    fn complete(&mut self) -> DispatchResult {
        self.state = RunState::Completed;
        let mut result = DispatchResult {
            attempted: self.deliveries.len(),
            ..Default::default()
        };
        for delivery in &self.deliveries {
            match &delivery.state {
                DeliveryState::Sent => result.sent += 1,
                DeliveryState::Failed(_) => {
                    result.failed += 1;
                    result.failed_addresses.push(delivery.address.clone());
                }
                DeliveryState::Pending | DeliveryState::Sending => {}
            }
        }
        result
    }
}

/// Sends rendered messages through a [`MailTransport`], one recipient at a time.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn MailTransport>,
    pacer: Arc<dyn SendPacer>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn MailTransport>, pacer: Arc<dyn SendPacer>) -> Self {
        Self { transport, pacer }
    }

    /// Runs a full pass over `recipients`. Never fails: individual errors end
    /// up in [`DispatchResult::failed_addresses`].
    #[tracing::instrument(skip_all, fields(recipients = recipients.len(), subject = %message.subject))]
    pub async fn dispatch(
        &self,
        recipients: RecipientSet,
        message: &RenderedMessage,
    ) -> DispatchResult {
        let mut run = DispatchRun::new(recipients);
        run.start();

        let total = run.deliveries.len();
        for idx in 0..total {
            if idx > 0 {
                self.pacer.pace().await;
            }
            run.mark_sending(idx);
            let address = run.deliveries[idx].address.clone();
            let outcome = match self.transport.send(&address, message).await {
                Ok(()) => {
                    tracing::info!(to = %address, "Email sent");
                    DeliveryState::Sent
                }
                Err(e) => {
                    tracing::error!(
                        name = "notify.dispatch.send_failed",
                        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                        error = %e,
                        to = %address,
                        message = "Failed to send email"
                    );
                    DeliveryState::Failed(e.to_string())
                }
            };
            run.settle(idx, outcome);
        }

        let result = run.complete();
        tracing::info!(
            attempted = result.attempted,
            sent = result.sent,
            failed = result.failed,
            "Dispatch run completed"
        );
        result
    }
}
