//! Periodic state synchronization for observers.
//!
//! There is no push channel anywhere in this system: buyer pages and
//! reviewer dashboards converge by re-fetching state on a fixed cadence.
//! Each subscription spawns one polling task that re-reads the ledger
//! and publishes the result over a `watch` channel, superseding the
//! previous value wholesale; a transition missed between polls
//! self-heals on the next one. Polling is strictly read-only, and
//! dropping a feed aborts its task, so no timers outlive their view.

use crate::error::Result;
use crate::pool::PoolSnapshot;
use crate::request::PurchaseRequest;
use crate::types::{RaffleId, RequestStatus};
use crate::workflow::ReviewWorkflow;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Which of the two observed polling speeds a subscription uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedCadence {
    /// Reviewer queues and the admin number grid (~3s).
    Review,
    /// The buyer-facing number grid during selection (~3-5s).
    Storefront,
}

impl FeedCadence {
    /// The configured interval for this cadence.
    #[must_use]
    pub const fn interval(&self, config: &crate::config::CoreConfig) -> Duration {
        match self {
            Self::Review => config.review_poll_interval,
            Self::Storefront => config.storefront_poll_interval,
        }
    }
}

/// Spawns polling subscriptions over the workflow's read path.
#[derive(Debug, Clone)]
pub struct StateSyncFeed {
    workflow: Arc<ReviewWorkflow>,
}

impl StateSyncFeed {
    /// Create a feed over `workflow`.
    #[must_use]
    pub const fn new(workflow: Arc<ReviewWorkflow>) -> Self {
        Self { workflow }
    }

    /// Subscribe to one raffle's number partition.
    ///
    /// The feed is primed with a snapshot taken immediately, then
    /// re-polls on the cadence.
    ///
    /// # Errors
    ///
    /// [`crate::RifaError::RaffleNotFound`] when the raffle is unknown.
    pub async fn watch_pool(&self, raffle_id: RaffleId, cadence: FeedCadence) -> Result<PoolFeed> {
        let ledger = self.workflow.ledger();
        let initial = ledger.snapshot(raffle_id).await?;
        let every = cadence.interval(self.workflow.config());

        let (receiver, task) = spawn_poller(initial, every, move || {
            let ledger = Arc::clone(&ledger);
            async move {
                match ledger.snapshot(raffle_id).await {
                    Ok(snapshot) => Some(snapshot),
                    Err(err) => {
                        debug!(raffle_id = %raffle_id, error = %err, "pool poll failed; stopping feed");
                        None
                    }
                }
            }
        });

        metrics::gauge!("feed.subscriptions").increment(1.0);
        Ok(PoolFeed {
            raffle_id,
            receiver,
            task,
        })
    }

    /// Subscribe to one raffle's request queue in one status, as a
    /// reviewer dashboard does.
    ///
    /// # Errors
    ///
    /// [`crate::RifaError::RaffleNotFound`] when the raffle is unknown.
    pub async fn watch_queue(
        &self,
        raffle_id: RaffleId,
        status: RequestStatus,
        cadence: FeedCadence,
    ) -> Result<QueueFeed> {
        // Unknown raffles fail up front rather than producing an eternally
        // empty queue.
        let _ = self.workflow.ledger().raffle(raffle_id).await?;
        let initial = self.workflow.list_by_status(raffle_id, status).await;
        let every = cadence.interval(self.workflow.config());

        let workflow = Arc::clone(&self.workflow);
        let (receiver, task) = spawn_poller(initial, every, move || {
            let workflow = Arc::clone(&workflow);
            async move { Some(workflow.list_by_status(raffle_id, status).await) }
        });

        metrics::gauge!("feed.subscriptions").increment(1.0);
        Ok(QueueFeed {
            raffle_id,
            status,
            receiver,
            task,
        })
    }
}

/// A live, periodically refreshed view of one raffle's number pool.
#[derive(Debug)]
pub struct PoolFeed {
    raffle_id: RaffleId,
    receiver: watch::Receiver<PoolSnapshot>,
    task: JoinHandle<()>,
}

impl PoolFeed {
    /// The raffle being observed.
    #[must_use]
    pub const fn raffle_id(&self) -> RaffleId {
        self.raffle_id
    }

    /// The most recently published snapshot.
    #[must_use]
    pub fn latest(&self) -> PoolSnapshot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next published snapshot. Returns `false` once the
    /// feed has stopped publishing.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    /// Whether the polling task is still running.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PoolFeed {
    fn drop(&mut self) {
        self.task.abort();
        metrics::gauge!("feed.subscriptions").decrement(1.0);
    }
}

/// A live, periodically refreshed view of one reviewer queue.
#[derive(Debug)]
pub struct QueueFeed {
    raffle_id: RaffleId,
    status: RequestStatus,
    receiver: watch::Receiver<Vec<PurchaseRequest>>,
    task: JoinHandle<()>,
}

impl QueueFeed {
    /// The raffle being observed.
    #[must_use]
    pub const fn raffle_id(&self) -> RaffleId {
        self.raffle_id
    }

    /// The status this queue filters on.
    #[must_use]
    pub const fn status(&self) -> RequestStatus {
        self.status
    }

    /// The most recently published queue, oldest request first.
    #[must_use]
    pub fn latest(&self) -> Vec<PurchaseRequest> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next published queue. Returns `false` once the feed
    /// has stopped publishing.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    /// Whether the polling task is still running.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for QueueFeed {
    fn drop(&mut self) {
        self.task.abort();
        metrics::gauge!("feed.subscriptions").decrement(1.0);
    }
}

/// Spawn the shared poll loop: tick, fetch, publish, until either the
/// fetch says stop or every receiver is gone.
fn spawn_poller<T, F, Fut>(
    initial: T,
    every: Duration,
    fetch: F,
) -> (watch::Receiver<T>, JoinHandle<()>)
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Option<T>> + Send,
{
    let (sender, receiver) = watch::channel(initial);
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick of an interval fires immediately; the channel
        // is already primed, so consume it before the loop.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(value) = fetch().await else {
                break;
            };
            if sender.send(value).is_err() {
                break;
            }
        }
    });
    (receiver, task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;

    #[test]
    fn cadences_map_to_their_configured_intervals() {
        let config = CoreConfig {
            review_poll_interval: Duration::from_millis(3000),
            storefront_poll_interval: Duration::from_millis(5000),
            min_ticket_count: 2,
        };
        assert_eq!(FeedCadence::Review.interval(&config), Duration::from_millis(3000));
        assert_eq!(
            FeedCadence::Storefront.interval(&config),
            Duration::from_millis(5000)
        );
    }

    #[tokio::test]
    async fn poller_stops_when_the_fetch_says_stop() {
        let (receiver, task) =
            spawn_poller(0u32, Duration::from_millis(5), || async { None::<u32> });

        let joined = tokio::time::timeout(Duration::from_millis(500), task).await;
        assert!(matches!(joined, Ok(Ok(()))), "poller kept running");
        assert_eq!(*receiver.borrow(), 0);
    }

    #[tokio::test]
    async fn poller_stops_once_every_receiver_is_gone() {
        let (receiver, task) =
            spawn_poller(0u32, Duration::from_millis(5), || async { Some(1u32) });
        drop(receiver);

        let joined = tokio::time::timeout(Duration::from_millis(500), task).await;
        assert!(matches!(joined, Ok(Ok(()))), "poller kept running");
    }
}
