//! Connection supervisor - keeps active identities connected.
//!
//! Independent of the scheduler: it only reads the identity collection and
//! talks to the gateway.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::gateway::Gateway;
use crate::model::Identity;
use crate::pacing::Sleeper;
use crate::store::Store;

/// What a single identity check did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Connected,
    Restarted,
    RestartFailed,
    Skipped,
}

pub struct Supervisor<S, G, Z> {
    store: S,
    gateway: G,
    sleeper: Z,
    interval: Duration,
}

impl<S, G, Z> Supervisor<S, G, Z>
where
    S: Store,
    G: Gateway,
    Z: Sleeper,
{
    pub fn new(store: S, gateway: G, sleeper: Z) -> Self {
        Self {
            store,
            gateway,
            sleeper,
            interval: Duration::from_secs(20),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = self.interval.as_millis() as u64, "supervisor_started");

        while !*shutdown.borrow() {
            tokio::select! {
                _ = shutdown.changed() => break,
                result = self.tick() => {
                    if let Err(e) = result {
                        error!(error = %e, "supervisor_tick_failed");
                    }
                }
            }

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = self.sleeper.sleep(self.interval) => {}
            }
        }

        info!("supervisor_stopped");
    }

    /// Check every active identity concurrently. One identity's failure
    /// never affects another's check.
    pub async fn tick(&self) -> Result<Vec<(String, CheckOutcome)>> {
        let identities = self.store.load_identities()?;
        let active: Vec<&Identity> = identities.iter().filter(|i| i.active).collect();

        let checks = active.iter().map(|identity| self.check(identity));
        let outcomes = futures::future::join_all(checks).await;

        Ok(active
            .iter()
            .map(|identity| identity.id.clone())
            .zip(outcomes)
            .collect())
    }

    async fn check(&self, identity: &Identity) -> CheckOutcome {
        if !identity.has_credentials() {
            warn!(identity = %identity.name, "supervisor_identity_invalid");
            return CheckOutcome::Skipped;
        }

        match self.gateway.status(identity).await {
            Ok(true) => {
                info!(identity = %identity.name, "supervisor_identity_connected");
                return CheckOutcome::Connected;
            }
            Ok(false) => warn!(identity = %identity.name, "supervisor_identity_disconnected"),
            Err(e) => warn!(identity = %identity.name, error = %e, "supervisor_status_failed"),
        }

        match self.gateway.restart(identity).await {
            Ok(()) => CheckOutcome::Restarted,
            Err(e) => {
                error!(identity = %identity.name, error = %e, "supervisor_restart_failed");
                CheckOutcome::RestartFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::{identity, FakeGateway, RecordingSleeper};

    fn supervisor(
        identities: Vec<Identity>,
        gateway: FakeGateway,
    ) -> (Arc<MemoryStore>, Supervisor<Arc<MemoryStore>, FakeGateway, RecordingSleeper>) {
        let store = Arc::new(MemoryStore::new(identities, vec![], vec![]));
        let sup = Supervisor::new(store.clone(), gateway, RecordingSleeper::default());
        (store, sup)
    }

    #[tokio::test]
    async fn test_connected_identity_left_alone() {
        let gateway = FakeGateway::default();
        gateway.set_connected("a", true);
        let (_, sup) = supervisor(vec![identity("a")], gateway.clone());

        let outcomes = sup.tick().await.unwrap();
        assert_eq!(outcomes, vec![("a".to_string(), CheckOutcome::Connected)]);
        assert!(gateway.restarts().is_empty());
    }

    #[tokio::test]
    async fn test_disconnected_identity_restarted() {
        let gateway = FakeGateway::default();
        gateway.set_connected("a", false);
        let (_, sup) = supervisor(vec![identity("a")], gateway.clone());

        sup.tick().await.unwrap();
        assert_eq!(gateway.restarts(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_status_error_triggers_restart() {
        // No recorded state for "a": the status query fails.
        let gateway = FakeGateway::default();
        let (_, sup) = supervisor(vec![identity("a")], gateway.clone());

        let outcomes = sup.tick().await.unwrap();
        assert_eq!(outcomes[0].1, CheckOutcome::Restarted);
        assert_eq!(gateway.restarts(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_inactive_and_invalid_identities() {
        let mut inactive = identity("off");
        inactive.active = false;
        let mut no_token = identity("bare");
        no_token.token.clear();

        let gateway = FakeGateway::default();
        let (_, sup) = supervisor(vec![inactive, no_token], gateway.clone());

        let outcomes = sup.tick().await.unwrap();
        assert_eq!(outcomes, vec![("bare".to_string(), CheckOutcome::Skipped)]);
        assert!(gateway.status_checks().is_empty());
        assert!(gateway.restarts().is_empty());
    }

    #[tokio::test]
    async fn test_restart_failure_does_not_stop_other_checks() {
        let gateway = FakeGateway::default();
        gateway.set_connected("a", false);
        gateway.fail_restart("a");
        gateway.set_connected("b", false);
        gateway.set_connected("c", true);
        let (_, sup) = supervisor(vec![identity("a"), identity("b"), identity("c")], gateway.clone());

        let outcomes = sup.tick().await.unwrap();
        assert_eq!(
            outcomes,
            vec![
                ("a".to_string(), CheckOutcome::RestartFailed),
                ("b".to_string(), CheckOutcome::Restarted),
                ("c".to_string(), CheckOutcome::Connected),
            ]
        );
    }

    #[tokio::test]
    async fn test_each_tick_rereads_identities() {
        let gateway = FakeGateway::default();
        gateway.set_connected("a", true);
        gateway.set_connected("b", false);
        let (store, sup) = supervisor(vec![identity("a")], gateway.clone());

        sup.tick().await.unwrap();
        store.set_identities(vec![identity("a"), identity("b")]);
        sup.tick().await.unwrap();

        assert_eq!(gateway.status_checks(), vec!["a", "a", "b"]);
        assert_eq!(gateway.restarts(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_run_loops_until_shutdown() {
        let gateway = FakeGateway::default();
        gateway.set_connected("a", false);
        let (_, sup) = supervisor(vec![identity("a")], gateway.clone());
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(sup.run(rx));

        for _ in 0..1000 {
            if gateway.restarts().len() >= 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(gateway.restarts().len() >= 2);
    }
}
