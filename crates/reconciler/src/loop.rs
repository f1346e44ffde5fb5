//! Reconciliation loop: the scheduler side of the requeue contract.
//!
//! Reads declared positions from a [`DesiredStateProvider`], reconciles each
//! shutter, and calls again after the delay each outcome asks for. A
//! rejected declaration is reported once and left alone until its value
//! changes.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{RwLock, watch};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::reconciler::ShutterReconciler;
use crate::types::LoopReport;

/// Source of declared shutter positions, keyed by shutter name.
#[async_trait]
pub trait DesiredStateProvider: Send + Sync {
    async fn desired(&self) -> Result<BTreeMap<String, i64>>;
}

/// Desired state held in memory.
#[derive(Debug, Default)]
pub struct InMemoryDesiredStateProvider {
    shutters: RwLock<BTreeMap<String, i64>>,
}

impl InMemoryDesiredStateProvider {
    pub fn new(shutters: BTreeMap<String, i64>) -> Self {
        Self {
            shutters: RwLock::new(shutters),
        }
    }

    pub async fn set(&self, name: impl Into<String>, percentage: i64) {
        self.shutters.write().await.insert(name.into(), percentage);
    }

    pub async fn remove(&self, name: &str) {
        self.shutters.write().await.remove(name);
    }
}

#[async_trait]
impl DesiredStateProvider for InMemoryDesiredStateProvider {
    async fn desired(&self) -> Result<BTreeMap<String, i64>> {
        Ok(self.shutters.read().await.clone())
    }
}

/// Configuration for the reconciliation loop.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Pause before re-reading desired state when nothing is pending.
    pub idle_interval: Duration,
    /// Upper bound on passes; `None` runs until settled or stopped.
    pub max_passes: Option<usize>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            idle_interval: Duration::from_secs(1),
            max_passes: None,
        }
    }
}

/// Handle that stops a running loop.
#[derive(Debug, Clone)]
pub struct LoopStopper {
    tx: Arc<watch::Sender<bool>>,
}

impl LoopStopper {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }
}

/// Drives shutters until their observed state matches the declaration.
pub struct ReconciliationLoop {
    reconciler: Arc<ShutterReconciler>,
    provider: Arc<dyn DesiredStateProvider>,
    config: LoopConfig,
    stop_tx: Arc<watch::Sender<bool>>,
}

impl ReconciliationLoop {
    pub fn new(
        reconciler: Arc<ShutterReconciler>,
        provider: Arc<dyn DesiredStateProvider>,
        config: LoopConfig,
    ) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            reconciler,
            provider,
            config,
            stop_tx: Arc::new(stop_tx),
        }
    }

    pub fn stopper(&self) -> LoopStopper {
        LoopStopper {
            tx: Arc::clone(&self.stop_tx),
        }
    }

    /// Reconcile until every declared shutter is converged or rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the desired state cannot be read.
    pub async fn run_until_settled(&self) -> Result<LoopReport> {
        self.drive(true).await
    }

    /// Reconcile until stopped, picking up changed declarations.
    ///
    /// # Errors
    ///
    /// Returns an error if the desired state cannot be read.
    pub async fn run(&self) -> Result<LoopReport> {
        self.drive(false).await
    }

    async fn drive(&self, until_settled: bool) -> Result<LoopReport> {
        let mut stop = self.stop_tx.subscribe();
        let mut report = LoopReport::default();
        // Declared value each shutter last converged on or was rejected for.
        let mut settled: HashMap<String, i64> = HashMap::new();

        loop {
            if *stop.borrow_and_update() {
                report.stopped = true;
                break;
            }

            let pending = self
                .provider
                .desired()
                .await?
                .into_iter()
                .filter(|(name, desired)| settled.get(name) != Some(desired))
                .collect::<Vec<_>>();

            if pending.is_empty() && until_settled {
                break;
            }

            report.passes = report.passes.saturating_add(1);
            let mut wait: Option<Duration> = None;
            for (name, desired) in pending {
                let outcome = self.reconciler.reconcile(&name, desired).await;
                match outcome.requeue_after() {
                    Some(after) => wait = Some(wait.map_or(after, |w| w.min(after))),
                    None => {
                        if let Some(error) = outcome.error() {
                            warn!(shutter = %name, desired, error = %error, "Declaration rejected");
                        }
                        settled.insert(name.clone(), desired);
                    }
                }
                report.outcomes.insert(name, outcome.report());
            }

            if until_settled && wait.is_none() {
                break;
            }

            if self
                .config
                .max_passes
                .is_some_and(|max| report.passes >= max)
            {
                debug!(passes = report.passes, "Pass limit reached");
                break;
            }

            tokio::select! {
                () = tokio::time::sleep(wait.unwrap_or(self.config.idle_interval)) => {}
                changed = stop.changed() => {
                    if changed.is_ok() {
                        report.stopped = true;
                    }
                    break;
                }
            }
        }

        info!(
            passes = report.passes,
            stopped = report.stopped,
            "Reconciliation loop finished"
        );
        Ok(report)
    }
}
