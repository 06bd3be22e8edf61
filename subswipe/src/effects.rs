//! Carrying out the I/O that session transitions ask for.
//!
//! Single-swipe deletes are spawned and forgotten: the outcome is logged and reported back on a
//! channel, but the stack has already moved on. Bulk deletes run one at a time with a fixed pause
//! between calls.

use crate::session::{BulkPlan, Effect};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Pause between two deletes of a bulk run.
pub const BULK_DELETE_DELAY: Duration = Duration::from_millis(100);

/// Something that can delete a subscription.
///
/// Returns `false` rather than an error on failure; callers only ever count or log the outcome.
pub trait Unsubscriber: Send + Sync {
    fn delete_subscription(&self, subscription_id: &str) -> impl Future<Output = bool> + Send;
}

/// Outcome of one background delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub subscription_id: String,
    pub name: String,
    pub succeeded: bool,
}

/// Counts of a finished bulk run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BulkSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// Subscription ids that were deleted.
    pub deleted: Vec<String>,
}

impl BulkSummary {
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }
}

impl std::fmt::Display for BulkSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unsubscribed from {} channels. ", self.succeeded)?;
        if self.failed > 0 {
            write!(f, "Failed: {}", self.failed)
        } else {
            write!(f, "All successful!")
        }
    }
}

/// Spawns effects onto the tokio runtime.
#[derive(Debug, Clone)]
pub struct EffectRunner<U> {
    remover: U,
    reports: mpsc::UnboundedSender<DeleteReport>,
}

impl<U> EffectRunner<U>
where
    U: Unsubscriber + Clone + 'static,
{
    /// Returns the runner and the receiving end for delete outcomes.
    pub fn new(remover: U) -> (Self, mpsc::UnboundedReceiver<DeleteReport>) {
        let (reports, rx) = mpsc::unbounded_channel();
        (Self { remover, reports }, rx)
    }

    /// Starts every effect without waiting for any of them.
    pub fn run(&self, effects: Vec<Effect>) -> Vec<JoinHandle<()>> {
        effects
            .into_iter()
            .map(|effect| match effect {
                Effect::Unsubscribe {
                    channel_id,
                    subscription_id,
                    name,
                } => {
                    let remover = self.remover.clone();
                    let reports = self.reports.clone();
                    tokio::spawn(async move {
                        tracing::info!(channel = %name, %channel_id, %subscription_id, "unsubscribing");
                        let succeeded = remover.delete_subscription(&subscription_id).await;
                        if succeeded {
                            tracing::info!(channel = %name, "unsubscribed");
                        } else {
                            tracing::error!(channel = %name, "unsubscribe failed");
                        }
                        // the receiver is gone once the session has ended; nobody needs the report then
                        let _ = reports.send(DeleteReport {
                            subscription_id,
                            name,
                            succeeded,
                        });
                    })
                }
            })
            .collect()
    }
}

/// Deletes every target of `plan` in order, one request at a time, pausing `delay` between calls.
pub async fn run_bulk_unsubscribe<U: Unsubscriber>(
    plan: &BulkPlan,
    remover: &U,
    delay: Duration,
) -> BulkSummary {
    let mut summary = BulkSummary::default();
    for (i, target) in plan.targets.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(delay).await;
        }
        tracing::info!(channel = %target.name, "unsubscribing");
        if remover.delete_subscription(&target.subscription_id).await {
            summary.succeeded += 1;
            summary.deleted.push(target.subscription_id.clone());
        } else {
            summary.failed += 1;
            tracing::error!(channel = %target.name, "failed to unsubscribe");
        }
    }
    tracing::info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        "bulk unsubscribe done"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use crate::session::{BulkTarget, Direction, Session};
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Records calls and answers from a script; `true` once the script runs out.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct ScriptedRemover {
        answers: Arc<Mutex<VecDeque<bool>>>,
        pub(crate) calls: Arc<Mutex<Vec<String>>>,
        in_flight: Arc<AtomicUsize>,
        pub(crate) max_in_flight: Arc<AtomicUsize>,
    }

    impl ScriptedRemover {
        pub(crate) fn answering(answers: impl IntoIterator<Item = bool>) -> Self {
            Self {
                answers: Arc::new(Mutex::new(answers.into_iter().collect())),
                ..Default::default()
            }
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Unsubscriber for ScriptedRemover {
        async fn delete_subscription(&self, subscription_id: &str) -> bool {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.calls.lock().unwrap().push(subscription_id.to_string());
            tokio::time::sleep(Duration::from_millis(25)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.answers.lock().unwrap().pop_front().unwrap_or(true)
        }
    }

    fn target(n: usize) -> BulkTarget {
        BulkTarget {
            channel_id: format!("c{n}"),
            subscription_id: format!("s{n}"),
            name: format!("Channel {n}"),
        }
    }

    fn channel(id: &str, subscription_id: Option<&str>) -> Channel {
        Channel {
            id: id.to_string(),
            subscription_id: subscription_id.map(str::to_string),
            name: id.to_string(),
            avatar: String::new(),
            subscribers: "Unknown".to_string(),
            last_upload: "Unknown".to_string(),
            last_upload_date: None,
            description: String::new(),
            category: "YouTube".to_string(),
            is_inactive: false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn bulk_counts_successes_and_failures_sequentially() {
        let plan = BulkPlan {
            targets: (0..5).map(target).collect(),
        };
        let remover = ScriptedRemover::answering([true, false, true, false, true]);

        let start = tokio::time::Instant::now();
        let summary = run_bulk_unsubscribe(&plan, &remover, BULK_DELETE_DELAY).await;

        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.deleted, vec!["s0", "s2", "s4"]);
        assert_eq!(remover.calls(), vec!["s0", "s1", "s2", "s3", "s4"]);
        assert_eq!(remover.max_in_flight.load(Ordering::SeqCst), 1);
        // four pauses between five calls, plus the simulated latency of each call
        assert!(start.elapsed() >= BULK_DELETE_DELAY * 4 + Duration::from_millis(25) * 5);
        assert_eq!(summary.to_string(), "Unsubscribed from 3 channels. Failed: 2");
    }

    #[tokio::test(start_paused = true)]
    async fn bulk_over_bin_with_demo_leftover_deletes_twice() {
        let mut session = Session::live(
            vec![
                channel("a", Some("sa")),
                channel("leftover", None),
                channel("b", Some("sb")),
            ],
            true,
        );
        let mut dispatched = Vec::new();
        for _ in 0..3 {
            dispatched.extend(session.swipe(Direction::Remove));
        }
        assert_eq!(dispatched.len(), 2);
        // both background deletes failed, so the bulk run picks them up again
        for (subscription_id, name) in [("sa", "a"), ("sb", "b")] {
            session.record_delete(&DeleteReport {
                subscription_id: subscription_id.to_string(),
                name: name.to_string(),
                succeeded: false,
            });
        }

        let plan = session.begin_bulk_unsubscribe(true).unwrap();
        let remover = ScriptedRemover::default();
        let summary = run_bulk_unsubscribe(&plan, &remover, BULK_DELETE_DELAY).await;
        session.finish_bulk_unsubscribe(&summary);

        assert_eq!(remover.calls(), vec!["sb", "sa"]);
        assert_eq!(summary.attempted(), 2);
        assert_eq!(summary.to_string(), "Unsubscribed from 2 channels. All successful!");
        assert!(!session.is_bulk_running());
        assert!(session.bin().iter().filter(|c| c.is_deletable()).all(|c| session.is_deleted(c)));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_plan_issues_nothing() {
        let remover = ScriptedRemover::default();
        let summary = run_bulk_unsubscribe(&BulkPlan::default(), &remover, BULK_DELETE_DELAY).await;
        assert_eq!(summary, BulkSummary::default());
        assert!(remover.calls().is_empty());
    }

    #[tokio::test]
    async fn swipe_effects_report_back() {
        let remover = ScriptedRemover::answering([false]);
        let (runner, mut reports) = EffectRunner::new(remover.clone());

        let mut session = Session::live(vec![channel("a", Some("sa"))], true);
        let effects = session.swipe(Direction::Remove);
        // the stack has moved on before anything ran
        assert!(session.pending().is_empty());
        assert_eq!(session.bin().len(), 1);

        for handle in runner.run(effects) {
            handle.await.unwrap();
        }
        let report = reports.recv().await.unwrap();
        assert_eq!(
            report,
            DeleteReport {
                subscription_id: "sa".to_string(),
                name: "a".to_string(),
                succeeded: false,
            }
        );
        assert_eq!(remover.calls(), vec!["sa"]);

        session.record_delete(&report);
        assert!(!session.is_deleted(&session.bin()[0]));
    }
}
