//! The swipe session: which channels are still to review, which are in the bin, and how many
//! were kept.
//!
//! All mutation happens through the transition methods on [`Session`]. Transitions never do I/O
//! themselves; when a transition needs the provider to do something it returns an [`Effect`] that
//! the caller hands to an [`EffectRunner`](crate::effects::EffectRunner).

use crate::channel::Channel;
use crate::effects::{BulkSummary, DeleteReport};
use std::collections::{HashSet, VecDeque};
use thiserror::Error;

/// Which way a card was swiped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Swipe right: stay subscribed.
    Keep,
    /// Swipe left: move to the bin and unsubscribe.
    Remove,
}

/// Where the channels came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Fixture data; nothing ever reaches the provider.
    Demo,
    /// Backed by an authenticated account.
    Live {
        /// Whether the user granted the scope needed to delete subscriptions.
        write_granted: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// There is at least one card left.
    Reviewing,
    /// Every card has been swiped.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwipeStats {
    pub kept: usize,
    pub removed: usize,
    pub total: usize,
}

/// I/O a transition asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Delete the subscription right away, without waiting for the outcome.
    Unsubscribe {
        channel_id: String,
        subscription_id: String,
        name: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoOutcome {
    /// The channel is back on top of the stack.
    Restored,
    /// No channel with that id is in the bin.
    NotInBin,
    /// A delete was already sent for this channel, so putting the card back would lie about
    /// the account's state. Re-subscribing is left to the user.
    AlreadyDeleted,
}

/// Why a bulk unsubscribe did not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BulkRefusal {
    #[error("bulk unsubscribe needs a connected YouTube account")]
    DemoMode,
    #[error("the account did not grant permission to manage subscriptions")]
    WriteNotGranted,
    #[error("the bin is empty")]
    BinEmpty,
    /// Everything in the bin was already unsubscribed or came from demo data.
    #[error("nothing in the bin is left to unsubscribe from")]
    NothingToDelete,
    #[error("a bulk unsubscribe is already running")]
    AlreadyRunning,
    #[error("bulk unsubscribe was not confirmed")]
    NotConfirmed,
}

/// One delete a bulk run will issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkTarget {
    pub channel_id: String,
    pub subscription_id: String,
    pub name: String,
}

/// The deletes of one bulk run, in bin order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BulkPlan {
    pub targets: Vec<BulkTarget>,
}

/// State of one review session. Lives in memory only.
#[derive(Debug, Clone)]
pub struct Session {
    mode: Mode,
    /// Next card at the front.
    pending: VecDeque<Channel>,
    /// Most recently removed at the front.
    removed: VecDeque<Channel>,
    kept: usize,
    bin_open: bool,
    /// Subscription ids a delete has been sent for and not reported failed.
    deleted: HashSet<String>,
    bulk_running: bool,
}

impl Session {
    pub fn new(mode: Mode, channels: impl IntoIterator<Item = Channel>) -> Self {
        Self {
            mode,
            pending: channels.into_iter().collect(),
            removed: VecDeque::new(),
            kept: 0,
            bin_open: false,
            deleted: HashSet::new(),
            bulk_running: false,
        }
    }

    pub fn demo(channels: impl IntoIterator<Item = Channel>) -> Self {
        Self::new(Mode::Demo, channels)
    }

    pub fn live(channels: impl IntoIterator<Item = Channel>, write_granted: bool) -> Self {
        Self::new(Mode::Live { write_granted }, channels)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn phase(&self) -> Phase {
        if self.pending.is_empty() {
            Phase::Finished
        } else {
            Phase::Reviewing
        }
    }

    /// The card on top of the stack.
    pub fn current(&self) -> Option<&Channel> {
        self.pending.front()
    }

    pub fn pending(&self) -> &VecDeque<Channel> {
        &self.pending
    }

    pub fn bin(&self) -> &VecDeque<Channel> {
        &self.removed
    }

    pub fn kept(&self) -> usize {
        self.kept
    }

    pub fn stats(&self) -> SwipeStats {
        SwipeStats {
            kept: self.kept,
            removed: self.removed.len(),
            total: self.pending.len() + self.kept + self.removed.len(),
        }
    }

    pub fn is_bin_open(&self) -> bool {
        self.bin_open
    }

    /// Shows or hides the bin. Does not affect the stack.
    pub fn toggle_bin(&mut self) -> bool {
        self.bin_open = !self.bin_open;
        self.bin_open
    }

    pub fn is_bulk_running(&self) -> bool {
        self.bulk_running
    }

    /// Whether a delete has been sent for this channel's subscription.
    pub fn is_deleted(&self, channel: &Channel) -> bool {
        channel
            .subscription_id
            .as_ref()
            .is_some_and(|id| self.deleted.contains(id))
    }

    fn can_delete(&self) -> bool {
        matches!(
            self.mode,
            Mode::Live {
                write_granted: true
            }
        )
    }

    /// Swipes the top card.
    ///
    /// The stack advances immediately. A removal in a live session with write access also yields
    /// an [`Effect::Unsubscribe`]; its outcome never changes the stack. Swiping an empty stack does
    /// nothing.
    pub fn swipe(&mut self, direction: Direction) -> Vec<Effect> {
        let Some(channel) = self.pending.pop_front() else {
            tracing::debug!(?direction, "swipe ignored, nothing left to review");
            return Vec::new();
        };

        let mut effects = Vec::new();
        match direction {
            Direction::Keep => {
                tracing::debug!(channel = %channel.name, "kept");
                self.kept += 1;
            }
            Direction::Remove => {
                tracing::debug!(channel = %channel.name, "moved to bin");
                if self.can_delete()
                    && let Some(subscription_id) = &channel.subscription_id
                    && self.deleted.insert(subscription_id.clone())
                {
                    effects.push(Effect::Unsubscribe {
                        channel_id: channel.id.clone(),
                        subscription_id: subscription_id.clone(),
                        name: channel.name.clone(),
                    });
                }
                self.removed.push_front(channel);
            }
        }

        if self.pending.is_empty() {
            tracing::info!(stats = ?self.stats(), "all channels reviewed");
        }
        effects
    }

    /// Takes a channel back out of the bin and puts it on top of the stack.
    pub fn undo(&mut self, channel_id: &str) -> UndoOutcome {
        let Some(idx) = self.removed.iter().position(|c| c.id == channel_id) else {
            return UndoOutcome::NotInBin;
        };
        if self.is_deleted(&self.removed[idx]) {
            tracing::info!(channel_id, "undo refused, unsubscribe already sent");
            return UndoOutcome::AlreadyDeleted;
        }

        if let Some(channel) = self.removed.remove(idx) {
            tracing::debug!(channel = %channel.name, "restored from bin");
            self.pending.push_front(channel);
        }
        UndoOutcome::Restored
    }

    /// Records the outcome of a delete that ran in the background.
    ///
    /// A failed delete clears the deleted mark, which makes the channel eligible for undo and for
    /// the next bulk run.
    pub fn record_delete(&mut self, report: &DeleteReport) {
        if !report.succeeded && self.deleted.remove(&report.subscription_id) {
            tracing::debug!(
                subscription_id = %report.subscription_id,
                "background unsubscribe failed, channel can be retried"
            );
        }
    }

    /// Bin channels a bulk run would delete: those with a subscription id and no delete sent yet.
    fn bulk_targets(&self) -> Vec<BulkTarget> {
        self.removed
            .iter()
            .filter(|c| !self.is_deleted(c))
            .filter_map(|c| {
                Some(BulkTarget {
                    channel_id: c.id.clone(),
                    subscription_id: c.subscription_id.clone()?,
                    name: c.name.clone(),
                })
            })
            .collect()
    }

    /// How many deletes a bulk run started now would issue.
    pub fn bulk_candidate_count(&self) -> usize {
        self.bulk_targets().len()
    }

    /// Plans a bulk unsubscribe over the bin.
    ///
    /// Refuses outside live mode, while another run is in progress, when the bin holds nothing
    /// left to delete, or without confirmation. Callers can pass `confirmed = false` to run
    /// every other check before asking the user. On success the session is marked as running
    /// until [`Self::finish_bulk_unsubscribe`].
    pub fn begin_bulk_unsubscribe(&mut self, confirmed: bool) -> Result<BulkPlan, BulkRefusal> {
        match self.mode {
            Mode::Demo => return Err(BulkRefusal::DemoMode),
            Mode::Live {
                write_granted: false,
            } => return Err(BulkRefusal::WriteNotGranted),
            Mode::Live {
                write_granted: true,
            } => {}
        }
        if self.bulk_running {
            return Err(BulkRefusal::AlreadyRunning);
        }
        if self.removed.is_empty() {
            return Err(BulkRefusal::BinEmpty);
        }
        let targets = self.bulk_targets();
        if targets.is_empty() {
            return Err(BulkRefusal::NothingToDelete);
        }
        if !confirmed {
            return Err(BulkRefusal::NotConfirmed);
        }

        self.bulk_running = true;
        Ok(BulkPlan { targets })
    }

    /// Applies the result of a bulk run and clears the running flag.
    pub fn finish_bulk_unsubscribe(&mut self, summary: &BulkSummary) {
        self.deleted.extend(summary.deleted.iter().cloned());
        self.bulk_running = false;
    }
}
