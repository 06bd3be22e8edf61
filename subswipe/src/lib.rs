//! Keep or drop your YouTube subscriptions one card at a time.
//!
//! A [`Session`] holds the stack of channels still to review, the bin of channels swiped away,
//! and a count of the ones kept. It is seeded either from [`demo::demo_channels`] or, after
//! [`ChannelDirectory::connect`], from the account's real subscriptions. Transitions are plain
//! synchronous methods; any provider I/O they need comes back as [`Effect`]s for an
//! [`EffectRunner`] to spawn.

pub mod channel;
pub mod demo;
pub mod directory;
pub mod effects;
pub mod error;
pub mod oauth;
pub mod session;
pub mod youtube_api;

pub use channel::Channel;
pub use directory::ChannelDirectory;
pub use effects::{
    BULK_DELETE_DELAY, BulkSummary, DeleteReport, EffectRunner, Unsubscriber, run_bulk_unsubscribe,
};
pub use error::{ApiError, AuthError, DeleteFailure};
pub use session::{
    BulkPlan, BulkRefusal, Direction, Effect, Mode, Phase, Session, SwipeStats, UndoOutcome,
};
