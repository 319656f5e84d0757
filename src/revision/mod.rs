//! Revision chain resolution, the active pointer and commits.
//!
//! - [`chain`]: walk/replay and [`ChainResolver`].
//! - [`tracker`]: [`ActiveRevisionTracker`].
//! - [`manager`]: [`RevisionManager`], the facade over both.

pub mod chain;
pub mod manager;
pub mod tracker;

pub use chain::{
    empty_collection, replay, walk_chain, ChainResolver, ChainStop, ChainWalk, Replay,
    ResolvedCollection,
};
pub use manager::{RevisionManager, RevisionManagerOptions};
pub use tracker::{ActiveRevisionTracker, ACTIVE_REVISION_PREFIX};
