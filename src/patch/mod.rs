//! Patch computation and application.
//!
//! - [`diff`]: base + pasted input → [`Patch`](crate::types::Patch), with
//!   warnings and a change summary.
//! - [`apply`]: base + patch → merged collection.
//! - [`changeset`]: changed-field sets for matched entries.
//! - [`equal`]: the structural equality every diff step uses.

pub mod apply;
pub mod changeset;
pub mod diff;
pub mod equal;

pub use apply::{apply_patch, shallow_merge};
pub use diff::{compute_patch, ChangeSummary, DiffOptions, EntryChange, PatchComputation, PatchWarning};
pub use equal::values_equal;
