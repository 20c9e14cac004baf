//! Patch waypoints: the patches of one issue, ordered, and matched against
//! the commits of its feature branch.

pub mod branch;
pub mod message;
pub mod naming;
pub mod patch;
pub mod reconcile;

pub use branch::{FeatureBranch, MasterBranch};
pub use message::{CommitMarker, CommitMessageCodec};
pub use naming::{interdiff_base, interdiff_filename, patch_filename};
pub use patch::{PatchSequence, PatchWaypoint};
pub use reconcile::{ReconcileStatus, Reconciler, ReconciliationReport};
