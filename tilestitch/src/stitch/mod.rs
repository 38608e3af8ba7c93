//! Mosaic stitching over a catalog, with manifest bookkeeping.

mod coordinator;
mod error;
mod manifest;

pub use coordinator::{StitchCoordinator, StitchSummary};
pub use error::{StitchError, StitchResult};
pub use manifest::{merge_manifests, read_manifest, write_manifest, ManifestRow};
