//! Thread model and reconstruction.
//!
//! - `item`: provider-neutral items, cursors, numeric id ordering
//! - `bucket`: page normalization and cursor consolidation
//! - `reconstruct`: forward/backward walk with on-demand pagination
//! - `status`: canonical output and the status-builder seam

pub mod bucket;
pub mod error;
pub mod item;
pub mod reconstruct;
pub mod status;

pub use bucket::{build_bucket, consolidate_cursors, status_from_result, Bucket, ParentLookup};
pub use error::{FetchError, ReconstructError};
pub use item::{compare_ids, Cursor, CursorDirection, Item, WalkDirection};
pub use reconstruct::{
    PageFetcher, ReconstructConfig, Reconstruction, ThreadReconstructor, WalkEnd,
};
pub use status::{
    AboutAccount, Author, BuildOutcome, Status, StatusBuilder, Thread, UsernameChanges,
};
