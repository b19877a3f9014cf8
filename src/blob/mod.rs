//! Content-addressable blob storage.
//!
//! Everything the thumbnail layer reads or writes goes through [`BlobStore`]:
//! source images are fetched by [`ContentRef`], and scaled outputs are stored
//! as new blobs whose references are then recorded in the thumbnail index.
//!
//! # Backends
//!
//! - [`MemoryStore`]: process-local, used by tests and ephemeral servers
//! - [`DiskStore`]: files under a root directory, sharded by digest

mod content_ref;
mod disk;
mod store;

pub use content_ref::{ContentRef, REF_PREFIX};
pub use disk::DiskStore;
pub use store::{BlobStore, MemoryStore};
