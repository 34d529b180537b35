//! Storage module for attachment blobs.
//!
//! Provides the `BlobStore` collaborator trait plus the local filesystem
//! implementation used by the attachment versioning service.

mod local_store;

pub use local_store::{BlobStore, LocalBlobStore};
