pub mod blob_service;

pub use blob_service::{image_key, BlobError, BlobStore, MemoryBlobStore};
