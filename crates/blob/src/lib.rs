pub mod backend;
pub mod error;
pub mod local;
pub mod memory;

pub use backend::{BlobBackend, validate_key};
pub use error::BlobError;
pub use local::LocalBlobBackend;
pub use memory::MemoryBlobBackend;
