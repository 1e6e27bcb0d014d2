pub mod api;
pub mod error;
pub mod name;
pub mod record;
pub mod tags;
pub mod ttl;

pub use api::{AuthStatus, RecentEntry, SearchEntry, SearchTagsResponse, SendResponse};
pub use error::ValidationError;
pub use name::sanitize_name;
pub use record::{BackendInfo, Record, StorageKind};
pub use tags::parse_tags;
pub use ttl::{expiration_for, parse_duration};
