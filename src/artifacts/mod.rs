pub mod ini;
pub mod serializer;
pub mod service;

pub use serializer::{
    Artifacts, REMOTE_DESCRIPTOR, REMOTE_WALL_CONFIG, deserialize, serialize, write_artifacts,
};
pub use service::ServiceBundle;
