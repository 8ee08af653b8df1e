// Resource layer for toolbridge: handler trait, catalog, metadata and stores

pub mod types;
pub mod error;
pub mod handler;
pub mod memory;
pub mod users;

pub use error::{ExecutionError, FieldError, MetadataError};
pub use handler::{ResourceCatalog, ResourceHandler};
pub use memory::MemoryResource;
pub use types::*;
