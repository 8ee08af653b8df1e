pub mod custom;
pub mod invoker;
pub mod registry;
pub mod render;

pub use custom::CustomTool;
pub use invoker::{invoke, validate_arguments};
pub use registry::{RegisteredTool, RegistryError, ToolRegistry, ToolTarget};
