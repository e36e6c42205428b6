mod app;
mod error;
mod snapshot;
mod store;

pub use app::{AppStatus, MicroApp, MicroAppConfig, Version, DEFAULT_DISPLAY_MODE};
pub use error::RegistryError;
pub use snapshot::RegistrySnapshot;
pub use store::{AppRegistry, StatusUpdate};

pub type Result<T> = std::result::Result<T, RegistryError>;
