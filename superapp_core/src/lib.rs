pub mod bridge;
pub mod capability;
pub mod config;
pub mod host;
pub mod installer;
pub mod registry;
pub mod token;

pub use bridge::{BridgeContext, BridgeMessage, BridgeRouter, Dispatch, DropReason, Outbound};
pub use capability::{AllowList, BridgeHandler, CapabilityRegistry};
pub use config::{ConfigError, SuperAppConfig};
pub use host::{HostServices, HostUi, LocalDataStore};
pub use installer::{
    CatalogSource, InstallError, InstallQueue, Liveness, PackageStore, SyncController, SyncPlan,
};
pub use registry::{AppRegistry, AppStatus, MicroApp};
pub use token::{AuthError, TokenBroker, TokenExchanger};
