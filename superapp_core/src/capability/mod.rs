//! Topic to handler mapping and the per-app allow-list that gates it.

mod allow_list;
pub mod handlers;
mod registry;

pub use allow_list::{AllowList, ALLOWED_BRIDGE_METHODS_CONFIG_KEY};
pub use registry::{BridgeHandler, CapabilityRegistry};
