//! Host side of the guest bridge: inbound message parsing, per-call
//! contexts, correlated outbound callbacks and the per-session router.

mod context;
mod error;
mod message;
mod outbound;
mod router;

pub use context::{BridgeContext, Responder, ScanCallback};
pub use error::BridgeError;
pub use message::BridgeMessage;
pub use outbound::{
    pump, reject_method, resolve_method, GuestTransport, Outbound, OutboundKind, OutboundMessage,
    DEFAULT_NAMESPACE,
};
pub use router::{BridgeRouter, Dispatch, DropReason};

pub type Result<T> = std::result::Result<T, BridgeError>;
