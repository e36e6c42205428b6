mod broker;
mod error;

pub use broker::{
    RefreshOutcome, SessionCredentials, TokenBroker, TokenExchanger, TokenRequest, TokenWaiter,
    TOKEN_TOPIC,
};
pub use error::AuthError;

pub type Result<T> = std::result::Result<T, AuthError>;
