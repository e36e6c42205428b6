use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token exchange failed: {0}")]
    Exchange(String),

    #[error("Token exchange returned an empty token")]
    EmptyToken,
}
