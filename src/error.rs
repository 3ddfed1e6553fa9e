use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// No access token and no authorization code are available, so no API
    /// call can be authorized. Not a transient fault: the caller must send
    /// an end user through the browser consent flow at `url` and come back
    /// with an authorization code.
    #[error("{message}")]
    MissingAuthorization { message: String, url: String },

    /// The verb passed to [`Api::request`](crate::Api::request) is not one
    /// the transport table knows about.
    #[error("unsupported HTTP method '{0}'")]
    UnsupportedMethod(String),

    /// Network-level or body-decoding failure, propagated from the
    /// underlying transport untranslated.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}
