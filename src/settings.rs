use serde::Deserialize;

/// OAuth application credentials, as registered with the RD Station app store.
///
/// Immutable once constructed; the client never mutates these.
#[derive(Clone, Deserialize)]
pub struct Settings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}
