//! # RD Station client
//! A minimal OAuth2-authenticated client for the RD Station REST API,
//! based on the `Reqwest` library.
//!
//! The client covers two things: exchanging an authorization code (or a
//! refresh token) for a bearer token at `POST /auth`, and attaching that
//! token to generic calls against the API. It deliberately stops there:
//! no retries, no rate-limit handling, no pagination.
//!
//! ## Example code
//! ```no_run
//!# async fn doc_test() -> anyhow::Result<()> {
//! use rdstation_client::{Client, Error, Settings};
//!
//! // Credentials of the application registered in the RD Station app store
//! let settings = Settings {
//!     client_id: "xxxxxxxxxx".to_string(),
//!     client_secret: "xxxxxxxxxx".to_string(),
//!     redirect_uri: "https://my-app.example/callback".to_string(),
//! };
//!
//! // Without a code or token, authorize() reports the consent URL to visit
//! let mut client = Client::new(settings.clone());
//! if let Err(Error::MissingAuthorization { url, .. }) = client.authorize().await {
//!     println!("visit {} to authorize the application", url);
//! }
//!
//! // With the code from the consent redirect, authorize() fetches the token pair
//! let mut client = Client::new(settings).with_code("code-from-the-redirect");
//! client.authorize().await?;
//!
//! let response = client.get("/platform/contacts/email:someone@example.com", None, None).await?;
//! println!("{}", response.text().await?);
//!# Ok(())
//!# }
//! ```
mod api;
mod client;
mod error;
mod settings;

pub use crate::api::Api;
pub use crate::client::{Client, BASE_URL};
pub use crate::error::{Error, Result};
pub use crate::settings::Settings;
