use crate::api::Api;
use crate::error::{Error, Result};
use crate::settings::Settings;
use log::{debug, trace};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use url::form_urlencoded;

/// The RD Station API host.
pub const BASE_URL: &str = "https://api.rd.services";

/// OAuth2 client for the RD Station API.
///
/// Holds the application credentials and the current token pair, and owns a
/// generic request layer ([`Api`]) that attaches the bearer token to every
/// outgoing call. The token lifecycle has two states, keyed purely on
/// whether an access token is held:
///
/// - no token and no authorization code: [`Client::authorize`] fails with
///   [`Error::MissingAuthorization`] carrying the consent-dialog URL the
///   end user must visit;
/// - a code or a token is held: [`Client::authorize`] exchanges it at
///   `POST /auth` for a fresh access/refresh pair.
///
/// Once a refresh token exists it is always preferred over the original
/// authorization code, which is never reused.
pub struct Client {
    api: Api,
    settings: Settings,
    code: Option<String>,
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

impl Client {
    pub fn new(settings: Settings) -> Self {
        Self::with_base_url(settings, BASE_URL)
    }

    /// Point the client at a different host. Intended for tests and
    /// sandboxed environments; production use wants [`Client::new`].
    pub fn with_base_url(settings: Settings, base_url: impl Into<String>) -> Self {
        Client {
            api: Api::new(base_url),
            settings,
            code: None,
            refresh_token: None,
        }
    }

    /// Attach an authorization code obtained from the consent redirect.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach an access token obtained out-of-band.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.api.set_access_token(Some(token.into()));
        self
    }

    /// True iff no access token is currently held.
    pub fn missing_token(&self) -> bool {
        self.api.access_token().is_none()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.api.access_token()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// The browser consent-dialog URL for this application. Never called by
    /// the client itself; surfaced through [`Error::MissingAuthorization`]
    /// so the caller can redirect an end user to it.
    pub fn authorization_url(&self) -> String {
        let query: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("redirect_uri", &self.settings.redirect_uri)
            .finish();
        format!("{}/auth/dialog?{}", self.api.base_url(), query)
    }

    /// Obtain or rotate the token pair.
    ///
    /// Without a token or an authorization code this fails with
    /// [`Error::MissingAuthorization`]; the caller must run the browser
    /// consent flow and come back with a code. Otherwise a token exchange
    /// is attempted. An exchange answered with anything other than 200
    /// leaves the stored pair untouched and still returns `Ok(())`.
    pub async fn authorize(&mut self) -> Result<()> {
        if self.missing_token() && self.code.is_none() {
            Err(self.missing_authorization())
        } else {
            self.generate_token().await
        }
    }

    fn missing_authorization(&self) -> Error {
        let url = self.authorization_url();
        Error::MissingAuthorization {
            message: format!(
                "No access token found. Visit the site \"{}\" to start the authorization process",
                url
            ),
            url,
        }
    }

    /// Exchange the held credential for a fresh token pair at `POST /auth`.
    ///
    /// Both tokens are overwritten together on a 200; any other status
    /// changes nothing.
    async fn generate_token(&mut self) -> Result<()> {
        let mut data = json!({
            "client_id": self.settings.client_id,
            "client_secret": self.settings.client_secret,
        });

        // The refresh token always wins once one exists; the authorization
        // code is only sent on the first exchange and never reused.
        if let Some(refresh_token) = &self.refresh_token {
            data["refresh_token"] = json!(refresh_token);
        } else if let Some(code) = &self.code {
            data["code"] = json!(code);
        }

        trace!("Exchanging credentials for a token pair at /auth");
        let response = self.api.post("/auth", None, Some(&data), None).await?;

        if response.status() == StatusCode::OK {
            let tokens: TokenResponse = response.json().await?;
            debug!("Token exchange succeeded, rotating the stored token pair");
            self.api.set_access_token(Some(tokens.access_token));
            self.refresh_token = Some(tokens.refresh_token);
        } else {
            debug!(
                "Token exchange returned {}, keeping the current token pair",
                response.status()
            );
        }

        Ok(())
    }

    pub async fn get(
        &self,
        path: &str,
        params: Option<&[(&str, &str)]>,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<Response> {
        self.api.get(path, params, None, headers).await
    }

    pub async fn delete(
        &self,
        path: &str,
        data: Option<&Value>,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<Response> {
        self.api.delete(path, None, data, headers).await
    }

    pub async fn post(
        &self,
        path: &str,
        data: Option<&Value>,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<Response> {
        self.api.post(path, None, data, headers).await
    }

    pub async fn patch(
        &self,
        path: &str,
        data: Option<&Value>,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<Response> {
        self.api.patch(path, None, data, headers).await
    }

    pub async fn put(
        &self,
        path: &str,
        data: Option<&Value>,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<Response> {
        self.api.put(path, None, data, headers).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings() -> Settings {
        Settings {
            client_id: "123".to_string(),
            client_secret: "456".to_string(),
            redirect_uri: "https://foo.bar".to_string(),
        }
    }

    #[test]
    fn missing_token_is_true_without_a_token() {
        let client = Client::new(settings());

        assert!(client.missing_token());
    }

    #[test]
    fn missing_token_is_false_with_a_token() {
        let client = Client::new(settings()).with_access_token("123123123");

        assert!(!client.missing_token());
    }

    #[tokio::test]
    async fn authorize_without_token_or_code_signals_missing_authorization() {
        let mut client = Client::new(settings());

        let error = client.authorize().await.unwrap_err();

        match error {
            Error::MissingAuthorization { message, url } => {
                assert_eq!(
                    url,
                    "https://api.rd.services/auth/dialog?client_id=123&redirect_uri=https%3A%2F%2Ffoo.bar"
                );
                assert!(message.starts_with("No access token found. Visit the site"));
                assert!(message.contains(&url));
            }
            other => panic!("expected MissingAuthorization, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn first_exchange_sends_the_code_and_stores_the_pair() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "A",
                "refresh_token": "B",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = Client::with_base_url(settings(), server.uri()).with_code("code");
        client.authorize().await.unwrap();

        assert_eq!(client.access_token(), Some("A"));
        assert_eq!(client.refresh_token(), Some("B"));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "client_id": "123",
                "client_secret": "456",
                "code": "code",
            })
        );
    }

    #[tokio::test]
    async fn refresh_exchange_prefers_the_refresh_token_over_the_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "new_access_token",
                "refresh_token": "new_refresh_token",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = Client::with_base_url(settings(), server.uri())
            .with_code("code")
            .with_access_token("access_token");
        client.refresh_token = Some("refresh_token".to_string());

        client.authorize().await.unwrap();

        assert_eq!(client.access_token(), Some("new_access_token"));
        assert_eq!(client.refresh_token(), Some("new_refresh_token"));

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "client_id": "123",
                "client_secret": "456",
                "refresh_token": "refresh_token",
            })
        );
    }

    #[tokio::test]
    async fn failed_exchange_changes_nothing_and_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = Client::with_base_url(settings(), server.uri());
        client.generate_token().await.unwrap();

        assert_eq!(client.access_token(), None);
        assert_eq!(client.refresh_token(), None);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_the_previous_pair() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let mut client =
            Client::with_base_url(settings(), server.uri()).with_access_token("access_token");
        client.refresh_token = Some("refresh_token".to_string());

        client.authorize().await.unwrap();

        assert_eq!(client.access_token(), Some("access_token"));
        assert_eq!(client.refresh_token(), Some("refresh_token"));
    }

    #[tokio::test]
    async fn resource_calls_carry_the_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/platform/contacts"))
            .and(header("Authorization", "Bearer token-123"))
            .and(header("Content-Type", "application/json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            Client::with_base_url(settings(), server.uri()).with_access_token("token-123");
        let response = client.get("/platform/contacts", None, None).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
