use crate::error::{Error, Result};
use log::trace;
use reqwest::{Client as HttpClient, Method, Response};
use serde_json::Value;
use std::collections::HashMap;

/// Generic request layer: knows the API host, holds the current bearer
/// token and turns `(verb, path, params, data, headers)` into exactly one
/// outbound HTTP call. It does not interpret status codes, deserialize
/// bodies or retry; the raw [`Response`] is handed back unmodified.
pub struct Api {
    base_url: String,
    access_token: Option<String>,
    http_client: HttpClient,
}

impl Api {
    pub fn new(base_url: impl Into<String>) -> Self {
        Api {
            base_url: base_url.into(),
            access_token: None,
            // The underlying http client is reused for every call
            http_client: HttpClient::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn set_access_token(&mut self, token: Option<String>) {
        self.access_token = token;
    }

    /// Default header map for outgoing calls. Always carries
    /// `Content-Type: application/json`; carries `Authorization: Bearer <token>`
    /// iff a token is currently held.
    pub fn headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        if let Some(token) = &self.access_token {
            headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        }
        headers
    }

    /// Whether `verb` carries a JSON body (as opposed to query parameters).
    /// Case-insensitive; true for exactly `delete`, `patch`, `post` and `put`.
    pub fn supports_body(verb: &str) -> bool {
        matches!(
            verb.to_ascii_lowercase().as_str(),
            "delete" | "patch" | "post" | "put"
        )
    }

    /// Plain concatenation of the base URL and `path`; no validation or
    /// escaping beyond what the caller already provides.
    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issue a single HTTP call.
    ///
    /// `extra_headers` are merged over [`Api::headers`], caller values
    /// winning on key collision. Body-carrying verbs send `data` as JSON
    /// (no body at all when `data` is absent or empty) and ignore `params`;
    /// every other verb sends `params` as the query string and never a
    /// body.
    pub async fn request(
        &self,
        verb: &str,
        path: &str,
        params: Option<&[(&str, &str)]>,
        data: Option<&Value>,
        extra_headers: Option<&HashMap<String, String>>,
    ) -> Result<Response> {
        let method = method_for(verb)?;
        let url = self.build_url(path);

        let mut headers = self.headers();
        if let Some(extra) = extra_headers {
            for (name, value) in extra {
                headers.insert(name.clone(), value.clone());
            }
        }

        let mut builder = self.http_client.request(method, &url);
        for (name, value) in &headers {
            builder = builder.header(name, value);
        }

        if Self::supports_body(verb) {
            if let Some(data) = data.filter(|data| !is_empty_payload(data)) {
                builder = builder.json(data);
            }
        } else if let Some(params) = params {
            builder = builder.query(params);
        }

        trace!("{} {}", verb.to_ascii_uppercase(), url);
        Ok(builder.send().await?)
    }

    pub async fn get(
        &self,
        path: &str,
        params: Option<&[(&str, &str)]>,
        data: Option<&Value>,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<Response> {
        self.request("get", path, params, data, headers).await
    }

    pub async fn delete(
        &self,
        path: &str,
        params: Option<&[(&str, &str)]>,
        data: Option<&Value>,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<Response> {
        self.request("delete", path, params, data, headers).await
    }

    pub async fn post(
        &self,
        path: &str,
        params: Option<&[(&str, &str)]>,
        data: Option<&Value>,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<Response> {
        self.request("post", path, params, data, headers).await
    }

    pub async fn patch(
        &self,
        path: &str,
        params: Option<&[(&str, &str)]>,
        data: Option<&Value>,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<Response> {
        self.request("patch", path, params, data, headers).await
    }

    pub async fn put(
        &self,
        path: &str,
        params: Option<&[(&str, &str)]>,
        data: Option<&Value>,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<Response> {
        self.request("put", path, params, data, headers).await
    }
}

// Explicit verb table; dispatch never goes through reflection or string
// parsing beyond this match.
fn method_for(verb: &str) -> Result<Method> {
    match verb.to_ascii_lowercase().as_str() {
        "get" => Ok(Method::GET),
        "delete" => Ok(Method::DELETE),
        "head" => Ok(Method::HEAD),
        "options" => Ok(Method::OPTIONS),
        "patch" => Ok(Method::PATCH),
        "post" => Ok(Method::POST),
        "put" => Ok(Method::PUT),
        other => Err(Error::UnsupportedMethod(other.to_string())),
    }
}

// Empty payloads are dropped rather than serialized to `null`/`{}`.
fn is_empty_payload(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::Bool(value) => !value,
        Value::Number(_) => false,
        Value::String(value) => value.is_empty(),
        Value::Array(values) => values.is_empty(),
        Value::Object(values) => values.is_empty(),
    }
}
