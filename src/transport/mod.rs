//! HTTP transport seam
//!
//! The engine builds fully encoded requests (query string or form body) and
//! hands them to a [`Transport`]. Responses come back as raw text; the
//! engine never assumes the body is JSON.

mod http;
mod scripted;

use async_trait::async_trait;

use crate::common::Result;

pub use http::HttpTransport;
pub use scripted::ScriptedTransport;

/// Content type of form-encoded request bodies
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A fully resolved request ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: String,
    /// Absolute URL, query string included
    pub url: String,
    /// Form-encoded body for non-GET requests
    pub body: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// A body-less request, parameters already in the URL
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    /// A request carrying a form-encoded body
    pub fn form(method: impl Into<String>, url: impl Into<String>, body: String) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            body: Some(body),
            headers: vec![("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string())],
        }
    }

    /// Value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and raw body text of a response
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub text: String,
}

/// Sends requests to the API under test
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and read the whole body as text
    ///
    /// Network failures are `Err`; any HTTP status is `Ok`.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Encode key/value pairs as `application/x-www-form-urlencoded`
pub fn encode_form<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Append an encoded query string to a URL
pub fn append_query(url: &str, query: &str) -> String {
    if query.is_empty() {
        url.to_string()
    } else if url.contains('?') {
        format!("{}&{}", url, query)
    } else {
        format!("{}?{}", url, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_form_escapes_values() {
        let body = encode_form([("token", "a b"), ("q", "x&y=z")]);
        assert_eq!(body, "token=a+b&q=x%26y%3Dz");
    }

    #[test]
    fn test_form_request_declares_content_type() {
        let request = HttpRequest::form("POST", "http://a/x", "b=1".to_string());
        assert_eq!(request.header("content-type"), Some(FORM_CONTENT_TYPE));
        assert_eq!(HttpRequest::new("GET", "http://a/x?b=1").header("Content-Type"), None);
    }

    #[test]
    fn test_append_query() {
        assert_eq!(append_query("http://a/x", ""), "http://a/x");
        assert_eq!(append_query("http://a/x", "b=1"), "http://a/x?b=1");
        assert_eq!(append_query("http://a/x?a=0", "b=1"), "http://a/x?a=0&b=1");
    }
}
