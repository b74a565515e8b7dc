//! HTTP response builder

use bytes::Bytes;
use http::{header, HeaderName, HeaderValue, Response, StatusCode};
use http_body_util::Full;
use mockwire_core::{Error, Result};

/// Body type alias
pub type Body = Full<Bytes>;

/// Response builder for convenient response construction
#[derive(Debug)]
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl ResponseBuilder {
    /// Create a new response builder
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    /// Set a header
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((name, value));
        self
    }

    /// Set a header from untrusted strings
    pub fn try_header(self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::ResponseEncode(format!("invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::ResponseEncode(format!("invalid value for header '{}': {}", name, e)))?;
        Ok(self.header(name, value))
    }

    /// Build response with the given body
    pub fn body(self, body: impl Into<Bytes>) -> Result<Response<Body>> {
        let mut response = Response::builder().status(self.status);

        for (name, value) in self.headers {
            response = response.header(name, value);
        }

        Ok(response.body(Full::new(body.into()))?)
    }

    /// Build response with a JSON body
    pub fn json(self, body: Vec<u8>) -> Result<Response<Body>> {
        self.header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body)
    }
}
