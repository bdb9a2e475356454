//! HTTP(S) remote backend.
//!
//! GET for `get`, HEAD for `has`, PUT or POST for `put` depending on
//! server configuration. 2xx is success; 404 on HEAD/GET means missing;
//! any other non-2xx is a transport failure. Authentication is handled
//! entirely by a pluggable [`CredentialsProvider`] supplied at
//! construction — the backend itself has no opinion on auth scheme.

use std::io::Read;

use reqwest::blocking::Client;
use reqwest::StatusCode;

use super::{BlobReader, RemoteBackend};
use crate::errors::BackendError;

/// Supplies per-request authentication to [`HttpBackend`].
pub trait CredentialsProvider: Send + Sync {
    /// Apply credentials to an outgoing request builder.
    fn authenticate(&self, builder: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder;
}

/// No authentication: requests are sent as-is.
pub struct NoCredentials;

impl CredentialsProvider for NoCredentials {
    fn authenticate(&self, builder: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        builder
    }
}

/// Sends a bearer token on every request.
pub struct BearerToken(pub String);

impl CredentialsProvider for BearerToken {
    fn authenticate(&self, builder: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        builder.bearer_auth(&self.0)
    }
}

/// Which HTTP verb the remote expects for uploads. Servers differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadVerb {
    Put,
    Post,
}

pub struct HttpBackend {
    base_url: String,
    client: Client,
    credentials: Box<dyn CredentialsProvider>,
    upload_verb: UploadVerb,
}

impl HttpBackend {
    pub fn new(base_url: String, credentials: Box<dyn CredentialsProvider>) -> Result<Self, BackendError> {
        let client = Client::builder()
            .build()
            .map_err(BackendError::Http)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            credentials,
            upload_verb: UploadVerb::Put,
        })
    }

    pub fn with_upload_verb(mut self, verb: UploadVerb) -> Self {
        self.upload_verb = verb;
        self
    }

    fn url_for(&self, hash: &str) -> String {
        let at = 2.min(hash.len());
        format!("{}/{}/{}", self.base_url, &hash[..at], &hash[at..])
    }

    fn classify(status: StatusCode) -> BackendError {
        match status {
            StatusCode::NOT_FOUND => BackendError::Missing(String::new()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                BackendError::Auth(format!("HTTP {status}"))
            }
            s if s.is_server_error() => BackendError::Transient(format!("HTTP {status}")),
            s => BackendError::Permanent(format!("HTTP {s}")),
        }
    }
}

impl RemoteBackend for HttpBackend {
    fn has(&self, hash: &str) -> Result<bool, BackendError> {
        let request = self.credentials.authenticate(self.client.head(self.url_for(hash)));
        let response = request.send().map_err(BackendError::Http)?;
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(Self::classify(s)),
        }
    }

    fn get(&self, hash: &str) -> Result<Option<BlobReader>, BackendError> {
        let request = self.credentials.authenticate(self.client.get(self.url_for(hash)));
        let response = request.send().map_err(BackendError::Http)?;
        match response.status() {
            s if s.is_success() => {
                let bytes = response.bytes().map_err(BackendError::Http)?;
                Ok(Some(Box::new(std::io::Cursor::new(bytes.to_vec()))))
            }
            StatusCode::NOT_FOUND => Ok(None),
            s => Err(Self::classify(s)),
        }
    }

    fn put(&self, hash: &str, reader: &mut dyn Read, size: u64) -> Result<(), BackendError> {
        let mut body = Vec::with_capacity(size as usize);
        reader.read_to_end(&mut body).map_err(BackendError::Io)?;

        let builder = match self.upload_verb {
            UploadVerb::Put => self.client.put(self.url_for(hash)),
            UploadVerb::Post => self.client.post(self.url_for(hash)),
        };
        let request = self.credentials.authenticate(builder).body(body);
        let response = request.send().map_err(BackendError::Http)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::classify(response.status()))
        }
    }

    fn list(&self) -> Result<Vec<String>, BackendError> {
        // HTTP(S) object stores expose no standard listing endpoint;
        // `list` is only meaningful for local/SSH remotes.
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_splits_hash() {
        let backend = HttpBackend::new("https://example.com/store".into(), Box::new(NoCredentials)).unwrap();
        assert_eq!(backend.url_for("abcd1234"), "https://example.com/store/ab/cd1234");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let backend = HttpBackend::new("https://example.com/store/".into(), Box::new(NoCredentials)).unwrap();
        assert_eq!(backend.base_url, "https://example.com/store");
    }

    #[test]
    fn test_classify_status_codes() {
        assert!(matches!(HttpBackend::classify(StatusCode::NOT_FOUND), BackendError::Missing(_)));
        assert!(matches!(HttpBackend::classify(StatusCode::UNAUTHORIZED), BackendError::Auth(_)));
        assert!(matches!(
            HttpBackend::classify(StatusCode::INTERNAL_SERVER_ERROR),
            BackendError::Transient(_)
        ));
        assert!(matches!(HttpBackend::classify(StatusCode::BAD_REQUEST), BackendError::Permanent(_)));
    }
}
