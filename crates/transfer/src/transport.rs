//! Upload transport primitive and its implementations.
//!
//! The scheduler only ever calls [`Transport::upload_bytes`] and treats
//! any error as opaque. `HttpTransport` speaks HTTP `PUT` with basic
//! auth; `LocalTransport` mirrors uploads into a directory, which is
//! handy for staging and for tests.

use std::fmt;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::TransferError;

/// Boxed future returned by [`Transport::upload_bytes`].
pub type UploadFuture<'a> = Pin<Box<dyn Future<Output = Result<(), TransferError>> + Send + 'a>>;

/// Server credentials, scoped to one publish call.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both username and password are set.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Uploads one byte blob to one URL.
///
/// Implementations must be shareable across the concurrent transfers of
/// a batch.
pub trait Transport: Send + Sync {
    fn upload_bytes<'a>(
        &'a self,
        url: &'a str,
        data: Vec<u8>,
        credentials: &'a Credentials,
    ) -> UploadFuture<'a>;
}

/// Picks a transport for `base_url` by scheme.
pub fn transport_for_url(
    base_url: &str,
    request_timeout: Duration,
) -> Result<Arc<dyn Transport>, TransferError> {
    if let Some(root) = base_url.strip_prefix("file://") {
        Ok(Arc::new(LocalTransport::new(root)))
    } else if base_url.starts_with("http://") || base_url.starts_with("https://") {
        Ok(Arc::new(HttpTransport::new(request_timeout)?))
    } else {
        Err(TransferError::UnsupportedScheme(base_url.to_string()))
    }
}

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

/// `PUT`s each blob with HTTP basic auth.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a client whose requests time out after `request_timeout`.
    pub fn new(request_timeout: Duration) -> Result<Self, TransferError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn upload_bytes<'a>(
        &'a self,
        url: &'a str,
        data: Vec<u8>,
        credentials: &'a Credentials,
    ) -> UploadFuture<'a> {
        Box::pin(async move {
            let len = data.len();
            let resp = self
                .client
                .put(url)
                .basic_auth(&credentials.username, Some(&credentials.password))
                .body(data)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                return Err(TransferError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            debug!(url, bytes = len, status = status.as_u16(), "PUT ok");
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// LocalTransport
// ---------------------------------------------------------------------------

/// Writes each blob to `<root>/<remote path>`; credentials are ignored.
pub struct LocalTransport {
    root: PathBuf,
}

impl LocalTransport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a `file://` URL to a file below the mirror root. The URL must
    /// name the root as its prefix and may not climb back out of it.
    fn resolve(&self, url: &str) -> Result<PathBuf, TransferError> {
        let path = url.strip_prefix("file://").unwrap_or(url);
        let rel = Path::new(path)
            .strip_prefix(&self.root)
            .map_err(|_| TransferError::InvalidPath(format!("outside mirror root: {url}")))?;

        if rel.as_os_str().is_empty() {
            return Err(TransferError::InvalidPath(format!(
                "no file below mirror root: {url}"
            )));
        }
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(TransferError::InvalidPath(format!(
                "escapes mirror root: {url}"
            )));
        }
        Ok(self.root.join(rel))
    }
}

impl Transport for LocalTransport {
    fn upload_bytes<'a>(
        &'a self,
        url: &'a str,
        data: Vec<u8>,
        _credentials: &'a Credentials,
    ) -> UploadFuture<'a> {
        Box::pin(async move {
            let dest = self.resolve(url)?;
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&dest, &data).await?;
            debug!(path = %dest.display(), bytes = data.len(), "mirrored");
            Ok(())
        })
    }
}
