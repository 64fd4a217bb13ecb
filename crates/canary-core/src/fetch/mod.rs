//! Resource fetching.
//!
//! `ResourceFetcher` is the blocking transport seam: `fetch` returns once the
//! final response has started (first body bytes, or the end of an empty
//! response) and hands back a `ResourceBody` that streams the rest. `CurlFetcher` implements it with libcurl; tests substitute their own.

mod body;
mod transfer;

use std::fmt;
use std::io::{self, Read};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::config::FetchConfig;

use body::ChannelBody;
use transfer::TransferEvent;

/// Events buffered between the transfer worker and the reader.
const CHANNEL_DEPTH: usize = 16;

/// Fetch a resource by URL. Implementations block the calling thread, so call
/// from `spawn_blocking` when used from async code.
pub trait ResourceFetcher: Send + Sync + 'static {
    fn fetch(&self, location: &str) -> Result<ResourceBody, FetchError>;
}

/// Response body of a fetched resource plus the HTTP status it came with.
pub struct ResourceBody {
    status: u32,
    reader: Box<dyn Read + Send>,
}

impl ResourceBody {
    pub fn new(status: u32, reader: impl Read + Send + 'static) -> Self {
        Self {
            status,
            reader: Box::new(reader),
        }
    }

    pub fn status(&self) -> u32 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl Read for ResourceBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for ResourceBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceBody")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// A fetch that failed before any body could be read.
#[derive(Debug, thiserror::Error)]
#[error("fetch {location}: {kind}")]
pub struct FetchError {
    pub location: String,
    pub kind: FetchErrorKind,
}

impl FetchError {
    pub fn new(location: impl Into<String>, kind: FetchErrorKind) -> Self {
        Self {
            location: location.into(),
            kind,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchErrorKind {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("unsupported URL scheme {0:?}")]
    UnsupportedScheme(String),
    #[error("{0}")]
    Transport(#[from] curl::Error),
    #[error("HTTP {0}")]
    Status(u32),
    #[error("could not start transfer worker: {0}")]
    Spawn(#[source] io::Error),
    #[error("transfer worker exited before responding")]
    Disconnected,
    #[error("fetch aborted: {0}")]
    Aborted(String),
}

/// Transport settings derived from the `[fetch]` config section.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub connect_timeout: Duration,
    /// Deadline for the whole transfer (None = no deadline).
    pub timeout: Option<Duration>,
    /// Treat non-2xx responses as fetch failures instead of hashing them.
    pub reject_http_errors: bool,
    /// Proxy URL; requests are tunnelled through it with CONNECT.
    pub proxy: Option<String>,
    pub max_redirections: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for FetchOptions {
    fn from(cfg: &FetchConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            timeout: cfg.timeout_secs.map(Duration::from_secs),
            reject_http_errors: cfg.reject_http_errors,
            proxy: cfg.proxy.clone(),
            max_redirections: 10,
        }
    }
}

/// Blocking HTTP(S) GET via libcurl.
///
/// Each fetch runs its transfer on a dedicated worker thread; body chunks are
/// handed to the returned `ResourceBody` through a bounded channel, so the
/// caller is released as soon as the final response starts and memory stays
/// bounded.
#[derive(Debug, Clone, Default)]
pub struct CurlFetcher {
    opts: FetchOptions,
}

impl CurlFetcher {
    pub fn new(opts: FetchOptions) -> Self {
        Self { opts }
    }
}

fn check_location(location: &str) -> Result<(), FetchErrorKind> {
    let parsed = url::Url::parse(location)?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(FetchErrorKind::UnsupportedScheme(other.to_string())),
    }
}

impl ResourceFetcher for CurlFetcher {
    fn fetch(&self, location: &str) -> Result<ResourceBody, FetchError> {
        check_location(location).map_err(|kind| FetchError::new(location, kind))?;

        let (tx, rx) = mpsc::sync_channel::<TransferEvent>(CHANNEL_DEPTH);
        let url = location.to_string();
        let opts = self.opts.clone();
        thread::Builder::new()
            .name("canary-fetch".to_string())
            .spawn(move || transfer::run(&url, &opts, tx))
            .map_err(|e| FetchError::new(location, FetchErrorKind::Spawn(e)))?;

        match rx.recv() {
            Ok(TransferEvent::Headers { status }) => {
                if self.opts.reject_http_errors && !(200..300).contains(&status) {
                    // Dropping `rx` aborts the transfer.
                    return Err(FetchError::new(location, FetchErrorKind::Status(status)));
                }
                Ok(ResourceBody::new(status, ChannelBody::new(rx)))
            }
            Ok(TransferEvent::Failed(e)) => {
                Err(FetchError::new(location, FetchErrorKind::Transport(e)))
            }
            Ok(TransferEvent::Data(_)) | Ok(TransferEvent::Finished) | Err(_) => {
                Err(FetchError::new(location, FetchErrorKind::Disconnected))
            }
        }
    }
}
