//! In-memory catalog and fetcher doubles for unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::catalog::{CatalogEntry, CatalogGateway, EntryId, StoreError};
use crate::fetch::{FetchError, FetchErrorKind, ResourceBody, ResourceFetcher};

/// Catalog held in a Vec; records every update call.
#[derive(Default)]
pub(crate) struct MemoryCatalog {
    entries: Mutex<Vec<CatalogEntry>>,
    updates: Mutex<Vec<(EntryId, String)>>,
    fail_load: bool,
    fail_updates: HashSet<String>,
    panic_updates: HashSet<String>,
}

impl MemoryCatalog {
    pub(crate) fn with_entries(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
            ..Default::default()
        }
    }

    pub(crate) fn failing_load() -> Self {
        Self {
            fail_load: true,
            ..Default::default()
        }
    }

    pub(crate) fn fail_update_for(mut self, id: &str) -> Self {
        self.fail_updates.insert(id.to_string());
        self
    }

    pub(crate) fn panic_update_for(mut self, id: &str) -> Self {
        self.panic_updates.insert(id.to_string());
        self
    }

    /// (id, checksum) for each update call, in call order.
    pub(crate) fn updates(&self) -> Vec<(EntryId, String)> {
        self.updates.lock().unwrap().clone()
    }

    pub(crate) fn checksum_of(&self, id: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id.as_str() == id)
            .map(|e| e.checksum.clone())
    }
}

#[async_trait]
impl CatalogGateway for MemoryCatalog {
    async fn load_all(&self) -> Result<Vec<CatalogEntry>, StoreError> {
        if self.fail_load {
            return Err(StoreError::Load {
                collection: "assets".to_string(),
                source: sqlx::Error::PoolClosed,
            });
        }
        Ok(self.entries.lock().unwrap().clone())
    }

    async fn update_by_id(&self, id: &EntryId, entry: &CatalogEntry) -> Result<(), StoreError> {
        if self.panic_updates.contains(id.as_str()) {
            panic!("catalog driver crashed updating {id}");
        }
        self.updates
            .lock()
            .unwrap()
            .push((id.clone(), entry.checksum.clone()));
        if self.fail_updates.contains(id.as_str()) {
            return Err(StoreError::Update {
                id: id.clone(),
                source: sqlx::Error::PoolTimedOut,
            });
        }
        let mut entries = self.entries.lock().unwrap();
        match entries.iter_mut().find(|e| &e.id == id) {
            Some(stored) => {
                *stored = entry.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(id.clone())),
        }
    }
}

/// What the fake transport serves for a URL.
#[derive(Clone)]
pub(crate) enum Served {
    Body { status: u32, bytes: Vec<u8> },
    Refused,
    /// Headers arrive, then the connection drops after `bytes`.
    Truncated(Vec<u8>),
}

struct TruncatedBody {
    bytes: Vec<u8>,
    done: bool,
}

impl io::Read for TruncatedBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.done {
            self.done = true;
            let n = buf.len().min(self.bytes.len());
            buf[..n].copy_from_slice(&self.bytes[..n]);
            return Ok(n);
        }
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"))
    }
}

/// Serves canned responses, blocking each fetch for `latency` and tracking
/// how many fetches overlap.
#[derive(Default)]
pub(crate) struct MapFetcher {
    served: HashMap<String, Served>,
    latency: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl MapFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn serve(mut self, url: &str, bytes: &[u8]) -> Self {
        self.served.insert(
            url.to_string(),
            Served::Body {
                status: 200,
                bytes: bytes.to_vec(),
            },
        );
        self
    }

    pub(crate) fn serve_as(mut self, url: &str, served: Served) -> Self {
        self.served.insert(url.to_string(), served);
        self
    }

    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ResourceFetcher for MapFetcher {
    fn fetch(&self, location: &str) -> Result<ResourceBody, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.served.get(location).cloned() {
            Some(Served::Body { status, bytes }) => Ok(ResourceBody::new(status, io::Cursor::new(bytes))),
            Some(Served::Truncated(bytes)) => Ok(ResourceBody::new(
                200,
                TruncatedBody { bytes, done: false },
            )),
            Some(Served::Refused) | None => Err(FetchError::new(
                location,
                FetchErrorKind::Transport(curl::Error::new(7)),
            )),
        }
    }
}
