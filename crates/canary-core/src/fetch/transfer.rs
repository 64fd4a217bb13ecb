//! libcurl transfer worker feeding a `ChannelBody`.

use std::cell::Cell;
use std::str;
use std::sync::mpsc::SyncSender;
use std::time::Duration;

use super::FetchOptions;

/// Messages from the transfer thread, in order: one `Headers` carrying the
/// final response status, any number of `Data`, then `Finished` or `Failed`.
/// `Failed` may also arrive first.
#[derive(Debug)]
pub(super) enum TransferEvent {
    Headers { status: u32 },
    Data(Vec<u8>),
    Finished,
    Failed(curl::Error),
}

/// Parse the status code out of an HTTP status line ("HTTP/1.1 200 OK").
fn parse_status_line(line: &str) -> Option<u32> {
    let rest = line.strip_prefix("HTTP/")?;
    rest.split_whitespace().nth(1)?.parse().ok()
}

/// Run one GET to completion, reporting through `tx`. A send error means the
/// reader went away; the transfer is aborted and nothing more is sent.
pub(super) fn run(url: &str, opts: &FetchOptions, tx: SyncSender<TransferEvent>) {
    let headers_sent = Cell::new(false);
    let status = Cell::new(0u32);
    let reader_gone = Cell::new(false);

    let result = perform(url, opts, &tx, &headers_sent, &status, &reader_gone);
    if reader_gone.get() {
        tracing::debug!(url, "body reader dropped; transfer aborted");
        return;
    }
    match result {
        Ok(code) => {
            if !headers_sent.get() && tx.send(TransferEvent::Headers { status: code }).is_err() {
                return;
            }
            let _ = tx.send(TransferEvent::Finished);
        }
        Err(e) => {
            let _ = tx.send(TransferEvent::Failed(e));
        }
    }
}

fn perform(
    url: &str,
    opts: &FetchOptions,
    tx: &SyncSender<TransferEvent>,
    headers_sent: &Cell<bool>,
    status: &Cell<u32>,
    reader_gone: &Cell<bool>,
) -> Result<u32, curl::Error> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.get(true)?;
    easy.follow_location(true)?;
    easy.max_redirections(opts.max_redirections)?;
    easy.connect_timeout(opts.connect_timeout)?;
    // Abort if throughput drops below 1 KiB/s for 60s.
    easy.low_speed_limit(1024)?;
    easy.low_speed_time(Duration::from_secs(60))?;
    if let Some(timeout) = opts.timeout {
        easy.timeout(timeout)?;
    }

    if let Some(proxy) = &opts.proxy {
        // A configured proxy applies to every host; NO_PROXY from the
        // environment is not consulted.
        easy.proxy(proxy)?;
        easy.noproxy("")?;
        easy.http_proxy_tunnel(true)?;
    }

    // The status goes out with the first body chunk. Interim, redirect and
    // proxy CONNECT header blocks never reach the write callback.
    let announce = || -> bool {
        if headers_sent.get() {
            return true;
        }
        headers_sent.set(true);
        if tx.send(TransferEvent::Headers { status: status.get() }).is_err() {
            reader_gone.set(true);
            return false;
        }
        true
    };

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            let code = str::from_utf8(data)
                .ok()
                .and_then(|line| parse_status_line(line.trim_end()));
            if let Some(code) = code {
                status.set(code);
            }
            true
        })?;
        transfer.write_function(|data| {
            if !announce() {
                return Ok(0);
            }
            if tx.send(TransferEvent::Data(data.to_vec())).is_err() {
                reader_gone.set(true);
                return Ok(0);
            }
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    easy.response_code()
}
