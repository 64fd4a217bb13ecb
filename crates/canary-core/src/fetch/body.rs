//! `Read` adapter over the transfer worker's event channel.

use std::io::{self, Read};
use std::sync::mpsc::Receiver;

use super::transfer::TransferEvent;

/// Streams body chunks as the worker produces them. A transfer failure after
/// the headers surfaces as an `io::Error`; it never looks like a clean EOF.
pub(super) struct ChannelBody {
    rx: Receiver<TransferEvent>,
    chunk: Vec<u8>,
    pos: usize,
    finished: bool,
}

impl ChannelBody {
    pub(super) fn new(rx: Receiver<TransferEvent>) -> Self {
        Self {
            rx,
            chunk: Vec::new(),
            pos: 0,
            finished: false,
        }
    }
}

impl Read for ChannelBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.pos < self.chunk.len() {
                let n = buf.len().min(self.chunk.len() - self.pos);
                buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }
            if self.finished || buf.is_empty() {
                return Ok(0);
            }
            match self.rx.recv() {
                Ok(TransferEvent::Data(data)) => {
                    self.chunk = data;
                    self.pos = 0;
                }
                Ok(TransferEvent::Headers { .. }) => {}
                Ok(TransferEvent::Finished) => {
                    self.finished = true;
                    return Ok(0);
                }
                Ok(TransferEvent::Failed(e)) => return Err(io::Error::other(e)),
                Err(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "transfer worker exited mid-body",
                    ))
                }
            }
        }
    }
}
