//! stdout/stderr text channel. The 508-byte TEXT payload reserves its first
//! byte for a stream discriminator this implementation adds; the remaining
//! 507 bytes carry raw text. A single slot; the producer blocks (here:
//! returns `WouldBlock`) while the slot is still full, and repopulates once
//! the scheduler has flushed it.

use crate::send_queue::{PendingKind, PendingSend};
use link_wire::reply::PAYLOAD_LEN_SINGLE_HEADER;

/// Which stream a text packet originated from, carried in the first payload
/// byte so the host can route it to stdout or the sub-screen error console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStream {
    Out,
    Err,
}

#[derive(Debug)]
pub struct WouldBlock;

pub struct TextChannel {
    stream: TextStream,
    bytes: heapless::Vec<u8, { PAYLOAD_LEN_SINGLE_HEADER - 1 }>,
    slot_full: bool,
}

impl TextChannel {
    pub fn new() -> Self {
        TextChannel { stream: TextStream::Out, bytes: heapless::Vec::new(), slot_full: false }
    }

    /// Write to the channel. Fails with `WouldBlock` while the previous
    /// write hasn't been flushed yet — the application is expected to wait
    /// and retry.
    pub fn write(&mut self, stream: TextStream, data: &[u8], pending: &mut PendingSend) -> Result<usize, WouldBlock> {
        if self.slot_full {
            return Err(WouldBlock);
        }
        self.stream = stream;
        self.bytes.clear();
        let n = data.len().min(self.bytes.capacity());
        for &b in &data[..n] {
            let _ = self.bytes.push(b);
        }
        self.slot_full = true;
        pending.add_pending(PendingKind::Text);
        Ok(n)
    }

    /// Pull the pending payload for one TEXT reply, freeing the slot.
    pub fn dequeue(&mut self) -> Option<(TextStream, heapless::Vec<u8, { PAYLOAD_LEN_SINGLE_HEADER - 1 }>)> {
        if !self.slot_full {
            return None;
        }
        self.slot_full = false;
        let bytes = core::mem::replace(&mut self.bytes, heapless::Vec::new());
        Some((self.stream, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_blocks_until_previous_payload_is_flushed() {
        let mut ch = TextChannel::new();
        let mut pending = PendingSend::new();
        ch.write(TextStream::Out, b"hello", &mut pending).unwrap();
        assert!(ch.write(TextStream::Out, b"world", &mut pending).is_err());
        ch.dequeue();
        assert!(ch.write(TextStream::Err, b"world", &mut pending).is_ok());
    }

    #[test]
    fn dequeue_reports_the_stream_it_was_written_on() {
        let mut ch = TextChannel::new();
        let mut pending = PendingSend::new();
        ch.write(TextStream::Err, b"oops", &mut pending).unwrap();
        let (stream, bytes) = ch.dequeue().unwrap();
        assert_eq!(stream, TextStream::Err);
        assert_eq!(&bytes[..], b"oops");
    }

    #[test]
    fn oversized_write_truncates_to_slot_capacity() {
        let mut ch = TextChannel::new();
        let mut pending = PendingSend::new();
        let data = [b'x'; 600];
        let n = ch.write(TextStream::Out, &data, &mut pending).unwrap();
        assert_eq!(n, PAYLOAD_LEN_SINGLE_HEADER - 1);
    }
}
