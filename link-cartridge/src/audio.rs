//! Cartridge-side audio subsystem: a single-producer
//! single-consumer sample ring, the three-state start/stop lifecycle, and
//! the per-`SEND_QUEUE` dequeue that drains it onto the wire.

use link_wire::audio::{samples_per_packet, AudioLifecycle, SampleFormat};
use link_wire::error::ApiError;
use link_wire::reply::{DataKind, Header1, PAYLOAD_LEN_SINGLE_HEADER};

use crate::send_queue::{PendingKind, PendingSend};

extern crate alloc;
use alloc::vec::Vec;

/// One sample ring, sized at `StartAudio` time. Samples are stored pre-interleaved, `sample_bytes()` wide.
pub struct AudioRing {
    format: SampleFormat,
    buf: Vec<u8>,
    capacity_samples: usize,
    read: usize,
    write: usize,
    send: usize,
    consumed: u16,
    lifecycle: AudioLifecycle,
}

impl AudioRing {
    /// `StartAudio(freq, samples, is16bit, isStereo)`. Capacity is
    /// `requested_samples + 1`; `freq` is recorded
    /// only to round-trip in the `REQUESTS` packet — this subsystem has no
    /// opinion on playback rate.
    pub fn start(requested_samples: usize, is_16bit: bool, is_stereo: bool) -> Result<Self, ApiError> {
        let format = SampleFormat::new(is_16bit, is_stereo);
        let capacity_samples = requested_samples.checked_add(1).ok_or(ApiError::NoMem)?;
        let byte_len = capacity_samples
            .checked_mul(format.sample_bytes())
            .ok_or(ApiError::NoMem)?;
        Ok(AudioRing {
            format,
            buf: alloc::vec![0u8; byte_len],
            capacity_samples,
            read: 0,
            write: 0,
            send: 0,
            consumed: 0,
            lifecycle: AudioLifecycle::Starting,
        })
    }

    pub fn lifecycle(&self) -> AudioLifecycle {
        self.lifecycle
    }

    /// Host's `AUDIO_STATUS(1)`.
    pub fn on_started_ack(&mut self) {
        if self.lifecycle == AudioLifecycle::Starting {
            self.lifecycle = AudioLifecycle::Started;
        }
    }

    /// Host's `AUDIO_STATUS(0)`. Caller drops the ring after this returns.
    pub fn on_stopped_ack(&mut self) {
        if self.lifecycle == AudioLifecycle::Stopping {
            self.lifecycle = AudioLifecycle::Stopped;
        }
    }

    pub fn request_stop(&mut self) {
        self.lifecycle = AudioLifecycle::Stopping;
    }

    fn used(&self) -> usize {
        (self.write + self.capacity_samples - self.read) % self.capacity_samples
    }

    /// `GetFreeAudioSamples()`.
    pub fn free_samples(&self) -> usize {
        self.capacity_samples - 1 - self.used()
    }

    /// `SubmitAudio(data, n)`. `data` is raw interleaved sample bytes,
    /// `sample_bytes()` per sample. Copies as much as fits contiguously
    /// without crossing the capacity boundary or catching the reader,
    /// leaving a one-sample gap when wrapping.
    /// Returns the number of samples actually accepted; callers loop (or
    /// block on `AUDIO_CONSUMED`) until all of `n` lands.
    pub fn submit(&mut self, data: &[u8], n: usize, pending: &mut PendingSend) -> Result<usize, ApiError> {
        if self.lifecycle != AudioLifecycle::Started {
            return Err(ApiError::Fault);
        }
        let sample_bytes = self.format.sample_bytes();
        let mut accepted = 0;
        while accepted < n {
            let free = self.free_samples();
            if free == 0 {
                break;
            }
            let until_wrap = self.capacity_samples - self.write;
            let take = free.min(until_wrap).min(n - accepted);
            if take == 0 {
                break;
            }
            let src = &data[accepted * sample_bytes..(accepted + take) * sample_bytes];
            let dst_start = self.write * sample_bytes;
            self.buf[dst_start..dst_start + src.len()].copy_from_slice(src);
            self.write = (self.write + take) % self.capacity_samples;
            accepted += take;
        }
        if accepted > 0 {
            pending.add_pending(PendingKind::Audio);
        }
        Ok(accepted)
    }

    /// Dequeue up to `508 >> shift` samples for one encoding-0 reply
    ///. Returns `None` if nothing is pending.
    pub fn dequeue(&mut self) -> Option<(Header1, heapless::Vec<u8, PAYLOAD_LEN_SINGLE_HEADER>)> {
        if self.send == self.write {
            return None;
        }
        let sample_bytes = self.format.sample_bytes();
        let max_samples = samples_per_packet(self.format);
        let pending_samples = (self.write + self.capacity_samples - self.send) % self.capacity_samples;
        let take = max_samples.min(pending_samples).min(self.capacity_samples - self.send);
        let src_start = self.send * sample_bytes;
        let mut payload = heapless::Vec::<u8, PAYLOAD_LEN_SINGLE_HEADER>::new();
        for &byte in &self.buf[src_start..src_start + take * sample_bytes] {
            let _ = payload.push(byte);
        }
        self.send = (self.send + take) % self.capacity_samples;
        let header = Header1 {
            kind: DataKind::Audio,
            encoding: 0,
            byte_count: payload.len() as u16,
            end: false,
        };
        Some((header, payload))
    }

    pub fn has_pending_send(&self) -> bool {
        self.send != self.write
    }

    /// `AUDIO_CONSUMED(count)`: advance `read`, possibly unblocking a
    /// producer that was held back by a full ring.
    pub fn on_consumed(&mut self, count: u16) {
        self.read = (self.read + count as usize) % self.capacity_samples;
        self.consumed = self.consumed.wrapping_add(count);
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started_ring(samples: usize) -> AudioRing {
        let mut ring = AudioRing::start(samples, true, true).unwrap();
        ring.on_started_ack();
        ring
    }

    #[test]
    fn free_samples_matches_capacity_minus_one_law() {
        let mut ring = started_ring(1024);
        let mut pending = PendingSend::new();
        let data = alloc::vec![0u8; 512 * 4];
        ring.submit(&data, 512, &mut pending).unwrap();
        assert_eq!(ring.free_samples(), 1024 - 512);
    }

    #[test]
    fn submit_before_started_acked_fails_with_efault() {
        let mut ring = AudioRing::start(16, false, false).unwrap();
        let mut pending = PendingSend::new();
        assert_eq!(ring.submit(&[0u8; 4], 4, &mut pending), Err(ApiError::Fault));
    }

    #[test]
    fn dequeue_then_consumed_round_trip_advances_read() {
        let mut ring = started_ring(2000);
        let mut pending = PendingSend::new();
        let data = alloc::vec![0xABu8; 1024 * 4];
        ring.submit(&data, 1024, &mut pending).unwrap();
        let (header, payload) = ring.dequeue().unwrap();
        assert_eq!(header.kind, DataKind::Audio);
        let samples_sent = payload.len() as u16 / ring.format().sample_bytes() as u16;
        ring.on_consumed(samples_sent);
        assert_eq!(ring.free_samples(), 2000 - 1024 + samples_sent as usize);
    }

    #[test]
    fn never_reports_full_to_ambiguity() {
        let mut ring = started_ring(8);
        let mut pending = PendingSend::new();
        let data = alloc::vec![0u8; 8 * 4];
        let accepted = ring.submit(&data, 8, &mut pending).unwrap();
        assert_eq!(accepted, 8); // capacity is 9 samples; 8 fit, leaving one gap
        assert_eq!(ring.free_samples(), 0);
    }
}
