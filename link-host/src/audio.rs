//! Host-side audio reception and consumption.

use link_wire::audio::SampleFormat;
use link_wire::error::FramingError;

extern crate alloc;
use alloc::vec::Vec;

/// The external audio mixer. This crate owns the ring and the consumed-count
/// bookkeeping; the mixer only pulls samples out.
pub trait AudioSink {
    fn sample_rate_hint(&self) -> u32 {
        0
    }
}

pub struct HostAudioRing {
    format: SampleFormat,
    buf: Vec<u8>,
    capacity_samples: usize,
    read: usize,
    write: usize,
    consumed_pending: u16,
}

impl HostAudioRing {
    pub fn new(capacity_samples: usize, format: SampleFormat) -> Self {
        HostAudioRing {
            format,
            buf: alloc::vec![0u8; capacity_samples * format.sample_bytes()],
            capacity_samples,
            read: 0,
            write: 0,
            consumed_pending: 0,
        }
    }

    fn used(&self) -> usize {
        (self.write + self.capacity_samples - self.read) % self.capacity_samples
    }

    /// Receive one AUDIO reply's payload off the bus: validate the byte count divides evenly into
    /// samples and won't wrap the ring to look empty, then copy in.
    pub fn receive(&mut self, payload: &[u8]) -> Result<(), FramingError> {
        let sample_bytes = self.format.sample_bytes();
        if payload.len() % sample_bytes != 0 {
            return Err(FramingError::AudioSampleCount);
        }
        let n = payload.len() / sample_bytes;
        if n >= self.capacity_samples - self.used() {
            return Err(FramingError::AudioSampleCount);
        }
        for (i, chunk) in payload.chunks_exact(sample_bytes).enumerate() {
            let dst = (self.write + i) % self.capacity_samples;
            self.buf[dst * sample_bytes..dst * sample_bytes + sample_bytes].copy_from_slice(chunk);
        }
        self.write = (self.write + n) % self.capacity_samples;
        Ok(())
    }

    /// The audio callback's pull: drain up to `n` samples, zero-filling the
    /// rest when the ring underruns, and account them toward the next
    /// `AUDIO_CONSUMED` ack.
    pub fn consume(&mut self, out: &mut [u8], n: usize) {
        let sample_bytes = self.format.sample_bytes();
        let available = self.used().min(n);
        for i in 0..available {
            let src = (self.read + i) % self.capacity_samples;
            out[i * sample_bytes..(i + 1) * sample_bytes]
                .copy_from_slice(&self.buf[src * sample_bytes..src * sample_bytes + sample_bytes]);
        }
        for byte in out[available * sample_bytes..n * sample_bytes].iter_mut() {
            *byte = 0;
        }
        self.read = (self.read + available) % self.capacity_samples;
        self.consumed_pending = self.consumed_pending.wrapping_add(available as u16);
    }

    /// Take the accumulated consumed count for an `AUDIO_CONSUMED` send,
    /// resetting it to zero. Returns `None` if nothing to report.
    pub fn take_consumed(&mut self) -> Option<u16> {
        if self.consumed_pending == 0 {
            return None;
        }
        let count = self.consumed_pending;
        self.consumed_pending = 0;
        Some(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receive_then_consume_round_trips_bytes() {
        let mut ring = HostAudioRing::new(1024, SampleFormat::Stereo16);
        let samples = alloc::vec![0xAB; 64 * 4];
        ring.receive(&samples).unwrap();
        let mut out = alloc::vec![0u8; 64 * 4];
        ring.consume(&mut out, 64);
        assert_eq!(out, samples);
        assert_eq!(ring.take_consumed(), Some(64));
    }

    #[test]
    fn underrun_zero_fills_remainder() {
        let mut ring = HostAudioRing::new(16, SampleFormat::Mono8);
        ring.receive(&[1, 2, 3, 4]).unwrap();
        let mut out = alloc::vec![0xFFu8; 8];
        ring.consume(&mut out, 8);
        assert_eq!(&out[..4], &[1, 2, 3, 4]);
        assert_eq!(&out[4..], &[0, 0, 0, 0]);
    }

    #[test]
    fn rejects_byte_count_not_a_whole_number_of_samples() {
        let mut ring = HostAudioRing::new(64, SampleFormat::Stereo16);
        assert_eq!(ring.receive(&[0, 1, 2]), Err(FramingError::AudioSampleCount));
    }

    #[test]
    fn take_consumed_resets_after_read() {
        let mut ring = HostAudioRing::new(16, SampleFormat::Mono8);
        ring.receive(&[1, 2, 3, 4]).unwrap();
        let mut out = alloc::vec![0u8; 4];
        ring.consume(&mut out, 4);
        assert!(ring.take_consumed().is_some());
        assert!(ring.take_consumed().is_none());
    }
}
