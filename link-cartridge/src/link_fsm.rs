//! Cartridge side of the link-establishment state machine.

use link_wire::hello::{intersect_encodings, HelloPayload};

/// Mirrors the host's copy of the same enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    None,
    /// Hello exchange is done; still waiting for the first INPUT and RTC
    /// delivery before the main protocol handler takes over.
    PendingRecv,
    Established,
    Error,
}

bitflags::bitflags! {
    /// The two deliveries `PendingRecv` is waiting to drain.
    struct PendingRecv: u8 {
        const INPUT = 1 << 0;
        const RTC   = 1 << 1;
    }
}

pub struct LinkFsm {
    status: LinkStatus,
    pending_recv: PendingRecv,
    video_encodings: u8,
    audio_encodings: u8,
}

impl LinkFsm {
    pub fn new(supported_video_encodings: u8, supported_audio_encodings: u8) -> Self {
        LinkFsm {
            status: LinkStatus::None,
            pending_recv: PendingRecv::empty(),
            video_encodings: supported_video_encodings,
            audio_encodings: supported_audio_encodings,
        }
    }

    pub fn status(&self) -> LinkStatus {
        self.status
    }

    /// Build the HELLO reply payload, intersecting our encodings against the
    /// host's advertised set, and arm `PendingRecv`.
    pub fn handle_hello(&mut self, host_video_enc: u8, host_audio_enc: u8) -> HelloPayload {
        self.video_encodings = intersect_encodings(self.video_encodings, host_video_enc);
        self.audio_encodings = intersect_encodings(self.audio_encodings, host_audio_enc);
        self.status = LinkStatus::PendingRecv;
        self.pending_recv = PendingRecv::INPUT | PendingRecv::RTC;
        HelloPayload {
            magic: link_wire::hello::MAGIC,
            video_encodings: self.video_encodings,
            audio_encodings: self.audio_encodings,
            extensions: link_wire::hello::EXT_AUDIO_STATUS,
        }
    }

    /// Clear the INPUT half of `PendingRecv`; transitions to `Established`
    /// once RTC has cleared too.
    pub fn on_input_received(&mut self) {
        self.clear_pending(PendingRecv::INPUT);
    }

    pub fn on_rtc_received(&mut self) {
        self.clear_pending(PendingRecv::RTC);
    }

    fn clear_pending(&mut self, bit: PendingRecv) {
        if self.status != LinkStatus::PendingRecv {
            return;
        }
        self.pending_recv.remove(bit);
        if self.pending_recv.is_empty() {
            self.status = LinkStatus::Established;
        }
    }

    pub fn fail(&mut self) {
        self.status = LinkStatus::Error;
    }
}
