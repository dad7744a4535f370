//! ARM9-side host driver for the host/cartridge link.
//!
//! Mirrors `link-cartridge`'s shape: one `HostLink` context gathering link
//! status, the host scheduler, and the VBlank/bus-lag bookkeeping as
//! explicit state rather than statics. Unlike the cartridge
//! side, the host has no single "dispatch" owner for decoded payloads — a
//! `SEND_QUEUE` reply is handed back to the caller as an `IncomingReply` so
//! it can be routed to whatever `VideoSink`/`HostAudioRing`/`RequestsSink`
//! the embedding application wires up (see `link-sim` for a worked example).
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod audio;
pub mod bus;
pub mod errors;
pub mod input;
pub mod link_fsm;
pub mod requests;
pub mod reset;
pub mod rtc;
pub mod scheduler;
pub mod video;

use alloc::vec::Vec;

use bus::HostBus;
use errors::{bus_timeout, HostError};
use link_fsm::LinkFsm;
use link_wire::command::{Command, CommandTag};
use link_wire::error::FramingError;
use link_wire::input::InputState;
use link_wire::reply::{DataKind, Header1, Header2};
use link_wire::rtc::RtcSnapshot;
use scheduler::{HostAction, HostScheduler};

/// Words in one 512-byte reply.
const REPLY_WORDS: usize = 512 / 4;

/// A decoded `SEND_QUEUE` reply, handed back for the caller to route.
pub enum IncomingReply {
    End,
    Video { header2: Header2, pixels: Vec<u16> },
    Audio { payload: Vec<u8> },
    Requests { payload: [u8; 508] },
    Text { payload: Vec<u8> },
    MipsAssert { payload: Vec<u8> },
    MipsException { payload: Vec<u8> },
}

pub struct HostLink {
    pub link: LinkFsm,
    pub scheduler: HostScheduler,
    pub last_input: InputState,
    pub last_rtc: RtcSnapshot,
    vblank_count: u32,
    vblanks_since_progress: u32,
}

impl HostLink {
    pub fn new(supported_video_encodings: u8, supported_audio_encodings: u8) -> Self {
        HostLink {
            link: LinkFsm::new(supported_video_encodings, supported_audio_encodings),
            scheduler: HostScheduler::new(),
            last_input: InputState::default(),
            last_rtc: RtcSnapshot::default(),
            vblank_count: 0,
            vblanks_since_progress: 0,
        }
    }

    /// Boot sequence: send `HELLO`, validate the
    /// reply, then send the first `INPUT`/`RTC` and mark established.
    pub fn perform_handshake<B: HostBus>(
        &mut self,
        bus: &mut B,
        video_enc: u8,
        audio_enc: u8,
        initial_input: InputState,
        initial_rtc: RtcSnapshot,
    ) -> Result<(), HostError> {
        bus.send_command(Command::hello(video_enc, audio_enc), 512);
        if !bus.wait_for_fifo_len(512) {
            return Err(bus_timeout(CommandTag::Hello));
        }
        let mut reply = [0u8; 512];
        for chunk in reply.chunks_exact_mut(4) {
            chunk.copy_from_slice(&bus.read_word().to_le_bytes());
        }
        self.link.handle_hello_reply(&reply).map_err(HostError::Hello)?;

        self.send_fixed(bus, input::build_input_command(initial_input))?;
        self.last_input = initial_input;

        self.send_fixed(bus, rtc::build_rtc_command(&initial_rtc))?;
        self.last_rtc = initial_rtc;

        self.link.mark_established();
        Ok(())
    }

    /// VBlank handler: advances the dead-man timer and enqueues
    /// the per-VBlank sends.
    pub fn on_vblank(&mut self) {
        self.vblank_count += 1;
        self.vblanks_since_progress += 1;
        self.scheduler.request(HostAction::Vblank);
        self.scheduler.request(HostAction::Input);
        self.scheduler.request(HostAction::Rtc);
    }

    pub fn vblank_count(&self) -> u32 {
        self.vblank_count
    }

    /// Request an `AUDIO_CONSUMED`/`AUDIO_STATUS`/`VIDEO_DISPLAYED` send —
    /// these are event-driven rather than per-VBlank, so callers enqueue
    /// them explicitly once their condition fires.
    pub fn request(&mut self, action: HostAction) {
        self.scheduler.request(action);
    }

    /// Pop and issue the next pending action. Fixed-reply actions return
    /// `Ok(Some((action, None)))`; `Queue` returns the decoded reply.
    pub fn service_next<B: HostBus>(
        &mut self,
        bus: &mut B,
        pending_audio_consumed: u16,
        pending_audio_status: Option<bool>,
        pending_video_displayed: Option<u8>,
    ) -> Result<Option<(HostAction, Option<IncomingReply>)>, HostError> {
        let Some(action) = self.scheduler.take_next() else {
            return Ok(None);
        };
        match action {
            HostAction::Vblank => self.send_fixed(bus, Command::vblank())?,
            HostAction::Input => self.send_fixed(bus, input::build_input_command(self.last_input))?,
            HostAction::Rtc => self.send_fixed(bus, rtc::build_rtc_command(&self.last_rtc))?,
            HostAction::AudioConsumed => self.send_fixed(bus, Command::audio_consumed(pending_audio_consumed))?,
            HostAction::AudioStatus => {
                self.send_fixed(bus, Command::audio_status(pending_audio_status.unwrap_or(false)))?
            }
            HostAction::VideoDisplayed => {
                self.send_fixed(bus, Command::video_displayed(pending_video_displayed.unwrap_or(0)))?
            }
            HostAction::Queue => {
                let reply = self.service_send_queue(bus)?;
                return Ok(Some((action, Some(reply))));
            }
        }
        Ok(Some((action, None)))
    }

    fn send_fixed<B: HostBus>(&mut self, bus: &mut B, cmd: Command) -> Result<(), HostError> {
        let tag = cmd.tag;
        bus.send_command(cmd, 4);
        if !bus.wait_for_fifo_len(4) {
            self.link.fail();
            return Err(bus_timeout(tag));
        }
        bus.ignore_words(1);
        self.vblanks_since_progress = 0;
        Ok(())
    }

    /// Issue `SEND_QUEUE`, read the header(s), and decode by kind. Always drains exactly `REPLY_WORDS` so the FPGA
    /// FIFO never desyncs.
    fn service_send_queue<B: HostBus>(&mut self, bus: &mut B) -> Result<IncomingReply, HostError> {
        bus.send_command(Command::send_queue(), 512);
        if !bus.wait_for_fifo_len(512) {
            self.link.fail();
            return Err(bus_timeout(CommandTag::SendQueue));
        }
        let header1 =
            Header1::unpack(bus.read_word()).ok_or(HostError::Framing(FramingError::ByteCountOutOfRange))?;
        self.vblanks_since_progress = 0;

        let reply = match header1.kind {
            DataKind::None => {
                bus.ignore_words(REPLY_WORDS - 1);
                IncomingReply::End
            }
            DataKind::Video => {
                let header2 = Header2::unpack(bus.read_word());
                if header2.pixel_offset % 2 != 0 || header1.byte_count % 2 != 0 {
                    return Err(HostError::Framing(FramingError::VideoAlignment));
                }
                let pixel_count = header1.byte_count as usize / 2;
                let mut pixels = Vec::with_capacity(pixel_count);
                let mut words_read = 2;
                let mut i = 0;
                while i < pixel_count {
                    let word = bus.read_word();
                    pixels.push(word as u16);
                    i += 1;
                    if i < pixel_count {
                        pixels.push((word >> 16) as u16);
                        i += 1;
                    }
                    words_read += 1;
                }
                bus.ignore_words(REPLY_WORDS - words_read);
                IncomingReply::Video { header2, pixels }
            }
            DataKind::Requests => {
                let mut payload = [0u8; 508];
                self.read_single_header_payload(bus, header1.byte_count as usize, &mut payload);
                IncomingReply::Requests { payload }
            }
            other => {
                let byte_count = header1.byte_count as usize;
                let mut payload = alloc::vec![0u8; byte_count.max(1)];
                let words_read = self.read_payload_words(bus, byte_count, &mut payload[..byte_count]);
                bus.ignore_words(REPLY_WORDS - 1 - words_read);
                match other {
                    DataKind::Audio => IncomingReply::Audio { payload },
                    DataKind::Text => IncomingReply::Text { payload },
                    DataKind::MipsAssert => IncomingReply::MipsAssert { payload },
                    DataKind::MipsException => IncomingReply::MipsException { payload },
                    DataKind::None | DataKind::Video | DataKind::Requests => unreachable!(),
                }
            }
        };

        if !header1.end {
            self.scheduler.request(HostAction::Queue);
        }
        Ok(reply)
    }

    fn read_payload_words<B: HostBus>(&mut self, bus: &mut B, byte_count: usize, out: &mut [u8]) -> usize {
        let words = (byte_count + 3) / 4;
        for w in 0..words {
            let word = bus.read_word();
            let bytes = word.to_le_bytes();
            let start = w * 4;
            let len = (byte_count - start).min(4);
            out[start..start + len].copy_from_slice(&bytes[..len]);
        }
        words
    }

    fn read_single_header_payload<B: HostBus>(&mut self, bus: &mut B, byte_count: usize, out: &mut [u8; 508]) {
        let words_read = self.read_payload_words(bus, byte_count, &mut out[..byte_count]);
        bus.ignore_words(REPLY_WORDS - 1 - words_read);
    }
}
