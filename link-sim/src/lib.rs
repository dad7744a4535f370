//! Hosted integration harness.
//!
//! Wires a `link_host::HostLink` directly onto a `link_cartridge::CartridgeLink`
//! through [`SimTransport`], an in-process [`HostBus`] that calls straight
//! into the cartridge's own handler methods rather than polling a real FPGA
//! FIFO. This matches the single-threaded cooperative concurrency model of
//! the real link: there is no concurrent hardware to wait on, so a
//! `SEND_QUEUE` "reply" is simply whatever the cartridge pushes during the
//! same call.

use link_cartridge::bus::{CartridgeBus, VideoFixup};
use link_cartridge::dispatch::DispatchOutcome;
use link_cartridge::CartridgeLink;
use link_host::bus::HostBus;
use link_wire::command::{Command, CommandTag};
use link_wire::input::{Buttons, InputState};
use link_wire::reply::{DataKind, Header1};
use link_wire::rtc::RtcSnapshot;

/// Installs `env_logger` so a harness binary sees `RUST_LOG`-controlled
/// trace/debug output from both `link-host` and `link-cartridge`. Safe to
/// call more than once; only the first call takes effect.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(cfg!(test)).try_init();
}

/// A [`CartridgeBus`] that captures the half-words a `SEND_QUEUE` dispatch
/// pushes instead of driving real hardware. One of these is built fresh for
/// every `SEND_QUEUE` call and handed its contents back to the `SimTransport`
/// that owns the "wire".
struct CaptureBus {
    halfwords: heapless::Vec<u16, { link_cartridge::bus::REPLY_HALFWORDS }>,
    card_request_pulses: u32,
}

impl CaptureBus {
    fn new() -> Self {
        CaptureBus { halfwords: heapless::Vec::new(), card_request_pulses: 0 }
    }
}

impl CartridgeBus for CaptureBus {
    fn clear_send_fifo(&mut self) {
        self.halfwords.clear();
    }

    fn push_halfword(&mut self, half_word: u16) {
        let _ = self.halfwords.push(half_word);
    }

    fn push_buffer(&mut self, words: &[u16], fixup: Option<VideoFixup>) {
        for &word in words {
            let word = match fixup {
                Some(f) => link_wire::video::apply_wire_fixup(word, f.swap_rb),
                None => word,
            };
            let _ = self.halfwords.push(word);
        }
    }

    fn pulse_card_request(&mut self) {
        self.card_request_pulses += 1;
    }
}

/// In-process transport standing in for the FPGA bridge. Every `send_command`
/// resolves synchronously against the cartridge it holds; `read_word`/
/// `wait_for_fifo_len` then drain the reply bytes that call produced.
pub struct SimTransport<'a> {
    cartridge: &'a mut CartridgeLink,
    reply: heapless::Vec<u8, 512>,
    cursor: usize,
    pub card_request_pulses: u32,
    pub reset_requested: bool,
}

impl<'a> SimTransport<'a> {
    pub fn new(cartridge: &'a mut CartridgeLink) -> Self {
        SimTransport { cartridge, reply: heapless::Vec::new(), cursor: 0, card_request_pulses: 0, reset_requested: false }
    }

    fn set_reply(&mut self, bytes: &[u8]) {
        self.reply.clear();
        for &b in bytes {
            let _ = self.reply.push(b);
        }
        self.cursor = 0;
    }

    /// Minimal ack for the fixed-4-byte reply commands: the wire protocol
    /// only pins down command payload formats, not what these replies
    /// carry, so a bare `DataKind::None` header with nothing following it is
    /// the simplest construction consistent with "every command elicits
    /// exactly one reply".
    fn ack_bytes() -> [u8; 4] {
        Header1 { kind: DataKind::None, encoding: 0, byte_count: 0, end: true }.pack().to_le_bytes()
    }
}

impl<'a> HostBus for SimTransport<'a> {
    fn send_command(&mut self, cmd: Command, _reply_len: usize) {
        match cmd.tag {
            CommandTag::Hello => {
                let hello = self.cartridge.on_hello(cmd.payload[0], cmd.payload[1]);
                self.set_reply(&hello.encode());
            }
            CommandTag::Vblank => {
                self.cartridge.on_vblank();
                self.set_reply(&Self::ack_bytes());
            }
            CommandTag::Input => {
                let state = InputState::from_wire(&cmd.payload);
                self.cartridge.on_input(state.buttons, state.touch_x, state.touch_y);
                self.set_reply(&Self::ack_bytes());
            }
            CommandTag::Rtc => {
                self.cartridge.on_rtc(RtcSnapshot::from_bytes(cmd.payload));
                self.set_reply(&Self::ack_bytes());
            }
            CommandTag::AudioConsumed => {
                let count = u16::from_le_bytes([cmd.payload[5], cmd.payload[6]]);
                self.cartridge.on_audio_consumed(count);
                self.set_reply(&Self::ack_bytes());
            }
            CommandTag::VideoDisplayed => {
                self.cartridge.on_video_displayed(cmd.payload[6]);
                self.set_reply(&Self::ack_bytes());
            }
            CommandTag::AudioStatus => {
                self.cartridge.on_audio_status(cmd.payload[6] != 0);
                self.set_reply(&Self::ack_bytes());
            }
            CommandTag::SendQueue => {
                let mut bus = CaptureBus::new();
                let outcome = self.cartridge.on_send_queue(&mut bus);
                self.card_request_pulses += bus.card_request_pulses;
                self.reset_requested = matches!(outcome, DispatchOutcome::ResetRequested);
                if self.reset_requested {
                    log::info!("cartridge requested reset via REQUESTS packet");
                }
                let mut bytes = heapless::Vec::<u8, 512>::new();
                for hw in &bus.halfwords {
                    let _ = bytes.push((*hw & 0xFF) as u8);
                    let _ = bytes.push((*hw >> 8) as u8);
                }
                self.set_reply(&bytes);
            }
        }
    }

    fn wait_for_fifo_len(&mut self, n: usize) -> bool {
        self.reply.len() >= n
    }

    fn read_word(&mut self) -> u32 {
        let mut bytes = [0u8; 4];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = self.reply.get(self.cursor + i).copied().unwrap_or(0);
        }
        self.cursor += 4;
        u32::from_le_bytes(bytes)
    }
}

/// Drain every pending `SEND_QUEUE` reply, handing each decoded
/// [`link_host::IncomingReply`] to `on_reply`, until the cartridge reports
/// `end=true`.
pub fn drain_send_queue<F: FnMut(link_host::IncomingReply)>(
    host: &mut link_host::HostLink,
    transport: &mut SimTransport,
    mut on_reply: F,
) {
    host.request(link_host::scheduler::HostAction::Queue);
    loop {
        match host.service_next(transport, 0, None, None).unwrap() {
            Some((link_host::scheduler::HostAction::Queue, Some(reply))) => on_reply(reply),
            Some(_) => unreachable!("only Queue was requested"),
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use link_cartridge::audio::AudioRing;
    use link_host::HostLink;
    use link_wire::audio::SampleFormat;

    fn established_pair() -> (CartridgeLink, HostLink) {
        let mut cartridge = CartridgeLink::new(0x01, 0x01);
        let mut host = HostLink::new(0x01, 0x01);
        {
            let mut transport = SimTransport::new(&mut cartridge);
            host.perform_handshake(&mut transport, 0x01, 0x01, InputState::default(), RtcSnapshot::default()).unwrap();
        }
        (cartridge, host)
    }

    #[test]
    fn boot_handshake_establishes_both_ends() {
        let (cartridge, host) = established_pair();
        assert_eq!(cartridge.link.status(), link_cartridge::link_fsm::LinkStatus::Established);
        assert_eq!(host.link.status(), link_host::link_fsm::LinkStatus::Established);
    }

    #[test]
    fn full_frame_flip_drains_into_196_video_packets() {
        let (mut cartridge, mut host) = established_pair();
        cartridge.video.flip(0, 192, &mut cartridge.pending).unwrap();

        let mut transport = SimTransport::new(&mut cartridge);
        let mut video_packets = 0;
        let mut saw_end_of_frame = false;
        drain_send_queue(&mut host, &mut transport, |reply| {
            if let link_host::IncomingReply::Video { header2, .. } = reply {
                video_packets += 1;
                saw_end_of_frame |= header2.end_of_frame;
            }
        });

        assert_eq!(video_packets, 196);
        assert!(saw_end_of_frame);
    }

    #[test]
    fn audio_round_trip_acks_and_consumes() {
        let (mut cartridge, mut host) = established_pair();
        cartridge.audio = Some(AudioRing::start(2000, true, true).unwrap());

        // Host observes the start request out-of-band and
        // acks it; the ring only produces once it has moved to `Started`.
        {
            let mut transport = SimTransport::new(&mut cartridge);
            transport.send_command(Command::audio_status(true), 4);
        }
        assert_eq!(cartridge.audio.as_ref().unwrap().lifecycle(), link_wire::audio::AudioLifecycle::Started);

        let samples = vec![0xABu8; 1024 * 4];
        cartridge.audio.as_mut().unwrap().submit(&samples, 1024, &mut cartridge.pending).unwrap();

        let mut total_bytes = 0usize;
        {
            let mut transport = SimTransport::new(&mut cartridge);
            drain_send_queue(&mut host, &mut transport, |reply| {
                if let link_host::IncomingReply::Audio { payload } = reply {
                    total_bytes += payload.len();
                }
            });
        }
        assert_eq!(total_bytes, 1024 * 4);

        let samples_received = (total_bytes / SampleFormat::Stereo16.sample_bytes()) as u16;
        let mut transport = SimTransport::new(&mut cartridge);
        transport.send_command(Command::audio_consumed(samples_received), 4);
        assert_eq!(cartridge.audio.as_ref().unwrap().free_samples(), 2000 - 1024 + samples_received as usize);
    }

    #[test]
    fn press_then_release_between_polls_preserves_both_edges() {
        let (mut cartridge, _host) = established_pair();
        let mut transport = SimTransport::new(&mut cartridge);
        transport.send_command(Command::input(&InputState::new(Buttons::A, 0, 0)), 4);
        transport.send_command(Command::input(&InputState::new(Buttons::empty(), 0, 0)), 4);

        let (_, presses, releases) = cartridge.input.get_input_state();
        assert!(presses.contains(Buttons::A));
        assert!(releases.contains(Buttons::A));
    }

    #[test]
    fn vblank_command_advances_the_cartridge_counter() {
        let (mut cartridge, _host) = established_pair();
        assert_eq!(cartridge.vblank_count(), 0);
        let mut transport = SimTransport::new(&mut cartridge);
        transport.send_command(Command::vblank(), 4);
        assert_eq!(cartridge.vblank_count(), 1);
    }

    #[test]
    fn bus_stall_surfaces_as_a_fifo_timeout() {
        struct StallingTransport;
        impl HostBus for StallingTransport {
            fn send_command(&mut self, _cmd: Command, _reply_len: usize) {}
            fn wait_for_fifo_len(&mut self, _n: usize) -> bool {
                false
            }
            fn read_word(&mut self) -> u32 {
                0
            }
        }

        let mut host = HostLink::new(0x01, 0x01);
        let mut bus = StallingTransport;
        let err = host
            .perform_handshake(&mut bus, 0x01, 0x01, InputState::default(), RtcSnapshot::default())
            .unwrap_err();
        assert!(matches!(err, link_host::errors::HostError::Bus(link_wire::error::LinkError::FifoTimeout { .. })));
    }

    #[test]
    fn reset_request_is_reported_to_the_transport() {
        let (mut cartridge, _host) = established_pair();
        cartridge.requests.request_reset(&mut cartridge.pending);

        let mut transport = SimTransport::new(&mut cartridge);
        transport.send_command(Command::send_queue(), 512);
        assert!(transport.reset_requested);
    }
}
