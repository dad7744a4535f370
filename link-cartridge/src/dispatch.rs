//! `SEND_QUEUE` command handler: takes the lowest-priority
//! pending bit and dispatches to the subsystem that owns it, producing the
//! bytes `bus::push_reply` puts on the wire.

use link_wire::reply::{DataKind, Header1, PAYLOAD_LEN_SINGLE_HEADER};

use crate::audio::AudioRing;
use crate::bus::{push_reply, CartridgeBus, VideoFixup};
use crate::errors::FaultChannel;
use crate::requests::RequestsChannel;
use crate::reset::ResetHandover;
use crate::send_queue::{PendingKind, PendingSend};
use crate::text::TextChannel;
use crate::video::VideoSubsystem;

/// Everything `dispatch_send_queue` needs read/write access to. Grouped as
/// a parameter struct rather than threaded individually, mirroring the
/// single endpoint-context design used throughout this crate.
pub struct CartridgeResources<'a> {
    pub pending: &'a mut PendingSend,
    pub video: &'a mut VideoSubsystem,
    pub audio: Option<&'a mut AudioRing>,
    pub requests: &'a mut RequestsChannel,
    pub text: &'a mut TextChannel,
    pub faults: &'a mut FaultChannel,
}

/// Outcome of one dispatch: either a normal reply was written to `bus`, or
/// the cartridge must now drive the reset handover and never return.
pub enum DispatchOutcome {
    Replied,
    ResetRequested,
}

/// Handle one `SEND_QUEUE` command: pop the next pending kind and write its
/// reply. Returns `ResetRequested` when the REQUESTS payload carried
/// `reset=1` — callers should follow up with `reset::drive_reset_to_completion`.
pub fn dispatch_send_queue<B: CartridgeBus>(bus: &mut B, res: &mut CartridgeResources) -> DispatchOutcome {
    match res.pending.take_pending() {
        PendingKind::Exception | PendingKind::Assert => {
            let (kind, payload) = match res.faults.take() {
                Some(crate::errors::FaultReport::Exception(report)) => (DataKind::MipsException, report.encode()),
                Some(crate::errors::FaultReport::Assert(report)) => (DataKind::MipsAssert, report.encode()),
                None => (DataKind::None, heapless::Vec::<u8, PAYLOAD_LEN_SINGLE_HEADER>::new()),
            };
            let header = Header1 { kind, encoding: 0, byte_count: payload.len() as u16, end: res.pending.is_empty() };
            push_reply(bus, &[header.pack()], &payload, None);
            DispatchOutcome::Replied
        }
        PendingKind::Requests => {
            let packet = res.requests.take_for_wire();
            let reset_requested = packet.reset;
            let payload = packet.encode();
            let header = Header1 { kind: DataKind::Requests, encoding: 0, byte_count: payload.len() as u16, end: res.pending.is_empty() };
            push_reply(bus, &[header.pack()], &payload, None);
            if reset_requested {
                DispatchOutcome::ResetRequested
            } else {
                DispatchOutcome::Replied
            }
        }
        PendingKind::Audio => {
            if let Some(ring) = res.audio.as_deref_mut() {
                if let Some((mut header, payload)) = ring.dequeue() {
                    if ring.has_pending_send() {
                        res.pending.add_pending(PendingKind::Audio);
                    }
                    header.end = res.pending.is_empty();
                    push_reply(bus, &[header.pack()], &payload, None);
                }
            }
            DispatchOutcome::Replied
        }
        PendingKind::Text => {
            if let Some((stream, bytes)) = res.text.dequeue() {
                let mut payload = heapless::Vec::<u8, PAYLOAD_LEN_SINGLE_HEADER>::new();
                let _ = payload.push(match stream {
                    crate::text::TextStream::Out => 0,
                    crate::text::TextStream::Err => 1,
                });
                for &b in &bytes {
                    let _ = payload.push(b);
                }
                let header = Header1 { kind: DataKind::Text, encoding: 0, byte_count: payload.len() as u16, end: res.pending.is_empty() };
                push_reply(bus, &[header.pack()], &payload, None);
            }
            DispatchOutcome::Replied
        }
        PendingKind::Video => {
            if let Some(packet) = res.video.dequeue() {
                if res.video.has_pending_transfer() {
                    res.pending.add_pending(PendingKind::Video);
                }
                let mut header1 = packet.header1;
                header1.end = res.pending.is_empty();
                let payload: heapless::Vec<u8, PAYLOAD_LEN_SINGLE_HEADER> = packet
                    .pixels
                    .iter()
                    .flat_map(|p| p.to_le_bytes())
                    .collect();
                let format = match packet.header2.engine {
                    link_wire::reply::Engine::Main => res.video.main.pixel_format(),
                    link_wire::reply::Engine::Sub => res.video.sub.pixel_format(),
                };
                let fixup = Some(VideoFixup {
                    swap_rb: matches!(format, link_wire::video::PixelFormat::Rgb555),
                });
                push_reply(bus, &[header1.pack(), packet.header2.pack()], &payload, fixup);
            }
            DispatchOutcome::Replied
        }
        PendingKind::End => {
            let header = Header1 { kind: DataKind::None, encoding: 0, byte_count: 0, end: true };
            push_reply(bus, &[header.pack()], &[], None);
            DispatchOutcome::Replied
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::sim::{LoopbackBus, ReplyFifo};
    use crate::errors::FaultChannel;
    use crate::send_queue::PendingSend;
    use crate::text::TextChannel;
    use crate::video::Engine;
    use link_wire::video::PixelFormat;

    /// A Sub-engine packet must be wire-fixed-up using Sub's pixel format,
    /// not Main's, even when the two disagree.
    #[test]
    fn sub_engine_dispatch_uses_sub_pixel_format_not_main() {
        let mut video = VideoSubsystem::new();
        video.set_pixel_format(Engine::Main, PixelFormat::Rgb555);
        video.set_pixel_format(Engine::Sub, PixelFormat::Bgr555);
        let red: u16 = 0b0_11111_00000_00000;
        video.get_sub_screen().fill(red);
        let mut pending = PendingSend::new();
        video.update_screen(Engine::Sub, &mut pending).unwrap();

        let mut requests = RequestsChannel::new();
        let mut text = TextChannel::new();
        let mut faults = FaultChannel::new();
        let mut res = CartridgeResources {
            pending: &mut pending,
            video: &mut video,
            audio: None,
            requests: &mut requests,
            text: &mut text,
            faults: &mut faults,
        };

        let mut fifo = ReplyFifo::new();
        let mut bus = LoopbackBus::new(&mut fifo);
        dispatch_send_queue(&mut bus, &mut res);

        // Drain header1 and header2 (two halfwords each), then inspect the
        // first payload word.
        for _ in 0..4 {
            fifo.pop().unwrap();
        }
        let first_payload_word = fifo.pop().unwrap();
        // Sub is Bgr555: no R/B swap should have happened. If the dispatch
        // wrongly consulted Main's Rgb555 format, this word would come back
        // with red and blue swapped instead.
        assert_eq!(first_payload_word, link_wire::video::apply_wire_fixup(red, false));
    }
}
