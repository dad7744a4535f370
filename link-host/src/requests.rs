//! Host-side requests dispatch: forward the coalesced
//! control packet to the companion core.

use link_wire::requests::RequestsPacket;

/// The intra-host message channel to the companion core. Audio start/stop, screen
/// swap, and backlight changes are forwarded through it; `reset` instead
/// drives `reset::ResetHandover` and is never forwarded here.
pub trait RequestsSink {
    fn forward_start_audio(&mut self, freq: u16, buffer_size: u16, is_16bit: bool, is_stereo: bool);
    fn forward_stop_audio(&mut self);
    fn forward_screen_swap(&mut self, swap: bool);
    fn forward_backlights(&mut self, screens: u8);
}

/// Dispatch a decoded `RequestsPacket` to `sink`, per-field, skipping fields
/// whose "change" bit wasn't set.
pub fn dispatch_requests<S: RequestsSink>(sink: &mut S, packet: &RequestsPacket) {
    if packet.start_audio {
        sink.forward_start_audio(packet.audio_freq, packet.buffer_size, packet.is_16bit, packet.is_stereo);
    }
    if packet.stop_audio {
        sink.forward_stop_audio();
    }
    if packet.change_swap {
        sink.forward_screen_swap(packet.swap_screens);
    }
    if packet.change_backlight {
        sink.forward_backlights(packet.screen_backlights);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        start_audio: Option<(u16, u16, bool, bool)>,
        stopped: bool,
        swap: Option<bool>,
        backlights: Option<u8>,
    }

    impl RequestsSink for RecordingSink {
        fn forward_start_audio(&mut self, freq: u16, buffer_size: u16, is_16bit: bool, is_stereo: bool) {
            self.start_audio = Some((freq, buffer_size, is_16bit, is_stereo));
        }
        fn forward_stop_audio(&mut self) {
            self.stopped = true;
        }
        fn forward_screen_swap(&mut self, swap: bool) {
            self.swap = Some(swap);
        }
        fn forward_backlights(&mut self, screens: u8) {
            self.backlights = Some(screens);
        }
    }

    #[test]
    fn only_fields_with_their_change_bit_set_are_forwarded() {
        let mut sink = RecordingSink::default();
        let packet = RequestsPacket { start_audio: true, audio_freq: 22050, buffer_size: 1024, is_16bit: true, is_stereo: true, ..Default::default() };
        dispatch_requests(&mut sink, &packet);
        assert_eq!(sink.start_audio, Some((22050, 1024, true, true)));
        assert!(!sink.stopped);
        assert!(sink.swap.is_none());
    }
}
