//! Cartridge-side requests channel: application setters
//! coalesce into one pending packet; serializing it clears the struct
//! unless a reset was requested.

use link_wire::requests::RequestsPacket;

use crate::send_queue::{PendingKind, PendingSend};

#[derive(Debug, Default)]
pub struct RequestsChannel {
    pending: RequestsPacket,
    current_swap: bool,
    current_backlights: u8,
}

impl RequestsChannel {
    pub fn new() -> Self {
        RequestsChannel { pending: RequestsPacket::default(), current_swap: false, current_backlights: 0 }
    }

    pub fn request_start_audio(&mut self, freq: u16, buffer_size: u16, is_16bit: bool, is_stereo: bool, pending: &mut PendingSend) {
        self.pending.start_audio = true;
        self.pending.audio_freq = freq;
        self.pending.buffer_size = buffer_size;
        self.pending.is_16bit = is_16bit;
        self.pending.is_stereo = is_stereo;
        pending.add_pending(PendingKind::Requests);
    }

    pub fn request_stop_audio(&mut self, pending: &mut PendingSend) {
        self.pending.stop_audio = true;
        pending.add_pending(PendingKind::Requests);
    }

    /// `SetScreenSwap`.
    pub fn request_screen_swap(&mut self, swap: bool, pending: &mut PendingSend) {
        self.pending.change_swap = true;
        self.pending.swap_screens = swap;
        self.current_swap = swap;
        pending.add_pending(PendingKind::Requests);
    }

    /// `GetScreenSwap`: the last value set by `request_screen_swap`,
    /// independent of whether it has reached the wire yet.
    pub fn screen_swap(&self) -> bool {
        self.current_swap
    }

    /// `SetScreenBacklights`.
    pub fn request_backlights(&mut self, screens: u8, pending: &mut PendingSend) {
        self.pending.change_backlight = true;
        self.pending.screen_backlights = screens;
        self.current_backlights = screens;
        pending.add_pending(PendingKind::Requests);
    }

    /// `GetScreenBacklights`: the last value set by `request_backlights`.
    pub fn screen_backlights(&self) -> u8 {
        self.current_backlights
    }

    pub fn request_reset(&mut self, pending: &mut PendingSend) {
        self.pending.reset = true;
        pending.add_pending(PendingKind::Requests);
    }

    /// Serialize for the wire. The struct clears to empty afterward unless
    /// `reset` was set — in that case the caller is expected to wait for
    /// DMA completion and jump to the reset entry point instead of
    /// continuing normal operation.
    pub fn take_for_wire(&mut self) -> RequestsPacket {
        let packet = self.pending;
        if !packet.reset {
            self.pending = RequestsPacket::default();
        }
        packet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn getters_reflect_last_set_value_across_serialization() {
        let mut ch = RequestsChannel::new();
        let mut pending = PendingSend::new();
        ch.request_screen_swap(true, &mut pending);
        ch.request_backlights(0b10, &mut pending);
        assert!(ch.screen_swap());
        assert_eq!(ch.screen_backlights(), 0b10);
        ch.take_for_wire();
        // Getters report the application's local notion of state, not
        // whether it has reached the wire yet.
        assert!(ch.screen_swap());
        assert_eq!(ch.screen_backlights(), 0b10);
    }

    #[test]
    fn independent_setters_coalesce_into_one_packet() {
        let mut ch = RequestsChannel::new();
        let mut pending = PendingSend::new();
        ch.request_start_audio(22050, 1024, true, true, &mut pending);
        ch.request_backlights(0b11, &mut pending);
        let packet = ch.take_for_wire();
        assert!(packet.start_audio);
        assert_eq!(packet.screen_backlights, 0b11);
        assert!(packet.change_backlight);
    }

    #[test]
    fn packet_clears_after_serialization_unless_reset() {
        let mut ch = RequestsChannel::new();
        let mut pending = PendingSend::new();
        ch.request_start_audio(22050, 1024, true, true, &mut pending);
        ch.take_for_wire();
        assert!(ch.take_for_wire().is_empty());
    }

    #[test]
    fn reset_request_is_not_cleared_by_serialization() {
        let mut ch = RequestsChannel::new();
        let mut pending = PendingSend::new();
        ch.request_reset(&mut pending);
        let first = ch.take_for_wire();
        assert!(first.reset);
        let second = ch.take_for_wire();
        assert!(second.reset);
    }
}
