//! The coalesced control-request packet.

bitflags::bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    struct ChangeBits: u8 {
        const START_AUDIO      = 1 << 0;
        const STOP_AUDIO       = 1 << 1;
        const CHANGE_SWAP      = 1 << 2;
        const CHANGE_BACKLIGHT = 1 << 3;
        const RESET            = 1 << 4;
    }
}

/// One coalescing struct: every setter on the cartridge application surface
/// ORs its field into the same pending packet. Sending it
/// clears the struct back to all-zero, unless `reset` was set, in which
/// case the cartridge does not clear it — it jumps to the reset routine
/// instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestsPacket {
    pub start_audio: bool,
    pub audio_freq: u16,
    pub buffer_size: u16,
    pub is_16bit: bool,
    pub is_stereo: bool,
    pub stop_audio: bool,
    pub change_swap: bool,
    pub swap_screens: bool,
    pub change_backlight: bool,
    pub screen_backlights: u8,
    pub reset: bool,
}

impl RequestsPacket {
    /// Serialize into a 508-byte REQUESTS payload. Layout: 1 change-bits
    /// byte, 1 flags byte (is_16bit/is_stereo/swap_screens/reset), 2 bytes
    /// audio_freq LE, 2 bytes buffer_size LE, 1 byte screen_backlights; the
    /// rest of the 508-byte slot is unused.
    pub fn encode(self) -> [u8; crate::reply::PAYLOAD_LEN_SINGLE_HEADER] {
        let mut out = [0u8; crate::reply::PAYLOAD_LEN_SINGLE_HEADER];
        let mut change = ChangeBits::empty();
        change.set(ChangeBits::START_AUDIO, self.start_audio);
        change.set(ChangeBits::STOP_AUDIO, self.stop_audio);
        change.set(ChangeBits::CHANGE_SWAP, self.change_swap);
        change.set(ChangeBits::CHANGE_BACKLIGHT, self.change_backlight);
        change.set(ChangeBits::RESET, self.reset);
        out[0] = change.bits();

        let mut flags = 0u8;
        if self.is_16bit {
            flags |= 1 << 0;
        }
        if self.is_stereo {
            flags |= 1 << 1;
        }
        if self.swap_screens {
            flags |= 1 << 2;
        }
        out[1] = flags;

        out[2..4].copy_from_slice(&self.audio_freq.to_le_bytes());
        out[4..6].copy_from_slice(&self.buffer_size.to_le_bytes());
        out[6] = self.screen_backlights;
        out
    }

    pub fn decode(bytes: &[u8]) -> Self {
        let change = ChangeBits::from_bits_truncate(bytes[0]);
        let flags = bytes[1];
        RequestsPacket {
            start_audio: change.contains(ChangeBits::START_AUDIO),
            stop_audio: change.contains(ChangeBits::STOP_AUDIO),
            change_swap: change.contains(ChangeBits::CHANGE_SWAP),
            change_backlight: change.contains(ChangeBits::CHANGE_BACKLIGHT),
            reset: change.contains(ChangeBits::RESET),
            is_16bit: flags & (1 << 0) != 0,
            is_stereo: flags & (1 << 1) != 0,
            swap_screens: flags & (1 << 2) != 0,
            audio_freq: u16::from_le_bytes([bytes[2], bytes[3]]),
            buffer_size: u16::from_le_bytes([bytes[4], bytes[5]]),
            screen_backlights: bytes[6],
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == RequestsPacket::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let req = RequestsPacket {
            start_audio: true,
            audio_freq: 22050,
            buffer_size: 1024,
            is_16bit: true,
            is_stereo: true,
            stop_audio: false,
            change_swap: true,
            swap_screens: true,
            change_backlight: false,
            screen_backlights: 0b11,
            reset: false,
        };
        let decoded = RequestsPacket::decode(&req.encode());
        assert_eq!(req, decoded);
    }

    #[test]
    fn default_is_empty() {
        assert!(RequestsPacket::default().is_empty());
        let decoded = RequestsPacket::decode(&RequestsPacket::default().encode());
        assert!(decoded.is_empty());
    }
}
