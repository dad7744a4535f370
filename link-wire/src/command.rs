//! Command framing.
//!
//! Commands are 8 bytes: one tag byte followed by up to 7 payload bytes.
//! Encoding uses hand-rolled bit-packing (`From`/`Into` on fixed-size
//! arrays) rather than a derive macro — the layout is dictated by the wire,
//! not by Rust's in-memory representation.

use num_derive::{FromPrimitive, ToPrimitive};

/// The command tag (first byte on the wire). FPGA-internal pseudo-commands
/// (`FIFO_RESET`/`FIFO_STATUS`/`FIFO_READ`) never reach the cartridge CPU and
/// are modeled separately in `link_host::bus`, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum CommandTag {
    SendQueue = 0xC0,
    Vblank = 0xC1,
    Rtc = 0xC2,
    Input = 0xC3,
    AudioConsumed = 0xC4,
    VideoDisplayed = 0xC5,
    AudioStatus = 0xC6,
    Hello = 0xCF,
}

impl CommandTag {
    /// Reply length this tag prescribes.
    pub const fn reply_len(self) -> ReplyLen {
        match self {
            CommandTag::Vblank
            | CommandTag::Rtc
            | CommandTag::Input
            | CommandTag::AudioConsumed
            | CommandTag::VideoDisplayed
            | CommandTag::AudioStatus => ReplyLen::Len4,
            CommandTag::Hello => ReplyLen::Len512,
            CommandTag::SendQueue => ReplyLen::Len512,
        }
    }
}

/// The four reply lengths the bus accepts, and the block-size code the FPGA
/// bus controller wants for each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyLen {
    Len0,
    Len4,
    Len512,
    Len1024,
}

impl ReplyLen {
    pub const fn bytes(self) -> usize {
        match self {
            ReplyLen::Len0 => 0,
            ReplyLen::Len4 => 4,
            ReplyLen::Len512 => 512,
            ReplyLen::Len1024 => 1024,
        }
    }

    /// The block-size code the bus controller's command register expects.
    pub const fn block_code(self) -> u8 {
        match self {
            ReplyLen::Len0 => 0,
            ReplyLen::Len4 => 1,
            ReplyLen::Len512 => 2,
            ReplyLen::Len1024 => 3,
        }
    }
}

/// An 8-byte, 4-byte aligned command frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub tag: CommandTag,
    pub payload: [u8; 7],
}

impl Command {
    pub const fn new(tag: CommandTag, payload: [u8; 7]) -> Self {
        Command { tag, payload }
    }

    pub fn vblank() -> Self {
        Command::new(CommandTag::Vblank, [0; 7])
    }

    pub fn send_queue() -> Self {
        Command::new(CommandTag::SendQueue, [0; 7])
    }

    pub fn rtc(snapshot: &crate::rtc::RtcSnapshot) -> Self {
        let mut payload = [0u8; 7];
        payload[..7].copy_from_slice(&snapshot.to_bytes());
        Command::new(CommandTag::Rtc, payload)
    }

    pub fn input(state: &crate::input::InputState) -> Self {
        let mut payload = [0u8; 7];
        let buttons = state.buttons.bits().to_le_bytes();
        payload[0] = buttons[0];
        payload[1] = buttons[1];
        payload[2] = state.touch_x;
        payload[3] = state.touch_y;
        Command::new(CommandTag::Input, payload)
    }

    pub fn audio_consumed(count: u16) -> Self {
        let mut payload = [0u8; 7];
        let bytes = count.to_le_bytes();
        payload[5] = bytes[0];
        payload[6] = bytes[1];
        Command::new(CommandTag::AudioConsumed, payload)
    }

    pub fn video_displayed(buffer: u8) -> Self {
        let mut payload = [0u8; 7];
        payload[6] = buffer;
        Command::new(CommandTag::VideoDisplayed, payload)
    }

    pub fn audio_status(started: bool) -> Self {
        let mut payload = [0u8; 7];
        payload[6] = started as u8;
        Command::new(CommandTag::AudioStatus, payload)
    }

    pub fn hello(video_enc: u8, audio_enc: u8) -> Self {
        let mut payload = [0u8; 7];
        payload[0] = video_enc;
        payload[1] = audio_enc;
        Command::new(CommandTag::Hello, payload)
    }

    /// Encode to the 8-byte wire frame.
    pub fn to_bytes(self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[0] = self.tag as u8;
        out[1..].copy_from_slice(&self.payload);
        out
    }

    pub fn from_bytes(bytes: [u8; 8]) -> Option<Self> {
        let tag = num_traits::FromPrimitive::from_u8(bytes[0])?;
        let mut payload = [0u8; 7];
        payload.copy_from_slice(&bytes[1..]);
        Some(Command { tag, payload })
    }
}
