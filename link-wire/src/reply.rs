//! Reply framing: header words and the payload they describe.

use num_derive::{FromPrimitive, ToPrimitive};

pub use crate::command::ReplyLen;

/// Closed enum of reply payload kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum DataKind {
    None = 0,
    Video = 1,
    Audio = 2,
    Requests = 3,
    Text = 4,
    MipsAssert = 5,
    MipsException = 6,
}

/// Bytes of usable payload after a single header-1 word (no video header-2).
pub const PAYLOAD_LEN_SINGLE_HEADER: usize = 508;
/// Bytes of usable payload after header-1 + header-2 (video replies).
pub const PAYLOAD_LEN_VIDEO: usize = 504;
/// Pixels carried per encoding-0 video packet (504 bytes / 2 bytes-per-pixel).
pub const VIDEO_PIXELS_PER_PACKET: usize = PAYLOAD_LEN_VIDEO / 2;
/// Max byte count the 10-bit field can express.
pub const MAX_BYTE_COUNT: u16 = (1 << 10) - 1;

/// Header-1: `[31:24]=kind [23:16]=encoding [15:6]=byte_count [0]=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header1 {
    pub kind: DataKind,
    pub encoding: u8,
    /// Payload bytes following the header(s); never includes header bytes.
    pub byte_count: u16,
    pub end: bool,
}

impl Header1 {
    pub fn pack(self) -> u32 {
        let kind = num_traits::ToPrimitive::to_u32(&self.kind).unwrap_or(0);
        let byte_count = (self.byte_count & MAX_BYTE_COUNT) as u32;
        (kind << 24) | ((self.encoding as u32) << 16) | (byte_count << 6) | (self.end as u32)
    }

    pub fn unpack(word: u32) -> Option<Self> {
        let kind = num_traits::FromPrimitive::from_u32((word >> 24) & 0xFF)?;
        let encoding = ((word >> 16) & 0xFF) as u8;
        let byte_count = ((word >> 6) & MAX_BYTE_COUNT as u32) as u16;
        let end = (word & 1) != 0;
        Some(Header1 { kind, encoding, byte_count, end })
    }
}

/// Header-2 (video only): `[31:16]=pixel_offset [15]=engine [14:13]=buffer
/// [12]=end_of_frame [11]=set_palette`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header2 {
    pub pixel_offset: u16,
    pub engine: Engine,
    /// Main-engine triple-buffer index; meaningless for Sub.
    pub buffer: u8,
    pub end_of_frame: bool,
    pub set_palette: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Main,
    Sub,
}

impl Header2 {
    pub fn pack(self) -> u32 {
        let engine_bit = match self.engine {
            Engine::Main => 1u32,
            Engine::Sub => 0u32,
        };
        ((self.pixel_offset as u32) << 16)
            | (engine_bit << 15)
            | (((self.buffer & 0b11) as u32) << 13)
            | ((self.end_of_frame as u32) << 12)
            | ((self.set_palette as u32) << 11)
    }

    pub fn unpack(word: u32) -> Self {
        let pixel_offset = (word >> 16) as u16;
        let engine = if (word >> 15) & 1 != 0 { Engine::Main } else { Engine::Sub };
        let buffer = ((word >> 13) & 0b11) as u8;
        let end_of_frame = (word >> 12) & 1 != 0;
        let set_palette = (word >> 11) & 1 != 0;
        Header2 { pixel_offset, engine, buffer, end_of_frame, set_palette }
    }
}
