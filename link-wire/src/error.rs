//! Error taxonomy shared by both ends of the link.

use crate::command::CommandTag;

/// A protocol-level fault: something on the wire did not match what the
/// framing contract promises. Both of these are always fatal on the host
/// — the cartridge cannot observe them, since it never reads
/// its own replies back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// A command's declared reply length was not fully drained, or the FPGA
    /// FIFO never reached the expected byte count.
    FifoDesync,
    /// The bus lag check fired: `last_command` is the command byte that was
    /// in flight when the VBlank dead-man timer expired.
    FifoTimeout { last_command: CommandTag },
    /// A reply header described an out-of-range or inconsistent payload.
    InvalidFraming(FramingError),
    /// The HELLO reply failed validation.
    HelloMismatch(HelloError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingError {
    /// Video pixel offset was odd, or the byte count would run past the
    /// 256x192x2 screen boundary.
    VideoAlignment,
    /// Audio byte count was not a whole number of samples for the format in
    /// effect.
    AudioSampleCount,
    /// Text payload exceeded the 508-byte slot.
    TextTooLong,
    /// Sub-screen engine addressed with a nonzero buffer index (it is
    /// single-buffered), or Main addressed with buffer index > 2.
    BufferOutOfRange,
    /// `byte_count` in header-1 would overflow the 512-byte reply.
    ByteCountOutOfRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelloError {
    BadMagic,
    ReservedNonZero,
    /// Index of the first end-sync byte that failed `byte == index`.
    EndSyncMismatch(u16),
}

/// Small POSIX-style codes the cartridge application surface returns
///. Kept as a typed enum rather than bare `i32`, the way the
/// teacher represents `xous::Error` rather than raw syscall return codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ApiError {
    Inval = 22,
    NoMem = 12,
    Fault = 14,
}
