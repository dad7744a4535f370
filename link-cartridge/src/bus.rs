//! Cartridge → FPGA bus I/O layer.
//!
//! A real-hardware `hardware` module gated on `target_os = "none"`, and a
//! hosted/simulated one used everywhere else (tests, `link-sim`).

/// Optional wire fixup applied by the FPGA at DMA time:
/// sets the high bit of every 16-bit word and, for engines configured
/// RGB555, swaps the R/B components. `None` means "not video, no fixup".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoFixup {
    pub swap_rb: bool,
}

/// The three operations the cartridge CPU has onto the FPGA bridge
///: clear the send FIFO, push a single half-word, and push a
/// contiguous buffer via DMA (the fast path, used once the video fixup
/// control bits are programmed).
pub trait CartridgeBus {
    fn clear_send_fifo(&mut self);
    fn push_halfword(&mut self, half_word: u16);
    fn push_buffer(&mut self, words: &[u16], fixup: Option<VideoFixup>);
    /// Pulse the card-request line. Edge-triggered on the host side; a pulse
    /// while the host's interrupt is still disabled is simply absorbed
    /// — the caller is responsible for retrying until
    /// established if it cares.
    fn pulse_card_request(&mut self);
}

/// Half-words in one 512-byte `SEND_QUEUE` reply — the length the command
/// tag prescribes regardless of how much of it is meaningful.
pub const REPLY_HALFWORDS: usize = 512 / 2;

/// Push a full reply frame (header word(s) + payload) as the sequence of
/// half-words the FPGA actually receives, padding out to
/// [`REPLY_HALFWORDS`] so the host's `wait_for_fifo_len(512)` is always
/// satisfied regardless of how little of the frame carries real content.
/// `link-wire` hands back `u32` header words and raw payload bytes; this is
/// the one place those get flattened to the half-word granularity the bus
/// transacts in.
pub fn push_reply<B: CartridgeBus>(
    bus: &mut B,
    headers: &[u32],
    payload: &[u8],
    fixup: Option<VideoFixup>,
) {
    let mut pushed = 0usize;
    for header in headers {
        bus.push_halfword((*header & 0xFFFF) as u16);
        bus.push_halfword((*header >> 16) as u16);
        pushed += 2;
    }
    // Payload is always an even number of bytes by construction of the
    // producers in this crate.
    if !payload.is_empty() {
        let mut words = heapless::Vec::<u16, 256>::new();
        for chunk in payload.chunks_exact(2) {
            let _ = words.push(u16::from_le_bytes([chunk[0], chunk[1]]));
        }
        pushed += words.len();
        bus.push_buffer(&words, fixup);
    }
    for _ in pushed..REPLY_HALFWORDS {
        bus.push_halfword(0);
    }
}

#[cfg(feature = "hardware")]
#[cfg(target_os = "none")]
pub mod hardware {
    //! Real FPGA-register backend. Register addresses are a
    //! board-specific constant out of scope here; this module documents the
    //! three bus operations without committing to a board.
    use super::{CartridgeBus, VideoFixup};

    pub struct FpgaBus {
        _control_register: *mut u32,
        _fifo_register: *mut u16,
        _dma_channel: u8,
    }

    impl CartridgeBus for FpgaBus {
        fn clear_send_fifo(&mut self) {
            // Write mode-bit + clear-bit, then mode-bit alone.
            unimplemented!("board-specific FPGA control register layout")
        }
        fn push_halfword(&mut self, _half_word: u16) {
            unimplemented!("board-specific FPGA FIFO register")
        }
        fn push_buffer(&mut self, _words: &[u16], _fixup: Option<VideoFixup>) {
            unimplemented!("board-specific DMA engine")
        }
        fn pulse_card_request(&mut self) {
            unimplemented!("board-specific NDS-IRQ pulse")
        }
    }
}

/// In-process loopback backend: the counterpart in `link-host::bus::sim`
/// drains what gets pushed here. Used by unit tests and `link-sim`. The FIFO
/// itself is owned by whoever wires the two ends together (`link-sim`'s
/// harness, or a unit test) and handed in by mutable reference each call —
/// there is exactly one FPGA FIFO shared by both peers, same as real
/// hardware.
#[cfg(feature = "sim")]
pub mod sim {
    use super::{CartridgeBus, VideoFixup};
    use link_wire::fifo::Fifo;

    /// Capacity covers one 1024-byte reply (512 half-words) plus slack.
    pub const REPLY_FIFO_CAPACITY: usize = 600;
    pub type ReplyFifo = Fifo<REPLY_FIFO_CAPACITY>;

    pub struct LoopbackBus<'q> {
        fifo: &'q mut ReplyFifo,
        pub card_request_pulses: u32,
    }

    impl<'q> LoopbackBus<'q> {
        pub fn new(fifo: &'q mut ReplyFifo) -> Self {
            LoopbackBus { fifo, card_request_pulses: 0 }
        }
    }

    impl<'q> CartridgeBus for LoopbackBus<'q> {
        fn clear_send_fifo(&mut self) {
            self.fifo.clear();
        }

        fn push_halfword(&mut self, half_word: u16) {
            let _ = self.fifo.push(half_word);
        }

        fn push_buffer(&mut self, words: &[u16], fixup: Option<VideoFixup>) {
            for &word in words {
                let word = match fixup {
                    Some(f) => link_wire::video::apply_wire_fixup(word, f.swap_rb),
                    None => word,
                };
                let _ = self.fifo.push(word);
            }
        }

        fn pulse_card_request(&mut self) {
            self.card_request_pulses += 1;
        }
    }
}
