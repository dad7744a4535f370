//! Host-side error handling: fatal link errors halt the main
//! loop and print diagnostics; cartridge faults route to a disassembler
//! hook before the link is marked `Error`.

use link_wire::command::CommandTag;
use link_wire::error::{FramingError, HelloError, LinkError};

/// A fatal condition observed by the host. Distinct from `LinkError`
/// (`link-wire`'s wire-level taxonomy) in that it also carries the
/// diagnostic context that gets printed: the last command byte and the
/// FIFO state bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostError {
    Bus(LinkError),
    Framing(FramingError),
    Hello(HelloError),
    /// MIPS exception or assertion reported by the cartridge.
    CartridgeFault,
}

/// Fired once, by `main_loop::report_fatal` (or whatever drives the host's
/// command loop): fatal link errors never propagate to user code, they
/// print and halt. Modeled as a trait so the hosted sim and a real target
/// can each supply their own notion of "print and halt" (the sub-screen vs.
/// a log line and process exit).
pub trait FatalLinkErrorSink {
    fn report(&mut self, error: HostError);
}

/// Dispatches the two instructions near a MIPS fault to a disassembler and
/// renders them. The disassembler itself is out of scope here; this crate
/// only defines the seam.
pub trait FaultReporter {
    fn disassemble_and_display(&mut self, epc: u32, instructions: [u32; 2]);
}

pub fn bus_timeout(last_command: CommandTag) -> HostError {
    HostError::Bus(LinkError::FifoTimeout { last_command })
}
