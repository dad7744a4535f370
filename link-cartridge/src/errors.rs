//! Cartridge-side fault reporting: a MIPS
//! exception or a failed assertion gets serialized at the highest send
//! priority, after which the cartridge idles.

use link_wire::reply::PAYLOAD_LEN_SINGLE_HEADER;

use crate::send_queue::{PendingKind, PendingSend};

/// Register dump for a MIPS exception report.
#[derive(Debug, Clone, Copy)]
pub struct ExceptionReport {
    pub epc: u32,
    pub cause: u32,
    pub registers: [u32; 32],
}

impl ExceptionReport {
    pub fn encode(&self) -> heapless::Vec<u8, PAYLOAD_LEN_SINGLE_HEADER> {
        let mut out = heapless::Vec::new();
        for word in [self.epc, self.cause].iter().chain(self.registers.iter()) {
            for byte in word.to_le_bytes() {
                let _ = out.push(byte);
            }
        }
        out
    }
}

/// File/line/message report for a failed assertion.
#[derive(Debug, Clone, Copy)]
pub struct AssertReport {
    pub line: u32,
    pub file: &'static str,
    pub message: &'static str,
}

impl AssertReport {
    pub fn encode(&self) -> heapless::Vec<u8, PAYLOAD_LEN_SINGLE_HEADER> {
        let mut out = heapless::Vec::new();
        for byte in self.line.to_le_bytes() {
            let _ = out.push(byte);
        }
        for text in [self.file, self.message] {
            let len = (text.len() as u16).min((out.capacity() - out.len() - 2) as u16);
            for byte in len.to_le_bytes() {
                let _ = out.push(byte);
            }
            for &byte in &text.as_bytes()[..len as usize] {
                let _ = out.push(byte);
            }
        }
        out
    }
}

/// Holds at most one fault at a time — once the cartridge has one queued it
/// is about to idle, so there is never a second.
pub enum FaultReport {
    Exception(ExceptionReport),
    Assert(AssertReport),
}

#[derive(Default)]
pub struct FaultChannel {
    pending: Option<FaultReport>,
}

impl FaultChannel {
    pub fn new() -> Self {
        FaultChannel { pending: None }
    }

    pub fn report_exception(&mut self, report: ExceptionReport, pending: &mut PendingSend) {
        self.pending = Some(FaultReport::Exception(report));
        pending.add_pending(PendingKind::Exception);
    }

    pub fn report_assert(&mut self, report: AssertReport, pending: &mut PendingSend) {
        self.pending = Some(FaultReport::Assert(report));
        pending.add_pending(PendingKind::Assert);
    }

    pub fn take(&mut self) -> Option<FaultReport> {
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exception_report_encodes_epc_cause_and_all_registers() {
        let report = ExceptionReport { epc: 0x8000_1000, cause: 0x18, registers: [0; 32] };
        let bytes = report.encode();
        assert_eq!(bytes.len(), 4 + 4 + 32 * 4);
        assert_eq!(&bytes[0..4], &0x8000_1000u32.to_le_bytes());
    }

    #[test]
    fn assert_report_carries_file_and_message_text() {
        let report = AssertReport { line: 42, file: "video.c", message: "buffer busy" };
        let bytes = report.encode();
        assert_eq!(&bytes[0..4], &42u32.to_le_bytes());
    }

    #[test]
    fn fault_channel_holds_at_most_one_report() {
        let mut ch = FaultChannel::new();
        let mut pending = PendingSend::new();
        ch.report_assert(AssertReport { line: 1, file: "a.c", message: "x" }, &mut pending);
        assert!(ch.take().is_some());
        assert!(ch.take().is_none());
    }
}
