//! Host-side half of reset & handover. The platform-specific
//! steps (relocating the loader stub, writing the sentinel entry point,
//! transferring bus-arbitration ownership, soft reset) are kept behind a
//! handover protocol object; only sequencing lives here.

/// `ResetHandover::prepare_to_load` is the whole public surface this needs:
/// a handover protocol object whose public surface is "prepare to load
/// program P" and whose implementation is platform-owned.
pub trait ResetHandover {
    fn stop_audio(&mut self);
    /// Signal the companion core to quiesce over the host-internal FIFO.
    fn quiesce_companion_core(&mut self);
    /// Relocate the loader stub and perform the soft reset. Platform-owned; never returns.
    fn prepare_to_load(&mut self, entry_point: u32) -> !;
}

/// Run the sequence for a `REQUESTS.reset=1` packet: stop audio, quiesce the
/// companion core, then hand off to the platform-owned loader jump.
pub fn handle_reset_request<H: ResetHandover>(handover: &mut H, entry_point: u32) -> ! {
    handover.stop_audio();
    handover.quiesce_companion_core();
    handover.prepare_to_load(entry_point)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingHandover {
        stopped_audio: bool,
        quiesced: bool,
    }

    impl ResetHandover for RecordingHandover {
        fn stop_audio(&mut self) {
            self.stopped_audio = true;
        }
        fn quiesce_companion_core(&mut self) {
            self.quiesced = true;
        }
        fn prepare_to_load(&mut self, _entry_point: u32) -> ! {
            assert!(self.stopped_audio, "audio must stop before handover");
            assert!(self.quiesced, "companion core must quiesce before handover");
            panic!("prepared to load");
        }
    }

    #[test]
    #[should_panic(expected = "prepared to load")]
    fn stops_audio_and_quiesces_before_jumping() {
        let mut handover = RecordingHandover { stopped_audio: false, quiesced: false };
        handle_reset_request(&mut handover, 0x0200_0000);
    }
}
