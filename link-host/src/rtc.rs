//! Host-side RTC sourcing.

use link_wire::command::Command;
use link_wire::rtc::RtcSnapshot;

/// The hardware real-time clock.
pub trait RtcSource {
    fn read(&mut self) -> RtcSnapshot;
}

pub fn build_rtc_command(snapshot: &RtcSnapshot) -> Command {
    Command::rtc(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use link_wire::command::CommandTag;

    #[test]
    fn builds_an_rtc_command_carrying_the_snapshot() {
        let snapshot = RtcSnapshot { year: 26, month: 7, day: 30, weekday: 3, hour: 12, minute: 0, second: 0 };
        let cmd = build_rtc_command(&snapshot);
        assert_eq!(cmd.tag, CommandTag::Rtc);
        assert_eq!(RtcSnapshot::from_bytes(cmd.payload), snapshot);
    }
}
