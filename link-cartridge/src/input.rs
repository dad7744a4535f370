//! Cartridge-side input/RTC ingestion: press/release edge
//! merging so no transition is lost between two `GetInputState` reads, plus
//! critical-section-guarded RTC storage.

use link_wire::input::{Buttons, InputState};
use link_wire::rtc::RtcSnapshot;

#[derive(Debug, Default)]
pub struct InputIngestion {
    /// Last value delivered to the application.
    in_state: InputState,
    /// Buttons newly pressed since the application last read.
    in_presses: Buttons,
    /// Buttons newly released since the application last read.
    in_releases: Buttons,
}

impl InputIngestion {
    pub fn new() -> Self {
        InputIngestion { in_state: InputState::default(), in_presses: Buttons::empty(), in_releases: Buttons::empty() }
    }

    /// Merge one `INPUT` delivery from the host: bits that
    /// transition 0→1 join `in_presses`, 1→0 join `in_releases`; a bit that
    /// toggles again before the reader drains it is OR'd into whichever
    /// pending mask corresponds to its new direction, so the earlier edge is
    /// never silently overwritten.
    pub fn on_input_delivered(&mut self, new_buttons: Buttons, touch_x: u8, touch_y: u8) {
        let old = self.in_state.buttons;
        let newly_pressed = new_buttons & !old;
        let newly_released = old & !new_buttons;
        self.in_presses |= newly_pressed;
        self.in_releases |= newly_released;
        self.in_state.buttons = new_buttons;
        if new_buttons.contains(Buttons::TOUCH) {
            self.in_state.touch_x = touch_x;
            self.in_state.touch_y = touch_y;
        }
    }

    /// `GetInputState(&out)`: apply and clear the pending edges, returning
    /// the settled state plus what changed since the last call.
    pub fn get_input_state(&mut self) -> (InputState, Buttons, Buttons) {
        let presses = self.in_presses;
        let releases = self.in_releases;
        self.in_presses = Buttons::empty();
        self.in_releases = Buttons::empty();
        (self.in_state, presses, releases)
    }

    pub fn current_state(&self) -> InputState {
        self.in_state
    }

    /// `AwaitInputChange(&out)`'s wake condition: true once an edge is
    /// waiting to be drained by `get_input_state`. Non-blocking; the caller
    /// loops on this the way it loops on `AudioRing::submit`'s partial
    /// returns.
    pub fn has_pending_change(&self) -> bool {
        !self.in_presses.is_empty() || !self.in_releases.is_empty()
    }

    /// `AwaitAllButtonsIn(mask)`.
    pub fn all_buttons_in(&self, mask: Buttons) -> bool {
        self.in_state.buttons & mask == mask
    }

    /// `AwaitAnyButtonsIn(mask)`.
    pub fn any_buttons_in(&self, mask: Buttons) -> bool {
        !(self.in_state.buttons & mask).is_empty()
    }

    /// `AwaitNotAllButtonsIn(mask)`.
    pub fn not_all_buttons_in(&self, mask: Buttons) -> bool {
        !self.all_buttons_in(mask)
    }

    /// `AwaitNoButtonsIn(mask)`.
    pub fn no_buttons_in(&self, mask: Buttons) -> bool {
        (self.in_state.buttons & mask).is_empty()
    }

    /// `AwaitAnyButtons()`.
    pub fn any_buttons(&self) -> bool {
        !self.in_state.buttons.is_empty()
    }

    /// `AwaitNoButtons()`.
    pub fn no_buttons(&self) -> bool {
        self.in_state.buttons.is_empty()
    }
}

/// RTC storage. Real firmware guards this with `enter_critical`/
/// `leave_critical` around the 7-byte struct because an interrupt handler
/// writes it; the sim harness models the same discipline by
/// requiring callers to go through `read`/`write` rather than touching the
/// field directly.
#[derive(Debug, Default)]
pub struct RtcCell {
    snapshot: RtcSnapshot,
}

impl RtcCell {
    pub fn new() -> Self {
        RtcCell { snapshot: RtcSnapshot::default() }
    }

    pub fn write(&mut self, snapshot: RtcSnapshot) {
        self.snapshot = snapshot;
    }

    pub fn read(&self) -> RtcSnapshot {
        self.snapshot
    }
}
