//! Input state wire shape.

use bitflags::bitflags;

bitflags! {
    /// The 14-bit button mask. Bit assignment is arbitrary but fixed once
    /// chosen, laid out the same way as a control-register bitflags type.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct Buttons: u16 {
        const A      = 1 << 0;
        const B      = 1 << 1;
        const X      = 1 << 2;
        const Y      = 1 << 3;
        const LEFT   = 1 << 4;
        const RIGHT  = 1 << 5;
        const UP     = 1 << 6;
        const DOWN   = 1 << 7;
        const L      = 1 << 8;
        const R      = 1 << 9;
        const START  = 1 << 10;
        const SELECT = 1 << 11;
        const TOUCH  = 1 << 12;
        const LID    = 1 << 13;
    }
}

impl Buttons {
    /// `GetNewlyPressed(old, new)`: bits set in `new` but not `old`.
    pub fn newly_pressed(old: Buttons, new: Buttons) -> Buttons {
        new & !old
    }

    /// `GetNewlyReleased(old, new)`: bits set in `old` but not `new`.
    pub fn newly_released(old: Buttons, new: Buttons) -> Buttons {
        old & !new
    }
}

/// A single input sample: button mask plus touch coordinates, valid only
/// when `Buttons::TOUCH` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputState {
    pub buttons: Buttons,
    pub touch_x: u8,
    pub touch_y: u8,
}

impl InputState {
    pub fn new(buttons: Buttons, touch_x: u8, touch_y: u8) -> Self {
        InputState { buttons, touch_x, touch_y }
    }

    pub fn from_wire(payload: &[u8; 7]) -> Self {
        let bits = u16::from_le_bytes([payload[0], payload[1]]);
        InputState {
            buttons: Buttons::from_bits_truncate(bits),
            touch_x: payload[2],
            touch_y: payload[3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trip_preserves_buttons_and_touch() {
        let state = InputState::new(Buttons::A | Buttons::TOUCH, 120, 80);
        let cmd = crate::command::Command::input(&state);
        let decoded = InputState::from_wire(&cmd.payload);
        assert_eq!(state, decoded);
    }

    #[test]
    fn unknown_bits_are_truncated_not_rejected() {
        let truncated = Buttons::from_bits_truncate(0xFFFF);
        assert_eq!(truncated.bits(), 0x3FFF);
    }

    #[test]
    fn newly_pressed_and_released_are_disjoint_complements() {
        let old = Buttons::A | Buttons::B;
        let new = Buttons::B | Buttons::X;
        assert_eq!(Buttons::newly_pressed(old, new), Buttons::X);
        assert_eq!(Buttons::newly_released(old, new), Buttons::A);
    }
}
