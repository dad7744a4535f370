//! Host-side input sourcing.

use link_wire::command::Command;
use link_wire::input::InputState;

/// The companion-core keypad/touch source.
pub trait InputSource {
    fn poll(&mut self) -> InputState;
}

pub fn build_input_command(state: InputState) -> Command {
    Command::input(&state)
}
