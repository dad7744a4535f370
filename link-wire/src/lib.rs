//! Byte-exact framing for the cartridge link protocol.
//!
//! This crate only describes the wire: command/reply structs, header
//! bitfields, and the small value types (RTC snapshot, input state, requests
//! packet) that travel over them. It performs no I/O — `link-host` and
//! `link-cartridge` own the bus and the state machines that use this codec.
#![no_std]

pub mod audio;
pub mod command;
pub mod error;
pub mod fifo;
pub mod hello;
pub mod input;
pub mod requests;
pub mod reply;
pub mod rtc;
pub mod video;

pub use audio::SampleFormat;
pub use command::{Command, CommandTag};
pub use error::{ApiError, FramingError, HelloError, LinkError};
pub use fifo::Fifo;
pub use hello::HelloPayload;
pub use input::{Buttons, InputState};
pub use reply::{DataKind, Header1, Header2, ReplyLen};
pub use requests::RequestsPacket;
pub use rtc::RtcSnapshot;
