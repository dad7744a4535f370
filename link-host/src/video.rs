//! Host-side video reception.

use link_wire::error::FramingError;
use link_wire::reply::{Engine, Header1, Header2};
use link_wire::video::{SCREEN_HEIGHT, SCREEN_PIXELS, SCREEN_WIDTH};

/// The external framebuffer consumer. An implementor owns Main/Sub
/// video memory; this crate only validates and routes into it.
pub trait VideoSink {
    fn main_buffer_mut(&mut self, buffer: usize) -> &mut [u16; SCREEN_PIXELS];
    fn sub_buffer_mut(&mut self) -> &mut [u16; SCREEN_PIXELS];
    /// Apply a pending flip recorded by a previous packet's end-of-frame
    /// flag. Called from the VBlank handler.
    fn apply_pending_flip(&mut self, buffer: usize);
}

#[derive(Default)]
pub struct VideoReceiver {
    pending_flip: Option<usize>,
}

impl VideoReceiver {
    pub fn new() -> Self {
        VideoReceiver { pending_flip: None }
    }

    /// Validate and write one VIDEO packet. `pixels` is the raw little-endian pixel data
    /// already read off the bus.
    pub fn receive<S: VideoSink>(
        &mut self,
        sink: &mut S,
        header1: Header1,
        header2: Header2,
        pixels: &[u16],
    ) -> Result<(), FramingError> {
        if header2.pixel_offset % 2 != 0 {
            return Err(FramingError::VideoAlignment);
        }
        if header1.byte_count % 2 != 0 {
            return Err(FramingError::VideoAlignment);
        }
        let pixel_count = header1.byte_count as usize / 2;
        let end = header2.pixel_offset as usize + pixel_count;
        if end > SCREEN_WIDTH * SCREEN_HEIGHT {
            return Err(FramingError::VideoAlignment);
        }
        match header2.engine {
            Engine::Main if header2.buffer > 2 => return Err(FramingError::BufferOutOfRange),
            Engine::Sub if header2.buffer != 0 => return Err(FramingError::BufferOutOfRange),
            _ => {}
        }

        let dest: &mut [u16; SCREEN_PIXELS] = match header2.engine {
            Engine::Main => sink.main_buffer_mut(header2.buffer as usize),
            Engine::Sub => sink.sub_buffer_mut(),
        };
        dest[header2.pixel_offset as usize..end].copy_from_slice(pixels);

        if header2.end_of_frame && matches!(header2.engine, Engine::Main) {
            self.pending_flip = Some(header2.buffer as usize);
        }
        Ok(())
    }

    /// VBlank handler hook: apply any flip recorded since the last call.
    /// Returns the buffer index applied, so the caller can follow up with a
    /// `VIDEO_DISPLAYED` send.
    pub fn apply_pending_flip<S: VideoSink>(&mut self, sink: &mut S) -> Option<usize> {
        let buffer = self.pending_flip.take()?;
        sink.apply_pending_flip(buffer);
        Some(buffer)
    }
}
