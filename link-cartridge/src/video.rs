//! Cartridge-side video subsystem: triple-buffered Main
//! engine, single-buffered Sub engine, the pending-flip queue and the
//! per-packet dequeue that feeds the send queue.

extern crate alloc;
use alloc::boxed::Box;
use heapless::Deque;

use crate::send_queue::{PendingKind, PendingSend};
use link_wire::reply::{Header1, Header2, DataKind, VIDEO_PIXELS_PER_PACKET};
use link_wire::video::{Encoding, PixelFormat, SCREEN_HEIGHT, SCREEN_PIXELS};

pub const MAIN_BUFFER_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Main,
    Sub,
}

/// A frame (or partial-frame) transfer in flight or queued: source buffer,
/// start offset, how many pixels remain, and whether this is the tail of a
/// flip (so the host knows to apply the pending flip once it lands).
struct QueueEntry {
    engine: Engine,
    buffer: usize,
    offset: u16,
    remaining: u16,
    is_flip: bool,
}

pub struct MainScreen {
    buffers: [Box<[u16; SCREEN_PIXELS]>; MAIN_BUFFER_COUNT],
    busy: [bool; MAIN_BUFFER_COUNT],
    current: usize,
    displayed: usize,
    /// Whether the previous queued op into this buffer was also a flip.
    last_was_flip: bool,
    pixel_format: PixelFormat,
}

impl MainScreen {
    pub fn new() -> Self {
        MainScreen {
            buffers: [
                Box::new([0u16; SCREEN_PIXELS]),
                Box::new([0u16; SCREEN_PIXELS]),
                Box::new([0u16; SCREEN_PIXELS]),
            ],
            busy: [false; MAIN_BUFFER_COUNT],
            current: 0,
            displayed: 0,
            last_was_flip: false,
            pixel_format: PixelFormat::Bgr555,
        }
    }

    pub fn current_buffer_mut(&mut self) -> &mut [u16; SCREEN_PIXELS] {
        &mut self.buffers[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn is_busy(&self, buffer: usize) -> bool {
        self.busy[buffer]
    }

    /// True once it is safe to enqueue against `target`: the buffer must
    /// not be busy, and, depending on whether the previous operation was a
    /// flip, the host must have already moved past the buffer we're about
    /// to overwrite.
    pub fn ready_to_enqueue(&self, target: usize, is_flip: bool) -> bool {
        if self.busy[target] {
            return false;
        }
        if is_flip && self.last_was_flip {
            return self.displayed != target;
        }
        if !is_flip && self.last_was_flip {
            let previous = (target + MAIN_BUFFER_COUNT - 1) % MAIN_BUFFER_COUNT;
            return self.displayed == previous;
        }
        true
    }

    pub fn on_displayed(&mut self, buffer: usize) {
        self.displayed = buffer;
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    pub fn set_pixel_format(&mut self, format: PixelFormat) {
        self.pixel_format = format;
    }
}

pub struct SubScreen {
    buffer: Box<[u16; SCREEN_PIXELS]>,
    busy: bool,
    pixel_format: PixelFormat,
}

impl SubScreen {
    pub fn new() -> Self {
        SubScreen { buffer: Box::new([0u16; SCREEN_PIXELS]), busy: false, pixel_format: PixelFormat::Bgr555 }
    }

    pub fn buffer_mut(&mut self) -> &mut [u16; SCREEN_PIXELS] {
        &mut self.buffer
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    pub fn set_pixel_format(&mut self, format: PixelFormat) {
        self.pixel_format = format;
    }
}

/// One encoding-0 dequeue result: the two header words and the pixel
/// payload ready to hand to `bus::push_reply`.
pub struct VideoPacket {
    pub header1: Header1,
    pub header2: Header2,
    pub pixels: heapless::Vec<u16, VIDEO_PIXELS_PER_PACKET>,
    pub end_of_frame: bool,
}

pub struct VideoSubsystem {
    pub main: MainScreen,
    pub sub: SubScreen,
    queue: Deque<QueueEntry, 4>,
    /// `UseVideoCompression`'s flag. Only `Encoding::Raw` ships on the wire
    /// at either end, so this has no effect on `dequeue` yet; it is stored
    /// so the application-facing setter/getter pair exists and the flag
    /// survives once palette encoding lands.
    compression_requested: bool,
}

impl VideoSubsystem {
    pub fn new() -> Self {
        VideoSubsystem {
            main: MainScreen::new(),
            sub: SubScreen::new(),
            queue: Deque::new(),
            compression_requested: false,
        }
    }

    /// `UseVideoCompression(bool)`.
    pub fn set_compression(&mut self, enabled: bool) {
        self.compression_requested = enabled;
    }

    pub fn compression_requested(&self) -> bool {
        self.compression_requested
    }

    /// `GetMainScreen()`: the buffer the application should draw into next.
    pub fn get_main_screen(&mut self) -> &mut [u16; SCREEN_PIXELS] {
        self.main.current_buffer_mut()
    }

    /// `GetSubScreen()`.
    pub fn get_sub_screen(&mut self) -> &mut [u16; SCREEN_PIXELS] {
        self.sub.buffer_mut()
    }

    /// `GetScreen(engine)`.
    pub fn get_screen(&mut self, engine: Engine) -> &mut [u16; SCREEN_PIXELS] {
        match engine {
            Engine::Main => self.main.current_buffer_mut(),
            Engine::Sub => self.sub.buffer_mut(),
        }
    }

    /// `GetPixelFormat(engine)`.
    pub fn pixel_format(&self, engine: Engine) -> PixelFormat {
        match engine {
            Engine::Main => self.main.pixel_format(),
            Engine::Sub => self.sub.pixel_format(),
        }
    }

    /// `SetPixelFormat(engine)`.
    pub fn set_pixel_format(&mut self, engine: Engine, format: PixelFormat) {
        match engine {
            Engine::Main => self.main.set_pixel_format(format),
            Engine::Sub => self.sub.set_pixel_format(format),
        }
    }

    /// `AwaitScreenUpdate(engine)`'s wake condition: true once the target
    /// buffer's in-flight DMA (if any) has finished. Non-blocking; callers
    /// loop on this the way they loop on the audio ring's partial submits.
    pub fn screen_update_complete(&self, engine: Engine) -> bool {
        match engine {
            Engine::Main => !self.main.busy[self.main.current],
            Engine::Sub => !self.sub.busy,
        }
    }

    /// `UpdateScreen(engine)`: full-height convenience over `update`.
    pub fn update_screen(&mut self, engine: Engine, pending: &mut PendingSend) -> Result<(), ()> {
        self.update(engine, 0, SCREEN_HEIGHT as u16, pending)
    }

    /// `FlipMainScreen()`: full-height convenience over `flip`.
    pub fn flip_main_screen(&mut self, pending: &mut PendingSend) -> Result<(), ()> {
        self.flip(0, SCREEN_HEIGHT as u16, pending)
    }

    /// `FillScreen(engine, color)`: paint the target buffer a solid color,
    /// then enqueue it the same way `UpdateScreen` would — filling is a
    /// local pixel-store operation, not a distinct wire encoding.
    pub fn fill(&mut self, engine: Engine, color: u16, pending: &mut PendingSend) -> Result<(), ()> {
        match engine {
            Engine::Main => {
                let idx = self.main.current;
                self.main.buffers[idx].fill(color);
            }
            Engine::Sub => {
                self.sub.buffer.fill(color);
            }
        }
        self.update_screen(engine, pending)
    }

    /// `UpdateScreen`/`UpdateScreenPart` — not a flip, full or partial range
    /// of rows.
    pub fn update(
        &mut self,
        engine: Engine,
        start_y: u16,
        end_y: u16,
        pending: &mut PendingSend,
    ) -> Result<(), ()> {
        self.enqueue(engine, start_y, end_y, false, pending)
    }

    /// `FlipMainScreen`/`FlipMainScreenPart` — advances `current` to the next
    /// buffer and marks the transfer as the tail of a flip.
    pub fn flip(&mut self, start_y: u16, end_y: u16, pending: &mut PendingSend) -> Result<(), ()> {
        let target = (self.main.current + 1) % MAIN_BUFFER_COUNT;
        self.enqueue_main(target, start_y, end_y, true, pending)?;
        self.main.current = target;
        Ok(())
    }

    fn enqueue(
        &mut self,
        engine: Engine,
        start_y: u16,
        end_y: u16,
        is_flip: bool,
        pending: &mut PendingSend,
    ) -> Result<(), ()> {
        match engine {
            Engine::Main => self.enqueue_main(self.main.current, start_y, end_y, is_flip, pending),
            Engine::Sub => {
                if is_flip {
                    return Err(()); // Sub has no page flipping.
                }
                self.enqueue_sub(start_y, end_y, pending)
            }
        }
    }

    fn enqueue_main(
        &mut self,
        buffer: usize,
        start_y: u16,
        end_y: u16,
        is_flip: bool,
        pending: &mut PendingSend,
    ) -> Result<(), ()> {
        let (offset, remaining) = row_range_to_pixels(start_y, end_y)?;
        if !self.main.ready_to_enqueue(buffer, is_flip) {
            return Err(());
        }
        self.main.busy[buffer] = true;
        self.main.last_was_flip = is_flip;
        let _ = self.queue.push_back(QueueEntry { engine: Engine::Main, buffer, offset, remaining, is_flip });
        pending.add_pending(PendingKind::Video);
        Ok(())
    }

    fn enqueue_sub(&mut self, start_y: u16, end_y: u16, pending: &mut PendingSend) -> Result<(), ()> {
        let (offset, remaining) = row_range_to_pixels(start_y, end_y)?;
        if self.sub.busy {
            return Err(());
        }
        self.sub.busy = true;
        let _ = self.queue.push_back(QueueEntry { engine: Engine::Sub, buffer: 0, offset, remaining, is_flip: false });
        pending.add_pending(PendingKind::Video);
        Ok(())
    }

    /// Pull one encoding-0 packet: up to 252
    /// pixels, copied out so the application can keep writing to the live
    /// buffer once this call returns.
    pub fn dequeue(&mut self) -> Option<VideoPacket> {
        let entry = self.queue.front_mut()?;
        let take = core::cmp::min(entry.remaining, VIDEO_PIXELS_PER_PACKET as u16);
        let end_of_frame = entry.remaining <= VIDEO_PIXELS_PER_PACKET as u16 && entry.is_flip;
        let source: &[u16; SCREEN_PIXELS] = match entry.engine {
            Engine::Main => &self.main.buffers[entry.buffer],
            Engine::Sub => &self.sub.buffer,
        };
        let mut pixels = heapless::Vec::<u16, VIDEO_PIXELS_PER_PACKET>::new();
        for i in 0..take as usize {
            let _ = pixels.push(source[entry.offset as usize + i]);
        }
        let header1 = Header1 { kind: DataKind::Video, encoding: Encoding::Raw as u8, byte_count: take * 2, end: false };
        let header2 = Header2 {
            pixel_offset: entry.offset,
            engine: match entry.engine { Engine::Main => link_wire::reply::Engine::Main, Engine::Sub => link_wire::reply::Engine::Sub },
            buffer: entry.buffer as u8,
            end_of_frame,
            set_palette: false,
        };

        entry.offset += take;
        entry.remaining -= take;
        let exhausted = entry.remaining == 0;
        let (engine, buffer) = (entry.engine, entry.buffer);

        if exhausted {
            self.queue.pop_front();
            match engine {
                Engine::Main => self.main.busy[buffer] = false,
                Engine::Sub => self.sub.busy = false,
            }
        }

        Some(VideoPacket { header1, header2, pixels, end_of_frame })
    }

    pub fn has_pending_transfer(&self) -> bool {
        !self.queue.is_empty()
    }
}

fn row_range_to_pixels(start_y: u16, end_y: u16) -> Result<(u16, u16), ()> {
    use link_wire::video::SCREEN_WIDTH;
    if end_y <= start_y || end_y as usize > link_wire::video::SCREEN_HEIGHT {
        return Err(());
    }
    let offset = start_y * SCREEN_WIDTH as u16;
    let remaining = (end_y - start_y) * SCREEN_WIDTH as u16;
    Ok((offset, remaining))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_frame_flip_emits_expected_packet_count_and_end_of_frame() {
        let mut video = VideoSubsystem::new();
        let mut pending = PendingSend::new();
        video.flip(0, 192, &mut pending).unwrap();

        let mut packets = 0;
        let mut last_end_of_frame = false;
        while let Some(packet) = video.dequeue() {
            packets += 1;
            last_end_of_frame = packet.end_of_frame;
            if !video.has_pending_transfer() {
                break;
            }
        }
        // 49152 pixels / 252 per packet = 195 full packets + 1 of 12.
        assert_eq!(packets, 196);
        assert!(last_end_of_frame);
    }

    #[test]
    fn buffer_is_not_busy_after_its_transfer_drains() {
        let mut video = VideoSubsystem::new();
        let mut pending = PendingSend::new();
        video.update(Engine::Main, 0, 1, &mut pending).unwrap();
        assert!(video.main.is_busy(0));
        while video.dequeue().is_some() {}
        assert!(!video.main.is_busy(0));
    }

    #[test]
    fn second_flip_is_rejected_while_target_buffer_still_busy() {
        let mut video = VideoSubsystem::new();
        let mut pending = PendingSend::new();
        video.flip(0, 192, &mut pending).unwrap();
        // current is now buffer 1. A second flip targets buffer 2, which the
        // host hasn't displayed, so it's fine.
        assert!(video.flip(0, 192, &mut pending).is_ok());
        // A third would target buffer 0, which the host is still displaying
        // (displayed index never advanced in this test) — rejected.
        assert!(video.flip(0, 192, &mut pending).is_err());
    }

    #[test]
    fn rejects_out_of_range_row_span() {
        let mut video = VideoSubsystem::new();
        let mut pending = PendingSend::new();
        assert!(video.update(Engine::Main, 100, 300, &mut pending).is_err());
        assert!(video.update(Engine::Main, 5, 5, &mut pending).is_err());
    }

    #[test]
    fn fill_paints_buffer_and_enqueues_full_frame() {
        let mut video = VideoSubsystem::new();
        let mut pending = PendingSend::new();
        video.fill(Engine::Main, 0x1234, &mut pending).unwrap();
        assert!(video.main.is_busy(video.main.current_index()));
        let packet = video.dequeue().unwrap();
        assert!(packet.pixels.iter().all(|&p| p == 0x1234));
    }

    #[test]
    fn get_screen_returns_the_buffer_about_to_be_drawn_into() {
        let mut video = VideoSubsystem::new();
        video.get_main_screen()[0] = 0xAAAA;
        assert_eq!(video.get_screen(Engine::Main)[0], 0xAAAA);
        video.get_sub_screen()[0] = 0xBBBB;
        assert_eq!(video.get_screen(Engine::Sub)[0], 0xBBBB);
    }

    #[test]
    fn pixel_format_setter_is_per_engine() {
        let mut video = VideoSubsystem::new();
        video.set_pixel_format(Engine::Main, PixelFormat::Rgb555);
        video.set_pixel_format(Engine::Sub, PixelFormat::Bgr555);
        assert_eq!(video.pixel_format(Engine::Main), PixelFormat::Rgb555);
        assert_eq!(video.pixel_format(Engine::Sub), PixelFormat::Bgr555);
    }

    #[test]
    fn screen_update_complete_tracks_busy_state_independently_per_engine() {
        let mut video = VideoSubsystem::new();
        let mut pending = PendingSend::new();
        assert!(video.screen_update_complete(Engine::Main));
        assert!(video.screen_update_complete(Engine::Sub));
        video.update_screen(Engine::Sub, &mut pending).unwrap();
        assert!(video.screen_update_complete(Engine::Main));
        assert!(!video.screen_update_complete(Engine::Sub));
        while video.dequeue().is_some() {}
        assert!(video.screen_update_complete(Engine::Sub));
    }

    #[test]
    fn compression_flag_is_just_stored() {
        let mut video = VideoSubsystem::new();
        assert!(!video.compression_requested());
        video.set_compression(true);
        assert!(video.compression_requested());
    }
}
