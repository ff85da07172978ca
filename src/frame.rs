//! In-memory frame container.
//!
//! A `Frame` is a single decoded image produced by one read. Frames are
//! produced fresh on every pull and ownership transfers to the caller; nothing
//! is cached or reused across reads.

/// Channel ordering of a 3-channel frame.
///
/// Capture backends deliver frames in their native ordering. `Bgr` is the
/// storage convention; sessions configured with `convert_to_rgb` flip frames
/// to `Rgb` before handing them out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelOrder {
    Bgr,
    Rgb,
}

/// One decoded frame: a packed pixel buffer plus its dimensions.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    order: ChannelOrder,
}

impl Frame {
    /// Create a frame from a packed pixel buffer.
    ///
    /// `data.len()` must equal `width * height * channels`.
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, order: ChannelOrder) -> Self {
        debug_assert_eq!(
            data.len(),
            width as usize * height as usize * channels as usize
        );
        Self {
            data,
            width,
            height,
            channels,
            order,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Convert the frame to the given channel ordering in place.
    ///
    /// Swaps the first and third channel of every pixel. No-op when the frame
    /// is already in the requested ordering or is not 3-channel.
    pub fn convert_to(&mut self, order: ChannelOrder) {
        if self.order == order || self.channels != 3 {
            return;
        }
        for pixel in self.data.chunks_exact_mut(3) {
            pixel.swap(0, 2);
        }
        self.order = order;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_swaps_first_and_third_channel() {
        let mut frame = Frame::new(vec![1, 2, 3, 4, 5, 6], 2, 1, 3, ChannelOrder::Bgr);
        frame.convert_to(ChannelOrder::Rgb);
        assert_eq!(frame.data(), &[3, 2, 1, 6, 5, 4]);
        assert_eq!(frame.order(), ChannelOrder::Rgb);
    }

    #[test]
    fn convert_to_same_order_is_noop() {
        let mut frame = Frame::new(vec![1, 2, 3], 1, 1, 3, ChannelOrder::Bgr);
        frame.convert_to(ChannelOrder::Bgr);
        assert_eq!(frame.data(), &[1, 2, 3]);
    }

    #[test]
    fn convert_ignores_single_channel_frames() {
        let mut frame = Frame::new(vec![7, 8], 2, 1, 1, ChannelOrder::Bgr);
        frame.convert_to(ChannelOrder::Rgb);
        assert_eq!(frame.data(), &[7, 8]);
    }
}
