//! Decoded textures.

/// A texture decoded into fixed-point channel samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    /// Four channels (BGRA) when set, three (BGR) otherwise.
    pub alpha: bool,
    /// Sample offset of this texture within the whole texture table.
    pub mem_start: usize,
    /// Row-major samples in file channel order, each `value << 8`.
    pub pixels: Vec<i32>,
}

impl Texture {
    #[inline]
    pub fn channels(&self) -> usize {
        if self.alpha { 4 } else { 3 }
    }

    #[inline]
    pub fn num_samples(&self) -> usize {
        self.pixels.len()
    }

    /// Samples for the pixel at (x, y), or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[i32]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let ch = self.channels();
        let start = (y as usize * self.width as usize + x as usize) * ch;
        self.pixels.get(start..start + ch)
    }
}
