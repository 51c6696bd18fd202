//! Monochrome RAM framebuffer with dirty-rectangle tracking.
//!
//! E-paper refreshes are slow, so drawing targets this buffer and only the
//! bounding box of changed pixels is pushed to the panel on flush.

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PointsIter, Rectangle};
use log::debug;

/// Panel width of the 2.13" e-paper in landscape.
pub const DISPLAY_WIDTH_PX: u32 = 250;
pub const DISPLAY_HEIGHT_PX: u32 = 122;

const PIXEL_COUNT: usize = DISPLAY_WIDTH_PX as usize * DISPLAY_HEIGHT_PX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DirtyRect {
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
}

impl DirtyRect {
    fn expand(&mut self, x: usize, y: usize) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn from_point(x: usize, y: usize) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn as_rectangle(&self) -> Rectangle {
        Rectangle::new(
            Point::new(self.min_x as i32, self.min_y as i32),
            Size::new(
                (self.max_x - self.min_x + 1) as u32,
                (self.max_y - self.min_y + 1) as u32,
            ),
        )
    }
}

/// Heap allocated `DrawTarget<Color = BinaryColor>`, one byte per pixel.
pub struct FrameBuffer {
    pixels: Vec<BinaryColor>,
    dirty: Option<DirtyRect>,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// Allocate a buffer filled with paper (off) pixels.
    pub fn new() -> Self {
        Self {
            pixels: vec![BinaryColor::Off; PIXEL_COUNT],
            dirty: None,
        }
    }

    #[inline]
    fn set_pixel(&mut self, x: usize, y: usize, color: BinaryColor) {
        let idx = y * DISPLAY_WIDTH_PX as usize + x;
        if self.pixels[idx] != color {
            self.pixels[idx] = color;
            match &mut self.dirty {
                Some(rect) => rect.expand(x, y),
                None => self.dirty = Some(DirtyRect::from_point(x, y)),
            }
        }
    }

    /// Color at a coordinate, `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<BinaryColor> {
        if x >= DISPLAY_WIDTH_PX || y >= DISPLAY_HEIGHT_PX {
            return None;
        }
        Some(self.pixels[(y * DISPLAY_WIDTH_PX + x) as usize])
    }

    /// Bounding box of pixels changed since the last flush.
    pub fn dirty_area(&self) -> Option<Rectangle> {
        self.dirty.map(|rect| rect.as_rectangle())
    }

    /// Number of ink (on) pixels inside `area`.
    pub fn ink_in(&self, area: &Rectangle) -> usize {
        area.points()
            .filter(|p| p.x >= 0 && p.y >= 0)
            .filter_map(|p| self.pixel(p.x as u32, p.y as u32))
            .filter(|c| *c == BinaryColor::On)
            .count()
    }

    /// Push the dirty region to a panel, then reset the dirty state.
    ///
    /// A no-op when nothing changed.
    pub fn flush<D>(&mut self, display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let Some(rect) = self.dirty.take() else {
            return Ok(());
        };

        let area = rect.as_rectangle();
        let width = area.size.width as usize;
        debug!(
            "Flushing {}x{} dirty region at ({}, {})",
            width, area.size.height, rect.min_x, rect.min_y
        );

        let pixels = &self.pixels;
        let stride = DISPLAY_WIDTH_PX as usize;
        let pixel_iter = (rect.min_y..=rect.max_y).flat_map(move |y| {
            let row_start = y * stride + rect.min_x;
            pixels[row_start..row_start + width].iter().copied()
        });

        display.fill_contiguous(&area, pixel_iter)
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            if coord.x >= 0
                && coord.y >= 0
                && (coord.x as u32) < DISPLAY_WIDTH_PX
                && (coord.y as u32) < DISPLAY_HEIGHT_PX
            {
                self.set_pixel(coord.x as usize, coord.y as usize, color);
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let w = DISPLAY_WIDTH_PX as usize;
        let h = DISPLAY_HEIGHT_PX as usize;

        let x_start = (area.top_left.x.max(0) as usize).min(w);
        let y_start = (area.top_left.y.max(0) as usize).min(h);
        let x_end = (area.top_left.x.max(0) as usize)
            .saturating_add(area.size.width as usize)
            .min(w);
        let y_end = (area.top_left.y.max(0) as usize)
            .saturating_add(area.size.height as usize)
            .min(h);

        for y in y_start..y_end {
            for x in x_start..x_end {
                self.set_pixel(x, y, color);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        for y in 0..DISPLAY_HEIGHT_PX as usize {
            for x in 0..DISPLAY_WIDTH_PX as usize {
                self.set_pixel(x, y, color);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::mock_display::MockDisplay;

    #[test]
    fn test_fresh_buffer_is_clean() {
        let fb = FrameBuffer::new();
        assert_eq!(fb.dirty_area(), None);
        assert_eq!(fb.pixel(0, 0), Some(BinaryColor::Off));
        assert_eq!(fb.pixel(DISPLAY_WIDTH_PX, 0), None);
    }

    #[test]
    fn test_dirty_area_covers_changed_pixels_only() {
        let mut fb = FrameBuffer::new();
        fb.fill_solid(
            &Rectangle::new(Point::new(3, 2), Size::new(4, 2)),
            BinaryColor::On,
        )
        .unwrap();
        // Writing the color a pixel already has does not grow the area.
        fb.fill_solid(
            &Rectangle::new(Point::new(100, 100), Size::new(5, 5)),
            BinaryColor::Off,
        )
        .unwrap();

        assert_eq!(
            fb.dirty_area(),
            Some(Rectangle::new(Point::new(3, 2), Size::new(4, 2)))
        );
        assert_eq!(fb.ink_in(&Rectangle::new(Point::zero(), Size::new(10, 10))), 8);
    }

    #[test]
    fn test_flush_sends_dirty_region_and_resets() {
        let mut fb = FrameBuffer::new();
        Pixel(Point::new(1, 1), BinaryColor::On).draw(&mut fb).unwrap();
        Pixel(Point::new(2, 3), BinaryColor::On).draw(&mut fb).unwrap();

        let mut display = MockDisplay::new();
        fb.flush(&mut display).unwrap();

        assert_eq!(display.get_pixel(Point::new(1, 1)), Some(BinaryColor::On));
        assert_eq!(display.get_pixel(Point::new(2, 3)), Some(BinaryColor::On));
        assert_eq!(display.get_pixel(Point::new(2, 1)), Some(BinaryColor::Off));
        assert_eq!(display.get_pixel(Point::new(0, 0)), None);
        assert_eq!(fb.dirty_area(), None);
    }

    #[test]
    fn test_out_of_bounds_pixels_are_ignored() {
        let mut fb = FrameBuffer::new();
        Pixel(Point::new(-1, 5), BinaryColor::On).draw(&mut fb).unwrap();
        Pixel(Point::new(300, 5), BinaryColor::On).draw(&mut fb).unwrap();
        assert_eq!(fb.dirty_area(), None);
    }
}
