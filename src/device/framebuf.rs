/*
 *  device/framebuf.rs
 *
 *  PowMon - fresh tracks, fresh data
 *	(c) 2023-26 Stuart Hunter
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use std::io::Write;

/// Runtime-sized 1-bit framebuffer for the e-paper panel.
#[derive(Debug, Clone)]
pub struct PanelBuf {
    buf: Vec<BinaryColor>,
    w: usize,
    h: usize,
}

impl PanelBuf {
    pub fn new(width: u32, height: u32) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self { buf: vec![BinaryColor::Off; w * h], w, h }
    }

    pub fn width(&self) -> usize { self.w }
    pub fn height(&self) -> usize { self.h }

    pub fn blank(&mut self) {
        self.buf.fill(BinaryColor::Off);
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<BinaryColor> {
        if x < self.w && y < self.h { self.buf.get(y * self.w + x).copied() } else { None }
    }

    pub fn count_on(&self) -> usize {
        self.buf.iter().filter(|p| p.is_on()).count()
    }

    /// Packed for the panel controller: 8 pixels per byte, LSB first
    pub fn to_packed_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.buf.len().div_ceil(8)];
        for (i, pixel) in self.buf.iter().enumerate() {
            if pixel.is_on() {
                bytes[i / 8] |= 1 << (i % 8);
            }
        }
        bytes
    }

    /// Plain PBM (P1) image of the panel, for checking layouts off-device
    pub fn write_pbm<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "P1")?;
        writeln!(out, "{} {}", self.w, self.h)?;
        for row in self.buf.chunks(self.w.max(1)) {
            let line: Vec<&str> = row.iter().map(|p| if p.is_on() { "1" } else { "0" }).collect();
            writeln!(out, "{}", line.join(" "))?;
        }
        Ok(())
    }

    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.y >= 0 {
            let (x, y) = (p.x as usize, p.y as usize);
            if x < self.w && y < self.h {
                return Some(y * self.w + x);
            }
        }
        None
    }
}

impl OriginDimensions for PanelBuf {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl DrawTarget for PanelBuf {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.buf.fill(color);
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        let Size { width, height } = area.size;
        if width == 0 || height == 0 { return Ok(()); }
        let (x0, y0) = (area.top_left.x as usize, area.top_left.y as usize);
        for row in y0..y0 + height as usize {
            let base = row * self.w;
            self.buf[base + x0..base + x0 + width as usize].fill(color);
        }
        Ok(())
    }
}
