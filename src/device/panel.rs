/*
 *  device/panel.rs
 *
 *  PowMon - fresh tracks, fresh data
 *  (c) 2023-26 Stuart Hunter
 *
 *  Framebuffer-backed text panel (embedded-graphics + embedded-text)
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use embedded_graphics::mono_font::{MonoTextStyle, ascii::FONT_9X15};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_text::TextBox;
use embedded_text::alignment::{HorizontalAlignment, VerticalAlignment};
use embedded_text::style::TextBoxStyleBuilder;
use log::{debug, info};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use crate::device::error::{DeviceError, DeviceResult};
use crate::device::framebuf::PanelBuf;
use crate::device::traits::TextDisplay;

/// Text panel that lays the screen out in a 1-bit framebuffer.
///
/// On the host the rendered rows are echoed to the log and, when a
/// snapshot path is set, the panel image is written as a PBM after
/// every render.
#[derive(Debug)]
pub struct PanelDisplay {
    fb: PanelBuf,
    snapshot: Option<PathBuf>,
    initialized: bool,
    last_text: String,
}

impl PanelDisplay {
    pub fn new(width: u32, height: u32, snapshot: Option<PathBuf>) -> Self {
        Self {
            fb: PanelBuf::new(width, height),
            snapshot,
            initialized: false,
            last_text: String::new(),
        }
    }

    pub fn framebuffer(&self) -> &PanelBuf {
        &self.fb
    }

    pub fn last_text(&self) -> &str {
        &self.last_text
    }

    fn draw(&mut self, text: &str) -> DeviceResult {
        self.fb.blank();
        let character_style = MonoTextStyle::new(&FONT_9X15, BinaryColor::On);
        let textbox_style = TextBoxStyleBuilder::new()
            .alignment(HorizontalAlignment::Left)
            .vertical_alignment(VerticalAlignment::Top)
            .build();
        let (w, h) = (self.fb.width() as u32, self.fb.height() as u32);
        let bounds = Rectangle::new(Point::new(1, 0), Size::new(w.saturating_sub(2), h));
        TextBox::with_textbox_style(text, bounds, character_style, textbox_style)
            .draw(&mut self.fb)
            .map_err(|_| DeviceError::DrawingError("text layout failed".into()))?;
        debug!("Panel drew {} rows", text.lines().count());
        Ok(())
    }

    fn save_snapshot(&self) -> DeviceResult {
        if let Some(path) = self.snapshot.as_ref() {
            let mut out = BufWriter::new(File::create(path)?);
            self.fb.write_pbm(&mut out)?;
        }
        Ok(())
    }
}

impl TextDisplay for PanelDisplay {
    fn init(&mut self) -> DeviceResult {
        self.fb.blank();
        self.initialized = true;
        Ok(())
    }

    fn render_text(&mut self, text: &str) -> DeviceResult {
        if !self.initialized {
            return Err(DeviceError::NotInitialized);
        }
        self.draw(text)?;
        for row in text.lines().filter(|l| !l.is_empty()) {
            info!("| {}", row);
        }
        self.last_text = text.to_string();
        self.save_snapshot()
    }

    fn release(&mut self) -> DeviceResult {
        self.initialized = false;
        Ok(())
    }
}
