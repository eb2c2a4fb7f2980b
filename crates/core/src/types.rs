use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CaptureError;

/// Window identifier (CGWindowID on macOS, HWND on Windows)
pub type WindowId = u64;

/// Screen-coordinate bounding box of a window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Region {
    pub l: i32,
    pub t: i32,
    pub w: i32,
    pub h: i32,
}

/// Sub-region for partial capture (relative to window origin)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRect {
    pub l: i32,
    pub t: i32,
    pub w: i32,
    pub h: i32,
}

/// Buffer-local coordinate. Signed because signature offsets may point
/// left of or above the match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, by: Point) -> Point {
        Point::new(self.x + by.x, self.y + by.y)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// 24-bit key used by the signature index: r<<16 | g<<8 | b
    pub const fn packed(self) -> u32 {
        (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    pub fn parse_hex(s: &str) -> Option<Rgb> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let v = u32::from_str_radix(hex, 16).ok()?;
        Some(Rgb::new((v >> 16) as u8, (v >> 8) as u8, v as u8))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

// Colors come from hand-edited JSON in both spellings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RgbRepr {
    Hex(String),
    Triple([u8; 3]),
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        match RgbRepr::deserialize(de)? {
            RgbRepr::Triple([r, g, b]) => Ok(Rgb::new(r, g, b)),
            RgbRepr::Hex(s) => Rgb::parse_hex(&s)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid color \"{}\"", s))),
        }
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&self.to_string())
    }
}

/// Raw screenshot pixel data (BGRA)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub bytes_per_row: u32,
}

impl Capture {
    /// A tightly packed capture of a single color.
    pub fn filled(width: u32, height: u32, color: Rgb) -> Self {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            data.extend_from_slice(&[color.b, color.g, color.r, 255]);
        }
        Self { data, width, height, bytes_per_row: width * 4 }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y * self.bytes_per_row + x * 4) as usize
    }

    /// Read one pixel, converting from BGRA memory order.
    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgb> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        let idx = self.index(x as u32, y as u32);
        let px = self.data.get(idx..idx + 4)?;
        Some(Rgb::new(px[2], px[1], px[0]))
    }

    /// Write one pixel. Out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgb) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = self.index(x, y);
        if let Some(px) = self.data.get_mut(idx..idx + 4) {
            px.copy_from_slice(&[color.b, color.g, color.r, 255]);
        }
    }

    /// Copy out a sub-rectangle as a new tightly packed capture.
    pub fn crop(&self, rect: CaptureRect) -> Result<Capture, CaptureError> {
        let fits = rect.l >= 0
            && rect.t >= 0
            && rect.w > 0
            && rect.h > 0
            && rect.l.checked_add(rect.w).is_some_and(|r| r as u32 <= self.width)
            && rect.t.checked_add(rect.h).is_some_and(|b| b as u32 <= self.height);
        if !fits {
            return Err(CaptureError::OutOfBounds { rect, width: self.width, height: self.height });
        }

        let (w, h) = (rect.w as u32, rect.h as u32);
        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for y in 0..h {
            let start = self.index(rect.l as u32, rect.t as u32 + y);
            let row = self.data.get(start..start + (w * 4) as usize).ok_or(CaptureError::ShortRead {
                expected: start + (w * 4) as usize,
                got: self.data.len(),
            })?;
            data.extend_from_slice(row);
        }
        Ok(Capture { data, width: w, height: h, bytes_per_row: w * 4 })
    }

    #[cfg(feature = "debug-capture")]
    pub fn save_png(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let mut img = image::RgbaImage::new(self.width, self.height);
        for (x, y, px) in img.enumerate_pixels_mut() {
            let c = self.pixel(x as i32, y as i32).unwrap_or_default();
            *px = image::Rgba([c.r, c.g, c.b, 255]);
        }
        img.save(path)?;
        Ok(())
    }
}
