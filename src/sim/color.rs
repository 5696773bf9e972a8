//! Ball and obstacle colours

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// RGBA colour, alpha in 0..=255
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::hex(0xFFFFFF);

    /// Opaque colour from 0xRRGGBB
    pub const fn hex(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xFF) as u8,
            g: ((rgb >> 8) & 0xFF) as u8,
            b: (rgb & 0xFF) as u8,
            a: 255,
        }
    }

    /// Colour with alpha given as a fraction (0.0 - 1.0)
    pub const fn rgba(r: u8, g: u8, b: u8, alpha: f32) -> Self {
        Self {
            r,
            g,
            b,
            a: (alpha * 255.0) as u8,
        }
    }
}

/// CSS form: `#rrggbb` when opaque, `rgba(...)` otherwise
impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(
                f,
                "rgba({}, {}, {}, {:.2})",
                self.r,
                self.g,
                self.b,
                self.a as f32 / 255.0
            )
        }
    }
}

/// Ball palette with the display name bots take from their colour
pub const PALETTE: [(Color, &str); 20] = [
    (Color::hex(0xFF6B6B), "Red"),
    (Color::hex(0x4ECDC4), "Teal"),
    (Color::hex(0xFFE66D), "Yellow"),
    (Color::hex(0x1A535C), "Forest"),
    (Color::hex(0xFF9F1C), "Orange"),
    (Color::hex(0x7B68EE), "Purple"),
    (Color::hex(0x20BF55), "Lime"),
    (Color::hex(0xEF476F), "Pink"),
    (Color::hex(0x118AB2), "Blue"),
    (Color::hex(0x06D6A0), "Mint"),
    (Color::hex(0x800000), "Maroon"),
    (Color::hex(0x9932CC), "Orchid"),
    (Color::hex(0xFF8C00), "Tangerine"),
    (Color::hex(0x008080), "Turquoise"),
    (Color::hex(0x4B0082), "Indigo"),
    (Color::hex(0xFF1493), "Magenta"),
    (Color::hex(0xFFD700), "Gold"),
    (Color::hex(0x00CED1), "Cyan"),
    (Color::hex(0x8B4513), "Brown"),
    (Color::hex(0x2E8B57), "Emerald"),
];

/// Hands out palette entries without repeats until the palette is used up
#[derive(Debug, Clone, Default)]
pub struct ColorPicker {
    used: Vec<usize>,
}

impl ColorPicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Random unused palette entry; starts over once every colour has been handed out
    pub fn pick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> (Color, &'static str) {
        if self.used.len() >= PALETTE.len() {
            self.used.clear();
        }
        let available: Vec<usize> = (0..PALETTE.len())
            .filter(|i| !self.used.contains(i))
            .collect();
        let index = available[rng.random_range(0..available.len())];
        self.used.push(index);
        PALETTE[index]
    }
}
