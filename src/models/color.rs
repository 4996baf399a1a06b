//! Display colors.

use serde::{Deserialize, Serialize};

/// An RGBA color handed to the display layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub const PURPLE: Color = Color::rgb(124, 8, 130);
    pub const PINK: Color = Color::rgb(222, 37, 232);
    pub const CYAN: Color = Color::rgb(63, 224, 214);
    pub const DARK_GREEN: Color = Color::rgb(1, 126, 20);
    pub const LIGHT_GREEN: Color = Color::rgb(23, 209, 51);
    pub const YELLOW: Color = Color::rgb(255, 208, 18);
    pub const ORANGE: Color = Color::rgb(255, 149, 0);
    pub const RED: Color = Color::rgb(199, 10, 10);
    pub const GREY: Color = Color::rgb(224, 222, 218);
    pub const DARK_GREY: Color = Color::rgb(128, 128, 128);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    /// CSS-style hex string, alpha included only when not opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
