//! Inch-based rectangles and EMU conversion.
//!
//! Template layouts are extracted in inches; OOXML wants EMU. All geometry
//! math happens in inches and converts at the emission boundary.

use serde::{Deserialize, Serialize};

/// EMU per inch
pub const EMU_PER_INCH: i64 = 914_400;

/// EMU per point
pub const EMU_PER_POINT: i64 = 12_700;

/// EMU per centimeter
pub const EMU_PER_CM: i64 = 360_000;

/// An inches-based rectangle `(x, y, w, h)`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Right edge in inches
    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    /// Bottom edge in inches
    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// Offset in EMU `(x, y)`
    pub fn off_emu(&self) -> (i64, i64) {
        (inches_to_emu(self.x), inches_to_emu(self.y))
    }

    /// Extent in EMU `(cx, cy)`
    pub fn ext_emu(&self) -> (i64, i64) {
        (inches_to_emu(self.w), inches_to_emu(self.h))
    }
}

/// Convert inches to EMU, rounding to the nearest unit
pub fn inches_to_emu(inches: f64) -> i64 {
    (inches * EMU_PER_INCH as f64).round() as i64
}

/// Convert EMU to inches
pub fn emu_to_inches(emu: i64) -> f64 {
    emu as f64 / EMU_PER_INCH as f64
}

/// Convert points to inches
pub fn points_to_inches(points: f64) -> f64 {
    points / 72.0
}
