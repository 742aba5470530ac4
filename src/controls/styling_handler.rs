/*
 * Translates the portable color type into Win32 values for the tree view
 * handler (`TVM_SETBKCOLOR` takes a COLORREF, or -1 for the system default).
 */

use crate::types::Color;
use windows::Win32::Foundation::{COLORREF, LPARAM};

/*
 * Creates a Win32 COLORREF from the platform-agnostic `Color` struct.
 * Win32 expects colors in BGR format, so this function handles the conversion.
 */
pub(crate) fn color_to_colorref(color: &Color) -> COLORREF {
    COLORREF((color.r as u32) | ((color.g as u32) << 8) | ((color.b as u32) << 16))
}

/// LPARAM for `TVM_SETBKCOLOR`; `None` restores the system color.
pub(crate) fn background_lparam(color: Option<Color>) -> LPARAM {
    match color {
        Some(color) => LPARAM(color_to_colorref(&color).0 as isize),
        None => LPARAM(-1),
    }
}
