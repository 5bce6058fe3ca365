//! Text and cell sanitization.
//!
//! Every string that reaches a slide passes through [`ensure_string`], which
//! guarantees XML-1.0 safety and visual normalization. Table cells add
//! whitespace collapse and length capping via [`safe_cell`].

/// Hard cap on any single cell, regardless of mode. A crash guard, not a
/// style knob: PowerPoint's loader rejects pathological cell payloads long
/// before this.
pub const CELL_HARD_CAP: usize = 3000;

/// Coerce a value into an XML-safe, visually normalized string.
///
/// Idempotent: `ensure_string(ensure_string(s)) == ensure_string(s)`.
///
/// Passes, in order: glyph normalization to ASCII equivalents, then removal
/// of the XML-1.0-invalid control class (U+0000-U+0008, U+000B, U+000C,
/// U+000E-U+001F). Unpaired surrogate halves cannot occur in a Rust `str`;
/// JSON decoding has already replaced them upstream.
pub fn ensure_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());

    for ch in value.chars() {
        match ch {
            // Dashes
            '\u{2013}' | '\u{2014}' | '\u{2015}' => out.push('-'),
            // Curly single quotes
            '\u{2018}' | '\u{2019}' | '\u{201A}' => out.push('\''),
            // Curly double quotes
            '\u{201C}' | '\u{201D}' | '\u{201E}' => out.push('"'),
            // Ellipsis
            '\u{2026}' => out.push_str("..."),
            // Non-breaking and narrow spaces
            '\u{00A0}' | '\u{202F}' | '\u{2009}' => out.push(' '),
            // Arrows
            '\u{2192}' => out.push_str("->"),
            '\u{2190}' => out.push_str("<-"),
            '\u{2194}' => out.push_str("<->"),
            // Bullet
            '\u{2022}' | '\u{00B7}' => out.push('-'),
            // Zero-width characters vanish
            '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}' => {}
            // Line/paragraph separators become newlines
            '\u{2028}' | '\u{2029}' => out.push('\n'),
            // XML-1.0-invalid control class is dropped
            '\u{0000}'..='\u{0008}' | '\u{000B}' | '\u{000C}' | '\u{000E}'..='\u{001F}' => {}
            other => out.push(other),
        }
    }

    out
}

/// Expand tight historical per-field caps upward.
///
/// Caps of 40/80/120/260 chars came from an earlier schema and produced
/// pervasive visible truncation; values at or below 40 are treated as soft
/// hints.
fn expand_soft_cap(max_len: usize) -> usize {
    match max_len {
        0..=40 => 220,
        41..=80 => 300,
        81..=120 => 360,
        121..=260 => 600,
        other => other,
    }
}

/// Sanitize a table cell value.
///
/// Applies [`ensure_string`], collapses internal whitespace runs, and caps
/// the result. When `strict_fidelity` is set the soft cap is not applied -
/// the density gates downstream decide whether the row is renderable - but
/// the 3000-char hard cap always holds.
pub fn safe_cell(value: &str, max_len: Option<usize>, strict_fidelity: bool) -> String {
    let cleaned = ensure_string(value);

    // Collapse whitespace runs, preserving single spaces
    let mut collapsed = String::with_capacity(cleaned.len());
    let mut last_was_space = false;
    for ch in cleaned.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                collapsed.push(' ');
            }
            last_was_space = true;
        } else {
            collapsed.push(ch);
            last_was_space = false;
        }
    }
    let collapsed = collapsed.trim().to_string();

    let cap = match max_len {
        Some(m) if !strict_fidelity => expand_soft_cap(m).min(CELL_HARD_CAP),
        _ => CELL_HARD_CAP,
    };

    truncate_chars(&collapsed, cap)
}

/// Truncate to at most `cap` chars on a char boundary, appending an ellipsis
/// marker when anything was dropped.
pub fn truncate_chars(value: &str, cap: usize) -> String {
    if value.chars().count() <= cap {
        return value.to_string();
    }
    let keep = cap.saturating_sub(3);
    let mut out: String = value.chars().take(keep).collect();
    out.push_str("...");
    out
}
