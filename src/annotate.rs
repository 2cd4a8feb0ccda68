//! Frame annotation: boxes, labels, colors.
//!
//! Draws detection results onto an RGB24 frame in place:
//! - A hollow rectangle at the bounding box, border grown inward
//! - A text label above the box, `"<class> <confidence, 2 decimals>"`
//! - One fixed color for the "occupied" class, another for everything else
//!
//! Drawing clips against the frame edges; out-of-frame geometry is dropped
//! pixel by pixel rather than snapped inside.

use crate::detect::Detection;
use crate::frame::Frame;

/// Box and label color when the class label equals "occupied"
/// (case-insensitive).
pub const COLOR_OCCUPIED: [u8; 3] = [0, 0, 255];

/// Box and label color for every other class.
pub const COLOR_DEFAULT: [u8; 3] = [0, 255, 0];

/// Rectangle border thickness in pixels.
pub const BOX_THICKNESS: i32 = 2;

/// Vertical gap between the label block and the box's top edge.
const LABEL_GAP: i32 = 10;

/// Integer upscale applied to the bitmap font.
const LABEL_SCALE: i32 = 2;

const GLYPH_WIDTH: i32 = 5;
const GLYPH_HEIGHT: i32 = 7;

/// Color for a class label: `COLOR_OCCUPIED` iff the label equals
/// "occupied" ignoring ASCII case.
pub fn box_color(label: &str) -> [u8; 3] {
    if label.eq_ignore_ascii_case("occupied") {
        COLOR_OCCUPIED
    } else {
        COLOR_DEFAULT
    }
}

/// Label text for a detection, confidence rounded to two decimals.
pub fn label_text(label: &str, confidence: f32) -> String {
    format!("{} {:.2}", label, confidence)
}

/// Height in pixels of a rendered label line.
pub fn label_height() -> i32 {
    GLYPH_HEIGHT * LABEL_SCALE
}

/// Draw every detection (box plus label) onto the frame.
pub fn annotate_frame(frame: &mut Frame, detections: &[Detection]) {
    for detection in detections {
        draw_detection(frame, detection);
    }
}

/// Draw one detection: rectangle at the box, label text above it.
pub fn draw_detection(frame: &mut Frame, detection: &Detection) {
    let color = box_color(&detection.label);
    let x1 = detection.x1.round() as i32;
    let y1 = detection.y1.round() as i32;
    let x2 = detection.x2.round() as i32;
    let y2 = detection.y2.round() as i32;

    draw_rectangle(frame, x1, y1, x2, y2, color);

    let text = label_text(&detection.label, detection.confidence);
    let text_y = (y1 - LABEL_GAP - label_height()).max(0);
    draw_text(frame, x1, text_y, &text, color);
}

/// Hollow rectangle with a `BOX_THICKNESS` border grown inward from the
/// `(x1, y1)`-`(x2, y2)` edges.
pub fn draw_rectangle(frame: &mut Frame, x1: i32, y1: i32, x2: i32, y2: i32, rgb: [u8; 3]) {
    // Top and bottom edges.
    for x in x1..=x2 {
        for t in 0..BOX_THICKNESS {
            frame.put_rgb(x, y1 + t, rgb);
            frame.put_rgb(x, y2 - t, rgb);
        }
    }

    // Left and right edges.
    for y in y1..=y2 {
        for t in 0..BOX_THICKNESS {
            frame.put_rgb(x1 + t, y, rgb);
            frame.put_rgb(x2 - t, y, rgb);
        }
    }
}

/// Render `text` with the built-in 5x7 font, top-left anchored at `(x, y)`.
/// Lowercase renders with uppercase glyph shapes; characters without a
/// glyph advance the cursor without drawing.
pub fn draw_text(frame: &mut Frame, x: i32, y: i32, text: &str, rgb: [u8; 3]) {
    let mut cursor = x;
    let advance = (GLYPH_WIDTH + 1) * LABEL_SCALE;
    for c in text.chars() {
        if let Some(rows) = glyph(c) {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits >> (GLYPH_WIDTH - 1 - col) & 1 == 1 {
                        fill_block(
                            frame,
                            cursor + col * LABEL_SCALE,
                            y + row as i32 * LABEL_SCALE,
                            rgb,
                        );
                    }
                }
            }
        }
        cursor += advance;
    }
}

fn fill_block(frame: &mut Frame, x: i32, y: i32, rgb: [u8; 3]) {
    for dy in 0..LABEL_SCALE {
        for dx in 0..LABEL_SCALE {
            frame.put_rgb(x + dx, y + dy, rgb);
        }
    }
}

/// 5x7 glyph rows, top to bottom, most significant bit leftmost.
fn glyph(c: char) -> Option<[u8; 7]> {
    let rows = match c.to_ascii_uppercase() {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b11011, 0b10001],
        'X' => [0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b01010, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        ':' => [0b00000, 0b01100, 0b01100, 0b00000, 0b01100, 0b01100, 0b00000],
        '-' => [0b00000, 0b00000, 0b00000, 0b01110, 0b00000, 0b00000, 0b00000],
        '_' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b11111],
        '%' => [0b11001, 0b11010, 0b00010, 0b00100, 0b01000, 0b01011, 0b10011],
        ' ' => [0b00000; 7],
        _ => return None,
    };
    Some(rows)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
