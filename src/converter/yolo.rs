use crate::parser::BoundingBox;
use std::fmt;

/// One row of a YOLO label file.
///
/// The "center" is computed as `(left + width) / 2` and `(top + height) / 2`,
/// which is only the true box center when the box touches the origin. Label
/// files produced by earlier exports use this formula, so it is kept as-is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloLine {
    pub class_id: i64,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

impl YoloLine {
    pub fn from_bbox(
        class_id: i64,
        bbox: &BoundingBox,
        image_width: u32,
        image_height: u32,
    ) -> Self {
        let image_width = f64::from(image_width);
        let image_height = f64::from(image_height);
        let xc = (bbox.left + bbox.width) / 2.0;
        let yc = (bbox.top + bbox.height) / 2.0;

        Self {
            class_id,
            x_center: xc / image_width,
            y_center: yc / image_height,
            width: bbox.width / image_width,
            height: bbox.height / image_height,
        }
    }
}

impl fmt::Display for YoloLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.class_id,
            Coord(self.x_center),
            Coord(self.y_center),
            Coord(self.width),
            Coord(self.height)
        )
    }
}

/// Shortest round-trip float in the layout existing label files use:
/// `1.0` rather than `1`, and `5e-05` below 1e-4 or from 1e16 up.
struct Coord(f64);

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.0;
        let magnitude = value.abs();
        if !value.is_finite() {
            write!(f, "{}", value)
        } else if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
            let scientific = format!("{:e}", value);
            match scientific.split_once('e') {
                Some((mantissa, exponent)) => {
                    let (sign, digits) = match exponent.strip_prefix('-') {
                        Some(digits) => ('-', digits),
                        None => ('+', exponent),
                    };
                    write!(f, "{}e{}{:0>2}", mantissa, sign, digits)
                }
                None => f.write_str(&scientific),
            }
        } else if value.fract() == 0.0 {
            write!(f, "{:.1}", value)
        } else {
            write!(f, "{}", value)
        }
    }
}

/// Newline separated, no trailing newline.
pub fn render_label_file(lines: &[YoloLine]) -> String {
    lines
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
