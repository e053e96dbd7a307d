// inspection-report: proportional image fitting

use crate::error::{ReportError, ReportResult};
use crate::geometry::Rect;

/// Size and centring offset of a source scaled into a bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitResult {
    pub width: f32,
    pub height: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl FitResult {
    /// The fitted rect centred inside `bounds`.
    pub fn place_in(&self, bounds: Rect) -> Rect {
        Rect::new(
            bounds.x + self.offset_x,
            bounds.y + self.offset_y,
            self.width,
            self.height,
        )
    }
}

/// Scale `source` into `max` preserving the source aspect ratio.
pub fn fit(
    source_width: f32,
    source_height: f32,
    max_width: f32,
    max_height: f32,
) -> ReportResult<FitResult> {
    for (label, value) in [
        ("source width", source_width),
        ("source height", source_height),
        ("max width", max_width),
        ("max height", max_height),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(ReportError::InvalidDimension(format!(
                "{} must be positive, got {}",
                label, value
            )));
        }
    }

    let aspect_ratio = source_width / source_height;
    let (width, height) = if max_width / max_height > aspect_ratio {
        // Height-constrained
        ((max_height * aspect_ratio).min(max_width), max_height)
    } else {
        // Width-constrained
        (max_width, (max_width / aspect_ratio).min(max_height))
    };

    Ok(FitResult {
        width,
        height,
        offset_x: (max_width - width) / 2.0,
        offset_y: (max_height - height) / 2.0,
    })
}

/// Fit into a rect and return the placed rect.
pub fn fit_into(source_width: f32, source_height: f32, bounds: Rect) -> ReportResult<Rect> {
    fit(source_width, source_height, bounds.width, bounds.height).map(|f| f.place_in(bounds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_source_in_square_box_is_width_bound() {
        let r = fit(100.0, 50.0, 40.0, 40.0).unwrap();
        assert_eq!(r.width, 40.0);
        assert_eq!(r.height, 20.0);
        assert_eq!(r.offset_x, 0.0);
        assert_eq!(r.offset_y, 10.0);
    }

    #[test]
    fn tall_source_in_square_box_is_height_bound() {
        let r = fit(40.0, 100.0, 40.0, 40.0).unwrap();
        assert_eq!(r.height, 40.0);
        assert!((r.width - 16.0).abs() < 1e-5);
        assert!((r.offset_x - 12.0).abs() < 1e-5);
        assert_eq!(r.offset_y, 0.0);
    }

    #[test]
    fn matching_aspect_fills_box() {
        let r = fit(300.0, 75.0, 60.0, 15.0).unwrap();
        assert_eq!((r.width, r.height), (60.0, 15.0));
        assert_eq!((r.offset_x, r.offset_y), (0.0, 0.0));
    }

    #[test]
    fn rejects_non_positive_input() {
        assert!(matches!(
            fit(0.0, 10.0, 10.0, 10.0),
            Err(ReportError::InvalidDimension(_))
        ));
        assert!(matches!(
            fit(10.0, 10.0, -1.0, 10.0),
            Err(ReportError::InvalidDimension(_))
        ));
        assert!(matches!(
            fit(10.0, f32::NAN, 10.0, 10.0),
            Err(ReportError::InvalidDimension(_))
        ));
    }

    #[test]
    fn place_in_offsets_from_box_origin() {
        let placed = fit_into(40.0, 100.0, Rect::new(100.0, 50.0, 40.0, 40.0)).unwrap();
        assert!((placed.x - 112.0).abs() < 1e-4);
        assert_eq!(placed.y, 50.0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: the fitted size never exceeds the box
        #[test]
        fn fit_stays_inside_box(
            sw in 0.01f32..5000.0,
            sh in 0.01f32..5000.0,
            mw in 0.01f32..1000.0,
            mh in 0.01f32..1000.0,
        ) {
            let r = fit(sw, sh, mw, mh).unwrap();
            prop_assert!(r.width <= mw);
            prop_assert!(r.height <= mh);
            prop_assert!(r.offset_x >= 0.0);
            prop_assert!(r.offset_y >= 0.0);
        }

        /// Property: the fitted aspect ratio matches the source
        #[test]
        fn fit_preserves_aspect_ratio(
            sw in 1.0f32..4000.0,
            sh in 1.0f32..4000.0,
            mw in 1.0f32..500.0,
            mh in 1.0f32..500.0,
        ) {
            let r = fit(sw, sh, mw, mh).unwrap();
            let source = (sw as f64) / (sh as f64);
            let fitted = (r.width as f64) / (r.height as f64);
            prop_assert!(((fitted - source) / source).abs() < 1e-5);
        }

        /// Property: exactly one dimension touches the box
        #[test]
        fn fit_binds_one_side(
            sw in 1.0f32..4000.0,
            sh in 1.0f32..4000.0,
            mw in 1.0f32..500.0,
            mh in 1.0f32..500.0,
        ) {
            let r = fit(sw, sh, mw, mh).unwrap();
            prop_assert!(r.width == mw || r.height == mh);
        }
    }
}
