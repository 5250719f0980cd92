use crate::params::Dimensions;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DomainError {
    #[error("{axis} range [{min}, {max}] must be finite with min < max")]
    InvalidRange {
        axis: &'static str,
        min: f64,
        max: f64,
    },
}

/// Closed interval along one axis of computation space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn half_span(&self) -> f64 {
        self.span() * 0.5
    }

    pub fn center(&self) -> f64 {
        self.min + self.half_span()
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min < self.max
    }

    fn rescaled(&self, center: f64, scale: f64) -> Self {
        let half = self.half_span() * scale;
        Self::new(center - half, center + half)
    }

    fn lerp(&self, t: f64) -> f64 {
        self.min + t * self.span()
    }
}

/// Rectangular region of computation space mapped onto the buffers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    pub x: AxisRange,
    pub y: AxisRange,
}

impl Domain {
    pub fn new(x: [f64; 2], y: [f64; 2]) -> Result<Self, DomainError> {
        let domain = Self {
            x: AxisRange::new(x[0], x[1]),
            y: AxisRange::new(y[0], y[1]),
        };
        domain.validate()?;
        Ok(domain)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        for (axis, range) in [("x", self.x), ("y", self.y)] {
            if !range.is_valid() {
                return Err(DomainError::InvalidRange {
                    axis,
                    min: range.min,
                    max: range.max,
                });
            }
        }
        Ok(())
    }

    pub fn contains(&self, point: [f64; 2]) -> bool {
        self.x.contains(point[0]) && self.y.contains(point[1])
    }

    /// Maps a pixel position (top-left origin, the same convention the
    /// fragment stage sees) into domain coordinates.
    pub fn point_at(&self, pixel: [f64; 2], dimensions: Dimensions) -> [f64; 2] {
        let width = f64::from(dimensions.width.max(1));
        let height = f64::from(dimensions.height.max(1));
        [
            self.x.lerp(pixel[0] / width),
            self.y.lerp(pixel[1] / height),
        ]
    }
}

impl Default for Domain {
    fn default() -> Self {
        Self {
            x: AxisRange::new(-2.0, 2.0),
            y: AxisRange::new(-2.0, 2.0),
        }
    }
}

/// How a zoom target becomes the center of the remapped domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecenterMode {
    /// Each axis is recentered on its own coordinate of the target.
    #[default]
    PerAxis,
    /// Both axes are recentered on the target's x coordinate. Matches the
    /// behaviour of the browser prototype and is kept for comparison runs.
    SharedX,
}

/// Current domain plus the edge-triggered reset signal consumed by compute.
#[derive(Debug, Clone)]
pub struct ViewportState {
    domain: Domain,
    reset_pending: bool,
    recenter: RecenterMode,
}

impl ViewportState {
    /// The reset flag starts raised so the very first compute pass seeds the
    /// buffers instead of iterating on uninitialised texels.
    pub fn new(domain: Domain, recenter: RecenterMode) -> Self {
        Self {
            domain,
            reset_pending: true,
            recenter,
        }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn reset_pending(&self) -> bool {
        self.reset_pending
    }

    /// Zooms around `point` by `scale` (`< 1` zooms in, `> 1` zooms out).
    ///
    /// Returns `false` and leaves the state untouched when the point lies
    /// outside the current domain, when the inputs are not finite, or when
    /// the result would collapse an axis.
    pub fn remap(&mut self, point: [f64; 2], scale: f64) -> bool {
        if !point.iter().all(|value| value.is_finite()) || !self.domain.contains(point) {
            return false;
        }
        if !scale.is_finite() || scale <= 0.0 {
            return false;
        }

        let center = match self.recenter {
            RecenterMode::PerAxis => point,
            RecenterMode::SharedX => [point[0], point[0]],
        };
        let candidate = Domain {
            x: self.domain.x.rescaled(center[0], scale),
            y: self.domain.y.rescaled(center[1], scale),
        };
        if candidate.validate().is_err() {
            return false;
        }

        self.domain = candidate;
        self.reset_pending = true;
        true
    }

    pub(crate) fn clear_reset(&mut self) {
        self.reset_pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> ViewportState {
        ViewportState::new(Domain::default(), RecenterMode::PerAxis)
    }

    #[test]
    fn rejects_point_outside_domain() {
        let mut viewport = square();
        viewport.clear_reset();
        assert!(!viewport.remap([3.0, 0.0], 0.5));
        assert_eq!(viewport.domain(), Domain::default());
        assert!(!viewport.reset_pending());
    }

    #[test]
    fn zooms_in_around_origin() {
        let mut viewport = square();
        assert!(viewport.remap([0.0, 0.0], 0.5));
        assert_eq!(
            viewport.domain(),
            Domain::new([-1.0, 1.0], [-1.0, 1.0]).unwrap()
        );
        assert!(viewport.reset_pending());
    }

    #[test]
    fn zoom_out_widens_domain() {
        let mut viewport = square();
        assert!(viewport.remap([1.0, -1.0], 2.0));
        let domain = viewport.domain();
        assert_eq!(domain.x, AxisRange::new(-3.0, 5.0));
        assert_eq!(domain.y, AxisRange::new(-5.0, 3.0));
    }

    #[test]
    fn boundary_points_are_accepted() {
        let mut viewport = square();
        assert!(viewport.remap([2.0, -2.0], 0.5));
        assert_eq!(viewport.domain().x.center(), 2.0);
        assert_eq!(viewport.domain().y.center(), -2.0);
    }

    #[test]
    fn shared_x_recenters_both_axes_on_x() {
        let mut viewport = ViewportState::new(Domain::default(), RecenterMode::SharedX);
        assert!(viewport.remap([1.0, -1.0], 0.5));
        let domain = viewport.domain();
        assert_eq!(domain.x, AxisRange::new(0.0, 2.0));
        assert_eq!(domain.y, AxisRange::new(0.0, 2.0));
    }

    #[test]
    fn rejects_degenerate_scale() {
        let mut viewport = square();
        assert!(!viewport.remap([0.0, 0.0], 0.0));
        assert!(!viewport.remap([0.0, 0.0], -1.0));
        assert!(!viewport.remap([0.0, 0.0], f64::NAN));
        assert!(!viewport.remap([f64::NAN, 0.0], 0.5));
        assert_eq!(viewport.domain(), Domain::default());
    }

    #[test]
    fn rejects_zoom_that_collapses_an_axis() {
        let mut viewport = square();
        // Half-span 2e-17 vanishes next to a center of 2.0 in f64.
        assert!(!viewport.remap([2.0, 2.0], 1e-17));
        assert_eq!(viewport.domain(), Domain::default());
    }

    #[test]
    fn domain_new_validates_ranges() {
        assert!(Domain::new([1.0, 1.0], [-1.0, 1.0]).is_err());
        assert!(Domain::new([-1.0, 1.0], [2.0, f64::INFINITY]).is_err());
        assert!(Domain::new([-1.5, 0.5], [-1.0, 1.0]).is_ok());
    }

    #[test]
    fn point_at_maps_pixel_corners() {
        let domain = Domain::default();
        let dims = Dimensions::new(1000, 500);
        assert_eq!(domain.point_at([0.0, 0.0], dims), [-2.0, -2.0]);
        assert_eq!(domain.point_at([500.0, 250.0], dims), [0.0, 0.0]);
        assert_eq!(domain.point_at([1000.0, 500.0], dims), [2.0, 2.0]);
    }
}
