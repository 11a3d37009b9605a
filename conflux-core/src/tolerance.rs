//! Distance and angle thresholds shared by conflation and commands.

/// Default snapping distance in metres.
pub const DEFAULT_SNAP_DISTANCE_M: f64 = 5.0;

/// Default maximum angle in degrees between segments treated as collinear.
pub const DEFAULT_MAX_ANGLE_DEG: f64 = 10.0;

/// Thresholds under which two geometries are considered the same place.
///
/// # Examples
///
/// ```
/// use conflux_core::Tolerance;
///
/// let tolerance = Tolerance::default().with_snap_distance_m(2.5);
/// assert_eq!(tolerance.snap_distance_m, 2.5);
/// assert_eq!(tolerance.max_angle_deg, 10.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tolerance {
    /// Largest distance in metres at which points are snapped together.
    pub snap_distance_m: f64,
    /// Largest undirected angle in degrees between matching segments.
    pub max_angle_deg: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            snap_distance_m: DEFAULT_SNAP_DISTANCE_M,
            max_angle_deg: DEFAULT_MAX_ANGLE_DEG,
        }
    }
}

impl Tolerance {
    /// Set the snapping distance.
    #[must_use]
    pub const fn with_snap_distance_m(mut self, metres: f64) -> Self {
        self.snap_distance_m = metres;
        self
    }

    /// Set the collinearity angle.
    #[must_use]
    pub const fn with_max_angle_deg(mut self, degrees: f64) -> Self {
        self.max_angle_deg = degrees;
        self
    }

    /// Return `true` when `distance_m` is within the snapping distance.
    #[must_use]
    pub fn snaps(&self, distance_m: f64) -> bool {
        distance_m <= self.snap_distance_m
    }

    /// Return `true` when `angle_deg` is within the collinearity angle.
    #[must_use]
    pub fn aligned(&self, angle_deg: f64) -> bool {
        angle_deg <= self.max_angle_deg
    }
}
