/// Axis-aligned min/max corners of every decoded position.
///
/// A fresh value is "unset": both corners sit at the origin and
/// [`is_set`](Self::is_set) reports `false` until a point has been folded in.
/// Center, size and the derived anchor points are pure functions of the two
/// corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingExtents {
    min: [f32; 3],
    max: [f32; 3],
    set: bool,
}

impl BoundingExtents {
    pub fn unset() -> Self {
        Self {
            min: [0.0; 3],
            max: [0.0; 3],
            set: false,
        }
    }

    pub fn from_min_max(min: [f32; 3], max: [f32; 3]) -> Self {
        Self {
            min,
            max,
            set: true,
        }
    }

    pub fn is_set(&self) -> bool {
        self.set
    }

    pub fn min(&self) -> [f32; 3] {
        self.min
    }

    pub fn max(&self) -> [f32; 3] {
        self.max
    }

    /// Fold one point into the running extents. Points with a non-finite
    /// component are ignored.
    pub fn expand_with_point(&mut self, point: [f32; 3]) {
        if !point.iter().all(|v| v.is_finite()) {
            return;
        }

        if !self.set {
            self.min = point;
            self.max = point;
            self.set = true;
            return;
        }

        for (axis, &val) in point.iter().enumerate() {
            self.min[axis] = self.min[axis].min(val);
            self.max[axis] = self.max[axis].max(val);
        }
    }

    pub fn center(&self) -> [f32; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }

    pub fn size(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// Center of the bottom face (y is up).
    pub fn bottom_center(&self) -> [f32; 3] {
        let c = self.center();
        [c[0], self.min[1], c[2]]
    }

    /// Center projected onto the `y = 0` plane.
    pub fn y_side_center(&self) -> [f32; 3] {
        let c = self.center();
        [c[0], 0.0, c[2]]
    }

    pub fn largest_span(&self) -> f32 {
        let s = self.size();
        s[0].max(s[1]).max(s[2])
    }

    pub fn contains(&self, point: &[f32; 3]) -> bool {
        if !self.set || !point.iter().all(|v| v.is_finite()) {
            return false;
        }

        (0..3).all(|axis| point[axis] >= self.min[axis] && point[axis] <= self.max[axis])
    }

    pub fn from_xyz(x: &[f32], y: &[f32], z: &[f32]) -> Self {
        let n = x.len().min(y.len()).min(z.len());
        let mut extents = Self::unset();
        for i in 0..n {
            extents.expand_with_point([x[i], y[i], z[i]]);
        }
        extents
    }
}

impl Default for BoundingExtents {
    fn default() -> Self {
        Self::unset()
    }
}
