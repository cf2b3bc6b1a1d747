use crate::BoundingExtents;

/// A decoded point cloud: parallel position and color columns plus the
/// extents computed while decoding.
///
/// Every column has the same length. Colors are normalized to `0.0..=1.0`
/// and default to white when the source carries no color fields.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub z: Vec<f32>,
    pub colors: Colors,
    pub extents: BoundingExtents,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Colors {
    pub r: Vec<f32>,
    pub g: Vec<f32>,
    pub b: Vec<f32>,
}

impl Colors {
    pub fn white(n: usize) -> Self {
        Self {
            r: vec![1.0; n],
            g: vec![1.0; n],
            b: vec![1.0; n],
        }
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            r: Vec::with_capacity(n),
            g: Vec::with_capacity(n),
            b: Vec::with_capacity(n),
        }
    }

    /// Append an 8-bit-per-channel color, normalizing it.
    pub fn push_rgb8(&mut self, rgb: [u8; 3]) {
        self.r.push(f32::from(rgb[0]) / 255.0);
        self.g.push(f32::from(rgb[1]) / 255.0);
        self.b.push(f32::from(rgb[2]) / 255.0);
    }

    pub fn len(&self) -> usize {
        self.r.len()
    }

    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }
}

impl PointCloud {
    pub fn new() -> Self {
        Self {
            x: Vec::new(),
            y: Vec::new(),
            z: Vec::new(),
            colors: Colors::default(),
            extents: BoundingExtents::unset(),
        }
    }

    /// Build a white cloud from position columns, computing extents.
    pub fn from_xyz(x: Vec<f32>, y: Vec<f32>, z: Vec<f32>) -> Self {
        let colors = Colors::white(x.len());
        Self::from_xyz_rgb(x, y, z, colors)
    }

    pub fn from_xyz_rgb(x: Vec<f32>, y: Vec<f32>, z: Vec<f32>, colors: Colors) -> Self {
        assert_eq!(x.len(), y.len(), "x and y must have same length");
        assert_eq!(x.len(), z.len(), "x and z must have same length");
        assert_eq!(
            x.len(),
            colors.len(),
            "colors must have one entry per point"
        );
        assert_eq!(colors.r.len(), colors.g.len(), "r and g must have same length");
        assert_eq!(colors.r.len(), colors.b.len(), "r and b must have same length");

        let extents = BoundingExtents::from_xyz(&x, &y, &z);
        Self {
            x,
            y,
            z,
            colors,
            extents,
        }
    }

    pub fn len(&self) -> usize {
        debug_assert_eq!(self.x.len(), self.y.len());
        debug_assert_eq!(self.x.len(), self.z.len());
        debug_assert_eq!(self.x.len(), self.colors.len());
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn point(&self, i: usize) -> [f32; 3] {
        [self.x[i], self.y[i], self.z[i]]
    }

    pub fn color(&self, i: usize) -> [f32; 3] {
        [self.colors.r[i], self.colors.g[i], self.colors.b[i]]
    }

    pub fn iter_points(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .zip(&self.z)
            .map(|((x, y), z)| [*x, *y, *z])
    }

    /// Interleaved `xyz` positions, the layout a renderer uploads.
    pub fn to_array(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.len() * 3);
        for i in 0..self.len() {
            out.push(self.x[i]);
            out.push(self.y[i]);
            out.push(self.z[i]);
        }
        out
    }

    /// Interleaved normalized `rgb` colors, parallel to [`to_array`](Self::to_array).
    pub fn colors_to_array(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.len() * 3);
        for i in 0..self.len() {
            out.push(self.colors.r[i]);
            out.push(self.colors.g[i]);
            out.push(self.colors.b[i]);
        }
        out
    }
}

impl Default for PointCloud {
    fn default() -> Self {
        Self::new()
    }
}
