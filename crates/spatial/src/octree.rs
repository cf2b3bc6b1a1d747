use nalgebra::Point3;
use plypick_core::{CancelFlag, Cancelled, LoadStage, PointCloud, ProgressSink, Ray};
use tracing::{debug, warn};

/// Tuning for [`PointOctree`] construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctreeParams {
    /// Points a leaf holds before it splits into octants.
    pub node_capacity: usize,
    /// Nodes whose octants would be smaller than this never split.
    pub min_node_size: f32,
}

impl Default for OctreeParams {
    fn default() -> Self {
        Self {
            node_capacity: 8,
            min_node_size: 1.0,
        }
    }
}

/// A point stored in the octree, with its index into the source cloud.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub position: [f32; 3],
}

#[derive(Debug, Clone)]
struct Node {
    center: [f32; 3],
    size: f32,
    points: Vec<Neighbor>,
    children: Option<Box<[Node; 8]>>,
}

impl Node {
    fn new(center: [f32; 3], size: f32) -> Self {
        Self {
            center,
            size,
            points: Vec::new(),
            children: None,
        }
    }

    fn encapsulates(&self, p: &[f32; 3]) -> bool {
        let half = self.size * 0.5;
        (0..3).all(|axis| (p[axis] - self.center[axis]).abs() <= half)
    }

    /// Octant index: bit 0 set for +x, bit 1 for +y, bit 2 for +z.
    fn octant_of(&self, p: &[f32; 3]) -> usize {
        usize::from(p[0] > self.center[0])
            | usize::from(p[1] > self.center[1]) << 1
            | usize::from(p[2] > self.center[2]) << 2
    }

    fn octant_center(center: [f32; 3], offset: f32, octant: usize) -> [f32; 3] {
        let sign = |bit: usize| if octant & bit != 0 { offset } else { -offset };
        [center[0] + sign(1), center[1] + sign(2), center[2] + sign(4)]
    }

    /// Splitting stops once octants would fall below `min_node_size` or
    /// the octant offset no longer moves the center at this magnitude.
    fn can_split(&self, params: &OctreeParams) -> bool {
        let half = self.size * 0.5;
        let quarter = self.size * 0.25;
        half.is_finite()
            && half >= params.min_node_size
            && self
                .center
                .iter()
                .all(|&c| c + quarter != c && c - quarter != c)
    }

    fn split(&mut self) {
        let quarter = self.size * 0.25;
        let half = self.size * 0.5;
        let center = self.center;
        self.children = Some(Box::new(std::array::from_fn(|octant| {
            Node::new(Self::octant_center(center, quarter, octant), half)
        })));
    }

    fn insert(&mut self, entry: Neighbor, params: &OctreeParams) {
        if self.children.is_none() {
            if self.points.len() < params.node_capacity || !self.can_split(params) {
                self.points.push(entry);
                return;
            }

            self.split();
            for existing in std::mem::take(&mut self.points) {
                self.insert_into_child(existing, params);
            }
        }

        self.insert_into_child(entry, params);
    }

    fn insert_into_child(&mut self, entry: Neighbor, params: &OctreeParams) {
        let octant = self.octant_of(&entry.position);
        if let Some(children) = self.children.as_mut() {
            children[octant].insert(entry, params);
        }
    }

    fn is_empty_subtree(&self) -> bool {
        self.points.is_empty()
            && self
                .children
                .as_ref()
                .map_or(true, |c| c.iter().all(Node::is_empty_subtree))
    }

    fn children(&self) -> impl DoubleEndedIterator<Item = &Node> {
        self.children.iter().flat_map(|c| c.iter())
    }
}

/// A point octree over one [`PointCloud`], built once and then queried
/// read-only.
///
/// The root cube is centered on the coordinate origin with an edge equal to
/// the cloud's largest extent. Points outside it grow the root by doubling
/// towards them, the old root becoming one octant of the new one.
#[derive(Debug, Clone)]
pub struct PointOctree {
    root: Node,
    params: OctreeParams,
    num_points: usize,
}

impl PointOctree {
    pub fn build(cloud: &PointCloud, params: OctreeParams) -> Self {
        let mut tree = Self::empty_for(cloud, params);
        let mut skipped = 0usize;
        for (index, position) in cloud.iter_points().enumerate() {
            if !tree.insert(index, position) {
                skipped += 1;
            }
        }
        tree.log_built(skipped);
        tree
    }

    /// Build while reporting [`LoadStage::CalculatingOctree`] progress and
    /// polling `cancel` once per point.
    pub fn build_with(
        cloud: &PointCloud,
        params: OctreeParams,
        progress: &dyn ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<Self, Cancelled> {
        let mut tree = Self::empty_for(cloud, params);
        let n = cloud.len();
        let mut skipped = 0usize;
        for (index, position) in cloud.iter_points().enumerate() {
            cancel.check()?;
            if !tree.insert(index, position) {
                skipped += 1;
            }
            progress.report(LoadStage::CalculatingOctree, (index + 1) as f32 / n as f32);
        }
        tree.log_built(skipped);
        Ok(tree)
    }

    fn empty_for(cloud: &PointCloud, mut params: OctreeParams) -> Self {
        params.node_capacity = params.node_capacity.max(1);
        if !(params.min_node_size.is_finite() && params.min_node_size > 0.0) {
            params.min_node_size = OctreeParams::default().min_node_size;
        }

        let span = cloud.extents.largest_span();
        let root_size = if span.is_finite() && span > 0.0 {
            span
        } else {
            params.min_node_size
        };
        params.min_node_size = params.min_node_size.min(root_size);

        Self {
            root: Node::new([0.0; 3], root_size),
            params,
            num_points: 0,
        }
    }

    fn log_built(&self, skipped: usize) {
        if skipped > 0 {
            warn!(skipped, "octree skipped points with non-finite or out-of-range coordinates");
        }
        debug!(
            points = self.num_points,
            nodes = self.node_count(),
            depth = self.depth(),
            root_size = self.root.size,
            "built point octree"
        );
    }

    fn insert(&mut self, index: usize, position: [f32; 3]) -> bool {
        if !position.iter().all(|v| v.is_finite()) {
            return false;
        }

        while !self.root.encapsulates(&position) {
            // a root that cannot double again cannot hold this point
            if !(self.root.size * 2.0).is_finite() {
                return false;
            }
            self.grow_towards(&position);
        }
        self.root.insert(Neighbor { index, position }, &self.params);
        self.num_points += 1;
        true
    }

    fn grow_towards(&mut self, target: &[f32; 3]) {
        let old_size = self.root.size;
        let half = old_size * 0.5;
        let old_center = self.root.center;
        let mut new_center = old_center;
        for axis in 0..3 {
            new_center[axis] += if target[axis] >= old_center[axis] { half } else { -half };
        }

        let mut new_root = Node::new(new_center, old_size * 2.0);
        let old_root = std::mem::replace(&mut self.root, Node::new(new_center, 0.0));
        if !old_root.is_empty_subtree() {
            let slot = new_root.octant_of(&old_center);
            let mut old_root = Some(old_root);
            new_root.children = Some(Box::new(std::array::from_fn(|octant| {
                let reused = if octant == slot { old_root.take() } else { None };
                reused.unwrap_or_else(|| {
                    Node::new(Node::octant_center(new_center, half, octant), old_size)
                })
            })));
        }
        self.root = new_root;
    }

    pub fn len(&self) -> usize {
        self.num_points
    }

    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    pub fn root_center(&self) -> [f32; 3] {
        self.root.center
    }

    /// Edge length of the root cube.
    pub fn root_size(&self) -> f32 {
        self.root.size
    }

    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children());
        }
        count
    }

    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(&self.root, 1usize)];
        while let Some((node, d)) = stack.pop() {
            max_depth = max_depth.max(d);
            stack.extend(node.children().map(|c| (c, d + 1)));
        }
        max_depth
    }

    /// Points lying within `radius` of the line carrying `ray`.
    ///
    /// Only nodes whose cube, grown by `radius`, is hit by the ray are
    /// visited, so this is an approximate cylinder query around the forward
    /// half of the ray. Results come in traversal order.
    ///
    /// Returns empty if `radius` is negative or not finite.
    pub fn nearby(&self, ray: &Ray, radius: f32) -> Vec<Neighbor> {
        if self.is_empty() || !radius.is_finite() || radius < 0.0 {
            return Vec::new();
        }

        let radius_sq = radius * radius;
        let mut out = Vec::new();
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            if !ray_hits_cube(ray, &node.center, node.size * 0.5 + radius) {
                continue;
            }
            for p in &node.points {
                if ray.squared_distance_to_line(&Point3::from(p.position)) <= radius_sq {
                    out.push(*p);
                }
            }
            // reversed so octant 0 is visited first
            stack.extend(node.children().rev());
        }
        out
    }

    /// Points within `radius` (Euclidean) of `query`.
    pub fn nearby_point(&self, query: &[f32; 3], radius: f32) -> Vec<Neighbor> {
        if self.is_empty()
            || !radius.is_finite()
            || radius < 0.0
            || !query.iter().all(|v| v.is_finite())
        {
            return Vec::new();
        }

        let radius_sq = radius * radius;
        let mut out = Vec::new();
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            let reach = node.size * 0.5 + radius;
            if (0..3).any(|axis| (query[axis] - node.center[axis]).abs() > reach) {
                continue;
            }
            for p in &node.points {
                let d2: f32 = (0..3).map(|axis| (p.position[axis] - query[axis]).powi(2)).sum();
                if d2 <= radius_sq {
                    out.push(*p);
                }
            }
            stack.extend(node.children().rev());
        }
        out
    }
}

/// Slab test of a ray against an axis-aligned cube. A ray starting inside
/// the cube hits it; intersections behind the origin do not count.
fn ray_hits_cube(ray: &Ray, center: &[f32; 3], half: f32) -> bool {
    let dir = ray.direction();
    let mut t_min = 0.0f32;
    let mut t_max = f32::INFINITY;

    for axis in 0..3 {
        let o = ray.origin[axis];
        let d = dir[axis];
        let lo = center[axis] - half;
        let hi = center[axis] + half;

        if d.abs() <= f32::EPSILON {
            if o < lo || o > hi {
                return false;
            }
            continue;
        }

        let inv = 1.0 / d;
        let (t0, t1) = {
            let a = (lo - o) * inv;
            let b = (hi - o) * inv;
            if a <= b {
                (a, b)
            } else {
                (b, a)
            }
        };
        t_min = t_min.max(t0);
        t_max = t_max.min(t1);
        if t_min > t_max {
            return false;
        }
    }

    true
}
