//! Barnes-Hut quadtree over the ground plane.
//!
//! The quadtree recursively subdivides the `(x, z)` plane and computes the
//! center of mass of each cell. Distant cells are approximated as single
//! charges, reducing the O(n²) many-body force to O(n log n). The same
//! tree answers the radius queries of the collision force.

use rand::Rng;

/// A point on the ground plane.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlanarPoint {
    pub x: f32,
    pub z: f32,
}

impl PlanarPoint {
    pub fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }
}

/// One cell of the tree.
#[derive(Debug, Clone, Default)]
struct Cell {
    center_x: f32,
    center_z: f32,
    /// Number of points below this cell.
    mass: f32,
    /// Lower corner of the cell square.
    x: f32,
    z: f32,
    width: f32,
    /// Children in nw, ne, sw, se order.
    children: [Option<usize>; 4],
    /// Point indices, only populated on leaves.
    points: Vec<usize>,
}

impl Cell {
    fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }
}

/// Parameters of the many-body force.
#[derive(Debug, Clone, Copy)]
pub struct ChargeParams {
    /// Charge per point (negative repels).
    pub strength: f32,
    /// Barnes-Hut accuracy criterion.
    pub theta: f32,
    /// Interactions beyond this distance are ignored.
    pub distance_max: f32,
    /// Distances below this are softened.
    pub distance_min: f32,
}

/// A Barnes-Hut quadtree for 2D spatial partitioning.
#[derive(Debug)]
pub struct QuadTree {
    cells: Vec<Cell>,
}

impl QuadTree {
    /// Build a quadtree from ground-plane positions.
    ///
    /// `max_depth` bounds subdivision when many points coincide.
    pub fn build(positions: &[PlanarPoint], max_depth: usize) -> Self {
        if positions.is_empty() {
            return Self {
                cells: vec![Cell::default()],
            };
        }

        let mut min_x = f32::MAX;
        let mut min_z = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_z = f32::MIN;

        for pos in positions {
            min_x = min_x.min(pos.x);
            min_z = min_z.min(pos.z);
            max_x = max_x.max(pos.x);
            max_z = max_z.max(pos.z);
        }

        let padding = ((max_x - min_x).max(max_z - min_z) * 0.1).max(1.0);
        min_x -= padding;
        min_z -= padding;
        max_x += padding;
        max_z += padding;

        // Square cells keep the theta criterion isotropic.
        let width = (max_x - min_x).max(max_z - min_z);
        let origin_x = (min_x + max_x) / 2.0 - width / 2.0;
        let origin_z = (min_z + max_z) / 2.0 - width / 2.0;

        let mut cells = Vec::with_capacity(positions.len() * 2);
        let mut builder = TreeBuilder {
            positions,
            cells: &mut cells,
            max_depth,
        };
        let indices: Vec<usize> = (0..positions.len()).collect();
        builder.build_cell(&indices, origin_x, origin_z, width, 0);

        Self { cells }
    }

    /// Number of cells, including the root.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Total mass at the root.
    pub fn total_mass(&self) -> f32 {
        self.cells.first().map_or(0.0, |c| c.mass)
    }

    /// Velocity change on point `index` from every other point's charge.
    ///
    /// Coincident points get a tiny random nudge from `rng` so they can
    /// separate deterministically for a seeded generator.
    pub fn charge_on<R: Rng + ?Sized>(
        &self,
        index: usize,
        positions: &[PlanarPoint],
        params: ChargeParams,
        alpha: f32,
        rng: &mut R,
    ) -> (f32, f32) {
        let Some(point) = positions.get(index) else {
            return (0.0, 0.0);
        };
        if self.total_mass() == 0.0 {
            return (0.0, 0.0);
        }

        let theta2 = params.theta * params.theta;
        let max2 = params.distance_max * params.distance_max;
        let min2 = params.distance_min * params.distance_min;

        let mut dv = (0.0_f32, 0.0_f32);
        let mut stack = vec![0usize];

        while let Some(ci) = stack.pop() {
            let cell = &self.cells[ci];
            let dx = cell.center_x - point.x;
            let dz = cell.center_z - point.z;
            let mut l = dx * dx + dz * dz;

            // Far enough: treat the cell as one charge.
            if !cell.is_leaf() && cell.width * cell.width / theta2 < l {
                if l < max2 {
                    if l < min2 {
                        l = (min2 * l).sqrt();
                    }
                    let k = params.strength * cell.mass * alpha / l;
                    dv.0 += dx * k;
                    dv.1 += dz * k;
                }
                continue;
            }

            if cell.is_leaf() {
                for &other in &cell.points {
                    if other == index {
                        continue;
                    }
                    let mut dx = positions[other].x - point.x;
                    let mut dz = positions[other].z - point.z;
                    if dx == 0.0 {
                        dx = jiggle(rng);
                    }
                    if dz == 0.0 {
                        dz = jiggle(rng);
                    }
                    let mut l = dx * dx + dz * dz;
                    if l >= max2 || l == 0.0 {
                        continue;
                    }
                    if l < min2 {
                        l = (min2 * l).sqrt();
                    }
                    let k = params.strength * alpha / l;
                    dv.0 += dx * k;
                    dv.1 += dz * k;
                }
                continue;
            }

            stack.extend(cell.children.iter().flatten());
        }

        dv
    }

    /// Indices of points strictly closer than `radius` to `center`.
    ///
    /// Cells whose square lies farther than `radius` are skipped whole.
    pub fn within(
        &self,
        center: PlanarPoint,
        radius: f32,
        positions: &[PlanarPoint],
    ) -> Vec<usize> {
        let r2 = radius * radius;
        let mut found = Vec::new();
        if self.total_mass() == 0.0 {
            return found;
        }

        let mut stack = vec![0usize];
        while let Some(ci) = stack.pop() {
            let cell = &self.cells[ci];
            let dx = (cell.x - center.x).max(center.x - (cell.x + cell.width)).max(0.0);
            let dz = (cell.z - center.z).max(center.z - (cell.z + cell.width)).max(0.0);
            if dx * dx + dz * dz >= r2 {
                continue;
            }
            if cell.is_leaf() {
                for &i in &cell.points {
                    let px = positions[i].x - center.x;
                    let pz = positions[i].z - center.z;
                    if px * px + pz * pz < r2 {
                        found.push(i);
                    }
                }
                continue;
            }
            stack.extend(cell.children.iter().flatten());
        }
        found
    }
}

/// Tiny random offset used to separate coincident points.
pub fn jiggle<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    (rng.gen::<f32>() - 0.5) * 1e-6
}

struct TreeBuilder<'a> {
    positions: &'a [PlanarPoint],
    cells: &'a mut Vec<Cell>,
    max_depth: usize,
}

impl TreeBuilder<'_> {
    fn build_cell(
        &mut self,
        indices: &[usize],
        x: f32,
        z: f32,
        width: f32,
        depth: usize,
    ) -> Option<usize> {
        if indices.is_empty() {
            return None;
        }

        let cell_idx = self.cells.len();
        self.cells.push(Cell::default());

        let mass = indices.len() as f32;
        let (mut com_x, mut com_z) = (0.0, 0.0);
        for &i in indices {
            com_x += self.positions[i].x;
            com_z += self.positions[i].z;
        }
        com_x /= mass;
        com_z /= mass;

        if indices.len() == 1 || depth >= self.max_depth {
            self.cells[cell_idx] = Cell {
                center_x: com_x,
                center_z: com_z,
                mass,
                x,
                z,
                width,
                children: [None; 4],
                points: indices.to_vec(),
            };
            return Some(cell_idx);
        }

        let half = width / 2.0;
        let mid_x = x + half;
        let mid_z = z + half;

        let mut quadrants: [Vec<usize>; 4] = Default::default();
        for &i in indices {
            let pos = &self.positions[i];
            let slot = match (pos.x < mid_x, pos.z < mid_z) {
                (true, false) => 0,
                (false, false) => 1,
                (true, true) => 2,
                (false, true) => 3,
            };
            quadrants[slot].push(i);
        }

        let children = [
            self.build_cell(&quadrants[0], x, mid_z, half, depth + 1),
            self.build_cell(&quadrants[1], mid_x, mid_z, half, depth + 1),
            self.build_cell(&quadrants[2], x, z, half, depth + 1),
            self.build_cell(&quadrants[3], mid_x, z, half, depth + 1),
        ];

        self.cells[cell_idx] = Cell {
            center_x: com_x,
            center_z: com_z,
            mass,
            x,
            z,
            width,
            children,
            points: Vec::new(),
        };

        Some(cell_idx)
    }
}
