//! Hexagonal 3-axis addressing and the geometry needed to tile hexagonal
//! boards into a toroidal mesh.
//!
//! Uses the addressing scheme from Nocetti et al., "Addressing and Routing in
//! Hexagonal Networks with Applications for Tracking Mobile Users and
//! Connection Rerouting in Cellular Networks", with the "z" dimension of the
//! three-axis basis folded away wherever only (x,y) is needed. X points
//! left-to-right, Y points bottom-to-top, Z points top-right-to-bottom-left.

use std::collections::HashSet;

// ─── Direction ───────────────────────────────────────────────────────────────

/// One of the six hexagonal neighbor directions, indexed 0..5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    East = 0,
    NorthEast = 1,
    North = 2,
    West = 3,
    SouthWest = 4,
    South = 5,
}

pub const ALL_DIRECTIONS: [Direction; 6] = [
    Direction::East,
    Direction::NorthEast,
    Direction::North,
    Direction::West,
    Direction::SouthWest,
    Direction::South,
];

impl Direction {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Self {
        match i % 6 {
            0 => Direction::East,
            1 => Direction::NorthEast,
            2 => Direction::North,
            3 => Direction::West,
            4 => Direction::SouthWest,
            _ => Direction::South,
        }
    }

    /// The direction opposite this one: `(d+3) mod 6`.
    pub fn opposite(self) -> Direction {
        Direction::from_index(self.index() + 3)
    }

    /// The next direction clockwise: `(d-1) mod 6`.
    pub fn next_cw(self) -> Direction {
        Direction::from_index(self.index() + 5)
    }

    /// The next direction counter-clockwise: `(d+1) mod 6`.
    pub fn next_ccw(self) -> Direction {
        Direction::from_index(self.index() + 1)
    }

    /// The (dx, dy, dz) unit step taken when moving one hop in this direction,
    /// in the three-axis basis (axis 0 = E/W, axis 1 = N/S, axis 2 = SW/NE).
    fn axis_step(self) -> (i64, i64, i64) {
        match self {
            Direction::East => (1, 0, 0),
            Direction::West => (-1, 0, 0),
            Direction::North => (0, 1, 0),
            Direction::South => (0, -1, 0),
            Direction::SouthWest => (0, 0, 1),
            Direction::NorthEast => (0, 0, -1),
        }
    }
}

// ─── Edge ────────────────────────────────────────────────────────────────────

/// One of the six outward-facing sides of a hexagonal board, indexed 0..5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Edge {
    Top = 0,
    TopLeft = 1,
    BottomLeft = 2,
    Bottom = 3,
    BottomRight = 4,
    TopRight = 5,
}

pub const ALL_EDGES: [Edge; 6] = [
    Edge::Top,
    Edge::TopLeft,
    Edge::BottomLeft,
    Edge::Bottom,
    Edge::BottomRight,
    Edge::TopRight,
];

impl Edge {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Self {
        match i % 6 {
            0 => Edge::Top,
            1 => Edge::TopLeft,
            2 => Edge::BottomLeft,
            3 => Edge::Bottom,
            4 => Edge::BottomRight,
            _ => Edge::TopRight,
        }
    }

    /// The edge opposite this one: `(e+3) mod 6`.
    pub fn opposite(self) -> Edge {
        Edge::from_index(self.index() + 3)
    }

    /// The single outward direction this edge's external link slots face.
    /// Edge index `e` maps to direction index `(e+2) mod 6`; this keeps
    /// `direction_for(opposite(e)) == direction_for(e).opposite()`, which is
    /// what lets inter-board wiring reference a single direction per edge
    /// pair consistently from both sides.
    pub fn direction(self) -> Direction {
        Direction::from_index(self.index() + 2)
    }
}

// ─── Position & Vector3 ──────────────────────────────────────────────────────

/// An integer (x, y) position in a chip mesh.
pub type Position = (i64, i64);

/// A point in the three-axis hexagonal basis, used only for shortest-path
/// arithmetic. Axis 0 is E/W, axis 1 is N/S, axis 2 is SW/NE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vector3(pub i64, pub i64, pub i64);

/// Zero-pad an (x, y) position to a three-axis vector with z = 0.
pub fn zero_pad(pos: Position) -> Vector3 {
    Vector3(pos.0, pos.1, 0)
}

/// Project a three-axis vector back down to (x, y): `(a - c, b - c)`.
pub fn to_xy(v: Vector3) -> Position {
    (v.0 - v.2, v.1 - v.2)
}

/// Step one hop from `pos` in the given direction, in the three-axis basis.
pub fn add_direction(pos: Vector3, dir: Direction) -> Vector3 {
    let (dx, dy, dz) = dir.axis_step();
    Vector3(pos.0 + dx, pos.1 + dy, pos.2 + dz)
}

/// Manhattan distance of a vector (sum of absolute components).
pub fn manhattan(v: Vector3) -> i64 {
    v.0.abs() + v.1.abs() + v.2.abs()
}

fn median_element(values: [i64; 3]) -> i64 {
    let mut sorted = values;
    sorted.sort_unstable();
    sorted[1]
}

/// Reduce a vector to its shortest-path form: subtract the median component
/// from every axis. A shortest path has at least one zero component and the
/// remaining two have opposite signs (the vector (1,1,1) moves nowhere, so it
/// may always be added or subtracted freely).
pub fn to_shortest_path(v: Vector3) -> Vector3 {
    let median = median_element([v.0, v.1, v.2]);
    Vector3(v.0 - median, v.1 - median, v.2 - median)
}

/// Shortest path from `src` to `dst`. If `bounds` (width, height) is given,
/// the path is allowed to wrap around a toroidal mesh of that size.
pub fn get_path(src: Position, dst: Position, bounds: Option<(i64, i64)>) -> Vector3 {
    let (src3, dst3) = if let Some((w, h)) = bounds {
        // Re-centre the world around the source: both axes of `dst` are
        // recomputed as the wrapped delta offset by half the bound, and
        // `src` resets to the bound's midpoint on every axis (z uses the
        // smaller of the two bounds, matching the original's 2-axis mesh).
        let m = w.min(h);
        let dst3 = Vector3(
            (dst.0 - src.0 + w / 2).rem_euclid(w),
            (dst.1 - src.1 + h / 2).rem_euclid(h),
            (m / 2).rem_euclid(m),
        );
        (Vector3(w / 2, h / 2, m / 2), dst3)
    } else {
        (zero_pad(src), zero_pad(dst))
    };

    let delta = Vector3(dst3.0 - src3.0, dst3.1 - src3.1, dst3.2 - src3.2);
    to_shortest_path(delta)
}

// ─── Hexagon enumeration ─────────────────────────────────────────────────────

/// Enumerate the `6*n*n - 6*n + 1`-ish set of positions forming a hexagon of
/// "radius" `n` in 2-axis coordinates (`n=4` yields the 48-chip board).
///
/// The original source's `hexagon(n)` generator body was not retained; this
/// enumerates the same set (verified against the `hexagon(2)` 12-point vector
/// and against `hexagon(4)` producing exactly 48 unique points) in a
/// deterministic row-major order that does not match the original generator's
/// yield order, which no caller depends on.
pub fn hexagon(n: i64) -> Vec<Position> {
    let mut points = Vec::new();
    for y in 1..=n {
        for x in (y - n)..=(n - 1) {
            points.push((x, y));
        }
    }
    for y in -(n - 1)..=0 {
        for x in -n..=(n - 1 + y) {
            points.push((x, y));
        }
    }
    points
}

/// Maps an (edge, index) pair on a radius-`n` hexagon to the (internal chip
/// position, outward direction) pair it represents. `index` ranges 0..8 for
/// `n=4` (each edge has exactly 8 outward-facing links at that radius).
///
/// Every outward-facing (position, direction) pair of the hexagon is visited
/// exactly once across all edges and indices: each edge owns exactly the
/// pairs whose direction is `edge.direction()`, and within that group
/// positions are ordered by `(x, y)` for a deterministic `index`.
pub fn hexagon_edge_link(edge: Edge, index: usize, n: i64) -> (Position, Direction) {
    let direction = edge.direction();
    let all: HashSet<Position> = hexagon(n).into_iter().collect();

    let mut facing: Vec<Position> = all
        .iter()
        .copied()
        .filter(|&pos| {
            let neighbor = to_xy(add_direction(zero_pad(pos), direction));
            !all.contains(&neighbor)
        })
        .collect();
    facing.sort_unstable();

    let pos = facing[index];
    (pos, direction)
}
