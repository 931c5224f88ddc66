//! Grid-quantized A* pathfinding around obstacles and buildings.
//!
//! All calculations use fixed-point math for deterministic results
//! across different platforms and clients. The grid is implicit: a cell
//! is blocked when its centre lies within `unit_radius` of an obstacle or
//! building outline, or outside the world.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use tracing::debug;

use crate::math::{angle_between, fixed_sqrt, Fixed, Vec2Fixed};
use crate::obstacle::Obstacle;
use crate::units::Building;

/// Side of a search cell in world units.
pub const PATH_CELL_SIZE: i32 = 16;

/// Maximum number of nodes expanded before giving up.
pub const MAX_SEARCH_ITERATIONS: u32 = 1000;

/// Maximum number of grid cells kept when reconstructing a path.
pub const MAX_PATH_WAYPOINTS: usize = 100;

/// Direction change (radians) below which a waypoint is considered collinear. About 0.1.
pub const SIMPLIFY_ANGLE_THRESHOLD: Fixed = Fixed::from_bits(429_496_730);

/// Cost of a diagonal step (sqrt 2).
const DIAGONAL_COST: Fixed = Fixed::from_bits(6_074_001_000);

/// Direction offsets for 8-directional movement.
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),   // East
    (1, 1),   // Southeast
    (0, 1),   // South
    (-1, 1),  // Southwest
    (-1, 0),  // West
    (-1, -1), // Northwest
    (0, -1),  // North
    (1, -1),  // Northeast
];

type Cell = (i32, i32);

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    cell: Cell,
    f_score: Fixed,
    /// Lower coordinates win ties so expansion order never depends on hashing.
    tie_breaker: u64,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse for lowest f first.
        match other.f_score.cmp(&self.f_score) {
            Ordering::Equal => other.tie_breaker.cmp(&self.tie_breaker),
            ord => ord,
        }
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn tie_breaker((x, y): Cell) -> u64 {
    ((y as u32 as u64) << 32) | (x as u32 as u64)
}

/// Static blockers and bounds a path search runs against.
#[derive(Debug, Clone)]
pub struct NavWorld<'a> {
    obstacles: Vec<&'a Obstacle>,
    buildings: Vec<&'a Building>,
    width: Fixed,
    height: Fixed,
    cell_size: Fixed,
}

impl<'a> NavWorld<'a> {
    /// An empty world of the given size with the default cell size.
    #[must_use]
    pub fn new(width: Fixed, height: Fixed) -> Self {
        Self {
            obstacles: Vec::new(),
            buildings: Vec::new(),
            width,
            height,
            cell_size: Fixed::from_num(PATH_CELL_SIZE),
        }
    }

    /// Builder method to override the cell size. Non-positive sizes are ignored.
    #[must_use]
    pub fn with_cell_size(mut self, cell_size: Fixed) -> Self {
        if cell_size > Fixed::ZERO {
            self.cell_size = cell_size;
        }
        self
    }

    /// Builder method to add obstacles. Inactive ones are skipped.
    #[must_use]
    pub fn with_obstacles(mut self, obstacles: impl IntoIterator<Item = &'a Obstacle>) -> Self {
        self.obstacles.extend(obstacles.into_iter().filter(|o| o.core.active));
        self
    }

    /// Builder method to add buildings. Inactive ones are skipped.
    #[must_use]
    pub fn with_buildings(mut self, buildings: impl IntoIterator<Item = &'a Building>) -> Self {
        self.buildings.extend(buildings.into_iter().filter(|b| b.core.active));
        self
    }

    /// Cell size in world units.
    #[must_use]
    pub const fn cell_size(&self) -> Fixed {
        self.cell_size
    }

    /// Check if a circle of `radius` at `point` overlaps any obstacle or building.
    #[must_use]
    pub fn is_obstructed(&self, point: Vec2Fixed, radius: Fixed) -> bool {
        self.obstacles.iter().any(|o| o.blocks(point, radius))
            || self
                .buildings
                .iter()
                .any(|b| b.shape().distance_to_point(b.core.position, point) <= radius)
    }

    /// Check a straight segment by sampling every half cell.
    #[must_use]
    pub fn line_is_clear(&self, from: Vec2Fixed, to: Vec2Fixed, radius: Fixed) -> bool {
        let step = self.cell_size / Fixed::from_num(2);
        let length = from.distance(to);
        let samples = (length / step).ceil().to_num::<i64>().max(1);
        let samples_fixed = Fixed::from_num(samples);
        (0..=samples).all(|i| {
            let t = Fixed::from_num(i) / samples_fixed;
            !self.is_obstructed(from.lerp(to, t), radius)
        })
    }

    /// Find a walkable waypoint sequence from `start` to `goal`.
    ///
    /// Never fails: airborne units, clear lines and exhausted searches all
    /// yield the direct path `[start, goal]`. Otherwise the result begins
    /// at `start` and ends at `goal` exactly.
    #[must_use]
    pub fn find_path(
        &self,
        start: Vec2Fixed,
        goal: Vec2Fixed,
        unit_radius: Fixed,
        is_airborne: bool,
    ) -> Vec<Vec2Fixed> {
        if is_airborne || self.line_is_clear(start, goal, unit_radius) {
            return vec![start, goal];
        }

        let start_cell = self.world_to_grid(start);
        let goal_cell = self.world_to_grid(goal);
        if start_cell == goal_cell {
            return vec![start, goal];
        }

        match self.search(start_cell, goal_cell, unit_radius) {
            Some(cells) => simplify(self.waypoints(start, start_cell, goal, &cells)),
            None => vec![start, goal],
        }
    }

    /// Exact endpoints around the centres of the interior cells.
    ///
    /// A capped reconstruction no longer begins at the start cell, so its
    /// first cell is kept.
    fn waypoints(
        &self,
        start: Vec2Fixed,
        start_cell: Cell,
        goal: Vec2Fixed,
        cells: &[Cell],
    ) -> Vec<Vec2Fixed> {
        let skip = usize::from(cells.first() == Some(&start_cell));
        let interior = cells
            .get(skip..cells.len().saturating_sub(1))
            .unwrap_or_default();

        let mut points = Vec::with_capacity(interior.len() + 2);
        points.push(start);
        points.extend(interior.iter().map(|&c| self.grid_to_world(c)));
        points.push(goal);
        points
    }

    fn columns(&self) -> i32 {
        (self.width / self.cell_size).ceil().to_num::<i32>().max(1)
    }

    fn rows(&self) -> i32 {
        (self.height / self.cell_size).ceil().to_num::<i32>().max(1)
    }

    fn in_bounds(&self, (x, y): Cell) -> bool {
        x >= 0 && y >= 0 && x < self.columns() && y < self.rows()
    }

    fn world_to_grid(&self, pos: Vec2Fixed) -> Cell {
        let x = (pos.x / self.cell_size).floor().to_num::<i32>();
        let y = (pos.y / self.cell_size).floor().to_num::<i32>();
        (x.clamp(0, self.columns() - 1), y.clamp(0, self.rows() - 1))
    }

    fn grid_to_world(&self, (x, y): Cell) -> Vec2Fixed {
        let half = self.cell_size / Fixed::from_num(2);
        Vec2Fixed::new(
            Fixed::from_num(x) * self.cell_size + half,
            Fixed::from_num(y) * self.cell_size + half,
        )
    }

    fn is_walkable(&self, cell: Cell, radius: Fixed) -> bool {
        self.in_bounds(cell) && !self.is_obstructed(self.grid_to_world(cell), radius)
    }

    /// A* over the implicit grid. Returns cells from start to goal.
    fn search(&self, start: Cell, goal: Cell, radius: Fixed) -> Option<Vec<Cell>> {
        let mut open_set: BinaryHeap<AStarNode> = BinaryHeap::new();
        let mut closed: HashSet<Cell> = HashSet::new();
        let mut came_from: HashMap<Cell, Cell> = HashMap::new();
        let mut g_score: HashMap<Cell, Fixed> = HashMap::new();
        // The goal cell may sit inside a blocker's inflated outline (attacking a building).
        let walkable = |cell: Cell| cell == goal || self.is_walkable(cell, radius);

        g_score.insert(start, Fixed::ZERO);
        open_set.push(AStarNode {
            cell: start,
            f_score: heuristic(start, goal),
            tie_breaker: tie_breaker(start),
        });

        let mut iterations = 0u32;
        while let Some(current) = open_set.pop() {
            if current.cell == goal {
                return Some(reconstruct_path(&came_from, goal));
            }
            if !closed.insert(current.cell) {
                continue;
            }

            iterations += 1;
            if iterations > MAX_SEARCH_ITERATIONS {
                debug!(?start, ?goal, "path search budget exhausted");
                return None;
            }

            let current_g = g_score.get(&current.cell).copied().unwrap_or(Fixed::MAX);
            let (cx, cy) = current.cell;
            for &(dx, dy) in &DIRECTIONS {
                let next = (cx + dx, cy + dy);
                if closed.contains(&next) || !walkable(next) {
                    continue;
                }
                let diagonal = dx != 0 && dy != 0;
                // No corner cutting past blocked cardinal neighbours.
                if diagonal && (!walkable((cx + dx, cy)) || !walkable((cx, cy + dy))) {
                    continue;
                }

                let step = if diagonal { DIAGONAL_COST } else { Fixed::ONE };
                let tentative_g = current_g + step;
                if tentative_g < g_score.get(&next).copied().unwrap_or(Fixed::MAX) {
                    came_from.insert(next, current.cell);
                    g_score.insert(next, tentative_g);
                    open_set.push(AStarNode {
                        cell: next,
                        f_score: tentative_g + heuristic(next, goal),
                        tie_breaker: tie_breaker(next),
                    });
                }
            }
        }

        debug!(?start, ?goal, "no grid path found");
        None
    }
}

/// Euclidean distance between cells, in cell units.
fn heuristic((x1, y1): Cell, (x2, y2): Cell) -> Fixed {
    let dx = Fixed::from_num(x1.abs_diff(x2));
    let dy = Fixed::from_num(y1.abs_diff(y2));
    fixed_sqrt(dx * dx + dy * dy)
}

/// Walk predecessor links back from the goal, keeping at most
/// `MAX_PATH_WAYPOINTS` cells.
fn reconstruct_path(came_from: &HashMap<Cell, Cell>, goal: Cell) -> Vec<Cell> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(&prev) = came_from.get(&current) {
        if path.len() >= MAX_PATH_WAYPOINTS {
            break;
        }
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Drop interior waypoints whose direction change is below the threshold.
#[must_use]
pub fn simplify(points: Vec<Vec2Fixed>) -> Vec<Vec2Fixed> {
    if points.len() <= 2 {
        return points;
    }

    let mut kept = Vec::with_capacity(points.len());
    kept.push(points[0]);
    for window in points.windows(2).skip(1) {
        let (here, next) = (window[0], window[1]);
        let last = kept[kept.len() - 1];
        if angle_between(here - last, next - here) >= SIMPLIFY_ANGLE_THRESHOLD {
            kept.push(here);
        }
    }
    kept.push(points[points.len() - 1]);
    kept
}

/// Find a path for a unit through a world of obstacles and buildings.
///
/// Convenience wrapper over [`NavWorld::find_path`] using the default cell size.
#[must_use]
pub fn find_path(
    start: Vec2Fixed,
    goal: Vec2Fixed,
    obstacles: &[Obstacle],
    buildings: &[Building],
    unit_radius: Fixed,
    world_width: Fixed,
    world_height: Fixed,
    is_airborne: bool,
) -> Vec<Vec2Fixed> {
    NavWorld::new(world_width, world_height)
        .with_obstacles(obstacles)
        .with_buildings(buildings)
        .find_path(start, goal, unit_radius, is_airborne)
}
