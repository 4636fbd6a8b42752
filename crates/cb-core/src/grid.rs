//! Grid positions, facing, and the terrain provider contract.
//!
//! Terrain storage belongs to an external provider; the engine only talks
//! to it through [`Terrain`]. [`TileGrid`] is the in-memory provider used
//! by tests and simple encounters.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Integer grid coordinates. `y` grows southward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Position {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Position {
    /// Create a position.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance (diagonal steps cost one).
    pub fn distance(self, other: Self) -> u32 {
        (self.x - other.x)
            .unsigned_abs()
            .max((self.y - other.y).unsigned_abs())
    }

    /// Returns true if `other` is one of the eight surrounding cells.
    pub fn is_adjacent(self, other: Self) -> bool {
        self.distance(other) == 1
    }

    /// Shift by a delta.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Unit step (each axis -1, 0, or 1) pointing from `self` toward `other`.
    pub fn direction_to(self, other: Self) -> (i32, i32) {
        ((other.x - self.x).signum(), (other.y - self.y).signum())
    }

    /// The eight surrounding cells, clockwise from north.
    pub fn neighbors(self) -> [Position; 8] {
        [
            self.offset(0, -1),
            self.offset(1, -1),
            self.offset(1, 0),
            self.offset(1, 1),
            self.offset(0, 1),
            self.offset(-1, 1),
            self.offset(-1, 0),
            self.offset(-1, -1),
        ]
    }

    /// Cells stepped through on a straight walk to `other`, excluding the
    /// start and including the destination.
    pub fn path_to(self, other: Self) -> Vec<Position> {
        let steps = self.distance(other) as i32;
        let mut path = Vec::with_capacity(steps as usize);
        for i in 1..=steps {
            let x = self.x + round_div((other.x - self.x) * i, steps);
            let y = self.y + round_div((other.y - self.y) * i, steps);
            path.push(Position::new(x, y));
        }
        path
    }
}

/// Integer division rounded half away from zero.
fn round_div(n: i32, d: i32) -> i32 {
    if n >= 0 {
        (2 * n + d) / (2 * d)
    } else {
        -((2 * -n + d) / (2 * d))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Which way a combatant is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Toward negative y.
    #[default]
    North,
    /// Toward positive x.
    East,
    /// Toward positive y.
    South,
    /// Toward negative x.
    West,
}

impl Facing {
    /// Unit vector for this facing.
    pub fn vector(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }

    /// The facing that best points from `from` toward `to`.
    /// Horizontal wins ties.
    pub fn toward(from: Position, to: Position) -> Self {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        if dx.abs() >= dy.abs() && dx != 0 {
            if dx > 0 { Self::East } else { Self::West }
        } else if dy > 0 {
            Self::South
        } else {
            Self::North
        }
    }

    /// Returns true if `other` stands behind someone at `at` facing this way.
    pub fn is_behind(self, at: Position, other: Position) -> bool {
        let (fx, fy) = self.vector();
        let dot = (other.x - at.x) * fx + (other.y - at.y) * fy;
        dot < 0
    }
}

/// A damaging tile effect applied at the start of the occupant's turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hazard {
    /// Display name, e.g. "Fire".
    pub name: String,
    /// Damage dealt to the occupant each turn start.
    pub damage: i32,
    /// Damage type tag.
    pub damage_type: String,
}

impl Hazard {
    /// A burning tile.
    pub fn fire(damage: i32) -> Self {
        Self {
            name: "Fire".to_string(),
            damage,
            damage_type: "Fire".to_string(),
        }
    }
}

/// What a cell is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tile {
    /// Open ground.
    Floor,
    /// Impassable.
    Wall,
    /// Passable; attacks against an occupant have disadvantage.
    Cover,
}

/// Terrain provider: wall, cover and hazard queries plus the ability to
/// mark cells. Occupancy is not part of terrain; the battlefield tracks it.
pub trait Terrain: fmt::Debug {
    /// Returns true if the cell lies on the map.
    fn in_bounds(&self, pos: Position) -> bool;

    /// Returns true if the cell blocks movement.
    fn is_wall(&self, pos: Position) -> bool;

    /// Returns true if an occupant of this cell benefits from cover.
    fn is_cover(&self, _pos: Position) -> bool {
        false
    }

    /// The hazard on a cell, if any.
    fn hazard_at(&self, pos: Position) -> Option<&Hazard>;

    /// Mark or unmark a cell as blocked.
    fn set_blocked(&mut self, pos: Position, blocked: bool);

    /// Place or clear a hazard.
    fn set_hazard(&mut self, pos: Position, hazard: Option<Hazard>);

    /// In bounds and not a wall.
    fn is_walkable(&self, pos: Position) -> bool {
        self.in_bounds(pos) && !self.is_wall(pos)
    }
}

/// A rectangular in-memory grid.
#[derive(Debug, Clone)]
pub struct TileGrid {
    width: i32,
    height: i32,
    walls: HashSet<Position>,
    cover: HashSet<Position>,
    hazards: HashMap<Position, Hazard>,
}

impl TileGrid {
    /// Create an open grid of the given size.
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width: width.max(0),
            height: height.max(0),
            walls: HashSet::new(),
            cover: HashSet::new(),
            hazards: HashMap::new(),
        }
    }

    /// Grid width in cells.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Grid height in cells.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Set the tile kind of a cell.
    pub fn set_tile(&mut self, pos: Position, tile: Tile) {
        self.walls.remove(&pos);
        self.cover.remove(&pos);
        match tile {
            Tile::Floor => {}
            Tile::Wall => {
                self.walls.insert(pos);
            }
            Tile::Cover => {
                self.cover.insert(pos);
            }
        }
    }

    /// The tile kind of a cell. Out-of-bounds cells read as walls.
    pub fn tile(&self, pos: Position) -> Tile {
        if !self.in_bounds(pos) || self.walls.contains(&pos) {
            Tile::Wall
        } else if self.cover.contains(&pos) {
            Tile::Cover
        } else {
            Tile::Floor
        }
    }
}

impl Terrain for TileGrid {
    fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    fn is_wall(&self, pos: Position) -> bool {
        self.tile(pos) == Tile::Wall
    }

    fn is_cover(&self, pos: Position) -> bool {
        self.tile(pos) == Tile::Cover
    }

    fn hazard_at(&self, pos: Position) -> Option<&Hazard> {
        self.hazards.get(&pos)
    }

    fn set_blocked(&mut self, pos: Position, blocked: bool) {
        let tile = if blocked { Tile::Wall } else { Tile::Floor };
        self.set_tile(pos, tile);
    }

    fn set_hazard(&mut self, pos: Position, hazard: Option<Hazard>) {
        match hazard {
            Some(h) => {
                self.hazards.insert(pos, h);
            }
            None => {
                self.hazards.remove(&pos);
            }
        }
    }
}
