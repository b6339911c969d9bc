//! # World Module
//!
//! The tactical grid: who stands where, what cover lies between them, and
//! how far they may move or shoot.
//!
//! Cover and line-of-sight queries are pure functions of the static tile set.
//! Only occupancy changes during a fight.

use crate::config::MELEE_REACH;
use crate::game::{CombatantId, Position};
use crate::{SkirmishError, SkirmishResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How much protection a tile offers against attacks passing through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CoverLevel {
    #[default]
    None,
    /// Furniture, low walls
    Light,
    /// Thick trees, barrels
    Medium,
    /// Brick walls, armored vehicles
    Heavy,
    /// Cannot be shot through at all
    Total,
}

impl CoverLevel {
    /// To-hit penalty, or `None` for total cover.
    pub fn penalty(self) -> Option<i32> {
        match self {
            CoverLevel::None => Some(0),
            CoverLevel::Light => Some(-2),
            CoverLevel::Medium => Some(-4),
            CoverLevel::Heavy => Some(-6),
            CoverLevel::Total => None,
        }
    }

    /// Penalty when sight is granted anyway (windows, shared interiors).
    ///
    /// Total cover counts as Heavy here.
    pub fn see_through_penalty(self) -> i32 {
        self.penalty().unwrap_or(-6)
    }
}

/// A grid cell carrying cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverTile {
    pub position: Position,
    pub cover: CoverLevel,
    /// Opaque: blocks sight and passage
    #[serde(default)]
    pub blocks_line_of_sight: bool,
    /// Windows and doors always allow sight, at a penalty
    #[serde(default)]
    pub window_or_door: bool,
    /// Tiles of one building do not block sight between its occupants
    #[serde(default)]
    pub building: Option<u32>,
}

impl CoverTile {
    /// Transparent cover of the given level.
    pub fn new(position: Position, cover: CoverLevel) -> Self {
        Self {
            position,
            cover,
            blocks_line_of_sight: false,
            window_or_door: false,
            building: None,
        }
    }

    /// An opaque wall.
    pub fn wall(position: Position) -> Self {
        Self {
            blocks_line_of_sight: true,
            ..Self::new(position, CoverLevel::Total)
        }
    }

    /// A window in a wall: sight passes at a penalty, bodies do not.
    pub fn window(position: Position, cover: CoverLevel) -> Self {
        Self {
            blocks_line_of_sight: true,
            window_or_door: true,
            ..Self::new(position, cover)
        }
    }

    /// An open doorway: walkable, and seen through at a penalty.
    pub fn door(position: Position, cover: CoverLevel) -> Self {
        Self {
            window_or_door: true,
            ..Self::new(position, cover)
        }
    }

    /// Open interior floor of a building.
    pub fn floor(position: Position, building: u32) -> Self {
        Self::new(position, CoverLevel::None).in_building(building)
    }

    /// Assigns the tile to a building group.
    pub fn in_building(mut self, building: u32) -> Self {
        self.building = Some(building);
        self
    }

    /// Whether combatants may stand on this tile. Anything that blocks
    /// sight blocks passage too, windows included.
    pub fn is_passable(&self) -> bool {
        !self.blocks_line_of_sight
    }
}

/// Result of tracing a line of sight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineOfSight {
    /// Sight is possible; the worst cover penalty crossed
    Clear { cover_penalty: i32 },
    /// Totally blocked: no attack is possible
    Blocked,
}

impl LineOfSight {
    /// Cover penalty, or `None` when blocked.
    pub fn penalty(self) -> Option<i32> {
        match self {
            LineOfSight::Clear { cover_penalty } => Some(cover_penalty),
            LineOfSight::Blocked => None,
        }
    }

    pub fn is_blocked(self) -> bool {
        self == LineOfSight::Blocked
    }
}

/// Short, medium and long range thresholds in squares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeBands {
    pub short: u32,
    pub medium: u32,
    pub long: u32,
}

impl RangeBands {
    /// Melee reach in every band.
    pub fn melee() -> Self {
        Self {
            short: MELEE_REACH,
            medium: MELEE_REACH,
            long: MELEE_REACH,
        }
    }

    /// Parses `S/M/L` or a single base number `N` (giving `N/2N/4N`).
    ///
    /// Absent or malformed ranges are treated as melee.
    ///
    /// # Examples
    ///
    /// ```
    /// use skirmish::RangeBands;
    ///
    /// let pistol = RangeBands::parse(Some("12/24/48"));
    /// assert_eq!((pistol.short, pistol.medium, pistol.long), (12, 24, 48));
    ///
    /// let bow = RangeBands::parse(Some("20"));
    /// assert_eq!((bow.short, bow.medium, bow.long), (20, 40, 80));
    ///
    /// assert_eq!(RangeBands::parse(None), RangeBands::melee());
    /// ```
    pub fn parse(range: Option<&str>) -> Self {
        let Some(range) = range else {
            return Self::melee();
        };

        let parts: Result<Vec<u32>, _> = range.split('/').map(|p| p.trim().parse::<u32>()).collect();
        let bands = match parts.as_deref() {
            Ok([short, medium, long]) => Some(Self {
                short: *short,
                medium: *medium,
                long: *long,
            }),
            Ok([base]) => base.checked_mul(4).map(|long| Self {
                short: *base,
                medium: base * 2,
                long,
            }),
            _ => None,
        };
        bands.unwrap_or_else(|| {
            log::warn!("Invalid range notation {range:?}, treating as melee");
            Self::melee()
        })
    }

    /// Range penalty at `distance`, or `None` beyond long range.
    pub fn penalty(&self, distance: u32) -> Option<i32> {
        if distance <= self.short {
            Some(0)
        } else if distance <= self.medium {
            Some(-2)
        } else if distance <= self.long {
            Some(-4)
        } else {
            None
        }
    }

    /// Longest distance at which an attack is allowed.
    pub fn max(&self) -> u32 {
        self.long
    }
}

/// Remaining movement this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MovementBudget {
    pub current: u32,
    pub max: u32,
}

impl MovementBudget {
    /// A full budget of `max` squares.
    pub fn full(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Spends `distance` squares, floored at zero.
    pub fn spend(&mut self, distance: u32) {
        self.current = self.current.saturating_sub(distance);
    }
}

/// Every cell on the straight line from `from` to `to`, endpoints included.
///
/// # Examples
///
/// ```
/// use skirmish::{bresenham_line, Position};
///
/// let line = bresenham_line(Position::new(0, 0), Position::new(3, 1));
/// assert_eq!(line.first(), Some(&Position::new(0, 0)));
/// assert_eq!(line.last(), Some(&Position::new(3, 1)));
/// assert_eq!(line.len(), 4);
/// ```
pub fn bresenham_line(from: Position, to: Position) -> Vec<Position> {
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (from.x, from.y);

    let mut cells = Vec::with_capacity(dx.max(-dy) as usize + 1);
    loop {
        cells.push(Position::new(x, y));
        if x == to.x && y == to.y {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    cells
}

/// The battlefield grid.
#[derive(Debug, Clone, Default)]
pub struct TacticalGrid {
    pub width: u32,
    pub height: u32,
    cover: HashMap<Position, CoverTile>,
    occupants: HashMap<Position, CombatantId>,
    positions: HashMap<CombatantId, Position>,
}

impl TacticalGrid {
    /// Creates an empty grid.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Whether `position` lies on the grid.
    pub fn in_bounds(&self, position: Position) -> bool {
        position.x >= 0
            && position.y >= 0
            && (position.x as u32) < self.width
            && (position.y as u32) < self.height
    }

    /// Adds or replaces a cover tile.
    pub fn add_cover(&mut self, tile: CoverTile) {
        self.cover.insert(tile.position, tile);
    }

    /// Adds cover tiles for every cell of a rectangle.
    pub fn add_cover_rect(&mut self, top_left: Position, width: u32, height: u32, tile: CoverTile) {
        for dy in 0..height as i32 {
            for dx in 0..width as i32 {
                let position = top_left + Position::new(dx, dy);
                self.add_cover(CoverTile { position, ..tile });
            }
        }
    }

    /// The cover tile at `position`, if any.
    pub fn cover_at(&self, position: Position) -> Option<&CoverTile> {
        self.cover.get(&position)
    }

    /// All cover tiles.
    pub fn cover_tiles(&self) -> impl Iterator<Item = &CoverTile> {
        self.cover.values()
    }

    /// Building group of the tile at `position`.
    pub fn building_at(&self, position: Position) -> Option<u32> {
        self.cover_at(position).and_then(|tile| tile.building)
    }

    /// Whether `position` is on the grid and not a wall.
    pub fn is_passable(&self, position: Position) -> bool {
        self.in_bounds(position) && self.cover_at(position).map_or(true, CoverTile::is_passable)
    }

    /// The combatant standing at `position`.
    pub fn occupant_at(&self, position: Position) -> Option<CombatantId> {
        self.occupants.get(&position).copied()
    }

    pub fn is_occupied(&self, position: Position) -> bool {
        self.occupants.contains_key(&position)
    }

    /// Where a combatant stands.
    pub fn position_of(&self, id: CombatantId) -> Option<Position> {
        self.positions.get(&id).copied()
    }

    /// Places a combatant on a free, passable tile.
    pub fn place(&mut self, id: CombatantId, position: Position) -> SkirmishResult<()> {
        if !self.is_passable(position) {
            return Err(SkirmishError::MovementBlocked(format!(
                "{position:?} is impassable"
            )));
        }
        if let Some(other) = self.occupant_at(position) {
            if other != id {
                return Err(SkirmishError::MovementBlocked(format!(
                    "{position:?} is occupied"
                )));
            }
        }
        self.remove(id);
        self.occupants.insert(position, id);
        self.positions.insert(id, position);
        Ok(())
    }

    /// Takes a combatant off the grid.
    pub fn remove(&mut self, id: CombatantId) -> Option<Position> {
        let position = self.positions.remove(&id)?;
        self.occupants.remove(&position);
        Some(position)
    }

    /// Checks a move against the budget, occupancy and walls.
    ///
    /// Returns the Chebyshev cost of the move.
    pub fn check_move(&self, from: Position, to: Position, budget: u32) -> SkirmishResult<u32> {
        let distance = from.chebyshev_distance(to);
        if distance == 0 {
            return Err(SkirmishError::MovementBlocked("already there".to_string()));
        }
        if distance > budget {
            return Err(SkirmishError::MovementBlocked(format!(
                "distance {distance} exceeds remaining movement {budget}"
            )));
        }
        if !self.is_passable(to) {
            return Err(SkirmishError::MovementBlocked(format!(
                "{to:?} is impassable"
            )));
        }
        if self.is_occupied(to) {
            return Err(SkirmishError::MovementBlocked(format!(
                "{to:?} is occupied"
            )));
        }
        Ok(distance)
    }

    /// Every tile a combatant at `from` could move to with `budget` squares.
    pub fn reachable_tiles(&self, from: Position, budget: u32) -> Vec<Position> {
        let reach = budget as i32;
        let mut tiles = Vec::new();
        for y in (from.y - reach)..=(from.y + reach) {
            for x in (from.x - reach)..=(from.x + reach) {
                let to = Position::new(x, y);
                if self.check_move(from, to, budget).is_ok() {
                    tiles.push(to);
                }
            }
        }
        tiles
    }

    /// Traces sight from `from` to `to`, skipping both endpoints.
    ///
    /// Tiles shared by a building both parties stand in, and windows or
    /// doors, never block; they only add their cover penalty. Any other
    /// opaque or total-cover tile blocks. Otherwise the worst penalty
    /// crossed is returned.
    pub fn line_of_sight(&self, from: Position, to: Position) -> LineOfSight {
        let from_building = self.building_at(from);
        let to_building = self.building_at(to);
        let line = bresenham_line(from, to);

        let mut worst = 0;
        for cell in line.iter().skip(1).take(line.len().saturating_sub(2)) {
            let Some(tile) = self.cover_at(*cell) else {
                continue;
            };

            let shared = tile.building.is_some()
                && tile.building == from_building
                && tile.building == to_building;

            let penalty = if shared || tile.window_or_door {
                tile.cover.see_through_penalty()
            } else if tile.blocks_line_of_sight {
                return LineOfSight::Blocked;
            } else {
                match tile.cover.penalty() {
                    Some(penalty) => penalty,
                    None => return LineOfSight::Blocked,
                }
            };
            worst = worst.min(penalty);
        }

        LineOfSight::Clear {
            cover_penalty: worst,
        }
    }

    /// Combined range and cover penalty for an attack, or why it is illegal.
    pub fn attack_penalty(
        &self,
        from: Position,
        to: Position,
        bands: &RangeBands,
    ) -> SkirmishResult<i32> {
        let distance = from.chebyshev_distance(to);
        let range_penalty = bands.penalty(distance).ok_or(SkirmishError::OutOfRange {
            distance,
            max: bands.max(),
        })?;
        let cover_penalty = self
            .line_of_sight(from, to)
            .penalty()
            .ok_or(SkirmishError::LineOfSightBlocked)?;
        Ok(range_penalty + cover_penalty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::new_combatant_id;

    #[test]
    fn test_bresenham_diagonal_and_reverse() {
        let line = bresenham_line(Position::new(0, 0), Position::new(3, 3));
        assert_eq!(
            line,
            vec![
                Position::new(0, 0),
                Position::new(1, 1),
                Position::new(2, 2),
                Position::new(3, 3)
            ]
        );
        let back = bresenham_line(Position::new(4, 2), Position::new(0, 2));
        assert_eq!(back.len(), 5);
        assert_eq!(back[1], Position::new(3, 2));
    }

    #[test]
    fn test_range_band_penalties() {
        let bands = RangeBands::parse(Some("12/24/48"));
        assert_eq!(bands.penalty(12), Some(0));
        assert_eq!(bands.penalty(13), Some(-2));
        assert_eq!(bands.penalty(48), Some(-4));
        assert_eq!(bands.penalty(49), None);
    }

    #[test]
    fn test_malformed_range_is_melee() {
        assert_eq!(RangeBands::parse(Some("far")), RangeBands::melee());
        assert_eq!(RangeBands::parse(Some("1/2")), RangeBands::melee());
        assert_eq!(RangeBands::parse(Some("2000000000")), RangeBands::melee());
        assert_eq!(RangeBands::parse(Some("1073741823")).long, 4_294_967_292);
    }

    #[test]
    fn test_light_cover_penalty() {
        let mut grid = TacticalGrid::new(20, 20);
        grid.add_cover(CoverTile::new(Position::new(5, 5), CoverLevel::Light));
        let los = grid.line_of_sight(Position::new(2, 5), Position::new(8, 5));
        assert_eq!(los, LineOfSight::Clear { cover_penalty: -2 });
    }

    #[test]
    fn test_worst_cover_wins() {
        let mut grid = TacticalGrid::new(20, 20);
        grid.add_cover(CoverTile::new(Position::new(4, 5), CoverLevel::Light));
        grid.add_cover(CoverTile::new(Position::new(6, 5), CoverLevel::Heavy));
        grid.add_cover(CoverTile::new(Position::new(7, 5), CoverLevel::Medium));
        let los = grid.line_of_sight(Position::new(2, 5), Position::new(9, 5));
        assert_eq!(los.penalty(), Some(-6));
    }

    #[test]
    fn test_endpoints_are_ignored() {
        let mut grid = TacticalGrid::new(20, 20);
        grid.add_cover(CoverTile::new(Position::new(2, 5), CoverLevel::Heavy));
        grid.add_cover(CoverTile::new(Position::new(9, 5), CoverLevel::Heavy));
        let los = grid.line_of_sight(Position::new(2, 5), Position::new(9, 5));
        assert_eq!(los.penalty(), Some(0));
    }

    #[test]
    fn test_wall_blocks_sight() {
        let mut grid = TacticalGrid::new(20, 20);
        grid.add_cover(CoverTile::wall(Position::new(5, 5)));
        assert!(grid.line_of_sight(Position::new(2, 5), Position::new(8, 5)).is_blocked());
    }

    #[test]
    fn test_total_cover_blocks_even_when_transparent_flag_unset() {
        let mut grid = TacticalGrid::new(20, 20);
        grid.add_cover(CoverTile::new(Position::new(5, 5), CoverLevel::Total));
        assert!(grid.line_of_sight(Position::new(2, 5), Position::new(8, 5)).is_blocked());
    }

    #[test]
    fn test_window_allows_sight_with_penalty() {
        let mut grid = TacticalGrid::new(20, 20);
        grid.add_cover(CoverTile::window(Position::new(5, 5), CoverLevel::Medium));
        let los = grid.line_of_sight(Position::new(2, 5), Position::new(8, 5));
        assert_eq!(los, LineOfSight::Clear { cover_penalty: -4 });
    }

    #[test]
    fn test_shared_building_does_not_block() {
        let mut grid = TacticalGrid::new(20, 20);
        grid.add_cover(CoverTile::floor(Position::new(2, 5), 7));
        grid.add_cover(CoverTile::floor(Position::new(8, 5), 7));
        grid.add_cover(CoverTile::wall(Position::new(5, 5)).in_building(7));
        let inside = grid.line_of_sight(Position::new(2, 5), Position::new(8, 5));
        assert_eq!(inside, LineOfSight::Clear { cover_penalty: -6 });

        // Someone outside the building cannot see through the same wall.
        let straight = grid.line_of_sight(Position::new(1, 5), Position::new(8, 5));
        assert!(straight.is_blocked());
    }

    #[test]
    fn test_movement_rules() {
        let mut grid = TacticalGrid::new(10, 10);
        grid.add_cover(CoverTile::wall(Position::new(3, 3)));
        let other = new_combatant_id();
        grid.place(other, Position::new(4, 4)).unwrap();

        let from = Position::new(2, 2);
        assert_eq!(grid.check_move(from, Position::new(5, 4), 3).unwrap(), 3);
        assert!(grid.check_move(from, Position::new(6, 2), 3).is_err());
        assert!(grid.check_move(from, Position::new(3, 3), 3).is_err());
        assert!(grid.check_move(from, Position::new(4, 4), 3).is_err());
        assert!(grid.check_move(from, Position::new(-1, 2), 3).is_err());
    }

    #[test]
    fn test_windows_block_passage_but_doors_do_not() {
        let mut grid = TacticalGrid::new(10, 10);
        grid.add_cover(CoverTile::window(Position::new(3, 2), CoverLevel::Medium));
        grid.add_cover(CoverTile::door(Position::new(2, 3), CoverLevel::Light));

        let from = Position::new(2, 2);
        assert!(grid.check_move(from, Position::new(3, 2), 3).is_err());
        assert_eq!(grid.check_move(from, Position::new(2, 3), 3).unwrap(), 1);

        let through_door = grid.line_of_sight(Position::new(2, 1), Position::new(2, 5));
        assert_eq!(through_door, LineOfSight::Clear { cover_penalty: -2 });
    }

    #[test]
    fn test_reachable_tiles_respect_budget() {
        let grid = TacticalGrid::new(10, 10);
        let tiles = grid.reachable_tiles(Position::new(5, 5), 1);
        assert_eq!(tiles.len(), 8);
        let corner = grid.reachable_tiles(Position::new(0, 0), 1);
        assert_eq!(corner.len(), 3);
    }

    #[test]
    fn test_place_and_remove() {
        let mut grid = TacticalGrid::new(10, 10);
        let id = new_combatant_id();
        grid.place(id, Position::new(1, 1)).unwrap();
        grid.place(id, Position::new(2, 1)).unwrap();
        assert!(!grid.is_occupied(Position::new(1, 1)));
        assert_eq!(grid.occupant_at(Position::new(2, 1)), Some(id));
        assert_eq!(grid.remove(id), Some(Position::new(2, 1)));
        assert_eq!(grid.position_of(id), None);
    }

    #[test]
    fn test_attack_penalty_combines_range_and_cover() {
        let mut grid = TacticalGrid::new(40, 40);
        grid.add_cover(CoverTile::new(Position::new(10, 2), CoverLevel::Light));
        let bands = RangeBands::parse(Some("12/24/48"));
        let penalty = grid.attack_penalty(Position::new(0, 2), Position::new(15, 2), &bands);
        assert_eq!(penalty.unwrap(), -4);
        assert!(matches!(
            grid.attack_penalty(Position::new(0, 2), Position::new(0, 39), &RangeBands::melee()),
            Err(SkirmishError::OutOfRange { .. })
        ));
    }
}
