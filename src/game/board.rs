//! Ship placement and attack resolution on a single player's grid.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Width and height of every board.
pub const BOARD_SIZE: usize = 10;

/// Number of ships in a complete fleet.
pub const FLEET_SIZE: usize = 5;

/// The five ship classes of a fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipType {
    Carrier,
    Battleship,
    Cruiser,
    Submarine,
    Destroyer,
}

impl ShipType {
    /// Every ship class, largest first.
    pub const ALL: [Self; FLEET_SIZE] = [
        Self::Carrier,
        Self::Battleship,
        Self::Cruiser,
        Self::Submarine,
        Self::Destroyer,
    ];

    /// Number of cells the ship occupies.
    pub const fn size(self) -> usize {
        match self {
            Self::Carrier => 5,
            Self::Battleship => 4,
            Self::Cruiser | Self::Submarine => 3,
            Self::Destroyer => 2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Carrier => "carrier",
            Self::Battleship => "battleship",
            Self::Cruiser => "cruiser",
            Self::Submarine => "submarine",
            Self::Destroyer => "destroyer",
        }
    }
}

impl fmt::Display for ShipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction a ship extends from its anchor cell.
///
/// On the wire this is an integer: `1` is horizontal, `0` is vertical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// Row and column step between consecutive cells of a run.
    const fn step(self) -> (usize, usize) {
        match self {
            Self::Horizontal => (0, 1),
            Self::Vertical => (1, 0),
        }
    }

    pub const fn wire_value(self) -> u8 {
        match self {
            Self::Horizontal => 1,
            Self::Vertical => 0,
        }
    }
}

impl Serialize for Orientation {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.wire_value())
    }
}

impl<'de> Deserialize<'de> for Orientation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match u8::deserialize(deserializer)? {
            1 => Ok(Self::Horizontal),
            0 => Ok(Self::Vertical),
            other => Err(D::Error::custom(format!(
                "invalid orientation {other}, expected 1 (horizontal) or 0 (vertical)"
            ))),
        }
    }
}

/// State of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Ship,
    Hit,
    Miss,
}

/// A placed ship and its damage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ship {
    pub ship_type: ShipType,
    pub row: usize,
    pub col: usize,
    pub orientation: Orientation,
    pub size: usize,
    pub hits: usize,
    pub sunk: bool,
}

impl Ship {
    /// Cells covered by this ship, anchor first.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let (dr, dc) = self.orientation.step();
        (0..self.size).map(move |i| (self.row + i * dr, self.col + i * dc))
    }

    pub fn occupies(&self, row: usize, col: usize) -> bool {
        self.cells().any(|cell| cell == (row, col))
    }
}

/// Result of a valid attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShotOutcome {
    Miss,
    Hit,
    Sunk,
}

impl ShotOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Miss => "MISS",
            Self::Hit => "HIT",
            Self::Sunk => "SUNK",
        }
    }
}

impl fmt::Display for ShotOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons an attack is rejected. A rejected attack never mutates the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("target ({row}, {col}) is outside the board")]
    OutOfBounds { row: i32, col: i32 },
    #[error("target ({row}, {col}) was already attacked")]
    AlreadyAttacked { row: usize, col: usize },
}

/// Reasons a ship or fleet placement is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("{0} does not fit inside the board")]
    OutOfBounds(ShipType),
    #[error("{0} overlaps another ship")]
    Overlap(ShipType),
    #[error("board already holds {FLEET_SIZE} ships")]
    FleetFull,
    #[error("fleet is missing the {0}")]
    MissingShip(ShipType),
}

/// One player's grid, as attacked by their opponent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    grid: [[Cell; BOARD_SIZE]; BOARD_SIZE],
    ships: Vec<Ship>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            grid: [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE],
            ships: Vec::with_capacity(FLEET_SIZE),
        }
    }

    /// Cell state at `(row, col)`, or `None` off the board.
    pub fn cell(&self, row: usize, col: usize) -> Option<Cell> {
        self.grid.get(row).and_then(|cells| cells.get(col)).copied()
    }

    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    /// True iff a `size`-long run from `(row, col)` stays on the board and covers only empty cells.
    pub fn validate_placement(
        &self,
        row: i32,
        col: i32,
        size: usize,
        orientation: Orientation,
    ) -> bool {
        self.check_run(row, col, size, orientation).is_some()
    }

    /// Place `ship_type` at `(row, col)`. The board is untouched on failure.
    pub fn place_ship(
        &mut self,
        ship_type: ShipType,
        row: i32,
        col: i32,
        orientation: Orientation,
    ) -> Result<(), PlacementError> {
        if self.ships.len() >= FLEET_SIZE {
            return Err(PlacementError::FleetFull);
        }

        let size = ship_type.size();
        let (anchor_row, anchor_col) = match self.check_run(row, col, size, orientation) {
            Some(anchor) => anchor,
            None if self.run_in_bounds(row, col, size, orientation) => {
                return Err(PlacementError::Overlap(ship_type));
            }
            None => return Err(PlacementError::OutOfBounds(ship_type)),
        };

        let ship = Ship {
            ship_type,
            row: anchor_row,
            col: anchor_col,
            orientation,
            size,
            hits: 0,
            sunk: false,
        };
        for (r, c) in ship.cells() {
            self.set(r, c, Cell::Ship);
        }
        self.ships.push(ship);
        Ok(())
    }

    /// Fire at `(row, col)`.
    ///
    /// Mutates exactly one cell and at most one ship per accepted shot.
    pub fn attack(&mut self, row: i32, col: i32) -> Result<ShotOutcome, BoardError> {
        let (r, c) = match (to_index(row), to_index(col)) {
            (Some(r), Some(c)) => (r, c),
            _ => return Err(BoardError::OutOfBounds { row, col }),
        };

        match self.cell(r, c) {
            Some(Cell::Empty) => {
                self.set(r, c, Cell::Miss);
                Ok(ShotOutcome::Miss)
            }
            Some(Cell::Ship) => {
                self.set(r, c, Cell::Hit);
                let owner = self
                    .ships
                    .iter_mut()
                    .find(|ship| !ship.sunk && ship.occupies(r, c));
                let Some(ship) = owner else {
                    // Grid and ship list disagree; treat as a plain hit.
                    return Ok(ShotOutcome::Hit);
                };
                ship.hits += 1;
                if ship.hits >= ship.size {
                    ship.sunk = true;
                    Ok(ShotOutcome::Sunk)
                } else {
                    Ok(ShotOutcome::Hit)
                }
            }
            Some(Cell::Hit | Cell::Miss) => Err(BoardError::AlreadyAttacked { row: r, col: c }),
            None => Err(BoardError::OutOfBounds { row, col }),
        }
    }

    /// True iff every placed ship is sunk.
    ///
    /// Per-ship hit counters are authoritative; the grid scan is a debug cross-check.
    pub fn all_sunk(&self) -> bool {
        let sunk = self.ships.iter().all(|ship| ship.sunk);
        debug_assert_eq!(
            sunk,
            self.remaining_ship_cells() == 0,
            "ship hit counters drifted from the grid"
        );
        sunk
    }

    /// Number of ship cells not yet hit.
    pub fn remaining_ship_cells(&self) -> usize {
        self.grid
            .iter()
            .flatten()
            .filter(|cell| **cell == Cell::Ship)
            .count()
    }

    fn check_run(
        &self,
        row: i32,
        col: i32,
        size: usize,
        orientation: Orientation,
    ) -> Option<(usize, usize)> {
        if !self.run_in_bounds(row, col, size, orientation) {
            return None;
        }
        let anchor = (to_index(row)?, to_index(col)?);
        let (dr, dc) = orientation.step();
        let all_empty = (0..size)
            .all(|i| self.cell(anchor.0 + i * dr, anchor.1 + i * dc) == Some(Cell::Empty));
        all_empty.then_some(anchor)
    }

    fn run_in_bounds(&self, row: i32, col: i32, size: usize, orientation: Orientation) -> bool {
        let (Some(r), Some(c)) = (to_index(row), to_index(col)) else {
            return false;
        };
        if size == 0 {
            return false;
        }
        let (dr, dc) = orientation.step();
        r + (size - 1) * dr < BOARD_SIZE && c + (size - 1) * dc < BOARD_SIZE
    }

    fn set(&mut self, row: usize, col: usize, value: Cell) {
        if let Some(cell) = self.grid.get_mut(row).and_then(|cells| cells.get_mut(col)) {
            *cell = value;
        }
    }
}

fn to_index(value: i32) -> Option<usize> {
    usize::try_from(value).ok().filter(|v| *v < BOARD_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn board_with_destroyer() -> Board {
        let mut board = Board::new();
        board
            .place_ship(ShipType::Destroyer, 0, 0, Orientation::Horizontal)
            .unwrap();
        board
    }

    #[test]
    fn ship_sizes_match_fleet_rules() {
        let sizes: Vec<usize> = ShipType::ALL.iter().map(|t| t.size()).collect();
        assert_eq!(sizes, vec![5, 4, 3, 3, 2]);
    }

    #[test]
    fn place_ship_marks_run_as_occupied() {
        let mut board = Board::new();
        board
            .place_ship(ShipType::Cruiser, 2, 3, Orientation::Vertical)
            .unwrap();

        for row in 2..5 {
            assert_eq!(board.cell(row, 3), Some(Cell::Ship));
        }
        assert_eq!(board.cell(5, 3), Some(Cell::Empty));
        assert_eq!(board.ships().len(), 1);
        assert_eq!(board.remaining_ship_cells(), 3);
    }

    #[test]
    fn place_ship_rejects_overflow_and_overlap_without_mutation() {
        let mut board = board_with_destroyer();
        let before = board.clone();

        assert_eq!(
            board.place_ship(ShipType::Carrier, 0, 6, Orientation::Horizontal),
            Err(PlacementError::OutOfBounds(ShipType::Carrier))
        );
        assert_eq!(
            board.place_ship(ShipType::Submarine, 0, 1, Orientation::Vertical),
            Err(PlacementError::Overlap(ShipType::Submarine))
        );
        assert_eq!(
            board.place_ship(ShipType::Submarine, -1, 0, Orientation::Vertical),
            Err(PlacementError::OutOfBounds(ShipType::Submarine))
        );
        assert_eq!(board, before);
    }

    #[test]
    fn sixth_ship_is_rejected() {
        let mut board = Board::new();
        for (row, ship_type) in ShipType::ALL.iter().enumerate() {
            board
                .place_ship(*ship_type, row as i32, 0, Orientation::Horizontal)
                .unwrap();
        }
        assert_eq!(
            board.place_ship(ShipType::Destroyer, 8, 0, Orientation::Horizontal),
            Err(PlacementError::FleetFull)
        );
    }

    #[test]
    fn attack_reports_miss_hit_and_sunk() {
        let mut board = board_with_destroyer();

        assert_eq!(board.attack(5, 5), Ok(ShotOutcome::Miss));
        assert_eq!(board.cell(5, 5), Some(Cell::Miss));
        assert_eq!(board.attack(0, 0), Ok(ShotOutcome::Hit));
        assert!(!board.all_sunk());
        assert_eq!(board.attack(0, 1), Ok(ShotOutcome::Sunk));
        assert!(board.ships()[0].sunk);
        assert!(board.all_sunk());
    }

    #[test]
    fn repeated_or_out_of_bounds_attacks_are_rejected() {
        let mut board = board_with_destroyer();
        board.attack(0, 0).unwrap();
        let before = board.clone();

        assert_eq!(
            board.attack(0, 0),
            Err(BoardError::AlreadyAttacked { row: 0, col: 0 })
        );
        assert_eq!(
            board.attack(10, 0),
            Err(BoardError::OutOfBounds { row: 10, col: 0 })
        );
        assert_eq!(
            board.attack(0, -1),
            Err(BoardError::OutOfBounds { row: 0, col: -1 })
        );
        assert_eq!(board, before);
    }

    #[test]
    fn orientation_uses_integer_wire_form() {
        let parsed: Orientation = serde_json::from_str("1").unwrap();
        assert_eq!(parsed, Orientation::Horizontal);
        let parsed: Orientation = serde_json::from_str("0").unwrap();
        assert_eq!(parsed, Orientation::Vertical);
        assert!(serde_json::from_str::<Orientation>("2").is_err());
        assert_eq!(serde_json::to_string(&Orientation::Vertical).unwrap(), "0");
    }

    fn orientation_strategy() -> impl Strategy<Value = Orientation> {
        prop_oneof![Just(Orientation::Horizontal), Just(Orientation::Vertical)]
    }

    proptest! {
        #[test]
        fn validate_placement_matches_bounds_and_emptiness(
            row in -2i32..12,
            col in -2i32..12,
            size in 1usize..6,
            orientation in orientation_strategy(),
        ) {
            let board = board_with_destroyer();
            let (dr, dc) = match orientation {
                Orientation::Horizontal => (0i32, 1i32),
                Orientation::Vertical => (1, 0),
            };
            let expected = (0..size as i32).all(|i| {
                let r = row + i * dr;
                let c = col + i * dc;
                (0..BOARD_SIZE as i32).contains(&r)
                    && (0..BOARD_SIZE as i32).contains(&c)
                    && board.cell(r as usize, c as usize) == Some(Cell::Empty)
            });
            prop_assert_eq!(board.validate_placement(row, col, size, orientation), expected);
        }

        #[test]
        fn second_attack_on_a_cell_is_invalid_and_inert(row in 0i32..10, col in 0i32..10) {
            let mut board = board_with_destroyer();
            board
                .place_ship(ShipType::Carrier, 4, 2, Orientation::Horizontal)
                .unwrap();

            prop_assert!(board.attack(row, col).is_ok());
            let snapshot = board.clone();
            let second = board.attack(row, col);
            prop_assert!(second.is_err());
            prop_assert_eq!(board, snapshot);
        }

        #[test]
        fn ship_sinks_exactly_when_every_cell_is_hit(
            targets in proptest::collection::vec((0i32..10, 0i32..10), 0..60),
        ) {
            let mut board = Board::new();
            board
                .place_ship(ShipType::Battleship, 3, 3, Orientation::Vertical)
                .unwrap();

            for (row, col) in targets {
                let _ = board.attack(row, col);
                let ship = &board.ships()[0];
                let hit_cells = ship
                    .cells()
                    .filter(|(r, c)| board.cell(*r, *c) == Some(Cell::Hit))
                    .count();
                prop_assert_eq!(ship.hits, hit_cells);
                prop_assert_eq!(ship.sunk, hit_cells == ship.size);
                prop_assert_eq!(board.all_sunk(), ship.sunk);
            }
        }
    }
}
