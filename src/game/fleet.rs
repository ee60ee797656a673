use serde::{Deserialize, Serialize};

use super::board::{Board, Orientation, PlacementError, ShipType};

/// Anchor and orientation for one ship, sent as `[row, col, orientation]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipPlacement(pub i32, pub i32, pub Orientation);

impl ShipPlacement {
    pub const fn row(&self) -> i32 {
        self.0
    }

    pub const fn col(&self) -> i32 {
        self.1
    }

    pub const fn orientation(&self) -> Orientation {
        self.2
    }
}

/// A full fleet layout as submitted by a player.
///
/// Every ship is optional at the parsing layer so that an incomplete fleet is
/// reported as a placement failure instead of a malformed message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetPlacement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<ShipPlacement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battleship: Option<ShipPlacement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cruiser: Option<ShipPlacement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submarine: Option<ShipPlacement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destroyer: Option<ShipPlacement>,
}

impl FleetPlacement {
    pub fn get(&self, ship_type: ShipType) -> Option<ShipPlacement> {
        match ship_type {
            ShipType::Carrier => self.carrier,
            ShipType::Battleship => self.battleship,
            ShipType::Cruiser => self.cruiser,
            ShipType::Submarine => self.submarine,
            ShipType::Destroyer => self.destroyer,
        }
    }

    pub fn set(&mut self, ship_type: ShipType, placement: ShipPlacement) {
        let slot = match ship_type {
            ShipType::Carrier => &mut self.carrier,
            ShipType::Battleship => &mut self.battleship,
            ShipType::Cruiser => &mut self.cruiser,
            ShipType::Submarine => &mut self.submarine,
            ShipType::Destroyer => &mut self.destroyer,
        };
        *slot = Some(placement);
    }

    /// Build a board holding all five ships, or fail without producing a partial board.
    pub fn build_board(&self) -> Result<Board, PlacementError> {
        let mut board = Board::new();
        for ship_type in ShipType::ALL {
            let placement = self
                .get(ship_type)
                .ok_or(PlacementError::MissingShip(ship_type))?;
            board.place_ship(
                ship_type,
                placement.row(),
                placement.col(),
                placement.orientation(),
            )?;
        }
        Ok(board)
    }
}
