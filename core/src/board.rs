use core::ops::Index;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

/// Edge length of the board in the current game revision.
pub const DEFAULT_BOARD_SIZE: Coord = 5;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    Safe,
    Hazard,
}

impl CellKind {
    pub const fn is_hazard(self) -> bool {
        matches!(self, Self::Hazard)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub size: Coord,
    pub hazards: CellCount,
}

impl BoardConfig {
    pub const fn new(size: Coord, hazards: CellCount) -> Self {
        Self { size, hazards }
    }

    pub const fn total_cells(&self) -> CellCount {
        mult(self.size, self.size)
    }

    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(GameError::InvalidSize);
        }
        if self.hazards >= self.total_cells() {
            return Err(GameError::TooManyHazards {
                hazards: self.hazards,
                cells: self.total_cells(),
            });
        }
        Ok(())
    }
}

/// Square board of cells, fixed for the lifetime of one session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BoardSnapshot")]
pub struct Board {
    hazard_mask: Array2<bool>,
    hazard_count: CellCount,
}

#[derive(Deserialize)]
struct BoardSnapshot {
    hazard_mask: Array2<bool>,
    hazard_count: CellCount,
}

impl TryFrom<BoardSnapshot> for Board {
    type Error = GameError;

    fn try_from(snapshot: BoardSnapshot) -> Result<Self> {
        let board = Self::from_hazard_mask(snapshot.hazard_mask)?;
        if board.hazard_count != snapshot.hazard_count {
            return Err(GameError::InvalidBoardShape);
        }
        Ok(board)
    }
}

impl Board {
    pub fn from_hazard_mask(hazard_mask: Array2<bool>) -> Result<Self> {
        let (rows, cols) = hazard_mask.dim();
        if rows != cols || rows == 0 || rows > usize::from(Coord::MAX) {
            return Err(GameError::InvalidBoardShape);
        }
        let hazard_count = hazard_mask
            .iter()
            .filter(|&&is_hazard| is_hazard)
            .count()
            .try_into()
            .map_err(|_| GameError::InvalidBoardShape)?;
        Ok(Self {
            hazard_mask,
            hazard_count,
        })
    }

    pub fn from_hazard_indices(
        size: Coord,
        hazards: impl IntoIterator<Item = CellIndex>,
    ) -> Result<Self> {
        if size == 0 {
            return Err(GameError::InvalidSize);
        }
        let total = mult(size, size);
        let mut hazard_mask: Array2<bool> = Array2::default((size, size).to_nd_index());

        for index in hazards {
            if index >= total {
                return Err(GameError::InvalidIndex);
            }
            hazard_mask[index_to_coords(index, size).to_nd_index()] = true;
        }

        Self::from_hazard_mask(hazard_mask)
    }

    pub fn config(&self) -> BoardConfig {
        BoardConfig::new(self.size(), self.hazard_count)
    }

    pub fn size(&self) -> Coord {
        // shape is checked on construction
        self.hazard_mask.dim().0 as Coord
    }

    pub fn total_cells(&self) -> CellCount {
        mult(self.size(), self.size())
    }

    pub fn hazard_count(&self) -> CellCount {
        self.hazard_count
    }

    pub fn safe_cell_count(&self) -> CellCount {
        self.total_cells() - self.hazard_count
    }

    pub fn validate_index(&self, index: CellIndex) -> Result<CellIndex> {
        if index < self.total_cells() {
            Ok(index)
        } else {
            Err(GameError::InvalidIndex)
        }
    }

    pub fn kind_at(&self, index: CellIndex) -> CellKind {
        if self[index] {
            CellKind::Hazard
        } else {
            CellKind::Safe
        }
    }

    pub fn hazard_indices(&self) -> impl Iterator<Item = CellIndex> + '_ {
        (0..self.total_cells()).filter(|&index| self[index])
    }
}

impl Index<CellIndex> for Board {
    type Output = bool;

    fn index(&self, index: CellIndex) -> &Self::Output {
        &self.hazard_mask[index_to_coords(index, self.size()).to_nd_index()]
    }
}
