use std::collections::BTreeSet;

use super::*;

/// Places hazards at uniformly random distinct cells, drawing a new index
/// whenever a draw lands on a cell that already holds a hazard.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomBoardGenerator {
    seed: u64,
}

impl RandomBoardGenerator {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl BoardGenerator for RandomBoardGenerator {
    fn generate(self, config: BoardConfig) -> Result<Board> {
        use rand::prelude::*;

        config.validate()?;
        let total_cells = config.total_cells();

        let mut rng = SmallRng::seed_from_u64(self.seed);
        let mut hazards = BTreeSet::new();
        let mut collisions = 0u32;
        while hazards.len() < usize::from(config.hazards) {
            let index: CellIndex = rng.random_range(0..total_cells);
            if !hazards.insert(index) {
                collisions += 1;
            }
        }
        log::trace!(
            "Generated {}x{} board with {} hazards after {} collisions",
            config.size,
            config.size,
            config.hazards,
            collisions
        );

        Board::from_hazard_indices(config.size, hazards)
    }
}
