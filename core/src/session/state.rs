use serde::{Deserialize, Serialize};

use crate::*;

/// Where the session stands relative to the escrow.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// No account bound.
    Disconnected,
    Idle,
    /// `startGame` in flight.
    Starting,
    /// Stake confirmed, reveals permitted.
    Active,
    /// Terminal `completeGame` in flight.
    Resolving,
    /// A hazard was hit or the board was cleared, but the escrow has not
    /// confirmed the outcome. The player has to trigger finalization again.
    Unresolved { won: bool, earnings: Wei },
    /// Win confirmed by the escrow, the payout is still to be withdrawn.
    PendingWithdrawal { earnings: Wei },
}

impl Phase {
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolving | Self::Unresolved { .. })
    }

    pub const fn is_in_flight(self) -> bool {
        matches!(self, Self::Starting | Self::Resolving)
    }
}

impl Default for Phase {
    fn default() -> Self {
        Self::Disconnected
    }
}

/// Cells uncovered so far. Entries only ever flip from hidden to revealed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RevealSnapshot")]
pub struct RevealSet {
    revealed: Vec<bool>,
    count: CellCount,
}

impl RevealSet {
    pub fn new(total_cells: CellCount) -> Self {
        Self {
            revealed: vec![false; usize::from(total_cells)],
            count: 0,
        }
    }

    pub fn is_revealed(&self, index: CellIndex) -> bool {
        self.revealed
            .get(usize::from(index))
            .copied()
            .unwrap_or(false)
    }

    /// Returns `false` when the cell was already revealed.
    pub(crate) fn reveal(&mut self, index: CellIndex) -> bool {
        match self.revealed.get_mut(usize::from(index)) {
            Some(cell) if !*cell => {
                *cell = true;
                self.count += 1;
                true
            }
            _ => false,
        }
    }

    pub fn count(&self) -> CellCount {
        self.count
    }

    fn len(&self) -> usize {
        self.revealed.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = CellIndex> + '_ {
        self.revealed
            .iter()
            .enumerate()
            .filter(|(_, revealed)| **revealed)
            .map(|(index, _)| index as CellIndex)
    }
}

#[derive(Deserialize)]
struct RevealSnapshot {
    revealed: Vec<bool>,
}

impl TryFrom<RevealSnapshot> for RevealSet {
    type Error = GameError;

    fn try_from(snapshot: RevealSnapshot) -> Result<Self> {
        CellCount::try_from(snapshot.revealed.len()).map_err(|_| GameError::InvalidBoardShape)?;
        let count = snapshot.revealed.iter().filter(|&&revealed| revealed).count();
        Ok(Self {
            revealed: snapshot.revealed,
            count: count as CellCount,
        })
    }
}

/// Board and stake of a session the escrow has accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SessionSnapshot")]
pub struct GameSession {
    board: Board,
    revealed: RevealSet,
    difficulty: Difficulty,
    stake: Wei,
}

impl GameSession {
    pub(crate) fn new(board: Board, stake: Wei, difficulty: Difficulty) -> Self {
        let revealed = RevealSet::new(board.total_cells());
        Self {
            board,
            revealed,
            difficulty,
            stake,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn revealed(&self) -> &RevealSet {
        &self.revealed
    }

    pub(crate) fn revealed_mut(&mut self) -> &mut RevealSet {
        &mut self.revealed
    }

    pub fn stake(&self) -> Wei {
        self.stake
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn hazard_count(&self) -> CellCount {
        self.board.hazard_count()
    }

    pub fn payout_multiplier(&self) -> PayoutMultiplier {
        self.difficulty.payout_multiplier
    }

    pub fn revealed_safe_count(&self) -> CellCount {
        self.revealed
            .iter()
            .filter(|&index| !self.board[index])
            .count() as CellCount
    }

    pub fn is_cleared(&self) -> bool {
        self.revealed_safe_count() == self.board.safe_cell_count()
    }

    /// Advisory profit if the player cashed out now.
    pub fn running_profit(&self) -> Wei {
        running_profit(self.stake, self.revealed_safe_count())
    }
}

#[derive(Deserialize)]
struct SessionSnapshot {
    board: Board,
    revealed: RevealSet,
    difficulty: Difficulty,
    stake: Wei,
}

impl TryFrom<SessionSnapshot> for GameSession {
    type Error = GameError;

    fn try_from(snapshot: SessionSnapshot) -> Result<Self> {
        let board = snapshot.board;
        if snapshot.revealed.len() != usize::from(board.total_cells())
            || snapshot.difficulty.hazards != board.hazard_count()
        {
            return Err(GameError::InvalidBoardShape);
        }
        Ok(Self {
            board,
            revealed: snapshot.revealed,
            difficulty: snapshot.difficulty,
            stake: snapshot.stake,
        })
    }
}

/// Local view of the player's game, as shown to the UI.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    phase: Phase,
    session: Option<GameSession>,
}

impl SessionState {
    pub(crate) fn with_phase(phase: Phase) -> Self {
        Self {
            phase,
            session: None,
        }
    }

    pub(crate) fn active(session: GameSession) -> Self {
        Self {
            phase: Phase::Active,
            session: Some(session),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        log::debug!("Session phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    pub(crate) fn session_mut(&mut self) -> Option<&mut GameSession> {
        self.session.as_mut()
    }

    pub fn is_active(&self) -> bool {
        self.phase.is_active()
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn stake(&self) -> Option<Wei> {
        self.session.as_ref().map(GameSession::stake)
    }

    pub fn running_profit(&self) -> Wei {
        match self.phase {
            Phase::Unresolved { earnings, .. } | Phase::PendingWithdrawal { earnings } => earnings,
            _ => self
                .session
                .as_ref()
                .map(GameSession::running_profit)
                .unwrap_or_default(),
        }
    }
}
