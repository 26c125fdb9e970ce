//! The 4×4 board: cell ownership and terminal-state detection.
//!
//! The board is pure data with no knowledge of rooms or turns. Cells
//! record who claimed them and on which move, and a claimed cell never
//! changes owner — `place` refuses to overwrite.

use quadline_protocol::PlayerId;

/// Board side length; a winning line spans the full side.
pub const SIZE: usize = 4;

/// Errors from placing a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("cell ({row},{col}) is out of bounds")]
    OutOfBounds { row: usize, col: usize },

    #[error("cell ({row},{col}) is already claimed")]
    Occupied { row: usize, col: usize },
}

/// A claimed cell: who owns it and on which move it was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    pub owner: PlayerId,
    pub move_number: u32,
}

/// The result of evaluating a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Empty cells remain and no line is complete.
    Ongoing,
    /// `owner` holds all four cells of `line`.
    Win {
        owner: PlayerId,
        line: [(usize, usize); SIZE],
    },
    /// The board is full with no complete line.
    Draw,
}

/// A 4×4 grid of claimable cells.
#[derive(Debug, Clone, Default)]
pub struct Board {
    cells: [[Option<Claim>; SIZE]; SIZE],
}

impl Board {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a cell for `owner`. The cell must be in bounds and empty;
    /// nothing else on the board is touched.
    pub fn place(
        &mut self,
        row: usize,
        col: usize,
        owner: PlayerId,
        move_number: u32,
    ) -> Result<(), BoardError> {
        if row >= SIZE || col >= SIZE {
            return Err(BoardError::OutOfBounds { row, col });
        }
        if self.cells[row][col].is_some() {
            return Err(BoardError::Occupied { row, col });
        }
        self.cells[row][col] = Some(Claim { owner, move_number });
        Ok(())
    }

    /// Checks all rows, then all columns, then the main diagonal, then
    /// the anti-diagonal for four cells of one owner. The scan order is
    /// fixed so the reported line is deterministic when several lines
    /// complete on the same move.
    pub fn evaluate(&self) -> Verdict {
        for row in 0..SIZE {
            let line = [(row, 0), (row, 1), (row, 2), (row, 3)];
            if let Some(owner) = self.line_owner(&line) {
                return Verdict::Win { owner, line };
            }
        }
        for col in 0..SIZE {
            let line = [(0, col), (1, col), (2, col), (3, col)];
            if let Some(owner) = self.line_owner(&line) {
                return Verdict::Win { owner, line };
            }
        }
        let main: [(usize, usize); SIZE] = std::array::from_fn(|i| (i, i));
        if let Some(owner) = self.line_owner(&main) {
            return Verdict::Win { owner, line: main };
        }
        let anti: [(usize, usize); SIZE] =
            std::array::from_fn(|i| (i, SIZE - 1 - i));
        if let Some(owner) = self.line_owner(&anti) {
            return Verdict::Win { owner, line: anti };
        }

        if self.is_full() {
            Verdict::Draw
        } else {
            Verdict::Ongoing
        }
    }

    /// Returns `true` when no empty cell remains.
    pub fn is_full(&self) -> bool {
        self.cells
            .iter()
            .all(|row| row.iter().all(|c| c.is_some()))
    }

    /// The owners-only view used in snapshots.
    pub fn owner_grid(&self) -> Vec<Vec<Option<PlayerId>>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|c| c.map(|claim| claim.owner)).collect())
            .collect()
    }

    fn line_owner(&self, line: &[(usize, usize); SIZE]) -> Option<PlayerId> {
        let first = self.cells[line[0].0][line[0].1]?.owner;
        line[1..]
            .iter()
            .all(|&(r, c)| {
                self.cells[r][c].is_some_and(|claim| claim.owner == first)
            })
            .then_some(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    /// Fills cells for one owner with ascending move numbers.
    fn fill(board: &mut Board, owner: PlayerId, cells: &[(usize, usize)]) {
        for (i, &(r, c)) in cells.iter().enumerate() {
            board.place(r, c, owner, i as u32 + 1).unwrap();
        }
    }

    #[test]
    fn test_place_rejects_out_of_bounds() {
        let mut board = Board::new();
        assert_eq!(
            board.place(4, 0, pid(1), 1),
            Err(BoardError::OutOfBounds { row: 4, col: 0 })
        );
        assert_eq!(
            board.place(0, 9, pid(1), 1),
            Err(BoardError::OutOfBounds { row: 0, col: 9 })
        );
    }

    #[test]
    fn test_place_rejects_occupied_and_keeps_owner() {
        let mut board = Board::new();
        board.place(1, 1, pid(1), 1).unwrap();
        assert_eq!(
            board.place(1, 1, pid(2), 2),
            Err(BoardError::Occupied { row: 1, col: 1 })
        );
        assert_eq!(board.owner_grid()[1][1], Some(pid(1)));
    }

    #[test]
    fn test_evaluate_empty_is_ongoing() {
        assert_eq!(Board::new().evaluate(), Verdict::Ongoing);
    }

    #[test]
    fn test_evaluate_all_rows_and_columns() {
        for row in 0..SIZE {
            let mut board = Board::new();
            fill(&mut board, pid(1), &[(row, 0), (row, 1), (row, 2), (row, 3)]);
            assert!(
                matches!(board.evaluate(), Verdict::Win { owner, .. } if owner == pid(1)),
                "row {row}"
            );
        }
        for col in 0..SIZE {
            let mut board = Board::new();
            fill(&mut board, pid(2), &[(0, col), (1, col), (2, col), (3, col)]);
            assert!(
                matches!(board.evaluate(), Verdict::Win { owner, .. } if owner == pid(2)),
                "col {col}"
            );
        }
    }

    #[test]
    fn test_evaluate_diagonals() {
        let mut board = Board::new();
        fill(&mut board, pid(1), &[(0, 0), (1, 1), (2, 2), (3, 3)]);
        assert!(matches!(
            board.evaluate(),
            Verdict::Win { line: [(0, 0), (1, 1), (2, 2), (3, 3)], .. }
        ));

        let mut board = Board::new();
        fill(&mut board, pid(2), &[(0, 3), (1, 2), (2, 1), (3, 0)]);
        assert!(matches!(
            board.evaluate(),
            Verdict::Win { line: [(0, 3), (1, 2), (2, 1), (3, 0)], .. }
        ));
    }

    #[test]
    fn test_evaluate_three_in_a_row_is_not_a_win() {
        let mut board = Board::new();
        fill(&mut board, pid(1), &[(0, 0), (0, 1), (0, 2)]);
        assert_eq!(board.evaluate(), Verdict::Ongoing);
    }

    #[test]
    fn test_evaluate_mixed_line_is_not_a_win() {
        let mut board = Board::new();
        fill(&mut board, pid(1), &[(0, 0), (0, 1), (0, 2)]);
        board.place(0, 3, pid(2), 4).unwrap();
        assert_eq!(board.evaluate(), Verdict::Ongoing);
    }

    #[test]
    fn test_evaluate_scan_order_prefers_earliest_row() {
        // Both row 0 and column 0 are complete for the same owner; the
        // row scan runs first, so the reported line is row 0.
        let mut board = Board::new();
        fill(
            &mut board,
            pid(1),
            &[(0, 0), (0, 1), (0, 2), (0, 3), (1, 0), (2, 0), (3, 0)],
        );
        assert!(matches!(
            board.evaluate(),
            Verdict::Win { line: [(0, 0), (0, 1), (0, 2), (0, 3)], .. }
        ));
    }

    #[test]
    fn test_evaluate_full_board_without_line_is_draw() {
        // a b a b
        // a b a b
        // b a b a
        // b a b a  — no row, column, or diagonal is uniform.
        let mut board = Board::new();
        let mut n = 0;
        for row in 0..SIZE {
            for col in 0..SIZE {
                let owner = if (row < 2) == (col % 2 == 0) { 1 } else { 2 };
                n += 1;
                board.place(row, col, pid(owner), n).unwrap();
            }
        }
        assert!(board.is_full());
        assert_eq!(board.evaluate(), Verdict::Draw);
    }
}
