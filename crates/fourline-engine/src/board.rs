//! Board algorithms: gravity drops, win detection, draw detection.
//!
//! The grid itself lives in `fourline-protocol` (it travels in snapshots);
//! this module is the only code that mutates it. All functions are pure
//! with respect to everything but the board they're handed, which keeps
//! them trivially testable without a session around them.

use fourline_protocol::{Board, CellAddr, Seat, WinLine};

use crate::EngineError;

/// The lowest empty row in `column`, or `None` if the column is full.
///
/// Row 0 is the top, so "lowest" means the highest row index.
pub fn landing_row(board: &Board, column: usize) -> Option<usize> {
    (0..Board::ROWS)
        .rev()
        .find(|&row| board.cell(row, column).is_none())
}

/// Drops a piece for `seat` into `column` and returns where it landed.
///
/// # Errors
/// - [`EngineError::InvalidColumn`] if `column` is outside `[0, 7)`.
/// - [`EngineError::ColumnFull`] if no empty cell remains. The board is
///   untouched in both cases.
pub fn drop_piece(
    board: &mut Board,
    column: usize,
    seat: Seat,
) -> Result<CellAddr, EngineError> {
    if column >= Board::COLS {
        return Err(EngineError::InvalidColumn(column));
    }
    let row = landing_row(board, column).ok_or(EngineError::ColumnFull(column))?;
    board.place(row, column, seat);
    Ok(CellAddr::new(row, column))
}

/// Finds a four-in-a-row, if any, and returns the seat plus the cells.
///
/// The scan order is fixed and documented because it is a tie-break rule:
/// if a single move completes more than one line, the reported line is
/// the first one this order encounters. Directions are scanned in the
/// order horizontal, vertical, down-right diagonal, down-left diagonal;
/// within each direction the anchor cell walks rows top to bottom and
/// columns left to right. The same board therefore always yields the
/// same winning line.
pub fn detect_win(board: &Board) -> Option<(Seat, WinLine)> {
    // Horizontal runs anchored at their leftmost cell.
    for row in 0..Board::ROWS {
        for col in 0..=Board::COLS - 4 {
            if let Some(hit) = run_at(board, row, col, 0, 1) {
                return Some(hit);
            }
        }
    }
    // Vertical, anchored at the topmost cell.
    for row in 0..=Board::ROWS - 4 {
        for col in 0..Board::COLS {
            if let Some(hit) = run_at(board, row, col, 1, 0) {
                return Some(hit);
            }
        }
    }
    // Down-right diagonal.
    for row in 0..=Board::ROWS - 4 {
        for col in 0..=Board::COLS - 4 {
            if let Some(hit) = run_at(board, row, col, 1, 1) {
                return Some(hit);
            }
        }
    }
    // Down-left diagonal, anchored at its top-right cell.
    for row in 0..=Board::ROWS - 4 {
        for col in 3..Board::COLS {
            if let Some(hit) = run_at(board, row, col, 1, -1) {
                return Some(hit);
            }
        }
    }
    None
}

fn run_at(
    board: &Board,
    row: usize,
    col: usize,
    dr: isize,
    dc: isize,
) -> Option<(Seat, WinLine)> {
    let first = board.cell(row, col)?;
    let mut line = [CellAddr::new(row, col); 4];
    for (i, cell) in line.iter_mut().enumerate().skip(1) {
        let r = (row as isize + dr * i as isize) as usize;
        let c = (col as isize + dc * i as isize) as usize;
        if board.cell(r, c) != Some(first) {
            return None;
        }
        *cell = CellAddr::new(r, c);
    }
    Some((first, line))
}

/// `true` once every cell is occupied. With no win present, a full board
/// is a draw.
pub fn is_full(board: &Board) -> bool {
    (0..Board::COLS).all(|col| board.cell(0, col).is_some())
}
