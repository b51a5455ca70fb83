use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tictactoe::{Board, Marker, Position};

/// A trait for move selection, so the agent does not care how moves are picked.
///
/// Implementations must only return empty positions, and must return `None`
/// exactly when the board has no empty cell. They must not perform any I/O.
pub trait Strategy {
    fn name(&self) -> &'static str;

    fn select_move(&mut self, board: &Board, marker: Marker) -> Option<Position>;
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn select_move(&mut self, board: &Board, marker: Marker) -> Option<Position> {
        (**self).select_move(board, marker)
    }
}

/// Picks uniformly among the empty cells.
pub struct RandomStrategy {
    rng: StdRng,
}

impl RandomStrategy {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }
}

impl Strategy for RandomStrategy {
    fn name(&self) -> &'static str {
        "random"
    }

    fn select_move(&mut self, board: &Board, _marker: Marker) -> Option<Position> {
        board.empty_positions().choose(&mut self.rng).copied()
    }
}

/// Takes the first empty cell in row-major order.
pub struct FirstEmptyStrategy;

impl Strategy for FirstEmptyStrategy {
    fn name(&self) -> &'static str {
        "first-empty"
    }

    fn select_move(&mut self, board: &Board, _marker: Marker) -> Option<Position> {
        board.empty_positions().first().copied()
    }
}

/// Wins if it can, otherwise blocks the opponent's win, otherwise prefers the
/// center, then the corners, then anything.
pub struct HeuristicStrategy;

fn winning_move(board: &Board, empty: &[Position], marker: Marker) -> Option<Position> {
    empty
        .iter()
        .copied()
        .find(|&pos| board.with(pos, marker).winner() == Some(marker))
}

impl Strategy for HeuristicStrategy {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn select_move(&mut self, board: &Board, marker: Marker) -> Option<Position> {
        let empty = board.empty_positions();
        winning_move(board, &empty, marker)
            .or_else(|| winning_move(board, &empty, marker.opponent()))
            .or_else(|| empty.contains(&Position::CENTER).then_some(Position::CENTER))
            .or_else(|| {
                Position::CORNERS
                    .into_iter()
                    .find(|corner| empty.contains(corner))
            })
            .or_else(|| empty.first().copied())
    }
}
