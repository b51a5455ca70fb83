use crate::{Board, Cell, GameStatus, Marker, Position};

impl quickcheck::Arbitrary for Marker {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        *g.choose(&[Marker::X, Marker::O]).unwrap()
    }
}

impl quickcheck::Arbitrary for Cell {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        *g.choose(&[Cell::Empty, Cell::Marker(Marker::X), Cell::Marker(Marker::O)])
            .unwrap()
    }
}

impl quickcheck::Arbitrary for Board {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        let mut board = Board::empty();
        for pos in Position::all() {
            board.set(pos, Cell::arbitrary(g));
        }
        board
    }
}

impl quickcheck::Arbitrary for GameStatus {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        match u8::arbitrary(g) % 3 {
            0 => GameStatus::InProgress,
            1 => GameStatus::Draw,
            _ => GameStatus::Won(Marker::arbitrary(g)),
        }
    }
}
