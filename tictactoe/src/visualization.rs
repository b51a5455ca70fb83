use crate::{Board, Cell, Marker};

/// Draws the board in a box, with row and column indices.
///
/// ```text
///     0 1 2
///   ╭───────╮
/// 0 │ X · O │
/// 1 │ · X · │
/// 2 │ · · · │
///   ╰───────╯
/// ```
pub fn visualize_board(board: &Board) -> String {
    let mut result = String::from("    0 1 2\n  ╭───────╮");
    for (i, row) in board.rows().iter().enumerate() {
        result += &format!("\n{} │", i);
        for cell in row {
            result += match cell {
                Cell::Empty => " ·",
                Cell::Marker(Marker::X) => " X",
                Cell::Marker(Marker::O) => " O",
            };
        }
        result += " │";
    }
    result += "\n  ╰───────╯";
    result
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&visualize_board(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Position;

    #[test]
    fn draws_markers() {
        let board = Board::empty()
            .with(Position { row: 0, col: 0 }, Marker::X)
            .with(Position { row: 1, col: 2 }, Marker::O);
        let lines: Vec<String> = board.to_string().lines().map(String::from).collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[2], "0 │ X · · │");
        assert_eq!(lines[3], "1 │ · · O │");
        assert_eq!(lines[4], "2 │ · · · │");
    }
}
