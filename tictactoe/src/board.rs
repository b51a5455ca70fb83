use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::errors::{describe, ParseError};

pub const BOARD_SIZE: usize = 3;

/// The symbol identifying a player's cells.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Marker {
    X,
    O,
}

impl Marker {
    pub fn opponent(self) -> Marker {
        match self {
            Marker::X => Marker::O,
            Marker::O => Marker::X,
        }
    }
}

impl std::fmt::Display for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Marker::X => write!(f, "X"),
            Marker::O => write!(f, "O"),
        }
    }
}

/// A single square of the board.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    Marker(Marker),
}

impl Cell {
    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }

    pub fn marker(self) -> Option<Marker> {
        match self {
            Cell::Empty => None,
            Cell::Marker(marker) => Some(marker),
        }
    }
}

impl From<Marker> for Cell {
    fn from(marker: Marker) -> Self {
        Cell::Marker(marker)
    }
}

/// The canonical encoding is the plain string form, `"Empty"`, `"X"` or `"O"`.
impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Empty => serializer.serialize_str("Empty"),
            Cell::Marker(marker) => marker.serialize(serializer),
        }
    }
}

/// Zero-based coordinates of a cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    /// Returns `None` if the coordinates are off the board.
    pub fn new(row: u8, col: u8) -> Option<Self> {
        ((row as usize) < BOARD_SIZE && (col as usize) < BOARD_SIZE).then_some(Self { row, col })
    }

    /// All positions in row-major order.
    pub fn all() -> impl Iterator<Item = Position> {
        (0..BOARD_SIZE as u8)
            .flat_map(|row| (0..BOARD_SIZE as u8).map(move |col| Position { row, col }))
    }

    pub const CENTER: Position = Position { row: 1, col: 1 };

    pub const CORNERS: [Position; 4] = [
        Position { row: 0, col: 0 },
        Position { row: 0, col: 2 },
        Position { row: 2, col: 0 },
        Position { row: 2, col: 2 },
    ];
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

const fn pos(row: u8, col: u8) -> Position {
    Position { row, col }
}

/// The eight rows, columns and diagonals that win the game.
pub const LINES: [[Position; 3]; 8] = [
    [pos(0, 0), pos(0, 1), pos(0, 2)],
    [pos(1, 0), pos(1, 1), pos(1, 2)],
    [pos(2, 0), pos(2, 1), pos(2, 2)],
    [pos(0, 0), pos(1, 0), pos(2, 0)],
    [pos(0, 1), pos(1, 1), pos(2, 1)],
    [pos(0, 2), pos(1, 2), pos(2, 2)],
    [pos(0, 0), pos(1, 1), pos(2, 2)],
    [pos(0, 2), pos(1, 1), pos(2, 0)],
];

/// The 3x3 grid, as last reported by the server.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    pub fn new(cells: [[Cell; BOARD_SIZE]; BOARD_SIZE]) -> Self {
        Self { cells }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, pos: Position) -> Cell {
        self.cells[pos.row as usize][pos.col as usize]
    }

    pub fn set(&mut self, pos: Position, cell: Cell) {
        self.cells[pos.row as usize][pos.col as usize] = cell;
    }

    /// Returns a copy of the board with `marker` placed at `pos`.
    pub fn with(&self, pos: Position, marker: Marker) -> Board {
        let mut board = *self;
        board.set(pos, Cell::Marker(marker));
        board
    }

    pub fn rows(&self) -> &[[Cell; BOARD_SIZE]; BOARD_SIZE] {
        &self.cells
    }

    /// The empty positions, in row-major order.
    pub fn empty_positions(&self) -> Vec<Position> {
        Position::all().filter(|&pos| self.get(pos).is_empty()).collect()
    }

    pub fn is_full(&self) -> bool {
        Position::all().all(|pos| !self.get(pos).is_empty())
    }

    pub fn count(&self, marker: Marker) -> usize {
        Position::all()
            .filter(|&pos| self.get(pos) == Cell::Marker(marker))
            .count()
    }

    /// The marker that moves next, assuming X opened the game.
    pub fn next_marker(&self) -> Marker {
        if self.count(Marker::X) > self.count(Marker::O) {
            Marker::O
        } else {
            Marker::X
        }
    }

    /// The marker owning a complete line, if any.
    pub fn winner(&self) -> Option<Marker> {
        LINES.iter().find_map(|line| {
            let first = self.get(line[0]).marker()?;
            line.iter()
                .all(|&p| self.get(p) == Cell::Marker(first))
                .then_some(first)
        })
    }
}

pub fn parse_marker(raw: &Value) -> Result<Marker, ParseError> {
    match unit_variant_name(raw) {
        Some("X") => Ok(Marker::X),
        Some("O") => Ok(Marker::O),
        _ => Err(ParseError::UnknownMarker {
            value: describe(raw),
        }),
    }
}

/// Accepts both `"X"` and `{"X": null}` (and likewise for `Empty` and `O`).
pub fn parse_cell(raw: &Value) -> Result<Cell, ParseError> {
    match unit_variant_name(raw) {
        Some("Empty") => Ok(Cell::Empty),
        Some("X") => Ok(Cell::Marker(Marker::X)),
        Some("O") => Ok(Cell::Marker(Marker::O)),
        _ => Err(ParseError::UnknownCell {
            value: describe(raw),
        }),
    }
}

pub fn parse_board(raw: &Value) -> Result<Board, ParseError> {
    let rows = raw.as_array().ok_or_else(|| ParseError::NotAGrid {
        value: describe(raw),
    })?;
    if rows.len() != BOARD_SIZE {
        return Err(ParseError::WrongRowCount { found: rows.len() });
    }
    let mut board = Board::empty();
    for (row_idx, row) in rows.iter().enumerate() {
        let cells = row.as_array().ok_or_else(|| ParseError::NotAGrid {
            value: describe(row),
        })?;
        if cells.len() != BOARD_SIZE {
            return Err(ParseError::WrongColumnCount {
                row: row_idx,
                found: cells.len(),
            });
        }
        for (col_idx, cell) in cells.iter().enumerate() {
            board.cells[row_idx][col_idx] = parse_cell(cell)?;
        }
    }
    Ok(board)
}

/// The name of a unit enum variant, in either of the two encodings servers use:
/// a bare string, or an object with a single key mapped to null.
pub(crate) fn unit_variant_name(raw: &Value) -> Option<&str> {
    match raw {
        Value::String(name) => Some(name.as_str()),
        Value::Object(map) if map.len() == 1 => {
            let (name, payload) = map.iter().next()?;
            payload.is_null().then_some(name.as_str())
        }
        _ => None,
    }
}

macro_rules! deserialize_with {
    ($ty:ty, $parse:path) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = Value::deserialize(deserializer)?;
                $parse(&raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

deserialize_with!(Marker, parse_marker);
deserialize_with!(Cell, parse_cell);
deserialize_with!(Board, parse_board);
