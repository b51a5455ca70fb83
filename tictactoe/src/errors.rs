use serde_json::Value;

/// The error type for turning a JSON value sent by the server into a game type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    UnknownMarker { value: String },
    UnknownCell { value: String },
    UnknownStatus { value: String },
    NotAGrid { value: String },
    WrongRowCount { found: usize },
    WrongColumnCount { row: usize, found: usize },
    MissingField { field: &'static str },
    InvalidField { field: &'static str, value: String },
}

impl std::error::Error for ParseError {}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::UnknownMarker { value } => write!(f, "Not a marker: {}", value),
            ParseError::UnknownCell { value } => write!(f, "Not a board cell: {}", value),
            ParseError::UnknownStatus { value } => write!(f, "Not a game status: {}", value),
            ParseError::NotAGrid { value } => {
                write!(f, "Expected the board as an array of rows, got {}", value)
            }
            ParseError::WrongRowCount { found } => {
                write!(f, "Expected 3 rows on the board, got {}", found)
            }
            ParseError::WrongColumnCount { row, found } => {
                write!(f, "Expected 3 cells in row {}, got {}", row, found)
            }
            ParseError::MissingField { field } => write!(f, "Missing field '{}'", field),
            ParseError::InvalidField { field, value } => {
                write!(f, "Field '{}' has an unexpected value: {}", field, value)
            }
        }
    }
}

/// Shortens a JSON value for use in error messages.
pub(crate) fn describe(value: &Value) -> String {
    const MAX_LEN: usize = 80;
    let mut text = value.to_string();
    if text.len() > MAX_LEN {
        let mut cut = MAX_LEN;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push('…');
    }
    text
}

/// A response line that is not a well-formed JSON-RPC response envelope.
#[derive(Debug)]
pub enum MalformedResponse {
    NotJson(serde_json::Error),
    NotAnObject { value: String },
    BothResultAndError,
    NeitherResultNorError,
    InvalidErrorObject(serde_json::Error),
}

impl std::error::Error for MalformedResponse {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MalformedResponse::NotJson(err) | MalformedResponse::InvalidErrorObject(err) => {
                Some(err)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for MalformedResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MalformedResponse::NotJson(_) => write!(f, "Response is not valid JSON"),
            MalformedResponse::NotAnObject { value } => {
                write!(f, "Response is not a JSON object: {}", value)
            }
            MalformedResponse::BothResultAndError => {
                write!(f, "Response contains both 'result' and 'error'")
            }
            MalformedResponse::NeitherResultNorError => {
                write!(f, "Response contains neither 'result' nor 'error'")
            }
            MalformedResponse::InvalidErrorObject(_) => {
                write!(f, "Response contains an 'error' member that is not an error object")
            }
        }
    }
}
