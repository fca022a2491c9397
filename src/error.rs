use thiserror::Error;

/// Rejected game configuration. Reported before any search starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Board dimensions must be positive, got {width}x{height}")]
    ZeroDimension { width: usize, height: usize },

    #[error("Run length must be positive")]
    ZeroRunLength,

    #[error("Run length {run_length} exceeds both board dimensions {width}x{height}")]
    RunTooLong {
        run_length: usize,
        width: usize,
        height: usize,
    },

    #[error("Board of {cells} cells is too large to address its moves")]
    TooManyCells { cells: usize },

    #[error("Pass player {0} specified while passing is disabled")]
    PassPlayerWithoutPass(crate::Player),

    #[error("Passing is enabled but no pass player was specified")]
    MissingPassPlayer,
}

/// A textual or cell-wise board description did not fit the configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("Expected {expected} cells, found {found}")]
    CellCount { expected: usize, found: usize },

    #[error("Row {row} has {found} cells, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Unknown cell character {0:?}, expected '.', 'O' or 'X'")]
    UnknownCell(char),
}

/// Errors surfaced by [`crate::Search`] and [`crate::Driver`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("Terminal position cannot be searched")]
    TerminalPosition,

    #[error("Root node has no explored move to choose from")]
    NoExploredMove,

    #[error("Board or oracle was built for a different game configuration")]
    ConfigMismatch,
}

/// Errors while loading an oracle table.
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Failed to read oracle table: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid character {0:?} in oracle table, expected '0' or '1'")]
    InvalidDigit(char),

    #[error("Oracle table holds {found} states, expected {expected}")]
    TableLength { expected: usize, found: usize },

    #[error("A board of {cells} cells has too many states for a lookup table")]
    TooManyStates { cells: usize },
}
