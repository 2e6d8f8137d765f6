//! Error types shared by the document, projection and generation layers.

use thiserror::Error;

/// Failures that come from the outside world: reading or writing documents
/// and generated artifacts.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document has no dashboard root")]
    MissingRoot,
}

pub type Result<T> = std::result::Result<T, Error>;

/// A structural edit that was rejected. The edit is never partially applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("A grid needs at least one row")]
    LastRow,

    #[error("A grid needs at least one column")]
    LastColumn,

    #[error("A grid needs at least one cell")]
    LastCell,

    #[error("No neighbour {0} of the selected cell")]
    AtEdge(Direction),

    #[error("Index {index} is out of range (len {len})")]
    OutOfRange { index: usize, len: usize },

    #[error("Node is not a container")]
    NotAContainer,

    #[error("{0} cannot be placed in a grid cell")]
    NotPlaceable(String),
}

/// Grid projection failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("Layout is not grid compatible: {0}")]
    IncompatibleShape(String),
}

/// Neighbour direction used by swaps and selection moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// `(row, col)` delta.
    pub const fn delta(self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        f.write_str(s)
    }
}
