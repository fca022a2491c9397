use std::fmt;

use crate::{BoardError, GameConfig, Player};

/// Content of a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    Owned(Player),
}

impl Cell {
    fn to_char(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Owned(Player::Order) => 'O',
            Cell::Owned(Player::Chaos) => 'X',
        }
    }

    fn from_char(c: char) -> Result<Self, BoardError> {
        match c {
            '.' => Ok(Cell::Empty),
            'O' => Ok(Cell::Owned(Player::Order)),
            'X' => Ok(Cell::Owned(Player::Chaos)),
            other => Err(BoardError::UnknownCell(other)),
        }
    }
}

/// A move of either player: mark an empty cell with one of the two owners, or pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Move {
    Place { row: usize, col: usize, owner: Player },
    Pass,
}

impl Move {
    /// Slot of this move in a node's child table: `owner * W * H + row * W + col` for placements,
    /// the last slot for passing.
    pub fn index(&self, config: &GameConfig) -> usize {
        match *self {
            Move::Place { row, col, owner } => {
                owner.index() * config.cell_count() + row * config.width() + col
            }
            Move::Pass => 2 * config.cell_count(),
        }
    }

    /// Inverse of [`Move::index`].
    pub fn from_index(index: usize, config: &GameConfig) -> Move {
        let cells = config.cell_count();
        if index == 2 * cells {
            return Move::Pass;
        }
        let cell = index % cells;
        Move::Place {
            row: cell / config.width(),
            col: cell % config.width(),
            owner: Player::ALL[index / cells],
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Place { row, col, owner } => {
                write!(f, "({row},{col})={}", Cell::Owned(*owner).to_char())
            }
            Move::Pass => write!(f, "pass"),
        }
    }
}

/// Whether a board is decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameState {
    InProgress,
    WinOrder,
    WinChaos,
}

impl GameState {
    pub fn winner(&self) -> Option<Player> {
        match self {
            GameState::InProgress => None,
            GameState::WinOrder => Some(Player::Order),
            GameState::WinChaos => Some(Player::Chaos),
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self != GameState::InProgress
    }
}

impl From<Player> for GameState {
    fn from(winner: Player) -> Self {
        match winner {
            Player::Order => GameState::WinOrder,
            Player::Chaos => GameState::WinChaos,
        }
    }
}

/// Exact identification of a position as used by precomputed tables. `index` is the board read
/// as a base-3 number, cell `0` being the least significant digit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoardEncoding {
    pub index: u64,
    pub to_move: Player,
}

/// Steps along a row, a column and both diagonals. Every run is found from exactly one end.
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// A grid of cells, row-major. Cheap enough to clone for every hypothetical line of play.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Board {
    config: GameConfig,
    cells: Vec<Cell>,
}

impl Board {
    /// An empty board.
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            cells: vec![Cell::Empty; config.cell_count()],
        }
    }

    pub fn from_cells(config: GameConfig, cells: Vec<Cell>) -> Result<Self, BoardError> {
        if cells.len() != config.cell_count() {
            return Err(BoardError::CellCount {
                expected: config.cell_count(),
                found: cells.len(),
            });
        }
        Ok(Self { config, cells })
    }

    /// Parses rows of `.`, `O` (Order) and `X` (Chaos). Rows are separated by `/` or line breaks.
    pub fn parse(config: GameConfig, text: &str) -> Result<Self, BoardError> {
        let mut cells = Vec::with_capacity(config.cell_count());
        let rows = text
            .split(['/', '\n'])
            .map(str::trim)
            .filter(|row| !row.is_empty());
        for (row, line) in rows.enumerate() {
            let before = cells.len();
            for c in line.chars() {
                cells.push(Cell::from_char(c)?);
            }
            let found = cells.len() - before;
            if found != config.width() {
                return Err(BoardError::RowWidth {
                    row,
                    expected: config.width(),
                    found,
                });
            }
        }
        Self::from_cells(config, cells)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn at(&self, row: usize, col: usize) -> Cell {
        self.cells[row * self.config.width() + col]
    }

    /// `true` if a run of `run_length` equal, non-empty cells exists in any row, column or
    /// diagonal.
    pub fn is_ordered(&self) -> bool {
        self.has_run(Cell::Empty)
    }

    /// `true` if no way of filling the remaining empty cells could produce a run. Filling every
    /// empty cell with one owner can only add runs of that owner compared to any mixed filling, so
    /// it suffices to check the two monochromatic completions.
    pub fn is_guaranteed_chaos(&self) -> bool {
        Player::ALL
            .iter()
            .all(|&owner| !self.has_run(Cell::Owned(owner)))
    }

    pub fn game_over_state(&self) -> GameState {
        if self.is_ordered() {
            GameState::WinOrder
        } else if self.is_guaranteed_chaos() {
            GameState::WinChaos
        } else {
            GameState::InProgress
        }
    }

    pub fn can_move(&self, row: usize, col: usize) -> bool {
        self.at(row, col) == Cell::Empty
    }

    /// Marks an empty cell. Panics if the cell is occupied.
    pub fn place(&mut self, row: usize, col: usize, owner: Player) {
        assert!(
            self.can_move(row, col),
            "cell ({row},{col}) is already occupied"
        );
        self.cells[row * self.config.width() + col] = Cell::Owned(owner);
    }

    /// A copy of this board with the cell marked. Panics if the cell is occupied.
    pub fn after_move(&self, row: usize, col: usize, owner: Player) -> Board {
        let mut board = self.clone();
        board.place(row, col, owner);
        board
    }

    /// Applies a move. Passing leaves the board untouched. Precondition: the move must be legal.
    pub fn play(&mut self, mv: &Move) {
        if let Move::Place { row, col, owner } = *mv {
            self.place(row, col, owner);
        }
    }

    /// Fills `moves_buf` with every legal move for `to_move`, in enumeration order: row-major,
    /// owner `0` before owner `1`, passing last. Buffer is cleared first.
    pub fn legal_moves(&self, to_move: Player, moves_buf: &mut Vec<Move>) {
        moves_buf.clear();
        for row in 0..self.config.height() {
            for col in 0..self.config.width() {
                if self.can_move(row, col) {
                    moves_buf.extend(
                        Player::ALL
                            .iter()
                            .map(|&owner| Move::Place { row, col, owner }),
                    );
                }
            }
        }
        if self.config.can_pass(to_move) {
            moves_buf.push(Move::Pass);
        }
    }

    pub fn empty_cells(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell == Cell::Empty).count()
    }

    /// Base-3 encoding with `to_move` attached. `None` if the board has too many cells for the
    /// index to fit into a `u64`.
    pub fn encoding(&self, to_move: Player) -> Option<BoardEncoding> {
        let mut index: u64 = 0;
        for cell in self.cells.iter().rev() {
            let digit = match cell {
                Cell::Empty => 0,
                Cell::Owned(owner) => 1 + owner.index() as u64,
            };
            index = index.checked_mul(3)?.checked_add(digit)?;
        }
        Some(BoardEncoding { index, to_move })
    }

    /// Reads cells as if every empty one held `fill`.
    fn has_run(&self, fill: Cell) -> bool {
        let read = |row: usize, col: usize| match self.at(row, col) {
            Cell::Empty => fill,
            owned => owned,
        };
        let height = self.config.height() as isize;
        let width = self.config.width() as isize;
        let run_length = self.config.run_length() as isize;
        for row in 0..height {
            for col in 0..width {
                let first = read(row as usize, col as usize);
                if first == Cell::Empty {
                    continue;
                }
                for (d_row, d_col) in DIRECTIONS {
                    let end_row = row + d_row * (run_length - 1);
                    let end_col = col + d_col * (run_length - 1);
                    if !(0..height).contains(&end_row) || !(0..width).contains(&end_col) {
                        continue;
                    }
                    let complete = (1..run_length).all(|step| {
                        read((row + d_row * step) as usize, (col + d_col * step) as usize) == first
                    });
                    if complete {
                        return true;
                    }
                }
            }
        }
        false
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.config.width()) {
            for cell in row {
                write!(f, "{}", cell.to_char())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
