use std::io::Read;

use crate::{Board, BoardEncoding, GameConfig, GameState, OracleError, Player};

/// Answer of an [`Oracle`] about a position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Order,
    Chaos,
    /// The position is not covered.
    Unknown,
}

impl Verdict {
    pub fn winner(self) -> Option<Player> {
        match self {
            Verdict::Order => Some(Player::Order),
            Verdict::Chaos => Some(Player::Chaos),
            Verdict::Unknown => None,
        }
    }
}

impl From<Player> for Verdict {
    fn from(winner: Player) -> Self {
        match winner {
            Player::Order => Verdict::Order,
            Player::Chaos => Verdict::Chaos,
        }
    }
}

/// Exact, precomputed knowledge about who wins a position under perfect play. The search treats
/// any position with a known verdict like a finished game.
pub trait Oracle {
    fn lookup(&self, encoding: BoardEncoding) -> Verdict;

    /// `false` if the verdicts of this oracle are meaningless for boards of `config`. Encodings
    /// carry no dimensions, so the search refuses such an oracle up front.
    fn covers(&self, _config: &GameConfig) -> bool {
        true
    }
}

impl<O> Oracle for &O
where
    O: Oracle + ?Sized,
{
    fn lookup(&self, encoding: BoardEncoding) -> Verdict {
        (**self).lookup(encoding)
    }

    fn covers(&self, config: &GameConfig) -> bool {
        (**self).covers(config)
    }
}

/// Knows nothing. Searching with it relies on the board's own terminal test alone.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOracle;

impl Oracle for NoOracle {
    fn lookup(&self, _encoding: BoardEncoding) -> Verdict {
        Verdict::Unknown
    }
}

/// Winner of every state of a small board, one bit per state and player to move. A set bit means
/// Order wins. The tables are produced by an exhaustive retrograde solver outside this crate and
/// are only valid for the configuration (including the pass rule) they were solved for.
pub struct TableOracle {
    config: GameConfig,
    states: u64,
    order_to_move: Vec<u64>,
    chaos_to_move: Vec<u64>,
}

impl TableOracle {
    /// Parses the two tables from their textual bitset form: one `'0'` or `'1'` per state, the
    /// highest state index first. Whitespace is ignored.
    pub fn from_bitsets(
        config: GameConfig,
        order_to_move: &str,
        chaos_to_move: &str,
    ) -> Result<Self, OracleError> {
        let states = state_count(&config)?;
        Ok(Self {
            config,
            states,
            order_to_move: parse_bitset(order_to_move, states)?,
            chaos_to_move: parse_bitset(chaos_to_move, states)?,
        })
    }

    /// Like [`Self::from_bitsets`], reading both tables to the end first.
    pub fn from_readers(
        config: GameConfig,
        mut order_to_move: impl Read,
        mut chaos_to_move: impl Read,
    ) -> Result<Self, OracleError> {
        let mut order = String::new();
        order_to_move.read_to_string(&mut order)?;
        let mut chaos = String::new();
        chaos_to_move.read_to_string(&mut chaos)?;
        Self::from_bitsets(config, &order, &chaos)
    }
}

impl Oracle for TableOracle {
    fn lookup(&self, encoding: BoardEncoding) -> Verdict {
        if encoding.index >= self.states {
            return Verdict::Unknown;
        }
        let table = match encoding.to_move {
            Player::Order => &self.order_to_move,
            Player::Chaos => &self.chaos_to_move,
        };
        let index = encoding.index as usize;
        if table[index / 64] & (1 << (index % 64)) != 0 {
            Verdict::Order
        } else {
            Verdict::Chaos
        }
    }

    /// Only the exact configuration, pass rule included, the tables were solved for.
    fn covers(&self, config: &GameConfig) -> bool {
        self.config == *config
    }
}

/// Terminal state of `board`, or the oracle's verdict if the board itself is undecided.
pub(crate) fn judge(oracle: &impl Oracle, board: &Board, to_move: Player) -> GameState {
    let state = board.game_over_state();
    if state.is_terminal() {
        return state;
    }
    board
        .encoding(to_move)
        .and_then(|encoding| oracle.lookup(encoding).winner())
        .map_or(state, GameState::from)
}

fn state_count(config: &GameConfig) -> Result<u64, OracleError> {
    let cells = config.cell_count();
    u32::try_from(cells)
        .ok()
        .and_then(|exponent| 3u64.checked_pow(exponent))
        .filter(|&states| usize::try_from(states).is_ok())
        .ok_or(OracleError::TooManyStates { cells })
}

fn parse_bitset(text: &str, states: u64) -> Result<Vec<u64>, OracleError> {
    let expected = states as usize;
    let mut words = vec![0u64; expected.div_ceil(64)];
    let mut found = 0;
    for digit in text.chars().filter(|c| !c.is_whitespace()) {
        let set = match digit {
            '0' => false,
            '1' => true,
            other => return Err(OracleError::InvalidDigit(other)),
        };
        // The first digit belongs to the highest state index
        if set && found < expected {
            let index = expected - 1 - found;
            words[index / 64] |= 1 << (index % 64);
        }
        found += 1;
    }
    if found != expected {
        return Err(OracleError::TableLength { expected, found });
    }
    Ok(words)
}
