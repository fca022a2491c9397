use std::fmt;

/// One of the two sides of the game. Both sides place marks of either owner, so the same type
/// names whose turn it is and whose mark occupies a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Player {
    /// Wins as soon as a run of the configured length appears on the board.
    Order,
    /// Wins once no completion of the board can contain a run.
    Chaos,
}

impl Player {
    /// Both owners in enumeration order. Owner `0` is [`Player::Chaos`].
    pub const ALL: [Player; 2] = [Player::Chaos, Player::Order];

    /// Turn player [`Player::Order`] into [`Player::Chaos`] and vice versa.
    pub fn flip(&mut self) {
        *self = self.other();
    }

    /// Yield the other player.
    pub fn other(&self) -> Player {
        match self {
            Player::Order => Player::Chaos,
            Player::Chaos => Player::Order,
        }
    }

    /// Position of this owner in [`Player::ALL`]. Used for move addressing and board encoding.
    pub fn index(self) -> usize {
        match self {
            Player::Chaos => 0,
            Player::Order => 1,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::Order => write!(f, "Order"),
            Player::Chaos => write!(f, "Chaos"),
        }
    }
}
