use rand::Rng;
use tracing::debug;

use crate::{Board, Count, Move, NoOracle, Oracle, Player, Search, SearchError};

/// One real move of a finished game.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveRecord {
    /// Player who made the move.
    pub player: Player,
    pub mv: Move,
    /// Statistics of the chosen root child at the time the move was committed.
    pub count: Count,
}

/// Outcome of [`Driver::play`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameRecord {
    pub winner: Player,
    /// Position at the end of the game. Always terminal.
    pub board: Board,
    pub moves: Vec<MoveRecord>,
}

/// Plays whole games in which both sides pick their moves by searching with a fixed number of
/// dives. The tree is discarded after every real move, so no statistics carry over.
pub struct Driver<O = NoOracle> {
    dives: u32,
    oracle: O,
}

impl Driver<NoOracle> {
    pub fn new(dives: u32) -> Self {
        Self::with_oracle(dives, NoOracle)
    }
}

impl<O> Driver<O>
where
    O: Oracle,
{
    pub fn with_oracle(dives: u32, oracle: O) -> Self {
        Self { dives, oracle }
    }

    /// Plays from `board` until the board itself is terminal. A board which is already terminal
    /// yields a record without moves.
    pub fn play(
        &self,
        board: Board,
        to_move: Player,
        rng: &mut impl Rng,
    ) -> Result<GameRecord, SearchError> {
        self.play_with(board, to_move, rng, |_, _| ())
    }

    /// Like [`Self::play`], but invokes `inspect` with the finished search of each real move
    /// before its tree is discarded.
    pub fn play_with(
        &self,
        mut board: Board,
        mut to_move: Player,
        rng: &mut impl Rng,
        mut inspect: impl FnMut(&Search<&O>, &MoveRecord),
    ) -> Result<GameRecord, SearchError> {
        let mut moves = Vec::new();
        let mut search: Option<Search<&O>> = None;
        let winner = loop {
            if let Some(winner) = board.game_over_state().winner() {
                break winner;
            }
            let current = match search.take() {
                Some(mut previous) => {
                    previous.restart(board.clone(), to_move)?;
                    previous
                }
                None => Search::with_oracle(board.clone(), to_move, &self.oracle)?,
            };
            let current = search.insert(current);

            current.dives(self.dives, rng);
            let (mv, count) = current.best()?;
            debug!(
                player = %to_move,
                %mv,
                visits = count.visits,
                to_move_wins = count.to_move_wins,
                nodes = current.num_nodes(),
                "real move"
            );
            let record = MoveRecord {
                player: to_move,
                mv,
                count,
            };
            inspect(current, &record);
            moves.push(record);

            board.play(&mv);
            to_move.flip();
        };
        Ok(GameRecord {
            winner,
            board,
            moves,
        })
    }
}
