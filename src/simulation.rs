use rand::{Rng, seq::IndexedRandom as _};

use crate::{Board, Move, Oracle, Player, oracle::judge};

/// Play random moves, until the game is over and report the winner. Every legal move, passing
/// included, is equally likely. The tree is not involved.
///
/// # Parameters
///
/// * `moves_buf`: In order to avoid repeated allocations to store legal moves, callers supply a
///   buffer which is overwritten.
pub fn random_playout(
    mut board: Board,
    mut to_move: Player,
    oracle: &impl Oracle,
    moves_buf: &mut Vec<Move>,
    rng: &mut impl Rng,
) -> Player {
    loop {
        if let Some(winner) = judge(oracle, &board, to_move).winner() {
            break winner;
        }
        board.legal_moves(to_move, moves_buf);
        // An undecided board always has an empty cell, since a full board without a run is won
        // by Chaos.
        let selected_move = *moves_buf
            .choose(rng)
            .expect("undecided board must have legal moves");
        board.play(&selected_move);
        to_move.flip();
    }
}
