use crate::Player;

/// Accumulated outcomes of the dives which passed through a node.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Count {
    /// Number of dives through this node.
    pub visits: u32,
    /// Number of those dives won by the player whose turn it is at this node.
    pub to_move_wins: u32,
}

impl Count {
    /// Account for one more dive through the node.
    pub fn report(&mut self, to_move: Player, winner: Player) {
        self.visits += 1;
        if to_move == winner {
            self.to_move_wins += 1;
        }
    }

    /// Win rate of the player who chose to enter this node. That is the opponent of the player to
    /// move here, so it is the complement of the recorded win rate. Panics for unvisited nodes.
    pub fn score(&self) -> f64 {
        assert!(self.visits > 0, "scored a node without visits");
        f64::from(self.visits - self.to_move_wins) / f64::from(self.visits)
    }

    /// Upper confidence bound. Used to select which child to descend into. Formula balances
    /// exploration with exploitation.
    pub fn ucb(&self, total_visits_parent: u32) -> f64 {
        self.score()
            + (2.0 * f64::from(total_visits_parent).ln() / f64::from(self.visits)).sqrt()
    }
}

/// How to rate a child from the point of view of the player choosing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoreRule {
    /// Upper confidence bound. Used while descending the tree.
    Exploring,
    /// Plain win rate. Used to commit to a real move once the search is done.
    Greedy,
}

impl ScoreRule {
    pub fn score(self, child: &Count, parent: &Count) -> f64 {
        match self {
            ScoreRule::Exploring => child.ucb(parent.visits),
            ScoreRule::Greedy => child.score(),
        }
    }
}
