use std::fmt;

use rand::{Rng, seq::IndexedRandom as _};
use tracing::trace;

use crate::{
    Board, Count, Move, NoOracle, Oracle, Player, ScoreRule, SearchError,
    oracle::judge,
    simulation::random_playout,
    tree::{NodeId, Tree},
};

/// Search for the best move in one position. Only the root position is stored, positions of
/// other nodes are reconstructed by replaying moves during each dive. The statistics of every
/// node are updated during each dive.
pub struct Search<O = NoOracle> {
    /// Position of the root node.
    board: Board,
    /// Player whose turn it is at the root.
    to_move: Player,
    tree: Tree,
    /// Consulted for every position below the root.
    oracle: O,
    /// A buffer we use to store legal moves during selection, expansion and playout. We have this
    /// as a member to avoid repeated allocation.
    move_buf: Vec<Move>,
    /// In order to choose a child node to expand at random, we (re)use this buffer in order to
    /// avoid its repeated allocation.
    candidate_buf: Vec<Move>,
}

impl Search<NoOracle> {
    pub fn new(board: Board, to_move: Player) -> Result<Self, SearchError> {
        Self::with_oracle(board, to_move, NoOracle)
    }

    pub fn with_dives(
        board: Board,
        to_move: Player,
        num_dives: u32,
        rng: &mut impl Rng,
    ) -> Result<Self, SearchError> {
        let mut search = Self::new(board, to_move)?;
        search.dives(num_dives, rng);
        Ok(search)
    }
}

impl<O> Search<O>
where
    O: Oracle,
{
    /// Fails with [`SearchError::TerminalPosition`] if the game is already decided at `board`, and
    /// with [`SearchError::ConfigMismatch`] if `oracle` does not cover the board's configuration.
    pub fn with_oracle(board: Board, to_move: Player, oracle: O) -> Result<Self, SearchError> {
        if !oracle.covers(board.config()) {
            return Err(SearchError::ConfigMismatch);
        }
        if board.game_over_state().is_terminal() {
            return Err(SearchError::TerminalPosition);
        }
        let tree = Tree::new(*board.config());
        Ok(Self {
            board,
            to_move,
            tree,
            oracle,
            move_buf: Vec::new(),
            candidate_buf: Vec::new(),
        })
    }

    /// Discards the whole tree and starts over from a new root position. The new board must share
    /// the configuration of the previous one.
    pub fn restart(&mut self, board: Board, to_move: Player) -> Result<(), SearchError> {
        if board.config() != self.tree.config() {
            return Err(SearchError::ConfigMismatch);
        }
        if board.game_over_state().is_terminal() {
            return Err(SearchError::TerminalPosition);
        }
        self.tree.clear();
        self.board = board;
        self.to_move = to_move;
        Ok(())
    }

    pub fn dives(&mut self, num_dives: u32, rng: &mut impl Rng) {
        for _ in 0..num_dives {
            self.dive(rng);
        }
    }

    /// One cycle of selection, expansion, simulation and backpropagation. Returns the winner of
    /// the simulated game.
    pub fn dive(&mut self, rng: &mut impl Rng) -> Player {
        let Selection {
            mut path,
            board,
            mut to_move,
            winner,
        } = self.select();

        let (winner, expanded) = match winner {
            Some(winner) => (winner, false),
            None => {
                let mut board = board;
                let parent = *path.last().expect("path always contains the root");
                let child = self.expand(parent, &mut board, to_move, rng);
                path.push(child);
                to_move.flip();
                let winner =
                    random_playout(board, to_move, &self.oracle, &mut self.move_buf, rng);
                (winner, true)
            }
        };
        trace!(depth = path.len(), expanded, %winner, "dive");

        self.backpropagation(&path, winner);
        winner
    }

    /// The root's explored move with the highest win rate for the player to move. Ties go to the
    /// move enumerated first.
    pub fn best_move(&self) -> Result<Move, SearchError> {
        self.best().map(|(mv, _)| mv)
    }

    /// Like [`Self::best_move`], together with the statistics of the chosen child.
    pub fn best(&self) -> Result<(Move, Count), SearchError> {
        let mut moves = Vec::new();
        self.board.legal_moves(self.to_move, &mut moves);
        best_explored_child(&self.tree, self.tree.root(), &moves, ScoreRule::Greedy)
            .map(|(mv, child)| (mv, *self.tree.count(child)))
            .ok_or(SearchError::NoExploredMove)
    }

    /// Statistics of the root's explored children.
    pub fn eval_by_move(&self) -> impl Iterator<Item = (Move, Count)> + '_ {
        self.tree
            .children(self.tree.root())
            .map(|(mv, child)| (mv, *self.tree.count(child)))
    }

    /// Statistics of a single explored root move.
    pub fn eval_of(&self, mv: &Move) -> Option<Count> {
        self.tree
            .child(self.tree.root(), mv)
            .map(|child| *self.tree.count(child))
    }

    /// Accumulated outcomes of all dives, from the perspective of the player to move at the root.
    pub fn evaluation(&self) -> Count {
        *self.tree.count(self.tree.root())
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn to_move(&self) -> Player {
        self.to_move
    }

    pub fn num_nodes(&self) -> usize {
        self.tree.num_nodes()
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Human readable dump of the tree. Children with fewer than `min_visits` visits are only
    /// summarised.
    pub fn statistics(&self, min_visits: u32) -> Statistics<'_> {
        Statistics {
            tree: &self.tree,
            min_visits,
        }
    }

    /// Descends from the root, choosing the child with the best upper confidence bound, until it
    /// reaches either a decided position or a node with an unexplored legal move.
    fn select(&mut self) -> Selection {
        let mut node = self.tree.root();
        let mut board = self.board.clone();
        let mut to_move = self.to_move;
        let mut path = vec![node];
        loop {
            // The root is undecided by construction and never short-circuited by the oracle
            if path.len() > 1 {
                if let Some(winner) = judge(&self.oracle, &board, to_move).winner() {
                    return Selection {
                        path,
                        board,
                        to_move,
                        winner: Some(winner),
                    };
                }
            }
            board.legal_moves(to_move, &mut self.move_buf);
            if self
                .move_buf
                .iter()
                .any(|mv| self.tree.child(node, mv).is_none())
            {
                return Selection {
                    path,
                    board,
                    to_move,
                    winner: None,
                };
            }
            let (mv, child) =
                best_explored_child(&self.tree, node, &self.move_buf, ScoreRule::Exploring)
                    .expect("undecided position must have legal moves");
            board.play(&mv);
            to_move.flip();
            path.push(child);
            node = child;
        }
    }

    /// Creates a child for one of the unexplored legal moves of `parent`, chosen uniformly at
    /// random. Mutates `board` to represent the position of the new child.
    ///
    /// # Return
    ///
    /// Index of the newly created child node.
    fn expand(
        &mut self,
        parent: NodeId,
        board: &mut Board,
        to_move: Player,
        rng: &mut impl Rng,
    ) -> NodeId {
        board.legal_moves(to_move, &mut self.move_buf);
        self.candidate_buf.clear();
        self.candidate_buf.extend(
            self.move_buf
                .iter()
                .filter(|mv| self.tree.child(parent, mv).is_none())
                .copied(),
        );
        let mv = *self
            .candidate_buf
            .choose(rng)
            .expect("node selected for expansion must have an unexplored legal move");
        board.play(&mv);
        self.tree.add_child(parent, &mv)
    }

    /// Counts the dive for every node on the path. Turns alternate starting with the player to
    /// move at the root.
    fn backpropagation(&mut self, path: &[NodeId], winner: Player) {
        let mut to_move = self.to_move;
        for &node in path {
            self.tree.report(node, to_move, winner);
            to_move.flip();
        }
    }
}

/// Best explored child of `node` among `moves`. Only strictly better scores replace the
/// incumbent, so ties are won by the earlier move.
fn best_explored_child(
    tree: &Tree,
    node: NodeId,
    moves: &[Move],
    rule: ScoreRule,
) -> Option<(Move, NodeId)> {
    let parent = tree.count(node);
    let mut best: Option<(f64, Move, NodeId)> = None;
    for mv in moves {
        let Some(child) = tree.child(node, mv) else {
            continue;
        };
        let score = rule.score(tree.count(child), parent);
        if best.is_none_or(|(best_score, _, _)| score > best_score) {
            best = Some((score, *mv, child));
        }
    }
    best.map(|(_, mv, child)| (mv, child))
}

/// Result of [`Search::select`]. Provides the input for expansion and backpropagation.
struct Selection {
    /// Nodes from the root to the last node reached.
    path: Vec<NodeId>,
    /// Position of the last node of the path.
    board: Board,
    /// Player whose turn it is at the last node of the path.
    to_move: Player,
    /// Winner if the last node is decided. `None` if it still has an unexplored legal move, in
    /// which case it must be expanded.
    winner: Option<Player>,
}

/// See [`Search::statistics`].
pub struct Statistics<'a> {
    tree: &'a Tree,
    min_visits: u32,
}

impl Statistics<'_> {
    fn write_children(
        &self,
        f: &mut fmt::Formatter<'_>,
        node: NodeId,
        depth: usize,
    ) -> fmt::Result {
        let indent = " ".repeat(depth);
        let (frequent, rare): (Vec<_>, Vec<_>) = self
            .tree
            .children(node)
            .partition(|&(_, child)| self.tree.count(child).visits >= self.min_visits);
        if !rare.is_empty() {
            write!(f, "{indent}")?;
            for (_, child) in rare {
                let count = self.tree.count(child);
                write!(f, "{}:{} ", count.to_move_wins, count.visits)?;
            }
            writeln!(f)?;
        }
        for (mv, child) in frequent {
            let count = self.tree.count(child);
            writeln!(
                f,
                "{indent}{mv} {}:{} ({:.3})",
                count.to_move_wins,
                count.visits,
                f64::from(count.to_move_wins) / f64::from(count.visits)
            )?;
            self.write_children(f, child, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Statistics<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let root = self.tree.root();
        let count = self.tree.count(root);
        writeln!(f, "{}:{}", count.to_move_wins, count.visits)?;
        self.write_children(f, root, 1)
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng as _, rngs::StdRng};

    use crate::{BoardEncoding, GameConfig, PassRule, TableOracle, Verdict};

    use super::*;

    fn line3() -> GameConfig {
        GameConfig::new(3, 1, 3).unwrap()
    }

    fn place(row: usize, col: usize, owner: Player) -> Move {
        Move::Place { row, col, owner }
    }

    /// Visits every node reachable from the root.
    fn all_nodes(tree: &Tree) -> Vec<NodeId> {
        let mut nodes = vec![tree.root()];
        let mut i = 0;
        while i < nodes.len() {
            let children: Vec<_> = tree.children(nodes[i]).map(|(_, child)| child).collect();
            nodes.extend(children);
            i += 1;
        }
        nodes
    }

    #[test]
    fn refuse_terminal_position() {
        let board = Board::parse(line3(), "O.X").unwrap();
        assert_eq!(
            Some(SearchError::TerminalPosition),
            Search::new(board, Player::Order).err()
        );
    }

    #[test]
    fn no_move_without_dives() {
        let search = Search::new(Board::new(line3()), Player::Order).unwrap();
        assert_eq!(Err(SearchError::NoExploredMove), search.best_move());
    }

    #[test]
    fn first_dives_expand_root_children() {
        let mut rng = StdRng::seed_from_u64(42);
        // Chaos to move: marking the last cell `X` completes a run, marking it `O` fills the board
        let board = Board::parse(line3(), "XX.").unwrap();
        let search = Search::with_dives(board, Player::Chaos, 2, &mut rng).unwrap();

        assert_eq!(
            Count {
                visits: 2,
                to_move_wins: 1
            },
            search.evaluation()
        );
        assert_eq!(
            Some(Count {
                visits: 1,
                to_move_wins: 1
            }),
            search.eval_of(&place(0, 2, Player::Chaos))
        );
        assert_eq!(
            Some(Count {
                visits: 1,
                to_move_wins: 0
            }),
            search.eval_of(&place(0, 2, Player::Order))
        );
        assert_eq!(3, search.num_nodes());
    }

    #[test]
    fn terminal_node_is_reused_without_expansion() {
        let mut rng = StdRng::seed_from_u64(42);
        let board = Board::parse(line3(), "XX.").unwrap();
        let mut search = Search::with_dives(board, Player::Chaos, 2, &mut rng).unwrap();

        // Both children are terminal. The one won by Chaos scores higher and is descended into.
        let winner = search.dive(&mut rng);

        assert_eq!(Player::Chaos, winner);
        assert_eq!(3, search.num_nodes());
        assert_eq!(
            Some(Count {
                visits: 2,
                to_move_wins: 0
            }),
            search.eval_of(&place(0, 2, Player::Order))
        );
        assert_eq!(Ok(place(0, 2, Player::Order)), search.best_move());
    }

    #[test]
    fn visits_add_up_after_many_dives() {
        let mut rng = StdRng::seed_from_u64(42);
        let config = GameConfig::new(3, 3, 3).unwrap();
        let num_dives = 500;
        let search =
            Search::with_dives(Board::new(config), Player::Order, num_dives, &mut rng).unwrap();

        assert_eq!(num_dives, search.evaluation().visits);
        let child_visits: u32 = search.eval_by_move().map(|(_, count)| count.visits).sum();
        assert_eq!(num_dives, child_visits);
        for node in all_nodes(search.tree()) {
            let count = search.tree().count(node);
            assert!(count.visits > 0);
            assert!(count.to_move_wins <= count.visits);
        }
        // Every dive creates at most one node
        assert!(search.num_nodes() <= num_dives as usize + 1);
    }

    #[test]
    fn dive_updates_exactly_the_selected_path() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = GameConfig::new(3, 3, 3).unwrap();
        let mut search =
            Search::with_dives(Board::new(config), Player::Order, 200, &mut rng).unwrap();

        let before: Vec<Count> = (0..search.num_nodes())
            .map(|i| *search.tree().count(NodeId(i as u32)))
            .collect();
        let winner = search.dive(&mut rng);

        // Walk down the nodes whose visits changed and check each was credited correctly
        let mut node = search.tree().root();
        let mut to_move = Player::Order;
        loop {
            let after = *search.tree().count(node);
            let old = before.get(node.0 as usize).copied().unwrap_or_default();
            assert_eq!(old.visits + 1, after.visits);
            let won = u32::from(to_move == winner);
            assert_eq!(old.to_move_wins + won, after.to_move_wins);

            let next = search.tree().children(node).map(|(_, child)| child).find(|&child| {
                let old = before.get(child.0 as usize).copied().unwrap_or_default();
                search.tree().count(child).visits != old.visits
            });
            match next {
                Some(child) => {
                    node = child;
                    to_move.flip();
                }
                None => break,
            }
        }
    }

    #[test]
    fn selected_path_replays_to_selected_board() {
        let mut rng = StdRng::seed_from_u64(42);
        let config = GameConfig::new(3, 3, 3)
            .unwrap()
            .with_pass(PassRule::Enabled(Player::Chaos));
        let mut search =
            Search::with_dives(Board::new(config), Player::Chaos, 300, &mut rng).unwrap();

        for _ in 0..20 {
            let selection = search.select();
            let mut board = search.board().clone();
            let mut node = search.tree().root();
            let mut to_move = search.to_move();
            assert_eq!(node, selection.path[0]);
            for &next in &selection.path[1..] {
                let (mv, _) = search
                    .tree()
                    .children(node)
                    .find(|&(_, child)| child == next)
                    .expect("path must follow tree edges");
                let mut legal = Vec::new();
                board.legal_moves(to_move, &mut legal);
                assert!(legal.contains(&mv));
                board.play(&mv);
                to_move.flip();
                node = next;
            }
            assert_eq!(selection.board, board);
            assert_eq!(selection.to_move, to_move);
            search.dive(&mut rng);
        }
    }

    /// Tree for the empty 3x1 board with Order to move and Order allowed to pass. Every root move
    /// is explored once and the child reached by `winning_move` (if any) is the only one Order won.
    fn root_children_with_one_visit(winning_move: Option<Move>) -> (Tree, Vec<Move>) {
        let config = line3().with_pass(PassRule::Enabled(Player::Order));
        let mut moves = Vec::new();
        Board::new(config).legal_moves(Player::Order, &mut moves);
        let mut tree = Tree::new(config);
        let root = tree.root();
        for mv in &moves {
            let child = tree.add_child(root, mv);
            let winner = if Some(*mv) == winning_move {
                Player::Order
            } else {
                Player::Chaos
            };
            tree.report(root, Player::Order, winner);
            tree.report(child, Player::Chaos, winner);
        }
        (tree, moves)
    }

    #[test]
    fn ties_go_to_first_enumerated_move() {
        let (tree, moves) = root_children_with_one_visit(None);
        assert_eq!(Some(&Move::Pass), moves.last());

        for rule in [ScoreRule::Greedy, ScoreRule::Exploring] {
            let (mv, _) = best_explored_child(&tree, tree.root(), &moves, rule).unwrap();
            assert_eq!(place(0, 0, Player::Chaos), mv);
        }
    }

    #[test]
    fn pass_is_chosen_only_when_strictly_better() {
        let (tree, moves) = root_children_with_one_visit(Some(Move::Pass));

        for rule in [ScoreRule::Greedy, ScoreRule::Exploring] {
            let (mv, child) = best_explored_child(&tree, tree.root(), &moves, rule).unwrap();
            assert_eq!(Move::Pass, mv);
            assert_eq!(Some(child), tree.child(tree.root(), &Move::Pass));
        }
    }

    #[test]
    fn unexplored_moves_are_skipped() {
        let (tree, _) = root_children_with_one_visit(None);
        let unexplored = Tree::new(*tree.config());
        let moves = [place(0, 1, Player::Order), Move::Pass];

        assert_eq!(
            None,
            best_explored_child(&unexplored, unexplored.root(), &moves, ScoreRule::Greedy)
        );
        let (mv, _) =
            best_explored_child(&tree, tree.root(), &moves, ScoreRule::Greedy).unwrap();
        assert_eq!(place(0, 1, Player::Order), mv);
    }

    #[test]
    fn pass_is_explored_by_pass_player() {
        let mut rng = StdRng::seed_from_u64(42);
        let config = line3().with_pass(PassRule::Enabled(Player::Chaos));
        let board = Board::parse(config, "XX.").unwrap();
        let search = Search::with_dives(board, Player::Chaos, 3, &mut rng).unwrap();

        let moves: Vec<_> = search.eval_by_move().map(|(mv, _)| mv).collect();
        assert_eq!(3, moves.len());
        assert!(moves.contains(&Move::Pass));
    }

    #[test]
    fn restart_discards_tree() {
        let mut rng = StdRng::seed_from_u64(42);
        let config = GameConfig::new(3, 3, 3).unwrap();
        let mut search =
            Search::with_dives(Board::new(config), Player::Order, 100, &mut rng).unwrap();
        assert!(search.num_nodes() > 1);

        let next = Board::new(config).after_move(1, 1, Player::Order);
        search.restart(next.clone(), Player::Chaos).unwrap();

        assert_eq!(1, search.num_nodes());
        assert_eq!(Count::default(), search.evaluation());
        assert_eq!(0, search.eval_by_move().count());
        assert_eq!(&next, search.board());
        assert_eq!(Player::Chaos, search.to_move());
    }

    #[test]
    fn restart_rejects_foreign_configuration() {
        let mut search = Search::new(Board::new(line3()), Player::Order).unwrap();
        let other = Board::new(GameConfig::new(3, 3, 3).unwrap());
        assert_eq!(
            Err(SearchError::ConfigMismatch),
            search.restart(other, Player::Order)
        );
    }

    #[test]
    fn refuse_oracle_solved_for_other_board() {
        let small = GameConfig::new(2, 1, 2).unwrap();
        let oracle = TableOracle::from_bitsets(small, &"0".repeat(9), &"0".repeat(9)).unwrap();
        let board = Board::parse(GameConfig::new(3, 3, 3).unwrap(), "O../.../...").unwrap();

        assert_eq!(
            Some(SearchError::ConfigMismatch),
            Search::with_oracle(board, Player::Chaos, &oracle).err()
        );
    }

    #[test]
    fn oracle_verdicts_end_dives_below_root() {
        struct ChaosAlwaysWins;

        impl Oracle for ChaosAlwaysWins {
            fn lookup(&self, _encoding: BoardEncoding) -> Verdict {
                Verdict::Chaos
            }
        }

        let mut rng = StdRng::seed_from_u64(42);
        let mut search =
            Search::with_oracle(Board::new(line3()), Player::Order, ChaosAlwaysWins).unwrap();
        search.dives(50, &mut rng);

        // Six root moves, each decided by the oracle right away
        assert_eq!(7, search.num_nodes());
        assert_eq!(
            Count {
                visits: 50,
                to_move_wins: 0
            },
            search.evaluation()
        );
    }

    #[test]
    fn statistics_lists_root_and_frequent_children() {
        let mut rng = StdRng::seed_from_u64(42);
        let board = Board::parse(line3(), "XX.").unwrap();
        let search = Search::with_dives(board, Player::Chaos, 10, &mut rng).unwrap();

        let dump = search.statistics(2).to_string();
        let root = search.evaluation();
        assert!(dump.starts_with(&format!("{}:{}\n", root.to_move_wins, root.visits)));
        assert!(dump.contains("(0,2)=O"));
    }
}
