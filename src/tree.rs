use crate::{Count, GameConfig, Move, Player};

/// Index of a node within its [`Tree`]. Only meaningful until the tree is cleared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A tree of search statistics. Every node owns a fixed table of child slots, one per possible
/// move (see [`Move::index`]). A slot is empty until the move is explored; we call filling it
/// "expansion". Nodes do not know which position they represent, callers replay moves from the
/// root to find out.
pub struct Tree {
    config: GameConfig,
    /// We store all the nodes of the tree in a vector to avoid allocations. We refer to the nodes
    /// using indices. The root is always the first node.
    nodes: Vec<Count>,
    /// Child slots of all nodes. Node `n` owns the `config.move_slots()` entries starting at
    /// `n * config.move_slots()`.
    children: Vec<Option<NodeId>>,
}

impl Tree {
    /// A tree consisting of an unvisited root without children.
    pub fn new(config: GameConfig) -> Self {
        let mut tree = Self {
            config,
            nodes: Vec::new(),
            children: Vec::new(),
        };
        tree.allocate();
        tree
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn count(&self, node: NodeId) -> &Count {
        &self.nodes[node.index()]
    }

    /// Account for one dive through `node`.
    pub fn report(&mut self, node: NodeId, to_move: Player, winner: Player) {
        self.nodes[node.index()].report(to_move, winner);
    }

    /// Child reached by playing `mv` in the position of `parent`, if explored.
    pub fn child(&self, parent: NodeId, mv: &Move) -> Option<NodeId> {
        self.children[self.slot(parent, mv)]
    }

    /// Child reached by placing `owner` on `(row, col)`. Only meaningful if the cell is empty in
    /// the position `parent` represents.
    pub fn get_child(
        &self,
        parent: NodeId,
        row: usize,
        col: usize,
        owner: Player,
    ) -> Option<NodeId> {
        self.child(parent, &Move::Place { row, col, owner })
    }

    /// Creates an unvisited node in the slot of `mv`. Panics if the slot is already taken.
    pub fn add_child(&mut self, parent: NodeId, mv: &Move) -> NodeId {
        let slot = self.slot(parent, mv);
        assert!(
            self.children[slot].is_none(),
            "move {mv} has already been expanded"
        );
        let child = self.allocate();
        self.children[slot] = Some(child);
        child
    }

    /// Explored children of `parent` together with the moves leading to them, in slot order.
    pub fn children(&self, parent: NodeId) -> impl Iterator<Item = (Move, NodeId)> + '_ {
        let config = &self.config;
        let begin = parent.index() * config.move_slots();
        self.children[begin..begin + config.move_slots()]
            .iter()
            .enumerate()
            .filter_map(move |(slot, child)| {
                child.map(|child| (Move::from_index(slot, config), child))
            })
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Discards every node and starts over with a fresh root. Nodes live in flat vectors, so
    /// teardown neither recurses nor frees nodes one by one. Capacity is kept for the next search.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.children.clear();
        self.allocate();
    }

    fn slot(&self, node: NodeId, mv: &Move) -> usize {
        node.index() * self.config.move_slots() + mv.index(&self.config)
    }

    fn allocate(&mut self) -> NodeId {
        let id = u32::try_from(self.nodes.len()).expect("search tree exceeds u32::MAX nodes");
        self.nodes.push(Count::default());
        self.children
            .resize(self.children.len() + self.config.move_slots(), None);
        NodeId(id)
    }
}
