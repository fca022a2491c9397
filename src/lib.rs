mod board;
mod config;
mod count;
mod driver;
mod error;
mod oracle;
mod player;
mod search;
mod simulation;
mod tree;

pub use self::{
    board::{Board, BoardEncoding, Cell, GameState, Move},
    config::{GameConfig, PassRule},
    count::{Count, ScoreRule},
    driver::{Driver, GameRecord, MoveRecord},
    error::{BoardError, ConfigError, OracleError, SearchError},
    oracle::{NoOracle, Oracle, TableOracle, Verdict},
    player::Player,
    search::{Search, Statistics},
    simulation::random_playout,
    tree::{NodeId, Tree},
};
