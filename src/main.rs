//! Plays games of Order and Chaos in which both sides choose their moves by Monte Carlo Tree
//! Search, then reports how often Order won.

use std::{fs::File, io::BufReader, path::PathBuf};

use anyhow::{Context as _, Result, bail};
use clap::{Parser, ValueEnum};
use rand::{SeedableRng as _, rngs::StdRng};
use tracing::info;

use order_chaos_mcts::{Board, Driver, GameConfig, NoOracle, Oracle, PassRule, Player, TableOracle};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Side {
    Order,
    Chaos,
}

impl From<Side> for Player {
    fn from(side: Side) -> Self {
        match side {
            Side::Order => Player::Order,
            Side::Chaos => Player::Chaos,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "order-chaos-mcts")]
#[command(about = "Self-play of Order and Chaos with Monte Carlo Tree Search")]
struct Args {
    /// Board width
    #[arg(long, env = "ORDER_CHAOS_WIDTH", default_value_t = 6)]
    width: usize,

    /// Board height
    #[arg(long, env = "ORDER_CHAOS_HEIGHT", default_value_t = 6)]
    height: usize,

    /// Number of equal marks in a line Order needs to win
    #[arg(long, env = "ORDER_CHAOS_RUN_LENGTH", default_value_t = 5)]
    run_length: usize,

    /// Allow the pass player to skip its turn
    #[arg(long, env = "ORDER_CHAOS_PASS_ALLOWED")]
    pass_allowed: bool,

    /// The only player allowed to pass. Requires --pass-allowed
    #[arg(long, env = "ORDER_CHAOS_PASS_PLAYER", value_enum)]
    pass_player: Option<Side>,

    /// Player making the first move
    #[arg(long, env = "ORDER_CHAOS_FIRST_PLAYER", value_enum, default_value_t = Side::Order)]
    first_player: Side,

    /// Dives per real move
    #[arg(
        long,
        env = "ORDER_CHAOS_DIVES",
        default_value_t = 5000,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    dives: u32,

    /// Number of games to play
    #[arg(long, env = "ORDER_CHAOS_GAMES", default_value_t = 1)]
    games: u32,

    /// Seed of the random generator shared by all games
    #[arg(long, env = "ORDER_CHAOS_SEED", default_value_t = 0)]
    seed: u64,

    /// Start position, rows separated by '/', cells '.', 'O' or 'X' (e.g. "O../.X./...")
    #[arg(long, env = "ORDER_CHAOS_POSITION")]
    position: Option<String>,

    /// Print the board after every real move
    #[arg(long)]
    print_boards: bool,

    /// Print the search tree of the first move, detailing children with at least MIN_VISITS
    #[arg(long, value_name = "MIN_VISITS")]
    dump_tree: Option<u32>,

    /// Solved table for positions with Order to move. Requires --oracle-chaos
    #[arg(long, env = "ORDER_CHAOS_ORACLE_ORDER")]
    oracle_order: Option<PathBuf>,

    /// Solved table for positions with Chaos to move. Requires --oracle-order
    #[arg(long, env = "ORDER_CHAOS_ORACLE_CHAOS")]
    oracle_chaos: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error), overridden by RUST_LOG
    #[arg(long, env = "ORDER_CHAOS_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn game_config(&self) -> Result<GameConfig> {
        let pass = PassRule::from_flags(self.pass_allowed, self.pass_player.map(Player::from))?;
        Ok(GameConfig::new(self.width, self.height, self.run_length)?.with_pass(pass))
    }

    fn start_position(&self, config: GameConfig) -> Result<Board> {
        match &self.position {
            Some(text) => Board::parse(config, text).context("Invalid start position"),
            None => Ok(Board::new(config)),
        }
    }

    fn table_oracle(&self, config: GameConfig) -> Result<Option<TableOracle>> {
        let (order, chaos) = match (&self.oracle_order, &self.oracle_chaos) {
            (None, None) => return Ok(None),
            (Some(order), Some(chaos)) => (order, chaos),
            _ => bail!("--oracle-order and --oracle-chaos must be given together"),
        };
        let open = |path: &PathBuf| {
            File::open(path)
                .map(BufReader::new)
                .with_context(|| format!("Failed to open oracle table {}", path.display()))
        };
        let oracle = TableOracle::from_readers(config, open(order)?, open(chaos)?)?;
        Ok(Some(oracle))
    }
}

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            EnvFilter::try_new(level).with_context(|| format!("Invalid log level {level:?}"))?
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let config = args.game_config()?;
    let start = args.start_position(config)?;
    let first_player = Player::from(args.first_player);
    let table = args.table_oracle(config)?;
    let oracle: &dyn Oracle = match &table {
        Some(table) => table,
        None => &NoOracle,
    };
    info!(
        width = config.width(),
        height = config.height(),
        run_length = config.run_length(),
        pass = ?config.pass(),
        dives = args.dives,
        games = args.games,
        oracle = table.is_some(),
        "Starting games"
    );

    let driver = Driver::with_oracle(args.dives, oracle);
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut order_wins = 0;
    for game in 0..args.games {
        let mut move_number = 0;
        let record = driver.play_with(start.clone(), first_player, &mut rng, |search, entry| {
            if let (0, 0, Some(min_visits)) = (game, move_number, args.dump_tree) {
                print!("{}", search.statistics(min_visits));
            }
            if args.print_boards {
                let mut board = search.board().clone();
                board.play(&entry.mv);
                println!("{} plays {}", entry.player, entry.mv);
                println!("{board}");
            }
            move_number += 1;
        })?;

        if record.winner == Player::Order {
            order_wins += 1;
        }
        println!(
            "game {}: {} wins after {} moves",
            game + 1,
            record.winner,
            record.moves.len()
        );
        info!(
            game = game + 1,
            winner = %record.winner,
            moves = record.moves.len(),
            order_wins,
            "Game finished"
        );
    }
    println!("order wins: {order_wins}/{}", args.games);

    Ok(())
}
