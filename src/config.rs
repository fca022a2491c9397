use crate::{ConfigError, Player};

/// Whether a player may pass instead of placing a mark.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PassRule {
    #[default]
    Disabled,
    /// Only the given player may pass, and only on its own turn.
    Enabled(Player),
}

impl PassRule {
    /// Builds the rule from the two values the outside world supplies: a flag and an optional
    /// player. Naming a pass player without allowing passes, or allowing passes without naming a
    /// player, is rejected.
    pub fn from_flags(
        pass_allowed: bool,
        pass_player: Option<Player>,
    ) -> Result<Self, ConfigError> {
        match (pass_allowed, pass_player) {
            (false, None) => Ok(PassRule::Disabled),
            (true, Some(player)) => Ok(PassRule::Enabled(player)),
            (false, Some(player)) => Err(ConfigError::PassPlayerWithoutPass(player)),
            (true, None) => Err(ConfigError::MissingPassPlayer),
        }
    }
}

/// Immutable parameters of a game. Determines legality and terminal tests, and the layout of the
/// child slots in the search tree. Boards and trees used together must share the same
/// configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GameConfig {
    width: usize,
    height: usize,
    run_length: usize,
    pass: PassRule,
}

impl GameConfig {
    /// Validated configuration with passing disabled. A run length may exceed one dimension
    /// (runs are then only possible along the other axis) but not both.
    pub fn new(width: usize, height: usize, run_length: usize) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::ZeroDimension { width, height });
        }
        if run_length == 0 {
            return Err(ConfigError::ZeroRunLength);
        }
        if run_length > width.max(height) {
            return Err(ConfigError::RunTooLong {
                run_length,
                width,
                height,
            });
        }
        let cells = width
            .checked_mul(height)
            .ok_or(ConfigError::TooManyCells { cells: usize::MAX })?;
        // Two owners per cell plus the pass slot must be addressable with `u32` node indices.
        if cells
            .checked_mul(2)
            .and_then(|slots| slots.checked_add(1))
            .is_none_or(|slots| slots > u32::MAX as usize)
        {
            return Err(ConfigError::TooManyCells { cells });
        }
        Ok(Self {
            width,
            height,
            run_length,
            pass: PassRule::Disabled,
        })
    }

    pub fn with_pass(mut self, pass: PassRule) -> Self {
        self.pass = pass;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn run_length(&self) -> usize {
        self.run_length
    }

    pub fn pass(&self) -> PassRule {
        self.pass
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// Size of the move index space: one slot per (cell, owner) pair and one for passing.
    pub fn move_slots(&self) -> usize {
        2 * self.cell_count() + 1
    }

    /// `true` if `player` may pass when it is its turn.
    pub fn can_pass(&self, player: Player) -> bool {
        self.pass == PassRule::Enabled(player)
    }
}

impl Default for GameConfig {
    /// The classic game: a 6x6 board, runs of five, no passing.
    fn default() -> Self {
        Self {
            width: 6,
            height: 6,
            run_length: 5,
            pass: PassRule::Disabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_classic_board() {
        let config = GameConfig::default();
        assert_eq!(config.width(), 6);
        assert_eq!(config.height(), 6);
        assert_eq!(config.run_length(), 5);
        assert_eq!(config.move_slots(), 73);
        assert!(!config.can_pass(Player::Chaos));
    }

    #[test]
    fn run_length_may_exceed_one_dimension() {
        let config = GameConfig::new(3, 1, 3).unwrap();
        assert_eq!(config.cell_count(), 3);
        assert_eq!(config.move_slots(), 7);
    }

    #[test]
    fn reject_run_length_exceeding_both_dimensions() {
        assert_eq!(
            Err(ConfigError::RunTooLong {
                run_length: 5,
                width: 4,
                height: 3
            }),
            GameConfig::new(4, 3, 5)
        );
    }

    #[test]
    fn reject_empty_dimensions() {
        assert!(matches!(
            GameConfig::new(0, 3, 1),
            Err(ConfigError::ZeroDimension { .. })
        ));
        assert_eq!(Err(ConfigError::ZeroRunLength), GameConfig::new(3, 3, 0));
    }

    #[test]
    fn pass_rule_from_flags() {
        assert_eq!(Ok(PassRule::Disabled), PassRule::from_flags(false, None));
        assert_eq!(
            Ok(PassRule::Enabled(Player::Chaos)),
            PassRule::from_flags(true, Some(Player::Chaos))
        );
        assert_eq!(
            Err(ConfigError::PassPlayerWithoutPass(Player::Order)),
            PassRule::from_flags(false, Some(Player::Order))
        );
        assert_eq!(
            Err(ConfigError::MissingPassPlayer),
            PassRule::from_flags(true, None)
        );
    }

    #[test]
    fn only_pass_player_may_pass() {
        let config = GameConfig::new(4, 4, 4)
            .unwrap()
            .with_pass(PassRule::Enabled(Player::Chaos));
        assert!(config.can_pass(Player::Chaos));
        assert!(!config.can_pass(Player::Order));
    }
}
