//! # Skirmish
//!
//! A tactical combat resolution engine for turn-based grid skirmishes played
//! under the Savage Worlds ruleset.
//!
//! ## Architecture Overview
//!
//! The engine is a synchronous library driven by an external host (a UI, a
//! network layer or a test harness). The host supplies combatants and intents,
//! the engine resolves them and queues typed events for the host to drain.
//!
//! - **Rules**: exploding dice, the Wild Die, raises, damage and wounds
//! - **Tactical Grid**: Chebyshev distance, movement budgets, range bands,
//!   line of sight and cover
//! - **Combat Session**: the turn-phase state machine that owns all mutable
//!   combat state and emits log entries and events
//! - **Enemy Controller**: a greedy close-and-strike decision procedure
//! - **Input**: host intents dispatched onto the session
//!
//! ## Example
//!
//! ```
//! use skirmish::{CombatSession, Combatant, Position, SessionConfig, TurnPhase};
//!
//! let mut session = CombatSession::new(SessionConfig::for_testing(7));
//! let hero = Combatant::player("Hero");
//! session.add_player(hero, Position::new(2, 2)).unwrap();
//! session.add_enemy(Combatant::bandit("Bandit"), Position::new(6, 2)).unwrap();
//!
//! assert_eq!(session.phase(), TurnPhase::Player);
//! assert_eq!(session.round(), 1);
//! ```

pub mod game;
pub mod input;
pub mod rules;
pub mod scenario;

pub use game::*;
pub use input::*;
pub use rules::*;
pub use scenario::*;

/// Core error type for the skirmish engine.
///
/// Nothing here is fatal: every variant describes a request that was rejected
/// without mutating session state, and the host may retry with corrected input.
#[derive(thiserror::Error, Debug)]
pub enum SkirmishError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Operation requested during the wrong turn phase
    #[error("Not permitted during {actual:?} phase (requires {expected:?})")]
    WrongPhase {
        expected: game::TurnPhase,
        actual: game::TurnPhase,
    },

    /// No combatant with this id takes part in the session
    #[error("Unknown combatant: {0}")]
    UnknownCombatant(game::CombatantId),

    /// Target cannot be attacked
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Target lies beyond the weapon's long range band
    #[error("Target out of range: distance {distance}, maximum {max}")]
    OutOfRange { distance: u32, max: u32 },

    /// Line of sight is fully blocked
    #[error("Line of sight blocked")]
    LineOfSightBlocked,

    /// Destination cannot be entered
    #[error("Movement blocked: {0}")]
    MovementBlocked(String),

    /// Action cannot be performed
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Die notation could not be parsed
    #[error("Invalid die notation: {0:?}")]
    InvalidNotation(String),
}

/// Result type used throughout the skirmish codebase.
pub type SkirmishResult<T> = Result<T, SkirmishError>;

/// Version information for the engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Rule constants.
pub mod config {
    /// Maximum number of retained combat log entries; oldest are evicted first
    pub const COMBAT_LOG_CAPACITY: usize = 100;

    /// Largest gang-up bonus regardless of how many allies are adjacent
    pub const GANG_UP_CAP: i32 = 4;

    /// Faces on the Wild Die rolled by Wild Cards
    pub const WILD_DIE_SIDES: u32 = 6;

    /// Faces on each bonus damage die granted per raise
    pub const RAISE_DAMAGE_SIDES: u32 = 6;

    /// Wounds at which a combatant is incapacitated
    pub const INCAPACITATION_WOUNDS: u32 = 3;

    /// Abstract health points removed per wound
    pub const HEALTH_PER_WOUND: i32 = 4;

    /// Maximum health is Toughness times this factor
    pub const HEALTH_PER_TOUGHNESS: i32 = 3;

    /// Target number for ranged attacks made from outside melee reach
    pub const RANGED_TARGET_NUMBER: i32 = 4;

    /// Points over the target number per raise
    pub const RAISE_STEP: i32 = 4;

    /// Chebyshev distance that counts as melee reach
    pub const MELEE_REACH: u32 = 1;

    /// Penalty per action already taken this turn
    pub const MULTI_ACTION_STEP: i32 = 2;

    /// Penalty for attacking a target that ran this turn
    pub const RUNNING_TARGET_PENALTY: i32 = 2;

    /// Bonus for a ranged attack made after aiming
    pub const AIM_BONUS: i32 = 2;

    /// Shaken window below Toughness for damage that causes no wound
    pub const SHAKEN_MARGIN: i32 = 4;

    /// Largest die count accepted in a notation like `3d6`
    pub const MAX_DICE_COUNT: u32 = 100;

    /// Largest die size accepted in a notation
    pub const MAX_DIE_SIDES: u32 = 1000;

    /// Largest flat modifier (either sign) accepted in a notation
    pub const MAX_NOTATION_MODIFIER: i32 = 1000;
}
