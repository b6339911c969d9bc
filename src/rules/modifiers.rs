//! # Attack Modifiers
//!
//! Modifier tables and the per-turn [`ModifierState`].
//!
//! Composition is pure: [`plan_attack`] takes the current state plus the
//! situation of one attack and returns the itemised modifiers together with
//! the state that should be in force after the attack.

use crate::config::{AIM_BONUS, GANG_UP_CAP, MELEE_REACH, MULTI_ACTION_STEP, RUNNING_TARGET_PENALTY};
use crate::game::Position;
use serde::{Deserialize, Serialize};

/// Ambient light level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Illumination {
    /// Daylight
    #[default]
    Bright,
    /// Twilight or torchlight
    Dim,
    /// Moonlight or distant light
    Dark,
    /// No light at all
    PitchBlack,
}

impl Illumination {
    /// To-hit penalty for attacking in this light.
    pub fn penalty(self) -> i32 {
        match self {
            Illumination::Bright => 0,
            Illumination::Dim => -1,
            Illumination::Dark => -2,
            Illumination::PitchBlack => -4,
        }
    }
}

/// Body location chosen for a called shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalledShot {
    Head,
    Vitals,
    Limb,
    Small,
    Tiny,
}

impl CalledShot {
    /// All called-shot targets.
    pub fn all() -> [CalledShot; 5] {
        [
            CalledShot::Head,
            CalledShot::Vitals,
            CalledShot::Limb,
            CalledShot::Small,
            CalledShot::Tiny,
        ]
    }

    /// To-hit penalty. Never positive.
    pub fn to_hit(self) -> i32 {
        match self {
            CalledShot::Head | CalledShot::Vitals | CalledShot::Tiny => -4,
            CalledShot::Limb | CalledShot::Small => -2,
        }
    }

    /// Flat damage added after raise dice are totalled. Never negative.
    pub fn damage_bonus(self) -> i32 {
        match self {
            CalledShot::Head | CalledShot::Vitals => 4,
            CalledShot::Limb | CalledShot::Small | CalledShot::Tiny => 0,
        }
    }
}

/// Penalty for attacking while carrying `wounds` wounds.
pub fn wound_penalty(wounds: u32) -> i32 {
    -(wounds as i32)
}

/// Penalty for an action when `actions_taken` actions already happened this turn.
///
/// # Examples
///
/// ```
/// use skirmish::multi_action_penalty;
///
/// let sequence: Vec<i32> = (0..4).map(multi_action_penalty).collect();
/// assert_eq!(sequence, vec![0, -2, -4, -6]);
/// ```
pub fn multi_action_penalty(actions_taken: u32) -> i32 {
    -(MULTI_ACTION_STEP * actions_taken as i32)
}

/// Gang-up bonus: +1 per ally within reach of the target, capped.
///
/// # Examples
///
/// ```
/// use skirmish::{gang_up_bonus, Position};
///
/// let target = Position::new(5, 5);
/// let allies = [Position::new(6, 6), Position::new(5, 7)];
/// assert_eq!(gang_up_bonus(target, &allies), 1);
/// ```
pub fn gang_up_bonus(target: Position, allies: &[Position]) -> i32 {
    let adjacent = allies
        .iter()
        .filter(|ally| **ally != target && ally.chebyshev_distance(target) <= MELEE_REACH)
        .count();
    (adjacent as i32).min(GANG_UP_CAP)
}

/// Ephemeral modifier flags owned by the combat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModifierState {
    /// Aiming for the next ranged attack
    pub aiming: bool,
    /// Location chosen for the next attack
    pub called_shot: Option<CalledShot>,
    /// The acting combatant ran this turn
    pub has_run: bool,
    /// Persists until explicitly changed
    pub illumination: Illumination,
    /// Attacks made so far this turn
    pub actions_taken: u32,
}

impl ModifierState {
    /// State with only the given illumination set.
    pub fn ambient(illumination: Illumination) -> Self {
        Self {
            illumination,
            ..Self::default()
        }
    }

    /// Next state after any attack attempt, hit or miss.
    pub fn after_attack(self) -> Self {
        Self {
            aiming: false,
            called_shot: None,
            actions_taken: self.actions_taken + 1,
            ..self
        }
    }

    /// Next state on entry to a new player turn.
    pub fn start_turn(self) -> Self {
        Self {
            actions_taken: 0,
            ..self
        }
    }

    /// Next state at the end of the owner's turn.
    pub fn end_turn(self) -> Self {
        Self {
            has_run: false,
            ..self
        }
    }
}

/// Situation of one attack, independent of the modifier state.
#[derive(Debug, Clone, Copy)]
pub struct AttackContext<'a> {
    /// Wounds currently carried by the attacker
    pub attacker_wounds: u32,
    /// Range and cover penalty worked out from the grid
    pub situational_penalty: i32,
    /// Whether the weapon is a ranged weapon
    pub ranged: bool,
    /// Whether the target ran this turn
    pub target_has_run: bool,
    /// Where the target stands
    pub target_position: Position,
    /// Allies of the attacker, for gang-up
    pub allies: &'a [Position],
    /// Whether the multi-action penalty applies to this attacker
    pub counts_actions: bool,
}

/// Itemised modifiers for one attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModifierBreakdown {
    pub wounds: i32,
    pub situational: i32,
    pub aim: i32,
    pub running_target: i32,
    pub called_shot: i32,
    pub illumination: i32,
    pub multi_action: i32,
    pub gang_up: i32,
}

impl ModifierBreakdown {
    /// Net flat modifier.
    pub fn total(&self) -> i32 {
        self.wounds
            + self.situational
            + self.aim
            + self.running_target
            + self.called_shot
            + self.illumination
            + self.multi_action
            + self.gang_up
    }
}

/// Itemises the modifiers for an attack made under `state`.
pub fn compose_modifiers(state: &ModifierState, ctx: &AttackContext<'_>) -> ModifierBreakdown {
    ModifierBreakdown {
        wounds: wound_penalty(ctx.attacker_wounds),
        situational: ctx.situational_penalty,
        aim: if state.aiming && ctx.ranged { AIM_BONUS } else { 0 },
        running_target: if ctx.target_has_run {
            -RUNNING_TARGET_PENALTY
        } else {
            0
        },
        called_shot: state.called_shot.map_or(0, CalledShot::to_hit),
        illumination: state.illumination.penalty(),
        multi_action: if ctx.counts_actions {
            multi_action_penalty(state.actions_taken)
        } else {
            0
        },
        gang_up: gang_up_bonus(ctx.target_position, ctx.allies),
    }
}

/// Modifiers for an attack plus the state that follows it.
pub fn plan_attack(
    state: ModifierState,
    ctx: &AttackContext<'_>,
) -> (ModifierBreakdown, ModifierState) {
    (compose_modifiers(&state, ctx), state.after_attack())
}
