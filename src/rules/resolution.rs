//! # Rules Evaluator
//!
//! Stateless resolution of trait rolls, damage and wounds.

use crate::config::{
    INCAPACITATION_WOUNDS, MAX_DICE_COUNT, RAISE_DAMAGE_SIDES, RAISE_STEP, SHAKEN_MARGIN,
};
use crate::rules::dice::{roll_exploding, roll_skill_with_wild_die, DieNotation, DieRoller};
use serde::{Deserialize, Serialize};

/// A resolved trait roll against a target number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRollResult {
    /// Faces rolled on the trait die, aces appended in order
    pub rolls: Vec<u32>,
    /// Total of the Wild Die, if one was rolled
    pub wild_die: Option<i32>,
    /// Chosen die total plus the flat modifier
    pub total: i32,
    /// Whether either die aced
    pub exploded: bool,
    /// Target number the roll was made against
    pub target_number: i32,
    /// Raises over the target number
    pub raises: u32,
}

impl DiceRollResult {
    /// Whether the roll met or beat its target number.
    pub fn is_success(&self) -> bool {
        self.total >= self.target_number
    }
}

/// Counts raises: one per full four points over the target number.
///
/// # Examples
///
/// ```
/// use skirmish::raises;
///
/// assert_eq!(raises(3, 4), 0);
/// assert_eq!(raises(7, 4), 0);
/// assert_eq!(raises(8, 4), 1);
/// assert_eq!(raises(16, 4), 3);
/// ```
pub fn raises(total: i32, target_number: i32) -> u32 {
    if total < target_number {
        return 0;
    }
    let margin = i64::from(total) - i64::from(target_number);
    (margin / i64::from(RAISE_STEP)) as u32
}

/// Rolls a trait die (plus Wild Die for Wild Cards) against a target number.
pub fn resolve_attack<R: DieRoller + ?Sized>(
    roller: &mut R,
    die_sides: u32,
    is_wild_card: bool,
    flat_modifier: i32,
    target_number: i32,
) -> DiceRollResult {
    let roll = roll_skill_with_wild_die(roller, die_sides, is_wild_card);
    let total = roll.total.saturating_add(flat_modifier);

    log::debug!(
        "trait d{die_sides} rolled {:?} wild {:?} {flat_modifier:+} = {total} vs TN {target_number}",
        roll.skill.rolls,
        roll.wild.as_ref().map(|w| w.total),
    );

    DiceRollResult {
        rolls: roll.skill.rolls,
        wild_die: roll.wild.map(|w| w.total),
        total,
        exploded: roll.exploded,
        target_number,
        raises: raises(total, target_number),
    }
}

/// Damage dice outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageRoll {
    pub total: i32,
    /// Per-die totals (each already including its own aces)
    pub rolls: Vec<i32>,
    pub exploded: bool,
}

impl DamageRoll {
    fn absorb(&mut self, other: DamageRoll) {
        self.total = self.total.saturating_add(other.total);
        self.rolls.extend(other.rolls);
        self.exploded |= other.exploded;
    }
}

/// Rolls damage dice. Every die explodes; there is no Wild Die.
///
/// # Examples
///
/// ```
/// use skirmish::{roll_damage, DieNotation, ScriptedDice};
///
/// let mut dice = ScriptedDice::new([3, 6, 2]);
/// let damage = roll_damage(&mut dice, &DieNotation::new(2, 6, 1));
/// assert_eq!(damage.rolls, vec![3, 8]);
/// assert_eq!(damage.total, 12);
/// assert!(damage.exploded);
/// ```
pub fn roll_damage<R: DieRoller + ?Sized>(roller: &mut R, notation: &DieNotation) -> DamageRoll {
    let mut damage = DamageRoll {
        total: notation.modifier,
        rolls: Vec::with_capacity(notation.count.min(MAX_DICE_COUNT) as usize),
        exploded: false,
    };

    for _ in 0..notation.count {
        let die = roll_exploding(roller, notation.sides);
        damage.total = damage.total.saturating_add(die.total);
        damage.rolls.push(die.total);
        damage.exploded |= die.exploded;
    }

    damage
}

/// Totals damage for a hit.
///
/// Rolls the weapon notation (if any), then the Strength die (if any), then
/// one exploding d6 per raise on the attack roll.
pub fn compute_damage<R: DieRoller + ?Sized>(
    roller: &mut R,
    base: Option<&DieNotation>,
    attack_raises: u32,
    strength: Option<&DieNotation>,
) -> DamageRoll {
    let mut damage = DamageRoll::default();

    if let Some(base) = base {
        damage.absorb(roll_damage(roller, base));
    }
    if let Some(strength) = strength {
        damage.absorb(roll_damage(roller, strength));
    }
    let raise_die = DieNotation::single(RAISE_DAMAGE_SIDES);
    for _ in 0..attack_raises {
        damage.absorb(roll_damage(roller, &raise_die));
    }

    damage
}

/// What a damage total does to a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageEffect {
    /// Absorbed entirely
    NoEffect,
    /// Near miss: the target is Shaken but unwounded
    Shaken,
    /// One or more wounds
    Wounds(u32),
}

impl DamageEffect {
    /// Wounds carried by this effect.
    pub fn wounds(self) -> u32 {
        match self {
            DamageEffect::Wounds(n) => n,
            _ => 0,
        }
    }
}

/// Wounds inflicted by a damage total against a Toughness.
///
/// # Examples
///
/// ```
/// use skirmish::damage_to_wounds;
///
/// assert_eq!(damage_to_wounds(5, 6), 0);
/// assert_eq!(damage_to_wounds(6, 6), 1);
/// assert_eq!(damage_to_wounds(9, 6), 1);
/// assert_eq!(damage_to_wounds(10, 6), 2);
/// ```
pub fn damage_to_wounds(damage_total: i32, toughness: i32) -> u32 {
    if damage_total < toughness {
        return 0;
    }
    let margin = i64::from(damage_total) - i64::from(toughness);
    (margin / i64::from(RAISE_STEP)) as u32 + 1
}

/// Classifies a damage total as no effect, Shaken, or wounds.
pub fn damage_effect(damage_total: i32, toughness: i32) -> DamageEffect {
    match damage_to_wounds(damage_total, toughness) {
        0 if damage_total >= toughness.saturating_sub(SHAKEN_MARGIN) => DamageEffect::Shaken,
        0 => DamageEffect::NoEffect,
        n => DamageEffect::Wounds(n),
    }
}

/// Whether a wound count incapacitates.
pub fn is_incapacitated(wounds: u32) -> bool {
    wounds >= INCAPACITATION_WOUNDS
}
