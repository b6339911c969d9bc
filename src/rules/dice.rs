//! # Dice Engine
//!
//! Exploding ("Ace") die rolls and Wild Die resolution.
//!
//! All randomness flows through the [`DieRoller`] trait so that tests can
//! script exact roll sequences while production code uses a seeded or
//! entropy-backed [`StdDice`].

use crate::config::{MAX_DICE_COUNT, MAX_DIE_SIDES, MAX_NOTATION_MODIFIER, WILD_DIE_SIDES};
use crate::{SkirmishError, SkirmishResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

/// Bound on chained aces for a single die.
const MAX_ACES: usize = 64;

/// Source of uniform die faces.
pub trait DieRoller: fmt::Debug {
    /// Rolls one die, returning a face in `1..=sides`.
    fn roll_die(&mut self, sides: u32) -> u32;
}

impl<T: DieRoller + ?Sized> DieRoller for Box<T> {
    fn roll_die(&mut self, sides: u32) -> u32 {
        (**self).roll_die(sides)
    }
}

impl<T: DieRoller + ?Sized> DieRoller for &mut T {
    fn roll_die(&mut self, sides: u32) -> u32 {
        (**self).roll_die(sides)
    }
}

/// Production roller backed by `StdRng`.
#[derive(Debug, Clone)]
pub struct StdDice {
    rng: StdRng,
}

impl StdDice {
    /// Creates a reproducible roller from a seed.
    ///
    /// # Examples
    ///
    /// ```
    /// use skirmish::{DieRoller, StdDice};
    ///
    /// let mut a = StdDice::seeded(99);
    /// let mut b = StdDice::seeded(99);
    /// assert_eq!(a.roll_die(20), b.roll_die(20));
    /// ```
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Creates a roller seeded from operating system entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl DieRoller for StdDice {
    fn roll_die(&mut self, sides: u32) -> u32 {
        self.rng.gen_range(1..=sides.max(1))
    }
}

/// Roller that replays a fixed sequence of faces.
///
/// Faces are clamped into `1..=sides`. Once the script is exhausted every
/// further roll yields 1.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    faces: VecDeque<u32>,
}

impl ScriptedDice {
    /// Creates a roller that yields `faces` in order.
    pub fn new(faces: impl IntoIterator<Item = u32>) -> Self {
        Self {
            faces: faces.into_iter().collect(),
        }
    }

    /// Appends more faces to the end of the script.
    pub fn push(&mut self, faces: impl IntoIterator<Item = u32>) {
        self.faces.extend(faces);
    }

    /// Number of scripted faces not yet consumed.
    pub fn remaining(&self) -> usize {
        self.faces.len()
    }
}

impl DieRoller for ScriptedDice {
    fn roll_die(&mut self, sides: u32) -> u32 {
        let sides = sides.max(1);
        self.faces.pop_front().unwrap_or(1).clamp(1, sides)
    }
}

/// Outcome of rolling one exploding die.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplodingRoll {
    /// Sum of every face rolled
    pub total: i32,
    /// Each face in the order rolled; aces append rather than replace
    pub rolls: Vec<u32>,
    /// Whether at least one ace occurred
    pub exploded: bool,
}

/// Rolls a single die, re-rolling and adding whenever the top face comes up.
///
/// Dice with fewer than two faces cannot ace and always yield 1.
///
/// # Examples
///
/// ```
/// use skirmish::{roll_exploding, ScriptedDice};
///
/// let mut dice = ScriptedDice::new([6, 6, 2]);
/// let roll = roll_exploding(&mut dice, 6);
/// assert_eq!(roll.total, 14);
/// assert_eq!(roll.rolls, vec![6, 6, 2]);
/// assert!(roll.exploded);
/// ```
pub fn roll_exploding<R: DieRoller + ?Sized>(roller: &mut R, sides: u32) -> ExplodingRoll {
    if sides < 2 {
        return ExplodingRoll {
            total: 1,
            rolls: vec![1],
            exploded: false,
        };
    }

    let mut rolls = Vec::with_capacity(2);
    loop {
        let face = roller.roll_die(sides);
        rolls.push(face);
        if face != sides || rolls.len() > MAX_ACES {
            break;
        }
    }

    let sum: i64 = rolls.iter().map(|&r| i64::from(r)).sum();
    ExplodingRoll {
        total: i32::try_from(sum).unwrap_or(i32::MAX),
        exploded: rolls.len() > 1,
        rolls,
    }
}

/// Trait roll with an optional Wild Die.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WildDieRoll {
    /// The trait (skill or attribute) die
    pub skill: ExplodingRoll,
    /// The Wild Die, rolled only for Wild Cards
    pub wild: Option<ExplodingRoll>,
    /// The greater of the two totals
    pub total: i32,
    /// Whether either die aced
    pub exploded: bool,
}

/// Rolls a trait die and, for Wild Cards, a d6 Wild Die, keeping the higher.
pub fn roll_skill_with_wild_die<R: DieRoller + ?Sized>(
    roller: &mut R,
    skill_sides: u32,
    wild_card: bool,
) -> WildDieRoll {
    let skill = roll_exploding(roller, skill_sides);
    let wild = wild_card.then(|| roll_exploding(roller, WILD_DIE_SIDES));

    let total = match &wild {
        Some(wild) => skill.total.max(wild.total),
        None => skill.total,
    };
    let exploded = skill.exploded || wild.as_ref().is_some_and(|w| w.exploded);

    WildDieRoll {
        skill,
        wild,
        total,
        exploded,
    }
}

/// Parsed `[count]d<sides>[+/-mod]` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DieNotation {
    pub count: u32,
    pub sides: u32,
    pub modifier: i32,
}

impl DieNotation {
    /// Creates a notation from its parts.
    pub fn new(count: u32, sides: u32, modifier: i32) -> Self {
        Self {
            count,
            sides,
            modifier,
        }
    }

    /// A single die of the given size with no modifier.
    pub fn single(sides: u32) -> Self {
        Self::new(1, sides, 0)
    }

    /// Parses notation, degrading malformed input to `1d6`.
    ///
    /// # Examples
    ///
    /// ```
    /// use skirmish::DieNotation;
    ///
    /// assert_eq!(DieNotation::parse_or_default("2d8+1"), DieNotation::new(2, 8, 1));
    /// assert_eq!(DieNotation::parse_or_default("banana"), DieNotation::new(1, 6, 0));
    /// ```
    pub fn parse_or_default(notation: &str) -> Self {
        notation.parse().unwrap_or_else(|err| {
            log::warn!("{err}, defaulting to 1d6");
            Self::default()
        })
    }
}

impl Default for DieNotation {
    fn default() -> Self {
        Self::single(6)
    }
}

impl FromStr for DieNotation {
    type Err = SkirmishError;

    fn from_str(s: &str) -> SkirmishResult<Self> {
        let invalid = || SkirmishError::InvalidNotation(s.to_string());
        let cleaned: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        let (count, rest) = cleaned.split_once('d').ok_or_else(invalid)?;
        let count = if count.is_empty() {
            1
        } else {
            count.parse::<u32>().map_err(|_| invalid())?
        };

        let split_at = rest.find(['+', '-']).unwrap_or(rest.len());
        let (sides, modifier) = rest.split_at(split_at);
        let sides = sides.parse::<u32>().map_err(|_| invalid())?;
        let modifier = if modifier.is_empty() {
            0
        } else {
            modifier.parse::<i32>().map_err(|_| invalid())?
        };

        if !(1..=MAX_DICE_COUNT).contains(&count)
            || !(1..=MAX_DIE_SIDES).contains(&sides)
            || modifier.unsigned_abs() > MAX_NOTATION_MODIFIER.unsigned_abs()
        {
            return Err(invalid());
        }

        Ok(Self::new(count, sides, modifier))
    }
}

impl fmt::Display for DieNotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{m}"),
            m => write!(f, "{m}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exploding_roll_without_ace() {
        let mut dice = ScriptedDice::new([3]);
        let roll = roll_exploding(&mut dice, 8);
        assert_eq!(roll.total, 3);
        assert_eq!(roll.rolls, vec![3]);
        assert!(!roll.exploded);
    }

    #[test]
    fn test_exploding_roll_chains_aces() {
        let mut dice = ScriptedDice::new([4, 4, 4, 1]);
        let roll = roll_exploding(&mut dice, 4);
        assert_eq!(roll.total, 13);
        assert_eq!(roll.rolls.len(), 4);
        assert!(roll.exploded);
    }

    #[test]
    fn test_degenerate_die_never_aces() {
        let mut dice = ScriptedDice::new([1, 1, 1]);
        let roll = roll_exploding(&mut dice, 1);
        assert_eq!(roll.total, 1);
        assert!(!roll.exploded);
        assert_eq!(dice.remaining(), 3);
    }

    #[test]
    fn test_wild_die_takes_higher() {
        let mut dice = ScriptedDice::new([2, 5]);
        let roll = roll_skill_with_wild_die(&mut dice, 8, true);
        assert_eq!(roll.skill.total, 2);
        assert_eq!(roll.wild.as_ref().map(|w| w.total), Some(5));
        assert_eq!(roll.total, 5);
        assert!(!roll.exploded);
    }

    #[test]
    fn test_wild_die_explosion_counts() {
        let mut dice = ScriptedDice::new([1, 6, 3]);
        let roll = roll_skill_with_wild_die(&mut dice, 8, true);
        assert_eq!(roll.total, 9);
        assert!(roll.exploded);
    }

    #[test]
    fn test_extra_never_rolls_wild_die() {
        let mut dice = ScriptedDice::new([2, 6]);
        let roll = roll_skill_with_wild_die(&mut dice, 6, false);
        assert!(roll.wild.is_none());
        assert_eq!(roll.total, 2);
        assert_eq!(dice.remaining(), 1);
    }

    #[test]
    fn test_scripted_faces_are_clamped() {
        let mut dice = ScriptedDice::new([9, 0]);
        assert_eq!(dice.roll_die(6), 6);
        assert_eq!(dice.roll_die(6), 1);
        assert_eq!(dice.roll_die(6), 1);
    }

    #[test]
    fn test_seeded_dice_are_reproducible() {
        let mut a = StdDice::seeded(1234);
        let mut b = StdDice::seeded(1234);
        let left: Vec<u32> = (0..20).map(|_| a.roll_die(12)).collect();
        let right: Vec<u32> = (0..20).map(|_| b.roll_die(12)).collect();
        assert_eq!(left, right);
        assert!(left.iter().all(|&f| (1..=12).contains(&f)));
    }

    #[test]
    fn test_notation_parsing() {
        assert_eq!("d8".parse::<DieNotation>().ok(), Some(DieNotation::new(1, 8, 0)));
        assert_eq!("2d6".parse::<DieNotation>().ok(), Some(DieNotation::new(2, 6, 0)));
        assert_eq!(
            " 1D10 - 2 ".parse::<DieNotation>().ok(),
            Some(DieNotation::new(1, 10, -2))
        );
        assert!("d".parse::<DieNotation>().is_err());
        assert!("0d6".parse::<DieNotation>().is_err());
        assert!("2d0".parse::<DieNotation>().is_err());
        assert!("3".parse::<DieNotation>().is_err());
        assert!("d6+x".parse::<DieNotation>().is_err());
    }

    #[test]
    fn test_oversized_notation_degrades_to_d6() {
        assert_eq!(DieNotation::parse_or_default("d4294967295"), DieNotation::default());
        assert_eq!(DieNotation::parse_or_default("4000000000d6"), DieNotation::default());
        assert_eq!(DieNotation::parse_or_default("1d6+2147483647"), DieNotation::default());
        assert_eq!(DieNotation::parse_or_default("100d1000-1000"), DieNotation::new(100, 1000, -1000));
    }

    #[test]
    fn test_huge_faces_do_not_wrap_the_total() {
        let mut dice = ScriptedDice::new([u32::MAX - 1]);
        let roll = roll_exploding(&mut dice, u32::MAX);
        assert_eq!(roll.rolls, vec![u32::MAX - 1]);
        assert_eq!(roll.total, i32::MAX);
    }

    #[test]
    fn test_notation_display() {
        assert_eq!(DieNotation::new(2, 6, 1).to_string(), "2d6+1");
        assert_eq!(DieNotation::new(1, 8, -2).to_string(), "1d8-2");
        assert_eq!(DieNotation::single(12).to_string(), "1d12");
    }
}
