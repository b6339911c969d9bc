//! # Entities Module
//!
//! Combatants, their attribute and skill dice, and the weapons they carry.

use crate::config::{HEALTH_PER_TOUGHNESS, HEALTH_PER_WOUND, INCAPACITATION_WOUNDS};
use crate::game::world::RangeBands;
use crate::game::{new_combatant_id, CombatantId};
use crate::rules::{is_incapacitated, DamageEffect, DieNotation};
use serde::{Deserialize, Serialize};

/// Die sizes used for traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DieSize {
    D4,
    D6,
    D8,
    D10,
    D12,
}

impl DieSize {
    /// Number of faces.
    pub fn sides(self) -> u32 {
        match self {
            DieSize::D4 => 4,
            DieSize::D6 => 6,
            DieSize::D8 => 8,
            DieSize::D10 => 10,
            DieSize::D12 => 12,
        }
    }

    /// Size for an exact face count, if it is a trait die.
    pub fn from_sides(sides: u32) -> Option<Self> {
        match sides {
            4 => Some(DieSize::D4),
            6 => Some(DieSize::D6),
            8 => Some(DieSize::D8),
            10 => Some(DieSize::D10),
            12 => Some(DieSize::D12),
            _ => None,
        }
    }
}

/// A trait die code such as `d8` or `2d6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DieCode {
    pub size: DieSize,
    /// Number of dice of this size
    #[serde(default = "default_die_count")]
    pub count: u32,
}

fn default_die_count() -> u32 {
    1
}

impl DieCode {
    /// A single die of the given size.
    pub fn new(size: DieSize) -> Self {
        Self { size, count: 1 }
    }

    /// Parses `d8` / `1d8` style codes, degrading anything else to `d6`.
    ///
    /// # Examples
    ///
    /// ```
    /// use skirmish::{DieCode, DieSize};
    ///
    /// assert_eq!(DieCode::parse_or_default("d10").size, DieSize::D10);
    /// assert_eq!(DieCode::parse_or_default("d7").size, DieSize::D6);
    /// ```
    pub fn parse_or_default(code: &str) -> Self {
        let parsed = code
            .parse::<DieNotation>()
            .ok()
            .and_then(|n| DieSize::from_sides(n.sides).map(|size| Self { size, count: n.count }));
        parsed.unwrap_or_else(|| {
            log::warn!("Invalid trait die {code:?}, defaulting to d6");
            Self::new(DieSize::D6)
        })
    }

    /// Faces on each die.
    pub fn sides(self) -> u32 {
        self.size.sides()
    }

    /// Damage-roll notation for this code.
    pub fn notation(self) -> DieNotation {
        DieNotation::new(self.count.max(1), self.sides(), 0)
    }
}

impl From<DieSize> for DieCode {
    fn from(size: DieSize) -> Self {
        Self::new(size)
    }
}

/// The six attribute dice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub agility: DieCode,
    pub cognition: DieCode,
    pub smarts: DieCode,
    pub spirit: DieCode,
    pub strength: DieCode,
    pub vigor: DieCode,
}

impl Default for Attributes {
    fn default() -> Self {
        let d6 = DieCode::new(DieSize::D6);
        Self {
            agility: d6,
            cognition: d6,
            smarts: d6,
            spirit: d6,
            strength: d6,
            vigor: d6,
        }
    }
}

/// A named skill and its die.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRating {
    pub name: String,
    pub die: DieCode,
}

impl SkillRating {
    pub fn new(name: impl Into<String>, die: impl Into<DieCode>) -> Self {
        Self {
            name: name.into(),
            die: die.into(),
        }
    }
}

/// Which side of the fight a combatant is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Player,
    Enemy,
}

/// Damage formula of a weapon: optional Strength addend plus dice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageFormula {
    /// Adds the wielder's Strength die
    pub strength: bool,
    /// Weapon dice, absent for pure Strength damage
    pub dice: Option<DieNotation>,
}

impl DamageFormula {
    /// Parses formulas such as `2d6`, `Str+d6`, `Str` or `2d8+1`.
    ///
    /// # Examples
    ///
    /// ```
    /// use skirmish::{DamageFormula, DieNotation};
    ///
    /// let sword = DamageFormula::parse("Str+d8");
    /// assert!(sword.strength);
    /// assert_eq!(sword.dice, Some(DieNotation::single(8)));
    ///
    /// let rifle = DamageFormula::parse("2d8");
    /// assert!(!rifle.strength);
    /// ```
    pub fn parse(formula: &str) -> Self {
        let cleaned: String = formula
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        let (strength, rest) = if let Some(rest) = cleaned.strip_prefix("str") {
            (true, rest.trim_start_matches('+'))
        } else if let Some(rest) = cleaned.strip_suffix("+str") {
            (true, rest)
        } else {
            (false, cleaned.as_str())
        };

        let dice = if rest.is_empty() {
            None
        } else {
            Some(DieNotation::parse_or_default(rest))
        };

        Self { strength, dice }
    }
}

/// A weapon as selected by the host. Immutable for the duration of combat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    pub name: String,
    /// Damage formula, e.g. `2d6` or `Str+d6`
    pub damage: String,
    /// Range string `S/M/L` or a single base number; absent for melee
    #[serde(default)]
    pub range: Option<String>,
    /// Rate of fire (informational)
    #[serde(default = "default_rate_of_fire")]
    pub rate_of_fire: u32,
    /// Ammunition capacity (informational)
    #[serde(default)]
    pub shots: Option<u32>,
}

fn default_rate_of_fire() -> u32 {
    1
}

impl Weapon {
    /// Creates a melee weapon.
    pub fn melee(name: impl Into<String>, damage: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            damage: damage.into(),
            range: None,
            rate_of_fire: 1,
            shots: None,
        }
    }

    /// Creates a ranged weapon.
    pub fn ranged(name: impl Into<String>, damage: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            damage: damage.into(),
            range: Some(range.into()),
            rate_of_fire: 1,
            shots: None,
        }
    }

    /// Bare-handed attack.
    pub fn unarmed() -> Self {
        Self::melee("Fists", "Str")
    }

    /// Whether this weapon attacks at range.
    pub fn is_ranged(&self) -> bool {
        self.range.is_some()
    }

    /// Range thresholds of this weapon.
    pub fn range_bands(&self) -> RangeBands {
        RangeBands::parse(self.range.as_deref())
    }

    /// Parsed damage formula.
    pub fn damage_formula(&self) -> DamageFormula {
        DamageFormula::parse(&self.damage)
    }
}

/// Result of applying one damage effect to a combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageApplied {
    pub wounds_inflicted: u32,
    pub became_shaken: bool,
    pub incapacitated: bool,
}

/// A participant in the skirmish.
///
/// Created by the host at combat start; mutated only by the combat session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    #[serde(default = "new_combatant_id")]
    pub id: CombatantId,
    pub name: String,
    pub side: Side,
    /// Wild Cards roll a Wild Die with every trait roll
    pub wild_card: bool,
    pub attributes: Attributes,
    #[serde(default)]
    pub skills: Vec<SkillRating>,
    #[serde(default)]
    pub weapons: Vec<Weapon>,
    pub parry: i32,
    pub toughness: i32,
    pub pace: u32,
    #[serde(default)]
    pub wounds: u32,
    #[serde(default)]
    pub shaken: bool,
    pub health: i32,
    pub max_health: i32,
    /// Ran during its current or most recent turn
    #[serde(default)]
    pub has_run: bool,
}

impl Combatant {
    /// Creates a combatant and derives Parry, Toughness, Pace and health.
    ///
    /// Parry is `2 + half the Fighting die`, Toughness `2 + half the Vigor
    /// die`, Pace 6.
    pub fn new(
        name: impl Into<String>,
        side: Side,
        wild_card: bool,
        attributes: Attributes,
        skills: Vec<SkillRating>,
    ) -> Self {
        let fighting = skills
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case("fighting"))
            .map_or(0, |s| s.die.sides() as i32);
        let parry = 2 + fighting / 2;
        let toughness = 2 + attributes.vigor.sides() as i32 / 2;

        let mut combatant = Self {
            id: new_combatant_id(),
            name: name.into(),
            side,
            wild_card,
            attributes,
            skills,
            weapons: Vec::new(),
            parry,
            toughness,
            pace: 6,
            wounds: 0,
            shaken: false,
            health: 0,
            max_health: 0,
            has_run: false,
        };
        combatant.reset_health();
        combatant
    }

    /// A Wild Card hero with solid fighting and shooting.
    ///
    /// # Examples
    ///
    /// ```
    /// use skirmish::Combatant;
    ///
    /// let hero = Combatant::player("Hero");
    /// assert!(hero.wild_card);
    /// assert_eq!(hero.parry, 6);
    /// assert_eq!(hero.toughness, 5);
    /// assert_eq!(hero.max_health, 15);
    /// ```
    pub fn player(name: impl Into<String>) -> Self {
        let attributes = Attributes {
            agility: DieSize::D8.into(),
            ..Attributes::default()
        };
        Self::new(
            name,
            Side::Player,
            true,
            attributes,
            vec![
                SkillRating::new("Fighting", DieSize::D8),
                SkillRating::new("Shooting", DieSize::D8),
            ],
        )
        .with_weapon(Weapon::melee("Knife", "Str+d4"))
        .with_weapon(Weapon::ranged("Colt Peacemaker", "2d6+1", "12/24/48"))
    }

    /// A run-of-the-mill Extra.
    pub fn bandit(name: impl Into<String>) -> Self {
        Self::new(
            name,
            Side::Enemy,
            false,
            Attributes::default(),
            vec![SkillRating::new("Fighting", DieSize::D6)],
        )
    }

    /// Adds a weapon to the combatant's kit.
    pub fn with_weapon(mut self, weapon: Weapon) -> Self {
        self.weapons.push(weapon);
        self
    }

    /// Overrides the derived Parry.
    pub fn with_parry(mut self, parry: i32) -> Self {
        self.parry = parry;
        self
    }

    /// Overrides the derived Toughness and recomputes health.
    pub fn with_toughness(mut self, toughness: i32) -> Self {
        self.toughness = toughness;
        self.reset_health();
        self
    }

    /// Overrides the derived Pace.
    pub fn with_pace(mut self, pace: u32) -> Self {
        self.pace = pace;
        self
    }

    /// Restores health to `Toughness x 3`.
    ///
    /// The pool never drops below what incapacitating wounds remove, so health
    /// cannot run out before the wound count does.
    pub fn reset_health(&mut self) {
        let floor = HEALTH_PER_WOUND * INCAPACITATION_WOUNDS as i32;
        self.max_health = (self.toughness * HEALTH_PER_TOUGHNESS).max(floor);
        self.health = self.max_health;
    }

    /// Die for the first skill whose name contains any of `keywords`.
    pub fn skill_die(&self, keywords: &[&str]) -> Option<DieCode> {
        self.skills
            .iter()
            .find(|skill| {
                let name = skill.name.to_lowercase();
                keywords.iter().any(|k| name.contains(&k.to_lowercase()))
            })
            .map(|skill| skill.die)
    }

    /// Skill die used to attack with `weapon`.
    ///
    /// Shooting/Throwing for ranged weapons, Fighting for melee. A missing
    /// skill degrades to d6.
    pub fn attack_die(&self, weapon: &Weapon) -> DieCode {
        let keywords: &[&str] = if weapon.is_ranged() {
            &["shooting", "throwing"]
        } else {
            &["fighting"]
        };
        self.skill_die(keywords).unwrap_or_else(|| {
            log::warn!("{} has no {:?} skill, rolling d6", self.name, keywords);
            DieCode::new(DieSize::D6)
        })
    }

    /// Applies a damage effect. Wounds remove health; incapacitation drains it.
    pub fn apply_damage(&mut self, effect: DamageEffect) -> DamageApplied {
        let was_shaken = self.shaken;
        match effect {
            DamageEffect::NoEffect => {}
            DamageEffect::Shaken => self.shaken = true,
            DamageEffect::Wounds(n) => {
                self.wounds = self.wounds.saturating_add(n);
                let lost = i32::try_from(n)
                    .unwrap_or(i32::MAX)
                    .saturating_mul(HEALTH_PER_WOUND);
                self.health = self.health.saturating_sub(lost).max(0);
            }
        }

        let incapacitated = is_incapacitated(self.wounds);
        if incapacitated {
            self.health = 0;
        }

        DamageApplied {
            wounds_inflicted: effect.wounds(),
            became_shaken: self.shaken && !was_shaken,
            incapacitated,
        }
    }

    /// Out of the fight.
    ///
    /// The player falls only to wounds; a host-lowered health pool never
    /// ends the fight early. Enemies also drop when their health runs out.
    pub fn is_defeated(&self) -> bool {
        match self.side {
            Side::Player => is_incapacitated(self.wounds),
            Side::Enemy => is_incapacitated(self.wounds) || self.health <= 0,
        }
    }

    /// Still fighting.
    pub fn is_alive(&self) -> bool {
        !self.is_defeated()
    }
}
