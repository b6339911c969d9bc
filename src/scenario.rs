//! # Scenario Module
//!
//! Serde-loadable battle setups: who fights, where they stand, what cover
//! lies around them and how well lit the field is.
//!
//! ```json
//! {
//!   "name": "Ambush",
//!   "session": { "grid_width": 16, "grid_height": 12, "illumination": "Dim" },
//!   "player": { "name": "Hero", "position": { "x": 1, "y": 5 },
//!               "skills": { "Shooting": "d8" },
//!               "weapons": [{ "name": "Rifle", "damage": "2d8", "range": "24/48/96" }] },
//!   "enemies": [{ "name": "Bandit", "position": { "x": 12, "y": 5 } }],
//!   "cover": [{ "position": { "x": 6, "y": 5 }, "cover": "Light" }]
//! }
//! ```

use crate::game::{
    Attributes, CombatSession, Combatant, CoverLevel, CoverTile, DieCode, Position,
    SessionConfig, Side, SkillRating, Weapon,
};
use crate::rules::Illumination;
use crate::SkirmishResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One combatant as written in a scenario file.
///
/// Attribute and skill dice are written as die codes (`"d8"`). Missing
/// attributes are d6; Parry, Toughness and Pace are derived unless given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantSpec {
    pub name: String,
    pub position: Position,
    #[serde(default)]
    pub wild_card: Option<bool>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub skills: BTreeMap<String, String>,
    #[serde(default)]
    pub weapons: Vec<Weapon>,
    #[serde(default)]
    pub parry: Option<i32>,
    #[serde(default)]
    pub toughness: Option<i32>,
    #[serde(default)]
    pub pace: Option<u32>,
}

impl CombatantSpec {
    /// A definition with every stat left at its default.
    pub fn new(name: impl Into<String>, position: Position) -> Self {
        Self {
            name: name.into(),
            position,
            wild_card: None,
            attributes: BTreeMap::new(),
            skills: BTreeMap::new(),
            weapons: Vec::new(),
            parry: None,
            toughness: None,
            pace: None,
        }
    }

    pub fn with_skill(mut self, name: &str, die: &str) -> Self {
        self.skills.insert(name.to_string(), die.to_string());
        self
    }

    pub fn with_attribute(mut self, name: &str, die: &str) -> Self {
        self.attributes.insert(name.to_string(), die.to_string());
        self
    }

    pub fn with_weapon(mut self, weapon: Weapon) -> Self {
        self.weapons.push(weapon);
        self
    }

    /// Builds the combatant. Players default to Wild Cards, enemies to Extras.
    pub fn build(&self, side: Side) -> Combatant {
        let mut attributes = Attributes::default();
        for (name, code) in &self.attributes {
            let die = DieCode::parse_or_default(code);
            match name.to_lowercase().as_str() {
                "agility" => attributes.agility = die,
                "cognition" => attributes.cognition = die,
                "smarts" => attributes.smarts = die,
                "spirit" => attributes.spirit = die,
                "strength" => attributes.strength = die,
                "vigor" => attributes.vigor = die,
                other => log::warn!("{}: unknown attribute {other:?} ignored", self.name),
            }
        }

        let skills = self
            .skills
            .iter()
            .map(|(name, code)| SkillRating::new(name.clone(), DieCode::parse_or_default(code)))
            .collect();

        let wild_card = self.wild_card.unwrap_or(side == Side::Player);
        let mut combatant = Combatant::new(self.name.clone(), side, wild_card, attributes, skills);
        combatant.weapons = self.weapons.clone();
        if let Some(parry) = self.parry {
            combatant = combatant.with_parry(parry);
        }
        if let Some(toughness) = self.toughness {
            combatant = combatant.with_toughness(toughness);
        }
        if let Some(pace) = self.pace {
            combatant = combatant.with_pace(pace);
        }
        combatant
    }
}

/// A complete battle setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub session: SessionConfig,
    pub player: CombatantSpec,
    pub enemies: Vec<CombatantSpec>,
    #[serde(default)]
    pub cover: Vec<CoverTile>,
}

impl Scenario {
    /// Parses a scenario from JSON.
    pub fn from_json(json: &str) -> SkirmishResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a scenario file.
    pub fn load(path: impl AsRef<Path>) -> SkirmishResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        log::info!("Loading scenario from {}", path.as_ref().display());
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> SkirmishResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builds a ready-to-play session. `seed` overrides the file's seed.
    pub fn into_session(self, seed: Option<u64>) -> SkirmishResult<CombatSession> {
        let mut config = self.session;
        if seed.is_some() {
            config.seed = seed;
        }
        log::info!(
            "Scenario {:?}: {}x{} grid, {} enemies",
            self.name,
            config.grid_width,
            config.grid_height,
            self.enemies.len()
        );

        let mut session = CombatSession::new(config);
        for tile in self.cover {
            session.add_cover(tile);
        }
        session.add_player(self.player.build(Side::Player), self.player.position)?;
        for enemy in &self.enemies {
            session.add_enemy(enemy.build(Side::Enemy), enemy.position)?;
        }
        Ok(session)
    }

    /// Dusk at a frontier trading post: a gunslinger against four bandits,
    /// one holed up in the store behind a window.
    pub fn demo(seed: u64) -> Self {
        let mut cover = Vec::new();

        // Store: walls around a 3x3 floor, a window facing west and a door south.
        let (left, top, right, bottom) = (12, 3, 16, 7);
        for y in top..=bottom {
            for x in left..=right {
                let position = Position::new(x, y);
                let edge = x == left || x == right || y == top || y == bottom;
                let tile = match (x, y) {
                    (12, 5) => CoverTile::window(position, CoverLevel::Medium),
                    (14, 7) => CoverTile::door(position, CoverLevel::Light),
                    _ if edge => CoverTile::wall(position),
                    _ => CoverTile::floor(position, 1),
                };
                cover.push(tile.in_building(1));
            }
        }

        for y in 9..=11 {
            cover.push(CoverTile::new(Position::new(8, y), CoverLevel::Light));
        }
        cover.push(CoverTile::new(Position::new(6, 4), CoverLevel::Medium));
        cover.push(CoverTile::new(Position::new(10, 12), CoverLevel::Heavy));

        let bandit = |name: &str, x, y| {
            CombatantSpec::new(name, Position::new(x, y))
                .with_skill("Fighting", "d6")
                .with_weapon(Weapon::melee("Bowie Knife", "Str+d4"))
        };

        Self {
            name: "Dusk at the Trading Post".to_string(),
            session: SessionConfig {
                illumination: Illumination::Dim,
                seed: Some(seed),
                ..SessionConfig::new(24, 16)
            },
            player: CombatantSpec::new("Gunslinger", Position::new(2, 8))
                .with_attribute("Agility", "d8")
                .with_attribute("Strength", "d8")
                .with_skill("Fighting", "d8")
                .with_skill("Shooting", "d10")
                .with_weapon(Weapon::melee("Cavalry Saber", "Str+d6"))
                .with_weapon(Weapon::ranged("Colt Peacemaker", "2d6+1", "12/24/48")),
            enemies: vec![
                bandit("Black Jack", 14, 5),
                bandit("Dutch", 19, 9),
                bandit("Slim", 17, 12),
                CombatantSpec {
                    toughness: Some(7),
                    ..bandit("Big Ned", 20, 4).with_attribute("Strength", "d10")
                },
            ],
            cover,
        }
    }
}
