//! # Combat State Module
//!
//! The combat session: the turn-phase state machine that owns every mutable
//! piece of a fight.
//!
//! [`CombatSession`] holds the combatants, the tactical grid, the player's
//! [`ModifierState`], the injected dice and the outbound log and event queue.
//! Hosts change it only through the operations below and read it through the
//! query accessors. A rejected operation returns an error and leaves the
//! session exactly as it was.

use crate::config::{INCAPACITATION_WOUNDS, MELEE_REACH, RANGED_TARGET_NUMBER};
use crate::game::{
    CombatEvent, CombatLog, CombatLogEntry, Combatant, CombatantId, CoverTile, DamageApplied,
    DiceRollRecord, DieCode, LogCategory, MovementBudget, Position, Side, TacticalGrid, Weapon,
};
use crate::rules::{
    compute_damage, damage_effect, plan_attack, resolve_attack, AttackContext, CalledShot,
    DamageEffect, DiceRollResult, DieNotation, DieRoller, Illumination, ModifierBreakdown,
    ModifierState, StdDice,
};
use crate::{SkirmishError, SkirmishResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Phase of the turn cycle. Victory and Defeat are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnPhase {
    Player,
    Enemy,
    Victory,
    Defeat,
}

impl TurnPhase {
    /// Whether the fight is over.
    pub fn is_terminal(self) -> bool {
        matches!(self, TurnPhase::Victory | TurnPhase::Defeat)
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnPhase::Player => "Player",
            TurnPhase::Enemy => "Enemy",
            TurnPhase::Victory => "Victory",
            TurnPhase::Defeat => "Defeat",
        };
        f.write_str(name)
    }
}

/// Per-session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub grid_width: u32,
    pub grid_height: u32,
    /// Light level at the start of the fight
    #[serde(default)]
    pub illumination: Illumination,
    /// RNG seed; entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SessionConfig {
    /// Creates a configuration for a grid of the given size.
    pub fn new(grid_width: u32, grid_height: u32) -> Self {
        Self {
            grid_width,
            grid_height,
            illumination: Illumination::Bright,
            seed: None,
        }
    }

    /// Creates a small, seeded configuration for testing.
    pub fn for_testing(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::new(20, 20)
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(24, 16)
    }
}

/// A player attack as requested by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackRequest {
    pub target: CombatantId,
    pub weapon: Weapon,
    /// Chebyshev distance to the target
    pub distance: u32,
    /// Range and cover penalty already worked out from the grid
    #[serde(default)]
    pub situational_penalty: i32,
    /// Positions of the attacker's allies, for gang-up
    #[serde(default)]
    pub allies: Vec<Position>,
}

impl AttackRequest {
    pub fn new(target: CombatantId, weapon: Weapon, distance: u32) -> Self {
        Self {
            target,
            weapon,
            distance,
            situational_penalty: 0,
            allies: Vec::new(),
        }
    }

    pub fn with_penalty(mut self, penalty: i32) -> Self {
        self.situational_penalty = penalty;
        self
    }

    pub fn with_allies(mut self, allies: Vec<Position>) -> Self {
        self.allies = allies;
        self
    }
}

/// What an attack did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackOutcome {
    Miss {
        roll: DiceRollResult,
        modifiers: ModifierBreakdown,
    },
    Hit {
        roll: DiceRollResult,
        modifiers: ModifierBreakdown,
        /// Damage total, called-shot bonus included
        damage: i32,
        effect: DamageEffect,
        applied: DamageApplied,
        target_defeated: bool,
    },
}

impl AttackOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, AttackOutcome::Hit { .. })
    }

    /// The attack roll.
    pub fn roll(&self) -> &DiceRollResult {
        match self {
            AttackOutcome::Miss { roll, .. } | AttackOutcome::Hit { roll, .. } => roll,
        }
    }

    /// The modifiers the roll was made with.
    pub fn modifiers(&self) -> &ModifierBreakdown {
        match self {
            AttackOutcome::Miss { modifiers, .. } | AttackOutcome::Hit { modifiers, .. } => {
                modifiers
            }
        }
    }
}

/// Everything needed to resolve one blow, whoever strikes it.
struct Strike {
    attacker: CombatantId,
    target: CombatantId,
    label: String,
    die: DieCode,
    wild_card: bool,
    target_number: i32,
    modifiers: ModifierBreakdown,
    base_damage: Option<DieNotation>,
    strength: Option<DieNotation>,
    damage_bonus: i32,
}

/// A single skirmish between one player and any number of enemies.
#[derive(Debug)]
pub struct CombatSession {
    config: SessionConfig,
    combatants: HashMap<CombatantId, Combatant>,
    player_id: Option<CombatantId>,
    /// Enemies in the order they act
    enemy_ids: Vec<CombatantId>,
    grid: TacticalGrid,
    modifiers: ModifierState,
    movement: MovementBudget,
    roller: Box<dyn DieRoller>,
    log: CombatLog,
    events: VecDeque<CombatEvent>,
    phase: TurnPhase,
    round: u32,
}

impl CombatSession {
    /// Creates an empty session rolling with a seeded or entropy RNG.
    pub fn new(config: SessionConfig) -> Self {
        let dice = match config.seed {
            Some(seed) => StdDice::seeded(seed),
            None => StdDice::from_entropy(),
        };
        Self::with_roller(config, dice)
    }

    /// Creates an empty session rolling with the given dice.
    pub fn with_roller(config: SessionConfig, roller: impl DieRoller + 'static) -> Self {
        Self {
            grid: TacticalGrid::new(config.grid_width, config.grid_height),
            modifiers: ModifierState::ambient(config.illumination),
            config,
            combatants: HashMap::new(),
            player_id: None,
            enemy_ids: Vec::new(),
            movement: MovementBudget::default(),
            roller: Box::new(roller),
            log: CombatLog::new(),
            events: VecDeque::new(),
            phase: TurnPhase::Player,
            round: 1,
        }
    }

    /// Places the player on the grid.
    pub fn add_player(
        &mut self,
        mut combatant: Combatant,
        position: Position,
    ) -> SkirmishResult<CombatantId> {
        if self.player_id.is_some() {
            return Err(SkirmishError::InvalidAction(
                "session already has a player".to_string(),
            ));
        }
        combatant.side = Side::Player;
        let id = combatant.id;
        self.grid.place(id, position)?;

        self.movement = MovementBudget::full(combatant.pace);
        self.player_id = Some(id);
        self.log_line(format!("{} enters the fight", combatant.name), LogCategory::Info);
        self.combatants.insert(id, combatant);
        Ok(id)
    }

    /// Places an enemy on the grid. Enemies act in the order they are added.
    pub fn add_enemy(
        &mut self,
        mut combatant: Combatant,
        position: Position,
    ) -> SkirmishResult<CombatantId> {
        combatant.side = Side::Enemy;
        let id = combatant.id;
        if self.combatants.contains_key(&id) {
            return Err(SkirmishError::InvalidAction(format!(
                "combatant {id} already added"
            )));
        }
        self.grid.place(id, position)?;

        self.enemy_ids.push(id);
        self.log_line(format!("{} enters the fight", combatant.name), LogCategory::Info);
        self.combatants.insert(id, combatant);
        Ok(id)
    }

    /// Adds a cover tile to the battlefield.
    pub fn add_cover(&mut self, tile: CoverTile) {
        self.grid.add_cover(tile);
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Current round, starting at 1.
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn grid(&self) -> &TacticalGrid {
        &self.grid
    }

    /// The player's ephemeral modifier flags.
    pub fn modifiers(&self) -> ModifierState {
        self.modifiers
    }

    /// The player's remaining movement.
    pub fn movement(&self) -> MovementBudget {
        self.movement
    }

    pub fn log(&self) -> &CombatLog {
        &self.log
    }

    pub fn player_id(&self) -> Option<CombatantId> {
        self.player_id
    }

    pub fn player(&self) -> Option<&Combatant> {
        self.player_id.and_then(|id| self.combatants.get(&id))
    }

    pub fn combatant(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.get(&id)
    }

    /// All enemies in acting order, defeated ones included.
    pub fn enemies(&self) -> impl Iterator<Item = &Combatant> {
        self.enemy_ids.iter().filter_map(|id| self.combatants.get(id))
    }

    /// Enemies still in the fight, in acting order.
    pub fn living_enemy_ids(&self) -> Vec<CombatantId> {
        self.enemies()
            .filter(|enemy| enemy.is_alive())
            .map(|enemy| enemy.id)
            .collect()
    }

    /// Where a combatant stands. Defeated combatants are off the grid.
    pub fn position_of(&self, id: CombatantId) -> Option<Position> {
        self.grid.position_of(id)
    }

    /// Takes every queued event, oldest first.
    ///
    /// The queue is unbounded and keeps every `Log` entry even after the
    /// capped [`CombatLog`] evicts it, so hosts are expected to drain after
    /// each decision they submit.
    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        self.events.drain(..).collect()
    }

    /// Aims for the next ranged attack.
    pub fn aim(&mut self) -> SkirmishResult<()> {
        self.require_phase(TurnPhase::Player)?;
        let name = self.require_player()?.name.clone();
        self.modifiers.aiming = true;
        self.log_line(format!("{name} takes careful aim"), LogCategory::Info);
        Ok(())
    }

    /// Chooses (or clears) the location for the next attack.
    pub fn set_called_shot(&mut self, target: Option<CalledShot>) -> SkirmishResult<()> {
        self.require_phase(TurnPhase::Player)?;
        let name = self.require_player()?.name.clone();
        self.modifiers.called_shot = target;
        let message = match target {
            Some(shot) => format!("{name} calls a shot at the {shot:?}"),
            None => format!("{name} drops the called shot"),
        };
        self.log_line(message, LogCategory::Info);
        Ok(())
    }

    /// Changes the light level. It persists until changed again.
    pub fn set_illumination(&mut self, illumination: Illumination) {
        self.modifiers.illumination = illumination;
        log::info!("Illumination set to {illumination:?}");
        self.log_line(format!("Lighting is now {illumination:?}"), LogCategory::Info);
    }

    /// Sprints: movement becomes Pace plus a d6 for the rest of the turn.
    ///
    /// Returns the new movement budget.
    pub fn run(&mut self) -> SkirmishResult<MovementBudget> {
        self.require_phase(TurnPhase::Player)?;
        let player = self.require_player()?;
        if player.has_run {
            return Err(SkirmishError::InvalidAction(
                "already ran this turn".to_string(),
            ));
        }
        let (id, name, pace) = (player.id, player.name.clone(), player.pace);

        let sprint = self.roller.roll_die(6);
        self.emit(CombatEvent::DiceRoll(DiceRollRecord {
            roller: name.clone(),
            purpose: "run".to_string(),
            die_notation: "1d6".to_string(),
            rolls: vec![sprint as i32],
            wild_die: None,
            total: sprint as i32,
            exploded: false,
            raises: 0,
            target_number: None,
        }));

        if let Some(player) = self.combatants.get_mut(&id) {
            player.has_run = true;
        }
        self.modifiers.has_run = true;
        self.movement = MovementBudget::full(pace + sprint);
        self.emit_movement();
        self.log_line(
            format!("{name} runs! Movement {}", self.movement.max),
            LogCategory::Info,
        );
        Ok(self.movement)
    }

    /// Flags a combatant as having run, making it harder to hit.
    pub fn mark_ran(&mut self, id: CombatantId) -> SkirmishResult<()> {
        if self.phase.is_terminal() {
            return Err(SkirmishError::WrongPhase {
                expected: TurnPhase::Player,
                actual: self.phase,
            });
        }
        let combatant = self
            .combatants
            .get_mut(&id)
            .ok_or(SkirmishError::UnknownCombatant(id))?;
        combatant.has_run = true;
        if Some(id) == self.player_id {
            self.modifiers.has_run = true;
        }
        Ok(())
    }

    /// Moves the player, spending movement. Moving spoils any aim.
    ///
    /// Returns the squares spent.
    pub fn move_player(&mut self, to: Position) -> SkirmishResult<u32> {
        self.require_phase(TurnPhase::Player)?;
        let id = self.require_player()?.id;
        let from = self
            .grid
            .position_of(id)
            .ok_or(SkirmishError::UnknownCombatant(id))?;

        let cost = self.grid.check_move(from, to, self.movement.current)?;
        self.grid.place(id, to)?;
        self.movement.spend(cost);

        self.emit(CombatEvent::CombatantMoved {
            combatant: id,
            from,
            to,
        });
        self.emit_movement();
        if self.modifiers.aiming {
            self.modifiers.aiming = false;
            self.log_line("Moving spoils the aim", LogCategory::Info);
        }
        Ok(cost)
    }

    /// Resolves a player attack.
    ///
    /// Every attempt counts as an action and clears aim and called shot,
    /// hit or miss. Attacks beyond long range are rejected untouched.
    pub fn player_attack(&mut self, request: AttackRequest) -> SkirmishResult<AttackOutcome> {
        self.require_phase(TurnPhase::Player)?;
        let player = self.require_player()?;
        let target = self.require_living(request.target, Side::Enemy)?;
        let target_position = self
            .grid
            .position_of(target.id)
            .ok_or(SkirmishError::UnknownCombatant(target.id))?;

        let weapon = &request.weapon;
        let bands = weapon.range_bands();
        if request.distance > bands.max() {
            return Err(SkirmishError::OutOfRange {
                distance: request.distance,
                max: bands.max(),
            });
        }

        let ranged = weapon.is_ranged();
        let target_number = if ranged && request.distance > MELEE_REACH {
            RANGED_TARGET_NUMBER
        } else {
            target.parry
        };

        let ctx = AttackContext {
            attacker_wounds: player.wounds,
            situational_penalty: request.situational_penalty,
            ranged,
            target_has_run: target.has_run,
            target_position,
            allies: &request.allies,
            counts_actions: true,
        };
        let called_shot = self.modifiers.called_shot;
        let (modifiers, next) = plan_attack(self.modifiers, &ctx);

        let formula = weapon.damage_formula();
        let strength = (!ranged || formula.strength).then(|| player.attributes.strength.notation());
        let strike = Strike {
            attacker: player.id,
            target: target.id,
            label: weapon.name.clone(),
            die: player.attack_die(weapon),
            wild_card: player.wild_card,
            target_number,
            modifiers,
            base_damage: formula.dice,
            strength,
            damage_bonus: called_shot.map_or(0, CalledShot::damage_bonus),
        };

        self.modifiers = next;
        self.resolve_strike(strike)
    }

    /// Attacks an enemy using the session's own grid for range and cover.
    pub fn player_attack_on_grid(
        &mut self,
        target: CombatantId,
        weapon: &Weapon,
    ) -> SkirmishResult<AttackOutcome> {
        self.require_phase(TurnPhase::Player)?;
        let player_id = self.require_player()?.id;
        let from = self
            .grid
            .position_of(player_id)
            .ok_or(SkirmishError::UnknownCombatant(player_id))?;
        let to = self
            .grid
            .position_of(target)
            .ok_or_else(|| SkirmishError::InvalidTarget(format!("{target} is not on the grid")))?;

        let penalty = self.grid.attack_penalty(from, to, &weapon.range_bands())?;
        // The player fights alone, so there are no allies to gang up.
        let request = AttackRequest::new(target, weapon.clone(), from.chebyshev_distance(to))
            .with_penalty(penalty);
        self.player_attack(request)
    }

    /// Resolves an enemy's melee attack on the player.
    ///
    /// `others` are positions of the other enemies, for gang-up. Enemies
    /// are Extras: no Wild Die and no multi-action penalty. Damage is the
    /// enemy's Strength die.
    pub fn enemy_attack_player(
        &mut self,
        enemy_id: CombatantId,
        others: &[Position],
    ) -> SkirmishResult<AttackOutcome> {
        self.require_phase(TurnPhase::Enemy)?;
        let enemy = self.require_living(enemy_id, Side::Enemy)?;
        let player = self.require_player()?;
        if player.is_defeated() {
            return Err(SkirmishError::InvalidTarget(format!(
                "{} is already down",
                player.name
            )));
        }

        let (from, to) = match (self.grid.position_of(enemy.id), self.grid.position_of(player.id)) {
            (Some(from), Some(to)) => (from, to),
            _ => return Err(SkirmishError::UnknownCombatant(enemy.id)),
        };
        let distance = from.chebyshev_distance(to);
        if distance > MELEE_REACH {
            return Err(SkirmishError::OutOfRange {
                distance,
                max: MELEE_REACH,
            });
        }

        let ctx = AttackContext {
            attacker_wounds: enemy.wounds,
            situational_penalty: 0,
            ranged: false,
            target_has_run: player.has_run,
            target_position: to,
            allies: others,
            counts_actions: false,
        };
        let (modifiers, _) = plan_attack(ModifierState::ambient(self.modifiers.illumination), &ctx);

        let strike = Strike {
            attacker: enemy.id,
            target: player.id,
            label: "a vicious swing".to_string(),
            die: enemy.attack_die(&Weapon::unarmed()),
            wild_card: false,
            target_number: player.parry,
            modifiers,
            base_damage: None,
            strength: Some(enemy.attributes.strength.notation()),
            damage_bonus: 0,
        };
        self.resolve_strike(strike)
    }

    /// Steps an enemy onto an adjacent free tile.
    pub fn move_enemy(&mut self, enemy_id: CombatantId, to: Position) -> SkirmishResult<()> {
        self.require_phase(TurnPhase::Enemy)?;
        let id = self.require_living(enemy_id, Side::Enemy)?.id;
        let from = self
            .grid
            .position_of(id)
            .ok_or(SkirmishError::UnknownCombatant(id))?;

        self.grid.check_move(from, to, 1)?;
        self.grid.place(id, to)?;
        self.emit(CombatEvent::CombatantMoved {
            combatant: id,
            from,
            to,
        });
        Ok(())
    }

    /// Ends the player's turn and hands over to the enemies.
    pub fn end_turn(&mut self) -> SkirmishResult<()> {
        self.require_phase(TurnPhase::Player)?;
        if let Some(player) = self.player_id.and_then(|id| self.combatants.get_mut(&id)) {
            player.has_run = false;
        }
        self.modifiers = self.modifiers.end_turn();
        self.set_phase(TurnPhase::Enemy);
        Ok(())
    }

    /// Ends the enemy turn and starts the next round.
    pub fn end_enemy_turn(&mut self) -> SkirmishResult<()> {
        self.require_phase(TurnPhase::Enemy)?;
        for id in &self.enemy_ids {
            if let Some(enemy) = self.combatants.get_mut(id) {
                enemy.has_run = false;
            }
        }
        self.round += 1;
        self.modifiers = self.modifiers.start_turn();
        self.movement = MovementBudget::full(self.player().map_or(0, |p| p.pace));
        self.set_phase(TurnPhase::Player);
        self.emit_movement();
        Ok(())
    }

    /// Lets every living enemy act, then starts the next round unless the
    /// fight ended.
    pub fn run_enemy_phase(&mut self) -> SkirmishResult<Vec<AttackOutcome>> {
        self.require_phase(TurnPhase::Enemy)?;
        let outcomes = crate::game::EnemyController::take_turns(self)?;
        if !self.phase.is_terminal() {
            self.end_enemy_turn()?;
        }
        Ok(outcomes)
    }

    /// Enters Victory once every enemy is down. Returns whether it did.
    pub fn check_victory(&mut self) -> bool {
        if self.phase == TurnPhase::Victory {
            return true;
        }
        if self.phase.is_terminal() || self.enemy_ids.is_empty() {
            return false;
        }
        if self.enemies().all(Combatant::is_defeated) {
            self.set_phase(TurnPhase::Victory);
            return true;
        }
        false
    }

    fn resolve_strike(&mut self, strike: Strike) -> SkirmishResult<AttackOutcome> {
        let attacker = self
            .combatants
            .get(&strike.attacker)
            .map(|c| c.name.clone())
            .ok_or(SkirmishError::UnknownCombatant(strike.attacker))?;
        let defender = self
            .combatants
            .get(&strike.target)
            .map(|c| c.name.clone())
            .ok_or(SkirmishError::UnknownCombatant(strike.target))?;
        let flat = strike.modifiers.total();
        log::debug!("{attacker} -> {defender}: {:?} net {flat:+}", strike.modifiers);

        let roll = resolve_attack(
            self.roller.as_mut(),
            strike.die.sides(),
            strike.wild_card,
            flat,
            strike.target_number,
        );
        self.emit(CombatEvent::DiceRoll(DiceRollRecord {
            roller: attacker.clone(),
            purpose: "attack".to_string(),
            die_notation: format!("d{}", strike.die.sides()),
            rolls: roll.rolls.iter().map(|&r| r as i32).collect(),
            wild_die: roll.wild_die,
            total: roll.total,
            exploded: roll.exploded,
            raises: roll.raises,
            target_number: Some(strike.target_number),
        }));

        if !roll.is_success() {
            self.log_line(
                format!(
                    "{attacker} misses {defender} with {} ({} vs {})",
                    strike.label, roll.total, strike.target_number
                ),
                LogCategory::Miss,
            );
            return Ok(AttackOutcome::Miss {
                roll,
                modifiers: strike.modifiers,
            });
        }

        let raise_text = match roll.raises {
            0 => String::new(),
            1 => " with a raise".to_string(),
            n => format!(" with {n} raises"),
        };
        self.log_line(
            format!(
                "{attacker} hits {defender} with {} ({} vs {}){raise_text}",
                strike.label, roll.total, strike.target_number
            ),
            LogCategory::Success,
        );

        let rolled = compute_damage(
            self.roller.as_mut(),
            strike.base_damage.as_ref(),
            roll.raises,
            strike.strength.as_ref(),
        );
        let damage = rolled.total.saturating_add(strike.damage_bonus);
        self.emit(CombatEvent::DiceRoll(DiceRollRecord {
            roller: attacker,
            purpose: "damage".to_string(),
            die_notation: damage_notation(&strike, roll.raises),
            rolls: rolled.rolls,
            wild_die: None,
            total: damage,
            exploded: rolled.exploded,
            raises: 0,
            target_number: None,
        }));

        let target = self
            .combatants
            .get_mut(&strike.target)
            .ok_or(SkirmishError::UnknownCombatant(strike.target))?;
        let effect = damage_effect(damage, target.toughness);
        let applied = target.apply_damage(effect);
        let target = target.clone();

        match effect {
            DamageEffect::Wounds(n) => {
                self.emit(CombatEvent::WoundsChanged {
                    combatant: target.id,
                    wounds: target.wounds,
                    max_wounds: INCAPACITATION_WOUNDS,
                });
                self.emit(CombatEvent::HealthChanged {
                    combatant: target.id,
                    health: target.health,
                    max_health: target.max_health,
                });
                let plural = if n == 1 { "" } else { "s" };
                self.log_line(
                    format!(
                        "{} takes {n} wound{plural} ({damage} damage vs Toughness {})",
                        target.name, target.toughness
                    ),
                    LogCategory::Damage,
                );
            }
            DamageEffect::Shaken => {
                self.log_line(
                    format!("{} is Shaken ({damage} damage)", target.name),
                    LogCategory::Damage,
                );
            }
            DamageEffect::NoEffect => {
                self.log_line(
                    format!("{damage} damage glances off {}", target.name),
                    LogCategory::Info,
                );
            }
        }
        if applied.became_shaken {
            self.emit(CombatEvent::ShakenChanged {
                combatant: target.id,
                shaken: true,
            });
        }

        let target_defeated = target.is_defeated();
        if target_defeated {
            self.defeat(&target);
        }

        Ok(AttackOutcome::Hit {
            roll,
            modifiers: strike.modifiers,
            damage,
            effect,
            applied,
            target_defeated,
        })
    }

    fn defeat(&mut self, combatant: &Combatant) {
        self.grid.remove(combatant.id);
        self.emit(CombatEvent::CombatantDefeated {
            combatant: combatant.id,
        });
        log::info!("{} is out of the fight", combatant.name);
        self.log_line(format!("{} is incapacitated!", combatant.name), LogCategory::Damage);

        if combatant.side == Side::Player {
            self.set_phase(TurnPhase::Defeat);
        }
    }

    fn set_phase(&mut self, phase: TurnPhase) {
        if self.phase == phase {
            return;
        }
        log::info!("Round {}: {} -> {}", self.round, self.phase, phase);
        self.phase = phase;
        self.emit(CombatEvent::PhaseChanged {
            phase,
            round: self.round,
        });

        let (message, category) = match phase {
            TurnPhase::Player => (format!("Round {}: your turn", self.round), LogCategory::Info),
            TurnPhase::Enemy => ("Enemy turn".to_string(), LogCategory::Info),
            TurnPhase::Victory => ("Victory! All enemies are down".to_string(), LogCategory::Success),
            TurnPhase::Defeat => ("Defeat...".to_string(), LogCategory::Damage),
        };
        self.log_line(message, category);
    }

    fn require_phase(&self, expected: TurnPhase) -> SkirmishResult<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(SkirmishError::WrongPhase {
                expected,
                actual: self.phase,
            })
        }
    }

    fn require_player(&self) -> SkirmishResult<&Combatant> {
        self.player()
            .ok_or_else(|| SkirmishError::InvalidAction("session has no player".to_string()))
    }

    fn require_living(&self, id: CombatantId, side: Side) -> SkirmishResult<&Combatant> {
        let combatant = self
            .combatants
            .get(&id)
            .ok_or(SkirmishError::UnknownCombatant(id))?;
        if combatant.side != side {
            return Err(SkirmishError::InvalidTarget(format!(
                "{} is not on the {side:?} side",
                combatant.name
            )));
        }
        if combatant.is_defeated() {
            return Err(SkirmishError::InvalidTarget(format!(
                "{} is already down",
                combatant.name
            )));
        }
        Ok(combatant)
    }

    fn log_line(&mut self, message: impl Into<String>, category: LogCategory) -> CombatLogEntry {
        let entry = self.log.push(message, category);
        self.events.push_back(CombatEvent::Log(entry.clone()));
        entry
    }

    fn emit(&mut self, event: CombatEvent) {
        self.events.push_back(event);
    }

    fn emit_movement(&mut self) {
        self.emit(CombatEvent::MovementBudget {
            current: self.movement.current,
            max: self.movement.max,
        });
    }
}

fn damage_notation(strike: &Strike, raises: u32) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(base) = &strike.base_damage {
        parts.push(base.to_string());
    }
    if let Some(strength) = &strike.strength {
        parts.push(strength.to_string());
    }
    if raises > 0 {
        parts.push(format!("{raises}d6"));
    }
    if strike.damage_bonus != 0 {
        parts.push(strike.damage_bonus.to_string());
    }
    parts.join("+")
}
