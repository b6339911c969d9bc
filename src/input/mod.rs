//! # Input Module
//!
//! Player intents supplied by the host and their dispatch onto a session.

pub mod autopilot;

pub use autopilot::*;

use crate::game::{
    AttackOutcome, AttackRequest, CombatSession, CombatantId, Direction, MovementBudget, Position,
    Weapon,
};
use crate::rules::{CalledShot, Illumination};
use crate::{SkirmishError, SkirmishResult};
use serde::{Deserialize, Serialize};

/// A request from the host on behalf of the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerIntent {
    /// Move to an absolute tile
    Move(Position),
    /// Move one square in a direction
    Step(Direction),
    /// Aim for the next ranged attack
    Aim,
    /// Choose or clear a called-shot location
    CalledShot(Option<CalledShot>),
    /// Sprint for extra movement
    Run,
    /// Attack using the session's grid; `weapon` indexes the player's kit,
    /// `None` fights bare-handed
    Attack {
        target: CombatantId,
        weapon: Option<usize>,
    },
    /// Attack with range, cover and allies supplied by the host
    AttackWith(AttackRequest),
    /// Change the light level
    SetIllumination(Illumination),
    /// Hand over to the enemies
    EndTurn,
}

/// What a dispatched intent did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentResult {
    /// Squares spent moving
    Moved(u32),
    /// New movement budget after running
    Ran(MovementBudget),
    Attacked(AttackOutcome),
    /// Flag or setting changed; nothing rolled
    Updated,
    TurnEnded,
}

impl CombatSession {
    /// Dispatches a player intent.
    ///
    /// # Examples
    ///
    /// ```
    /// use skirmish::{
    ///     CombatSession, Combatant, IntentResult, PlayerIntent, Position, SessionConfig,
    ///     TurnPhase,
    /// };
    ///
    /// let mut session = CombatSession::new(SessionConfig::for_testing(1));
    /// session.add_player(Combatant::player("Hero"), Position::new(2, 2)).unwrap();
    /// session.add_enemy(Combatant::bandit("Bandit"), Position::new(9, 9)).unwrap();
    ///
    /// let moved = session.submit(PlayerIntent::Move(Position::new(4, 4))).unwrap();
    /// assert_eq!(moved, IntentResult::Moved(2));
    ///
    /// session.submit(PlayerIntent::EndTurn).unwrap();
    /// assert_eq!(session.phase(), TurnPhase::Enemy);
    /// ```
    pub fn submit(&mut self, intent: PlayerIntent) -> SkirmishResult<IntentResult> {
        log::debug!("Intent: {intent:?}");
        match intent {
            PlayerIntent::Move(to) => self.move_player(to).map(IntentResult::Moved),
            PlayerIntent::Step(direction) => {
                let id = self
                    .player_id()
                    .ok_or_else(|| SkirmishError::InvalidAction("session has no player".to_string()))?;
                let from = self
                    .position_of(id)
                    .ok_or(SkirmishError::UnknownCombatant(id))?;
                self.move_player(from + direction.to_delta())
                    .map(IntentResult::Moved)
            }
            PlayerIntent::Aim => self.aim().map(|_| IntentResult::Updated),
            PlayerIntent::CalledShot(shot) => {
                self.set_called_shot(shot).map(|_| IntentResult::Updated)
            }
            PlayerIntent::Run => self.run().map(IntentResult::Ran),
            PlayerIntent::Attack { target, weapon } => {
                let weapon = self.player_weapon(weapon)?;
                self.player_attack_on_grid(target, &weapon)
                    .map(IntentResult::Attacked)
            }
            PlayerIntent::AttackWith(request) => {
                self.player_attack(request).map(IntentResult::Attacked)
            }
            PlayerIntent::SetIllumination(level) => {
                self.set_illumination(level);
                Ok(IntentResult::Updated)
            }
            PlayerIntent::EndTurn => self.end_turn().map(|_| IntentResult::TurnEnded),
        }
    }

    fn player_weapon(&self, index: Option<usize>) -> SkirmishResult<Weapon> {
        let player = self
            .player()
            .ok_or_else(|| SkirmishError::InvalidAction("session has no player".to_string()))?;
        match index {
            None => Ok(Weapon::unarmed()),
            Some(i) => player.weapons.get(i).cloned().ok_or_else(|| {
                SkirmishError::InvalidAction(format!("{} has no weapon #{i}", player.name))
            }),
        }
    }
}
