//! # Enemy AI Module
//!
//! Basic enemy controller: close the distance, then strike.
//!
//! Pathing is a single greedy step along the axis with the larger offset,
//! not a search. An enemy whose step is blocked simply waits.

use crate::game::{AttackOutcome, CombatSession, CombatantId, Position, TacticalGrid, TurnPhase};
use crate::SkirmishResult;

/// What one enemy does with its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyDecision {
    /// Already adjacent: attack
    Attack,
    /// Step to this tile, attacking afterwards if it ends adjacent
    Advance(Position),
    /// Blocked: do nothing
    Hold,
}

/// Stateless greedy enemy controller.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnemyController;

impl EnemyController {
    /// Chooses an action for an enemy at `enemy` facing the player at `player`.
    ///
    /// # Examples
    ///
    /// ```
    /// use skirmish::{EnemyController, EnemyDecision, Position, TacticalGrid};
    ///
    /// let grid = TacticalGrid::new(10, 10);
    /// let player = Position::new(2, 2);
    /// assert_eq!(
    ///     EnemyController::decide(&grid, Position::new(3, 3), player),
    ///     EnemyDecision::Attack
    /// );
    /// assert_eq!(
    ///     EnemyController::decide(&grid, Position::new(6, 3), player),
    ///     EnemyDecision::Advance(Position::new(5, 3))
    /// );
    /// ```
    pub fn decide(grid: &TacticalGrid, enemy: Position, player: Position) -> EnemyDecision {
        if enemy.is_adjacent(player) {
            return EnemyDecision::Attack;
        }
        let step = enemy.step_toward(player);
        if step == enemy || !grid.is_passable(step) || grid.is_occupied(step) {
            EnemyDecision::Hold
        } else {
            EnemyDecision::Advance(step)
        }
    }

    /// Plays one enemy's turn. Returns its attack, if it made one.
    pub fn take_turn(
        session: &mut CombatSession,
        enemy: CombatantId,
    ) -> SkirmishResult<Option<AttackOutcome>> {
        let player_id = match session.player_id() {
            Some(id) => id,
            None => return Ok(None),
        };
        let (Some(mut at), Some(target)) = (session.position_of(enemy), session.position_of(player_id))
        else {
            return Ok(None);
        };

        match Self::decide(session.grid(), at, target) {
            EnemyDecision::Attack => {}
            EnemyDecision::Advance(step) => {
                session.move_enemy(enemy, step)?;
                at = step;
                if !at.is_adjacent(target) {
                    return Ok(None);
                }
            }
            EnemyDecision::Hold => {
                log::debug!("Enemy {enemy} holds at {at:?}");
                return Ok(None);
            }
        }

        let others: Vec<Position> = session
            .living_enemy_ids()
            .into_iter()
            .filter(|id| *id != enemy)
            .filter_map(|id| session.position_of(id))
            .collect();
        session.enemy_attack_player(enemy, &others).map(Some)
    }

    /// Plays every living enemy's turn in order, stopping if the player falls.
    pub fn take_turns(session: &mut CombatSession) -> SkirmishResult<Vec<AttackOutcome>> {
        let mut outcomes = Vec::new();
        for enemy in session.living_enemy_ids() {
            if session.phase() != TurnPhase::Enemy {
                break;
            }
            if let Some(outcome) = Self::take_turn(session, enemy)? {
                outcomes.push(outcome);
            }
        }
        Ok(outcomes)
    }
}
