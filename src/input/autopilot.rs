//! # Autopilot Module
//!
//! Plays the player's side automatically, for demos and soak tests.
//!
//! Each call to [`Autopilot::next_intent`] looks at the session and proposes
//! one intent: strike the nearest enemy it can hit, aim first when the shot is
//! poor, otherwise close in, and end the turn once it has attacked or has
//! nowhere useful to go.

use crate::game::{CombatSession, CombatantId, Position, TurnPhase, Weapon};
use crate::input::PlayerIntent;

/// Automatic player.
#[derive(Debug, Clone)]
pub struct Autopilot {
    /// Shots at or below this penalty are worth aiming for first
    pub aim_threshold: i32,
    /// Enemy currently being hunted
    pub target: Option<CombatantId>,
}

impl Default for Autopilot {
    fn default() -> Self {
        Self::new()
    }
}

impl Autopilot {
    pub fn new() -> Self {
        Self {
            aim_threshold: -4,
            target: None,
        }
    }

    /// The next intent, or `None` when it is not the player's turn.
    pub fn next_intent(&mut self, session: &CombatSession) -> Option<PlayerIntent> {
        if session.phase() != TurnPhase::Player {
            return None;
        }
        let player = session.player()?;
        let at = session.position_of(player.id)?;

        if session.modifiers().actions_taken > 0 {
            return Some(PlayerIntent::EndTurn);
        }

        let mut enemies: Vec<(CombatantId, Position)> = session
            .living_enemy_ids()
            .into_iter()
            .filter_map(|id| session.position_of(id).map(|pos| (id, pos)))
            .collect();
        if enemies.is_empty() {
            self.target = None;
            return None;
        }
        enemies.sort_by_key(|(_, pos)| (at.chebyshev_distance(*pos), *pos));

        for (enemy, pos) in &enemies {
            if let Some((weapon, penalty, ranged)) = best_weapon(session, &player.weapons, at, *pos)
            {
                self.target = Some(*enemy);
                if ranged && penalty <= self.aim_threshold && !session.modifiers().aiming {
                    return Some(PlayerIntent::Aim);
                }
                return Some(PlayerIntent::Attack {
                    target: *enemy,
                    weapon,
                });
            }
        }

        let (enemy, goal) = enemies[0];
        self.target = Some(enemy);
        match approach(session, at, goal) {
            Some(to) => Some(PlayerIntent::Move(to)),
            None => Some(PlayerIntent::EndTurn),
        }
    }
}

/// Kit index (`None` for bare hands) with the mildest legal penalty.
fn best_weapon(
    session: &CombatSession,
    kit: &[Weapon],
    from: Position,
    to: Position,
) -> Option<(Option<usize>, i32, bool)> {
    let unarmed = Weapon::unarmed();
    let candidates = kit
        .iter()
        .enumerate()
        .map(|(i, w)| (Some(i), w))
        .chain(std::iter::once((None, &unarmed)));

    let mut best: Option<(Option<usize>, i32, bool)> = None;
    for (index, weapon) in candidates {
        let Ok(penalty) = session.grid().attack_penalty(from, to, &weapon.range_bands()) else {
            continue;
        };
        if best.map_or(true, |(_, current, _)| penalty > current) {
            best = Some((index, penalty, weapon.is_ranged()));
        }
    }
    best
}

/// Reachable tile that gets strictly closer to `goal`, if any.
fn approach(session: &CombatSession, from: Position, goal: Position) -> Option<Position> {
    let budget = session.movement().current;
    let current = from.chebyshev_distance(goal);
    session
        .grid()
        .reachable_tiles(from, budget)
        .into_iter()
        .map(|tile| (tile.chebyshev_distance(goal), tile))
        .filter(|(distance, _)| *distance < current && *distance >= 1)
        .min()
        .map(|(_, tile)| tile)
}
