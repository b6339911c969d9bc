//! Integration tests for full attack resolution through the combat session.

use skirmish::{
    AttackOutcome, AttackRequest, CalledShot, CombatEvent, CombatSession, Combatant, CombatantId,
    DamageEffect, Illumination, Position, ScriptedDice, SessionConfig, SkirmishError,
    SkirmishResult, TurnPhase, Weapon,
};

fn session_with(
    faces: impl IntoIterator<Item = u32>,
    player_at: Position,
    enemies: Vec<(Combatant, Position)>,
) -> SkirmishResult<(CombatSession, Vec<CombatantId>)> {
    let mut session =
        CombatSession::with_roller(SessionConfig::for_testing(42), ScriptedDice::new(faces));
    session.add_player(Combatant::player("Hero"), player_at)?;
    let mut ids = Vec::new();
    for (enemy, position) in enemies {
        ids.push(session.add_enemy(enemy, position)?);
    }
    Ok((session, ids))
}

#[test]
fn test_fighting_d8_against_parry_5_inflicts_two_wounds() -> SkirmishResult<()> {
    // Skill 6, Wild Die 3, weapon 2d6 = 3 + 4, Strength d6 = 4.
    let brute = Combatant::bandit("Brute").with_parry(5).with_toughness(6);
    let (mut session, ids) =
        session_with([6, 3, 3, 4, 4], Position::new(5, 5), vec![(brute, Position::new(6, 5))])?;

    let club = Weapon::melee("Club", "Str+2d6");
    let outcome = session.player_attack(AttackRequest::new(ids[0], club, 1))?;

    let roll = outcome.roll();
    assert_eq!(roll.total, 6);
    assert_eq!(roll.wild_die, Some(3));
    assert_eq!(roll.target_number, 5);
    assert_eq!(roll.raises, 0);

    match outcome {
        AttackOutcome::Hit { damage, effect, .. } => {
            assert_eq!(damage, 11);
            assert_eq!(effect, DamageEffect::Wounds(2));
        }
        AttackOutcome::Miss { .. } => panic!("expected a hit"),
    }

    let brute = session.combatant(ids[0]).unwrap();
    assert_eq!(brute.wounds, 2);
    assert_eq!(brute.health, brute.max_health - 8);
    assert!(brute.is_alive());

    let events = session.drain_events();
    assert!(events.contains(&CombatEvent::WoundsChanged {
        combatant: ids[0],
        wounds: 2,
        max_wounds: 3
    }));
    assert!(events
        .iter()
        .any(|e| matches!(e, CombatEvent::DiceRoll(record) if record.purpose == "damage" && record.total == 11)));
    Ok(())
}

#[test]
fn test_damage_record_lists_one_total_per_die() -> SkirmishResult<()> {
    // Skill 6 vs Parry 5; weapon 2d6 aces 6+2 then rolls 3; Strength d6 rolls 1.
    let (mut session, ids) = session_with(
        [6, 1, 6, 2, 3, 1],
        Position::new(5, 5),
        vec![(Combatant::bandit("Bandit"), Position::new(6, 5))],
    )?;
    session.drain_events();
    let club = Weapon::melee("Club", "Str+2d6");
    session.player_attack(AttackRequest::new(ids[0], club, 1))?;

    let records: Vec<_> = session
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            CombatEvent::DiceRoll(record) => Some(record),
            _ => None,
        })
        .collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].purpose, "attack");
    assert_eq!(records[0].rolls, vec![6]);
    assert_eq!(records[1].purpose, "damage");
    assert_eq!(records[1].rolls, vec![8, 3, 1]);
    assert_eq!(records[1].total, 12);
    assert!(records[1].exploded);
    Ok(())
}

#[test]
fn test_running_target_at_medium_range_with_aim_and_head_shot() -> SkirmishResult<()> {
    let target_at = Position::new(19, 2);
    let (mut session, ids) = session_with(
        [],
        Position::new(1, 2),
        vec![(Combatant::bandit("Runner"), target_at)],
    )?;
    let colt = Weapon::ranged("Colt Peacemaker", "2d6+1", "12/24/48");

    session.mark_ran(ids[0])?;
    session.aim()?;
    session.set_called_shot(Some(CalledShot::Head))?;
    let request = AttackRequest::new(ids[0], colt.clone(), 18).with_penalty(-2);
    let outcome = session.player_attack(request)?;

    let mods = outcome.modifiers();
    assert_eq!(mods.situational, -2);
    assert_eq!(mods.aim, 2);
    assert_eq!(mods.running_target, -2);
    assert_eq!(mods.called_shot, -4);
    assert_eq!(mods.total(), -6);
    assert_eq!(outcome.roll().target_number, 4);

    // Same shot at a target that did not run.
    let (mut session, ids) = session_with(
        [],
        Position::new(1, 2),
        vec![(Combatant::bandit("Sitter"), target_at)],
    )?;
    session.aim()?;
    session.set_called_shot(Some(CalledShot::Head))?;
    let outcome =
        session.player_attack(AttackRequest::new(ids[0], colt, 18).with_penalty(-2))?;
    assert_eq!(outcome.modifiers().total(), -4);
    Ok(())
}

#[test]
fn test_head_shot_adds_four_damage_after_raises() -> SkirmishResult<()> {
    // Skill 7 - 4 = 3 vs Parry 2; d4 knife 1 and Strength d6 1 = 2 + 4 = 6 vs T5.
    let (mut session, ids) = session_with(
        [7, 1, 1, 1],
        Position::new(5, 5),
        vec![(Combatant::bandit("Bandit").with_parry(2), Position::new(5, 6))],
    )?;
    session.set_called_shot(Some(CalledShot::Head))?;
    let outcome = session.player_attack(AttackRequest::new(
        ids[0],
        Weapon::melee("Knife", "Str+d4"),
        1,
    ))?;

    assert_eq!(outcome.modifiers().called_shot, -4);
    match outcome {
        AttackOutcome::Hit { damage, effect, .. } => {
            assert_eq!(damage, 6);
            assert_eq!(effect, DamageEffect::Wounds(1));
        }
        AttackOutcome::Miss { .. } => panic!("expected a hit"),
    }
    Ok(())
}

#[test]
fn test_ranged_attack_in_melee_uses_parry() -> SkirmishResult<()> {
    let (mut session, ids) = session_with(
        [],
        Position::new(5, 5),
        vec![(Combatant::bandit("Bandit").with_parry(9), Position::new(6, 6))],
    )?;
    let colt = Weapon::ranged("Colt Peacemaker", "2d6+1", "12/24/48");
    let outcome = session.player_attack(AttackRequest::new(ids[0], colt, 1))?;
    assert_eq!(outcome.roll().target_number, 9);
    Ok(())
}

#[test]
fn test_multi_action_penalty_sequence_and_reset() -> SkirmishResult<()> {
    let (mut session, ids) = session_with(
        [],
        Position::new(5, 5),
        vec![(Combatant::bandit("Bandit"), Position::new(6, 5))],
    )?;

    let mut penalties = Vec::new();
    for _ in 0..4 {
        let outcome = session.player_attack(AttackRequest::new(ids[0], Weapon::unarmed(), 1))?;
        penalties.push(outcome.modifiers().multi_action);
        assert!(!session.modifiers().aiming);
    }
    assert_eq!(penalties, vec![0, -2, -4, -6]);

    session.end_turn()?;
    assert_eq!(session.modifiers().actions_taken, 4);
    session.run_enemy_phase()?;
    assert_eq!(session.phase(), TurnPhase::Player);
    assert_eq!(session.modifiers().actions_taken, 0);

    let outcome = session.player_attack(AttackRequest::new(ids[0], Weapon::unarmed(), 1))?;
    assert_eq!(outcome.modifiers().multi_action, 0);
    Ok(())
}

#[test]
fn test_illumination_persists_until_changed() -> SkirmishResult<()> {
    let (mut session, ids) = session_with(
        [],
        Position::new(5, 5),
        vec![(Combatant::bandit("Bandit"), Position::new(6, 5))],
    )?;
    session.set_illumination(Illumination::PitchBlack);

    for _ in 0..2 {
        let outcome = session.player_attack(AttackRequest::new(ids[0], Weapon::unarmed(), 1))?;
        assert_eq!(outcome.modifiers().illumination, -4);
    }
    session.end_turn()?;
    session.end_enemy_turn()?;
    assert_eq!(session.modifiers().illumination, Illumination::PitchBlack);

    session.set_illumination(Illumination::Dim);
    let outcome = session.player_attack(AttackRequest::new(ids[0], Weapon::unarmed(), 1))?;
    assert_eq!(outcome.modifiers().illumination, -1);
    Ok(())
}

#[test]
fn test_gang_up_from_host_supplied_allies() -> SkirmishResult<()> {
    let (mut session, ids) = session_with(
        [],
        Position::new(5, 5),
        vec![(Combatant::bandit("Bandit"), Position::new(6, 5))],
    )?;
    let allies = vec![
        Position::new(7, 5),
        Position::new(7, 6),
        Position::new(6, 6),
        Position::new(5, 4),
        Position::new(6, 4),
        Position::new(8, 5),
    ];
    let request = AttackRequest::new(ids[0], Weapon::unarmed(), 1).with_allies(allies);
    let outcome = session.player_attack(request)?;
    assert_eq!(outcome.modifiers().gang_up, 4);
    Ok(())
}

#[test]
fn test_enemy_gang_up_and_player_running_flag_cleared() -> SkirmishResult<()> {
    let (mut session, ids) = session_with(
        [],
        Position::new(5, 5),
        vec![
            (Combatant::bandit("Left"), Position::new(4, 5)),
            (Combatant::bandit("Right"), Position::new(6, 5)),
            (Combatant::bandit("Far"), Position::new(9, 9)),
        ],
    )?;
    session.run()?;
    session.end_turn()?;
    assert!(!session.player().unwrap().has_run);

    let others = [Position::new(6, 5), Position::new(9, 9)];
    let outcome = session.enemy_attack_player(ids[0], &others)?;
    let mods = outcome.modifiers();
    assert_eq!(mods.gang_up, 1);
    assert_eq!(mods.running_target, 0);
    assert_eq!(mods.multi_action, 0);
    assert_eq!(outcome.roll().wild_die, None);
    assert_eq!(outcome.roll().target_number, 6);

    let far = session.enemy_attack_player(ids[2], &[]);
    assert!(matches!(far, Err(SkirmishError::OutOfRange { .. })));
    Ok(())
}

#[test]
fn test_three_wounds_defeat_the_player() -> SkirmishResult<()> {
    // Fighting d6 aces to 14 vs Parry 6 (two raises); Strength d6 aces to 13,
    // raise dice 1 and 1: 15 damage vs Toughness 5 is three wounds.
    let (mut session, ids) = session_with(
        [6, 6, 2, 6, 6, 1, 1, 1],
        Position::new(5, 5),
        vec![(Combatant::bandit("Killer"), Position::new(5, 6))],
    )?;
    session.end_turn()?;
    let outcome = session.enemy_attack_player(ids[0], &[])?;

    match outcome {
        AttackOutcome::Hit {
            damage,
            target_defeated,
            ..
        } => {
            assert_eq!(damage, 15);
            assert!(target_defeated);
        }
        AttackOutcome::Miss { .. } => panic!("expected a hit"),
    }
    assert_eq!(session.phase(), TurnPhase::Defeat);
    assert_eq!(session.player().unwrap().wounds, 3);
    assert_eq!(session.player().unwrap().health, 0);

    assert!(session.end_enemy_turn().is_err());
    assert!(session.aim().is_err());
    assert!(!session.check_victory());
    assert_eq!(session.phase(), TurnPhase::Defeat);
    Ok(())
}

#[test]
fn test_lowered_health_pool_does_not_defeat_the_player() -> SkirmishResult<()> {
    // Fighting d6 aces to 7 vs Parry 6; Strength d6 rolls 5 vs Toughness 5: one wound.
    let mut session =
        CombatSession::with_roller(SessionConfig::for_testing(42), ScriptedDice::new([6, 1, 5]));
    let mut hero = Combatant::player("Hero");
    hero.max_health = 4;
    hero.health = 4;
    session.add_player(hero, Position::new(5, 5))?;
    let bandit = session.add_enemy(Combatant::bandit("Bandit"), Position::new(5, 6))?;
    session.end_turn()?;

    let outcome = session.enemy_attack_player(bandit, &[])?;
    assert!(outcome.is_hit());
    assert!(matches!(
        outcome,
        AttackOutcome::Hit {
            target_defeated: false,
            ..
        }
    ));

    let player = session.player().unwrap();
    assert_eq!(player.wounds, 1);
    assert_eq!(player.health, 0);
    assert!(player.is_alive());
    assert_eq!(session.phase(), TurnPhase::Enemy);

    session.end_enemy_turn()?;
    assert_eq!(session.phase(), TurnPhase::Player);
    session.aim()?;
    Ok(())
}

#[test]
fn test_enemy_phase_closes_distance_and_starts_next_round() -> SkirmishResult<()> {
    let (mut session, ids) = session_with(
        [],
        Position::new(2, 2),
        vec![
            (Combatant::bandit("One"), Position::new(8, 2)),
            (Combatant::bandit("Two"), Position::new(2, 9)),
        ],
    )?;
    session.move_player(Position::new(3, 2))?;
    assert_eq!(session.movement().current, 5);
    session.end_turn()?;

    let outcomes = session.run_enemy_phase()?;
    assert!(outcomes.is_empty());
    assert_eq!(session.position_of(ids[0]), Some(Position::new(7, 2)));
    assert_eq!(session.position_of(ids[1]), Some(Position::new(2, 8)));
    assert_eq!(session.round(), 2);
    assert_eq!(session.phase(), TurnPhase::Player);
    assert_eq!(session.movement().current, 6);

    let events = session.drain_events();
    assert!(events.contains(&CombatEvent::PhaseChanged {
        phase: TurnPhase::Player,
        round: 2
    }));
    assert!(events.contains(&CombatEvent::MovementBudget { current: 6, max: 6 }));
    Ok(())
}

#[test]
fn test_attacks_against_defeated_or_unknown_targets_are_rejected() -> SkirmishResult<()> {
    let (mut session, _) = session_with(
        [],
        Position::new(5, 5),
        vec![(Combatant::bandit("Bandit"), Position::new(6, 5))],
    )?;
    let stranger = Combatant::bandit("Stranger").id;
    let result = session.player_attack(AttackRequest::new(stranger, Weapon::unarmed(), 1));
    assert!(matches!(result, Err(SkirmishError::UnknownCombatant(_))));

    let hero = session.player_id().unwrap();
    let result = session.player_attack(AttackRequest::new(hero, Weapon::unarmed(), 1));
    assert!(matches!(result, Err(SkirmishError::InvalidTarget(_))));
    assert_eq!(session.modifiers().actions_taken, 0);
    Ok(())
}

#[test]
fn test_combat_log_stays_bounded() -> SkirmishResult<()> {
    let (mut session, ids) = session_with(
        [],
        Position::new(5, 5),
        vec![(Combatant::bandit("Bandit"), Position::new(6, 5))],
    )?;
    for _ in 0..150 {
        session.player_attack(AttackRequest::new(ids[0], Weapon::unarmed(), 1))?;
    }
    assert_eq!(session.log().len(), 100);

    // The event queue keeps every log line until the host drains it.
    let logged = session
        .drain_events()
        .into_iter()
        .filter(|event| matches!(event, CombatEvent::Log(_)))
        .count();
    assert!(logged > 150);
    assert!(session.drain_events().is_empty());
    Ok(())
}
