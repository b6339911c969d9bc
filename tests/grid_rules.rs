//! Integration tests for line of sight, cover, range and movement on the grid.

use skirmish::{
    CombatSession, Combatant, CoverLevel, CoverTile, LineOfSight, Position, RangeBands,
    ScriptedDice, SessionConfig, SkirmishError, SkirmishResult, TacticalGrid, Weapon,
};

#[test]
fn test_opaque_tile_returns_blocked_sentinel() {
    let mut grid = TacticalGrid::new(12, 12);
    let mut crate_stack = CoverTile::new(Position::new(5, 3), CoverLevel::Light);
    crate_stack.blocks_line_of_sight = true;
    grid.add_cover(crate_stack);

    let los = grid.line_of_sight(Position::new(1, 3), Position::new(9, 3));
    assert_eq!(los, LineOfSight::Blocked);
    assert_eq!(los.penalty(), None);
}

#[test]
fn test_building_interior_and_windows() {
    let mut grid = TacticalGrid::new(20, 20);
    // A 5x5 building with a window on its west wall.
    for y in 2..=6 {
        for x in 4..=8 {
            let position = Position::new(x, y);
            let tile = if (x, y) == (4, 4) {
                CoverTile::window(position, CoverLevel::Light)
            } else if x == 4 || x == 8 || y == 2 || y == 6 {
                CoverTile::wall(position)
            } else {
                CoverTile::floor(position, 3)
            };
            grid.add_cover(tile.in_building(3));
        }
    }

    // Outside looking in through the window.
    let through_window = grid.line_of_sight(Position::new(1, 4), Position::new(6, 4));
    assert_eq!(through_window, LineOfSight::Clear { cover_penalty: -2 });

    // Outside looking through a wall.
    let through_wall = grid.line_of_sight(Position::new(1, 3), Position::new(6, 3));
    assert_eq!(through_wall, LineOfSight::Blocked);

    // Two occupants of the same building see each other.
    let inside = grid.line_of_sight(Position::new(5, 3), Position::new(7, 5));
    assert_eq!(inside, LineOfSight::Clear { cover_penalty: 0 });
}

#[test]
fn test_walls_block_movement_and_placement() -> SkirmishResult<()> {
    let mut session =
        CombatSession::with_roller(SessionConfig::for_testing(1), ScriptedDice::new([]));
    session.add_cover(CoverTile::wall(Position::new(4, 4)));
    session.add_cover(CoverTile::new(Position::new(5, 5), CoverLevel::Medium));

    let bad = session.add_player(Combatant::player("Hero"), Position::new(4, 4));
    assert!(matches!(bad, Err(SkirmishError::MovementBlocked(_))));
    session.add_player(Combatant::player("Hero"), Position::new(2, 2))?;

    assert!(session.move_player(Position::new(4, 4)).is_err());
    assert_eq!(session.move_player(Position::new(5, 5))?, 3);
    assert_eq!(session.movement().current, 3);
    Ok(())
}

#[test]
fn test_player_cannot_climb_through_a_window() -> SkirmishResult<()> {
    let mut session =
        CombatSession::with_roller(SessionConfig::for_testing(1), ScriptedDice::new([]));
    session.add_cover(CoverTile::window(Position::new(3, 2), CoverLevel::Medium));
    session.add_cover(CoverTile::door(Position::new(2, 3), CoverLevel::Light));
    let hero = session.add_player(Combatant::player("Hero"), Position::new(2, 2))?;

    let result = session.move_player(Position::new(3, 2));
    assert!(matches!(result, Err(SkirmishError::MovementBlocked(_))));
    assert_eq!(session.position_of(hero), Some(Position::new(2, 2)));

    assert_eq!(session.move_player(Position::new(2, 3))?, 1);
    assert_eq!(session.position_of(hero), Some(Position::new(2, 3)));
    Ok(())
}

#[test]
fn test_rejected_move_changes_nothing() -> SkirmishResult<()> {
    let mut session =
        CombatSession::with_roller(SessionConfig::for_testing(1), ScriptedDice::new([]));
    let hero = session.add_player(Combatant::player("Hero"), Position::new(2, 2))?;
    session.add_enemy(Combatant::bandit("Bandit"), Position::new(3, 3))?;
    session.drain_events();

    assert!(session.move_player(Position::new(3, 3)).is_err());
    assert!(session.move_player(Position::new(9, 2)).is_err());
    assert_eq!(session.position_of(hero), Some(Position::new(2, 2)));
    assert_eq!(session.movement().current, 6);
    assert!(session.drain_events().is_empty());
    Ok(())
}

#[test]
fn test_attack_on_grid_uses_range_and_cover() -> SkirmishResult<()> {
    let mut session =
        CombatSession::with_roller(SessionConfig::for_testing(1), ScriptedDice::new([]));
    session.add_player(Combatant::player("Hero"), Position::new(0, 0))?;
    let near = session.add_enemy(Combatant::bandit("Near"), Position::new(14, 0))?;
    let hidden = session.add_enemy(Combatant::bandit("Hidden"), Position::new(0, 10))?;
    session.add_cover(CoverTile::new(Position::new(7, 0), CoverLevel::Medium));
    session.add_cover(CoverTile::wall(Position::new(0, 5)));

    let colt = Weapon::ranged("Colt Peacemaker", "2d6+1", "12/24/48");
    let outcome = session.player_attack_on_grid(near, &colt)?;
    assert_eq!(outcome.modifiers().situational, -6);

    let blocked = session.player_attack_on_grid(hidden, &colt);
    assert!(matches!(blocked, Err(SkirmishError::LineOfSightBlocked)));

    let knife = Weapon::melee("Knife", "Str+d4");
    let too_far = session.player_attack_on_grid(near, &knife);
    assert!(matches!(
        too_far,
        Err(SkirmishError::OutOfRange { distance: 14, max: 1 })
    ));
    assert_eq!(session.modifiers().actions_taken, 1);
    Ok(())
}

#[test]
fn test_range_string_forms() {
    let explicit = RangeBands::parse(Some("5/10/20"));
    assert_eq!(explicit.penalty(5), Some(0));
    assert_eq!(explicit.penalty(10), Some(-2));
    assert_eq!(explicit.penalty(20), Some(-4));
    assert_eq!(explicit.penalty(21), None);

    let doubled = RangeBands::parse(Some("3"));
    assert_eq!((doubled.short, doubled.medium, doubled.long), (3, 6, 12));

    let melee = RangeBands::parse(None);
    assert_eq!(melee.penalty(1), Some(0));
    assert_eq!(melee.penalty(2), None);
}
