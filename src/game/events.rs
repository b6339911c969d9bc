//! # Events Module
//!
//! The bounded combat log and the typed events a session queues for its host.

use crate::config::COMBAT_LOG_CAPACITY;
use crate::game::{CombatantId, Position, TurnPhase};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

/// Presentation category of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogCategory {
    Info,
    Success,
    Damage,
    Miss,
}

/// One line of the combat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatLogEntry {
    /// Monotonic sequence number within the session
    pub id: u64,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    pub message: String,
    pub category: LogCategory,
}

/// Combat log capped at [`COMBAT_LOG_CAPACITY`] entries, oldest evicted first.
///
/// # Examples
///
/// ```
/// use skirmish::{CombatLog, LogCategory};
///
/// let mut log = CombatLog::new();
/// for i in 0..150 {
///     log.push(format!("line {i}"), LogCategory::Info);
/// }
/// assert_eq!(log.len(), 100);
/// assert_eq!(log.entries().next().unwrap().message, "line 50");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombatLog {
    entries: VecDeque<CombatLogEntry>,
    next_id: u64,
}

impl CombatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a line, evicting the oldest once full, and returns a copy of it.
    pub fn push(&mut self, message: impl Into<String>, category: LogCategory) -> CombatLogEntry {
        let entry = CombatLogEntry {
            id: self.next_id,
            timestamp: now_millis(),
            message: message.into(),
            category,
        };
        self.next_id += 1;

        if self.entries.len() == COMBAT_LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(entry.clone());
        entry
    }

    /// Entries from oldest to newest.
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &CombatLogEntry> {
        self.entries.iter()
    }

    /// The most recent entry.
    pub fn last(&self) -> Option<&CombatLogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// A roll suitable for animated display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRollRecord {
    /// Name of the combatant who rolled
    pub roller: String,
    /// What the roll was for, e.g. "attack" or "damage"
    pub purpose: String,
    pub die_notation: String,
    /// Trait rolls list every face, aces included. Damage rolls list one
    /// total per die, each already summing its own aces.
    pub rolls: Vec<i32>,
    pub wild_die: Option<i32>,
    pub total: i32,
    pub exploded: bool,
    pub raises: u32,
    /// Target number, for trait rolls
    pub target_number: Option<i32>,
}

/// Events queued by a combat session for the host to drain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatEvent {
    /// A line was appended to the combat log.
    Log(CombatLogEntry),

    /// Dice were rolled.
    DiceRoll(DiceRollRecord),

    /// The turn phase changed.
    PhaseChanged { phase: TurnPhase, round: u32 },

    /// A combatant's health counter changed.
    HealthChanged {
        combatant: CombatantId,
        health: i32,
        max_health: i32,
    },

    /// A combatant took wounds.
    WoundsChanged {
        combatant: CombatantId,
        wounds: u32,
        max_wounds: u32,
    },

    /// A combatant became Shaken.
    ShakenChanged { combatant: CombatantId, shaken: bool },

    /// The player's remaining movement changed.
    MovementBudget { current: u32, max: u32 },

    /// A combatant changed tiles.
    CombatantMoved {
        combatant: CombatantId,
        from: Position,
        to: Position,
    },

    /// A combatant was taken out of the fight.
    CombatantDefeated { combatant: CombatantId },
}
