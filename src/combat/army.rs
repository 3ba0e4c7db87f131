use std::fmt;

use serde::{Deserialize, Serialize};

use crate::combat::stats::EffectiveStats;
use crate::data::{EffectKind, Role, Row, TroopType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Attacker,
    Defender,
}

impl Side {
    pub const fn opponent(self) -> Self {
        match self {
            Self::Attacker => Self::Defender,
            Self::Defender => Self::Attacker,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Attacker => "attacker",
            Self::Defender => "defender",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArmyId {
    pub side: Side,
    pub slot: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffect {
    pub name: String,
    pub kind: EffectKind,
    pub magnitude: f64,
    pub remaining_turns: u32,
    /// Turn the effect landed; it starts ticking down after this turn ends.
    pub applied_turn: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Army {
    pub id: ArmyId,
    pub commander_id: String,
    pub commander_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_name: Option<String>,
    pub role: Role,
    pub troop_type: TroopType,
    pub troop_count: u32,
    pub stats: EffectiveStats,
    pub current_health: f64,
    pub is_alive: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<ActiveEffect>,
}

impl Army {
    pub fn row(&self) -> Row {
        Row::of_slot(self.id.slot)
    }

    /// `current / max`, zero for a defeated army.
    pub fn health_fraction(&self) -> f64 {
        if self.stats.max_health <= 0.0 {
            return 0.0;
        }
        (self.current_health / self.stats.max_health).clamp(0.0, 1.0)
    }

    pub fn is_damaged(&self) -> bool {
        self.is_alive && self.current_health < self.stats.max_health
    }

    /// Label used as the log target, e.g. `defender#2 Iron Warden`.
    pub fn label(&self) -> String {
        format!("{}#{} {}", self.id.side, self.id.slot, self.commander_name)
    }

    pub fn is_stunned(&self) -> Option<&ActiveEffect> {
        self.effects.iter().find(|effect| effect.kind == EffectKind::Stun)
    }

    /// Product of active buffs and debuffs on attack.
    pub fn attack_modifier(&self) -> f64 {
        self.modifier_for(EffectKind::AttackBuff, EffectKind::AttackDebuff)
    }

    pub fn defense_modifier(&self) -> f64 {
        self.modifier_for(EffectKind::DefenseBuff, EffectKind::DefenseDebuff)
    }

    fn modifier_for(&self, buff: EffectKind, debuff: EffectKind) -> f64 {
        let (up, down) = self.effects.iter().fold((0.0, 0.0), |(up, down), effect| {
            if effect.kind == buff {
                (up + effect.magnitude, down)
            } else if effect.kind == debuff {
                (up, down + effect.magnitude)
            } else {
                (up, down)
            }
        });
        ((1.0 + up) * (1.0 - down)).max(0.0)
    }

    /// Lands `effect`, refreshing an existing effect of the same name instead of stacking it.
    pub fn apply_effect(&mut self, effect: ActiveEffect) {
        if let Some(existing) = self.effects.iter_mut().find(|e| e.name == effect.name) {
            *existing = effect;
        } else {
            self.effects.push(effect);
        }
    }

    /// Tick effects at the end of `turn`; expired ones are dropped.
    pub fn tick_effects(&mut self, turn: u32) {
        for effect in &mut self.effects {
            if effect.applied_turn < turn {
                effect.remaining_turns = effect.remaining_turns.saturating_sub(1);
            }
        }
        self.effects.retain(|effect| effect.remaining_turns > 0);
    }

    /// Subtract `amount` (floored at zero health) and return whether this hit defeated the army.
    pub fn take_damage(&mut self, amount: f64) -> bool {
        self.current_health = (self.current_health - amount).max(0.0);
        if self.current_health <= 0.0 && self.is_alive {
            self.is_alive = false;
            self.effects.clear();
            return true;
        }
        false
    }

    /// Restore up to `amount`, never above max health. Returns the amount actually restored.
    pub fn heal(&mut self, amount: f64) -> f64 {
        let before = self.current_health;
        self.current_health = (self.current_health + amount).min(self.stats.max_health);
        self.current_health - before
    }

    /// Health must be finite, within bounds, and agree with the alive flag.
    pub fn integrity_violation(&self) -> Option<String> {
        if !self.current_health.is_finite() {
            return Some(format!("health is not finite ({})", self.current_health));
        }
        if self.current_health < 0.0 {
            return Some(format!("health is negative ({})", self.current_health));
        }
        if self.current_health > self.stats.max_health {
            return Some(format!(
                "health {} exceeds maximum {}",
                self.current_health, self.stats.max_health
            ));
        }
        if self.is_alive != (self.current_health > 0.0) {
            return Some(format!(
                "alive flag {} disagrees with health {}",
                self.is_alive, self.current_health
            ));
        }
        None
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::army;
    use super::*;

    fn effect(name: &str, kind: EffectKind, magnitude: f64, turns: u32, applied: u32) -> ActiveEffect {
        ActiveEffect {
            name: name.to_string(),
            kind,
            magnitude,
            remaining_turns: turns,
            applied_turn: applied,
        }
    }

    #[test]
    fn damage_to_zero_defeats_once() {
        let mut target = army(Side::Defender, 0, Role::Tank, 100.0);
        assert!(!target.take_damage(40.0));
        assert!(target.take_damage(80.0));
        assert_eq!(target.current_health, 0.0);
        assert!(!target.is_alive);
        assert!(!target.take_damage(10.0));
        assert!(target.integrity_violation().is_none());
    }

    #[test]
    fn heal_clamps_to_max_and_reports_applied_amount() {
        let mut target = army(Side::Attacker, 1, Role::Nuker, 100.0);
        target.take_damage(30.0);
        assert_eq!(target.heal(50.0), 30.0);
        assert_eq!(target.current_health, 100.0);
        assert!(!target.is_damaged());
    }

    #[test]
    fn effect_lasts_through_the_following_turn() {
        let mut target = army(Side::Defender, 0, Role::Tank, 100.0);
        target.apply_effect(effect("Shackle", EffectKind::Stun, 0.0, 1, 3));
        target.tick_effects(3);
        assert!(target.is_stunned().is_some());
        target.tick_effects(4);
        assert!(target.is_stunned().is_none());
    }

    #[test]
    fn same_named_effect_refreshes() {
        let mut target = army(Side::Defender, 0, Role::Tank, 100.0);
        target.apply_effect(effect("War Cry", EffectKind::AttackBuff, 0.1, 1, 1));
        target.apply_effect(effect("War Cry", EffectKind::AttackBuff, 0.1, 2, 2));
        assert_eq!(target.effects.len(), 1);
        assert_eq!(target.effects[0].remaining_turns, 2);
    }

    #[test]
    fn modifiers_combine_buffs_and_debuffs() {
        let mut target = army(Side::Attacker, 0, Role::Nuker, 100.0);
        target.apply_effect(effect("up", EffectKind::AttackBuff, 0.5, 2, 1));
        target.apply_effect(effect("down", EffectKind::AttackDebuff, 0.5, 2, 1));
        assert!((target.attack_modifier() - 0.75).abs() < 1e-12);
        assert_eq!(target.defense_modifier(), 1.0);
    }

    #[test]
    fn integrity_flags_mismatched_alive_flag() {
        let mut target = army(Side::Attacker, 0, Role::Tank, 100.0);
        target.is_alive = false;
        assert!(target.integrity_violation().is_some());
        target.is_alive = true;
        target.current_health = f64::NAN;
        assert!(target.integrity_violation().is_some());
    }
}
