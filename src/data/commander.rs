//! Commander catalog entries and player-owned commander instances.
//!
//! Roles and troop types are closed enums: an unknown string in a catalog file fails at
//! deserialization instead of surfacing mid-battle.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::combat::BattleError;

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 60;
pub const MIN_STARS: u8 = 1;
pub const MAX_SKILL_LEVEL: u8 = 5;
pub const SKILL_SLOTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Elite,
    Epic,
    Legendary,
}

impl Rarity {
    /// Legendary commanders ascend to six stars; everything else caps at five.
    pub const fn max_stars(self) -> u8 {
        match self {
            Self::Legendary => 6,
            Self::Elite | Self::Epic => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TroopType {
    Infantry,
    Cavalry,
    Archer,
    Mixed,
}

impl TroopType {
    /// Cavalry rides down infantry, infantry closes on archers, archers shoot cavalry.
    pub const fn counters(self, other: TroopType) -> bool {
        matches!(
            (self, other),
            (Self::Cavalry, Self::Infantry)
                | (Self::Infantry, Self::Archer)
                | (Self::Archer, Self::Cavalry)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Tank,
    Nuker,
    Healer,
    Support,
    Disabler,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tank => "tank",
            Self::Nuker => "nuker",
            Self::Healer => "healer",
            Self::Support => "support",
            Self::Disabler => "disabler",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseStats {
    pub attack: f64,
    pub defense: f64,
    pub health: f64,
    pub march_speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commander {
    pub id: String,
    pub name: String,
    pub rarity: Rarity,
    pub troop_type: TroopType,
    /// Ordered role list; the first entry decides what the army does on its turn.
    pub roles: Vec<Role>,
    pub base_stats: BaseStats,
    #[serde(default)]
    pub skills: Vec<SkillDefinition>,
    #[serde(default)]
    pub synergies: Vec<String>,
}

impl Commander {
    pub fn primary_role(&self) -> Option<Role> {
        self.roles.first().copied()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn shares_synergy_with(&self, other: &Commander) -> bool {
        self.synergies
            .iter()
            .any(|tag| other.synergies.iter().any(|theirs| theirs.eq_ignore_ascii_case(tag)))
    }
}

/// A catalog commander with the player's progression applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCommander {
    pub commander: Commander,
    pub level: u8,
    pub stars: u8,
    pub skill_levels: [u8; SKILL_SLOTS],
}

impl UserCommander {
    pub fn new(commander: Commander, level: u8, stars: u8, skill_levels: [u8; SKILL_SLOTS]) -> Self {
        Self {
            commander,
            level,
            stars,
            skill_levels,
        }
    }

    pub fn id(&self) -> &str {
        &self.commander.id
    }

    pub fn name(&self) -> &str {
        &self.commander.name
    }

    /// Rejects progression values the calculator must never see. Nothing is clamped.
    pub fn validate(&self) -> Result<(), BattleError> {
        let commander = &self.commander.id;
        if self.commander.roles.is_empty() {
            return Err(BattleError::EmptyRoles {
                commander: commander.clone(),
            });
        }
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&self.level) {
            return Err(BattleError::InvalidLevel {
                commander: commander.clone(),
                level: self.level,
            });
        }
        let max_stars = self.commander.rarity.max_stars();
        if !(MIN_STARS..=max_stars).contains(&self.stars) {
            return Err(BattleError::InvalidStars {
                commander: commander.clone(),
                stars: self.stars,
                max: max_stars,
            });
        }
        if let Some((slot, &level)) = self
            .skill_levels
            .iter()
            .enumerate()
            .find(|(_, &level)| level > MAX_SKILL_LEVEL)
        {
            return Err(BattleError::InvalidSkillLevel {
                commander: commander.clone(),
                slot,
                level,
            });
        }
        let stats = &self.commander.base_stats;
        let finite_non_negative = [stats.attack, stats.defense, stats.health, stats.march_speed]
            .iter()
            .all(|value| value.is_finite() && *value >= 0.0);
        if !finite_non_negative || stats.health <= 0.0 {
            return Err(BattleError::InvalidBaseStats {
                commander: commander.clone(),
            });
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn level_outside_range_is_rejected() {
        let mut uc = maxed("a", &[Role::Tank]);
        uc.level = 61;
        assert!(matches!(uc.validate(), Err(BattleError::InvalidLevel { level: 61, .. })));
        uc.level = 0;
        assert!(matches!(uc.validate(), Err(BattleError::InvalidLevel { level: 0, .. })));
    }

    #[test]
    fn six_stars_only_for_legendary() {
        let mut uc = maxed("a", &[Role::Tank]);
        uc.stars = 6;
        assert!(uc.validate().is_ok());
        uc.commander.rarity = Rarity::Epic;
        assert!(matches!(
            uc.validate(),
            Err(BattleError::InvalidStars { stars: 6, max: 5, .. })
        ));
    }

    #[test]
    fn skill_level_above_five_names_the_slot() {
        let mut uc = maxed("a", &[Role::Tank]);
        uc.skill_levels = [5, 5, 6, 5];
        assert!(matches!(
            uc.validate(),
            Err(BattleError::InvalidSkillLevel { slot: 2, level: 6, .. })
        ));
    }

    #[test]
    fn unknown_role_fails_to_deserialize() {
        let raw = r#"{"id":"x","name":"X","rarity":"epic","troop_type":"archer",
            "roles":["berserker"],
            "base_stats":{"attack":1,"defense":1,"health":1,"march_speed":1}}"#;
        assert!(serde_json::from_str::<Commander>(raw).is_err());
    }

    #[test]
    fn troop_counters_form_a_cycle() {
        assert!(TroopType::Cavalry.counters(TroopType::Infantry));
        assert!(TroopType::Infantry.counters(TroopType::Archer));
        assert!(TroopType::Archer.counters(TroopType::Cavalry));
        assert!(!TroopType::Mixed.counters(TroopType::Infantry));
        assert!(!TroopType::Infantry.counters(TroopType::Cavalry));
    }

    #[test]
    fn synergy_match_is_case_insensitive() {
        let mut a = commander("a", &[Role::Tank]);
        let mut b = commander("b", &[Role::Nuker]);
        a.synergies = vec!["Vanguard".to_string()];
        b.synergies = vec!["vanguard".to_string(), "garrison".to_string()];
        assert!(a.shares_synergy_with(&b));
    }
}
