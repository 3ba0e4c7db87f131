//! Battle runner: validates two formations, computes effective stats once, and drives the turn
//! resolver until the battle concludes.
//!
//! The runner is a pure function of (formations, balance, random sequence). Replaying the same
//! inputs with the same sequence reproduces the same [BattleState], log included.

use serde::{Deserialize, Serialize};

use crate::combat::army::{Army, ArmyId, Side};
use crate::combat::error::BattleError;
use crate::combat::rng::RandomSource;
use crate::combat::stats::army_stats;
use crate::combat::turn::resolve_turn;
use crate::data::{BalanceConfig, Formation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Attacker,
    Defender,
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleStatus {
    InProgress,
    Concluded(Winner),
}

/// One action in the battle log. Entries are appended and never touched again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleLogEntry {
    pub turn: u32,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl BattleLogEntry {
    pub(crate) fn new(turn: u32, action: String) -> Self {
        Self {
            turn,
            action,
            damage: None,
            heal: None,
            effect: None,
            target: None,
        }
    }

    pub(crate) fn with_damage(mut self, damage: f64) -> Self {
        self.damage = Some(damage);
        self
    }

    pub(crate) fn with_heal(mut self, heal: f64) -> Self {
        self.heal = Some(heal);
        self
    }

    pub(crate) fn with_effect(mut self, effect: impl Into<String>) -> Self {
        self.effect = Some(effect.into());
        self
    }

    pub(crate) fn with_target(mut self, target: String) -> Self {
        self.target = Some(target);
        self
    }
}

/// A battle in progress or concluded. Only the engine mutates it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BattleState {
    pub(crate) turn: u32,
    pub(crate) attacker: Vec<Army>,
    pub(crate) defender: Vec<Army>,
    pub(crate) log: Vec<BattleLogEntry>,
    pub(crate) winner: Option<Winner>,
    pub(crate) decided_by_turn_limit: bool,
}

impl BattleState {
    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn armies(&self, side: Side) -> &[Army] {
        match side {
            Side::Attacker => &self.attacker,
            Side::Defender => &self.defender,
        }
    }

    pub(crate) fn armies_mut(&mut self, side: Side) -> &mut Vec<Army> {
        match side {
            Side::Attacker => &mut self.attacker,
            Side::Defender => &mut self.defender,
        }
    }

    pub fn army(&self, id: ArmyId) -> Option<&Army> {
        self.armies(id.side).iter().find(|army| army.id.slot == id.slot)
    }

    pub(crate) fn army_mut(&mut self, id: ArmyId) -> Option<&mut Army> {
        self.armies_mut(id.side)
            .iter_mut()
            .find(|army| army.id.slot == id.slot)
    }

    pub fn log(&self) -> &[BattleLogEntry] {
        &self.log
    }

    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    pub fn decided_by_turn_limit(&self) -> bool {
        self.decided_by_turn_limit
    }

    pub fn status(&self) -> BattleStatus {
        match self.winner {
            Some(winner) => BattleStatus::Concluded(winner),
            None => BattleStatus::InProgress,
        }
    }

    pub fn is_concluded(&self) -> bool {
        self.winner.is_some()
    }

    pub fn alive_count(&self, side: Side) -> usize {
        self.armies(side).iter().filter(|army| army.is_alive).count()
    }

    /// Aggregate remaining health over aggregate max health for one side.
    pub fn health_fraction(&self, side: Side) -> f64 {
        let (current, max) = self
            .armies(side)
            .iter()
            .fold((0.0, 0.0), |(current, max), army| {
                (current + army.current_health, max + army.stats.max_health)
            });
        if max <= 0.0 {
            0.0
        } else {
            current / max
        }
    }

    pub(crate) fn push_log(&mut self, entry: BattleLogEntry) {
        self.log.push(entry);
    }
}

fn build_armies(
    formation: &Formation,
    side: Side,
    config: &BalanceConfig,
) -> Result<Vec<Army>, BattleError> {
    formation.validate(side)?;
    formation
        .occupied()
        .map(|(slot, spec)| {
            let stats = army_stats(spec, config)?;
            let role = spec
                .primary
                .commander
                .primary_role()
                .ok_or_else(|| BattleError::EmptyRoles {
                    commander: spec.primary.id().to_string(),
                })?;
            Ok(Army {
                id: ArmyId { side, slot },
                commander_id: spec.primary.id().to_string(),
                commander_name: spec.primary.name().to_string(),
                secondary_name: spec.secondary.as_ref().map(|s| s.name().to_string()),
                role,
                troop_type: spec.primary.commander.troop_type,
                troop_count: spec.troop_count,
                stats,
                current_health: stats.max_health,
                is_alive: true,
                effects: Vec::new(),
            })
        })
        .collect()
}

/// Validate inputs and build the turn-zero state. Fails closed on any configuration error, so an
/// empty or malformed formation never yields a one-sided result.
pub fn prepare_battle(
    attacker: &Formation,
    defender: &Formation,
    config: &BalanceConfig,
) -> Result<BattleState, BattleError> {
    config.validate()?;
    let attacker = build_armies(attacker, Side::Attacker, config)?;
    let defender = build_armies(defender, Side::Defender, config)?;
    Ok(BattleState {
        turn: 0,
        attacker,
        defender,
        log: Vec::new(),
        winner: None,
        decided_by_turn_limit: false,
    })
}

/// Run a fresh copy of `template` to its conclusion.
pub fn run_prepared<R>(
    template: &BattleState,
    config: &BalanceConfig,
    rng: &mut R,
) -> Result<BattleState, BattleError>
where
    R: RandomSource + ?Sized,
{
    let mut state = template.clone();
    tracing::debug!(
        attackers = state.attacker.len(),
        defenders = state.defender.len(),
        "battle start"
    );
    while let BattleStatus::InProgress = resolve_turn(&mut state, config, rng)? {}
    tracing::debug!(
        turns = state.turn,
        winner = ?state.winner,
        by_turn_limit = state.decided_by_turn_limit,
        "battle concluded"
    );
    Ok(state)
}

pub fn run_battle<R>(
    attacker: &Formation,
    defender: &Formation,
    config: &BalanceConfig,
    rng: &mut R,
) -> Result<BattleState, BattleError>
where
    R: RandomSource + ?Sized,
{
    let template = prepare_battle(attacker, defender, config)?;
    run_prepared(&template, config, rng)
}

#[cfg(test)]
impl BattleState {
    pub(crate) fn from_armies(attacker: Vec<Army>, defender: Vec<Army>) -> Self {
        Self {
            turn: 0,
            attacker,
            defender,
            log: Vec::new(),
            winner: None,
            decided_by_turn_limit: false,
        }
    }
}
