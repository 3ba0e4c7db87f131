//! Eight-slot front/back formations.

use serde::{Deserialize, Serialize};

use crate::combat::{BattleError, Side};
use crate::data::commander::UserCommander;

pub const FORMATION_SLOTS: usize = 8;
pub const FRONT_ROW_SLOTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Row {
    Front,
    Back,
}

impl Row {
    pub const fn of_slot(slot: usize) -> Self {
        if slot < FRONT_ROW_SLOTS {
            Self::Front
        } else {
            Self::Back
        }
    }
}

/// One occupied formation slot before battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmySpec {
    pub primary: UserCommander,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<UserCommander>,
    pub troop_count: u32,
}

impl ArmySpec {
    pub fn new(primary: UserCommander, troop_count: u32) -> Self {
        Self {
            primary,
            secondary: None,
            troop_count,
        }
    }

    pub fn with_secondary(mut self, secondary: UserCommander) -> Self {
        self.secondary = Some(secondary);
        self
    }

    pub fn validate(&self) -> Result<(), BattleError> {
        self.primary.validate()?;
        if let Some(secondary) = &self.secondary {
            secondary.validate()?;
            if secondary.id().eq_ignore_ascii_case(self.primary.id()) {
                return Err(BattleError::DuplicateSecondary {
                    commander: self.primary.id().to_string(),
                });
            }
        }
        if self.troop_count == 0 {
            return Err(BattleError::InvalidTroopCount {
                commander: self.primary.id().to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Formation {
    slots: [Option<ArmySpec>; FORMATION_SLOTS],
}

impl Formation {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a formation from exactly eight optional slots.
    pub fn from_slots(slots: Vec<Option<ArmySpec>>) -> Result<Self, BattleError> {
        let len = slots.len();
        let slots: [Option<ArmySpec>; FORMATION_SLOTS] = slots
            .try_into()
            .map_err(|_| BattleError::FormationSize { len })?;
        Ok(Self { slots })
    }

    /// Places `spec` in `slot`; out-of-range slots are ignored.
    pub fn with_slot(mut self, slot: usize, spec: ArmySpec) -> Self {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = Some(spec);
        }
        self
    }

    pub fn slots(&self) -> &[Option<ArmySpec>; FORMATION_SLOTS] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&ArmySpec> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn occupied(&self) -> impl Iterator<Item = (usize, &ArmySpec)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|spec| (index, spec)))
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied().count()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied_count() == 0
    }

    pub fn validate(&self, side: Side) -> Result<(), BattleError> {
        if self.is_empty() {
            return Err(BattleError::EmptyFormation { side });
        }
        for (_, spec) in self.occupied() {
            spec.validate()?;
        }
        Ok(())
    }

    /// Applies `f` to every occupied slot's specification.
    pub fn map_specs<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&ArmySpec) -> ArmySpec,
    {
        let mut out = self.clone();
        for slot in out.slots.iter_mut().flatten() {
            *slot = f(slot);
        }
        out
    }
}
