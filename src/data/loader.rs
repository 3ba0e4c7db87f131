//! Formation files: slot drafts that reference catalog commanders by id, resolved into
//! battle-ready [Formation]s.

use std::fs;

use serde::{Deserialize, Serialize};

use crate::data::catalog::Catalog;
use crate::data::commander::{UserCommander, SKILL_SLOTS};
use crate::data::formation::{ArmySpec, Formation, FORMATION_SLOTS};
use crate::data::RosterError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommanderDraft {
    pub commander_id: String,
    pub level: u8,
    pub stars: u8,
    #[serde(default)]
    pub skill_levels: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotDraft {
    pub primary: CommanderDraft,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<CommanderDraft>,
    pub troop_count: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FormationFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub slots: Vec<Option<SlotDraft>>,
}

impl CommanderDraft {
    pub fn resolve(&self, catalog: &Catalog, slot: usize) -> Result<UserCommander, RosterError> {
        let commander = catalog
            .get(&self.commander_id)
            .cloned()
            .ok_or_else(|| RosterError::UnknownCommander {
                slot,
                commander_id: self.commander_id.clone(),
            })?;
        let skill_levels: [u8; SKILL_SLOTS] =
            self.skill_levels
                .clone()
                .try_into()
                .map_err(|levels: Vec<u8>| RosterError::SkillSlots {
                    slot,
                    count: levels.len(),
                })?;
        Ok(UserCommander::new(commander, self.level, self.stars, skill_levels))
    }
}

impl SlotDraft {
    pub fn resolve(&self, catalog: &Catalog, slot: usize) -> Result<ArmySpec, RosterError> {
        let primary = self.primary.resolve(catalog, slot)?;
        let secondary = self
            .secondary
            .as_ref()
            .map(|draft| draft.resolve(catalog, slot))
            .transpose()?;
        Ok(ArmySpec {
            primary,
            secondary,
            troop_count: self.troop_count,
        })
    }
}

impl FormationFile {
    /// Resolve every slot against `catalog`. Progression ranges are checked later by the
    /// battle runner; this only fails on shape and unknown ids.
    pub fn resolve(&self, catalog: &Catalog) -> Result<Formation, RosterError> {
        if self.slots.len() != FORMATION_SLOTS {
            return Err(RosterError::SlotCount {
                count: self.slots.len(),
            });
        }
        let slots = self
            .slots
            .iter()
            .enumerate()
            .map(|(index, slot)| slot.as_ref().map(|draft| draft.resolve(catalog, index)).transpose())
            .collect::<Result<Vec<_>, _>>()?;
        Formation::from_slots(slots).map_err(|_| RosterError::SlotCount {
            count: self.slots.len(),
        })
    }
}

pub fn load_formation_file(path: &str) -> Result<FormationFile, RosterError> {
    let raw = fs::read_to_string(path).map_err(|source| RosterError::Io {
        path: path.to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| RosterError::Parse {
        path: path.to_string(),
        source,
    })
}

/// Read a formation file and resolve it against `catalog` in one step.
pub fn load_formation(path: &str, catalog: &Catalog) -> Result<Formation, RosterError> {
    load_formation_file(path)?.resolve(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::commander::fixtures::commander;
    use crate::data::commander::Role;

    fn catalog() -> Catalog {
        Catalog::from_commanders([commander("warden", &[Role::Tank]), commander("archon", &[Role::Nuker])])
    }

    fn draft(id: &str) -> CommanderDraft {
        CommanderDraft {
            commander_id: id.to_string(),
            level: 40,
            stars: 3,
            skill_levels: vec![5, 1, 1, 0],
        }
    }

    fn file_with(slot: usize, draft: SlotDraft) -> FormationFile {
        let mut slots = vec![None; FORMATION_SLOTS];
        slots[slot] = Some(draft);
        FormationFile { name: None, slots }
    }

    #[test]
    fn resolves_primary_and_secondary() {
        let file = file_with(
            5,
            SlotDraft {
                primary: draft("archon"),
                secondary: Some(draft("warden")),
                troop_count: 5000,
            },
        );
        let formation = file.resolve(&catalog()).expect("should resolve");
        let spec = formation.slot(5).expect("slot 5 occupied");
        assert_eq!(spec.primary.id(), "archon");
        assert_eq!(spec.secondary.as_ref().map(UserCommander::id), Some("warden"));
        assert_eq!(spec.primary.skill_levels, [5, 1, 1, 0]);
    }

    #[test]
    fn unknown_commander_names_the_slot() {
        let file = file_with(
            2,
            SlotDraft {
                primary: draft("ghost"),
                secondary: None,
                troop_count: 1,
            },
        );
        let err = file.resolve(&catalog()).unwrap_err();
        assert!(matches!(err, RosterError::UnknownCommander { slot: 2, .. }));
    }

    #[test]
    fn wrong_skill_slot_count_is_rejected() {
        let mut bad = draft("warden");
        bad.skill_levels = vec![1, 2, 3];
        let file = file_with(
            0,
            SlotDraft {
                primary: bad,
                secondary: None,
                troop_count: 1,
            },
        );
        assert!(matches!(
            file.resolve(&catalog()),
            Err(RosterError::SkillSlots { slot: 0, count: 3 })
        ));
    }

    #[test]
    fn slot_count_must_be_eight() {
        let file = FormationFile {
            name: None,
            slots: vec![None; 3],
        };
        assert!(matches!(file.resolve(&catalog()), Err(RosterError::SlotCount { count: 3 })));
    }
}
