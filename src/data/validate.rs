use std::collections::HashMap;
use std::fmt;

use crate::data::catalog::Catalog;
use crate::data::commander::{Role, MAX_LEVEL, MAX_SKILL_LEVEL, MIN_LEVEL, MIN_STARS, SKILL_SLOTS};
use crate::data::formation::{Row, FORMATION_SLOTS};
use crate::data::loader::{load_formation_file, CommanderDraft, FormationFile};
use crate::data::RosterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationSeverity {
    Error,
    Warning,
    Info,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDiagnostic {
    pub severity: ValidationSeverity,
    pub context: String,
    pub message: String,
}

impl fmt::Display for ValidationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.context, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    pub fn push(
        &mut self,
        severity: ValidationSeverity,
        context: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(ValidationDiagnostic {
            severity,
            context: context.into(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diag| diag.severity == ValidationSeverity::Error)
    }

    pub fn count(&self, severity: ValidationSeverity) -> usize {
        self.diagnostics
            .iter()
            .filter(|diag| diag.severity == severity)
            .count()
    }
}

pub fn validate_formation_path(path: &str, catalog: &Catalog) -> Result<ValidationReport, RosterError> {
    let file = load_formation_file(path)?;
    Ok(validate_formation_file(&file, catalog))
}

/// Drafts may name a commander by id or by display name; compare catalog ids when both resolve.
fn same_commander(a: &CommanderDraft, b: &CommanderDraft, catalog: &Catalog) -> bool {
    match (catalog.get(&a.commander_id), catalog.get(&b.commander_id)) {
        (Some(a), Some(b)) => a.id.eq_ignore_ascii_case(&b.id),
        _ => a.commander_id.eq_ignore_ascii_case(&b.commander_id),
    }
}

/// Collect every problem in a formation file instead of stopping at the first one.
pub fn validate_formation_file(file: &FormationFile, catalog: &Catalog) -> ValidationReport {
    let mut report = ValidationReport::default();

    if file.slots.len() != FORMATION_SLOTS {
        report.push(
            ValidationSeverity::Error,
            "slots",
            format!("expected {FORMATION_SLOTS} slots, found {}", file.slots.len()),
        );
    }

    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut occupied = 0usize;

    for (index, slot) in file.slots.iter().enumerate() {
        let Some(draft) = slot else {
            continue;
        };
        occupied += 1;
        let context = format!("slot[{index}]");

        if draft.troop_count == 0 {
            report.push(ValidationSeverity::Error, &context, "troop_count must be positive");
        }

        check_commander(&mut report, &format!("{context}.primary"), &draft.primary, catalog);
        if let Some(secondary) = &draft.secondary {
            check_commander(&mut report, &format!("{context}.secondary"), secondary, catalog);
            if same_commander(&draft.primary, secondary, catalog) {
                report.push(
                    ValidationSeverity::Error,
                    format!("{context}.secondary"),
                    "secondary commander cannot be the same as the primary",
                );
            }
        }

        for id in std::iter::once(&draft.primary)
            .chain(draft.secondary.iter())
            .map(|c| c.commander_id.to_lowercase())
        {
            if let Some(first) = seen.get(&id) {
                report.push(
                    ValidationSeverity::Warning,
                    &context,
                    format!("commander '{id}' already fielded in slot[{first}]"),
                );
            } else {
                seen.insert(id, index);
            }
        }

        if Row::of_slot(index) == Row::Front {
            if let Some(commander) = catalog.get(&draft.primary.commander_id) {
                if !commander.has_role(Role::Tank) {
                    report.push(
                        ValidationSeverity::Info,
                        &context,
                        format!("front row is targeted first; '{}' has no tank role", commander.name),
                    );
                }
            }
        }
    }

    if occupied == 0 {
        report.push(ValidationSeverity::Error, "slots", "formation has no occupied slot");
    }

    report
}

fn check_commander(report: &mut ValidationReport, context: &str, draft: &CommanderDraft, catalog: &Catalog) {
    let Some(commander) = catalog.get(&draft.commander_id) else {
        report.push(
            ValidationSeverity::Error,
            context,
            format!("unknown commander '{}'", draft.commander_id),
        );
        return;
    };
    if !(MIN_LEVEL..=MAX_LEVEL).contains(&draft.level) {
        report.push(
            ValidationSeverity::Error,
            context,
            format!("level {} outside {MIN_LEVEL}..={MAX_LEVEL}", draft.level),
        );
    }
    let max_stars = commander.rarity.max_stars();
    if !(MIN_STARS..=max_stars).contains(&draft.stars) {
        report.push(
            ValidationSeverity::Error,
            context,
            format!("stars {} outside {MIN_STARS}..={max_stars} for {:?}", draft.stars, commander.rarity),
        );
    }
    if draft.skill_levels.len() != SKILL_SLOTS {
        report.push(
            ValidationSeverity::Error,
            context,
            format!("expected {SKILL_SLOTS} skill levels, found {}", draft.skill_levels.len()),
        );
    }
    for (slot, level) in draft.skill_levels.iter().enumerate() {
        if *level > MAX_SKILL_LEVEL {
            report.push(
                ValidationSeverity::Error,
                format!("{context}.skill_levels[{slot}]"),
                format!("skill level {level} above {MAX_SKILL_LEVEL}"),
            );
        }
    }
}
