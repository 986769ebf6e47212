use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::ReconError;
use crate::model::{ChangeEntry, MatchResult, Record};
use crate::value::FieldValue;

pub type PredicateFn = dyn Fn(&FieldValue, &FieldValue) -> bool + Send + Sync;

/// One named condition over `(source value, current target value)`.
#[derive(Clone)]
pub enum Predicate {
    /// Source cell is not blank / unparsable.
    SourcePresent,
    /// Source is not the number zero.
    SourceNonZero,
    /// Source differs from the target (numeric comparison for numbers).
    Differs,
    /// Target is blank; fill-only updates.
    TargetAbsent,
    Custom {
        name: String,
        check: Arc<PredicateFn>,
    },
}

impl Predicate {
    pub fn custom(
        name: impl Into<String>,
        check: impl Fn(&FieldValue, &FieldValue) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::Custom {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::SourcePresent => "source_present",
            Self::SourceNonZero => "source_non_zero",
            Self::Differs => "differs",
            Self::TargetAbsent => "target_absent",
            Self::Custom { name, .. } => name.as_str(),
        }
    }

    pub fn holds(&self, source: &FieldValue, target: &FieldValue) -> bool {
        match self {
            Self::SourcePresent => !source.is_absent(),
            Self::SourceNonZero => !source.is_zero(),
            Self::Differs => !source.same_as(target),
            Self::TargetAbsent => target.is_absent(),
            Self::Custom { check, .. } => check(source, target),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Conjunction of predicates. With no predicates every pair is eligible.
#[derive(Debug, Clone)]
pub struct Eligibility {
    predicates: Vec<Predicate>,
}

impl Eligibility {
    /// Present, non-zero and different from the current value.
    pub fn standard() -> Self {
        Self::all_of(vec![
            Predicate::SourcePresent,
            Predicate::SourceNonZero,
            Predicate::Differs,
        ])
    }

    pub fn all_of(predicates: Vec<Predicate>) -> Self {
        Self { predicates }
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn allows(&self, source: &FieldValue, target: &FieldValue) -> bool {
        self.predicates.iter().all(|p| p.holds(source, target))
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }
}

impl Default for Eligibility {
    fn default() -> Self {
        Self::standard()
    }
}

/// Copy `source_field` of the matched source row into `target_field` of the
/// catalog row when `eligibility` allows it.
#[derive(Debug, Clone)]
pub struct UpdateRule {
    pub source_field: String,
    pub target_field: String,
    pub eligibility: Eligibility,
}

impl UpdateRule {
    pub fn new(source_field: impl Into<String>, target_field: impl Into<String>) -> Self {
        Self {
            source_field: source_field.into(),
            target_field: target_field.into(),
            eligibility: Eligibility::standard(),
        }
    }

    pub fn when(mut self, eligibility: Eligibility) -> Self {
        self.eligibility = eligibility;
        self
    }
}

/// Ordered rules, at most one per target field.
#[derive(Debug, Clone, Default)]
pub struct UpdateRuleSet {
    rules: Vec<UpdateRule>,
}

impl UpdateRuleSet {
    pub fn new(rules: Vec<UpdateRule>) -> Result<Self, ReconError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.target_field.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "more than one rule targets '{}'",
                    rule.target_field
                )));
            }
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[UpdateRule] {
        &self.rules
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.target_field.as_str())
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.source_field.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every rule to one match result.
    ///
    /// All rules read the catalog record as it was before this call, so no
    /// rule sees another rule's write. An eligible value equal to the
    /// current one is not a change and produces no entry.
    pub fn apply(&self, matched: &MatchResult<'_>) -> (Record, Vec<ChangeEntry>) {
        let (catalog, source) = match *matched {
            MatchResult::Unmatched(catalog) => return (catalog.clone(), Vec::new()),
            MatchResult::Matched { catalog, source } => (catalog, source),
        };

        let mut updated = catalog.clone();
        let mut changes = Vec::new();

        for rule in &self.rules {
            let candidate = source.value(&rule.source_field);
            let current = catalog.value(&rule.target_field);

            if !rule.eligibility.allows(candidate, current) || candidate.same_as(current) {
                continue;
            }

            updated.set(&rule.target_field, candidate.clone());
            changes.push(ChangeEntry {
                row: catalog.position,
                key: catalog.key().to_string(),
                field: rule.target_field.clone(),
                old: current.clone(),
                new: candidate.clone(),
            });
        }

        (updated, changes)
    }
}
