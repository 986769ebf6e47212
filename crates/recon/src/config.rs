use std::collections::HashSet;

use serde::Deserialize;

use crate::error::ReconError;
use crate::index::DuplicatePolicy;
use crate::rules::{Eligibility, Predicate, UpdateRule, UpdateRuleSet};
use crate::schema::{FieldKind, Schema};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    pub name: String,
    /// Column printed in the changed-keys summary. Defaults to the catalog key.
    #[serde(default)]
    pub report_field: Option<String>,
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    /// Shard matching and rule application across threads.
    #[serde(default)]
    pub parallel: bool,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub key: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub identifiers: Vec<String>,
    #[serde(default)]
    pub money: Vec<String>,
    #[serde(default)]
    pub text: Vec<String>,
    #[serde(default)]
    pub required: Vec<String>,
}

// ---------------------------------------------------------------------------
// Sources + rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub file: String,
    pub key: String,
    #[serde(default)]
    pub identifiers: Vec<String>,
    #[serde(default)]
    pub money: Vec<String>,
    #[serde(default)]
    pub text: Vec<String>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub on_duplicate: DuplicatePolicy,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    pub source: String,
    pub target: String,
    #[serde(default = "default_when")]
    pub when: Vec<PredicateName>,
}

/// Built-in predicates addressable from TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateName {
    SourcePresent,
    SourceNonZero,
    Differs,
    TargetAbsent,
}

impl From<PredicateName> for Predicate {
    fn from(name: PredicateName) -> Self {
        match name {
            PredicateName::SourcePresent => Predicate::SourcePresent,
            PredicateName::SourceNonZero => Predicate::SourceNonZero,
            PredicateName::Differs => Predicate::Differs,
            PredicateName::TargetAbsent => Predicate::TargetAbsent,
        }
    }
}

fn default_when() -> Vec<PredicateName> {
    vec![
        PredicateName::SourcePresent,
        PredicateName::SourceNonZero,
        PredicateName::Differs,
    ]
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl SyncConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: SyncConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("name must not be empty".into()));
        }
        if self.catalog.key.trim().is_empty() {
            return Err(ReconError::ConfigValidation("catalog key must not be empty".into()));
        }
        if self.sources.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one [[sources]] entry is required".into(),
            ));
        }

        let mut names = HashSet::new();
        let mut claimed_targets: Vec<(&str, &str)> = Vec::new();

        for source in &self.sources {
            if !names.insert(source.name.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate source name '{}'",
                    source.name
                )));
            }
            if source.key.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "source '{}': key must not be empty",
                    source.name
                )));
            }
            if source.rules.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "source '{}': at least one rule is required",
                    source.name
                )));
            }

            for rule in &source.rules {
                if rule.target == self.catalog.key {
                    return Err(ReconError::ConfigValidation(format!(
                        "source '{}': rule targets the catalog key '{}'",
                        source.name, rule.target
                    )));
                }
                // Two sources writing one field would flip it on every run.
                if let Some((owner, _)) = claimed_targets
                    .iter()
                    .find(|(owner, target)| *target == rule.target && *owner != source.name)
                {
                    return Err(ReconError::ConfigValidation(format!(
                        "field '{}' is targeted by both source '{owner}' and source '{}'",
                        rule.target, source.name
                    )));
                }
                claimed_targets.push((source.name.as_str(), rule.target.as_str()));
            }

            self.rule_set(source)?;
            self.source_schema(source)?;
        }

        let catalog = self.catalog_schema()?;
        for source in &self.sources {
            let schema = self.source_schema(source)?;
            for rule in &source.rules {
                if catalog.kind_of(&rule.target) == FieldKind::Money
                    && schema.kind_of(&rule.source) != FieldKind::Money
                {
                    return Err(ReconError::ConfigValidation(format!(
                        "source '{}': money field '{}' is filled from non-money column '{}'",
                        source.name, rule.target, rule.source
                    )));
                }
            }
        }

        Ok(())
    }

    /// Column used when listing changed records.
    pub fn report_field(&self) -> &str {
        self.report_field.as_deref().unwrap_or(&self.catalog.key)
    }

    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Catalog schema: declared columns, the report field, and every rule
    /// target as required. An undeclared target takes its source field's kind.
    pub fn catalog_schema(&self) -> Result<Schema, ReconError> {
        let c = &self.catalog;
        let mut schema = Schema::new("catalog", c.key.clone());
        declare_all(&mut schema, &c.identifiers, &c.money, &c.text)?;

        for source in &self.sources {
            let source_schema = self.source_schema(source)?;
            for rule in &source.rules {
                let kind = match schema.spec(&rule.target) {
                    Some(spec) => spec.kind,
                    None => source_schema.kind_of(&rule.source),
                };
                schema.declare(&rule.target, kind, true)?;
            }
        }

        for name in &c.required {
            schema.require(name);
        }
        if let Some(ref field) = self.report_field {
            schema.require(field);
        }
        Ok(schema)
    }

    /// Source schema: declared columns and every rule source as required.
    /// An undeclared rule source takes the kind its target is declared with
    /// in the catalog.
    pub fn source_schema(&self, source: &SourceConfig) -> Result<Schema, ReconError> {
        let mut schema = Schema::new(source.name.clone(), source.key.clone());
        declare_all(&mut schema, &source.identifiers, &source.money, &source.text)?;
        for rule in &source.rules {
            match (schema.spec(&rule.source), self.catalog_kind(&rule.target)) {
                (None, Some(kind)) => schema.declare(&rule.source, kind, true)?,
                _ => schema.require(&rule.source),
            }
        }
        for name in &source.required {
            schema.require(name);
        }
        Ok(schema)
    }

    /// Kind a catalog column is explicitly declared with.
    fn catalog_kind(&self, field: &str) -> Option<FieldKind> {
        let c = &self.catalog;
        let declared = |names: &[String]| names.iter().any(|n| n == field);
        if declared(&c.identifiers) {
            Some(FieldKind::Identifier)
        } else if declared(&c.money) {
            Some(FieldKind::Money)
        } else if declared(&c.text) {
            Some(FieldKind::Text)
        } else {
            None
        }
    }

    pub fn rule_set(&self, source: &SourceConfig) -> Result<UpdateRuleSet, ReconError> {
        let rules = source
            .rules
            .iter()
            .map(|r| {
                UpdateRule::new(r.source.clone(), r.target.clone()).when(Eligibility::all_of(
                    r.when.iter().copied().map(Predicate::from).collect(),
                ))
            })
            .collect();
        UpdateRuleSet::new(rules).map_err(|e| match e {
            ReconError::ConfigValidation(msg) => {
                ReconError::ConfigValidation(format!("source '{}': {msg}", source.name))
            }
            other => other,
        })
    }
}

fn declare_all(
    schema: &mut Schema,
    identifiers: &[String],
    money: &[String],
    text: &[String],
) -> Result<(), ReconError> {
    for name in identifiers {
        schema.declare(name, FieldKind::Identifier, false)?;
    }
    for name in money {
        schema.declare(name, FieldKind::Money, false)?;
    }
    for name in text {
        schema.declare(name, FieldKind::Text, false)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
