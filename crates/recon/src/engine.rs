use std::collections::HashMap;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{SourceConfig, SyncConfig};
use crate::error::ReconError;
use crate::index::{DuplicatePolicy, SourceIndex};
use crate::matcher::{match_records, match_records_parallel};
use crate::model::{
    ChangeEntry, MatchStats, PassReport, Reconciliation, Record, RecordOutcome, ReconWarning,
    SyncMeta, SyncResult,
};
use crate::normalize::{normalize_table, Normalized};
use crate::report::{compute_summary, ChangeReport};
use crate::rules::UpdateRuleSet;
use crate::schema::{FieldKind, Schema};
use crate::table::RawTable;

// ---------------------------------------------------------------------------
// Single pass
// ---------------------------------------------------------------------------

/// Everything one catalog/source pass needs besides the records.
#[derive(Debug, Clone)]
pub struct ReconOptions {
    /// Dataset name used in warnings and errors.
    pub source_name: String,
    pub catalog_key: String,
    pub source_key: String,
    pub rules: UpdateRuleSet,
    pub duplicates: DuplicatePolicy,
    pub parallel: bool,
}

impl ReconOptions {
    pub fn new(
        catalog_key: impl Into<String>,
        source_key: impl Into<String>,
        rules: UpdateRuleSet,
    ) -> Self {
        Self {
            source_name: "source".into(),
            catalog_key: catalog_key.into(),
            source_key: source_key.into(),
            rules,
            duplicates: DuplicatePolicy::default(),
            parallel: false,
        }
    }
}

/// Reconcile normalized catalog records against one source.
///
/// Returns the updated catalog (same length and order as the input), the
/// change report, match statistics and duplicate-key warnings. The input
/// slices are not modified.
pub fn reconcile(
    catalog: &[Record],
    source: &[Record],
    options: &ReconOptions,
) -> Result<Reconciliation, ReconError> {
    if options.rules.targets().any(|t| t == options.catalog_key) {
        return Err(ReconError::ConfigValidation(format!(
            "{}: rule targets the catalog key '{}'",
            options.source_name, options.catalog_key
        )));
    }

    let index = SourceIndex::build(source, &options.source_key);
    let mut warnings = Vec::new();
    if let Some(warning) = index.resolve_duplicates(&options.source_name, options.duplicates)? {
        debug!(
            source = %options.source_name,
            discarded = index.discarded(),
            keys = ?index.duplicates(),
            "duplicate source keys, first occurrence kept"
        );
        warnings.push(warning);
    }

    let matches = if options.parallel {
        match_records_parallel(catalog, &index)
    } else {
        match_records(catalog, &index)
    };

    let applied: Vec<(Record, Vec<ChangeEntry>)> = if options.parallel {
        matches.par_iter().map(|m| options.rules.apply(m)).collect()
    } else {
        matches.iter().map(|m| options.rules.apply(m)).collect()
    };

    let mut stats = MatchStats {
        catalog_rows: catalog.len(),
        source_rows: source.len(),
        ..MatchStats::default()
    };
    let mut updated = Vec::with_capacity(catalog.len());
    let mut report = ChangeReport::new();

    for (matched, (record, entries)) in matches.iter().zip(applied) {
        let outcome = if !matched.is_matched() {
            RecordOutcome::Unmatched
        } else if entries.is_empty() {
            RecordOutcome::NoChange
        } else {
            debug!(key = record.key(), fields = entries.len(), "record updated");
            RecordOutcome::Updated
        };
        stats.record(outcome);
        report.push_record(entries);
        updated.push(record);
    }

    info!(
        source = %options.source_name,
        catalog_rows = stats.catalog_rows,
        source_rows = stats.source_rows,
        matched = stats.matched,
        unmatched = stats.unmatched,
        updated = stats.updated,
        "reconciliation pass complete"
    );

    Ok(Reconciliation {
        catalog: updated,
        report,
        stats,
        warnings,
    })
}

/// Normalize both tables against their schemas, then [`reconcile`].
/// Both headers are checked before any row is read.
pub fn reconcile_tables(
    catalog: &RawTable,
    catalog_schema: &Schema,
    source: &RawTable,
    source_schema: &Schema,
    options: &ReconOptions,
) -> Result<Reconciliation, ReconError> {
    catalog_schema.validate_header(&catalog.headers)?;
    source_schema.validate_header(&source.headers)?;

    let catalog = normalize_table(catalog, catalog_schema)?;
    let source = normalize_table(source, source_schema)?;

    let mut result = reconcile(&catalog.records, &source.records, options)?;

    let mut warnings = catalog.warnings;
    warnings.extend(source.warnings);
    warnings.append(&mut result.warnings);
    result.warnings = warnings;
    Ok(result)
}

// ---------------------------------------------------------------------------
// Config-driven run
// ---------------------------------------------------------------------------

/// Raw input of a config-driven run. Sources are keyed by config name.
#[derive(Debug, Clone)]
pub struct SyncInput {
    pub catalog: RawTable,
    pub sources: HashMap<String, RawTable>,
}

/// A source whose header has been checked, ready for its pass.
struct PreparedSource<'a> {
    config: &'a SourceConfig,
    table: &'a RawTable,
    schema: Schema,
    rules: UpdateRuleSet,
}

/// Validate the config, then every header: catalog first, then sources in
/// declaration order.
fn prepare<'a>(
    config: &'a SyncConfig,
    input: &'a SyncInput,
) -> Result<(Schema, Vec<PreparedSource<'a>>), ReconError> {
    config.validate()?;

    let catalog_schema = config.catalog_schema()?;
    catalog_schema.validate_header(&input.catalog.headers)?;

    let mut prepared = Vec::with_capacity(config.sources.len());
    for source in &config.sources {
        let table = input.sources.get(&source.name).ok_or_else(|| {
            ReconError::ConfigValidation(format!("no data loaded for source '{}'", source.name))
        })?;
        let schema = config.source_schema(source)?;
        schema.validate_header(&table.headers)?;
        prepared.push(PreparedSource {
            config: source,
            table,
            schema,
            rules: config.rule_set(source)?,
        });
    }
    Ok((catalog_schema, prepared))
}

/// Check the config and every input header without reading any row.
pub fn validate_input(config: &SyncConfig, input: &SyncInput) -> Result<(), ReconError> {
    prepare(config, input).map(|_| ())
}

/// Run every source of the config against the catalog, in order. Each pass
/// sees the catalog produced by the previous one.
///
/// All headers are validated before the first pass, so a schema error
/// never leaves a partial result.
pub fn run(config: &SyncConfig, input: &SyncInput) -> Result<SyncResult, ReconError> {
    let (catalog_schema, prepared) = prepare(config, input)?;

    let Normalized {
        records: mut catalog,
        warnings: mut all_warnings,
    } = normalize_table(&input.catalog, &catalog_schema)?;

    let mut passes = Vec::with_capacity(prepared.len());
    for PreparedSource {
        config: source,
        table,
        schema,
        rules,
    } in prepared
    {
        let normalized = normalize_table(table, &schema)?;
        let options = ReconOptions {
            source_name: source.name.clone(),
            catalog_key: config.catalog.key.clone(),
            source_key: source.key.clone(),
            rules,
            duplicates: source.on_duplicate,
            parallel: config.parallel,
        };
        let pass = reconcile(&catalog, &normalized.records, &options)?;

        let mut warnings = normalized.warnings;
        warnings.extend(pass.warnings);
        all_warnings.extend(warnings.iter().cloned());

        catalog = pass.catalog;
        passes.push(PassReport {
            source: source.name.clone(),
            stats: pass.stats,
            report: pass.report,
            warnings,
        });
    }

    let merged = ChangeReport::merge(passes.iter().map(|p| &p.report));
    let summary = compute_summary(&merged, &catalog, config.report_field.as_deref());

    info!(
        config = %config.name,
        passes = passes.len(),
        records_changed = summary.records_changed,
        fields_changed = summary.fields_changed,
        warnings = all_warnings.len(),
        "sync complete"
    );

    Ok(SyncResult {
        meta: SyncMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        passes,
        warnings: all_warnings,
        headers: input.catalog.headers.clone(),
        catalog,
    })
}

// ---------------------------------------------------------------------------
// Snapshot diff
// ---------------------------------------------------------------------------

pub const DEFAULT_DIFF_KEY: &str = "Variant SKU";
pub const DEFAULT_MONEY_FIELDS: &[&str] = &["Variant Price", "Cost per item", "Compare At Price"];

#[derive(Debug, Clone)]
pub struct DiffOptions {
    pub key_field: String,
    /// Columns to compare. `None` compares every shared column but the key.
    pub fields: Option<Vec<String>>,
    /// Columns compared numerically, when present.
    pub money: Vec<String>,
    pub duplicates: DuplicatePolicy,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            key_field: DEFAULT_DIFF_KEY.into(),
            fields: None,
            money: DEFAULT_MONEY_FIELDS.iter().map(|s| s.to_string()).collect(),
            duplicates: DuplicatePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    pub rows: usize,
    pub duplicate_keys: usize,
}

/// Raw text of the compared fields of one changed record, both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRecord {
    pub key: String,
    pub before: Vec<String>,
    pub after: Vec<String>,
}

/// Field differences between two snapshots of one catalog.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotDiff {
    pub key_field: String,
    pub compared_fields: Vec<String>,
    pub before: SnapshotStats,
    pub after: SnapshotStats,
    pub matched: usize,
    pub only_before: usize,
    pub only_after: usize,
    pub report: ChangeReport,
    pub warnings: Vec<ReconWarning>,
    /// Changed records in `before` order, one cell per compared field.
    #[serde(skip)]
    pub records: Vec<DiffRecord>,
}

impl SnapshotDiff {
    pub fn has_differences(&self) -> bool {
        !self.report.is_empty()
    }
}

fn snapshot_schema(table: &RawTable, options: &DiffOptions) -> Result<Schema, ReconError> {
    let mut schema = Schema::new(table.name.clone(), options.key_field.clone());
    for field in &options.money {
        if table.column(field).is_some() {
            schema.declare(field, FieldKind::Money, false)?;
        }
    }
    if let Some(ref fields) = options.fields {
        for field in fields {
            schema.require(field);
        }
    }
    Ok(schema)
}

/// Inner join `before` and `after` on the key and report every compared
/// field whose value differs. Keys present on one side only are counted.
/// The first row per key takes part; later rows are duplicates.
pub fn diff_snapshots(
    before: &RawTable,
    after: &RawTable,
    options: &DiffOptions,
) -> Result<SnapshotDiff, ReconError> {
    let before_schema = snapshot_schema(before, options)?;
    let after_schema = snapshot_schema(after, options)?;
    before_schema.validate_header(&before.headers)?;
    after_schema.validate_header(&after.headers)?;

    let compared_fields: Vec<String> = match options.fields {
        Some(ref fields) => fields
            .iter()
            .filter(|f| **f != options.key_field)
            .cloned()
            .collect(),
        None => before
            .headers
            .iter()
            .filter(|h| **h != options.key_field && after.headers.contains(h))
            .cloned()
            .collect(),
    };

    let Normalized {
        records: before_records,
        mut warnings,
    } = normalize_table(before, &before_schema)?;
    let Normalized {
        records: after_records,
        warnings: after_warnings,
    } = normalize_table(after, &after_schema)?;
    warnings.extend(after_warnings);

    let before_index = SourceIndex::build(&before_records, &options.key_field);
    let after_index = SourceIndex::build(&after_records, &options.key_field);

    for (name, index) in [(&before.name, &before_index), (&after.name, &after_index)] {
        info!(
            snapshot = %name,
            rows = index.len() + index.discarded() + index.blank_keys(),
            duplicate_keys = index.duplicates().len(),
            "snapshot loaded"
        );
        if let Some(warning) = index.resolve_duplicates(name, options.duplicates)? {
            warnings.push(warning);
        }
    }

    let mut report = ChangeReport::new();
    let mut records = Vec::new();
    let mut matched = 0;
    let mut only_before = 0;

    for record in &before_records {
        match before_index.lookup(record.key()) {
            Some(first) if first.position == record.position => {}
            _ => continue,
        }
        let Some(other) = after_index.lookup(record.key()) else {
            only_before += 1;
            continue;
        };
        matched += 1;

        let entries: Vec<ChangeEntry> = compared_fields
            .iter()
            .filter(|f| !record.value(f).same_as(other.value(f)))
            .map(|f| ChangeEntry {
                row: record.position,
                key: record.key().to_string(),
                field: f.clone(),
                old: record.value(f).clone(),
                new: other.value(f).clone(),
            })
            .collect();
        if entries.is_empty() {
            continue;
        }

        let raw_cells = |r: &Record| -> Vec<String> {
            compared_fields
                .iter()
                .map(|f| r.raw(f).unwrap_or("").to_string())
                .collect()
        };
        records.push(DiffRecord {
            key: record.key().to_string(),
            before: raw_cells(record),
            after: raw_cells(other),
        });
        report.push_record(entries);
    }

    let only_after = after_index.len().saturating_sub(matched);
    debug!(matched, only_before, only_after, changed = report.records_changed(), "snapshot diff");

    Ok(SnapshotDiff {
        key_field: options.key_field.clone(),
        compared_fields,
        before: SnapshotStats {
            rows: before.len(),
            duplicate_keys: before_index.duplicates().len(),
        },
        after: SnapshotStats {
            rows: after.len(),
            duplicate_keys: after_index.duplicates().len(),
        },
        matched,
        only_before,
        only_after,
        report,
        warnings,
        records,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::UpdateRule;
    use crate::table::read_csv;
    use crate::value::FieldValue;

    fn catalog_schema() -> Schema {
        let mut s = Schema::new("catalog", "SKU");
        s.declare("Price", FieldKind::Money, true).unwrap();
        s.declare("Cost", FieldKind::Money, true).unwrap();
        s
    }

    fn source_schema() -> Schema {
        let mut s = Schema::new("source", "Model");
        s.declare("DealerPrice", FieldKind::Money, true).unwrap();
        s.declare("MAP", FieldKind::Money, true).unwrap();
        s
    }

    fn options() -> ReconOptions {
        let rules = UpdateRuleSet::new(vec![
            UpdateRule::new("MAP", "Price"),
            UpdateRule::new("DealerPrice", "Cost"),
        ])
        .unwrap();
        ReconOptions::new("SKU", "Model", rules)
    }

    fn run_tables(catalog: &str, source: &str, options: &ReconOptions) -> Result<Reconciliation, ReconError> {
        let catalog = read_csv("catalog", catalog).unwrap();
        let source = read_csv("source", source).unwrap();
        reconcile_tables(&catalog, &catalog_schema(), &source, &source_schema(), options)
    }

    #[test]
    fn absent_map_updates_cost_only() {
        let result = run_tables(
            "SKU,Price,Cost\nABC1,19.99,10.00\n",
            "Model,DealerPrice,MAP\nABC1,8.50,\n",
            &options(),
        )
        .unwrap();

        let entries = result.report.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "ABC1");
        assert_eq!(entries[0].field, "Cost");
        assert_eq!(entries[0].old, FieldValue::money("10.00"));
        assert_eq!(entries[0].new, FieldValue::money("8.50"));
        assert_eq!(result.catalog[0].raw("Cost"), Some("8.50"));
        assert_eq!(result.catalog[0].raw("Price"), Some("19.99"));
        assert_eq!(result.stats.updated, 1);
    }

    #[test]
    fn unmatched_record_is_untouched() {
        let result = run_tables(
            "SKU,Price,Cost\nZ9,50.00,\n",
            "Model,DealerPrice,MAP\nQ1,1.00,2.00\n",
            &options(),
        )
        .unwrap();
        assert!(result.report.is_empty());
        assert_eq!(result.catalog[0].raw("Price"), Some("50.00"));
        assert_eq!(result.stats.unmatched, 1);
        assert_eq!(result.stats.matched, 0);
    }

    #[test]
    fn first_duplicate_wins_with_warning() {
        let result = run_tables(
            "SKU,Price,Cost\nX1,10.00,1.00\n",
            "Model,DealerPrice,MAP\nX1,5.00,\nX1,6.00,\n",
            &options(),
        )
        .unwrap();
        assert_eq!(result.catalog[0].value("Cost"), &FieldValue::money("5.00"));
        assert_eq!(result.warnings.len(), 1);
        assert!(matches!(
            result.warnings[0],
            ReconWarning::DuplicateKeys { discarded: 1, .. }
        ));
    }

    #[test]
    fn strict_duplicates_fail() {
        let mut opts = options();
        opts.duplicates = DuplicatePolicy::Strict;
        let err = run_tables(
            "SKU,Price,Cost\nX1,10.00,1.00\n",
            "Model,DealerPrice,MAP\nX1,5.00,\nX1,6.00,\n",
            &opts,
        )
        .unwrap_err();
        assert!(matches!(err, ReconError::MergeAmbiguity { .. }));
        assert!(err.to_string().contains("key \"X1\" appears 2 times"));
    }

    #[test]
    fn missing_source_column_is_schema_error() {
        let err = run_tables(
            "SKU,Price,Cost\nA,1,1\n",
            "Model,MAP\nA,2\n",
            &options(),
        )
        .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "source: missing required column 'DealerPrice'");
    }

    #[test]
    fn rule_on_catalog_key_rejected() {
        let rules = UpdateRuleSet::new(vec![UpdateRule::new("Model", "SKU")]).unwrap();
        let err = reconcile(&[], &[], &ReconOptions::new("SKU", "Model", rules)).unwrap_err();
        assert!(err.to_string().contains("targets the catalog key 'SKU'"));
    }

    #[test]
    fn unparsed_money_is_warned_and_absent() {
        let result = run_tables(
            "SKU,Price,Cost\nA,19.99,10.00\n",
            "Model,DealerPrice,MAP\nA,call,24.99\n",
            &options(),
        )
        .unwrap();
        // MAP still applies; the unparsable dealer price does not
        let fields: Vec<&str> = result.report.entries().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["Price"]);
        assert!(matches!(
            result.warnings[0],
            ReconWarning::UnparsedMoney { ref field, row: 0, .. } if field == "DealerPrice"
        ));
    }

    #[test]
    fn second_run_is_a_no_op() {
        let source = read_csv("source", "Model,DealerPrice,MAP\nA,8.50,21\nB,0,\nC,$1,000.00,\n");
        // unquoted thousands separator makes C's row too long
        assert!(source.is_err());

        let catalog = read_csv("catalog", "SKU,Price,Cost\nA,19.99,10.00\nB,5,5\nC,3,3\n").unwrap();
        let source = read_csv(
            "source",
            "Model,DealerPrice,MAP\nA,8.50,21\nB,0,\nC,\"$1,000.00\",\n",
        )
        .unwrap();
        let catalog = normalize_table(&catalog, &catalog_schema()).unwrap().records;
        let source = normalize_table(&source, &source_schema()).unwrap().records;

        let first = reconcile(&catalog, &source, &options()).unwrap();
        assert_eq!(first.report.records_changed(), 2);
        assert_eq!(first.catalog[2].raw("Cost"), Some("1000.00"));

        let second = reconcile(&first.catalog, &source, &options()).unwrap();
        assert!(second.report.is_empty());
        assert_eq!(second.catalog, first.catalog);
    }

    #[test]
    fn parallel_matches_sequential() {
        let mut catalog_csv = String::from("SKU,Price,Cost\n");
        let mut source_csv = String::from("Model,DealerPrice,MAP\n");
        for i in 0..300 {
            catalog_csv.push_str(&format!("K{i},{i}.00,{i}.50\n"));
            if i % 3 == 0 {
                source_csv.push_str(&format!("K{i},{}.25,\n", i + 1));
            }
        }
        let sequential = run_tables(&catalog_csv, &source_csv, &options()).unwrap();
        let mut opts = options();
        opts.parallel = true;
        let parallel = run_tables(&catalog_csv, &source_csv, &opts).unwrap();

        assert_eq!(parallel.catalog, sequential.catalog);
        assert_eq!(parallel.report, sequential.report);
        assert_eq!(parallel.stats, sequential.stats);
    }

    const TWO_SOURCES: &str = r#"
name = "two sources"
report_field = "Handle"

[catalog]
key = "Variant SKU"
money = ["Variant Price", "Cost per item"]

[[sources]]
name = "dealer"
file = "dealer.csv"
key = "Model"
money = ["Dealer Price"]

[[sources.rules]]
source = "Dealer Price"
target = "Cost per item"

[[sources]]
name = "list"
file = "list.csv"
key = "Model"
money = ["2025 List"]

[[sources.rules]]
source = "2025 List"
target = "Variant Price"
"#;

    fn two_source_input(catalog: &str) -> SyncInput {
        let mut sources = HashMap::new();
        sources.insert(
            "dealer".to_string(),
            read_csv("dealer", "Model,Dealer Price\nS-1,4.00\nS-3,9.00\n").unwrap(),
        );
        sources.insert(
            "list".to_string(),
            read_csv("list", "Model,2025 List\nS-1,12.00\nS-2,7.50\n").unwrap(),
        );
        SyncInput {
            catalog: read_csv("catalog", catalog).unwrap(),
            sources,
        }
    }

    #[test]
    fn multi_source_run_merges_passes() {
        let config = SyncConfig::from_toml(TWO_SOURCES).unwrap();
        let input = two_source_input(
            "Handle,Variant SKU,Variant Price,Cost per item\n\
             strings,S-1,10.00,5.00\n\
             strings,S-2,7.50,3.00\n\
             bow,S-3,20.00,9.00\n",
        );
        let result = run(&config, &input).unwrap();

        assert_eq!(result.passes.len(), 2);
        assert_eq!(result.passes[0].source, "dealer");
        assert_eq!(result.passes[0].report.len(), 1);
        assert_eq!(result.passes[1].report.len(), 1);
        assert_eq!(result.summary.records_changed, 1);
        assert_eq!(result.summary.fields_changed, 2);
        assert_eq!(result.summary.changed_keys, vec!["strings"]);
        assert_eq!(result.catalog[0].raw("Cost per item"), Some("4.00"));
        assert_eq!(result.catalog[0].raw("Variant Price"), Some("12.00"));
        assert_eq!(result.headers[0], "Handle");
        assert_eq!(result.meta.config_name, "two sources");
        assert_eq!(result.meta.engine_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn run_checks_every_header_first() {
        let config = SyncConfig::from_toml(TWO_SOURCES).unwrap();
        let mut input = two_source_input("Handle,Variant SKU,Variant Price,Cost per item\nh,S-1,1,1\n");
        input.sources.insert(
            "list".to_string(),
            read_csv("list", "Model,List\nS-1,12.00\n").unwrap(),
        );
        let err = run(&config, &input).unwrap_err();
        assert_eq!(err.to_string(), "list: missing required column '2025 List'");

        input.sources.remove("list");
        let err = validate_input(&config, &input).unwrap_err();
        assert!(err.to_string().contains("no data loaded for source 'list'"));
    }

    const VENDOR: &str = r#"
name = "vendor"

[catalog]
key = "Variant SKU"
money = ["Cost per item"]

[[sources]]
name = "vendor"
file = "vendor.csv"
key = "Model"

[[sources.rules]]
source = "Price"
target = "Cost per item"
"#;

    fn vendor_input(catalog: &str) -> SyncInput {
        let mut sources = HashMap::new();
        sources.insert(
            "vendor".to_string(),
            read_csv("vendor", "Model,Price\nA,0.00\nB,n/a\nC,7.00\n").unwrap(),
        );
        SyncInput {
            catalog: read_csv("catalog", catalog).unwrap(),
            sources,
        }
    }

    #[test]
    fn undeclared_price_column_is_read_as_money() {
        let config = SyncConfig::from_toml(VENDOR).unwrap();
        let input = vendor_input("Variant SKU,Cost per item\nA,5.00\nB,5.00\nC,5.00\n");
        let result = run(&config, &input).unwrap();

        // zero and unparsable prices are not copied
        let entries = result.passes[0].report.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "C");
        assert_eq!(entries[0].new, FieldValue::money("7.00"));
        assert!(result.warnings.iter().any(|w| matches!(
            w,
            crate::model::ReconWarning::UnparsedMoney { field, raw, .. } if field == "Price" && raw == "n/a"
        )));

        let bytes = crate::table::write_csv(&result.headers, &result.catalog).unwrap();
        let output = String::from_utf8(bytes).unwrap();
        assert_eq!(output, "Variant SKU,Cost per item\nA,5.00\nB,5.00\nC,7.00\n");

        let rerun = run(&config, &vendor_input(&output)).unwrap();
        assert_eq!(rerun.summary.fields_changed, 0);
    }

    #[test]
    fn changed_keys_repeat_without_report_field() {
        let config = SyncConfig::from_toml(VENDOR).unwrap();
        let input = vendor_input("Variant SKU,Cost per item\nC,5.00\nC,6.00\n");
        let result = run(&config, &input).unwrap();

        assert_eq!(result.summary.records_changed, 2);
        assert_eq!(result.summary.changed_keys, vec!["C", "C"]);
    }

    #[test]
    fn run_result_serializes_without_catalog() {
        let config = SyncConfig::from_toml(TWO_SOURCES).unwrap();
        let input = two_source_input("Handle,Variant SKU,Variant Price,Cost per item\nh,S-3,20.00,1\n");
        let result = run(&config, &input).unwrap();
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["meta"]["config_name"], "two sources");
        assert_eq!(json["summary"]["changed_keys"][0], "h");
        assert_eq!(json["passes"][0]["report"][0]["new"], "9.00");
        assert!(json.get("catalog").is_none());
        assert!(json.get("headers").is_none());
    }

    // -- snapshot diff --

    fn diff(before: &str, after: &str, options: &DiffOptions) -> Result<SnapshotDiff, ReconError> {
        let before = read_csv("before", before).unwrap();
        let after = read_csv("after", after).unwrap();
        diff_snapshots(&before, &after, options)
    }

    #[test]
    fn diff_reports_changed_fields_on_shared_keys() {
        let result = diff(
            "Variant SKU,Title,Variant Price,Cost per item\n\
             A,Strings,10.00,5\n\
             B,Bow,20,9\n\
             C,Rosin,3,1\n",
            "Variant SKU,Title,Variant Price,Cost per item\n\
             A,Strings,10,4.50\n\
             B,Bow,20.00,9.00\n\
             D,Mute,2,1\n",
            &DiffOptions::default(),
        )
        .unwrap();

        assert_eq!(result.compared_fields, vec!["Title", "Variant Price", "Cost per item"]);
        assert_eq!(result.matched, 2);
        assert_eq!(result.only_before, 1);
        assert_eq!(result.only_after, 1);
        assert!(result.has_differences());

        let entries = result.report.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "A");
        assert_eq!(entries[0].field, "Cost per item");
        assert_eq!(entries[0].old, FieldValue::money("5"));
        assert_eq!(entries[0].new, FieldValue::money("4.50"));

        assert_eq!(
            result.records,
            vec![DiffRecord {
                key: "A".into(),
                before: vec!["Strings".into(), "10.00".into(), "5".into()],
                after: vec!["Strings".into(), "10".into(), "4.50".into()],
            }]
        );
    }

    #[test]
    fn diff_with_explicit_fields() {
        let options = DiffOptions {
            fields: Some(vec!["Title".into()]),
            ..DiffOptions::default()
        };
        let result = diff(
            "Variant SKU,Title,Variant Price\nA,Old,1\n",
            "Variant SKU,Title,Variant Price\nA,New,2\n",
            &options,
        )
        .unwrap();
        assert_eq!(result.compared_fields, vec!["Title"]);
        assert_eq!(result.report.len(), 1);

        let err = diff("Variant SKU,Price\nA,1\n", "Variant SKU,Title\nA,x\n", &options).unwrap_err();
        assert_eq!(err.to_string(), "before: missing required column 'Title'");
    }

    #[test]
    fn diff_counts_duplicates() {
        let result = diff(
            "Variant SKU,Variant Price\nA,1\nA,2\n",
            "Variant SKU,Variant Price\nA,3\nA,1\nA,1\n",
            &DiffOptions::default(),
        )
        .unwrap();
        assert_eq!(result.before, SnapshotStats { rows: 2, duplicate_keys: 1 });
        assert_eq!(result.after, SnapshotStats { rows: 3, duplicate_keys: 1 });
        assert_eq!(result.matched, 1);
        assert_eq!(result.warnings.len(), 2);
        assert_eq!(result.report.entries()[0].new, FieldValue::money("3"));

        let strict = DiffOptions {
            duplicates: DuplicatePolicy::Strict,
            ..DiffOptions::default()
        };
        let err = diff("Variant SKU\nA\nA\n", "Variant SKU\nA\n", &strict).unwrap_err();
        assert!(matches!(err, ReconError::MergeAmbiguity { ref dataset, .. } if dataset == "before"));
    }

    #[test]
    fn diff_requires_key_column() {
        let err = diff("SKU,Price\nA,1\n", "Variant SKU,Price\nA,1\n", &DiffOptions::default()).unwrap_err();
        assert!(matches!(err, ReconError::MissingColumn { ref column, .. } if column == "Variant SKU"));
    }
}
