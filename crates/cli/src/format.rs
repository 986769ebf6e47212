// Human and CSV renderings of engine results. No IO.

use pricesync_recon::{ChangeSummary, ReconWarning, SnapshotDiff};

/// `Updated N product(s).` followed by one changed key per line.
pub fn summary_text(summary: &ChangeSummary) -> String {
    let mut out = format!("Updated {} product(s).\n", summary.records_changed);
    for key in &summary.changed_keys {
        out.push_str(key);
        out.push('\n');
    }
    out
}

pub fn warning_lines(warnings: &[ReconWarning]) -> Vec<String> {
    warnings.iter().map(|w| format!("warning: {w}")).collect()
}

/// Per-snapshot shape, then the join counts.
pub fn diff_summary_lines(diff: &SnapshotDiff, before_label: &str, after_label: &str) -> Vec<String> {
    vec![
        format!(
            "{before_label}: {} row(s), {} duplicate key(s)",
            diff.before.rows, diff.before.duplicate_keys
        ),
        format!(
            "{after_label}: {} row(s), {} duplicate key(s)",
            diff.after.rows, diff.after.duplicate_keys
        ),
        format!(
            "{} matched on '{}', {} changed, {} only in before, {} only in after",
            diff.matched,
            diff.key_field,
            diff.records.len(),
            diff.only_before,
            diff.only_after
        ),
    ]
}

/// Wide layout: the key, then `<field>_orig` and `<field>_upd` for every
/// compared field. One row per changed record.
pub fn diff_csv(diff: &SnapshotDiff) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());

    let mut header = Vec::with_capacity(1 + diff.compared_fields.len() * 2);
    header.push(diff.key_field.clone());
    for field in &diff.compared_fields {
        header.push(format!("{field}_orig"));
        header.push(format!("{field}_upd"));
    }
    writer.write_record(&header)?;

    for record in &diff.records {
        let mut row: Vec<&str> = Vec::with_capacity(header.len());
        row.push(&record.key);
        for (before, after) in record.before.iter().zip(&record.after) {
            row.push(before);
            row.push(after);
        }
        writer.write_record(&row)?;
    }

    writer.into_inner().map_err(|e| e.into_error().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricesync_recon::table::read_csv;
    use pricesync_recon::{diff_snapshots, DiffOptions};

    #[test]
    fn summary_lists_keys() {
        let summary = ChangeSummary {
            records_changed: 3,
            fields_changed: 4,
            changed_keys: vec!["violin-strings".into(), "bow".into()],
        };
        assert_eq!(summary_text(&summary), "Updated 3 product(s).\nviolin-strings\nbow\n");
        assert_eq!(summary_text(&ChangeSummary::default()), "Updated 0 product(s).\n");
    }

    #[test]
    fn wide_diff_layout() {
        let before = read_csv(
            "before",
            "Variant SKU,Variant Price,Cost per item\nA,10.00,5.00\nB,1,1\n",
        )
        .unwrap();
        let after = read_csv(
            "after",
            "Variant SKU,Variant Price,Cost per item\nA,10.00,4.50\nB,1.00,1\n",
        )
        .unwrap();
        let diff = diff_snapshots(&before, &after, &DiffOptions::default()).unwrap();

        let csv = String::from_utf8(diff_csv(&diff).unwrap()).unwrap();
        assert_eq!(
            csv,
            "Variant SKU,Variant Price_orig,Variant Price_upd,Cost per item_orig,Cost per item_upd\n\
             A,10.00,10.00,5.00,4.50\n"
        );

        let lines = diff_summary_lines(&diff, "before.csv", "after.csv");
        assert_eq!(lines[0], "before.csv: 2 row(s), 0 duplicate key(s)");
        assert_eq!(lines[2], "2 matched on 'Variant SKU', 1 changed, 0 only in before, 0 only in after");
    }

    #[test]
    fn warnings_are_prefixed() {
        let lines = warning_lines(&[ReconWarning::UnparsedMoney {
            dataset: "profile".into(),
            row: 4,
            field: "MAP".into(),
            raw: "call".into(),
        }]);
        assert_eq!(
            lines,
            vec!["warning: profile, row 5: cannot parse 'MAP' value \"call\"; treated as blank"]
        );
    }
}
