use rayon::prelude::*;

use crate::index::SourceIndex;
use crate::model::{MatchResult, Record};

/// Resolve one catalog record against the index by its key field.
pub fn match_record<'a>(record: &'a Record, index: &SourceIndex<'a>) -> MatchResult<'a> {
    match index.lookup(record.key()) {
        Some(source) => MatchResult::Matched {
            catalog: record,
            source,
        },
        None => MatchResult::Unmatched(record),
    }
}

/// One result per catalog record, in catalog order.
pub fn match_records<'a>(catalog: &'a [Record], index: &SourceIndex<'a>) -> Vec<MatchResult<'a>> {
    catalog.iter().map(|r| match_record(r, index)).collect()
}

/// Same as [`match_records`], sharded across the rayon pool. The indexed
/// collect keeps catalog order.
pub fn match_records_parallel<'a>(
    catalog: &'a [Record],
    index: &SourceIndex<'a>,
) -> Vec<MatchResult<'a>> {
    catalog.par_iter().map(|r| match_record(r, index)).collect()
}
