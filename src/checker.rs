use std::collections::HashMap;
use std::sync::Arc;

use crate::{model::Record, Error, ErrorLevel, ErrorType, Gedcom, Source, Xref, ANONYMOUS_SRC};

fn invalid<R: Record>(record: &R, msg: String) -> Error {
    Error {
        level: ErrorLevel::Error,
        r#type: ErrorType::Validation,
        src: record.src().clone(),
        msg,
    }
}

fn check_records<R: Record>(records: &[R], index: &HashMap<Xref, usize>) -> Result<(), Error> {
    for (position, record) in records.iter().enumerate() {
        let id = record.xref();
        if id.trim().is_empty() {
            return Err(invalid(
                record,
                format!("Invalid {} entry: empty identifier.", R::KIND),
            ));
        }
        if index.get(&**id) != Some(&position) {
            return Err(invalid(
                record,
                format!("Invalid {} entry {}: not keyed by its identifier.", R::KIND, id),
            ));
        }
    }
    if index.len() != records.len() {
        let msg = format!(
            "Invalid {} collection: {} keys for {} records.",
            R::KIND,
            index.len(),
            records.len()
        );
        return Err(match records.first() {
            Some(record) => invalid(record, msg),
            None => Error {
                level: ErrorLevel::Error,
                r#type: ErrorType::Validation,
                src: Source::start_of(Arc::new(ANONYMOUS_SRC.to_string())),
                msg,
            },
        });
    }
    Ok(())
}

impl Gedcom {
    /// Checks that both collections are keyed by the identifiers of their
    /// records and that every identifier is non-empty. Fails on the first
    /// offending record.
    pub fn validate(&self) -> Result<(), Error> {
        check_records(&self.individuals, &self.individual_index)?;
        check_records(&self.families, &self.family_index)?;
        Ok(())
    }
}
