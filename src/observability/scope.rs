//! ObservationScope for begin/complete logging around batch work
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` or `{name}_FAILED` when finished
//! - Logs `{name}_INCOMPLETE` if dropped unfinished

use std::cell::Cell;
use std::time::Instant;

use super::logger::Logger;

/// A scope that logs its own start and end.
pub struct ObservationScope<'a> {
    name: &'a str,
    finished: Cell<bool>,
    fields: Vec<(&'a str, String)>,
    started: Instant,
}

impl<'a> ObservationScope<'a> {
    /// Open a scope, logging `{name}_BEGIN`.
    pub fn new(name: &'a str) -> Self {
        Self::with_fields(name, &[])
    }

    /// Open a scope whose fields are repeated on every record it logs.
    pub fn with_fields(name: &'a str, fields: &[(&'a str, &str)]) -> Self {
        Logger::info(&format!("{}_BEGIN", name), fields);

        Self {
            name,
            finished: Cell::new(false),
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            started: Instant::now(),
        }
    }

    fn field_refs(&self) -> Vec<(&str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect()
    }

    /// Mark the scope completed, appending `extra` and the elapsed time.
    pub fn complete_with_fields(self, extra: &[(&str, &str)]) {
        self.finished.set(true);
        let elapsed = self.started.elapsed().as_millis().to_string();
        let mut fields = self.field_refs();
        fields.extend(extra.iter().copied());
        fields.push(("elapsed_ms", elapsed.as_str()));
        Logger::info(&format!("{}_COMPLETE", self.name), &fields);
    }

    /// Mark the scope completed.
    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    /// Mark the scope failed with a reason.
    pub fn fail(self, reason: &str) {
        self.finished.set(true);
        let mut fields = self.field_refs();
        fields.push(("reason", reason));
        Logger::error(&format!("{}_FAILED", self.name), &fields);
    }

    /// Whether `complete` or `fail` has run
    pub fn is_finished(&self) -> bool {
        self.finished.get()
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if !self.finished.get() {
            Logger::warn(
                &format!("{}_INCOMPLETE", self.name),
                &[("reason", "scope dropped without completion")],
            );
        }
    }
}
