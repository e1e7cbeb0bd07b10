//! ObservationScope for automatic begin/complete logging
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` or `{name}_FAILED` when closed
//! - Logs `{name}_INCOMPLETE` if dropped without being closed

use std::cell::Cell;

use super::logger::{Logger, Severity};

/// A scope that logs the lifecycle of one operation
///
/// ```ignore
/// let scope = ObservationScope::with_fields("PLAN_OPTIMAL", &[("table", "t")]);
/// // ... plan ...
/// scope.complete_with_fields(&[("cost", "35")]);
/// ```
pub struct ObservationScope<'a> {
    name: &'a str,
    completed: Cell<bool>,
    fields: Vec<(&'a str, String)>,
}

impl<'a> ObservationScope<'a> {
    /// Create a new observation scope. Logs `{name}_BEGIN` immediately.
    pub fn new(name: &'a str) -> Self {
        Self::with_fields(name, &[])
    }

    /// Create a new observation scope whose fields are repeated on every line
    pub fn with_fields(name: &'a str, fields: &[(&'a str, &str)]) -> Self {
        Logger::info(&format!("{}_BEGIN", name), fields);

        Self {
            name,
            completed: Cell::new(false),
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
        }
    }

    fn field_refs(&self) -> Vec<(&str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect()
    }

    /// Mark the scope as successfully completed
    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    /// Mark the scope as successfully completed with additional fields
    pub fn complete_with_fields(self, extra_fields: &[(&str, &str)]) {
        self.completed.set(true);
        let mut fields = self.field_refs();
        fields.extend(extra_fields.iter().copied());
        Logger::info(&format!("{}_COMPLETE", self.name), &fields);
    }

    /// Mark the scope as failed. Logs `{name}_FAILED` at `severity`.
    pub fn fail(self, severity: Severity, code: &str, reason: &str) {
        self.completed.set(true);
        let mut fields = self.field_refs();
        fields.push(("code", code));
        fields.push(("reason", reason));
        Logger::log(severity, &format!("{}_FAILED", self.name), &fields);
    }

    /// Check if the scope has been closed
    pub fn is_completed(&self) -> bool {
        self.completed.get()
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if !self.completed.get() {
            Logger::warn(
                &format!("{}_INCOMPLETE", self.name),
                &[("reason", "scope dropped without completion")],
            );
        }
    }
}
