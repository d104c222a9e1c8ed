//! Name → value bindings, populated incrementally across pass-0 (`EQU`
//! literals and label placeholders) and pass-1 (final label addresses).

use crate::error::ErrorKind;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Equ(i64),
    Label(i64),
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: HashMap<String, Binding>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable { entries: HashMap::new() }
    }

    /// Binds a new name. Fails if the name is already bound — every label
    /// in the final table has exactly one defining source location.
    pub fn define(&mut self, name: &str, binding: Binding) -> Result<(), ErrorKind> {
        if self.entries.contains_key(name) {
            return Err(ErrorKind::DuplicateLabel(name.to_string()));
        }
        self.entries.insert(name.to_string(), binding);
        Ok(())
    }

    /// Overwrites a label's placeholder address with its resolved one.
    /// Used when pass-1 computes the real `base + offset` for a label that
    /// pass-0 recorded with a zero placeholder.
    pub fn resolve_label(&mut self, name: &str, address: i64) {
        self.entries.insert(name.to_string(), Binding::Label(address));
    }

    pub fn value(&self, name: &str) -> Option<i64> {
        self.entries.get(name).map(|b| match b {
            Binding::Equ(v) => *v,
            Binding::Label(v) => *v,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// A flat name → value view, handed to the pass-2 expression evaluator.
    pub fn as_map(&self) -> HashMap<String, i64> {
        self.entries.iter().map(|(k, v)| (k.clone(), match v { Binding::Equ(n) => *n, Binding::Label(n) => *n })).collect()
    }

    /// The set of names known to exist (regardless of resolved value yet),
    /// handed to the pass-1 expression evaluator.
    pub fn defined_names(&self) -> std::collections::HashSet<String> {
        self.entries.keys().cloned().collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn duplicate_definition_is_rejected() {
        let mut table = SymbolTable::new();
        table.define("LOOP", Binding::Label(0)).unwrap();
        assert_eq!(table.define("LOOP", Binding::Label(10)).unwrap_err(), ErrorKind::DuplicateLabel("LOOP".to_string()));
    }

    #[test]
    fn label_placeholder_then_resolve() {
        let mut table = SymbolTable::new();
        table.define("LOOP", Binding::Label(0)).unwrap();
        table.resolve_label("LOOP", 0x1234);
        assert_eq!(table.value("LOOP"), Some(0x1234));
    }
}
