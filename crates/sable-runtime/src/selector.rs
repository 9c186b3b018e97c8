//! Interned method-name selectors
//!
//! A selector is a process-unique handle for a method name. Equal name
//! strings always intern to the identical `Selector` value, so method-name
//! comparison after bootstrap is a value comparison, never a string compare.

use rustc_hash::FxHashMap;
use std::num::NonZeroU32;

/// Interned identifier for a method name.
///
/// Selectors are created by the registry's selector table and live for the
/// whole process; they are never destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selector(NonZeroU32);

impl Selector {
    /// Reconstruct a selector from its raw interned index.
    pub(crate) fn from_raw(raw: NonZeroU32) -> Self {
        Self(raw)
    }

    /// The raw interned index backing this selector.
    pub(crate) fn as_raw(self) -> NonZeroU32 {
        self.0
    }

    /// The method name this selector was interned from.
    ///
    /// Panics if the selector was not produced by this process's registry
    /// (a forged handle is a contract violation, not a lookup miss).
    pub fn name(self) -> &'static str {
        match crate::registry::Registry::global().selector_name(self) {
            Some(name) => name,
            None => panic!("selector {:?} was never interned", self.0),
        }
    }
}

/// Two-sided name <-> selector table.
///
/// Interned names are leaked: selectors are process-lifetime entities and
/// the table only ever grows.
#[derive(Debug, Default)]
pub(crate) struct SelectorTable {
    by_name: FxHashMap<&'static str, Selector>,
    names: Vec<&'static str>,
}

impl SelectorTable {
    pub(crate) fn new() -> Self {
        Self {
            by_name: FxHashMap::default(),
            names: Vec::new(),
        }
    }

    /// Intern a method name, returning the existing selector if present.
    pub(crate) fn intern(&mut self, name: &str) -> Selector {
        if let Some(&sel) = self.by_name.get(name) {
            return sel;
        }
        let leaked: &'static str = Box::leak(name.to_owned().into_boxed_str());
        let index = self.names.len() as u32 + 1;
        let raw = NonZeroU32::new(index).expect("selector table overflow");
        let sel = Selector(raw);
        self.names.push(leaked);
        self.by_name.insert(leaked, sel);
        sel
    }

    /// Look up a selector without interning.
    pub(crate) fn get(&self, name: &str) -> Option<Selector> {
        self.by_name.get(name).copied()
    }

    /// Reverse lookup: the name a selector was interned from.
    pub(crate) fn name_of(&self, sel: Selector) -> Option<&'static str> {
        self.names.get(sel.0.get() as usize - 1).copied()
    }

    /// Number of interned selectors.
    pub(crate) fn len(&self) -> usize {
        self.names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_stable() {
        let mut table = SelectorTable::new();
        let a = table.intern("run");
        let b = table.intern("run");
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_distinct_names_distinct_selectors() {
        let mut table = SelectorTable::new();
        let a = table.intern("run");
        let b = table.intern("stop");
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_reverse_lookup() {
        let mut table = SelectorTable::new();
        let sel = table.intern("describe");
        assert_eq!(table.name_of(sel), Some("describe"));
    }

    #[test]
    fn test_get_does_not_intern() {
        let mut table = SelectorTable::new();
        assert_eq!(table.get("missing"), None);
        table.intern("present");
        assert!(table.get("present").is_some());
        assert_eq!(table.len(), 1);
    }
}
