//! Process-wide class, protocol, and selector registry
//!
//! The registry is singly-initialized global state with a defined
//! construction order and no teardown (the process exits instead). The
//! registration write path runs under one lock so a compiled unit's classes
//! become visible as a unit; lookups go through concurrent maps and never
//! block registration of unrelated names.

use crate::class::Class;
use crate::protocol::{Protocol, ProtocolDef};
use crate::selector::{Selector, SelectorTable};
use crate::symtab::{CategoryDef, ClassDef, Symtab};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

/// Process-wide runtime registry.
pub struct Registry {
    /// Registered classes by name.
    classes: DashMap<String, &'static Class>,
    /// Registered protocols by name.
    protocols: DashMap<String, &'static Protocol>,
    /// Interned selectors.
    selectors: RwLock<SelectorTable>,
    /// Categories whose class has not registered yet, keyed by class name.
    pending_categories: Mutex<FxHashMap<String, Vec<&'static CategoryDef>>>,
    /// Serializes the registration write path.
    registration: Mutex<()>,
}

impl Registry {
    fn new() -> Self {
        Self {
            classes: DashMap::new(),
            protocols: DashMap::new(),
            selectors: RwLock::new(SelectorTable::new()),
            pending_categories: Mutex::new(FxHashMap::default()),
            registration: Mutex::new(()),
        }
    }

    /// The process-wide registry instance.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Register one compiled unit's symbol table.
    ///
    /// Idempotent per table: a second call with the same table is a no-op.
    /// The host program must run this for a unit before any code in that
    /// unit executes; ordering across units is unspecified.
    ///
    /// Corrupt table data and redefinition of an already-registered class
    /// are fatal — they indicate a broken build, and continuing would risk
    /// silent corruption.
    pub fn init_symtab(&self, table: &'static Symtab) {
        let _guard = self.registration.lock();
        if !table.claim() {
            return;
        }
        if let Err(err) = table.validate() {
            panic!("corrupt symbol table: {err}");
        }

        // Intern selector references first: a one-way, in-place rewrite
        // performed exactly once per table.
        for slot in table.selector_refs {
            let sel = self.register_selector(slot.name());
            slot.resolve(sel);
        }

        // Protocols before classes so same-unit adoption resolves eagerly.
        for def in table.protocol_defs {
            self.register_protocol(def);
        }
        for def in table.class_defs {
            self.register_class(def);
        }
        for def in table.category_defs {
            self.register_category(def);
        }
    }

    fn register_class(&self, def: &'static ClassDef) {
        if self.classes.contains_key(def.name) {
            panic!("duplicate registration of class `{}`", def.name);
        }
        let class: &'static Class = Box::leak(Box::new(Class::from_def(def)));
        self.classes.insert(def.name.to_string(), class);

        // Categories that arrived before their class apply now.
        let pending = self.pending_categories.lock().remove(def.name);
        if let Some(categories) = pending {
            for category in categories {
                class.merge_category(category);
            }
        }
    }

    fn register_protocol(&self, def: &'static ProtocolDef) {
        // Identical protocol declarations recur across units; first one wins.
        if self.protocols.contains_key(def.name) {
            return;
        }
        let protocol: &'static Protocol = Box::leak(Box::new(Protocol::from_def(def)));
        self.protocols.insert(def.name.to_string(), protocol);
    }

    fn register_category(&self, def: &'static CategoryDef) {
        match self.get_class(def.class_name) {
            Some(class) => class.merge_category(def),
            None => {
                // Cross-unit ordering is unspecified; park until the class
                // registers.
                self.pending_categories
                    .lock()
                    .entry(def.class_name.to_string())
                    .or_default()
                    .push(def);
            }
        }
    }

    /// Look up a registered class by exact name.
    ///
    /// Absence is a normal outcome, not an error — callers routinely probe
    /// for optional classes.
    pub fn get_class(&self, name: &str) -> Option<&'static Class> {
        self.classes.get(name).map(|entry| *entry.value())
    }

    /// Look up a registered protocol by exact name.
    pub fn get_protocol(&self, name: &str) -> Option<&'static Protocol> {
        self.protocols.get(name).map(|entry| *entry.value())
    }

    /// Snapshot of all currently registered classes.
    ///
    /// The caller owns the returned sequence; classes registered after the
    /// call returns are not reflected in it.
    pub fn copy_class_list(&self) -> Vec<&'static Class> {
        self.classes.iter().map(|entry| *entry.value()).collect()
    }

    /// Number of registered classes.
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Intern a method name, returning its process-unique selector.
    pub fn register_selector(&self, name: &str) -> Selector {
        if let Some(sel) = self.selectors.read().get(name) {
            return sel;
        }
        self.selectors.write().intern(name)
    }

    /// The name a selector was interned from, or `None` for a handle this
    /// registry never produced.
    pub fn selector_name(&self, sel: Selector) -> Option<&'static str> {
        self.selectors.read().name_of(sel)
    }

    /// Number of interned selectors.
    pub fn selector_count(&self) -> usize {
        self.selectors.read().len()
    }
}

/// Register one compiled unit's symbol table with the global registry.
pub fn init_symtab(table: &'static Symtab) {
    Registry::global().init_symtab(table);
}

/// Look up a class by name in the global registry.
pub fn get_class(name: &str) -> Option<&'static Class> {
    Registry::global().get_class(name)
}

/// Look up a protocol by name in the global registry.
pub fn get_protocol(name: &str) -> Option<&'static Protocol> {
    Registry::global().get_protocol(name)
}

/// Snapshot of all classes registered with the global registry.
pub fn copy_class_list() -> Vec<&'static Class> {
    Registry::global().copy_class_list()
}

/// Intern a method name in the global registry.
pub fn register_selector(name: &str) -> Selector {
    Registry::global().register_selector(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{class_create_instance, object_get_class, Id};
    use crate::rc::{release, retain, retain_count};
    use crate::selector::Selector;
    use crate::symtab::SelectorSlot;
    use crate::class::MethodDef;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn identity_imp(obj: Id, _sel: Selector) -> Id {
        obj
    }

    #[test]
    fn test_bootstrap_registers_classes_and_selectors() {
        static SLOTS: [SelectorSlot; 2] = [SelectorSlot::new("run"), SelectorSlot::new("halt")];
        static METHODS: [MethodDef; 1] = [MethodDef {
            name: "run",
            imp: identity_imp,
        }];
        static CLASS_METHODS: [MethodDef; 1] = [MethodDef {
            name: "shared",
            imp: identity_imp,
        }];
        static CLASSES: [ClassDef; 1] = [ClassDef {
            instance_methods: &METHODS,
            class_methods: &CLASS_METHODS,
            ..ClassDef::new("RegBootstrap", 8)
        }];
        static TABLE: Symtab = Symtab::new(&SLOTS, &[], &CLASSES, &[]);

        init_symtab(&TABLE);

        let class = get_class("RegBootstrap").expect("class must be registered");
        assert_eq!(class.name(), "RegBootstrap");

        // Slots were rewritten in place to interned selectors.
        let run = SLOTS[0].get().expect("slot must be resolved");
        assert_eq!(run.name(), "run");
        assert!(class.responds_to(run));
        assert!(!class.responds_to(SLOTS[1].get().expect("slot must be resolved")));

        // Class-side methods live in their own list.
        let shared = register_selector("shared");
        assert!(class.class_method(shared).is_some());
        assert!(class.instance_method(shared).is_none());

        // Same name, same selector: interning is stable.
        assert_eq!(register_selector("run"), run);
    }

    #[test]
    fn test_reinit_same_table_is_idempotent() {
        static CLASSES: [ClassDef; 1] = [ClassDef::new("RegIdempotent", 0)];
        static TABLE: Symtab = Symtab::new(&[], &[], &CLASSES, &[]);

        init_symtab(&TABLE);
        init_symtab(&TABLE);

        assert!(get_class("RegIdempotent").is_some());
    }

    #[test]
    #[should_panic(expected = "duplicate registration of class")]
    fn test_duplicate_class_across_tables_is_fatal() {
        static FIRST: [ClassDef; 1] = [ClassDef::new("RegCollision", 0)];
        static SECOND: [ClassDef; 1] = [ClassDef::new("RegCollision", 16)];
        static TABLE_A: Symtab = Symtab::new(&[], &[], &FIRST, &[]);
        static TABLE_B: Symtab = Symtab::new(&[], &[], &SECOND, &[]);

        init_symtab(&TABLE_A);
        init_symtab(&TABLE_B);
    }

    #[test]
    #[should_panic(expected = "corrupt symbol table")]
    fn test_malformed_table_is_fatal() {
        static CLASSES: [ClassDef; 1] = [ClassDef {
            superclass: Some("RegMalformed"),
            ..ClassDef::new("RegMalformed", 0)
        }];
        static TABLE: Symtab = Symtab::new(&[], &[], &CLASSES, &[]);
        init_symtab(&TABLE);
    }

    #[test]
    fn test_missing_lookups_return_none() {
        assert!(get_class("RegDoesNotExist").is_none());
        assert!(get_protocol("RegDoesNotExist").is_none());
    }

    #[test]
    fn test_copy_class_list_snapshot() {
        static BEFORE: [ClassDef; 1] = [ClassDef::new("RegSnapshotA", 0)];
        static AFTER: [ClassDef; 1] = [ClassDef::new("RegSnapshotB", 0)];
        static TABLE_A: Symtab = Symtab::new(&[], &[], &BEFORE, &[]);
        static TABLE_B: Symtab = Symtab::new(&[], &[], &AFTER, &[]);

        init_symtab(&TABLE_A);
        let snapshot = copy_class_list();
        assert!(snapshot.iter().any(|c| c.name() == "RegSnapshotA"));

        init_symtab(&TABLE_B);
        // The earlier snapshot is unchanged by later registration.
        assert!(!snapshot.iter().any(|c| c.name() == "RegSnapshotB"));
        assert!(copy_class_list().iter().any(|c| c.name() == "RegSnapshotB"));
    }

    #[test]
    fn test_category_parks_until_class_arrives() {
        static METHODS: [MethodDef; 1] = [MethodDef {
            name: "categoryProbe",
            imp: identity_imp,
        }];
        static CATEGORIES: [CategoryDef; 1] = [CategoryDef {
            instance_methods: &METHODS,
            ..CategoryDef::new("Probing", "RegLateClass")
        }];
        static CAT_TABLE: Symtab = Symtab::new(&[], &[], &[], &CATEGORIES);
        static CLASSES: [ClassDef; 1] = [ClassDef::new("RegLateClass", 0)];
        static CLS_TABLE: Symtab = Symtab::new(&[], &[], &CLASSES, &[]);

        // Category's unit loads first; its class arrives later.
        init_symtab(&CAT_TABLE);
        assert!(get_class("RegLateClass").is_none());

        init_symtab(&CLS_TABLE);
        let class = get_class("RegLateClass").expect("class must be registered");
        assert!(class.responds_to(register_selector("categoryProbe")));
    }

    #[test]
    fn test_superclass_resolves_across_tables() {
        // Subclass's unit registers before the superclass's unit.
        static SUB: [ClassDef; 1] = [ClassDef {
            superclass: Some("RegBase"),
            ..ClassDef::new("RegDerived", 8)
        }];
        static BASE: [ClassDef; 1] = [ClassDef::new("RegBase", 24)];
        static SUB_TABLE: Symtab = Symtab::new(&[], &[], &SUB, &[]);
        static BASE_TABLE: Symtab = Symtab::new(&[], &[], &BASE, &[]);

        init_symtab(&SUB_TABLE);
        init_symtab(&BASE_TABLE);

        let derived = get_class("RegDerived").expect("class must be registered");
        let base = get_class("RegBase").expect("class must be registered");
        assert!(std::ptr::eq(
            derived.superclass().expect("superclass must resolve"),
            base
        ));
        // Layout: superclass total plus own declared size.
        assert_eq!(derived.instance_size(), 32);
        assert_eq!(base.instance_size(), 24);
    }

    #[test]
    fn test_instance_lifecycle_runs_finalizer() {
        static FINALIZED: AtomicBool = AtomicBool::new(false);
        fn finalize_probe(_obj: Id) {
            FINALIZED.store(true, Ordering::Release);
        }
        static CLASSES: [ClassDef; 1] = [ClassDef {
            finalize: Some(finalize_probe),
            ..ClassDef::new("RegLifecycle", 16)
        }];
        static TABLE: Symtab = Symtab::new(&[], &[], &CLASSES, &[]);

        init_symtab(&TABLE);
        let class = get_class("RegLifecycle").expect("class must be registered");

        let obj = class_create_instance(class);
        assert!(std::ptr::eq(
            object_get_class(obj).expect("instance must have a class"),
            class
        ));
        assert_eq!(retain_count(obj), 1);

        retain(obj);
        retain(obj);
        assert_eq!(retain_count(obj), 3);

        release(obj);
        release(obj);
        assert_eq!(retain_count(obj), 1);
        assert!(!FINALIZED.load(Ordering::Acquire));

        release(obj);
        assert!(FINALIZED.load(Ordering::Acquire));
    }
}
