//! Class metadata: method lists, instance layout, superclass linkage
//!
//! A `Class` is materialized from a symbol-table definition at bootstrap and
//! lives for the whole process. Superclasses are linked by *name* — classes
//! may register out of order across compiled units — and resolve to a class
//! handle on first use, caching the result.

use crate::object::Id;
use crate::property::Property;
use crate::protocol::{Protocol, ProtocolRef};
use crate::registry::Registry;
use crate::root::RootOps;
use crate::selector::Selector;
use crate::symtab::{CategoryDef, ClassDef};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;

/// Method implementation entry point.
///
/// The runtime performs no full message send; implementations are reached
/// through explicit method-list lookup.
pub type Imp = fn(Id, Selector) -> Id;

/// Class-specific teardown hook, run while the instance storage is still
/// valid, before it is released.
pub type FinalizeFn = fn(Id);

/// Compile-time method record, as emitted into a symbol table.
#[derive(Debug, Clone, Copy)]
pub struct MethodDef {
    /// Method selector name.
    pub name: &'static str,
    /// Implementation entry point.
    pub imp: Imp,
}

/// A resolved method-list entry: interned selector plus implementation.
#[derive(Debug, Clone, Copy)]
pub struct Method {
    selector: Selector,
    imp: Imp,
}

impl Method {
    fn from_def(def: &MethodDef) -> Self {
        Self {
            selector: Registry::global().register_selector(def.name),
            imp: def.imp,
        }
    }

    /// The method's selector.
    pub fn selector(&self) -> Selector {
        self.selector
    }

    /// The method's implementation.
    pub fn imp(&self) -> Imp {
        self.imp
    }
}

/// Runtime class object.
///
/// Registered once, never unloaded; handles are `&'static Class`. Method,
/// property, and protocol lists are behind locks because categories may
/// merge additions after the class itself has been materialized.
#[derive(Debug)]
pub struct Class {
    name: Box<str>,
    superclass_name: Option<Box<str>>,
    superclass: OnceCell<Option<&'static Class>>,
    declared_size: usize,
    layout_size: OnceCell<usize>,
    instance_methods: RwLock<Vec<Method>>,
    class_methods: RwLock<Vec<Method>>,
    // Boxed so handed-out property references stay valid when a category
    // merge grows the list and the Vec reallocates.
    properties: RwLock<Vec<Box<Property>>>,
    protocols: RwLock<Vec<ProtocolRef>>,
    finalize: Option<FinalizeFn>,
    root_ops: RootOps,
}

impl Class {
    /// Materialize a class from its symbol-table definition, interning the
    /// selectors its method lists reference.
    pub(crate) fn from_def(def: &ClassDef) -> Self {
        Self {
            name: def.name.into(),
            superclass_name: def.superclass.map(Into::into),
            superclass: OnceCell::new(),
            declared_size: def.instance_size,
            layout_size: OnceCell::new(),
            instance_methods: RwLock::new(
                def.instance_methods.iter().map(Method::from_def).collect(),
            ),
            class_methods: RwLock::new(def.class_methods.iter().map(Method::from_def).collect()),
            properties: RwLock::new(
                def.properties
                    .iter()
                    .map(|p| Box::new(Property::from_def(p)))
                    .collect(),
            ),
            protocols: RwLock::new(def.protocols.iter().map(|name| ProtocolRef::new(name)).collect()),
            finalize: def.finalize,
            root_ops: match def.root_ops {
                Some(ops) => ops,
                None => RootOps::DEFAULT,
            },
        }
    }

    /// Merge a category's additions into this class.
    ///
    /// Category methods and properties shadow the class's own on lookup.
    pub(crate) fn merge_category(&self, def: &CategoryDef) {
        self.instance_methods
            .write()
            .extend(def.instance_methods.iter().map(Method::from_def));
        self.class_methods
            .write()
            .extend(def.class_methods.iter().map(Method::from_def));
        self.properties
            .write()
            .extend(def.properties.iter().map(|p| Box::new(Property::from_def(p))));
        self.protocols
            .write()
            .extend(def.protocols.iter().map(|name| ProtocolRef::new(name)));
    }

    /// Class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The superclass, resolved by name on first use and cached.
    ///
    /// `None` for root classes. A named superclass that was never registered
    /// is a broken link contract and halts.
    pub fn superclass(&self) -> Option<&'static Class> {
        *self.superclass.get_or_init(|| match &self.superclass_name {
            None => None,
            Some(name) => match Registry::global().get_class(name) {
                Some(class) => Some(class),
                None => panic!(
                    "unresolved superclass `{name}` of class `{}`",
                    self.name
                ),
            },
        })
    }

    /// Instance-variable bytes declared by this class alone.
    pub fn declared_instance_size(&self) -> usize {
        self.declared_size
    }

    /// Total instance layout size: the superclass layout plus this class's
    /// declared instance variables. Computed on first use and cached.
    pub fn instance_size(&self) -> usize {
        *self.layout_size.get_or_init(|| {
            self.superclass().map_or(0, Class::instance_size) + self.declared_size
        })
    }

    /// Look up an instance method by selector, searching this class and then
    /// the superclass chain. Later list entries (categories) shadow earlier
    /// ones.
    pub fn instance_method(&'static self, sel: Selector) -> Option<Imp> {
        let mut class = Some(self);
        while let Some(current) = class {
            let found = current
                .instance_methods
                .read()
                .iter()
                .rev()
                .find(|m| m.selector() == sel)
                .map(Method::imp);
            if found.is_some() {
                return found;
            }
            class = current.superclass();
        }
        None
    }

    /// Look up a class method by selector, searching the superclass chain.
    pub fn class_method(&'static self, sel: Selector) -> Option<Imp> {
        let mut class = Some(self);
        while let Some(current) = class {
            let found = current
                .class_methods
                .read()
                .iter()
                .rev()
                .find(|m| m.selector() == sel)
                .map(Method::imp);
            if found.is_some() {
                return found;
            }
            class = current.superclass();
        }
        None
    }

    /// True iff instances of this class implement `sel`.
    pub fn responds_to(&'static self, sel: Selector) -> bool {
        self.instance_method(sel).is_some()
    }

    /// True iff this class (or an ancestor) adopts `protocol`, directly or
    /// through protocol extension.
    pub fn conforms_to(&'static self, protocol: &'static Protocol) -> bool {
        let mut class = Some(self);
        while let Some(current) = class {
            let adopted = current.protocols.read();
            if adopted.iter().any(|p| p.resolve().conforms_to(protocol)) {
                return true;
            }
            drop(adopted);
            class = current.superclass();
        }
        false
    }

    /// Find a declared property by exact name, searching this class and then
    /// the superclass chain. Returns `None` if absent at every level.
    pub fn property(&'static self, name: &str) -> Option<&'static Property> {
        let mut class = Some(self);
        while let Some(current) = class {
            let properties = current.properties.read();
            if let Some(index) = properties.iter().rposition(|p| p.name() == name) {
                // Entries are individually boxed and never removed, so the
                // boxed property outlives the lock guard and the Vec's own
                // reallocation; classes are never unloaded.
                let property: *const Property = &*properties[index];
                return Some(unsafe { &*property });
            }
            drop(properties);
            class = current.superclass();
        }
        None
    }

    /// Human-readable description of the class itself (not an instance).
    pub fn description(&self) -> String {
        self.name.to_string()
    }

    /// The root-behavior dispatch table installed for this class.
    pub(crate) fn root_ops(&self) -> &RootOps {
        &self.root_ops
    }

    /// The class-specific teardown hook, if any.
    pub(crate) fn finalizer(&self) -> Option<FinalizeFn> {
        self.finalize
    }
}
