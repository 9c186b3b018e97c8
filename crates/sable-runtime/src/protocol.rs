//! Protocols and conformance checking
//!
//! A protocol is a named set of required/optional method selectors plus
//! declared properties, and may extend other protocols. Conformance is
//! reflexive and transitive through the extension graph; the walk carries a
//! visited set so a malformed extension cycle terminates instead of looping.

use crate::property::{Property, PropertyDef};
use crate::registry::Registry;
use crate::selector::Selector;
use once_cell::sync::OnceCell;
use rustc_hash::FxHashSet;

/// Compile-time protocol record, as emitted into a symbol table.
#[derive(Debug, Clone, Copy)]
pub struct ProtocolDef {
    /// Protocol name.
    pub name: &'static str,
    /// Names of protocols this protocol extends.
    pub extends: &'static [&'static str],
    /// Required instance-method selector names.
    pub required_instance_methods: &'static [&'static str],
    /// Optional instance-method selector names.
    pub optional_instance_methods: &'static [&'static str],
    /// Required class-method selector names.
    pub required_class_methods: &'static [&'static str],
    /// Optional class-method selector names.
    pub optional_class_methods: &'static [&'static str],
    /// Properties declared by the protocol.
    pub properties: &'static [PropertyDef],
}

impl ProtocolDef {
    /// A protocol with a name and nothing else.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            extends: &[],
            required_instance_methods: &[],
            optional_instance_methods: &[],
            required_class_methods: &[],
            optional_class_methods: &[],
            properties: &[],
        }
    }
}

/// A name-keyed reference to a registered protocol.
///
/// Referenced protocols may be registered by a later-loading unit, so the
/// link is by name and resolves on first use, caching the result.
#[derive(Debug)]
pub(crate) struct ProtocolRef {
    name: Box<str>,
    cached: OnceCell<&'static Protocol>,
}

impl ProtocolRef {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            cached: OnceCell::new(),
        }
    }

    /// Resolve to the registered protocol.
    ///
    /// An unresolvable reference is a broken link contract, not a lookup
    /// miss, and halts.
    pub(crate) fn resolve(&self) -> &'static Protocol {
        *self.cached.get_or_init(|| {
            match Registry::global().get_protocol(&self.name) {
                Some(protocol) => protocol,
                None => panic!("unresolved protocol reference `{}`", self.name),
            }
        })
    }
}

/// Runtime protocol object. Immutable after bootstrap; handles are
/// `&'static Protocol` and live for the whole process.
#[derive(Debug)]
pub struct Protocol {
    name: Box<str>,
    extends: Box<[ProtocolRef]>,
    required_instance_methods: Box<[Selector]>,
    optional_instance_methods: Box<[Selector]>,
    required_class_methods: Box<[Selector]>,
    optional_class_methods: Box<[Selector]>,
    properties: Box<[Property]>,
}

impl Protocol {
    /// Materialize a protocol from its symbol-table record.
    ///
    /// Method names are interned through the registry's selector table at
    /// this point, so later queries compare selector values.
    pub(crate) fn from_def(def: &ProtocolDef) -> Self {
        let registry = Registry::global();
        let intern_all = |names: &[&str]| -> Box<[Selector]> {
            names
                .iter()
                .map(|name| registry.register_selector(name))
                .collect()
        };
        Self {
            name: def.name.into(),
            extends: def.extends.iter().map(|name| ProtocolRef::new(name)).collect(),
            required_instance_methods: intern_all(def.required_instance_methods),
            optional_instance_methods: intern_all(def.optional_instance_methods),
            required_class_methods: intern_all(def.required_class_methods),
            optional_class_methods: intern_all(def.optional_class_methods),
            properties: def.properties.iter().map(Property::from_def).collect(),
        }
    }

    /// Protocol name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Required instance-method selectors.
    pub fn required_instance_methods(&self) -> &[Selector] {
        &self.required_instance_methods
    }

    /// Optional instance-method selectors.
    pub fn optional_instance_methods(&self) -> &[Selector] {
        &self.optional_instance_methods
    }

    /// Required class-method selectors.
    pub fn required_class_methods(&self) -> &[Selector] {
        &self.required_class_methods
    }

    /// Optional class-method selectors.
    pub fn optional_class_methods(&self) -> &[Selector] {
        &self.optional_class_methods
    }

    /// Properties declared directly by this protocol.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// True iff `other` is this protocol or is reachable through the
    /// extended-protocol graph.
    pub fn conforms_to(&'static self, other: &'static Protocol) -> bool {
        let mut visited = FxHashSet::default();
        self.conforms_inner(other, &mut visited)
    }

    fn conforms_inner(
        &'static self,
        other: &'static Protocol,
        visited: &mut FxHashSet<*const Protocol>,
    ) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if !visited.insert(self as *const Protocol) {
            // Already expanded; an extension cycle ends here.
            return false;
        }
        self.extends
            .iter()
            .any(|parent| parent.resolve().conforms_inner(other, visited))
    }

    /// Find a declared property by exact name, searching extended protocols
    /// when it is not declared locally. Returns `None` if absent everywhere.
    pub fn property(&'static self, name: &str) -> Option<&'static Property> {
        let mut visited = FxHashSet::default();
        self.property_inner(name, &mut visited)
    }

    fn property_inner(
        &'static self,
        name: &str,
        visited: &mut FxHashSet<*const Protocol>,
    ) -> Option<&'static Property> {
        if !visited.insert(self as *const Protocol) {
            return None;
        }
        if let Some(property) = self.properties.iter().find(|p| p.name() == name) {
            return Some(property);
        }
        self.extends
            .iter()
            .find_map(|parent| parent.resolve().property_inner(name, visited))
    }
}
