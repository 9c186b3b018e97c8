//! Compiled-unit symbol tables
//!
//! A symbol table is the fixed record a compiled unit hands to the registry
//! at bootstrap: selector reference slots to intern and rewrite in place,
//! plus class, category, and protocol definition records. Tables are
//! `'static` data (the Rust rendition of a constructor-registered symbol
//! blob) and every field is const-constructible so units can emit them as
//! `static` items.
//!
//! Counts are implicit in slice lengths, so the negative-count corruption
//! case of the raw binary layout is unconstructible here; the remaining
//! malformed-data cases are caught by [`Symtab::validate`] and are fatal at
//! registration, never recoverable.

use crate::class::{FinalizeFn, MethodDef};
use crate::property::PropertyDef;
use crate::protocol::ProtocolDef;
use crate::root::RootOps;
use crate::selector::Selector;
use rustc_hash::FxHashSet;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// A selector reference slot emitted by the compiler.
///
/// The registry rewrites the slot in place exactly once, replacing the name
/// string as the lookup key with the interned selector value; subsequent
/// reads are value comparisons, not string comparisons.
#[derive(Debug)]
pub struct SelectorSlot {
    name: &'static str,
    interned: AtomicU32,
}

impl SelectorSlot {
    /// An unresolved slot for the given method name.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            interned: AtomicU32::new(0),
        }
    }

    /// The method name this slot references.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The interned selector, once the owning table has been registered.
    pub fn get(&self) -> Option<Selector> {
        NonZeroU32::new(self.interned.load(Ordering::Acquire)).map(Selector::from_raw)
    }

    pub(crate) fn resolve(&self, sel: Selector) {
        self.interned.store(sel.as_raw().get(), Ordering::Release);
    }
}

/// Compile-time class record, as emitted into a symbol table.
#[derive(Debug, Clone, Copy)]
pub struct ClassDef {
    /// Class name, unique within the process.
    pub name: &'static str,
    /// Superclass name; `None` declares a root class.
    pub superclass: Option<&'static str>,
    /// Instance-variable bytes added by this class (superclass excluded).
    pub instance_size: usize,
    /// Instance methods.
    pub instance_methods: &'static [MethodDef],
    /// Class methods.
    pub class_methods: &'static [MethodDef],
    /// Declared properties.
    pub properties: &'static [PropertyDef],
    /// Names of adopted protocols.
    pub protocols: &'static [&'static str],
    /// Teardown hook run before instance storage is released.
    pub finalize: Option<FinalizeFn>,
    /// Overrides for the root-behavior dispatch table.
    pub root_ops: Option<RootOps>,
}

impl ClassDef {
    /// A root class with a name, a layout size, and nothing else.
    pub const fn new(name: &'static str, instance_size: usize) -> Self {
        Self {
            name,
            superclass: None,
            instance_size,
            instance_methods: &[],
            class_methods: &[],
            properties: &[],
            protocols: &[],
            finalize: None,
            root_ops: None,
        }
    }
}

/// Compile-time category record: additions merged into an already- or
/// later-registered class.
#[derive(Debug, Clone, Copy)]
pub struct CategoryDef {
    /// Category name (diagnostic only).
    pub name: &'static str,
    /// Name of the class the category extends.
    pub class_name: &'static str,
    /// Added instance methods.
    pub instance_methods: &'static [MethodDef],
    /// Added class methods.
    pub class_methods: &'static [MethodDef],
    /// Added properties.
    pub properties: &'static [PropertyDef],
    /// Additionally adopted protocols.
    pub protocols: &'static [&'static str],
}

impl CategoryDef {
    /// An empty category on the given class.
    pub const fn new(name: &'static str, class_name: &'static str) -> Self {
        Self {
            name,
            class_name,
            instance_methods: &[],
            class_methods: &[],
            properties: &[],
            protocols: &[],
        }
    }
}

/// One compiled unit's symbol table.
pub struct Symtab {
    registered: AtomicBool,
    /// Selector reference slots to intern and rewrite.
    pub selector_refs: &'static [SelectorSlot],
    /// Protocol definitions; processed before classes so same-unit adoption
    /// resolves eagerly.
    pub protocol_defs: &'static [ProtocolDef],
    /// Class definitions.
    pub class_defs: &'static [ClassDef],
    /// Category definitions.
    pub category_defs: &'static [CategoryDef],
}

impl Symtab {
    /// Assemble a unit's symbol table.
    pub const fn new(
        selector_refs: &'static [SelectorSlot],
        protocol_defs: &'static [ProtocolDef],
        class_defs: &'static [ClassDef],
        category_defs: &'static [CategoryDef],
    ) -> Self {
        Self {
            registered: AtomicBool::new(false),
            selector_refs,
            protocol_defs,
            class_defs,
            category_defs,
        }
    }

    /// Claim this table for registration. The first caller gets `true`;
    /// re-registration of the same table is an idempotent no-op.
    pub(crate) fn claim(&self) -> bool {
        !self.registered.swap(true, Ordering::AcqRel)
    }

    /// Check the table for the malformed-data conditions a corrupt build
    /// artifact produces. Any error here is fatal at registration.
    pub fn validate(&self) -> Result<(), SymtabError> {
        for (index, slot) in self.selector_refs.iter().enumerate() {
            if slot.name().is_empty() {
                return Err(SymtabError::EmptySelectorName { index });
            }
        }

        let mut protocol_names = FxHashSet::default();
        for (index, def) in self.protocol_defs.iter().enumerate() {
            if def.name.is_empty() {
                return Err(SymtabError::EmptyProtocolName { index });
            }
            if !protocol_names.insert(def.name) {
                return Err(SymtabError::DuplicateProtocolDef { name: def.name });
            }
            validate_properties(def.name, def.properties)?;
        }

        let mut class_names = FxHashSet::default();
        for (index, def) in self.class_defs.iter().enumerate() {
            if def.name.is_empty() {
                return Err(SymtabError::EmptyClassName { index });
            }
            if !class_names.insert(def.name) {
                return Err(SymtabError::DuplicateClassDef { name: def.name });
            }
            match def.superclass {
                Some(superclass) if superclass.is_empty() => {
                    return Err(SymtabError::EmptySuperclassName { class: def.name });
                }
                Some(superclass) if superclass == def.name => {
                    return Err(SymtabError::SelfSuperclass { class: def.name });
                }
                _ => {}
            }
            validate_methods(def.name, def.instance_methods)?;
            validate_methods(def.name, def.class_methods)?;
            validate_properties(def.name, def.properties)?;
        }

        for (index, def) in self.category_defs.iter().enumerate() {
            if def.class_name.is_empty() {
                return Err(SymtabError::EmptyCategoryTarget { index });
            }
            validate_methods(def.class_name, def.instance_methods)?;
            validate_methods(def.class_name, def.class_methods)?;
            validate_properties(def.class_name, def.properties)?;
        }

        Ok(())
    }
}

impl std::fmt::Debug for Symtab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Symtab")
            .field("registered", &self.registered.load(Ordering::Relaxed))
            .field("selector_refs", &self.selector_refs.len())
            .field("protocol_defs", &self.protocol_defs.len())
            .field("class_defs", &self.class_defs.len())
            .field("category_defs", &self.category_defs.len())
            .finish()
    }
}

fn validate_methods(owner: &'static str, methods: &[MethodDef]) -> Result<(), SymtabError> {
    for def in methods {
        if def.name.is_empty() {
            return Err(SymtabError::EmptyMethodName { owner });
        }
    }
    Ok(())
}

fn validate_properties(
    owner: &'static str,
    properties: &[PropertyDef],
) -> Result<(), SymtabError> {
    let mut names = FxHashSet::default();
    for def in properties {
        if def.name.is_empty() {
            return Err(SymtabError::EmptyPropertyName { owner });
        }
        if !names.insert(def.name) {
            return Err(SymtabError::DuplicatePropertyDef {
                owner,
                property: def.name,
            });
        }
    }
    Ok(())
}

/// Malformed symbol-table data.
///
/// These indicate a corrupt build artifact; registration renders the error
/// and halts rather than continuing with inconsistent state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymtabError {
    /// A selector reference slot names the empty string.
    #[error("selector reference {index} has an empty name")]
    EmptySelectorName {
        /// Slot position in the table.
        index: usize,
    },

    /// A protocol definition names the empty string.
    #[error("protocol definition {index} has an empty name")]
    EmptyProtocolName {
        /// Definition position in the table.
        index: usize,
    },

    /// One table defines the same protocol twice.
    #[error("protocol `{name}` defined twice in one table")]
    DuplicateProtocolDef {
        /// The colliding protocol name.
        name: &'static str,
    },

    /// A class definition names the empty string.
    #[error("class definition {index} has an empty name")]
    EmptyClassName {
        /// Definition position in the table.
        index: usize,
    },

    /// One table defines the same class twice.
    #[error("class `{name}` defined twice in one table")]
    DuplicateClassDef {
        /// The colliding class name.
        name: &'static str,
    },

    /// A class names an empty superclass instead of declaring itself a root.
    #[error("class `{class}` has an empty superclass name")]
    EmptySuperclassName {
        /// The malformed class.
        class: &'static str,
    },

    /// A class names itself as its superclass.
    #[error("class `{class}` is its own superclass")]
    SelfSuperclass {
        /// The malformed class.
        class: &'static str,
    },

    /// A method definition names the empty string.
    #[error("method with empty name on `{owner}`")]
    EmptyMethodName {
        /// The declaring class or category target.
        owner: &'static str,
    },

    /// A property definition names the empty string.
    #[error("property with empty name on `{owner}`")]
    EmptyPropertyName {
        /// The declaring class or protocol.
        owner: &'static str,
    },

    /// One definition declares the same property twice.
    #[error("property `{property}` declared twice on `{owner}`")]
    DuplicatePropertyDef {
        /// The declaring class or protocol.
        owner: &'static str,
        /// The colliding property name.
        property: &'static str,
    },

    /// A category targets the empty string.
    #[error("category definition {index} targets an empty class name")]
    EmptyCategoryTarget {
        /// Definition position in the table.
        index: usize,
    },
}
