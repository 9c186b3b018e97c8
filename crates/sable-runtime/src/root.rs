//! Root object behavior
//!
//! The minimal self-describing capability set every instance inherits:
//! identity, class lookup, protocol conformance, and a human-readable
//! description. Rather than language-level inheritance, each class carries a
//! small dispatch table of function pointers installed at materialization;
//! a class definition may override individual entries.

use crate::object::{object_get_class, Id};
use crate::protocol::Protocol;

/// Per-class dispatch table for the root capability set.
///
/// Entries default to the runtime's implementations; symbol-table class
/// definitions can override any of them with struct update syntax:
/// `RootOps { description: my_description, ..RootOps::DEFAULT }`.
#[derive(Debug, Clone, Copy)]
pub struct RootOps {
    /// Identity: returns the receiver unchanged.
    pub obj_self: fn(Id) -> Id,
    /// Protocol conformance of the receiver's current class.
    pub conforms_to: fn(Id, &'static Protocol) -> bool,
    /// Human-readable identity, minimally the class name.
    pub description: fn(Id) -> String,
    /// Owned copy of the description; callers release it by dropping.
    pub copy_description: fn(Id) -> String,
}

impl RootOps {
    /// The runtime-provided root behavior.
    pub const DEFAULT: RootOps = RootOps {
        obj_self: default_obj_self,
        conforms_to: default_conforms_to,
        description: default_description,
        copy_description: default_description,
    };
}

impl Default for RootOps {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn default_obj_self(obj: Id) -> Id {
    obj
}

fn default_conforms_to(obj: Id, protocol: &'static Protocol) -> bool {
    object_get_class(obj).is_some_and(|cls| cls.conforms_to(protocol))
}

fn default_description(obj: Id) -> String {
    match object_get_class(obj) {
        Some(cls) => format!("<{} {:p}>", cls.name(), obj.ivar_base()),
        None => "nil".to_string(),
    }
}

/// `self`: the receiver, unchanged. Nil stays nil.
pub fn obj_self(obj: Id) -> Id {
    match object_get_class(obj) {
        Some(cls) => (cls.root_ops().obj_self)(obj),
        None => obj,
    }
}

/// Whether the receiver's current class conforms to `protocol`. False for
/// nil — a missing receiver conforms to nothing.
pub fn conforms_to_protocol(obj: Id, protocol: &'static Protocol) -> bool {
    match object_get_class(obj) {
        Some(cls) => (cls.root_ops().conforms_to)(obj, protocol),
        None => false,
    }
}

/// Human-readable description of the receiver.
pub fn description(obj: Id) -> String {
    match object_get_class(obj) {
        Some(cls) => (cls.root_ops().description)(obj),
        None => "nil".to_string(),
    }
}

/// Owned copy of the receiver's description.
pub fn copy_description(obj: Id) -> String {
    match object_get_class(obj) {
        Some(cls) => (cls.root_ops().copy_description)(obj),
        None => "nil".to_string(),
    }
}
