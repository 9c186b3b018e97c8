//! Sable Object Runtime
//!
//! A minimal object runtime for compiled Sable units:
//! - **Registry**: process-wide class/protocol/selector registry fed by
//!   compiler-emitted symbol tables (`registry`, `symtab` modules)
//! - **Allocator**: instance storage sized per class layout, isa-first
//!   header (`object` module)
//! - **Reference counting**: manual retain/release with a detected-underflow
//!   guard (`rc` module)
//! - **Introspection**: protocol conformance and property attributes
//!   (`protocol`, `property` modules)
//! - **Root behavior**: the self-describing capability set every instance
//!   inherits (`root` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use sable_runtime::{init_symtab, get_class, class_create_instance, release};
//!
//! // Emitted by the compiler for one unit:
//! static TABLE: Symtab = Symtab::new(&SELECTOR_REFS, &[], &CLASS_DEFS, &[]);
//!
//! // Run by the host's startup sequence, before the unit's own code:
//! init_symtab(&TABLE);
//!
//! let counter = get_class("Counter").expect("linked class");
//! let instance = class_create_instance(counter);
//! release(instance);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![allow(clippy::not_unsafe_ptr_arg_deref)]

pub mod class;
pub mod object;
pub mod property;
pub mod protocol;
pub mod rc;
pub mod registry;
pub mod root;
pub mod selector;
pub mod symtab;

pub use class::{Class, FinalizeFn, Imp, Method, MethodDef};
pub use object::{
    class_create_instance, object_destroy, object_get_class, object_set_class, Id,
};
pub use property::{Property, PropertyDef};
pub use protocol::{Protocol, ProtocolDef};
pub use rc::{release, retain, retain_count};
pub use registry::{
    copy_class_list, get_class, get_protocol, init_symtab, register_selector, Registry,
};
pub use root::{conforms_to_protocol, copy_description, description, obj_self, RootOps};
pub use selector::Selector;
pub use symtab::{CategoryDef, ClassDef, SelectorSlot, Symtab, SymtabError};
