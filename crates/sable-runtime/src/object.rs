//! Instance storage: header layout, allocation, and isa accessors
//!
//! Every instance is one contiguous zero-initialized block: a header whose
//! first field is the isa (class) pointer, the retain count, the recorded
//! allocation size, then the instance-variable storage described by the
//! class layout. The retain count lives in the header word so the
//! reference-count manager needs no side table.

use crate::class::Class;
use crate::rc::RC_DEAD;
use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

/// Instance header, colocated with the instance-variable storage.
#[repr(C)]
pub(crate) struct ObjectHeader {
    /// The isa field: which class this instance currently belongs to.
    pub(crate) isa: AtomicPtr<Class>,
    /// Retain count; poisoned with [`RC_DEAD`] on destruction.
    pub(crate) retain_count: AtomicUsize,
    /// Total allocation size in bytes (header included), recorded at
    /// creation so teardown releases exactly what was allocated even after
    /// an isa swap.
    pub(crate) alloc_size: usize,
}

/// Opaque, nullable instance handle.
///
/// `Id` is a plain copyable handle; ownership is expressed through the
/// retain/release operations, not through Rust moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Id(*mut ObjectHeader);

// Handles are shared freely across threads; every header access goes
// through atomics.
unsafe impl Send for Id {}
unsafe impl Sync for Id {}

impl Id {
    /// The null handle.
    pub const fn nil() -> Self {
        Self(std::ptr::null_mut())
    }

    /// True for the null handle.
    pub fn is_nil(self) -> bool {
        self.0.is_null()
    }

    /// The raw header pointer backing this handle.
    pub(crate) fn as_ptr(self) -> *mut ObjectHeader {
        self.0
    }

    pub(crate) fn from_ptr(ptr: *mut ObjectHeader) -> Self {
        Self(ptr)
    }

    /// Borrow the header. Caller guarantees the handle is non-nil and the
    /// instance has not been destroyed.
    pub(crate) unsafe fn header(self) -> &'static ObjectHeader {
        &*self.0
    }

    /// Pointer to the start of instance-variable storage.
    pub fn ivar_base(self) -> *mut u8 {
        if self.is_nil() {
            return std::ptr::null_mut();
        }
        unsafe { (self.0 as *mut u8).add(header_size()) }
    }
}

/// Header-plus-ivars layout for a given ivar size.
///
/// Layout errors only occur on address-space-overflowing sizes, which is a
/// corrupt class definition: fatal.
fn instance_layout(ivar_size: usize) -> Layout {
    let header = Layout::new::<ObjectHeader>();
    let ivars = Layout::from_size_align(ivar_size, std::mem::align_of::<ObjectHeader>())
        .expect("instance layout overflow");
    let (combined, _offset) = header.extend(ivars).expect("instance layout overflow");
    combined.pad_to_align()
}

fn header_size() -> usize {
    // Ivar storage shares the header's alignment, so it starts right after.
    std::mem::size_of::<ObjectHeader>()
}

/// Allocate a fresh instance of `cls`.
///
/// Storage is zero-initialized and sized to the class's computed layout
/// (superclass layout plus declared instance variables); the isa field is
/// set to `cls` and the retain count starts at 1. Allocation exhaustion is
/// fatal — there is no recovery path.
pub fn class_create_instance(cls: &'static Class) -> Id {
    let layout = instance_layout(cls.instance_size());
    let ptr = unsafe { alloc_zeroed(layout) };
    if ptr.is_null() {
        handle_alloc_error(layout);
    }
    let header = ptr as *mut ObjectHeader;
    unsafe {
        (*header)
            .isa
            .store(cls as *const Class as *mut Class, Ordering::Release);
        (*header).retain_count.store(1, Ordering::Release);
        (*header).alloc_size = layout.size();
    }
    Id::from_ptr(header)
}

/// Release an instance's storage.
///
/// Invoked by the reference-count manager when the count reaches zero: runs
/// the class finalizer chain (most-derived first), poisons the count word,
/// and frees the block. Calling this directly on a still-referenced object
/// is contract misuse with undefined results, not a checked error.
pub fn object_destroy(obj: Id) {
    if obj.is_nil() {
        return;
    }
    let mut class = object_get_class(obj);
    while let Some(current) = class {
        if let Some(finalize) = current.finalizer() {
            finalize(obj);
        }
        class = current.superclass();
    }
    let header = unsafe { obj.header() };
    let size = header.alloc_size;
    header.retain_count.store(RC_DEAD, Ordering::Release);
    let layout = Layout::from_size_align(size, std::mem::align_of::<ObjectHeader>())
        .expect("instance layout overflow");
    unsafe { dealloc(obj.as_ptr() as *mut u8, layout) };
}

/// Read the isa field: the instance's current class. `None` for nil.
pub fn object_get_class(obj: Id) -> Option<&'static Class> {
    if obj.is_nil() {
        return None;
    }
    let isa = unsafe { obj.header() }.isa.load(Ordering::Acquire);
    // A registered class is 'static; the isa of a live object is always one.
    unsafe { isa.cast_const().as_ref() }
}

/// Atomically swap the isa field to `cls`.
///
/// Touches neither the retain count nor instance-variable storage. The
/// caller must guarantee `cls` has a compatible-or-larger layout; violating
/// that is documented undefined behavior, not a checked error.
pub fn object_set_class(obj: Id, cls: &'static Class) {
    if obj.is_nil() {
        return;
    }
    unsafe { obj.header() }
        .isa
        .store(cls as *const Class as *mut Class, Ordering::Release);
}
