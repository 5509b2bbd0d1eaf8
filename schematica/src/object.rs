//! The intrusive-refcount contract between TaggedValue and externally
//! managed objects.
//!
//! The full reflected object API lives outside this crate; all the value
//! representation needs is the prefix every refcounted object starts with
//! and the two functions it calls symmetrically around copy and destroy.
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, Ordering, fence};

use log::trace;

/// Destroys the object once its count has reached zero. Called with the
/// same pointer the releasing value held; the hook owns deallocation.
pub type DestroyFn = unsafe fn(NonNull<Object>);

#[repr(C)]
#[derive(Debug)]
pub struct ObjectHeader {
    strong: AtomicU32,
    destroy: DestroyFn,
}

/// Prefix of every externally refcounted object.
///
/// Concrete object types embed this as their first field (`#[repr(C)]`), so
/// a pointer to the object is a pointer to its `Object` prefix and back.
/// The count starts at 1: the creating reference.
#[repr(C)]
#[derive(Debug)]
pub struct Object {
    pub header: ObjectHeader,
}

impl ObjectHeader {
    pub fn new(destroy: DestroyFn) -> Self {
        Self {
            strong: AtomicU32::new(1),
            destroy,
        }
    }
}

impl Object {
    pub fn new(destroy: DestroyFn) -> Self {
        Self {
            header: ObjectHeader::new(destroy),
        }
    }

    pub fn refcount(&self) -> u32 {
        self.header.strong.load(Ordering::Relaxed)
    }
}

/// Increment the object's count.
///
/// # Safety
/// `obj` must point to a live `Object` whose count is at least one (the
/// caller's own reference keeps it alive across the call).
pub unsafe fn add_ref(obj: NonNull<Object>) {
    // SAFETY: liveness warranted by the caller
    let header = unsafe { &(*obj.as_ptr()).header };
    let old = header.strong.fetch_add(1, Ordering::Relaxed);
    trace!("add_ref {obj:p}: {old} -> {}", old + 1);
}

/// Decrement the object's count, destroying it at zero.
///
/// # Safety
/// `obj` must point to a live `Object` and the caller must own the
/// reference being released; the pointer must not be used afterwards.
pub unsafe fn release(obj: NonNull<Object>) {
    // SAFETY: liveness warranted by the caller
    let header = unsafe { &(*obj.as_ptr()).header };
    let old = header.strong.fetch_sub(1, Ordering::Release);
    trace!("release {obj:p}: {old} -> {}", old - 1);
    if old == 1 {
        // synchronize with every preceding release before tearing down
        fence(Ordering::Acquire);
        let destroy = header.destroy;
        // SAFETY: the count hit zero, so this is the last reference
        unsafe { destroy(obj) };
    }
}
