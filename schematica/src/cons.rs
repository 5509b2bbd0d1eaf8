//! Cons: a pair of two tagged values, the building block of lists. The
//! empty list is not a cell at all but the cons-tagged word with a null
//! payload ([`crate::TaggedValue::nil`]).
use crate::TaggedValue;

/// A 128-bit pair cell. Both fields may hold any tag, including nested
/// cons, so cyclic and branching structures are representable; traversals
/// over them are the caller's (cycle-aware) responsibility, as is any
/// structural equality or hashing.
#[repr(C)]
#[derive(Debug)]
pub struct Cons {
    pub car: TaggedValue,
    pub cdr: TaggedValue,
}

impl Cons {
    /// Move both fields into the cell.
    ///
    /// # Safety
    /// The cell must sit in zeroed storage (fresh from the allocator), so
    /// the overwritten fields are sentinel words and no stale reference is
    /// dropped.
    pub unsafe fn init(&mut self, car: TaggedValue, cdr: TaggedValue) {
        self.car = car;
        self.cdr = cdr;
    }
}

#[cfg(test)]
mod cons_tests {
    use super::*;
    use crate::{Allocator, RustAllocator, Tag};

    #[test]
    fn cell_holds_car_and_cdr() {
        let mut alloc = RustAllocator::new();
        let pair = alloc.allocate_cons(TaggedValue::from_i32(1), TaggedValue::from_i32(2));

        assert_eq!(pair.tag(), Tag::Cons);
        assert!(!pair.is_nil());
        let cell = pair.as_cons().expect("non-nil cons has a cell");
        // SAFETY: freshly allocated cell
        let cell = unsafe { cell.as_ref() };
        assert_eq!(cell.car.as_int32(-1), 1);
        assert_eq!(cell.cdr.as_int32(-1), 2);
    }

    #[test]
    fn nested_cells_form_lists() {
        let mut alloc = RustAllocator::new();
        let tail = alloc.allocate_cons(TaggedValue::from_i32(2), TaggedValue::nil());
        let list = alloc.allocate_cons(TaggedValue::from_i32(1), tail);

        // SAFETY: cells are live in the arena
        unsafe {
            let head = list.as_cons().unwrap().as_ref();
            assert_eq!(head.car.as_int32(-1), 1);
            let second = head.cdr.as_cons().unwrap().as_ref();
            assert_eq!(second.car.as_int32(-1), 2);
            assert!(second.cdr.is_nil());
        }
    }

    #[test]
    fn overwriting_a_field_releases_the_old_rc_edge() {
        use crate::object::Object;
        use std::ptr::NonNull;

        #[repr(C)]
        struct Probe {
            base: Object,
            dropped: *mut bool,
        }

        unsafe fn destroy_probe(obj: NonNull<Object>) {
            let probe = obj.cast::<Probe>();
            unsafe {
                *(*probe.as_ptr()).dropped = true;
                drop(Box::from_raw(probe.as_ptr()));
            }
        }

        let mut dropped = false;
        let probe = Box::new(Probe {
            base: Object::new(destroy_probe),
            dropped: &mut dropped,
        });
        let obj = NonNull::from(Box::leak(probe)).cast::<Object>();

        let mut alloc = RustAllocator::new();
        // SAFETY: takes over the creating reference
        let edge = unsafe { TaggedValue::from_object(obj) };
        let pair = alloc.allocate_cons(edge, TaggedValue::nil());

        let mut cell = pair.as_cons().unwrap();
        // SAFETY: freshly allocated cell, sole access
        unsafe {
            cell.as_mut().car = TaggedValue::from_i32(0);
        }
        assert!(dropped, "replaced field must release its reference");
    }
}
