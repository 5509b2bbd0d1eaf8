//! The collector boundary. Cons cells, symbols, zstrings and boxed number
//! cells are owned by an external passive collector; this crate only needs
//! a way to carve out correctly-sized storage and hand back addresses that
//! fit in a 48-bit payload.
//!
//! `RustAllocator` stands in for that collector in tests and in embedders
//! that do not bring one: a flat arena over the global allocator that frees
//! everything on drop and never reclaims in between.
use std::alloc::{self, Layout, handle_alloc_error};
use std::ptr::NonNull;

use log::debug;

use crate::{Cons, PAYLOAD_MASK, Symbol, TaggedValue, ZString};

pub trait Allocator: Sized {
    /// Allocate a zeroed block. The contract the value representation
    /// relies on:
    ///
    /// - the address fits in 48 bits;
    /// - the storage stays valid for the lifetime of every TaggedValue
    ///   referencing it (pinning or barriers are the collector's problem);
    /// - the storage is zeroed, so uninitialized tagged-value fields read
    ///   as sentinel words;
    /// - reclamation does not run Rust destructors. A collector that frees
    ///   a cell holding RcObject edges must release them itself, e.g. by
    ///   walking the cell with [`crate::Visitable`].
    fn allocate(&mut self, layout: Layout) -> NonNull<u8>;

    fn allocate_zstring(&mut self, bytes: &[u8]) -> NonNull<ZString> {
        let layout = ZString::required_layout(bytes.len());
        let zstr = self.allocate(layout).cast::<ZString>();
        // SAFETY: fresh zeroed block of the required size
        unsafe { (*zstr.as_ptr()).init(bytes) };
        zstr
    }

    fn allocate_symbol(&mut self, name: NonNull<ZString>) -> NonNull<Symbol> {
        let symbol = self.allocate(Layout::new::<Symbol>()).cast::<Symbol>();
        // SAFETY: fresh zeroed block; name outlives the symbol per the
        // interning table's contract
        unsafe { (*symbol.as_ptr()).init(name) };
        symbol
    }

    fn allocate_cons(&mut self, car: TaggedValue, cdr: TaggedValue) -> TaggedValue {
        let cell = self.allocate(Layout::new::<Cons>()).cast::<Cons>();
        // SAFETY: fresh zeroed block, so init overwrites sentinel words
        unsafe { (*cell.as_ptr()).init(car, cdr) };
        TaggedValue::from_cons(cell)
    }

    fn allocate_i64(&mut self, value: i64) -> TaggedValue {
        let cell = self.allocate(Layout::new::<i64>()).cast::<i64>();
        // SAFETY: fresh block sized for an i64
        unsafe { cell.as_ptr().write(value) };
        TaggedValue::from_i64_cell(cell)
    }

    fn allocate_f64(&mut self, value: f64) -> TaggedValue {
        let cell = self.allocate(Layout::new::<f64>()).cast::<f64>();
        // SAFETY: fresh block sized for an f64
        unsafe { cell.as_ptr().write(value) };
        TaggedValue::from_f64_cell(cell)
    }

    /// Build a nil-terminated list out of `values`, first element at the
    /// head.
    fn allocate_list<I>(&mut self, values: I) -> TaggedValue
    where
        I: IntoIterator<Item = TaggedValue>,
        I::IntoIter: DoubleEndedIterator,
    {
        let mut list = TaggedValue::nil();
        for value in values.into_iter().rev() {
            list = self.allocate_cons(value, list);
        }
        list
    }
}

/// Arena over the Rust global allocator. Every block is freed when the
/// arena drops; nothing is reclaimed earlier, so addresses stay valid for
/// as long as the arena lives.
#[derive(Debug, Default)]
pub struct RustAllocator {
    allocations: Vec<(NonNull<u8>, Layout)>,
}

impl RustAllocator {
    pub fn new() -> Self {
        Self {
            allocations: Vec::new(),
        }
    }

    pub fn allocation_count(&self) -> usize {
        self.allocations.len()
    }
}

impl Allocator for RustAllocator {
    fn allocate(&mut self, layout: Layout) -> NonNull<u8> {
        debug_assert!(layout.size() > 0);
        // SAFETY: layout has non-zero size
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let Some(block) = NonNull::new(raw) else {
            handle_alloc_error(layout);
        };
        debug_assert_eq!(
            (block.as_ptr() as u64) & !PAYLOAD_MASK,
            0,
            "allocation does not fit in a 48-bit payload"
        );
        self.allocations.push((block, layout));
        block
    }
}

impl Drop for RustAllocator {
    fn drop(&mut self) {
        debug!("rust allocator: freeing {} blocks", self.allocations.len());
        for (block, layout) in self.allocations.drain(..) {
            // SAFETY: allocated above with exactly this layout
            unsafe { alloc::dealloc(block.as_ptr(), layout) };
        }
    }
}

#[cfg(test)]
mod allocator_tests {
    use super::*;
    use crate::Tag;

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn boxed_i64_cells_roundtrip() {
        init_logs();
        let mut alloc = RustAllocator::new();
        let v = alloc.allocate_i64(i64::MIN + 3);
        assert_eq!(v.tag(), Tag::I64);
        // SAFETY: the cell is live in the arena
        assert_eq!(unsafe { v.as_int64(0) }, i64::MIN + 3);
        // SAFETY: wrong tag never dereferences
        assert_eq!(unsafe { v.as_float64(1.5) }, 1.5);
    }

    #[test]
    fn boxed_f64_cells_roundtrip_bit_exactly() {
        let mut alloc = RustAllocator::new();
        for bits in [
            3.14f64.to_bits(),
            (-0.0f64).to_bits(),
            f64::NAN.to_bits(),
            0x7ff8_0000_dead_beef, // non-canonical NaN
        ] {
            let a = alloc.allocate_f64(f64::from_bits(bits));
            let b = alloc.allocate_f64(f64::from_bits(bits));
            // SAFETY: the cells are live in the arena
            unsafe {
                assert_eq!(a.as_float64(0.0).to_bits(), bits);
                assert_eq!(a.as_float64(0.0).to_bits(), b.as_float64(0.0).to_bits());
            }
        }
    }

    #[test]
    fn allocate_list_builds_in_order_and_terminates_with_nil() {
        let mut alloc = RustAllocator::new();
        let list = alloc.allocate_list([
            TaggedValue::from_i32(1),
            TaggedValue::from_i32(2),
            TaggedValue::from_i32(3),
        ]);

        let mut expected = 1;
        let mut cursor = list;
        while !cursor.is_nil() {
            let cell = cursor.as_cons().expect("list spine is cons cells");
            // SAFETY: cells are live in the arena
            let cell = unsafe { cell.as_ref() };
            assert_eq!(cell.car.as_int32(-1), expected);
            expected += 1;
            cursor = cell.cdr.clone();
        }
        assert_eq!(expected, 4);
    }

    #[test]
    fn empty_list_is_nil_without_allocating() {
        let mut alloc = RustAllocator::new();
        let list = alloc.allocate_list([]);
        assert!(list.is_nil());
        assert_eq!(alloc.allocation_count(), 0);
    }

    #[test]
    fn fresh_blocks_read_as_sentinel_words() {
        let mut alloc = RustAllocator::new();
        let block = alloc.allocate(Layout::new::<[u64; 4]>()).cast::<u64>();
        for i in 0..4 {
            // SAFETY: fresh block of four words
            let word = unsafe { *block.as_ptr().add(i) };
            // SAFETY: an all-zero word carries no reference
            assert_eq!(unsafe { TaggedValue::from_raw(word) }.tag(), Tag::Sentinel);
        }
    }
}
