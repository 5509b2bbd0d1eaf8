//! Symbol: an interned name. The interning table owns the canonical ZString
//! and guarantees at most one Symbol per distinct name, which is what makes
//! identity comparison sound here.
use std::ptr::NonNull;

use crate::ZString;

/// An interned name holding a non-owning reference to its canonical
/// ZString. Equality is pointer identity, never content: falling back to a
/// byte comparison would break the interning invariant and the O(1)
/// comparison everything downstream relies on.
#[repr(C)]
#[derive(Debug)]
pub struct Symbol {
    name: NonNull<ZString>,
}

impl Symbol {
    /// # Safety
    /// `name` must be the canonical interned ZString for this symbol and
    /// outlive it.
    pub unsafe fn init(&mut self, name: NonNull<ZString>) {
        self.name = name;
    }

    #[inline]
    pub fn name(&self) -> NonNull<ZString> {
        self.name
    }

    /// The name's bytes.
    ///
    /// # Safety
    /// The interned ZString must still be live (the interning table keeps
    /// it so for its own lifetime).
    #[inline]
    pub unsafe fn name_bytes(&self) -> &[u8] {
        // SAFETY: liveness warranted by the caller
        unsafe { self.name.as_ref() }.as_bytes()
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Symbol {}
