//! The symbol interning table: at most one Symbol per distinct name, for
//! the table's whole lifetime. Identity equality on [`Symbol`] is only
//! sound while every symbol in circulation came through one table.
use std::collections::HashMap;
use std::ptr::NonNull;

use ahash::RandomState;
use log::debug;
use parking_lot::RwLock;

use crate::{Allocator, Symbol};

/// Table entries are only handed out, never dereferenced here, so sharing
/// the raw pointers across threads is fine; the pointees are immutable
/// after init.
struct SymbolPtr(NonNull<Symbol>);

// SAFETY: see above
unsafe impl Send for SymbolPtr {}
// SAFETY: see above
unsafe impl Sync for SymbolPtr {}

pub struct SymbolTable {
    symbols: RwLock<HashMap<String, SymbolPtr, RandomState>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            symbols: RwLock::new(HashMap::default()),
        }
    }

    /// The canonical symbol for `name`, allocating it on first use. The
    /// canonical ZString and the Symbol are both carved out of `alloc`,
    /// exactly once per distinct name.
    pub fn intern(&self, alloc: &mut impl Allocator, name: &str) -> NonNull<Symbol> {
        if let Some(existing) = self.lookup(name) {
            return existing;
        }
        let mut symbols = self.symbols.write();
        // a racing intern may have won between the two locks
        if let Some(existing) = symbols.get(name) {
            return existing.0;
        }
        let zstr = alloc.allocate_zstring(name.as_bytes());
        let symbol = alloc.allocate_symbol(zstr);
        debug!("interned {name:?}");
        symbols.insert(name.to_owned(), SymbolPtr(symbol));
        symbol
    }

    /// Look up without allocating.
    pub fn lookup(&self, name: &str) -> Option<NonNull<Symbol>> {
        self.symbols.read().get(name).map(|entry| entry.0)
    }

    pub fn len(&self) -> usize {
        self.symbols.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
