mod allocator;
mod cons;
mod interning;
mod object;
mod symbol;
mod tagged;
mod visitor;
mod zstring;

pub use allocator::{Allocator, RustAllocator};
pub use cons::Cons;
pub use interning::SymbolTable;
pub use object::{DestroyFn, Object, ObjectHeader, add_ref, release};
pub use symbol::Symbol;
pub use tagged::{PAYLOAD_BITS, PAYLOAD_MASK, TAG_BITS, Tag, TaggedValue};
pub use visitor::{Visitable, Visitor};
pub use zstring::ZString;
