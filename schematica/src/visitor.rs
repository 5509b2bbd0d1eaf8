//! Edge enumeration for collector-owned objects. A tracing collector (or a
//! reclaimer releasing RcObject edges) walks heap cells through these
//! traits without knowing their layouts.
use crate::{Cons, Symbol, TaggedValue, ZString};

pub trait Visitor {
    fn visit(&mut self, value: &TaggedValue);
}

pub trait Visitable {
    fn visit_edges(&self, visitor: &mut impl Visitor);
}

impl Visitable for Cons {
    #[inline]
    fn visit_edges(&self, visitor: &mut impl Visitor) {
        visitor.visit(&self.car);
        visitor.visit(&self.cdr);
    }
}

impl Visitable for Symbol {
    #[inline]
    fn visit_edges(&self, visitor: &mut impl Visitor) {
        let name = TaggedValue::from_zstring(self.name());
        visitor.visit(&name);
    }
}

// nothing to visit in a zstring
impl Visitable for ZString {
    #[inline]
    fn visit_edges(&self, _visitor: &mut impl Visitor) {}
}
