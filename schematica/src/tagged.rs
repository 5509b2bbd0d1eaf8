//! TaggedValue: a dynamically-typed schematica value packed into one 64-bit
//! word by stealing the 16 most-significant bits of a pointer as a type tag.
//!
//! Immediate tags keep their payload inline in the low bits; pointer tags
//! store a 48-bit address into collector-owned storage. Exactly one tag
//! (RcObject) manages a lifetime: cloning such a word bumps the referenced
//! object's count, dropping it releases. All other tags clone and drop as
//! plain bit copies.
use std::fmt;
use std::mem;
use std::ptr::NonNull;

use crate::{Cons, Object, Symbol, ZString, object};

/// number of pointer bits stolen for the type tag
pub const TAG_BITS: u32 = 16;
/// number of pointer bits remaining after the hi tag bits are stolen
pub const PAYLOAD_BITS: u32 = 64 - TAG_BITS;

pub const PAYLOAD_MASK: u64 = u64::MAX >> TAG_BITS;

/// Type tag held in the top 16 bits of a [`TaggedValue`].
///
/// The numbering is ABI: raw words exchanged with the collector or the
/// interpreter must decode to the same tags. Gaps are reserved.
#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Tag {
    /// the all-zero word; not observable from schematica
    Sentinel = 0x0000,
    /// truth value in the least-significant bit
    Boolean = 0x0001,
    /// ascii character in the least-significant 8 bits
    Char = 0x0002,
    /// integer in the least-significant 32 bits
    I32 = 0x0003,
    /// 32-bit float bit pattern in the least-significant 32 bits
    F32 = 0x0004,

    /* 0x0005, 0x0006, 0x0007 reserved */
    /// ptr to a heap 64-bit integer cell
    I64 = 0x0008,
    /// ptr to a heap 64-bit float cell
    F64 = 0x0009,
    /// ptr to a length-prefixed null-terminated string
    ZString = 0x000a,
    /// ptr to an interned (unique'd) symbol
    Symbol = 0x000b,
    /// ptr to a 128-bit cons cell, or null representing nil
    Cons = 0x000c,

    /* 0x000d, 0x000e, 0x000f reserved */
    /// ptr to a refcounted Object
    RcObject = 0x0010,

    /// corrupt or uninitialized word; payload must never be dereferenced
    Invalid = 0xffff,
}

impl Tag {
    /// Decode a 16-bit tag field. Unknown bit patterns are [`Tag::Invalid`].
    pub const fn from_bits(bits: u16) -> Self {
        match bits {
            0x0000 => Tag::Sentinel,
            0x0001 => Tag::Boolean,
            0x0002 => Tag::Char,
            0x0003 => Tag::I32,
            0x0004 => Tag::F32,
            0x0008 => Tag::I64,
            0x0009 => Tag::F64,
            0x000a => Tag::ZString,
            0x000b => Tag::Symbol,
            0x000c => Tag::Cons,
            0x0010 => Tag::RcObject,
            _ => Tag::Invalid,
        }
    }

    /// Tags whose payload is a pointer into collector-owned storage.
    pub const fn is_pointer(self) -> bool {
        matches!(
            self,
            Tag::I64 | Tag::F64 | Tag::ZString | Tag::Symbol | Tag::Cons | Tag::RcObject
        )
    }
}

/// A schematica value.
///
/// ```text
///  <- 16 -> <---------- 48 ---------->
/// +--------+--------------------------+
/// |    tag |                  payload |
/// +--------+--------------------------+
/// ```
///
/// This is an ownership-aware handle, not a plain word: `Clone` and `Drop`
/// are the two halves of the refcount protocol for RcObject-tagged values,
/// so the type is deliberately not `Copy`. For every other tag both are
/// bitwise no-ops.
///
/// Typed accessors return the caller-supplied sentinel on a tag mismatch;
/// a mismatch is an expected outcome, not an error, and nothing here panics.
#[repr(transparent)]
#[derive(PartialEq, Eq)]
pub struct TaggedValue(u64);

const _: () = assert!(mem::size_of::<TaggedValue>() == 8);

impl TaggedValue {
    #[inline]
    const fn encode(tag: Tag, payload: u64) -> Self {
        Self(((tag as u64) << PAYLOAD_BITS) | (payload & PAYLOAD_MASK))
    }

    #[inline]
    fn encode_ptr<T>(tag: Tag, ptr: NonNull<T>) -> Self {
        let addr = ptr.as_ptr() as u64;
        debug_assert_eq!(addr & !PAYLOAD_MASK, 0, "pointer does not fit in 48 bits");
        Self::encode(tag, addr)
    }

    /// The all-zero sentinel word. Also what [`Default`] produces.
    #[inline]
    pub const fn sentinel() -> Self {
        Self(0)
    }

    /// The empty list: cons tag, null payload.
    #[inline]
    pub const fn nil() -> Self {
        Self::encode(Tag::Cons, 0)
    }

    #[inline]
    pub const fn from_bool(value: bool) -> Self {
        Self::encode(Tag::Boolean, value as u64)
    }

    /// Encode an ascii character in the low 8 bits.
    ///
    /// Non-ascii input is a precondition violation; only the low byte is
    /// stored.
    #[inline]
    pub fn from_char(value: char) -> Self {
        debug_assert!(value.is_ascii(), "char payload is 8 bits");
        Self::encode(Tag::Char, (value as u32 as u64) & 0xff)
    }

    #[inline]
    pub const fn from_i32(value: i32) -> Self {
        Self::encode(Tag::I32, value.cast_unsigned() as u64)
    }

    /// Encode a 32-bit float by bit pattern. NaN payloads round-trip
    /// bit-exactly; nothing is canonicalized.
    #[inline]
    pub const fn from_f32(value: f32) -> Self {
        Self::encode(Tag::F32, value.to_bits() as u64)
    }

    #[inline]
    pub fn from_cons(ptr: NonNull<Cons>) -> Self {
        Self::encode_ptr(Tag::Cons, ptr)
    }

    #[inline]
    pub fn from_zstring(ptr: NonNull<ZString>) -> Self {
        Self::encode_ptr(Tag::ZString, ptr)
    }

    #[inline]
    pub fn from_symbol(ptr: NonNull<Symbol>) -> Self {
        Self::encode_ptr(Tag::Symbol, ptr)
    }

    #[inline]
    pub fn from_i64_cell(ptr: NonNull<i64>) -> Self {
        Self::encode_ptr(Tag::I64, ptr)
    }

    #[inline]
    pub fn from_f64_cell(ptr: NonNull<f64>) -> Self {
        Self::encode_ptr(Tag::F64, ptr)
    }

    /// Wrap a refcounted object without incrementing its count.
    ///
    /// # Safety
    /// The pointer must be a live `Object` and the caller must transfer
    /// ownership of exactly one reference to the new value; `Drop` will
    /// release it.
    #[inline]
    pub unsafe fn from_object(ptr: NonNull<Object>) -> Self {
        Self::encode_ptr(Tag::RcObject, ptr)
    }

    /// Combine a tag with a raw 48-bit payload. The value is masked to 48
    /// bits before the tag is placed in the top 16, so garbage in the high
    /// bits can never corrupt the tag field.
    ///
    /// # Safety
    /// For pointer-carrying tags the masked value must be a valid address
    /// honoring the collector's lifetime contract; for [`Tag::RcObject`] it
    /// must additionally carry ownership of one reference.
    #[inline]
    pub unsafe fn from_raw_parts(tag: Tag, value: u64) -> Self {
        Self::encode(tag, value)
    }

    /// Reconstitute a word produced by [`TaggedValue::into_raw`].
    ///
    /// # Safety
    /// The word must have come from `into_raw` (or an equivalent encoding)
    /// and, for RcObject, ownership of the un-released reference transfers
    /// back in.
    #[inline]
    pub unsafe fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Surrender the raw word without running the drop protocol. The
    /// matching release is the caller's responsibility (usually by passing
    /// the word back through [`TaggedValue::from_raw`]).
    #[inline]
    pub fn into_raw(self) -> u64 {
        let raw = self.0;
        mem::forget(self);
        raw
    }

    /// Extract the tag from the top 16 bits. Works on any word, including
    /// the default all-zero one (sentinel) and corrupt ones (invalid).
    #[inline]
    pub const fn tag(&self) -> Tag {
        Tag::from_bits((self.0 >> PAYLOAD_BITS) as u16)
    }

    #[inline]
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// The low 48 bits, uninterpreted.
    #[inline]
    pub const fn payload(&self) -> u64 {
        self.0 & PAYLOAD_MASK
    }

    #[inline]
    pub const fn is_nil(&self) -> bool {
        matches!(self.tag(), Tag::Cons) && self.payload() == 0
    }

    #[inline]
    pub fn as_bool(&self, sentinel: bool) -> bool {
        if self.tag() == Tag::Boolean {
            self.payload() & 1 != 0
        } else {
            sentinel
        }
    }

    #[inline]
    pub fn as_char(&self, sentinel: char) -> char {
        if self.tag() == Tag::Char {
            self.payload() as u8 as char
        } else {
            sentinel
        }
    }

    #[inline]
    pub fn as_int32(&self, sentinel: i32) -> i32 {
        if self.tag() == Tag::I32 {
            (self.payload() as u32).cast_signed()
        } else {
            sentinel
        }
    }

    #[inline]
    pub fn as_float32(&self, sentinel: f32) -> f32 {
        if self.tag() == Tag::F32 {
            f32::from_bits(self.payload() as u32)
        } else {
            sentinel
        }
    }

    /// The heap cell behind an I64 word, without dereferencing it.
    #[inline]
    pub fn as_i64_cell(&self) -> Option<NonNull<i64>> {
        if self.tag() == Tag::I64 {
            NonNull::new(self.payload() as *mut i64)
        } else {
            None
        }
    }

    /// The heap cell behind an F64 word, without dereferencing it.
    #[inline]
    pub fn as_f64_cell(&self) -> Option<NonNull<f64>> {
        if self.tag() == Tag::F64 {
            NonNull::new(self.payload() as *mut f64)
        } else {
            None
        }
    }

    /// Read the heap integer cell, or the sentinel on a tag mismatch.
    ///
    /// # Safety
    /// If the tag is [`Tag::I64`] the payload must still point to a live
    /// cell (the collector's lifetime contract).
    #[inline]
    pub unsafe fn as_int64(&self, sentinel: i64) -> i64 {
        match self.as_i64_cell() {
            // SAFETY: liveness warranted by the caller
            Some(cell) => unsafe { *cell.as_ptr() },
            None => sentinel,
        }
    }

    /// Read the heap double cell, or the sentinel on a tag mismatch. The
    /// stored bit pattern is returned as-is; NaN payloads survive.
    ///
    /// # Safety
    /// If the tag is [`Tag::F64`] the payload must still point to a live
    /// cell.
    #[inline]
    pub unsafe fn as_float64(&self, sentinel: f64) -> f64 {
        match self.as_f64_cell() {
            // SAFETY: liveness warranted by the caller
            Some(cell) => unsafe { *cell.as_ptr() },
            None => sentinel,
        }
    }

    #[inline]
    pub fn as_zstring(&self) -> Option<NonNull<ZString>> {
        if self.tag() == Tag::ZString {
            NonNull::new(self.payload() as *mut ZString)
        } else {
            None
        }
    }

    #[inline]
    pub fn as_symbol(&self) -> Option<NonNull<Symbol>> {
        if self.tag() == Tag::Symbol {
            NonNull::new(self.payload() as *mut Symbol)
        } else {
            None
        }
    }

    /// The cons cell, or `None` for a mismatched tag or nil.
    #[inline]
    pub fn as_cons(&self) -> Option<NonNull<Cons>> {
        if self.tag() == Tag::Cons {
            NonNull::new(self.payload() as *mut Cons)
        } else {
            None
        }
    }

    #[inline]
    pub fn as_object(&self) -> Option<NonNull<Object>> {
        if self.tag() == Tag::RcObject {
            NonNull::new(self.payload() as *mut Object)
        } else {
            None
        }
    }
}

impl Default for TaggedValue {
    fn default() -> Self {
        Self::sentinel()
    }
}

impl Clone for TaggedValue {
    fn clone(&self) -> Self {
        // most tags embed an immediate or a passive garbage-collected
        // pointer; only RcObject needs its count bumped, and it must be
        // bumped before the copy is observable
        if let Some(obj) = self.as_object() {
            // SAFETY: a live RcObject word owns a reference, so the object
            // is still alive
            unsafe { object::add_ref(obj) };
        }
        Self(self.0)
    }
}

impl Drop for TaggedValue {
    fn drop(&mut self) {
        if let Some(obj) = self.as_object() {
            // SAFETY: this word owns one reference; release it exactly once
            unsafe { object::release(obj) };
        }
    }
}

impl fmt::Debug for TaggedValue {
    /// Never dereferences the payload; corrupt words print as raw bits.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag() {
            Tag::Sentinel => write!(f, "Sentinel"),
            Tag::Boolean => write!(f, "Boolean({})", self.payload() & 1 != 0),
            Tag::Char => write!(f, "Char({:?})", self.payload() as u8 as char),
            Tag::I32 => write!(f, "I32({})", (self.payload() as u32).cast_signed()),
            Tag::F32 => write!(f, "F32({})", f32::from_bits(self.payload() as u32)),
            Tag::Cons if self.payload() == 0 => write!(f, "Nil"),
            tag => write!(f, "{:?}(0x{:012x})", tag, self.payload()),
        }
    }
}
