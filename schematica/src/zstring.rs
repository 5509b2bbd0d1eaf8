//! ZString: a length-prefixed, null-terminated byte buffer. The payload is
//! appended directly after the fixed header in a single allocation, so the
//! whole string is one collector-owned block.
use std::alloc::Layout;
use std::{mem, slice, str};

/// Length-prefixed string. `len` excludes the forced trailing NUL, which is
/// always present so the data can be handed to null-terminated consumers.
#[repr(C)]
#[derive(Debug)]
pub struct ZString {
    len: i32,
    data: [u8; 0],
}

impl ZString {
    /// Layout of the single block holding header, payload and terminator.
    pub fn required_layout(len: usize) -> Layout {
        // need to count the trailing \0
        let size = mem::size_of::<Self>() + len + 1;
        Layout::from_size_align(size, mem::align_of::<Self>())
            .expect("zstring allocation size overflows")
    }

    /// Total storage this string occupies: header + len + terminator.
    pub fn alloc_size(&self) -> usize {
        mem::size_of::<Self>() + self.len() + 1
    }

    /// Write the length prefix, the payload bytes and the terminator.
    ///
    /// # Safety
    /// `self` must sit at the start of a block of at least
    /// `required_layout(bytes.len())` bytes, and `bytes.len()` must fit in
    /// an `i32`.
    pub unsafe fn init(&mut self, bytes: &[u8]) {
        debug_assert!(bytes.len() <= i32::MAX as usize);
        self.len = bytes.len() as i32;
        // SAFETY: the block extends len + 1 bytes past the header
        unsafe {
            let dst = self.data.as_mut_ptr();
            dst.copy_from_nonoverlapping(bytes.as_ptr(), bytes.len());
            *dst.add(bytes.len()) = 0;
        }
    }

    /// Number of payload bytes, not counting the trailing NUL.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The payload bytes, without the terminator.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: init wrote len bytes after the header
        unsafe { slice::from_raw_parts(self.data.as_ptr(), self.len()) }
    }

    /// The payload bytes including the terminator, for C-string interop.
    #[inline]
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        // SAFETY: init wrote len bytes plus the terminator
        unsafe { slice::from_raw_parts(self.data.as_ptr(), self.len() + 1) }
    }

    #[inline]
    pub fn as_utf8(&self) -> Result<&str, str::Utf8Error> {
        str::from_utf8(self.as_bytes())
    }
}

#[cfg(test)]
mod zstring_tests {
    use super::*;
    use crate::{Allocator, RustAllocator};

    #[test]
    fn required_layout_counts_header_payload_and_terminator() {
        let layout = ZString::required_layout(5);
        assert_eq!(layout.size(), mem::size_of::<ZString>() + 5 + 1);
        assert_eq!(layout.align(), mem::align_of::<ZString>());
    }

    #[test]
    fn init_writes_exactly_len_bytes_then_the_terminator() {
        let mut alloc = RustAllocator::new();
        let zstr = alloc.allocate_zstring(b"hello");
        // SAFETY: freshly allocated, nothing else aliases it
        let zstr = unsafe { zstr.as_ref() };

        assert_eq!(zstr.len(), 5);
        assert_eq!(zstr.as_bytes(), b"hello");
        assert_eq!(zstr.as_bytes_with_nul(), b"hello\0");
        assert_eq!(zstr.alloc_size(), mem::size_of::<ZString>() + 6);
    }

    #[test]
    fn empty_string_still_carries_the_terminator() {
        let mut alloc = RustAllocator::new();
        let zstr = alloc.allocate_zstring(b"");
        // SAFETY: freshly allocated
        let zstr = unsafe { zstr.as_ref() };

        assert!(zstr.is_empty());
        assert_eq!(zstr.as_bytes(), b"");
        assert_eq!(zstr.as_bytes_with_nul(), b"\0");
    }

    #[test]
    fn utf8_view_roundtrips_and_rejects_invalid_bytes() {
        let mut alloc = RustAllocator::new();
        let ok = alloc.allocate_zstring("grün".as_bytes());
        // SAFETY: freshly allocated
        assert_eq!(unsafe { ok.as_ref() }.as_utf8(), Ok("grün"));

        let bad = alloc.allocate_zstring(&[0x66, 0xff, 0x66]);
        // SAFETY: freshly allocated
        assert!(unsafe { bad.as_ref() }.as_utf8().is_err());
    }

    #[test]
    fn interior_bytes_may_be_anything_including_nul() {
        let mut alloc = RustAllocator::new();
        let zstr = alloc.allocate_zstring(b"a\0b");
        // SAFETY: freshly allocated
        let zstr = unsafe { zstr.as_ref() };
        assert_eq!(zstr.len(), 3);
        assert_eq!(zstr.as_bytes(), b"a\0b");
    }
}
