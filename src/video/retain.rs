//! Keeping caller pixel memory alive.
//!
//! A surface built with
//! [`Context::create_rgb_surface_from`](crate::Context::create_rgb_surface_from)
//! draws straight into memory the caller supplied. The surface takes that
//! memory over as a [`RetainedBuffer`] and drops it only when the surface
//! is freed.

use std::any::{type_name, Any};
use std::fmt;

use crate::error::{Error, Result};

/// Caller memory given by address and length.
///
/// Use this for memory the crate cannot own: a mapped framebuffer, an
/// arena, a buffer owned by another library.
#[derive(Debug)]
pub struct RawBuffer {
    ptr: *mut u8,
    len: usize,
}

// The creator of a RawBuffer vouches for the memory; see `RawBuffer::new`.
unsafe impl Send for RawBuffer {}
unsafe impl Sync for RawBuffer {}

impl RawBuffer {
    /// # Safety
    /// `ptr` must be valid for reads and writes of `len` bytes, and stay
    /// valid until the surface built over it is freed.
    pub unsafe fn new(ptr: *mut u8, len: usize) -> Self {
        Self { ptr, len }
    }
}

/// Pixel memory owned by a surface.
pub struct RetainedBuffer {
    owner: Box<dyn Any + Send + Sync>,
    ptr: *mut u8,
    len: usize,
}

unsafe impl Send for RetainedBuffer {}
unsafe impl Sync for RetainedBuffer {}

impl fmt::Debug for RetainedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetainedBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

macro_rules! try_shape {
    ($owner:ident, $($ty:ty),+) => {
        $(
            if let Some(buf) = $owner.downcast_mut::<$ty>() {
                let len = std::mem::size_of_val(&buf[..]);
                let ptr = buf.as_mut_ptr() as *mut u8;
                return Ok(Self { $owner, ptr, len });
            }
        )+
    };
}

impl RetainedBuffer {
    /// Take ownership of `pixels`.
    ///
    /// Accepted shapes are `Vec<T>` and `Box<[T]>` for `T` in `u8`, `u16`,
    /// `u32`, plus [`RawBuffer`]. Anything else fails with
    /// [`Error::UnsupportedBufferShape`] naming the type.
    pub fn new<B: Any + Send + Sync>(pixels: B) -> Result<Self> {
        let mut owner: Box<dyn Any + Send + Sync> = Box::new(pixels);
        if let Some(raw) = owner.downcast_ref::<RawBuffer>() {
            let (ptr, len) = (raw.ptr, raw.len);
            return Ok(Self { owner, ptr, len });
        }
        try_shape!(owner, Vec<u8>, Vec<u16>, Vec<u32>, Box<[u8]>, Box<[u16]>, Box<[u32]>);
        Err(Error::UnsupportedBufferShape {
            shape: type_name::<B>().to_string(),
        })
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Fail with [`Error::BufferTooSmall`] unless `needed` bytes are present.
    pub fn require(&self, needed: usize) -> Result<()> {
        if self.len < needed {
            return Err(Error::BufferTooSmall {
                needed,
                actual: self.len,
            });
        }
        Ok(())
    }

    /// Give the memory back to the caller, if it was a buffer of type `B`.
    pub fn into_inner<B: Any>(self) -> Option<B> {
        self.owner.downcast::<B>().ok().map(|b| *b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_vec_u8() {
        let mut buf = RetainedBuffer::new(vec![7u8; 16]).unwrap();
        assert_eq!(buf.len(), 16);
        assert_eq!(unsafe { *buf.as_mut_ptr() }, 7);
    }

    #[test]
    fn test_wide_elements_report_bytes() {
        assert_eq!(RetainedBuffer::new(vec![0u32; 10]).unwrap().len(), 40);
        assert_eq!(RetainedBuffer::new(vec![0u16; 10].into_boxed_slice()).unwrap().len(), 20);
    }

    #[test]
    fn test_pointer_is_stable_after_move() {
        let data = vec![1u8, 2, 3, 4];
        let ptr = data.as_ptr();
        let mut buf = RetainedBuffer::new(data).unwrap();
        assert_eq!(buf.as_mut_ptr() as *const u8, ptr);
    }

    #[test]
    fn test_raw_buffer() {
        let mut backing = [0u8; 8];
        let raw = unsafe { RawBuffer::new(backing.as_mut_ptr(), backing.len()) };
        let mut buf = RetainedBuffer::new(raw).unwrap();
        assert_eq!(buf.len(), 8);
        assert_eq!(buf.as_mut_ptr(), backing.as_mut_ptr());
    }

    #[rstest]
    #[case::string(RetainedBuffer::new(String::from("pixels")), "String")]
    #[case::float_vec(RetainedBuffer::new(vec![0.0f32; 4]), "Vec<f32>")]
    #[case::array(RetainedBuffer::new([0u8; 4]), "[u8; 4]")]
    fn test_unsupported_shapes(#[case] result: Result<RetainedBuffer>, #[case] expected: &str) {
        match result {
            Err(Error::UnsupportedBufferShape { shape }) => assert!(shape.contains(expected), "{shape}"),
            other => panic!("expected UnsupportedBufferShape, got {:?}", other),
        }
    }

    #[test]
    fn test_require() {
        let buf = RetainedBuffer::new(vec![0u8; 10]).unwrap();
        assert!(buf.require(10).is_ok());
        assert_eq!(
            buf.require(11),
            Err(Error::BufferTooSmall { needed: 11, actual: 10 })
        );
    }

    #[test]
    fn test_into_inner() {
        let buf = RetainedBuffer::new(vec![5u16; 3]).unwrap();
        assert_eq!(buf.into_inner::<Vec<u16>>(), Some(vec![5u16; 3]));
    }
}
