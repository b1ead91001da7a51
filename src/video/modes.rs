//! Display mode lists.
//!
//! The library answers a mode query with one of three shapes: a null
//! pointer (nothing fits), the all-ones pointer (any size fits), or a
//! null-terminated array of pointers to rects. [`ModeList`] keeps the first
//! two apart.

use crate::ffi::RawRect;

use super::Rect;

/// Result of [`Context::list_modes`](crate::Context::list_modes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeList {
    /// Any width and height is acceptable for the format.
    Any,
    /// Exactly these modes, in the order the library reported them.
    /// Empty when no mode is available.
    Modes(Vec<Rect>),
}

impl ModeList {
    pub fn is_any(&self) -> bool {
        matches!(self, ModeList::Any)
    }

    /// The listed modes; `None` for [`ModeList::Any`].
    pub fn modes(&self) -> Option<&[Rect]> {
        match self {
            ModeList::Any => None,
            ModeList::Modes(modes) => Some(modes),
        }
    }
}

/// Pointer value the library uses for "any mode" (`(SDL_Rect **)-1`).
pub(crate) fn is_any_sentinel<T>(list: *const T) -> bool {
    list as usize == usize::MAX
}

/// Copy out the records of a null-terminated pointer array.
///
/// # Safety
/// `list` must be null or point to an array of valid `*const T` entries
/// ending with a null entry. It must not be the all-ones sentinel.
pub(crate) unsafe fn decode_null_terminated<T: Copy>(list: *const *const T) -> Vec<T> {
    if list.is_null() {
        return Vec::new();
    }
    let mut count = 0;
    while !(*list.add(count)).is_null() {
        count += 1;
    }
    std::slice::from_raw_parts(list, count)
        .iter()
        .map(|&entry| *entry)
        .collect()
}

/// Decode a `list_modes` answer.
///
/// # Safety
/// `list` must be null, the all-ones sentinel, or a live null-terminated
/// array of rect pointers.
pub(crate) unsafe fn decode_mode_list(list: *mut *mut RawRect) -> ModeList {
    if is_any_sentinel(list) {
        return ModeList::Any;
    }
    let rects = decode_null_terminated(list as *const *const RawRect);
    ModeList::Modes(rects.into_iter().map(Rect::from).collect())
}
