// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use itertools::Itertools;
use smallvec::SmallVec;

/// Most per-element adjacency lists (polygon corners, vertex fans) fit in
/// four slots, so they live on the stack.
pub type SVec<T> = SmallVec<[T; 4]>;

pub trait IteratorUtils: Iterator {
    fn collect_svec(self) -> SVec<Self::Item>
    where
        Self: Sized,
    {
        self.collect()
    }
}

impl<T: ?Sized> IteratorUtils for T where T: Iterator {}

/// Yields the `len` elements of `it` starting at `shift`, then wraps around
/// to the ones that were skipped.
pub fn rotate_iter<T>(
    it: impl Iterator<Item = T> + Clone,
    shift: usize,
    len: usize,
) -> impl Iterator<Item = T> {
    it.cycle().dropping(shift).take(len)
}

pub trait SliceUtils<T> {
    /// Shorthand for `.iter().copied()`
    fn iter_cpy(&self) -> std::iter::Copied<std::slice::Iter<'_, T>>;
}

impl<T: Copy> SliceUtils<T> for [T] {
    fn iter_cpy(&self) -> std::iter::Copied<std::slice::Iter<'_, T>> {
        self.iter().copied()
    }
}

/// Reinterprets a vector of `T`s as a vector of `U`s without copying.
///
/// # Safety
/// `T` and `U` must have the same size and alignment, and every `T` must be
/// a valid `U`.
pub unsafe fn transmute_vec<T, U>(v: Vec<T>) -> Vec<U> {
    let mut v = std::mem::ManuallyDrop::new(v);
    Vec::from_raw_parts(v.as_mut_ptr() as *mut U, v.len(), v.capacity())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    pub fn rotate() {
        let fan = [10, 11, 12, 13, 14];
        assert_eq!(
            rotate_iter(fan.iter_cpy(), 3, fan.len()).collect_svec().as_slice(),
            &[13, 14, 10, 11, 12]
        );
        assert_eq!(
            rotate_iter(fan.iter_cpy(), 0, fan.len()).collect_vec(),
            fan.to_vec()
        );
    }

    #[test]
    pub fn transmute_same_layout() {
        let v = vec![1u32, 2, 3];
        let w = unsafe { transmute_vec::<u32, i32>(v) };
        assert_eq!(w, vec![1, 2, 3]);
    }
}
