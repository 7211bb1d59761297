//! Definition of the fixed capacity storage window backing a tail buffer.

use std::ops::Deref;

/// A fixed capacity container holding one contiguous run of appended items.
///
/// Items are written strictly front to back, one per append, so a window is
/// always a filled prefix followed by unused capacity. There is no per-slot
/// occupancy tracking; the filled length is the only state.
///
/// * Does not support growth, i.e, cannot be resized to increase capacity.
/// * Once a window is rotated out of the write path it is never written again.
#[derive(Debug)]
pub(crate) struct Window<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> Window<T> {
    /// Create a new empty window.
    ///
    /// All required memory is allocated during initialization. It is
    /// guaranteed that no allocations happen after initialization.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of items this window can accommodate.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Number of items currently held in this window.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    /// Maximum number of items this window can hold.
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// true if every slot in this window has been written, false otherwise.
    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    /// Append an item into the next unused slot.
    ///
    /// # Invariants
    ///
    /// * self.is_full() must be false.
    ///
    /// # Arguments
    ///
    /// * `item` - Item to append.
    #[inline]
    pub(crate) fn push(&mut self, item: T) {
        debug_assert!(!self.is_full(), "Window is at capacity");
        self.items.push(item);
    }
}

impl<T> Deref for Window<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPACITY: usize = 16;

    #[test]
    fn fill_to_capacity() {
        let mut window = Window::new(CAPACITY);
        assert_eq!(window.capacity(), CAPACITY);
        assert_eq!(window.len(), 0);
        assert!(!window.is_full());

        for i in 0..CAPACITY as u64 {
            window.push(i);
            assert_eq!(window.len(), i as usize + 1);
        }

        assert!(window.is_full());
        let expected: Vec<_> = (0..CAPACITY as u64).collect();
        assert_eq!(&*window, &expected);
    }

    #[test]
    fn slices_track_filled_prefix() {
        let mut window = Window::new(CAPACITY);
        window.push(7u64);
        window.push(8u64);

        assert_eq!(&window[..], &[7, 8]);
        assert_eq!(&window[1..], &[8]);
    }
}
