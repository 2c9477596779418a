//! OrderedBuffer - growable ring buffer backing the parser and evaluator stacks
//!
//! Both ends support O(1) amortized push and pop, so the same type serves as a
//! stack (operator stack, value stack) and as a queue (parser output, pending
//! tokens). Capacity is always a power of two so wrap-around is a mask.
//!
//! Not thread-safe: one owner at a time, callers serialize access.

use std::fmt;
use std::iter::FusedIterator;
use std::ops::{Index, IndexMut};

/// Smallest capacity ever allocated
pub const MIN_CAPACITY: usize = 8;

/// Double-ended growable sequence over a circular slot array
///
/// `head == tail` means either "empty" or "completely full"; the `full` flag
/// tells the two apart. Growth doubles the capacity and linearizes the live
/// elements so logical index 0 lands on slot 0.
pub struct OrderedBuffer<T> {
    slots: Vec<Option<T>>,
    /// Slot of the oldest element
    head: usize,
    /// Slot one past the newest element
    tail: usize,
    full: bool,
}

impl<T> Default for OrderedBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OrderedBuffer<T> {
    pub fn new() -> Self {
        Self::with_capacity(MIN_CAPACITY)
    }

    /// Create a buffer able to hold `capacity` elements before growing
    ///
    /// The requested capacity is rounded up to a power of two, never below
    /// [`MIN_CAPACITY`].
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_CAPACITY).next_power_of_two();
        Self {
            slots: empty_slots(capacity),
            head: 0,
            tail: 0,
            full: false,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn mask(&self) -> usize {
        self.slots.len() - 1
    }

    #[inline]
    pub fn len(&self) -> usize {
        if self.full {
            self.capacity()
        } else {
            self.tail.wrapping_sub(self.head) & self.mask()
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.full && self.head == self.tail
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Append to the tail (newest end)
    pub fn push_back(&mut self, value: T) {
        if self.full {
            self.grow();
        }
        self.slots[self.tail] = Some(value);
        self.tail = (self.tail + 1) & self.mask();
        self.full = self.tail == self.head;
    }

    /// Prepend at the head (oldest end)
    pub fn push_front(&mut self, value: T) {
        if self.full {
            self.grow();
        }
        self.head = (self.head + self.capacity() - 1) & self.mask();
        self.slots[self.head] = Some(value);
        self.full = self.tail == self.head;
    }

    /// Append every element of `values` to the tail, in iteration order
    pub fn append<I: IntoIterator<Item = T>>(&mut self, values: I) {
        for value in values {
            self.push_back(value);
        }
    }

    /// Remove the newest element
    pub fn pop_back(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        self.tail = (self.tail + self.capacity() - 1) & self.mask();
        self.full = false;
        self.slots[self.tail].take()
    }

    /// Remove the oldest element
    pub fn pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let value = self.slots[self.head].take();
        self.head = (self.head + 1) & self.mask();
        self.full = false;
        value
    }

    /// Remove the newest `n` elements (fewer if the buffer is shorter)
    ///
    /// The returned iterator yields them oldest first, i.e. in the order they
    /// were pushed. Elements the iterator does not consume stay in their
    /// slots until overwritten or released.
    pub fn pop_back_n(&mut self, n: usize) -> Drain<'_, T> {
        let n = n.min(self.len());
        let start = (self.tail + self.capacity() - n) & self.mask();
        if n > 0 {
            self.tail = start;
            self.full = false;
        }
        Drain {
            mask: self.mask(),
            slots: &mut self.slots,
            position: start,
            remaining: n,
        }
    }

    /// Remove the oldest `n` elements (fewer if the buffer is shorter),
    /// yielded oldest first
    pub fn pop_front_n(&mut self, n: usize) -> Drain<'_, T> {
        let n = n.min(self.len());
        let start = self.head;
        if n > 0 {
            self.head = (self.head + n) & self.mask();
            self.full = false;
        }
        Drain {
            mask: self.mask(),
            slots: &mut self.slots,
            position: start,
            remaining: n,
        }
    }

    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    pub fn back(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|last| self.get(last))
    }

    pub fn back_mut(&mut self) -> Option<&mut T> {
        let last = self.len().checked_sub(1)?;
        self.get_mut(last)
    }

    /// Element at logical position `index` (0 = oldest)
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len() {
            return None;
        }
        self.slots[(self.head + index) & self.mask()].as_ref()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.len() {
            return None;
        }
        let slot = (self.head + index) & self.mask();
        self.slots[slot].as_mut()
    }

    /// Forget every element in O(1)
    ///
    /// Slots are not dropped; stale values are overwritten by later pushes.
    /// Use [`clear_and_release`](Self::clear_and_release) to drop them now.
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.full = false;
    }

    /// Forget every element and drop whatever the slots still hold
    pub fn clear_and_release(&mut self) {
        self.clear();
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            buffer: self,
            index: 0,
        }
    }

    /// Consume the buffer into a vector ordered oldest to newest
    pub fn into_vec(mut self) -> Vec<T> {
        let len = self.len();
        self.pop_front_n(len).collect()
    }

    /// Double the capacity, moving live elements to slots `0..len`
    fn grow(&mut self) {
        let len = self.len();
        let mask = self.mask();
        let mut slots = empty_slots(self.capacity() * 2);
        for (index, slot) in slots.iter_mut().enumerate().take(len) {
            *slot = self.slots[(self.head + index) & mask].take();
        }
        self.slots = slots;
        self.head = 0;
        self.tail = len;
        self.full = false;
    }
}

fn empty_slots<T>(capacity: usize) -> Vec<Option<T>> {
    std::iter::repeat_with(|| None).take(capacity).collect()
}

impl<T> Index<usize> for OrderedBuffer<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(value) => value,
            None => panic!(
                "index {} out of bounds for OrderedBuffer of length {}",
                index,
                self.len()
            ),
        }
    }
}

impl<T> IndexMut<usize> for OrderedBuffer<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        let len = self.len();
        match self.get_mut(index) {
            Some(value) => value,
            None => panic!(
                "index {} out of bounds for OrderedBuffer of length {}",
                index, len
            ),
        }
    }
}

impl<T> Extend<T> for OrderedBuffer<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.append(iter);
    }
}

impl<T> FromIterator<T> for OrderedBuffer<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut buffer = Self::with_capacity(iter.size_hint().0);
        buffer.append(iter);
        buffer
    }
}

impl<T: fmt::Debug> fmt::Debug for OrderedBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Iterator over removed elements, see [`OrderedBuffer::pop_back_n`]
pub struct Drain<'a, T> {
    slots: &'a mut [Option<T>],
    mask: usize,
    position: usize,
    remaining: usize,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.slots[self.position].take();
        self.position = (self.position + 1) & self.mask;
        self.remaining -= 1;
        value
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Drain<'_, T> {}
impl<T> FusedIterator for Drain<'_, T> {}

/// Borrowing iterator, oldest to newest
pub struct Iter<'a, T> {
    buffer: &'a OrderedBuffer<T>,
    index: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let value = self.buffer.get(self.index)?;
        self.index += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.buffer.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl<'a, T> IntoIterator for &'a OrderedBuffer<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_capacity_is_power_of_two() {
        assert_eq!(OrderedBuffer::<u8>::new().capacity(), MIN_CAPACITY);
        assert_eq!(OrderedBuffer::<u8>::with_capacity(0).capacity(), MIN_CAPACITY);
        assert_eq!(OrderedBuffer::<u8>::with_capacity(9).capacity(), 16);
        assert_eq!(OrderedBuffer::<u8>::with_capacity(64).capacity(), 64);
    }

    #[test]
    fn test_stack_order() {
        let mut buffer = OrderedBuffer::new();
        for i in 0..20 {
            buffer.push_back(i);
        }
        let popped: Vec<_> = std::iter::from_fn(|| buffer.pop_back()).collect();
        assert_eq!(popped, (0..20).rev().collect::<Vec<_>>());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_queue_order() {
        let mut buffer = OrderedBuffer::new();
        for i in 0..20 {
            buffer.push_back(i);
        }
        let dequeued: Vec<_> = std::iter::from_fn(|| buffer.pop_front()).collect();
        assert_eq!(dequeued, (0..20).collect::<Vec<_>>());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_full_and_empty_after_wraparound() {
        let mut buffer = OrderedBuffer::with_capacity(8);
        // Move head/tail off slot 0 so the next fill wraps
        for i in 0..5 {
            buffer.push_back(i);
        }
        for _ in 0..5 {
            buffer.pop_front();
        }
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());

        for i in 0..8 {
            buffer.push_back(i);
        }
        assert_eq!(buffer.capacity(), 8);
        assert!(buffer.is_full());
        assert!(!buffer.is_empty());
        assert_eq!(buffer.len(), 8);
        assert_eq!(buffer.front(), Some(&0));
        assert_eq!(buffer.back(), Some(&7));

        for i in 0..8 {
            assert_eq!(buffer.pop_front(), Some(i));
        }
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());
        assert_eq!(buffer.pop_front(), None);
        assert_eq!(buffer.pop_back(), None);
    }

    #[test]
    fn test_growth_linearizes_wrapped_elements() {
        let mut buffer = OrderedBuffer::with_capacity(8);
        for i in 0..6 {
            buffer.push_back(i);
        }
        for _ in 0..4 {
            buffer.pop_front();
        }
        // [4, 5] live at slots 4..6, fill past the end and force growth
        for i in 6..20 {
            buffer.push_back(i);
        }
        assert_eq!(buffer.capacity(), 16);
        assert_eq!(buffer.len(), 16);
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), (4..20).collect::<Vec<_>>());
        assert_eq!(buffer[0], 4);
        assert_eq!(buffer[15], 19);
    }

    #[test]
    fn test_push_front() {
        let mut buffer = OrderedBuffer::new();
        buffer.push_back(2);
        buffer.push_front(1);
        buffer.push_front(0);
        buffer.push_back(3);
        assert_eq!(buffer.into_vec(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_push_front_grows() {
        let mut buffer = OrderedBuffer::with_capacity(8);
        for i in (0..12).rev() {
            buffer.push_front(i);
        }
        assert_eq!(buffer.len(), 12);
        assert_eq!(buffer.into_vec(), (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn test_pop_back_n_yields_insertion_order() {
        let mut buffer: OrderedBuffer<i32> = (0..10).collect();
        let tail: Vec<_> = buffer.pop_back_n(3).collect();
        assert_eq!(tail, vec![7, 8, 9]);
        assert_eq!(buffer.len(), 7);
        assert_eq!(buffer.back(), Some(&6));

        // Asking for more than available drains everything
        let rest: Vec<_> = buffer.pop_back_n(100).collect();
        assert_eq!(rest, (0..7).collect::<Vec<_>>());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_pop_front_n_across_wrap() {
        let mut buffer = OrderedBuffer::with_capacity(8);
        for i in 0..6 {
            buffer.push_back(i);
        }
        for _ in 0..6 {
            buffer.pop_front();
        }
        for i in 0..8 {
            buffer.push_back(i);
        }
        let head: Vec<_> = buffer.pop_front_n(5).collect();
        assert_eq!(head, vec![0, 1, 2, 3, 4]);
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![5, 6, 7]);
    }

    #[test]
    fn test_pop_zero_keeps_full_flag() {
        let mut buffer: OrderedBuffer<i32> = OrderedBuffer::with_capacity(8);
        buffer.append(0..8);
        assert!(buffer.is_full());
        assert_eq!(buffer.pop_back_n(0).count(), 0);
        assert!(buffer.is_full());
        assert_eq!(buffer.len(), 8);
    }

    #[test]
    fn test_clear_and_release() {
        let mut buffer: OrderedBuffer<String> =
            ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        buffer.clear();
        assert!(buffer.is_empty());
        buffer.push_back("d".to_string());
        assert_eq!(buffer.front().map(String::as_str), Some("d"));

        buffer.clear_and_release();
        assert!(buffer.is_empty());
        assert!(buffer.slots.iter().all(Option::is_none));
    }

    #[test]
    fn test_index_mut_and_back_mut() {
        let mut buffer: OrderedBuffer<i32> = (1..=3).collect();
        buffer[0] = 10;
        if let Some(last) = buffer.back_mut() {
            *last = 30;
        }
        assert_eq!(format!("{:?}", buffer), "[10, 2, 30]");
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_index_out_of_bounds_panics() {
        let buffer: OrderedBuffer<i32> = (0..3).collect();
        let _ = buffer[3];
    }
}
