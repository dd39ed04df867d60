use std::collections::VecDeque;
use std::ops::{Add, Index, IndexMut, Mul};

/// Fixed-capacity window where index 0 is the oldest element. Pushing into a
/// full buffer evicts the oldest.
#[derive(Clone, Debug)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Create an empty buffer holding at most `capacity` elements.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `value` as the newest element, returning the evicted oldest
    /// element if the buffer was full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.is_full() {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(value);
        evicted
    }

    /// Append a new newest element built by `make`. When the buffer is full,
    /// the evicted oldest element is handed to `make` so its allocation can be
    /// reused for the new value.
    pub fn advance_with<F>(&mut self, make: F) -> &mut T
    where
        F: FnOnce(Option<T>) -> T,
    {
        let evicted = if self.is_full() {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(make(evicted));
        let newest = self.items.len() - 1;
        &mut self.items[newest]
    }

    /// Remove and return the oldest element.
    pub fn pop_oldest(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Discard the `n` oldest elements without releasing backing storage.
    pub fn skip(&mut self, n: usize) {
        assert!(n <= self.len(), "cannot skip {n} of {} elements", self.len());
        self.items.drain(..n);
    }

    /// Discard the `n` oldest elements and compact the backing storage.
    /// `trim(0)` only re-aligns the storage.
    pub fn trim(&mut self, n: usize) {
        assert!(n <= self.len(), "cannot trim {n} of {} elements", self.len());
        let mut compact = VecDeque::with_capacity(self.capacity);
        compact.extend(self.items.drain(n..));
        self.items = compact;
    }

    /// Change the capacity. Shrinking below the current length keeps only the
    /// newest `capacity` elements.
    pub fn resize(&mut self, capacity: usize) {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");
        if capacity == self.capacity {
            return;
        }

        self.capacity = capacity;
        let excess = self.len().saturating_sub(capacity);
        self.trim(excess);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn at(&self, index: usize) -> &T {
        assert!(
            index < self.len(),
            "index {index} out of range for ring buffer of length {}",
            self.len()
        );
        &self.items[index]
    }

    pub fn at_mut(&mut self, index: usize) -> &mut T {
        assert!(
            index < self.len(),
            "index {index} out of range for ring buffer of length {}",
            self.len()
        );
        &mut self.items[index]
    }

    /// Element `offset` positions after the oldest.
    pub fn oldest(&self, offset: usize) -> &T {
        self.at(offset)
    }

    /// Element `offset` positions before the newest (`offset <= 0`).
    pub fn newest(&self, offset: isize) -> &T {
        assert!(offset <= 0, "newest offset must not be positive");
        self.at(self.logical_index(self.len() as isize - 1 + offset))
    }

    /// Element `offset` positions from the centre. For even lengths the centre
    /// is the lower median element.
    pub fn centre(&self, offset: isize) -> &T {
        self.at(self.logical_index(self.centre_index() as isize + offset))
    }

    /// Logical index of the centre element.
    pub fn centre_index(&self) -> usize {
        assert!(!self.is_empty(), "empty ring buffer has no centre");
        (self.len() - 1) / 2
    }

    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::collections::vec_deque::IterMut<'_, T> {
        self.items.iter_mut()
    }

    fn logical_index(&self, index: isize) -> usize {
        assert!(
            index >= 0 && (index as usize) < self.len(),
            "index {index} out of range for ring buffer of length {}",
            self.len()
        );
        index as usize
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Weighted sum of the elements around `index`, with the kernel's centre
    /// element aligned to `index`. Kernel elements that would fall outside the
    /// data window are dropped rather than zero padded.
    pub fn convolve_at<K>(&self, kernel: &RingBuffer<K>, index: usize) -> T
    where
        K: Copy,
        T: Mul<K, Output = T> + Add<Output = T>,
    {
        assert!(!kernel.is_empty(), "convolution kernel must not be empty");
        assert!(
            kernel.len() <= self.len(),
            "kernel of length {} exceeds data of length {}",
            kernel.len(),
            self.len()
        );
        assert!(index < self.len(), "convolution index {index} out of range");

        let centre = kernel.centre_index();
        let mut acc = self.items[index].clone() * kernel[centre];

        for (k, &weight) in kernel.iter().enumerate() {
            if k == centre {
                continue;
            }
            let j = index as isize + k as isize - centre as isize;
            if j < 0 || j >= self.len() as isize {
                continue;
            }
            acc = acc + self.items[j as usize].clone() * weight;
        }

        acc
    }

    /// Convolve every element with `kernel`, producing a buffer of the same
    /// capacity.
    pub fn convolve<K>(&self, kernel: &RingBuffer<K>) -> RingBuffer<T>
    where
        K: Copy,
        T: Mul<K, Output = T> + Add<Output = T>,
    {
        let mut result = RingBuffer::new(self.capacity);
        for i in 0..self.len() {
            result.push(self.convolve_at(kernel, i));
        }
        result
    }
}

impl<T> Index<usize> for RingBuffer<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        self.at(index)
    }
}

impl<T> IndexMut<usize> for RingBuffer<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        self.at_mut(index)
    }
}

impl<'a, T> IntoIterator for &'a RingBuffer<T> {
    type Item = &'a T;
    type IntoIter = std::collections::vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> Extend<T> for RingBuffer<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}
