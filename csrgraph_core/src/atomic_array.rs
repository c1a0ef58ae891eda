use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed-length array of counters that many threads may bump at once.
///
/// The degree counter and the scatter cursor table are both instances of
/// this type. All mutation goes through [`AtomicArray::fetch_add`]; reads of
/// the final values happen after the parallel region has joined.
#[derive(Debug)]
pub struct AtomicArray {
    cells: Box<[AtomicUsize]>,
}

impl AtomicArray {
    pub fn zeroed(len: usize) -> Self {
        Self {
            cells: (0..len).map(|_| AtomicUsize::new(0)).collect(),
        }
    }

    pub fn from_vec(values: Vec<usize>) -> Self {
        Self {
            cells: values.into_iter().map(AtomicUsize::new).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Adds `n` to slot `i` and returns the value it held before.
    ///
    /// Relaxed ordering is enough: only the commutative sum matters, and the
    /// fork-join barrier publishes the results.
    #[inline]
    pub fn fetch_add(&self, i: usize, n: usize) -> usize {
        self.cells[i].fetch_add(n, Ordering::Relaxed)
    }

    #[inline]
    pub fn load(&self, i: usize) -> usize {
        self.cells[i].load(Ordering::Relaxed)
    }

    pub fn into_vec(self) -> Vec<usize> {
        self.cells
            .into_vec()
            .into_iter()
            .map(AtomicUsize::into_inner)
            .collect()
    }
}
