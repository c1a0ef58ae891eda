//! Chunked append-only container that many producers can fill at once.
//!
//! Producers build a local `Vec` and hand it over whole with
//! [`Bucket::bulk_absorb`], which costs one short critical section per call
//! no matter how long the vector is. Consumers read a single flattened view
//! spanning every chunk in insertion order.
//!
//! Reading requires `&mut Bucket`, so no append can race with a reader.
//! Reading also seals the bucket: later appends fail with
//! [`GraphError::BucketSealed`] until [`Bucket::clear`] is called.

use parking_lot::Mutex;
use rayon::prelude::*;

use crate::error::GraphError;

#[derive(Debug)]
struct Chunks<T> {
    chunks: Vec<Vec<T>>,
    num_elements: usize,
    sealed: bool,
}

impl<T> Default for Chunks<T> {
    fn default() -> Self {
        Self {
            chunks: Vec::new(),
            num_elements: 0,
            sealed: false,
        }
    }
}

#[derive(Debug)]
pub struct Bucket<T> {
    state: Mutex<Chunks<T>>,
}

impl<T> Default for Bucket<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Bucket<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Chunks::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().num_elements
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends one item to the last chunk. Single-writer only.
    pub fn push_back(&mut self, item: T) -> Result<(), GraphError> {
        let state = self.state.get_mut();
        if state.sealed {
            return Err(GraphError::BucketSealed);
        }
        match state.chunks.last_mut() {
            Some(last) => last.push(item),
            None => state.chunks.push(vec![item]),
        }
        state.num_elements += 1;
        Ok(())
    }

    /// Takes ownership of `items` and appends them as one new chunk.
    ///
    /// Safe to call from many threads. Chunk order across concurrent callers
    /// is unspecified; the order inside `items` is kept. Empty vectors are
    /// dropped without creating a chunk.
    pub fn bulk_absorb(&self, items: Vec<T>) -> Result<(), GraphError> {
        let mut state = self.state.lock();
        if state.sealed {
            return Err(GraphError::BucketSealed);
        }
        if !items.is_empty() {
            state.num_elements += items.len();
            state.chunks.push(items);
        }
        Ok(())
    }

    /// Drops all items and lifts the seal.
    pub fn clear(&mut self) {
        *self.state.get_mut() = Chunks::default();
    }

    pub fn swap(&mut self, other: &mut Bucket<T>) {
        std::mem::swap(self.state.get_mut(), other.state.get_mut());
    }

    /// Seals the bucket and returns a read-only view over all chunks.
    pub fn view(&mut self) -> BucketView<'_, T> {
        let state = self.state.get_mut();
        state.sealed = true;
        BucketView {
            chunks: &state.chunks,
            len: state.num_elements,
        }
    }

    pub fn iter(&mut self) -> BucketIter<'_, T> {
        self.view().iter()
    }

    /// Flattens the chunks into one vector, in chunk order.
    pub fn into_vec(self) -> Vec<T> {
        let state = self.state.into_inner();
        let mut flat = Vec::with_capacity(state.num_elements);
        for chunk in state.chunks {
            flat.extend(chunk);
        }
        flat
    }
}

/// Position inside a [`BucketView`]: chunk index plus offset in that chunk.
///
/// Cursors produced by a view always point at an existing item or equal
/// [`BucketView::end`], so the derived ordering (chunk first, then offset)
/// matches the flattened order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cursor {
    chunk: usize,
    offset: usize,
}

#[derive(Debug)]
pub struct BucketView<'a, T> {
    chunks: &'a [Vec<T>],
    len: usize,
}

impl<T> Clone for BucketView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for BucketView<'_, T> {}

impl<'a, T> BucketView<'a, T> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn begin(&self) -> Cursor {
        Cursor {
            chunk: 0,
            offset: 0,
        }
    }

    pub fn end(&self) -> Cursor {
        Cursor {
            chunk: self.chunks.len(),
            offset: 0,
        }
    }

    pub fn get(&self, at: Cursor) -> Option<&'a T> {
        self.chunks.get(at.chunk)?.get(at.offset)
    }

    /// Moves `at` forward by `n` items across chunk boundaries. Overshooting
    /// the last item lands on [`BucketView::end`].
    pub fn advance(&self, at: Cursor, n: usize) -> Cursor {
        let mut chunk = at.chunk;
        let mut offset = at.offset + n;
        while chunk < self.chunks.len() && offset >= self.chunks[chunk].len() {
            offset -= self.chunks[chunk].len();
            chunk += 1;
        }
        if chunk >= self.chunks.len() {
            return self.end();
        }
        Cursor { chunk, offset }
    }

    /// Number of items from `from` to `to`; negative when `to` comes first.
    pub fn distance(&self, from: Cursor, to: Cursor) -> isize {
        self.position(to) as isize - self.position(from) as isize
    }

    fn position(&self, at: Cursor) -> usize {
        let before: usize = self.chunks[..at.chunk.min(self.chunks.len())]
            .iter()
            .map(Vec::len)
            .sum();
        before + at.offset
    }

    pub fn iter(&self) -> BucketIter<'a, T> {
        BucketIter {
            view: *self,
            at: self.begin(),
            remaining: self.len,
        }
    }
}

impl<'a, T: Sync> BucketView<'a, T> {
    /// Parallel iteration over every item; no ordering is implied.
    pub fn par_iter(&self) -> impl ParallelIterator<Item = &'a T> + 'a {
        self.chunks.par_iter().flat_map_iter(|chunk| chunk.iter())
    }
}

pub struct BucketIter<'a, T> {
    view: BucketView<'a, T>,
    at: Cursor,
    remaining: usize,
}

impl<'a, T> Iterator for BucketIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.view.get(self.at)?;
        self.at = self.view.advance(self.at, 1);
        self.remaining -= 1;
        Some(item)
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        if n >= self.remaining {
            self.at = self.view.end();
            self.remaining = 0;
            return None;
        }
        self.at = self.view.advance(self.at, n);
        self.remaining -= n;
        self.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for BucketIter<'_, T> {}
