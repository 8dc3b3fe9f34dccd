//! A max pairing heap. This backs the priority queues used when walking the
//! causal graph backwards - the diff algorithm and the merge point scan both
//! repeatedly pop the largest remaining version.

#[derive(Debug, Clone)]
struct HeapNode<T> {
    value: T,
    subtrees: Vec<HeapNode<T>>,
}

#[derive(Debug, Clone)]
pub struct PairingHeap<T: Ord> {
    root: Option<HeapNode<T>>,
    size: usize,
}

impl<T: Ord> Default for PairingHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn meld<T: Ord>(mut a: HeapNode<T>, mut b: HeapNode<T>) -> HeapNode<T> {
    // The larger root wins; the loser becomes one of its subtrees.
    if a.value >= b.value {
        a.subtrees.push(b);
        a
    } else {
        b.subtrees.push(a);
        b
    }
}

/// Two pass pairwise merge: meld adjacent pairs left to right, then fold the
/// results back right to left. This is what gives pop its amortized O(log n)
/// bound.
fn merge_pairs<T: Ord>(mut subtrees: Vec<HeapNode<T>>) -> Option<HeapNode<T>> {
    let mut paired: Vec<HeapNode<T>> = Vec::with_capacity(subtrees.len() / 2 + 1);
    let mut iter = subtrees.drain(..);
    while let Some(a) = iter.next() {
        match iter.next() {
            Some(b) => paired.push(meld(a, b)),
            None => paired.push(a),
        }
    }

    let mut merged = paired.pop()?;
    while let Some(next) = paired.pop() {
        merged = meld(next, merged);
    }
    Some(merged)
}

impl<T: Ord> PairingHeap<T> {
    pub fn new() -> Self {
        Self { root: None, size: 0 }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The largest value in the heap, if any.
    pub fn peek(&self) -> Option<&T> {
        self.root.as_ref().map(|n| &n.value)
    }

    pub fn push(&mut self, value: T) {
        let node = HeapNode { value, subtrees: vec![] };
        self.root = Some(match self.root.take() {
            Some(root) => meld(node, root),
            None => node,
        });
        self.size += 1;
    }

    pub fn pop(&mut self) -> Option<T> {
        let HeapNode { value, subtrees } = self.root.take()?;
        self.root = merge_pairs(subtrees);
        self.size -= 1;
        Some(value)
    }
}

impl<T: Ord> FromIterator<T> for PairingHeap<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut heap = Self::new();
        for value in iter {
            heap.push(value);
        }
        heap
    }
}

#[cfg(test)]
mod tests {
    use rand::prelude::*;

    use super::*;

    #[test]
    fn empty_heap() {
        let mut heap: PairingHeap<usize> = PairingHeap::new();
        assert!(heap.is_empty());
        assert_eq!(heap.peek(), None);
        assert_eq!(heap.pop(), None);
    }

    #[test]
    fn pops_in_descending_order() {
        let mut heap = PairingHeap::new();
        for v in [3, 1, 4, 1, 5, 9, 2, 6] {
            heap.push(v);
        }
        assert_eq!(heap.len(), 8);
        assert_eq!(heap.peek(), Some(&9));

        let mut popped = vec![];
        while let Some(v) = heap.pop() {
            popped.push(v);
        }
        assert_eq!(popped, &[9, 6, 5, 4, 3, 2, 1, 1]);
    }

    #[test]
    fn matches_sorted_reference() {
        let mut rng = SmallRng::seed_from_u64(123);
        for _ in 0..100 {
            let len = rng.gen_range(0..200);
            let values: Vec<u32> = (0..len).map(|_| rng.gen_range(0..50)).collect();

            let mut heap: PairingHeap<u32> = values.iter().copied().collect();
            assert_eq!(heap.len(), values.len());

            let mut expected = values.clone();
            expected.sort_unstable_by(|a, b| b.cmp(a));

            let mut actual = Vec::with_capacity(values.len());
            while let Some(v) = heap.pop() {
                actual.push(v);
            }
            assert_eq!(actual, expected);
            assert!(heap.is_empty());
        }
    }

    #[test]
    fn interleaved_push_pop() {
        let mut rng = SmallRng::seed_from_u64(321);
        let mut heap = PairingHeap::new();
        let mut reference = std::collections::BinaryHeap::new();

        for _ in 0..1000 {
            if reference.is_empty() || rng.gen_bool(0.6) {
                let v: u64 = rng.gen_range(0..1000);
                heap.push(v);
                reference.push(v);
            } else {
                assert_eq!(heap.pop(), reference.pop());
            }
            assert_eq!(heap.len(), reference.len());
            assert_eq!(heap.peek(), reference.peek());
        }
    }
}
