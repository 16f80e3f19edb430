use std::ops::{Index, IndexMut};

#[derive(Debug)]
enum Slot<T> {
    Occupied(T),
    // Holds the next vacant slot, forming an intrusive free list.
    Vacant(Option<usize>),
}

/// Index-addressed arena. Freed slots drop their payload straight away and are
/// reused by later allocations.
#[derive(Debug)]
pub struct NodePool<T> {
    slots: Vec<Slot<T>>,
    next_free: Option<usize>,
    len: usize,
}

impl<T> NodePool<T> {
    pub fn new() -> Self {
        NodePool {
            slots: Vec::new(),
            next_free: None,
            len: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        NodePool {
            slots: Vec::with_capacity(capacity),
            next_free: None,
            len: 0,
        }
    }

    pub fn alloc(&mut self, t: T) -> usize {
        self.len += 1;
        match self.next_free {
            Some(idx) => {
                self.next_free = match self.slots[idx] {
                    Slot::Vacant(next) => next,
                    Slot::Occupied(_) => panic!("free list points at occupied slot {}", idx),
                };
                self.slots[idx] = Slot::Occupied(t);
                idx
            }
            None => {
                let idx = self.slots.len();
                self.slots.push(Slot::Occupied(t));
                idx
            }
        }
    }

    pub fn free(&mut self, idx: usize) -> T {
        match std::mem::replace(&mut self.slots[idx], Slot::Vacant(self.next_free)) {
            Slot::Occupied(t) => {
                self.next_free = Some(idx);
                self.len -= 1;
                t
            }
            Slot::Vacant(next) => {
                self.slots[idx] = Slot::Vacant(next);
                panic!("double free of slot {}", idx)
            }
        }
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        match self.slots.get(idx) {
            Some(Slot::Occupied(t)) => Some(t),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut T> {
        match self.slots.get_mut(idx) {
            Some(Slot::Occupied(t)) => Some(t),
            _ => None,
        }
    }

    /// Mutable access to two distinct slots at once.
    pub fn get2_mut(&mut self, a: usize, b: usize) -> (&mut T, &mut T) {
        assert_ne!(a, b, "get2_mut on the same slot");
        let (lo, hi, flipped) = if a < b { (a, b, false) } else { (b, a, true) };
        let (l, r) = self.slots.split_at_mut(hi);
        let (x, y) = match (&mut l[lo], &mut r[0]) {
            (Slot::Occupied(x), Slot::Occupied(y)) => (x, y),
            _ => panic!("get2_mut on a freed slot ({}, {})", a, b),
        };
        if flipped {
            (y, x)
        } else {
            (x, y)
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots ever handed out, live or vacant.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.next_free = None;
        self.len = 0;
    }
}

impl<T> Default for NodePool<T> {
    fn default() -> Self {
        NodePool::new()
    }
}

impl<T> Index<usize> for NodePool<T> {
    type Output = T;

    fn index(&self, idx: usize) -> &T {
        match &self.slots[idx] {
            Slot::Occupied(t) => t,
            Slot::Vacant(_) => panic!("use of freed slot {}", idx),
        }
    }
}

impl<T> IndexMut<usize> for NodePool<T> {
    fn index_mut(&mut self, idx: usize) -> &mut T {
        match &mut self.slots[idx] {
            Slot::Occupied(t) => t,
            Slot::Vacant(_) => panic!("use of freed slot {}", idx),
        }
    }
}
