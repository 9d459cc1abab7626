use std::collections::{HashSet, VecDeque};

/// Recently seen event ids, bounded to `capacity` entries.
///
/// The oldest id is evicted first. The feed only ever shows recent events, so
/// an id that has aged out of the window will not come back around.
#[derive(Debug)]
pub struct ObservedKeys {
    capacity: usize,
    order: VecDeque<String>,
    keys: HashSet<String>,
}

impl ObservedKeys {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            keys: HashSet::with_capacity(capacity),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Marks `key` as observed. Returns `false` if it already was.
    pub fn insert(&mut self, key: String) -> bool {
        if self.keys.contains(&key) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.keys.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.keys.insert(key);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
