use rand::Rng;

use crate::record::Record;

/// Default maximum height of the skip list. LevelDB uses 12.
pub const DEFAULT_MAX_LEVEL: usize = 12;

/// A single node in the skip list.
///
/// Each node holds one [`Record`] and one forward reference per level it
/// participates in. Level 0 contains every node (a regular linked list);
/// higher levels skip over nodes, enabling O(log n) average-case search.
///
/// ```text
/// Level 3:  HEAD ──────────────────────────────► 50 ──────────► NIL
/// Level 2:  HEAD ──────────► 20 ────────────────► 50 ──────────► NIL
/// Level 1:  HEAD ──► 10 ──► 20 ────► 35 ────────► 50 ──► 60 ──► NIL
/// Level 0:  HEAD ──► 10 ──► 20 ──► 25 ──► 35 ──► 50 ──► 60 ──► 70 ► NIL
/// ```
///
/// Forward references are indices into the owning list's node arena rather
/// than pointers, so there is no aliasing to reason about and the whole
/// graph drops in one shot on `clear`.
struct SkipNode {
    record: Record,
    forward: Vec<Option<usize>>, // indices into SkipList.nodes, one per level
}

/// A probabilistic sorted index over [`Record`]s — the engine's memtable core.
///
/// Keys are compared byte-wise lexicographically (the empty key sorts first),
/// and at most one node exists per distinct key: a second write to the same
/// key replaces that node's record in place. Deletion is logical — `remove`
/// sets the tombstone bit and the node stays linked until `clear`.
///
/// The list performs no internal synchronization. Every mutator takes
/// `&mut self`, so a `remove` racing a `clear` is unrepresentable; callers
/// sharing an instance across threads must wrap it in their own lock.
///
/// Average case: O(log n) write and find, O(n) iteration.
pub struct SkipList {
    nodes: Vec<SkipNode>,
    head: Vec<Option<usize>>, // sentinel forward refs, one per possible level
    level: usize,             // highest level currently populated
    len: usize,
    size_bytes: usize,
}

impl SkipList {
    /// Create an empty skip list with the given level cap.
    ///
    /// `max_level` is fixed for the lifetime of the list — it never grows,
    /// even if the list outgrows the height the cap was sized for. Draws
    /// beyond it are clamped.
    pub fn new(max_level: usize) -> Self {
        let max_level = max_level.max(1);
        SkipList {
            nodes: Vec::new(),
            head: vec![None; max_level],
            level: 0,
            len: 0,
            size_bytes: 0,
        }
    }

    /// Insert a record, or replace in place if its key is already present.
    ///
    /// Replacement overwrites the whole record, status bits included — this
    /// is "last write wins", and also how a tombstoned key becomes live
    /// again (a fresh record carries no tombstone).
    pub fn write(&mut self, record: Record) {
        let mut update: Vec<Option<usize>> = vec![None; self.head.len()];
        let mut pred: Option<usize> = None; // None = header sentinel
        for lvl in (0..=self.level).rev() {
            loop {
                let next = match pred {
                    None => self.head[lvl],
                    Some(i) => self.nodes[i].forward[lvl],
                };
                match next {
                    Some(n) if self.nodes[n].record.key < record.key => pred = Some(n),
                    _ => break,
                }
            }
            update[lvl] = pred;
        }

        let succ = match pred {
            None => self.head[0],
            Some(i) => self.nodes[i].forward[0],
        };
        if let Some(idx) = succ {
            if self.nodes[idx].record.key == record.key {
                self.size_bytes -= self.nodes[idx].record.encoded_size();
                self.size_bytes += record.encoded_size();
                self.nodes[idx].record = record;
                return;
            }
        }

        let height = self.random_height();
        // Levels above the old effective level have the header as predecessor,
        // which is what `update` already holds (None).
        if height - 1 > self.level {
            self.level = height - 1;
        }

        let idx = self.nodes.len();
        let mut forward = vec![None; height];
        for (lvl, fwd) in forward.iter_mut().enumerate() {
            match update[lvl] {
                None => {
                    *fwd = self.head[lvl];
                    self.head[lvl] = Some(idx);
                }
                Some(p) => {
                    *fwd = self.nodes[p].forward[lvl];
                    self.nodes[p].forward[lvl] = Some(idx);
                }
            }
        }

        self.size_bytes += record.encoded_size() + height * size_of::<Option<usize>>();
        self.len += 1;
        self.nodes.push(SkipNode { record, forward });
    }

    /// Look up a key.
    ///
    /// With `exact_only` the record is returned only on bit-for-bit key
    /// equality; otherwise the entry with the smallest key >= the target is
    /// returned. Exact lookups are the contractual mode — always pass `true`
    /// unless you want nearest-match-from-above.
    ///
    /// Tombstoned entries are still found; check [`Record::is_deleted`].
    pub fn find(&self, key: &[u8], exact_only: bool) -> Option<&Record> {
        let idx = self.descend(key)?;
        let record = &self.nodes[idx].record;
        if exact_only && record.key != key {
            return None;
        }
        Some(record)
    }

    /// Logically delete a key by setting its record's tombstone bit.
    ///
    /// The node stays linked and keeps its key/value bytes; the timestamp is
    /// refreshed to the deletion instant. Removing an absent key is a no-op —
    /// deletion is idempotent, never an error.
    pub fn remove(&mut self, key: &[u8]) {
        let Some(idx) = self.descend(key) else {
            return;
        };
        let record = &mut self.nodes[idx].record;
        if record.key == key {
            record.mark_deleted();
            record.touch();
        }
    }

    /// Drop every node and reset to the empty state.
    /// Has no effect on anything previously flushed to durable storage.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.head.fill(None);
        self.level = 0;
        self.len = 0;
        self.size_bytes = 0;
    }

    /// Number of retained entries, tombstoned ones included.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Approximate memory usage in bytes.
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// The construction-time level cap.
    pub fn max_level(&self) -> usize {
        self.head.len()
    }

    /// Iterate over every retained record, tombstones included, in strictly
    /// ascending key order. Level 0 links every node, so this is a plain
    /// linked-list walk — the contract a flush stage relies on to produce a
    /// sorted durable segment.
    pub fn iter(&self) -> SkipListIter<'_> {
        SkipListIter {
            list: self,
            next: self.head[0],
        }
    }

    /// Descend from the highest populated level toward the target key.
    /// Returns the level-0 node with the smallest key >= `key`, if any.
    fn descend(&self, key: &[u8]) -> Option<usize> {
        let mut pred: Option<usize> = None;
        for lvl in (0..=self.level).rev() {
            loop {
                let next = match pred {
                    None => self.head[lvl],
                    Some(i) => self.nodes[i].forward[lvl],
                };
                match next {
                    Some(n) if self.nodes[n].record.key.as_slice() < key => pred = Some(n),
                    _ => break,
                }
            }
        }
        match pred {
            None => self.head[0],
            Some(i) => self.nodes[i].forward[0],
        }
    }

    /// Draw a height for a new node: coin flip per extra level, capped.
    /// Expected height is 2, so the arena stays shallow and dense.
    fn random_height(&self) -> usize {
        let mut rng = rand::thread_rng();
        let mut height = 1;
        while height < self.head.len() && rng.gen_bool(0.5) {
            height += 1;
        }
        height
    }
}

impl Default for SkipList {
    fn default() -> Self {
        SkipList::new(DEFAULT_MAX_LEVEL)
    }
}

/// Iterator over skip list records in ascending key order.
pub struct SkipListIter<'a> {
    list: &'a SkipList,
    next: Option<usize>,
}

impl<'a> Iterator for SkipListIter<'a> {
    type Item = &'a Record;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.next?;
        let node = &self.list.nodes[idx];
        self.next = node.forward[0];
        Some(&node.record)
    }
}
