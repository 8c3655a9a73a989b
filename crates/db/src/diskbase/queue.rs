// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use strum::Display;

/// Where an object's property set stands with respect to the backing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum PagingMode {
    /// Nothing resident. Not on any queue.
    Unloaded,
    /// Resident and clean; evictable.
    Loaded,
    /// Resident and clean, but out of reach of the housekeeping sweep.
    Priority,
    /// Resident with unwritten changes; never unloaded until flushed.
    Changed,
}

impl PagingMode {
    fn ring(&self) -> Option<usize> {
        match self {
            PagingMode::Unloaded => None,
            PagingMode::Loaded => Some(0),
            PagingMode::Priority => Some(1),
            PagingMode::Changed => Some(2),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Links {
    next: usize,
    prev: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct Ring {
    /// The least recently queued member.
    head: Option<usize>,
    count: usize,
}

/// Three circular doubly linked lists over object slots, one per resident paging mode.
///
/// An object's mode and its queue membership change together in [`PagingQueues::requeue`], so
/// an object is on the queue named by its mode and on no other. Queuing appends behind the
/// newest member, so walking from the head visits objects oldest first.
#[derive(Debug, Clone, Default)]
pub struct PagingQueues {
    modes: Vec<PagingMode>,
    links: Vec<Links>,
    rings: [Ring; 3],
}

impl PagingQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track slots up to `len`. New slots start out unloaded.
    pub fn grow(&mut self, len: usize) {
        if len > self.modes.len() {
            self.modes.resize(len, PagingMode::Unloaded);
            let start = self.links.len();
            self.links.extend((start..len).map(|i| Links { next: i, prev: i }));
        }
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    pub fn mode(&self, slot: usize) -> PagingMode {
        self.modes
            .get(slot)
            .copied()
            .unwrap_or(PagingMode::Unloaded)
    }

    /// Members of the queue for `mode`. For `Unloaded`, the number of untracked slots.
    pub fn count(&self, mode: PagingMode) -> usize {
        match mode.ring() {
            Some(r) => self.rings[r].count,
            None => self.modes.len() - self.rings.iter().map(|r| r.count).sum::<usize>(),
        }
    }

    /// Take `slot` off its queue, if it is on one, and queue it as the newest member for `mode`.
    /// Requeuing under the same mode is how an object is marked recently used.
    pub fn requeue(&mut self, slot: usize, mode: PagingMode) {
        self.unlink(slot);
        self.modes[slot] = mode;
        let Some(r) = mode.ring() else {
            return;
        };
        let ring = &mut self.rings[r];
        match ring.head {
            None => {
                self.links[slot] = Links {
                    next: slot,
                    prev: slot,
                };
                ring.head = Some(slot);
            }
            Some(head) => {
                let tail = self.links[head].prev;
                self.links[slot] = Links {
                    next: head,
                    prev: tail,
                };
                self.links[tail].next = slot;
                self.links[head].prev = slot;
            }
        }
        ring.count += 1;
    }

    /// Take `slot` off its queue and mark it unloaded.
    pub fn remove(&mut self, slot: usize) {
        self.requeue(slot, PagingMode::Unloaded);
    }

    fn unlink(&mut self, slot: usize) {
        let Some(r) = self.modes[slot].ring() else {
            return;
        };
        let ring = &mut self.rings[r];
        let Links { next, prev } = self.links[slot];
        if next == slot {
            ring.head = None;
        } else {
            self.links[prev].next = next;
            self.links[next].prev = prev;
            if ring.head == Some(slot) {
                ring.head = Some(next);
            }
        }
        ring.count -= 1;
        self.links[slot] = Links {
            next: slot,
            prev: slot,
        };
    }

    pub fn oldest(&self, mode: PagingMode) -> Option<usize> {
        mode.ring().and_then(|r| self.rings[r].head)
    }

    /// The member queued after `slot`, or None once the walk wraps around.
    pub fn next_in(&self, mode: PagingMode, slot: usize) -> Option<usize> {
        let head = self.oldest(mode)?;
        let next = self.links[slot].next;
        (next != head).then_some(next)
    }

    /// Members of the queue for `mode`, oldest first.
    pub fn iter(&self, mode: PagingMode) -> QueueIter<'_> {
        QueueIter {
            queues: self,
            mode,
            cursor: self.oldest(mode),
        }
    }

    /// Walk every queue and check it against the recorded modes.
    pub fn is_consistent(&self) -> bool {
        for mode in [PagingMode::Loaded, PagingMode::Priority, PagingMode::Changed] {
            let mut seen = 0;
            for slot in self.iter(mode) {
                if self.modes[slot] != mode || seen > self.modes.len() {
                    return false;
                }
                let Links { next, prev } = self.links[slot];
                if self.links[next].prev != slot || self.links[prev].next != slot {
                    return false;
                }
                seen += 1;
            }
            if seen != self.count(mode) {
                return false;
            }
            if self.modes.iter().filter(|m| **m == mode).count() != seen {
                return false;
            }
        }
        true
    }
}

pub struct QueueIter<'a> {
    queues: &'a PagingQueues,
    mode: PagingMode,
    cursor: Option<usize>,
}

impl Iterator for QueueIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        self.cursor = self.queues.next_in(self.mode, slot);
        Some(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn members(q: &PagingQueues, mode: PagingMode) -> Vec<usize> {
        q.iter(mode).collect()
    }

    #[test]
    fn queues_in_arrival_order() {
        let mut q = PagingQueues::new();
        q.grow(6);
        for slot in [3, 1, 4] {
            q.requeue(slot, PagingMode::Loaded);
        }
        assert_eq!(members(&q, PagingMode::Loaded), vec![3, 1, 4]);
        assert_eq!(q.count(PagingMode::Loaded), 3);
        assert_eq!(q.count(PagingMode::Unloaded), 3);
        assert!(q.is_consistent());
    }

    #[test]
    fn requeue_moves_to_newest() {
        let mut q = PagingQueues::new();
        q.grow(4);
        for slot in 0..4 {
            q.requeue(slot, PagingMode::Loaded);
        }
        q.requeue(0, PagingMode::Loaded);
        assert_eq!(members(&q, PagingMode::Loaded), vec![1, 2, 3, 0]);
        q.requeue(2, PagingMode::Loaded);
        assert_eq!(members(&q, PagingMode::Loaded), vec![1, 3, 0, 2]);
        assert_eq!(q.count(PagingMode::Loaded), 4);
        assert!(q.is_consistent());
    }

    #[test]
    fn mode_changes_move_between_queues() {
        let mut q = PagingQueues::new();
        q.grow(5);
        for slot in 0..5 {
            q.requeue(slot, PagingMode::Loaded);
        }
        q.requeue(0, PagingMode::Changed);
        q.requeue(4, PagingMode::Priority);
        q.remove(2);
        assert_eq!(members(&q, PagingMode::Loaded), vec![1, 3]);
        assert_eq!(members(&q, PagingMode::Changed), vec![0]);
        assert_eq!(members(&q, PagingMode::Priority), vec![4]);
        assert_eq!(q.mode(2), PagingMode::Unloaded);
        assert_eq!(q.count(PagingMode::Unloaded), 1);
        assert!(q.is_consistent());

        q.remove(0);
        assert_eq!(q.oldest(PagingMode::Changed), None);
        assert!(members(&q, PagingMode::Changed).is_empty());
        // Removing something that is not queued is harmless.
        q.remove(0);
        assert!(q.is_consistent());
    }

    #[test]
    fn removing_head_advances_it() {
        let mut q = PagingQueues::new();
        q.grow(3);
        for slot in 0..3 {
            q.requeue(slot, PagingMode::Loaded);
        }
        q.remove(0);
        assert_eq!(q.oldest(PagingMode::Loaded), Some(1));
        assert_eq!(members(&q, PagingMode::Loaded), vec![1, 2]);
        assert!(q.is_consistent());
    }

    #[test]
    fn growth_keeps_existing_queues() {
        let mut q = PagingQueues::new();
        q.grow(2);
        q.requeue(1, PagingMode::Priority);
        q.grow(10);
        q.requeue(9, PagingMode::Priority);
        assert_eq!(members(&q, PagingMode::Priority), vec![1, 9]);
        assert_eq!(q.len(), 10);
        assert!(q.is_consistent());
    }
}
