//! In-memory queue of not-yet-submitted items, one FIFO per lane.
//!
//! All operations take a short synchronous lock and never await while
//! holding it.

use std::collections::VecDeque;
use std::sync::Mutex;

use texgen_core::queue::{new_item_id, Lane, QueueItem, QueueItemId};

#[derive(Debug, Default)]
struct Lanes {
    continuous: VecDeque<QueueItem>,
    batch: VecDeque<QueueItem>,
}

impl Lanes {
    fn lane(&self, lane: Lane) -> &VecDeque<QueueItem> {
        match lane {
            Lane::Continuous => &self.continuous,
            Lane::Batch => &self.batch,
        }
    }

    fn lane_mut(&mut self, lane: Lane) -> &mut VecDeque<QueueItem> {
        match lane {
            Lane::Continuous => &mut self.continuous,
            Lane::Batch => &mut self.batch,
        }
    }

    fn remove_first(&mut self, pred: impl Fn(&QueueItem) -> bool) -> Option<QueueItem> {
        for lane in Lane::ALL {
            let queue = self.lane_mut(lane);
            if let Some(pos) = queue.iter().position(&pred) {
                return queue.remove(pos);
            }
        }
        None
    }
}

#[derive(Debug, Default)]
pub struct QueueStore {
    inner: Mutex<Lanes>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `item` to the tail of its lane. A nil id is replaced with a
    /// fresh one. Returns the item's id.
    pub fn enqueue(&self, mut item: QueueItem) -> QueueItemId {
        if item.id.is_nil() {
            item.id = new_item_id();
        }
        let id = item.id;
        let lane = item.lane;
        self.lock().lane_mut(lane).push_back(item);
        id
    }

    /// Remove the first item whose id, or upgrade back-reference, equals
    /// `id`. Missing ids are not an error.
    pub fn dequeue(&self, id: uuid::Uuid) -> Option<QueueItem> {
        self.lock().remove_first(|item| item.matches(id))
    }

    /// Remove exactly the item with this id, ignoring back-references.
    pub(crate) fn remove_item(&self, id: QueueItemId) -> Option<QueueItem> {
        self.lock().remove_first(|item| item.id == id)
    }

    pub fn peek_first(&self, lane: Lane) -> Option<QueueItem> {
        self.lock().lane(lane).front().cloned()
    }

    /// Look an item up without removing it.
    pub fn find(&self, id: uuid::Uuid) -> Option<QueueItem> {
        let lanes = self.lock();
        Lane::ALL
            .iter()
            .find_map(|&lane| lanes.lane(lane).iter().find(|item| item.matches(id)).cloned())
    }

    /// Items across both lanes.
    pub fn count(&self) -> usize {
        let lanes = self.lock();
        lanes.continuous.len() + lanes.batch.len()
    }

    pub fn lane_len(&self, lane: Lane) -> usize {
        self.lock().lane(lane).len()
    }

    /// Items of a lane in FIFO order.
    pub fn snapshot(&self, lane: Lane) -> Vec<QueueItem> {
        self.lock().lane(lane).iter().cloned().collect()
    }

    /// Empty a lane, returning how many items were dropped.
    pub fn clear_lane(&self, lane: Lane) -> usize {
        let mut lanes = self.lock();
        let queue = lanes.lane_mut(lane);
        let n = queue.len();
        queue.clear();
        n
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Lanes> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use texgen_core::queue::QueueItemKind;
    use texgen_core::types::DbId;

    use super::*;
    use crate::test_support::sample_params;

    fn item(lane: Lane) -> QueueItem {
        QueueItem::new(lane, QueueItemKind::Generation, DbId::new_v4(), sample_params())
    }

    fn assert_count_invariant(store: &QueueStore) {
        assert_eq!(
            store.count(),
            store.lane_len(Lane::Continuous) + store.lane_len(Lane::Batch)
        );
    }

    #[test]
    fn enqueue_assigns_id_and_keeps_fifo() {
        let store = QueueStore::new();
        let a = store.enqueue(item(Lane::Continuous));
        let b = store.enqueue(item(Lane::Continuous));
        assert!(!a.is_nil());
        assert_ne!(a, b);

        let ids: Vec<_> = store.snapshot(Lane::Continuous).iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(store.peek_first(Lane::Continuous).unwrap().id, a);
    }

    #[test]
    fn enqueue_keeps_existing_id() {
        let store = QueueStore::new();
        let mut it = item(Lane::Batch);
        let id = new_item_id();
        it.id = id;
        assert_eq!(store.enqueue(it), id);
    }

    #[test]
    fn lanes_are_not_conflated() {
        let store = QueueStore::new();
        store.enqueue(item(Lane::Batch));
        assert!(store.peek_first(Lane::Continuous).is_none());
        assert_eq!(store.lane_len(Lane::Batch), 1);
    }

    #[test]
    fn dequeue_by_upgrade_back_reference() {
        let store = QueueStore::new();
        let original = DbId::new_v4();
        let upgrade = QueueItem::new(
            Lane::Continuous,
            QueueItemKind::Upgrade {
                original_job_id: original,
            },
            DbId::new_v4(),
            sample_params(),
        );
        let id = store.enqueue(upgrade);

        let removed = store.dequeue(original).unwrap();
        assert_eq!(removed.id, id);
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn dequeue_missing_is_noop() {
        let store = QueueStore::new();
        store.enqueue(item(Lane::Continuous));
        assert!(store.dequeue(new_item_id()).is_none());
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn remove_item_ignores_back_reference() {
        let store = QueueStore::new();
        let original = DbId::new_v4();
        store.enqueue(QueueItem::new(
            Lane::Continuous,
            QueueItemKind::Upgrade {
                original_job_id: original,
            },
            DbId::new_v4(),
            sample_params(),
        ));
        assert!(store.remove_item(original).is_none());
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn count_invariant_holds_across_operations() {
        let store = QueueStore::new();
        let mut ids = Vec::new();
        for i in 0..10 {
            let lane = if i % 3 == 0 { Lane::Batch } else { Lane::Continuous };
            ids.push(store.enqueue(item(lane)));
            assert_count_invariant(&store);
        }
        for id in ids.iter().step_by(2) {
            store.dequeue(*id);
            assert_count_invariant(&store);
        }
        assert_eq!(store.count(), 5);
        store.clear_lane(Lane::Continuous);
        assert_count_invariant(&store);
        assert_eq!(store.count(), store.lane_len(Lane::Batch));
    }

    #[test]
    fn clear_lane_leaves_other_lane() {
        let store = QueueStore::new();
        store.enqueue(item(Lane::Continuous));
        store.enqueue(item(Lane::Continuous));
        store.enqueue(item(Lane::Batch));
        assert_eq!(store.clear_lane(Lane::Continuous), 2);
        assert_eq!(store.count(), 1);
    }
}
