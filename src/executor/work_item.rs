//! Unit of work as it sits in the queue.

use crate::context::Context;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

static WORK_ITEM_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a queued work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkItemId(u64);

impl WorkItemId {
    fn next() -> Self {
        WorkItemId(WORK_ITEM_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

pub(crate) type Action = Box<dyn FnOnce(&Context) + Send + 'static>;

/// An action paired with the context captured when it was submitted.
pub(crate) struct WorkItem {
    pub(crate) id: WorkItemId,
    action: Action,
    context: Context,
    pub(crate) enqueued_at: Instant,
}

impl WorkItem {
    pub fn new<F>(context: Context, f: F) -> Self
    where
        F: FnOnce(&Context) + Send + 'static,
    {
        WorkItem {
            id: WorkItemId::next(),
            action: Box::new(f),
            context,
            enqueued_at: Instant::now(),
        }
    }

    /// Keeps `value` alive until the action has returned or unwound.
    pub fn holding<T: Send + 'static>(self, value: T) -> Self {
        let WorkItem {
            id,
            action,
            context,
            enqueued_at,
        } = self;
        WorkItem {
            id,
            action: Box::new(move |cx| {
                let _value = value;
                action(cx);
            }),
            context,
            enqueued_at,
        }
    }

    /// Runs the action with its captured context. The context is released
    /// when this returns or unwinds.
    pub fn run(self) {
        let WorkItem {
            action, context, ..
        } = self;
        action(&context);
    }

    #[cfg(test)]
    pub(crate) fn context(&self) -> &Context {
        &self.context
    }
}

impl std::fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkItem")
            .field("id", &self.id)
            .field("context", &self.context)
            .field("enqueued_at", &self.enqueued_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextKey;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    const TAG: ContextKey<u32> = ContextKey::new("tag");

    #[test]
    fn test_run_passes_captured_context() {
        let seen = Arc::new(AtomicU32::new(0));
        let seen_clone = seen.clone();

        let item = WorkItem::new(Context::new().with(TAG, 17), move |cx| {
            seen_clone.store(*cx.get(&TAG).unwrap(), Ordering::SeqCst);
        });
        item.run();

        assert_eq!(seen.load(Ordering::SeqCst), 17);
    }

    #[test]
    fn test_holding_releases_value_after_run() {
        let held = Arc::new(());
        let item = WorkItem::new(Context::new().with(TAG, 3), |cx| {
            assert_eq!(cx.get(&TAG), Some(&3));
        })
        .holding(held.clone());

        assert_eq!(Arc::strong_count(&held), 2);
        item.run();
        assert_eq!(Arc::strong_count(&held), 1);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = WorkItem::new(Context::new(), |_| {});
        let b = WorkItem::new(Context::new(), |_| {});
        assert_ne!(a.id, b.id);
    }
}
