use crate::error::ApiError;

/// Ordered-collection reindexing.
///
/// Every "home image" section keeps a dense, gap-free, unique integer
/// `priority` starting at 0. This module owns the arithmetic of keeping that
/// invariant under append, move, and remove; `PostgresRepository` applies the
/// same plan as a single transaction, and the in-memory mock repository used
/// in tests applies it directly via [`apply_reorder`] / [`apply_remove`].

/// One item of an ordered collection: a stable key plus its current position.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub key: String,
    pub priority: i32,
}

/// The contiguous window of *other* items displaced by one move, and the
/// direction they shift. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShiftWindow {
    pub lo: i32,
    pub hi: i32,
    pub delta: i32,
}

/// Plans a move from `old` to `new`.
///
/// Moving an item up (`new < old`) pushes every item in `[new, old)` down one
/// slot; moving it down pushes every item in `(old, new]` up one slot. Only
/// the items strictly between the two positions move, each by exactly one, so
/// uniqueness and contiguity hold at every step of the transaction. Returns
/// `None` for the no-op case `new == old`.
pub fn plan_move(old: i32, new: i32) -> Option<ShiftWindow> {
    if new == old {
        None
    } else if new < old {
        Some(ShiftWindow {
            lo: new,
            hi: old - 1,
            delta: 1,
        })
    } else {
        Some(ShiftWindow {
            lo: old + 1,
            hi: new,
            delta: -1,
        })
    }
}

/// Priority assigned to the next appended item: one past the current maximum,
/// or 0 for an empty collection. A batch of N appends takes N consecutive
/// values starting here, in caller order.
pub fn next_priority(existing: impl IntoIterator<Item = i32>) -> i32 {
    existing.into_iter().max().map_or(0, |max| max + 1)
}

/// Moves `key` to `new_priority` in an in-memory collection, shifting the
/// displaced window per [`plan_move`].
///
/// Fails with `ItemNotFound` when the key is absent and `InvalidPriority`
/// when the target position is outside `0..len`; the collection is untouched
/// on any failure.
pub fn apply_reorder(slots: &mut [Slot], key: &str, new_priority: i32) -> Result<(), ApiError> {
    let len = slots.len();
    if new_priority < 0 || new_priority as usize >= len {
        return Err(ApiError::InvalidPriority {
            given: new_priority,
            len,
        });
    }

    let old = slots
        .iter()
        .find(|s| s.key == key)
        .map(|s| s.priority)
        .ok_or(ApiError::ItemNotFound)?;

    if let Some(window) = plan_move(old, new_priority) {
        for slot in slots.iter_mut() {
            if slot.key != key && slot.priority >= window.lo && slot.priority <= window.hi {
                slot.priority += window.delta;
            }
        }
        for slot in slots.iter_mut() {
            if slot.key == key {
                slot.priority = new_priority;
            }
        }
    }
    Ok(())
}

/// Removes `key` from an in-memory collection and compacts: every priority
/// above the removed one drops by 1, so the range stays dense. Returns the
/// priority the item held.
pub fn apply_remove(slots: &mut Vec<Slot>, key: &str) -> Result<i32, ApiError> {
    let idx = slots
        .iter()
        .position(|s| s.key == key)
        .ok_or(ApiError::ItemNotFound)?;
    let removed = slots.remove(idx).priority;

    for slot in slots.iter_mut() {
        if slot.priority > removed {
            slot.priority -= 1;
        }
    }
    Ok(removed)
}
