//! Generation-tagged view state.
//!
//! A `ViewSlot` holds the last loaded value of a view. Every load takes a
//! `LoadTicket` when it begins; only the ticket of the most recently begun
//! load may store its result, so a slow early load can never overwrite the
//! output of a later one.

use std::future::Future;
use std::sync::Mutex;

struct SlotState<T> {
    generation: u64,
    value: Option<T>,
}

/// Last loaded value of one view.
pub struct ViewSlot<T> {
    state: Mutex<SlotState<T>>,
}

/// Proof that a load began at a given generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl<T> Default for ViewSlot<T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(SlotState {
                generation: 0,
                value: None,
            }),
        }
    }
}

impl<T> ViewSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a load, superseding any load still in flight.
    pub fn begin(&self) -> LoadTicket {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.generation += 1;
        LoadTicket {
            generation: state.generation,
        }
    }

    /// Store `value` if `ticket` belongs to the latest load. Returns whether
    /// the value was applied.
    pub fn complete(&self, ticket: LoadTicket, value: T) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if ticket.generation != state.generation {
            tracing::debug!(
                ticket = ticket.generation,
                latest = state.generation,
                "discarding stale load"
            );
            return false;
        }
        state.value = Some(value);
        true
    }

    /// Generation of the most recently begun load.
    pub fn generation(&self) -> u64 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).generation
    }

    pub fn is_loaded(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .value
            .is_some()
    }
}

impl<T: Clone> ViewSlot<T> {
    /// The current value, if any load has completed.
    pub fn get(&self) -> Option<T> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .value
            .clone()
    }
}

/// Run `load` against `slot`.
///
/// Returns `Ok(true)` when the result was applied, `Ok(false)` when a newer
/// load began while this one was running. A failed load leaves the slot
/// untouched.
pub async fn refresh<T, F>(slot: &ViewSlot<T>, load: F) -> anyhow::Result<bool>
where
    F: Future<Output = anyhow::Result<T>>,
{
    let ticket = slot.begin();
    let value = load.await?;
    Ok(slot.complete(ticket, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[test]
    fn latest_ticket_wins() {
        let slot = ViewSlot::new();
        let first = slot.begin();
        let second = slot.begin();

        assert!(slot.complete(second, "second"));
        assert!(!slot.complete(first, "first"));
        assert_eq!(slot.get(), Some("second"));
        assert_eq!(slot.generation(), 2);
    }

    #[test]
    fn empty_until_completed() {
        let slot: ViewSlot<u32> = ViewSlot::new();
        assert!(!slot.is_loaded());
        let ticket = slot.begin();
        assert_eq!(slot.get(), None);
        slot.complete(ticket, 7);
        assert!(slot.is_loaded());
        assert_eq!(ticket.generation(), 1);
    }

    #[tokio::test]
    async fn slow_earlier_load_is_discarded() {
        let slot = ViewSlot::new();
        let (slow_tx, slow_rx) = oneshot::channel::<&str>();

        let slow = refresh(&slot, async move { Ok::<_, anyhow::Error>(slow_rx.await?) });
        let fast = async {
            // Let the slow load take its ticket first
            tokio::task::yield_now().await;
            let applied = refresh(&slot, async { Ok::<_, anyhow::Error>("fresh") }).await;
            let _ = slow_tx.send("stale");
            applied
        };

        let (slow_applied, fast_applied) = tokio::join!(slow, fast);
        assert!(!slow_applied.unwrap());
        assert!(fast_applied.unwrap());
        assert_eq!(slot.get(), Some("fresh"));
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_value() {
        let slot = ViewSlot::new();
        assert!(refresh(&slot, async { Ok::<_, anyhow::Error>(1) }).await.unwrap());
        let err = refresh(&slot, async { Err::<i32, _>(anyhow::anyhow!("offline")) }).await;
        assert!(err.is_err());
        assert_eq!(slot.get(), Some(1));
    }
}
