/// SelectionChannel — single-value "selected entity" channel.
///
/// The editor host publishes, render passes poll. The generation
/// counter lets consumers notice a republish of the same value
/// (select, deselect, select again).

use std::sync::Mutex;
use crate::scene::EntityKey;

pub struct SelectionChannel {
    state: Mutex<(Option<EntityKey>, u64)>,
}

impl SelectionChannel {
    pub fn new() -> Self {
        Self {
            state: Mutex::new((None, 0)),
        }
    }

    /// Publish a new selection (or `None` to clear it).
    pub fn publish(&self, selection: Option<EntityKey>) {
        let mut state = self.state.lock().unwrap();
        state.0 = selection;
        state.1 += 1;
    }

    /// Currently selected entity, if any.
    pub fn current(&self) -> Option<EntityKey> {
        self.state.lock().unwrap().0
    }

    /// Monotonic publish counter.
    pub fn generation(&self) -> u64 {
        self.state.lock().unwrap().1
    }
}

impl Default for SelectionChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "selection_tests.rs"]
mod tests;
