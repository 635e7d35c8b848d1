use tracing::debug;

use crate::models::CrisisRecord;

type Listener<'a> = Box<dyn FnMut(Option<&'a CrisisRecord>) + 'a>;

/// Zero-or-one selected crisis. Listeners run after every change; a
/// repeated select of the same id or a clear of an empty selection is
/// not a change.
///
/// Selection is independent of filtering: a record hidden by the
/// current filters can still be selected.
#[derive(Default)]
pub struct Selection<'a> {
    current: Option<&'a CrisisRecord>,
    listeners: Vec<Listener<'a>>,
}

impl<'a> Selection<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(Option<&'a CrisisRecord>) + 'a) {
        self.listeners.push(Box::new(listener));
    }

    /// Returns whether the selection changed.
    pub fn select(&mut self, record: &'a CrisisRecord) -> bool {
        if self.selected_id() == Some(record.id.as_str()) {
            return false;
        }
        debug!(id = %record.id, "crisis selected");
        self.current = Some(record);
        self.notify();
        true
    }

    /// Returns whether there was a selection to clear.
    pub fn clear(&mut self) -> bool {
        if self.current.take().is_none() {
            return false;
        }
        debug!("selection cleared");
        self.notify();
        true
    }

    pub fn get(&self) -> Option<&'a CrisisRecord> {
        self.current
    }

    pub fn selected_id(&self) -> Option<&'a str> {
        self.current.map(|record| record.id.as_str())
    }

    fn notify(&mut self) {
        let current = self.current;
        for listener in &mut self.listeners {
            listener(current);
        }
    }
}

impl std::fmt::Debug for Selection<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection")
            .field("selected", &self.selected_id())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
