use clap::ValueEnum;
use tracing::{debug, warn};

use crate::filter::{self, apply_filters};
use crate::models::{Category, CrisisRecord, FilterCriteria, Severity, Trend};
use crate::panels::{route_voice_command, Panel, PanelMutation, PanelState};
use crate::selection::Selection;
use crate::store::CrisisStore;

/// Discrete user actions: clicks, checkbox flips, spoken commands.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    TogglePanel(Panel),
    OpenPanel(Panel),
    ClosePanel(Panel),
    DismissOverlays,
    SelectCrisis(String),
    CloseCrisisPanel,
    Voice(String),
    SetCriteria(FilterCriteria),
    Search(String),
    ToggleSeverity(Severity),
    ToggleCategory(Category),
    ToggleRegion(String),
    ToggleTrend(Trend),
    ResetFilters,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Panel flags that actually changed.
    Panels(Vec<PanelMutation>),
    Selected { id: String, in_view: bool },
    SelectionCleared,
    UnknownCrisis(String),
    Filtered { showing: usize, total: usize },
    Unchanged,
}

/// Shell state: the current filters and their view, the selection, and
/// panel visibility. Borrows the store for its whole life.
#[derive(Debug)]
pub struct Console<'a> {
    store: &'a CrisisStore,
    criteria: FilterCriteria,
    filtered: Vec<&'a CrisisRecord>,
    selection: Selection<'a>,
    panels: PanelState,
}

impl<'a> Console<'a> {
    pub fn new(store: &'a CrisisStore) -> Self {
        Self {
            store,
            criteria: FilterCriteria::default(),
            filtered: store.records().iter().collect(),
            selection: Selection::new(),
            panels: PanelState::default(),
        }
    }

    pub fn store(&self) -> &'a CrisisStore {
        self.store
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn filtered(&self) -> &[&'a CrisisRecord] {
        &self.filtered
    }

    pub fn selected(&self) -> Option<&'a CrisisRecord> {
        self.selection.get()
    }

    pub fn panels(&self) -> &PanelState {
        &self.panels
    }

    pub fn overlay_visible(&self) -> bool {
        self.panels.overlay_visible()
    }

    pub fn subscribe_selection(&mut self, listener: impl FnMut(Option<&'a CrisisRecord>) + 'a) {
        self.selection.subscribe(listener);
    }

    pub fn dispatch(&mut self, action: Action) -> Outcome {
        match action {
            Action::TogglePanel(panel) => {
                let open = self.panels.toggle(panel);
                Outcome::Panels(vec![PanelMutation { panel, open }])
            }
            Action::OpenPanel(panel) => self.apply_panel(PanelMutation::open(panel)),
            Action::ClosePanel(panel) => self.apply_panel(PanelMutation::close(panel)),
            Action::DismissOverlays => {
                let closed: Vec<PanelMutation> = self
                    .panels
                    .dismiss_overlays()
                    .into_iter()
                    .map(PanelMutation::close)
                    .collect();
                if closed.is_empty() {
                    Outcome::Unchanged
                } else {
                    Outcome::Panels(closed)
                }
            }
            Action::SelectCrisis(id) => self.select(&id),
            Action::CloseCrisisPanel => {
                if self.selection.clear() {
                    Outcome::SelectionCleared
                } else {
                    Outcome::Unchanged
                }
            }
            Action::Voice(text) => match route_voice_command(&text) {
                Some(mutation) => self.apply_panel(mutation),
                None => Outcome::Unchanged,
            },
            Action::SetCriteria(criteria) => self.refilter(|current| *current = criteria),
            Action::Search(term) => self.refilter(|current| current.search = term),
            Action::ToggleSeverity(severity) => {
                self.refilter(|current| current.toggle_severity(severity))
            }
            Action::ToggleCategory(category) => {
                self.refilter(|current| current.toggle_category(category))
            }
            Action::ToggleRegion(region) => self.refilter(|current| current.toggle_region(&region)),
            Action::ToggleTrend(trend) => self.refilter(|current| current.toggle_trend(trend)),
            Action::ResetFilters => self.refilter(FilterCriteria::reset),
        }
    }

    fn apply_panel(&mut self, mutation: PanelMutation) -> Outcome {
        if self.panels.apply(mutation) {
            Outcome::Panels(vec![mutation])
        } else {
            Outcome::Unchanged
        }
    }

    fn select(&mut self, id: &str) -> Outcome {
        let Some(record) = self.store.get(id) else {
            warn!(id, "select requested for unknown crisis");
            return Outcome::UnknownCrisis(id.to_string());
        };

        if !self.selection.select(record) {
            return Outcome::Unchanged;
        }
        Outcome::Selected {
            id: record.id.clone(),
            in_view: filter::matches(record, &self.criteria),
        }
    }

    fn refilter(&mut self, update: impl FnOnce(&mut FilterCriteria)) -> Outcome {
        update(&mut self.criteria);
        self.filtered = apply_filters(self.store.records(), &self.criteria);
        debug!(
            filters = %self.criteria.summary(),
            showing = self.filtered.len(),
            "filtered view recomputed"
        );
        Outcome::Filtered {
            showing: self.filtered.len(),
            total: self.store.len(),
        }
    }
}

/// One parsed line of the interactive shell.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Act(Action),
    Status,
    Quit,
    Invalid(String),
}

/// Keyword-led lines map to actions; anything else is a voice command.
///
/// Only the single separator after the keyword is dropped from a search
/// term, so `search ` followed by spaces searches for those spaces.
pub fn parse_command(line: &str) -> Command {
    let line = line.trim_start();
    let (keyword, raw) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = raw.trim();
    let spoken = line.trim_end();

    match (keyword.to_ascii_lowercase().as_str(), rest) {
        ("quit" | "exit", "") => Command::Quit,
        ("status", "") => Command::Status,
        ("close", "") => Command::Act(Action::CloseCrisisPanel),
        ("dismiss", "") => Command::Act(Action::DismissOverlays),
        ("reset", "") => Command::Act(Action::ResetFilters),
        ("select", id) if !id.is_empty() => Command::Act(Action::SelectCrisis(id.to_string())),
        ("search", _) => Command::Act(Action::Search(raw.to_string())),
        ("region", region) if !region.is_empty() => {
            Command::Act(Action::ToggleRegion(region.to_string()))
        }
        ("toggle", panel) => parse_choice(panel).map_or_else(Command::Invalid, |panel| {
            Command::Act(Action::TogglePanel(panel))
        }),
        // "open filters" is left to the voice router; only panel ids parse here.
        ("open", panel) => match parse_choice(panel) {
            Ok(panel) => Command::Act(Action::OpenPanel(panel)),
            Err(_) => Command::Act(Action::Voice(spoken.to_string())),
        },
        ("close", panel) => match parse_choice(panel) {
            Ok(panel) => Command::Act(Action::ClosePanel(panel)),
            Err(_) => Command::Act(Action::Voice(spoken.to_string())),
        },
        ("severity", value) => parse_choice(value).map_or_else(Command::Invalid, |severity| {
            Command::Act(Action::ToggleSeverity(severity))
        }),
        ("category", value) => parse_choice(value).map_or_else(Command::Invalid, |category| {
            Command::Act(Action::ToggleCategory(category))
        }),
        ("trend", value) => parse_choice(value).map_or_else(Command::Invalid, |trend| {
            Command::Act(Action::ToggleTrend(trend))
        }),
        _ => Command::Act(Action::Voice(spoken.to_string())),
    }
}

fn parse_choice<T: ValueEnum>(value: &str) -> Result<T, String> {
    T::from_str(value, true).map_err(|_| {
        let choices: Vec<String> = T::value_variants()
            .iter()
            .filter_map(|v| v.to_possible_value().map(|p| p.get_name().to_string()))
            .collect();
        format!("unknown value {value:?}, expected one of {}", choices.join(", "))
    })
}
