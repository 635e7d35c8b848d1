use std::collections::BTreeMap;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Panel {
    FiltersPanel,
    InsightsPanel,
    ExportPanel,
    FoodTracker,
    SurplusRegistration,
    ForecastTimeline,
    AgentChat,
    ImpactHub,
}

impl Panel {
    pub const ALL: [Panel; 8] = [
        Panel::FiltersPanel,
        Panel::InsightsPanel,
        Panel::ExportPanel,
        Panel::FoodTracker,
        Panel::SurplusRegistration,
        Panel::ForecastTimeline,
        Panel::AgentChat,
        Panel::ImpactHub,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Panel::FiltersPanel => "filters-panel",
            Panel::InsightsPanel => "insights-panel",
            Panel::ExportPanel => "export-panel",
            Panel::FoodTracker => "food-tracker",
            Panel::SurplusRegistration => "surplus-registration",
            Panel::ForecastTimeline => "forecast-timeline",
            Panel::AgentChat => "agent-chat",
            Panel::ImpactHub => "impact-hub",
        }
    }

    /// Overlays share the backdrop that dismisses all of them at once.
    pub fn is_overlay(self) -> bool {
        matches!(
            self,
            Panel::FiltersPanel | Panel::InsightsPanel | Panel::ExportPanel
        )
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PanelMutation {
    pub panel: Panel,
    pub open: bool,
}

impl PanelMutation {
    pub fn open(panel: Panel) -> Self {
        Self { panel, open: true }
    }

    pub fn close(panel: Panel) -> Self {
        Self { panel, open: false }
    }
}

impl fmt::Display for PanelMutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.open { "open" } else { "close" };
        write!(f, "{verb} {}", self.panel)
    }
}

/// Open/closed flag for every panel, keyed by panel id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelState {
    flags: BTreeMap<Panel, bool>,
}

impl Default for PanelState {
    fn default() -> Self {
        Self {
            flags: Panel::ALL.iter().map(|&panel| (panel, false)).collect(),
        }
    }
}

impl PanelState {
    pub fn is_open(&self, panel: Panel) -> bool {
        self.flags.get(&panel).copied().unwrap_or(false)
    }

    /// Returns whether the flag changed.
    pub fn set(&mut self, panel: Panel, open: bool) -> bool {
        self.flags.insert(panel, open) != Some(open)
    }

    pub fn toggle(&mut self, panel: Panel) -> bool {
        let open = !self.is_open(panel);
        self.flags.insert(panel, open);
        open
    }

    pub fn apply(&mut self, mutation: PanelMutation) -> bool {
        self.set(mutation.panel, mutation.open)
    }

    /// Backdrop click: closes every overlay together.
    pub fn dismiss_overlays(&mut self) -> Vec<Panel> {
        Panel::ALL
            .into_iter()
            .filter(|panel| panel.is_overlay())
            .filter(|&panel| self.set(panel, false))
            .collect()
    }

    pub fn overlay_visible(&self) -> bool {
        Panel::ALL
            .iter()
            .any(|&panel| panel.is_overlay() && self.is_open(panel))
    }

    pub fn open_panels(&self) -> Vec<Panel> {
        self.flags
            .iter()
            .filter(|(_, open)| **open)
            .map(|(&panel, _)| panel)
            .collect()
    }
}

struct VoiceRule {
    keywords: &'static [&'static str],
    mutation: PanelMutation,
}

// Checked in order; the first rule with any matching keyword wins.
const VOICE_RULES: &[VoiceRule] = &[
    VoiceRule {
        keywords: &["show filters", "open filters"],
        mutation: PanelMutation { panel: Panel::FiltersPanel, open: true },
    },
    VoiceRule {
        keywords: &["hide filters", "close filters"],
        mutation: PanelMutation { panel: Panel::FiltersPanel, open: false },
    },
    VoiceRule {
        keywords: &["show insights", "ai insights"],
        mutation: PanelMutation { panel: Panel::InsightsPanel, open: true },
    },
    VoiceRule {
        keywords: &["export", "download"],
        mutation: PanelMutation { panel: Panel::ExportPanel, open: true },
    },
    VoiceRule {
        keywords: &["food security", "food tracker"],
        mutation: PanelMutation { panel: Panel::FoodTracker, open: true },
    },
    VoiceRule {
        keywords: &["register food", "donate food"],
        mutation: PanelMutation { panel: Panel::SurplusRegistration, open: true },
    },
    VoiceRule {
        keywords: &["timeline", "forecast"],
        mutation: PanelMutation { panel: Panel::ForecastTimeline, open: true },
    },
    VoiceRule {
        keywords: &["chat", "agent"],
        mutation: PanelMutation { panel: Panel::AgentChat, open: true },
    },
    VoiceRule {
        keywords: &["impact", "contribute"],
        mutation: PanelMutation { panel: Panel::ImpactHub, open: true },
    },
];

/// Maps a spoken command to at most one panel mutation. Unrecognised
/// text yields `None`.
pub fn route_voice_command(text: &str) -> Option<PanelMutation> {
    let command = text.to_lowercase();
    let routed = VOICE_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|&keyword| command.contains(keyword)))
        .map(|rule| rule.mutation);

    if routed.is_none() {
        warn!(command = %text, "voice command not recognised");
    }
    routed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_by_keyword_substring() {
        assert_eq!(
            route_voice_command("please show filters now"),
            Some(PanelMutation::open(Panel::FiltersPanel))
        );
        assert_eq!(
            route_voice_command("Close Filters"),
            Some(PanelMutation::close(Panel::FiltersPanel))
        );
        assert_eq!(
            route_voice_command("Download the latest report"),
            Some(PanelMutation::open(Panel::ExportPanel))
        );
        assert_eq!(
            route_voice_command("I want to donate food"),
            Some(PanelMutation::open(Panel::SurplusRegistration))
        );
        assert_eq!(route_voice_command("banana"), None);
        assert_eq!(route_voice_command(""), None);
    }

    #[test]
    fn earlier_rules_take_priority() {
        // "export" is checked before "forecast".
        assert_eq!(
            route_voice_command("export the forecast"),
            Some(PanelMutation::open(Panel::ExportPanel))
        );
        // "food security" is checked before "donate food".
        assert_eq!(
            route_voice_command("food security, then donate food"),
            Some(PanelMutation::open(Panel::FoodTracker))
        );
    }

    #[test]
    fn mutation_display_names_panel() {
        let mutation = route_voice_command("please show filters now").unwrap();
        assert_eq!(mutation.to_string(), "open filters-panel");
    }

    #[test]
    fn flags_start_closed_and_toggle_independently() {
        let mut state = PanelState::default();
        assert!(state.open_panels().is_empty());

        assert!(state.toggle(Panel::AgentChat));
        assert!(state.set(Panel::FiltersPanel, true));
        assert!(!state.set(Panel::FiltersPanel, true));
        assert_eq!(
            state.open_panels(),
            vec![Panel::FiltersPanel, Panel::AgentChat]
        );

        assert!(!state.toggle(Panel::AgentChat));
        assert!(!state.is_open(Panel::AgentChat));
    }

    #[test]
    fn backdrop_dismisses_only_overlays() {
        let mut state = PanelState::default();
        state.set(Panel::FiltersPanel, true);
        state.set(Panel::ExportPanel, true);
        state.set(Panel::ImpactHub, true);
        assert!(state.overlay_visible());

        let closed = state.dismiss_overlays();
        assert_eq!(closed, vec![Panel::FiltersPanel, Panel::ExportPanel]);
        assert!(!state.overlay_visible());
        assert!(state.is_open(Panel::ImpactHub));
    }

    #[test]
    fn unknown_command_leaves_state_unchanged() {
        let mut state = PanelState::default();
        state.set(Panel::InsightsPanel, true);
        let before = state.clone();

        if let Some(mutation) = route_voice_command("banana") {
            state.apply(mutation);
        }
        assert_eq!(state, before);
    }
}
