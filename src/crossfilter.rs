//! Cross-filter state machine (client-resident)
//!
//! One controller owns the entire interaction state: the active filter
//! tuple, a monotonic render generation, and a debounce buffer for the
//! free-text box. Every UI action goes through a named transition; each
//! transition resets the page cursor to 1 and bumps the generation, which
//! stands for exactly one full re-fetch and re-render of all views.
//!
//! The generation counter is also the staleness guard: responses tagged
//! with an older generation than the latest issued one are discarded, so
//! out-of-order arrivals under rapid filter edits cannot win the render.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crate::models::Filters;

/// Default pause before a free-text edit commits.
pub const DEBOUNCE: Duration = Duration::from_millis(300);

/// A filterable dimension of the incident list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Actor,
    Country,
    Tool,
}

/// One applied-filter chip, as shown to (and removable by) the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chip {
    Start(NaiveDate),
    End(NaiveDate),
    Query(String),
    Actor(String),
    Country(String),
    Tool(String),
}

/// The cross-filter controller.
#[derive(Debug, Clone)]
pub struct CrossFilter {
    filters: Filters,
    generation: u64,
    pending_query: Option<(String, Instant)>,
    debounce: Duration,
}

impl Default for CrossFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl CrossFilter {
    pub fn new() -> Self {
        Self {
            filters: Filters::default(),
            generation: 0,
            pending_query: None,
            debounce: DEBOUNCE,
        }
    }

    pub fn with_debounce(debounce: Duration) -> Self {
        Self {
            debounce,
            ..Self::new()
        }
    }

    /// The active filter set, as the next request would send it.
    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    /// Latest issued render generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a response tagged with `generation` is still current.
    pub fn accept_response(&self, generation: u64) -> bool {
        generation == self.generation
    }

    // ---------- Transitions ----------
    // Each returns the new generation; the caller tags its request with it.

    /// Heatmap cell (actor, year): toggle the actor and pin the date range
    /// to that year.
    pub fn heatmap_cell(&mut self, actor: &str, year: i32) -> u64 {
        toggle(&mut self.filters.actors, actor);
        self.set_year_bounds(year);
        self.rerender()
    }

    /// Heatmap year-axis label: pin the date range only.
    pub fn heatmap_year(&mut self, year: i32) -> u64 {
        self.set_year_bounds(year);
        self.rerender()
    }

    /// Heatmap actor-axis label: toggle the actor only.
    pub fn heatmap_actor(&mut self, actor: &str) -> u64 {
        toggle(&mut self.filters.actors, actor);
        self.rerender()
    }

    /// Stacked-bar segment (tool, actor): toggle both.
    pub fn stacked_segment(&mut self, tool: &str, actor: &str) -> u64 {
        toggle(&mut self.filters.tools, tool);
        toggle(&mut self.filters.actors, actor);
        self.rerender()
    }

    /// Stacked-bar tool label: toggle the tool only.
    pub fn stacked_tool(&mut self, tool: &str) -> u64 {
        toggle(&mut self.filters.tools, tool);
        self.rerender()
    }

    /// Individual country marker on the map. Cluster markers are visual
    /// aggregation only and never reach this transition.
    pub fn map_marker(&mut self, country: &str) -> u64 {
        toggle(&mut self.filters.countries, country);
        self.rerender()
    }

    /// Tag on an incident-list row.
    pub fn list_tag(&mut self, dimension: Dimension, value: &str) -> u64 {
        let target = match dimension {
            Dimension::Actor => &mut self.filters.actors,
            Dimension::Country => &mut self.filters.countries,
            Dimension::Tool => &mut self.filters.tools,
        };
        toggle(target, value);
        self.rerender()
    }

    /// Remove exactly one applied-filter chip.
    pub fn remove_chip(&mut self, chip: &Chip) -> u64 {
        match chip {
            Chip::Start(_) => self.filters.start = None,
            Chip::End(_) => self.filters.end = None,
            Chip::Query(_) => {
                self.filters.q = None;
                self.pending_query = None;
            }
            Chip::Actor(actor) => {
                self.filters.actors.remove(actor);
            }
            Chip::Country(country) => {
                self.filters.countries.remove(country);
            }
            Chip::Tool(tool) => {
                self.filters.tools.remove(tool);
            }
        }
        self.rerender()
    }

    /// Clear everything back to the default state in one transition.
    pub fn reset(&mut self) -> u64 {
        self.filters = Filters::default();
        self.pending_query = None;
        self.rerender()
    }

    /// Move the list cursor without touching any filter.
    pub fn goto_page(&mut self, page: usize) -> u64 {
        self.filters.page = page.max(1);
        self.generation += 1;
        self.generation
    }

    /// Buffer a free-text edit. Nothing fires until the input pauses.
    pub fn edit_query(&mut self, text: &str, now: Instant) {
        self.pending_query = Some((text.to_string(), now + self.debounce));
    }

    /// Commit a pending free-text edit whose pause has elapsed. Returns the
    /// new generation when a re-render is due.
    pub fn poll(&mut self, now: Instant) -> Option<u64> {
        let due = matches!(&self.pending_query, Some((_, deadline)) if now >= *deadline);
        if !due {
            return None;
        }
        let (text, _) = self.pending_query.take()?;
        let trimmed = text.trim().to_string();
        self.filters.q = (!trimmed.is_empty()).then_some(trimmed);
        Some(self.rerender())
    }

    /// Applied-filter chips, in display order.
    pub fn chips(&self) -> Vec<Chip> {
        let mut chips = Vec::new();
        if let Some(start) = self.filters.start {
            chips.push(Chip::Start(start));
        }
        if let Some(end) = self.filters.end {
            chips.push(Chip::End(end));
        }
        if let Some(q) = &self.filters.q {
            chips.push(Chip::Query(q.clone()));
        }
        chips.extend(self.filters.actors.iter().cloned().map(Chip::Actor));
        chips.extend(self.filters.countries.iter().cloned().map(Chip::Country));
        chips.extend(self.filters.tools.iter().cloned().map(Chip::Tool));
        chips
    }

    fn set_year_bounds(&mut self, year: i32) {
        self.filters.start = NaiveDate::from_ymd_opt(year, 1, 1);
        self.filters.end = NaiveDate::from_ymd_opt(year, 12, 31);
    }

    fn rerender(&mut self) -> u64 {
        self.filters.page = 1;
        self.generation += 1;
        self.generation
    }
}

fn toggle(set: &mut BTreeSet<String>, value: &str) {
    if !set.remove(value) {
        set.insert(value.to_string());
    }
}
