//! Color palette configuration and deterministic assignment
//!
//! Actor colors prefer the explicit palette; anything else hashes into a
//! fixed fallback palette, so an actor keeps the same color across runs and
//! dataset reorderings. Tool colors index into their own palette by the
//! tool's position in the alphabetically sorted vocabulary.

use serde::Serialize;
use std::collections::BTreeMap;

/// Theme color tokens exposed to the client.
pub const COLOR_TOKENS: &[(&str, &str)] = &[
    ("primary", "#cf2e2e"),
    ("accent_orange", "#ff6900"),
    ("accent_yellow", "#fcb900"),
    ("accent_green", "#7bdcb5"),
    ("accent_teal", "#00d084"),
    ("accent_lightblue", "#8ed1fc"),
    ("accent_blue", "#0693e3"),
    ("accent_purple", "#9b51e0"),
    ("accent_pink", "#f78da7"),
    ("ta_russia", "#0d47a1"),
    ("ta_china", "#8b0000"),
];

/// Fixed colors for the principal attributed actors.
pub const ACTOR_PALETTE: &[(&str, &str)] = &[
    ("Russia", "#0d47a1"),
    ("China", "#8b0000"),
    ("Iran", "#9b51e0"),
    ("Other", "#444444"),
    ("Unknown", "#7f7f7f"),
];

/// Fallback colors for actors outside the explicit palette.
pub const FALLBACK_PALETTE: &[&str] = &[
    "#ff6900", "#fcb900", "#7bdcb5", "#00d084", "#8ed1fc", "#0693e3", "#f78da7", "#cf2e2e",
];

/// Tool colors, indexed by alphabetical vocabulary position.
pub const TOOL_PALETTE: &[&str] = &[
    "#0693e3", "#ff6900", "#00d084", "#9b51e0", "#fcb900", "#f78da7", "#7bdcb5", "#8ed1fc",
    "#cf2e2e", "#444444",
];

/// Color used when a tool is not in the known vocabulary.
pub const DEFAULT_TOOL_COLOR: &str = "#7f7f7f";

/// Color for one actor: explicit palette first, otherwise a pure function
/// of the name hashed into the fallback palette.
pub fn actor_color(name: &str) -> &'static str {
    if let Some((_, color)) = ACTOR_PALETTE.iter().find(|(actor, _)| *actor == name) {
        return color;
    }
    let index = (fnv1a(name) % FALLBACK_PALETTE.len() as u64) as usize;
    FALLBACK_PALETTE[index]
}

/// Color for one tool, given the alphabetically sorted vocabulary. Stable
/// across reloads and dataset ordering, but shifts when the vocabulary
/// itself changes.
pub fn tool_color(name: &str, vocabulary: &[String]) -> &'static str {
    match vocabulary.binary_search_by(|tool| tool.as_str().cmp(name)) {
        Ok(index) => TOOL_PALETTE[index % TOOL_PALETTE.len()],
        Err(_) => DEFAULT_TOOL_COLOR,
    }
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in s.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x100_0000_01b3);
    }
    hash
}

/// Static configuration served by `GET /api/config`.
#[derive(Debug, Serialize)]
pub struct PaletteConfig {
    pub colors: BTreeMap<&'static str, &'static str>,
    pub actor_palette: BTreeMap<&'static str, &'static str>,
    pub fallback_palette: Vec<&'static str>,
    pub tool_palette: Vec<&'static str>,
    pub default_tool_color: &'static str,
}

pub fn config() -> PaletteConfig {
    PaletteConfig {
        colors: COLOR_TOKENS.iter().copied().collect(),
        actor_palette: ACTOR_PALETTE.iter().copied().collect(),
        fallback_palette: FALLBACK_PALETTE.to_vec(),
        tool_palette: TOOL_PALETTE.to_vec(),
        default_tool_color: DEFAULT_TOOL_COLOR,
    }
}
