use serde::{Deserialize, Serialize};

/// A named family of time controls, e.g. Blitz with 2, 3 and 5 minute games.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMode {
    pub name: String,
    /// Seconds per player.
    pub time_controls: Vec<u64>,
}

impl GameMode {
    pub fn new(name: &str, time_controls: &[u64]) -> Self {
        GameMode {
            name: name.to_string(),
            time_controls: time_controls.to_vec(),
        }
    }
}

/// Modes offered by default.
pub fn active_game_modes() -> Vec<GameMode> {
    vec![
        GameMode::new("Bullet", &[10, 30, 60]),
        GameMode::new("Blitz", &[120, 180, 300]),
        GameMode::new("Rapid", &[600, 1200, 1800]),
    ]
}

/// Case-insensitive lookup of a mode offering `time_control`.
pub fn find_game_mode<'a>(
    modes: &'a [GameMode],
    name: &str,
    time_control: u64,
) -> Option<&'a GameMode> {
    modes
        .iter()
        .find(|mode| mode.name.eq_ignore_ascii_case(name) && mode.time_controls.contains(&time_control))
}
