use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
  pub x: f64,
  pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerUpKind {
  Shield,
  Magnet,
  Speed,
  Ghost,
}

impl PowerUpKind {
  pub const ALL: [PowerUpKind; 4] = [
    PowerUpKind::Shield,
    PowerUpKind::Magnet,
    PowerUpKind::Speed,
    PowerUpKind::Ghost,
  ];

  pub fn from_name(name: &str) -> Option<PowerUpKind> {
    PowerUpKind::ALL
      .into_iter()
      .find(|kind| kind.name().eq_ignore_ascii_case(name))
  }

  pub fn name(self) -> &'static str {
    match self {
      PowerUpKind::Shield => "shield",
      PowerUpKind::Magnet => "magnet",
      PowerUpKind::Speed => "speed",
      PowerUpKind::Ghost => "ghost",
    }
  }

  pub fn duration_ms(self) -> i64 {
    match self {
      PowerUpKind::Shield => 5000,
      PowerUpKind::Magnet => 7000,
      PowerUpKind::Speed => 5000,
      PowerUpKind::Ghost => 4000,
    }
  }

  pub fn color(self) -> &'static str {
    match self {
      PowerUpKind::Shield => "#3498db",
      PowerUpKind::Magnet => "#e74c3c",
      PowerUpKind::Speed => "#f39c12",
      PowerUpKind::Ghost => "#9b59b6",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivePowerUp {
  #[serde(rename = "type")]
  pub kind: PowerUpKind,
  #[serde(rename = "endTime")]
  pub end_time: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkinPattern {
  Solid,
  Gradient,
  Striped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skin {
  pub name: String,
  #[serde(rename = "type")]
  pub pattern: SkinPattern,
  pub colors: Vec<String>,
}

const SKIN_TABLE: [(&str, SkinPattern, &[&str]); 12] = [
  ("Classic", SkinPattern::Solid, &["#FF6B6B"]),
  ("Ocean", SkinPattern::Solid, &["#4ECDC4"]),
  ("Rainbow", SkinPattern::Gradient, &["#FF6B6B", "#F7DC6F", "#4ECDC4", "#BB8FCE"]),
  ("Fire", SkinPattern::Gradient, &["#FF4500", "#FFD700"]),
  ("Ice", SkinPattern::Gradient, &["#00CED1", "#E0FFFF"]),
  ("Toxic", SkinPattern::Gradient, &["#00FF00", "#32CD32"]),
  ("Galaxy", SkinPattern::Gradient, &["#4B0082", "#9370DB", "#FF1493"]),
  ("Gold", SkinPattern::Solid, &["#FFD700"]),
  ("Zebra", SkinPattern::Striped, &["#000000", "#FFFFFF"]),
  ("Tiger", SkinPattern::Striped, &["#FF8C00", "#000000"]),
  ("Neon", SkinPattern::Gradient, &["#FF00FF", "#00FFFF"]),
  ("Sunset", SkinPattern::Gradient, &["#FF6B6B", "#FFA07A", "#FFD700"]),
];

impl Skin {
  pub fn count() -> usize {
    SKIN_TABLE.len()
  }

  pub fn by_index(index: usize) -> Skin {
    let (name, pattern, colors) = SKIN_TABLE[index % SKIN_TABLE.len()];
    Skin {
      name: name.to_string(),
      pattern,
      colors: colors.iter().map(|color| color.to_string()).collect(),
    }
  }

  /// Looks a skin up by case-insensitive name, falling back to Classic.
  pub fn by_name(name: &str) -> Skin {
    let index = SKIN_TABLE
      .iter()
      .position(|(candidate, _, _)| candidate.eq_ignore_ascii_case(name.trim()))
      .unwrap_or(0);
    Skin::by_index(index)
  }
}

impl Default for Skin {
  fn default() -> Self {
    Skin::by_index(0)
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
  pub name: String,
  pub score: u32,
  pub kills: u32,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn skin_lookup_is_case_insensitive_with_fallback() {
    assert_eq!(Skin::by_name("tiger").name, "Tiger");
    assert_eq!(Skin::by_name(" GALAXY ").colors.len(), 3);
    assert_eq!(Skin::by_name("unknown").name, "Classic");
  }

  #[test]
  fn active_powerup_uses_wire_field_names() {
    let effect = ActivePowerUp {
      kind: PowerUpKind::Magnet,
      end_time: 42,
    };
    let json = serde_json::to_value(effect).expect("serialize");
    assert_eq!(json["type"], "magnet");
    assert_eq!(json["endTime"], 42);
  }
}
