use super::constants::COLOR_POOL;
use super::math::random_point;
use super::types::{Point, PowerUpKind};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodKind {
  Normal,
  Big,
  Mega,
  Super,
  Ultra,
}

pub struct FoodSpec {
  pub kind: FoodKind,
  pub value: u32,
  pub radius: f64,
  pub color: Option<&'static str>,
  pub icon: Option<&'static str>,
  pub chance: f64,
}

pub const FOOD_TABLE: [FoodSpec; 5] = [
  FoodSpec {
    kind: FoodKind::Normal,
    value: 1,
    radius: 5.0,
    color: None,
    icon: None,
    chance: 0.70,
  },
  FoodSpec {
    kind: FoodKind::Big,
    value: 5,
    radius: 10.0,
    color: Some("#FFD700"),
    icon: Some("star"),
    chance: 0.15,
  },
  FoodSpec {
    kind: FoodKind::Mega,
    value: 10,
    radius: 15.0,
    color: Some("#FF1493"),
    icon: Some("gem"),
    chance: 0.08,
  },
  FoodSpec {
    kind: FoodKind::Super,
    value: 20,
    radius: 20.0,
    color: Some("#00FF00"),
    icon: Some("crown"),
    chance: 0.05,
  },
  FoodSpec {
    kind: FoodKind::Ultra,
    value: 50,
    radius: 25.0,
    color: Some("#FF0000"),
    icon: Some("fire"),
    chance: 0.02,
  },
];

impl FoodKind {
  pub fn spec(self) -> &'static FoodSpec {
    match self {
      FoodKind::Normal => &FOOD_TABLE[0],
      FoodKind::Big => &FOOD_TABLE[1],
      FoodKind::Mega => &FOOD_TABLE[2],
      FoodKind::Super => &FOOD_TABLE[3],
      FoodKind::Ultra => &FOOD_TABLE[4],
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      FoodKind::Normal => "normal",
      FoodKind::Big => "big",
      FoodKind::Mega => "mega",
      FoodKind::Super => "super",
      FoodKind::Ultra => "ultra",
    }
  }

  /// Unknown names fall back to `Normal`.
  pub fn from_name(name: &str) -> FoodKind {
    FOOD_TABLE
      .iter()
      .map(|spec| spec.kind)
      .find(|kind| kind.name() == name)
      .unwrap_or(FoodKind::Normal)
  }

  /// Draws a kind from the cumulative spawn table.
  pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> FoodKind {
    let roll = rng.gen::<f64>();
    let mut cumulative = 0.0;
    for spec in &FOOD_TABLE {
      cumulative += spec.chance;
      if roll <= cumulative {
        return spec.kind;
      }
    }
    FoodKind::Normal
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "FoodFrame")]
pub struct Food {
  pub position: Point,
  pub kind: FoodKind,
  pub color: String,
}

/// Renderer view of a food item, with the table fields resolved.
#[derive(Debug, Clone, Serialize)]
pub struct FoodFrame {
  pub position: Point,
  pub kind: FoodKind,
  pub value: u32,
  pub radius: f64,
  pub color: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub icon: Option<&'static str>,
}

impl From<Food> for FoodFrame {
  fn from(food: Food) -> Self {
    let spec = food.kind.spec();
    Self {
      position: food.position,
      kind: food.kind,
      value: spec.value,
      radius: spec.radius,
      color: food.color,
      icon: spec.icon,
    }
  }
}

impl Food {
  pub fn new<R: Rng + ?Sized>(rng: &mut R, position: Point, kind: FoodKind) -> Self {
    let color = match kind.spec().color {
      Some(color) => color.to_string(),
      None => COLOR_POOL[rng.gen_range(0..COLOR_POOL.len())].to_string(),
    };
    Self {
      position,
      kind,
      color,
    }
  }

  pub fn random_at<R: Rng + ?Sized>(rng: &mut R, position: Point) -> Self {
    let kind = FoodKind::roll(rng);
    Self::new(rng, position, kind)
  }

  pub fn random<R: Rng + ?Sized>(rng: &mut R, world_size: f64) -> Self {
    let position = random_point(rng, world_size);
    Self::random_at(rng, position)
  }

  pub fn value(&self) -> u32 {
    self.kind.spec().value
  }

  pub fn radius(&self) -> f64 {
    self.kind.spec().radius
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "PowerUpFrame")]
pub struct PowerUp {
  pub position: Point,
  pub kind: PowerUpKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct PowerUpFrame {
  pub position: Point,
  pub kind: PowerUpKind,
  pub color: &'static str,
}

impl From<PowerUp> for PowerUpFrame {
  fn from(powerup: PowerUp) -> Self {
    Self {
      position: powerup.position,
      kind: powerup.kind,
      color: powerup.kind.color(),
    }
  }
}

impl PowerUp {
  pub fn random<R: Rng + ?Sized>(rng: &mut R, world_size: f64) -> Self {
    let position = random_point(rng, world_size);
    let kind = PowerUpKind::ALL[rng.gen_range(0..PowerUpKind::ALL.len())];
    Self { position, kind }
  }
}
