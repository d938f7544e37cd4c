use super::types::Point;
use rand::Rng;
use std::f64::consts::PI;

pub fn distance(a: Point, b: Point) -> f64 {
  (a.x - b.x).hypot(a.y - b.y)
}

/// Angle of the vector pointing from `from` to `to`.
pub fn angle_to(from: Point, to: Point) -> f64 {
  (to.y - from.y).atan2(to.x - from.x)
}

/// Wraps an angle difference into (-PI, PI].
pub fn normalize_angle(angle: f64) -> f64 {
  if !angle.is_finite() {
    return 0.0;
  }
  let mut wrapped = angle % (PI * 2.0);
  if wrapped > PI {
    wrapped -= PI * 2.0;
  } else if wrapped <= -PI {
    wrapped += PI * 2.0;
  }
  wrapped
}

/// Moves `current` a fraction `rate` of the way toward `target` along the short arc.
pub fn ease_angle(current: f64, target: f64, rate: f64) -> f64 {
  current + normalize_angle(target - current) * rate
}

/// Rotates `current` toward `target` by at most `max_step` radians.
pub fn rotate_toward(current: f64, target: f64, max_step: f64) -> f64 {
  let diff = normalize_angle(target - current);
  current + clamp(diff, -max_step, max_step)
}

pub fn project(origin: Point, angle: f64, length: f64) -> Point {
  Point {
    x: origin.x + angle.cos() * length,
    y: origin.y + angle.sin() * length,
  }
}

pub fn random_point<R: Rng + ?Sized>(rng: &mut R, world_size: f64) -> Point {
  Point {
    x: rng.gen::<f64>() * world_size,
    y: rng.gen::<f64>() * world_size,
  }
}

pub fn random_angle<R: Rng + ?Sized>(rng: &mut R) -> f64 {
  rng.gen::<f64>() * PI * 2.0
}

pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
  value.min(max).max(min)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalize_angle_stays_in_half_open_range() {
    for raw in [-10.0, -PI, -3.0, 0.0, 3.0, PI, 7.5, 20.0] {
      let wrapped = normalize_angle(raw);
      assert!(wrapped > -PI - 1e-12 && wrapped <= PI + 1e-12, "{raw} -> {wrapped}");
      let turns = (raw - wrapped) / (PI * 2.0);
      assert!((turns.round() - turns).abs() < 1e-9, "{raw} -> {wrapped}");
    }
    assert!((normalize_angle(-PI) - PI).abs() < 1e-12);
  }

  #[test]
  fn ease_angle_takes_the_short_way_around() {
    let current = PI - 0.1;
    let target = -PI + 0.1;
    let eased = ease_angle(current, target, 0.5);
    assert!(eased > current);
    assert!((eased - PI).abs() < 1e-9);
  }

  #[test]
  fn rotate_toward_never_overshoots() {
    assert!((rotate_toward(0.0, 0.05, 0.1) - 0.05).abs() < 1e-12);
    assert!((rotate_toward(0.0, 1.0, 0.1) - 0.1).abs() < 1e-12);
    assert!((rotate_toward(0.0, -1.0, 0.1) + 0.1).abs() < 1e-12);
  }
}
