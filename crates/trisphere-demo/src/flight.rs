//! Scripted camera: straight down toward the surface, then back out.

use glam::DVec3;
use trisphere_config::DemoSettings;

/// Camera path over a fixed number of ticks.
///
/// Altitude falls geometrically from `start_altitude` to `closest_altitude`
/// at the halfway tick and climbs back symmetrically, so each quadtree level
/// gets a similar share of the flight.
#[derive(Clone, Debug)]
pub(crate) struct Flight {
    direction: DVec3,
    radius: f64,
    start: f64,
    closest: f64,
    ticks: u32,
}

impl Flight {
    pub(crate) fn new(settings: &DemoSettings, radius: f64, direction: DVec3) -> Self {
        let start = settings.start_altitude.max(f64::EPSILON);
        Self {
            direction: direction.normalize(),
            radius,
            start,
            closest: settings.closest_altitude.clamp(f64::EPSILON, start),
            ticks: settings.ticks,
        }
    }

    /// Altitude above the undisplaced sphere at `tick`.
    pub(crate) fn altitude_at(&self, tick: u32) -> f64 {
        if self.ticks < 2 {
            return self.start;
        }
        let u = f64::from(tick.min(self.ticks - 1)) / f64::from(self.ticks - 1);
        let depth = 1.0 - (2.0 * u - 1.0).abs();
        self.start * (self.closest / self.start).powf(depth)
    }

    /// Planet-relative camera position at `tick`.
    pub(crate) fn camera_at(&self, tick: u32) -> DVec3 {
        self.direction * (self.radius + self.altitude_at(tick))
    }

    /// Whether `tick` is in the climbing half.
    pub(crate) fn is_climbing(&self, tick: u32) -> bool {
        tick >= self.ticks / 2
    }
}
