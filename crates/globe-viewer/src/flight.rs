//! Scripted camera path for headless runs.

use glam::DVec3;
use globe_geo::geographic_to_cartesian;

/// A descent from orbit toward the surface while drifting east.
#[derive(Clone, Copy, Debug)]
pub struct Flight {
    pub start_altitude_m: f64,
    pub end_altitude_m: f64,
    pub lon_deg: f64,
    pub lat_deg: f64,
    /// Total eastward drift over the flight.
    pub drift_deg: f64,
    pub frames: u32,
}

impl Default for Flight {
    fn default() -> Self {
        Self {
            start_altitude_m: 20_000_000.0,
            end_altitude_m: 2_000.0,
            lon_deg: 7.0,
            lat_deg: 46.0,
            drift_deg: 20.0,
            frames: 600,
        }
    }
}

impl Flight {
    /// Progress in `[0, 1]` at `frame`.
    fn progress(&self, frame: u32) -> f64 {
        if self.frames <= 1 {
            return 1.0;
        }
        (f64::from(frame) / f64::from(self.frames - 1)).min(1.0)
    }

    /// Altitude at `frame`; geometric so each frame covers the same zoom ratio.
    #[must_use]
    pub fn altitude_at(&self, frame: u32) -> f64 {
        let t = self.progress(frame);
        self.start_altitude_m * (self.end_altitude_m / self.start_altitude_m).powf(t)
    }

    #[must_use]
    pub fn position_at(&self, frame: u32) -> DVec3 {
        let lon = self.lon_deg + self.drift_deg * self.progress(frame);
        geographic_to_cartesian(lon, self.lat_deg, self.altitude_at(frame))
    }
}
