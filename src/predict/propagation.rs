use chrono::{DateTime, Duration, Utc};

use crate::predict::{ElevationSample, Observer, OrbitalElementSet, PredictError};

/// Default accuracy horizon around the element set epoch.
pub const DEFAULT_MAX_EPOCH_OFFSET: Duration = Duration::days(30);

/// Point-in-time look angle source.
///
/// Implementations must be deterministic for a given
/// `(elements, observer, instant)` triple.
pub trait Propagator: Send + Sync {
    fn sample(
        &self,
        elements: &OrbitalElementSet,
        observer: &Observer,
        instant: DateTime<Utc>,
    ) -> Result<ElevationSample, PredictError>;
}

/// SGP4/SDP4 backed propagator.
///
/// Instants further than `max_epoch_offset` from the element set epoch (in
/// either direction) are refused with [`PredictError::Propagation`] instead of
/// returning a degraded position.
#[derive(Debug, Clone, Copy)]
pub struct Sgp4Propagator {
    max_epoch_offset: Duration,
}

impl Default for Sgp4Propagator {
    fn default() -> Self {
        Self {
            max_epoch_offset: DEFAULT_MAX_EPOCH_OFFSET,
        }
    }
}

impl Sgp4Propagator {
    pub fn new(max_epoch_offset: Duration) -> Self {
        Self { max_epoch_offset }
    }

    pub fn max_epoch_offset(&self) -> Duration {
        self.max_epoch_offset
    }
}

impl Propagator for Sgp4Propagator {
    fn sample(
        &self,
        elements: &OrbitalElementSet,
        observer: &Observer,
        instant: DateTime<Utc>,
    ) -> Result<ElevationSample, PredictError> {
        let propagation_error = |message: String| PredictError::Propagation {
            observer: observer.name().to_string(),
            at: instant,
            message,
        };

        let offset = instant - elements.epoch;
        if offset.abs() > self.max_epoch_offset {
            return Err(propagation_error(format!(
                "{:.1} days from epoch {} exceeds the supported {} days",
                offset.num_seconds() as f64 / 86_400.0,
                elements.epoch,
                self.max_epoch_offset.num_days()
            )));
        }

        let minutes = elements
            .sgp4_elements()
            .datetime_to_minutes_since_epoch(&instant.naive_utc())
            .map_err(|e| propagation_error(e.to_string()))?;
        let prediction = elements
            .sgp4_constants()
            .propagate(minutes)
            .map_err(|e| propagation_error(e.to_string()))?;

        let sidereal =
            sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&instant.naive_utc()));
        let sat_ecef = teme_to_ecef_position(prediction.position, sidereal);
        let sta_ecef = observer.position_ecef_km();

        let dr = [
            sat_ecef[0] - sta_ecef[0],
            sat_ecef[1] - sta_ecef[1],
            sat_ecef[2] - sta_ecef[2],
        ];
        let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();

        let (east, north, up) = ecef_to_enu(dr, observer.lat_rad(), observer.lon_rad());
        let azimuth_deg = east.atan2(north).to_degrees().rem_euclid(360.0);
        let elevation_deg = if range_km > 0.0 {
            (up / range_km).asin().to_degrees()
        } else {
            90.0
        };

        Ok(ElevationSample {
            timestamp: instant,
            elevation_deg,
            azimuth_deg,
            range_km,
        })
    }
}

pub fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

pub fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::testing::iss;

    #[test]
    fn enu_of_local_zenith_is_up() {
        let (e, n, u) = ecef_to_enu([1.0, 0.0, 0.0], 0.0, 0.0);
        assert!(e.abs() < 1e-12 && n.abs() < 1e-12);
        assert!((u - 1.0).abs() < 1e-12);
    }

    #[test]
    fn sample_near_epoch_is_plausible() {
        let elements = iss();
        let observer = Observer::new("Paris", 48.8566, 2.3522, 35.0).unwrap();
        let sample = Sgp4Propagator::default()
            .sample(&elements, &observer, elements.epoch + Duration::hours(2))
            .unwrap();

        assert!((-90.0..=90.0).contains(&sample.elevation_deg));
        assert!((0.0..360.0).contains(&sample.azimuth_deg));
        // LEO: never closer than the orbit altitude, never beyond the far limb.
        assert!(sample.range_km > 350.0 && sample.range_km < 14_000.0);
    }

    #[test]
    fn is_deterministic() {
        let elements = iss();
        let observer = Observer::new("Paris", 48.8566, 2.3522, 35.0).unwrap();
        let propagator = Sgp4Propagator::default();
        let at = elements.epoch + Duration::minutes(37);
        assert_eq!(
            propagator.sample(&elements, &observer, at).unwrap(),
            propagator.sample(&elements, &observer, at).unwrap()
        );
    }

    #[test]
    fn refuses_instants_beyond_accuracy_horizon() {
        let elements = iss();
        let observer = Observer::new("Paris", 48.8566, 2.3522, 35.0).unwrap();
        let propagator = Sgp4Propagator::new(Duration::days(7));

        for offset in [Duration::days(8), -Duration::days(8)] {
            let err = propagator
                .sample(&elements, &observer, elements.epoch + offset)
                .unwrap_err();
            match err {
                PredictError::Propagation { observer, .. } => assert_eq!(observer, "Paris"),
                other => panic!("unexpected error: {other}"),
            }
        }
        assert!(propagator
            .sample(&elements, &observer, elements.epoch + Duration::days(6))
            .is_ok());
    }
}
