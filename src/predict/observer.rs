use serde::{Deserialize, Serialize};

use crate::predict::error::PredictError;

// WGS-84
const EARTH_EQUATORIAL_RADIUS_KM: f64 = 6378.137;
const EARTH_ECCENTRICITY_SQ: f64 = 0.00669437999014;

/// A ground station. Coordinates are validated at construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observer {
    name: String,
    latitude_deg: f64,
    longitude_deg: f64,
    altitude_m: f64,
}

/// Unvalidated observer coordinates as they arrive from configuration or the
/// command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObserverInput {
    pub name: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    #[serde(default)]
    pub altitude_m: f64,
}

impl ObserverInput {
    /// Parse `"lat,lon"` as found in station configuration. Ranges are
    /// checked later by [`ObserverInput::validate`].
    pub fn from_coordinates(
        name: &str,
        coordinates: &str,
        altitude_m: Option<f64>,
    ) -> Result<Self, PredictError> {
        let parts: Vec<_> = coordinates.split(',').map(|s| s.trim()).collect();
        if parts.len() != 2 {
            return Err(PredictError::invalid_observer(
                name,
                format!("expected \"lat,lon\", got \"{}\"", coordinates),
            ));
        }
        let latitude_deg = parts[0]
            .parse()
            .map_err(|e| PredictError::invalid_observer(name, format!("latitude: {}", e)))?;
        let longitude_deg = parts[1]
            .parse()
            .map_err(|e| PredictError::invalid_observer(name, format!("longitude: {}", e)))?;
        Ok(Self {
            name: name.to_string(),
            latitude_deg,
            longitude_deg,
            altitude_m: altitude_m.unwrap_or(0.0),
        })
    }

    pub fn validate(&self) -> Result<Observer, PredictError> {
        Observer::new(
            &self.name,
            self.latitude_deg,
            self.longitude_deg,
            self.altitude_m,
        )
    }
}

impl From<&Observer> for ObserverInput {
    fn from(observer: &Observer) -> Self {
        Self {
            name: observer.name.clone(),
            latitude_deg: observer.latitude_deg,
            longitude_deg: observer.longitude_deg,
            altitude_m: observer.altitude_m,
        }
    }
}

impl Observer {
    pub fn new(
        name: &str,
        latitude_deg: f64,
        longitude_deg: f64,
        altitude_m: f64,
    ) -> Result<Self, PredictError> {
        if !latitude_deg.is_finite() || !longitude_deg.is_finite() {
            return Err(PredictError::invalid_observer(
                name,
                "coordinates are not finite numbers",
            ));
        }
        if !(-90.0..=90.0).contains(&latitude_deg) {
            return Err(PredictError::invalid_observer(
                name,
                format!("latitude {} outside -90..90", latitude_deg),
            ));
        }
        if !(-180.0..=180.0).contains(&longitude_deg) {
            return Err(PredictError::invalid_observer(
                name,
                format!("longitude {} outside -180..180", longitude_deg),
            ));
        }
        if !altitude_m.is_finite() {
            return Err(PredictError::invalid_observer(name, "altitude is not finite"));
        }

        Ok(Self {
            name: name.to_string(),
            latitude_deg,
            longitude_deg,
            altitude_m,
        })
    }

    /// Parse and validate `"lat,lon"`.
    pub fn from_coordinates(
        name: &str,
        coordinates: &str,
        altitude_m: Option<f64>,
    ) -> Result<Self, PredictError> {
        ObserverInput::from_coordinates(name, coordinates, altitude_m)?.validate()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn latitude_deg(&self) -> f64 {
        self.latitude_deg
    }

    pub fn longitude_deg(&self) -> f64 {
        self.longitude_deg
    }

    pub fn altitude_m(&self) -> f64 {
        self.altitude_m
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    pub fn position_ecef_km(&self) -> [f64; 3] {
        let lat = self.lat_rad();
        let lon = self.lon_rad();
        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let n =
            EARTH_EQUATORIAL_RADIUS_KM / (1.0 - EARTH_ECCENTRICITY_SQ * sin_lat * sin_lat).sqrt();
        let alt_km = self.altitude_m / 1000.0;
        [
            (n + alt_km) * cos_lat * lon.cos(),
            (n + alt_km) * cos_lat * lon.sin(),
            (n * (1.0 - EARTH_ECCENTRICITY_SQ) + alt_km) * sin_lat,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_range_limits_and_negative_altitude() {
        assert!(Observer::new("pole", 90.0, -180.0, 0.0).is_ok());
        assert!(Observer::new("south", -90.0, 180.0, 0.0).is_ok());
        let dead_sea = Observer::new("dead sea", 31.5, 35.5, -430.0).unwrap();
        assert_eq!(dead_sea.altitude_m(), -430.0);
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        for (lat, lon) in [(90.1, 0.0), (-91.0, 0.0), (0.0, 180.5), (0.0, -181.0)] {
            let err = Observer::new("bad", lat, lon, 0.0).unwrap_err();
            assert!(matches!(err, PredictError::InvalidObserver { .. }), "{lat},{lon}");
        }
        assert!(Observer::new("nan", f64::NAN, 0.0, 0.0).is_err());
    }

    #[test]
    fn parses_coordinate_string() {
        let station = Observer::from_coordinates("Poland", "51.097, 17.069", Some(116.0)).unwrap();
        assert_eq!(station.name(), "Poland");
        assert_eq!(station.latitude_deg(), 51.097);
        assert_eq!(station.longitude_deg(), 17.069);
        assert_eq!(station.altitude_m(), 116.0);

        assert!(Observer::from_coordinates("x", "51.0", None).is_err());
        assert!(Observer::from_coordinates("x", "north,17", None).is_err());
        assert!(Observer::from_coordinates("x", "95,17", None).is_err());
    }

    #[test]
    fn coordinate_input_defers_range_check() {
        let input = ObserverInput::from_coordinates("far north", "95.0, 2.35", None).unwrap();
        assert_eq!(input.latitude_deg, 95.0);
        assert_eq!(input.altitude_m, 0.0);
        assert!(matches!(
            input.validate(),
            Err(PredictError::InvalidObserver { .. })
        ));
        assert!(ObserverInput::from_coordinates("x", "1,2,3", None).is_err());
    }

    #[test]
    fn ecef_on_equator_is_equatorial_radius() {
        let station = Observer::new("eq", 0.0, 0.0, 0.0).unwrap();
        let [x, y, z] = station.position_ecef_km();
        assert!((x - EARTH_EQUATORIAL_RADIUS_KM).abs() < 1e-9);
        assert!(y.abs() < 1e-9);
        assert!(z.abs() < 1e-9);
    }
}
