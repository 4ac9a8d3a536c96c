use chrono::Duration;
use serde::{de, Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use thiserror::Error;

use log::warn;

use crate::predict::{
    EngineSettings, ObserverInput, PredictError, SearchSettings, Sgp4Propagator,
    DEFAULT_COARSE_STEP, DEFAULT_MAX_EPOCH_OFFSET, DEFAULT_MIN_PASS_DURATION, DEFAULT_TOLERANCE,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tle_folder: PathBuf,
    pub log_level: String,
    pub stations: Vec<StationConfig>,
    pub prediction: PredictionConfig,
    pub freshness: FreshnessConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    pub name: String,
    pub coordinates: String,
    #[serde(default)]
    pub altitude_m: f64,
}

impl StationConfig {
    /// Unvalidated observer for this station. Coordinates that do not parse
    /// become NaN so the engine rejects only this station.
    pub fn observer_input(&self) -> ObserverInput {
        ObserverInput::from_coordinates(&self.name, &self.coordinates, Some(self.altitude_m))
            .unwrap_or_else(|e| {
                warn!("Station {}: {}", self.name, e);
                ObserverInput {
                    name: self.name.clone(),
                    latitude_deg: f64::NAN,
                    longitude_deg: f64::NAN,
                    altitude_m: self.altitude_m,
                }
            })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    pub min_elevation_deg: f64,
    #[serde(deserialize_with = "deserialize_duration")]
    pub coarse_step: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub tolerance: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub min_pass_duration: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub max_epoch_offset: Duration,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FreshnessConfig {
    pub fresh_days: f64,
    pub acceptable_days: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tle_folder: PathBuf::from("./tle"),
            log_level: "info".to_string(),
            stations: vec![
                StationConfig {
                    name: "Sweden".to_string(),
                    coordinates: "65.337,21.425".to_string(),
                    altitude_m: 21.0,
                },
                StationConfig {
                    name: "Poland".to_string(),
                    coordinates: "51.097,17.069".to_string(),
                    altitude_m: 116.0,
                },
            ],
            prediction: PredictionConfig::default(),
            freshness: FreshnessConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            min_elevation_deg: 3.0,
            coarse_step: DEFAULT_COARSE_STEP,
            tolerance: DEFAULT_TOLERANCE,
            min_pass_duration: DEFAULT_MIN_PASS_DURATION,
            max_epoch_offset: DEFAULT_MAX_EPOCH_OFFSET,
        }
    }
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        let settings = EngineSettings::default();
        Self {
            fresh_days: settings.fresh_days,
            acceptable_days: settings.acceptable_days,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let min_elevation = self.prediction.min_elevation_deg;
        if !(-90.0..=90.0).contains(&min_elevation) {
            return Err(ConfigError::Invalid(format!(
                "prediction.min_elevation_deg {} outside -90..90",
                min_elevation
            )));
        }
        self.engine_settings()
            .search
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.prediction.max_epoch_offset <= Duration::zero() {
            return Err(ConfigError::Invalid(
                "prediction.max_epoch_offset must be positive".into(),
            ));
        }
        if self.freshness.fresh_days < 0.0 {
            return Err(ConfigError::Invalid(
                "freshness.fresh_days must not be negative".into(),
            ));
        }
        if self.batch.workers == 0 {
            return Err(ConfigError::Invalid(
                "batch.workers must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Stations as observer inputs. Ranges are checked per observer when
    /// the day report is built.
    pub fn observer_inputs(&self) -> Vec<ObserverInput> {
        self.stations.iter().map(StationConfig::observer_input).collect()
    }

    pub fn find_station(&self, name: &str) -> Option<&StationConfig> {
        self.stations
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Resolve a command-line station: either the name of a configured
    /// station or `name:lat,lon[,alt_m]`.
    pub fn station_input(&self, arg: &str) -> Result<ObserverInput, ConfigError> {
        let Some((name, coordinates)) = arg.split_once(':') else {
            return self
                .find_station(arg.trim())
                .map(StationConfig::observer_input)
                .ok_or_else(|| ConfigError::Invalid(format!("unknown station \"{}\"", arg)));
        };

        let invalid = |e: PredictError| ConfigError::Invalid(e.to_string());
        let name = name.trim();
        match coordinates.rsplitn(3, ',').collect::<Vec<_>>().as_slice() {
            [altitude, lon, lat] => {
                let altitude_m = altitude.trim().parse().map_err(|e| {
                    ConfigError::Invalid(format!("station {} altitude: {}", name, e))
                })?;
                ObserverInput::from_coordinates(name, &format!("{},{}", lat, lon), Some(altitude_m))
                    .map_err(invalid)
            }
            _ => ObserverInput::from_coordinates(name, coordinates, None).map_err(invalid),
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            search: SearchSettings {
                coarse_step: self.prediction.coarse_step,
                tolerance: self.prediction.tolerance,
            },
            min_pass_duration: self.prediction.min_pass_duration,
            fresh_days: self.freshness.fresh_days,
            acceptable_days: self.freshness.acceptable_days,
        }
    }

    pub fn propagator(&self) -> Sgp4Propagator {
        Sgp4Propagator::new(self.prediction.max_epoch_offset)
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim())
        .map_err(de::Error::custom)
        .and_then(|d| Duration::from_std(d).map_err(de::Error::custom))
}
