use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::predict::{OrbitalElementSet, PredictError};

/// Element sets imported from a directory of `.tle` / `.txt` files.
pub struct TleLoader {
    tle_dir: PathBuf,
    satellites: HashMap<u64, OrbitalElementSet>,
}

impl TleLoader {
    pub fn new(tle_dir: PathBuf) -> Self {
        Self {
            tle_dir,
            satellites: HashMap::new(),
        }
    }

    /// Load all TLE files from the directory. Files that fail to parse are
    /// logged and skipped.
    pub fn load_all(&mut self) -> Result<(), PredictError> {
        if !self.tle_dir.is_dir() {
            return Err(PredictError::DirectoryNotFound(
                self.tle_dir.display().to_string(),
            ));
        }

        self.satellites.clear();

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.tle_dir)? {
            let path = entry?.path();
            let is_tle = path
                .extension()
                .is_some_and(|ext| ext == "tle" || ext == "txt");
            if path.is_file() && is_tle {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            match parse_tle_file(&path) {
                Ok(sets) => {
                    for set in sets {
                        self.insert(set);
                    }
                }
                Err(e) => {
                    log::warn!("Failed to parse TLE file {}: {}", path.display(), e);
                }
            }
        }

        log::info!(
            "Loaded {} element sets from {}",
            self.satellites.len(),
            self.tle_dir.display()
        );
        Ok(())
    }

    /// Keep the newest epoch per catalog number.
    fn insert(&mut self, set: OrbitalElementSet) {
        match self.satellites.get(&set.norad_id) {
            Some(existing) if !set.is_newer_than(existing) => {
                log::debug!(
                    "Ignoring element set for {} with epoch {} (have {})",
                    set.norad_id,
                    set.epoch,
                    existing.epoch
                );
            }
            _ => {
                self.satellites.insert(set.norad_id, set);
            }
        }
    }

    pub fn satellites(&self) -> Vec<&OrbitalElementSet> {
        let mut sets: Vec<_> = self.satellites.values().collect();
        sets.sort_by_key(|s| s.norad_id);
        sets
    }

    pub fn by_norad_id(&self, norad_id: u64) -> Option<&OrbitalElementSet> {
        self.satellites.get(&norad_id)
    }

    pub fn by_name(&self, name: &str) -> Option<&OrbitalElementSet> {
        self.satellites
            .values()
            .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
    }
}

/// Parse a single TLE file (may contain multiple satellites). Any invalid
/// entry fails the whole file.
pub fn parse_tle_file(path: &Path) -> Result<Vec<OrbitalElementSet>, PredictError> {
    let content = fs::read_to_string(path)?;
    parse_multi_tle(&content)
        .into_iter()
        .map(|(name, line1, line2)| OrbitalElementSet::from_lines(name, line1, line2))
        .collect()
}

/// Split multi-satellite TLE content into `(name, line1, line2)` entries.
pub fn parse_multi_tle(content: &str) -> Vec<(Option<&str>, &str, &str)> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut result = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].starts_with("1 ") && i + 1 < lines.len() && lines[i + 1].starts_with("2 ") {
            // 2-line TLE (no name)
            result.push((None, lines[i], lines[i + 1]));
            i += 2;
        } else if i + 2 < lines.len()
            && lines[i + 1].starts_with("1 ")
            && lines[i + 2].starts_with("2 ")
        {
            // 3-line TLE (with name)
            result.push((Some(lines[i]), lines[i + 1], lines[i + 2]));
            i += 3;
        } else {
            log::debug!("Skipping unrecognised TLE line: {}", lines[i]);
            i += 1;
        }
    }

    result
}
