//! Station slot assignments
//!
//! The player only reads stations. The file format is a JSON object keyed
//! by slot number:
//!
//! ```json
//! {
//!   "1": { "name": "Jazz FM", "url": "https://jazz.example.com/live" },
//!   "3": { "name": "News", "url": "http://news.example.com/stream", "genre": "talk" }
//! }
//! ```

use crate::error::{Error, Result};
use pirad_common::{Slot, Station};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{info, warn};

/// Read access to the station assigned to each slot
pub trait StationLookup: Send + Sync {
    /// Station in `slot`, if one is assigned
    fn get(&self, slot: Slot) -> Option<Station>;

    /// Every slot with its station (or `None` when empty)
    fn all(&self) -> Vec<(Slot, Option<Station>)> {
        Slot::all().into_iter().map(|slot| (slot, self.get(slot))).collect()
    }
}

/// Stations loaded once from a JSON file
#[derive(Debug, Clone)]
pub struct JsonStationStore {
    stations: HashMap<Slot, Station>,
}

impl JsonStationStore {
    /// Load the station file
    ///
    /// A missing file gives an empty store. Entries with an invalid slot
    /// number or an unplayable station are skipped with a warning.
    pub fn load(path: &Path) -> Result<Self> {
        let mut store = Self {
            stations: HashMap::new(),
        };

        if !path.exists() {
            warn!("Station file {} not found, no stations assigned", path.display());
            return Ok(store);
        }

        let content = std::fs::read_to_string(path)?;
        let raw: BTreeMap<String, Station> = serde_json::from_str(&content).map_err(|e| {
            Error::Stations(format!("invalid station file {}: {}", path.display(), e))
        })?;

        for (key, station) in raw {
            let slot = match key.trim().parse::<u8>().map(Slot::try_from) {
                Ok(Ok(slot)) => slot,
                _ => {
                    warn!("Ignoring station entry with invalid slot '{}'", key);
                    continue;
                }
            };
            if let Err(e) = station.validate() {
                warn!("Ignoring station in slot {}: {}", slot, e);
                continue;
            }
            store.stations.insert(slot, station);
        }

        info!(
            "Loaded {} station(s) from {}",
            store.stations.len(),
            path.display()
        );
        Ok(store)
    }
}

impl StationLookup for JsonStationStore {
    fn get(&self, slot: Slot) -> Option<Station> {
        self.stations.get(&slot).cloned()
    }
}

/// In-memory stations, mainly for tests and mock setups
#[derive(Debug, Clone, Default)]
pub struct MemoryStations {
    stations: HashMap<Slot, Station>,
}

impl MemoryStations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a station to a slot
    pub fn with(mut self, slot: Slot, station: Station) -> Self {
        self.stations.insert(slot, station);
        self
    }
}

impl StationLookup for MemoryStations {
    fn get(&self, slot: Slot) -> Option<Station> {
        self.stations.get(&slot).cloned()
    }
}
