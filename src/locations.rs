/// Registry of named study locations.
///
/// Defines the preset points the analyses are run against. This is the
/// single source of truth for location coordinates; other modules and the
/// CLI should look locations up here rather than hardcoding lat/lon pairs.

// ---------------------------------------------------------------------------
// Location metadata
// ---------------------------------------------------------------------------

/// A named point of interest.
pub struct Location {
    /// Short lowercase key used on the command line.
    pub key: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// WGS84 latitude, degrees north.
    pub latitude: f64,
    /// WGS84 longitude, degrees east in [-180, 180].
    pub longitude: f64,
}

/// All preset locations.
///
/// Longitudes are given in the signed convention; point extraction wraps
/// them onto 0–360 grids when longitude wrapping is enabled.
pub static LOCATION_REGISTRY: &[Location] = &[
    Location {
        key: "nyc",
        name: "New York City, NY",
        latitude: 40.7128,
        longitude: -74.0060,
    },
    Location {
        key: "chicago",
        name: "Chicago, IL",
        latitude: 41.8781,
        longitude: -87.6298,
    },
    Location {
        key: "denver",
        name: "Denver, CO",
        latitude: 39.7392,
        longitude: -104.9903,
    },
    Location {
        key: "seattle",
        name: "Seattle, WA",
        latitude: 47.6062,
        longitude: -122.3321,
    },
];

/// The location analysed when none is configured.
pub const DEFAULT_LOCATION: &str = "nyc";

/// Looks up a location by key, case-insensitively. Returns `None` if not found.
pub fn find_location(key: &str) -> Option<&'static Location> {
    LOCATION_REGISTRY
        .iter()
        .find(|l| l.key.eq_ignore_ascii_case(key))
}

/// Returns all location keys, in registry order.
pub fn all_location_keys() -> Vec<&'static str> {
    LOCATION_REGISTRY.iter().map(|l| l.key).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
