//! Provider configuration types
//!
//! A [`ProviderDescriptor`] is the validated form of one `[provider.NAME]`
//! section. The registry builds exactly one adapter per descriptor.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// Default WMS image format.
pub const DEFAULT_WMS_FORMAT: &str = "image/png";

/// Default WMS protocol version.
pub const DEFAULT_WMS_VERSION: &str = "1.3.0";

/// Upstream hosts whose terms of use forbid bulk downloading.
///
/// A provider whose URL contains any of these (case-insensitive) is never
/// prefetched, whatever its own settings say.
pub const DEFAULT_PREFETCH_BLACKLIST: &[&str] = &[
    "openstreetmap.org",
    "openstreetmap.de",
    "google.com",
    "googleapis.com",
    "virtualearth.net",
    "bing.com",
    "arcgisonline.com",
    "mapbox.com",
    "thunderforest.com",
    "stadiamaps.com",
];

/// Upstream protocol of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// OGC Web Map Service, queried by bounding box
    Wms,
    /// Tile Map Service, row 0 at the south edge
    Tms,
    /// Slippy-map XYZ, row 0 at the north edge
    Xyz,
    /// Local MBTiles archive
    Archive,
}

impl ProviderKind {
    /// Canonical configuration name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Wms => "wms",
            ProviderKind::Tms => "tms",
            ProviderKind::Xyz => "xyz",
            ProviderKind::Archive => "archive",
        }
    }

    /// Returns true for kinds fetched over HTTP.
    pub fn is_remote(&self) -> bool {
        !matches!(self, ProviderKind::Archive)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a provider type string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown provider type '{0}' (expected wms, tms, xyz or archive)")]
pub struct UnknownProviderKind(pub String);

impl FromStr for ProviderKind {
    type Err = UnknownProviderKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wms" => Ok(ProviderKind::Wms),
            "tms" => Ok(ProviderKind::Tms),
            "xyz" => Ok(ProviderKind::Xyz),
            "archive" | "mbtiles" => Ok(ProviderKind::Archive),
            _ => Err(UnknownProviderKind(s.to_string())),
        }
    }
}

/// What happens to an archive's fallback after it fails to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackBreaker {
    /// The first resolution failure disables the fallback for the rest of
    /// the process lifetime.
    #[default]
    Permanent,
    /// Resolution is retried on every request.
    Never,
}

impl FromStr for FallbackBreaker {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permanent" => Ok(FallbackBreaker::Permanent),
            "never" => Ok(FallbackBreaker::Never),
            other => Err(format!(
                "unknown fallback breaker '{}' (expected permanent or never)",
                other
            )),
        }
    }
}

/// Static description of one configured provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderDescriptor {
    /// Name used in request paths
    pub name: String,
    /// Upstream protocol
    pub kind: ProviderKind,
    /// Base URL for remote kinds
    pub url: String,
    /// Archive file for [`ProviderKind::Archive`]
    pub path: Option<PathBuf>,
    /// WMS layers
    pub layers: String,
    /// WMS image format
    pub format: String,
    /// WMS styles
    pub styles: String,
    /// WMS version
    pub version: String,
    /// Extra request headers, overriding the client defaults
    pub headers: BTreeMap<String, String>,
    /// Whether fetched tiles go into the cache
    pub cacheable: bool,
    /// False when the provider opted out of prefetching
    pub prefetchable: bool,
    /// Provider consulted when an archive has no tile
    pub fallback: Option<String>,
    /// Fallback failure policy
    pub fallback_breaker: FallbackBreaker,
}

impl ProviderDescriptor {
    /// Creates a descriptor with defaults for every optional field.
    pub fn new(name: impl Into<String>, kind: ProviderKind) -> Self {
        Self {
            name: name.into(),
            kind,
            url: String::new(),
            path: None,
            layers: String::new(),
            format: DEFAULT_WMS_FORMAT.to_string(),
            styles: String::new(),
            version: DEFAULT_WMS_VERSION.to_string(),
            headers: BTreeMap::new(),
            cacheable: true,
            prefetchable: true,
            fallback: None,
            fallback_breaker: FallbackBreaker::default(),
        }
    }

    /// Sets the base URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the archive path.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the fallback provider name.
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    /// Sets the fallback breaker policy.
    pub fn with_fallback_breaker(mut self, breaker: FallbackBreaker) -> Self {
        self.fallback_breaker = breaker;
        self
    }

    /// Adds a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Header list in the shape the HTTP client expects.
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Returns true if `url` matches any blacklist entry (case-insensitive).
pub fn is_blacklisted<S: AsRef<str>>(url: &str, blacklist: &[S]) -> bool {
    let url = url.to_ascii_lowercase();
    blacklist.iter().any(|entry| {
        let entry = entry.as_ref().trim();
        !entry.is_empty() && url.contains(&entry.to_ascii_lowercase())
    })
}
