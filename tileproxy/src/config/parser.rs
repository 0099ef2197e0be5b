//! INI parsing logic for converting `Ini` into [`ConfigFile`].
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::prefetch::split_provider_list;
use crate::provider::{FallbackBreaker, ProviderDescriptor, ProviderKind};

/// Prefix of provider section names: `[provider.NAME]`.
pub const PROVIDER_SECTION_PREFIX: &str = "provider.";

/// Prefix of custom header keys inside a provider section.
pub const HEADER_KEY_PREFIX: &str = "header.";

/// Parses an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [server] section
    if let Some(section) = ini.section(Some("server")) {
        if let Some(v) = section.get("bind") {
            let v = v.trim();
            if !v.is_empty() {
                config.server.bind = v.to_string();
            }
        }
        if let Some(v) = section.get("port") {
            config.server.port = parse_value("server", "port", v, "must be a port number")?;
        }
        if let Some(v) = section.get("telemetry") {
            config.server.telemetry = parse_bool("server", "telemetry", v)?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            config.logging.directory = (!v.is_empty()).then(|| expand_tilde(v));
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
        if let Some(v) = section.get("debug") {
            config.logging.debug = parse_bool("logging", "debug", v)?;
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("path") {
            let v = v.trim();
            if !v.is_empty() {
                config.cache.path = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("active") {
            config.cache.active = parse_bool("cache", "active", v)?;
        }
        if let Some(v) = section.get("maxage") {
            config.cache.max_age_hours =
                parse_value("cache", "maxage", v, "must be a whole number of hours")?;
        }
    }

    // [prefetch] section
    if let Some(section) = ini.section(Some("prefetch")) {
        if let Some(v) = section.get("workers") {
            let workers: usize =
                parse_value("prefetch", "workers", v, "must be a positive integer")?;
            if workers == 0 {
                return Err(invalid("prefetch", "workers", v, "must be a positive integer"));
            }
            config.prefetch.workers = workers;
        }
        if let Some(v) = section.get("blacklist") {
            config.prefetch.blacklist = split_provider_list(v);
        }
    }

    // [provider.NAME] sections
    for (name, section) in ini.iter() {
        let Some(provider) = name.and_then(|n| n.strip_prefix(PROVIDER_SECTION_PREFIX)) else {
            continue;
        };
        config.providers.push(parse_provider(provider.trim(), section)?);
    }

    Ok(config)
}

fn parse_provider(name: &str, section: &Properties) -> Result<ProviderDescriptor, ConfigFileError> {
    let section_name = format!("{}{}", PROVIDER_SECTION_PREFIX, name);
    if name.is_empty() {
        return Err(invalid(&section_name, "", "", "provider name must not be empty"));
    }

    let kind_value = section
        .get("type")
        .ok_or_else(|| invalid(&section_name, "type", "", "missing provider type"))?;
    let kind = ProviderKind::from_str(kind_value).map_err(|_| {
        invalid(
            &section_name,
            "type",
            kind_value,
            "must be one of: wms, tms, xyz, archive",
        )
    })?;

    let mut descriptor = ProviderDescriptor::new(name, kind);

    if let Some(v) = section.get("url") {
        descriptor.url = v.trim().to_string();
    }
    if let Some(v) = section.get("path") {
        let v = v.trim();
        if !v.is_empty() {
            descriptor.path = Some(expand_tilde(v));
        }
    }
    if let Some(v) = section.get("layers") {
        descriptor.layers = v.trim().to_string();
    }
    if let Some(v) = section.get("format") {
        let v = v.trim();
        if !v.is_empty() {
            descriptor.format = v.to_string();
        }
    }
    if let Some(v) = section.get("styles") {
        descriptor.styles = v.trim().to_string();
    }
    if let Some(v) = section.get("version") {
        let v = v.trim();
        if !v.is_empty() {
            descriptor.version = v.to_string();
        }
    }
    if let Some(v) = section.get("nocache") {
        descriptor.cacheable = !parse_bool(&section_name, "nocache", v)?;
    }
    if let Some(v) = section.get("noprefetch") {
        descriptor.prefetchable = !parse_bool(&section_name, "noprefetch", v)?;
    }
    if let Some(v) = section.get("fallback") {
        let v = v.trim();
        descriptor.fallback = (!v.is_empty()).then(|| v.to_string());
    }
    if let Some(v) = section.get("fallback_breaker") {
        descriptor.fallback_breaker = FallbackBreaker::from_str(v)
            .map_err(|reason| invalid(&section_name, "fallback_breaker", v, &reason))?;
    }

    for (key, value) in section.iter() {
        if let Some(header) = key.strip_prefix(HEADER_KEY_PREFIX) {
            let header = header.trim();
            if header.is_empty() {
                return Err(invalid(&section_name, key, value, "header name must not be empty"));
            }
            descriptor
                .headers
                .insert(header.to_string(), value.trim().to_string());
        }
    }

    if kind.is_remote() && descriptor.url.is_empty() {
        return Err(invalid(&section_name, "url", "", "required for remote providers"));
    }
    if kind == ProviderKind::Archive && descriptor.path.is_none() {
        return Err(invalid(&section_name, "path", "", "required for archive providers"));
    }

    Ok(descriptor)
}

fn parse_value<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn parse_bool(section: &str, key: &str, value: &str) -> Result<bool, ConfigFileError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(section, key, value, "must be true or false")),
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Expands a leading `~` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::DEFAULT_PORT;

    fn parse(content: &str) -> Result<ConfigFile, ConfigFileError> {
        parse_ini(&Ini::load_from_str(content).unwrap())
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(!config.cache.active);
        assert_eq!(config.cache.max_age_hours, 0);
        assert_eq!(config.prefetch.workers, 16);
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_full_file() {
        let config = parse(
            r#"
[server]
port = 9000

[logging]
directory = /var/log/tileproxy
file = proxy.log
debug = true

[cache]
path = /srv/cache
active = true
maxage = 168

[prefetch]
workers = 4
blacklist = example.org, other.net

[provider.osm]
type = xyz
url = https://tile.example.org
header.Referer = https://my.site
header.X-Api-Key = secret

[provider.sea]
type = mbtiles
path = /data/sea.mbtiles
fallback = osm
fallback_breaker = never

[provider.dop]
type = wms
url = https://wms.example.org/service?map=dop
layers = dop20
nocache = true
noprefetch = yes
"#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(
            config.logging.directory,
            Some(PathBuf::from("/var/log/tileproxy"))
        );
        assert_eq!(config.logging.file, "proxy.log");
        assert!(config.logging.debug);
        assert_eq!(config.cache.path, PathBuf::from("/srv/cache"));
        assert!(config.cache.active);
        assert_eq!(config.cache.max_age_hours, 168);
        assert_eq!(config.prefetch.workers, 4);
        assert_eq!(config.prefetch.blacklist, vec!["example.org", "other.net"]);

        assert_eq!(config.providers.len(), 3);
        let osm = &config.providers[0];
        assert_eq!(osm.name, "osm");
        assert_eq!(osm.kind, ProviderKind::Xyz);
        assert_eq!(osm.headers.get("Referer").unwrap(), "https://my.site");
        assert_eq!(osm.headers.get("X-Api-Key").unwrap(), "secret");
        assert!(osm.cacheable);
        assert!(osm.prefetchable);

        let sea = &config.providers[1];
        assert_eq!(sea.kind, ProviderKind::Archive);
        assert_eq!(sea.path, Some(PathBuf::from("/data/sea.mbtiles")));
        assert_eq!(sea.fallback.as_deref(), Some("osm"));
        assert_eq!(sea.fallback_breaker, FallbackBreaker::Never);

        let dop = &config.providers[2];
        assert_eq!(dop.kind, ProviderKind::Wms);
        assert_eq!(dop.layers, "dop20");
        assert!(!dop.cacheable);
        assert!(!dop.prefetchable);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = parse("[provider.bad]\ntype = wmts\nurl = https://x.example\n").unwrap_err();
        match err {
            ConfigFileError::InvalidValue {
                section, key, value, ..
            } => {
                assert_eq!(section, "provider.bad");
                assert_eq!(key, "type");
                assert_eq!(value, "wmts");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_missing_type_rejected() {
        assert!(matches!(
            parse("[provider.bad]\nurl = https://x.example\n"),
            Err(ConfigFileError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_remote_provider_requires_url() {
        assert!(matches!(
            parse("[provider.osm]\ntype = xyz\n"),
            Err(ConfigFileError::InvalidValue { key, .. }) if key == "url"
        ));
    }

    #[test]
    fn test_archive_requires_path() {
        assert!(matches!(
            parse("[provider.sea]\ntype = archive\n"),
            Err(ConfigFileError::InvalidValue { key, .. }) if key == "path"
        ));
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        assert!(parse("[server]\nport = http\n").is_err());
        assert!(parse("[cache]\nmaxage = -1\n").is_err());
        assert!(parse("[prefetch]\nworkers = 0\n").is_err());
        assert!(parse("[cache]\nactive = maybe\n").is_err());
    }

    #[test]
    fn test_invalid_breaker_rejected() {
        assert!(parse(
            "[provider.sea]\ntype = archive\npath = a.mbtiles\nfallback_breaker = sometimes\n"
        )
        .is_err());
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_tilde("rel"), PathBuf::from("rel"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/cache"), home.join("cache"));
        }
    }
}
