//! INI parsing: the single place where INI key names map to settings.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};

use super::file::{ConfigFile, ConfigFileError};

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [export] section
    if let Some(section) = ini.section(Some("export")) {
        if let Some(v) = section.get("max_dimension") {
            let value: u32 = parse_value("export", "max_dimension", v, "must be a positive integer")?;
            if value == 0 {
                return Err(invalid("export", "max_dimension", v, "must be greater than 0"));
            }
            config.export.max_dimension = value;
        }
        if let Some(v) = section.get("quality") {
            config.export.quality =
                parse_value("export", "quality", v, "must be one of: standard, high, ultra")?;
        }
    }

    // [output] section
    if let Some(section) = ini.section(Some("output")) {
        if let Some(v) = section.get("format") {
            config.output.format = parse_value("output", "format", v, "must be 'png' or 'jpeg'")?;
        }
        if let Some(v) = section.get("jpeg_quality") {
            let value: u8 = parse_value("output", "jpeg_quality", v, "must be 1-100")?;
            if !(1..=100).contains(&value) {
                return Err(invalid("output", "jpeg_quality", v, "must be 1-100"));
            }
            config.output.jpeg_quality = value;
        }
        if let Some(v) = non_empty(section, "directory") {
            config.output.directory = Some(expand_tilde(v));
        }
    }

    // [render] section
    if let Some(section) = ini.section(Some("render")) {
        let mut render = config.render;
        if let Some(v) = section.get("poll_interval_ms") {
            let ms = parse_value("render", "poll_interval_ms", v, "must be milliseconds")?;
            render = render.with_poll_interval(Duration::from_millis(ms));
        }
        if let Some(v) = section.get("max_checks") {
            render = render.with_max_checks(parse_value(
                "render",
                "max_checks",
                v,
                "must be a positive integer",
            )?);
        }
        if let Some(v) = section.get("settle_delay_ms") {
            let ms = parse_value("render", "settle_delay_ms", v, "must be milliseconds")?;
            render = render.with_settle_delay(Duration::from_millis(ms));
        }
        if let Some(v) = section.get("slice_height") {
            render = render.with_target_slice_height(parse_value(
                "render",
                "slice_height",
                v,
                "must be a positive integer (pixels)",
            )?);
        }
        if let Some(v) = section.get("stride") {
            render = render.with_stride(parse_value(
                "render",
                "stride",
                v,
                "must be a positive integer",
            )?);
        }
        if let Some(v) = section.get("tile_wait_checks") {
            render = render.with_tile_wait_checks(parse_value(
                "render",
                "tile_wait_checks",
                v,
                "must be a non-negative integer",
            )?);
        }
        config.render = render;
    }

    // [imagery] section
    if let Some(section) = ini.section(Some("imagery")) {
        if let Some(v) = non_empty(section, "url_template") {
            if !(v.contains("{z}") && v.contains("{x}") && v.contains("{y}")) {
                return Err(invalid(
                    "imagery",
                    "url_template",
                    v,
                    "must contain {z}, {x} and {y} placeholders",
                ));
            }
            config.imagery.url_template = Some(v.to_string());
        }
        if let Some(v) = section.get("timeout_secs") {
            config.imagery.timeout_secs =
                parse_value("imagery", "timeout_secs", v, "must be a positive integer (seconds)")?;
        }
    }

    // [store] section
    if let Some(section) = ini.section(Some("store")) {
        if let Some(v) = section.get("spill_to_disk") {
            config.store.spill_to_disk = parse_bool(v)
                .ok_or_else(|| invalid("store", "spill_to_disk", v, "must be true or false"))?;
        }
        if let Some(v) = section.get("spill_threshold_mb") {
            config.store.spill_threshold_mb = parse_value(
                "store",
                "spill_threshold_mb",
                v,
                "must be a non-negative integer (megabytes)",
            )?;
        }
    }

    Ok(config)
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

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
