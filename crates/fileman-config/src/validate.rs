//! Validation helpers and parsing utilities for environment-provided settings.

use std::net::IpAddr;

use crate::error::{ConfigError, ConfigResult};

fn invalid(field: &'static str, reason: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidField {
        field,
        reason,
        value: Some(value.to_string()),
    }
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn parse_port(value: &str, field: &'static str) -> ConfigResult<u16> {
    let port = value
        .trim()
        .parse::<u32>()
        .map_err(|_| invalid(field, "not_an_integer", value))?;
    if !(1..=65_535).contains(&port) {
        return Err(invalid(field, "out_of_range", value));
    }
    u16::try_from(port).map_err(|_| invalid(field, "out_of_range", value))
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn parse_bind_addr(value: &str, field: &'static str) -> ConfigResult<IpAddr> {
    let Some(host) = value.trim().split('/').next() else {
        return Err(invalid(field, "invalid_bind_addr", value));
    };
    host.parse::<IpAddr>()
        .map_err(|_| invalid(field, "invalid_bind_addr", value))
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn parse_positive(value: &str, field: &'static str) -> ConfigResult<usize> {
    let parsed = value
        .trim()
        .parse::<usize>()
        .map_err(|_| invalid(field, "not_an_integer", value))?;
    if parsed == 0 {
        return Err(invalid(field, "must_be_positive", value));
    }
    Ok(parsed)
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn parse_seconds(value: &str, field: &'static str) -> ConfigResult<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| invalid(field, "not_an_integer", value))
}
