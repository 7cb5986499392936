//! Port-assignment value types and compose port-spec parsing.

use crate::domain::error::UserError;

/// Upper bound on the scan: `default .. default + MAX_PORT_SCAN` candidates
/// are tried before giving up with a user error.
pub const MAX_PORT_SCAN: u16 = 1000;

/// One host-port assignment for a container-exposed service. Ephemeral —
/// exists only during one provisioning pass; its only durable effect is the
/// write into the environment mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortAssignment {
    pub container_name: String,
    pub host_env_var: String,
    pub default_port: u16,
    pub assigned_port: u16,
}

/// A parsed `"${VAR}:containerPort"` entry from a compose fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePort {
    pub host_env_var: String,
    pub default_port: u16,
}

/// Parse one compose port mapping.
///
/// The host side must be a `${VAR}` reference and the container side an
/// integer; anything else is a configuration error naming the module it
/// came from.
///
/// # Errors
///
/// Returns [`UserError::InvalidDefaultPort`] when the container-side port is
/// not an integer or the entry is not in `${VAR}:port` form.
pub fn parse_port_spec(module: &str, spec: &str) -> Result<ServicePort, UserError> {
    let invalid = || UserError::InvalidDefaultPort {
        module: module.to_string(),
        value: spec.to_string(),
    };

    let (host, container) = spec.split_once(':').ok_or_else(invalid)?;
    let host_env_var = host
        .strip_prefix("${")
        .and_then(|h| h.strip_suffix('}'))
        .ok_or_else(invalid)?;
    if host_env_var.is_empty() {
        return Err(invalid());
    }
    let default_port: u16 = container.trim().parse().map_err(|_| invalid())?;
    Ok(ServicePort {
        host_env_var: host_env_var.to_string(),
        default_port,
    })
}
