//! Host-port assignment for container-exposed services.
//!
//! Runs strictly after environment resolution has completed: the manager
//! takes the fully built mapping and mutates it only through
//! [`EnvironmentVariables::put`]. Same-session claims are tracked in an
//! explicit map rather than by re-reading the environment, so the ordering
//! dependency is structural.

use std::collections::HashMap;

use anyhow::Result;
use quarry_common::ComposeFragment;

use crate::application::ports::{PortProbe, Reporter};
use crate::domain::{
    EnvironmentVariables, MAX_PORT_SCAN, PortAssignment, ServicePort, UserError, parse_port_spec,
};

/// Assigns collision-free host ports, one invocation at a time.
///
/// No cross-process locking: two concurrent CLI invocations against the
/// same host can race on port selection.
pub struct PortManager<'a, P: PortProbe> {
    probe: &'a P,
    /// Ports already published by running containers, scanned once up front.
    published: Vec<u16>,
    /// Ports claimed earlier in this invocation, by env var.
    claims: HashMap<u16, String>,
}

impl<'a, P: PortProbe> PortManager<'a, P> {
    #[must_use]
    pub fn new(probe: &'a P, published: Vec<u16>) -> Self {
        Self {
            probe,
            published,
            claims: HashMap::new(),
        }
    }

    /// Assign a host port for every `"${VAR}:containerPort"` mapping in the
    /// given module fragments, writing each result into `env` and logging a
    /// reachable endpoint.
    ///
    /// # Errors
    ///
    /// Returns a [`UserError`] for a non-integer default port (naming the
    /// module) or when no port is available within the scan range.
    pub async fn set_external_ports(
        &mut self,
        modules: &[(&str, &ComposeFragment)],
        env: &mut EnvironmentVariables,
        reporter: &dyn Reporter,
    ) -> Result<Vec<PortAssignment>> {
        let mut assignments = Vec::new();
        for (module, fragment) in modules {
            for (service, spec) in &fragment.services {
                let container = fragment.container_name(service).to_string();
                for port_entry in &spec.ports {
                    let port = parse_port_spec(module, port_entry)?;
                    let assigned = self.scan(&port).await?;
                    self.claims.insert(assigned, port.host_env_var.clone());
                    env.put(&port.host_env_var, assigned.to_string());
                    reporter.info(&format!("{container} available at localhost:{assigned}"));
                    assignments.push(PortAssignment {
                        container_name: container.clone(),
                        host_env_var: port.host_env_var,
                        default_port: port.default_port,
                        assigned_port: assigned,
                    });
                }
            }
        }
        Ok(assignments)
    }

    /// Walk candidates upward from the declared default until one is free.
    /// The chosen port is never below the default.
    async fn scan(&self, port: &ServicePort) -> Result<u16, UserError> {
        let start = port.default_port;
        for offset in 0..MAX_PORT_SCAN {
            let Some(candidate) = start.checked_add(offset) else {
                break;
            };
            if let Some(owner) = self.claims.get(&candidate) {
                // The same variable may re-use its own claim (compose
                // substitutes it once); a different variable may not.
                if *owner != port.host_env_var {
                    continue;
                }
            }
            if self.published.contains(&candidate) {
                continue;
            }
            if self.probe.can_bind(candidate).await {
                return Ok(candidate);
            }
        }
        Err(UserError::NoAvailablePort {
            var: port.host_env_var.clone(),
            start,
            end: u32::from(start) + u32::from(MAX_PORT_SCAN),
        })
    }
}
