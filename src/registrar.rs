//! Per-child resource registration.
//!
//! The [`Registrar`] turns one [`ResourceDescriptor`] into a live
//! [`ControlEndpoint`] or a reason for skipping it. Steps run in a fixed
//! order and the first failure ends the attempt for that child only:
//!
//! 1. capacity check ([`RegisterOutcome::CapacityReached`])
//! 2. read the label ([`SkipReason::MissingLabel`])
//! 3. map label to a resource ([`SkipReason::UnknownLabel`])
//! 4. publish the endpoint name ([`SkipReason::RegistrationFailed`])
//! 5. resolve the line reference ([`SkipReason::LineResolutionFailed`])
//! 6. acquire the line, inactive ([`SkipReason::LineAcquisitionFailed`])
//!
//! A failure in steps 5 or 6 drops the registration taken in step 4, so a
//! skipped child never leaves a published name behind.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::driver::DriverContext;
use crate::endpoint::ControlEndpoint;
use crate::error::{LedError, LineFailure};
use crate::line::LineController;
use crate::registry::{EndpointRegistry, Registration};
use crate::resource::ResourceKind;
use crate::tree::{ResourceDescriptor, LABEL_PROPERTY};

/// Why a child was not registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No readable `label` property
    MissingLabel,
    /// Label not in the resource table
    UnknownLabel,
    /// Registration service refused the name
    RegistrationFailed,
    /// `gpios` missing or malformed
    LineResolutionFailed,
    /// Line controller refused the line
    LineAcquisitionFailed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MissingLabel => "missing label",
            Self::UnknownLabel => "unknown label",
            Self::RegistrationFailed => "registration failed",
            Self::LineResolutionFailed => "line resolution failed",
            Self::LineAcquisitionFailed => "line acquisition failed",
        };
        f.write_str(s)
    }
}

/// Result of one registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// Endpoint created and appended to the context
    Registered { name: String, minor: u32 },
    /// Child skipped; bring-up continues with the next child
    Skipped { reason: SkipReason, error: LedError },
    /// Context is full; no further children should be visited
    CapacityReached,
}

/// Creates endpoints from descriptors.
pub struct Registrar {
    registry: Arc<dyn EndpointRegistry>,
    lines: Arc<dyn LineController>,
}

impl Registrar {
    /// Create a registrar backed by the given services.
    pub fn new(registry: Arc<dyn EndpointRegistry>, lines: Arc<dyn LineController>) -> Self {
        Self { registry, lines }
    }

    /// Attempt to register one child into `context`.
    pub fn register(
        &self,
        descriptor: &ResourceDescriptor<'_>,
        context: &mut DriverContext,
    ) -> RegisterOutcome {
        if context.is_full() {
            debug!(
                capacity = context.capacity(),
                "Capacity reached, not inspecting '{}'",
                descriptor.node_name()
            );
            return RegisterOutcome::CapacityReached;
        }

        match self.build_endpoint(descriptor) {
            Ok(endpoint) => {
                let name = endpoint.name().to_string();
                let minor = endpoint.minor();
                match context.push(endpoint) {
                    Ok(()) => RegisterOutcome::Registered { name, minor },
                    Err(endpoint) => {
                        endpoint.release();
                        RegisterOutcome::CapacityReached
                    }
                }
            }
            Err((reason, err)) => {
                log_skip(descriptor, reason, &err);
                RegisterOutcome::Skipped { reason, error: err }
            }
        }
    }

    fn build_endpoint(
        &self,
        descriptor: &ResourceDescriptor<'_>,
    ) -> Result<ControlEndpoint, (SkipReason, LedError)> {
        let label = descriptor.label().map_err(|source| {
            (
                SkipReason::MissingLabel,
                LedError::Configuration {
                    node: descriptor.node_name().to_string(),
                    property: LABEL_PROPERTY,
                    source,
                },
            )
        })?;

        let kind = ResourceKind::from_label(label).ok_or_else(|| {
            (
                SkipReason::UnknownLabel,
                LedError::UnknownResource {
                    label: label.to_string(),
                },
            )
        })?;

        let registration = Registration::acquire(&self.registry, label).map_err(|source| {
            (
                SkipReason::RegistrationFailed,
                LedError::Registration {
                    name: label.to_string(),
                    source,
                },
            )
        })?;

        let line = descriptor.line_ref().map_err(|e| {
            (
                SkipReason::LineResolutionFailed,
                LedError::LineUnavailable {
                    name: label.to_string(),
                    reason: LineFailure::Resolution(e),
                },
            )
        })?;

        let handle = self.lines.request_output(line, label).map_err(|e| {
            (
                SkipReason::LineAcquisitionFailed,
                LedError::LineUnavailable {
                    name: label.to_string(),
                    reason: LineFailure::Acquisition(e),
                },
            )
        })?;

        debug!(line = %line, "Acquired line for '{}'", label);
        Ok(ControlEndpoint::new(kind, registration, handle))
    }
}

fn log_skip(descriptor: &ResourceDescriptor<'_>, reason: SkipReason, err: &LedError) {
    let node = descriptor.node_name();
    match reason {
        SkipReason::UnknownLabel => warn!(node, %reason, "{}", err),
        _ => error!(node, %reason, "{}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::sim::SimulatedLines;
    use crate::line::LineError;
    use crate::registry::{MiscRegistry, RegistryError};
    use crate::tree::{ConfigNode, PropertyError, LINE_PROPERTY};

    struct Fixture {
        lines: SimulatedLines,
        registry: MiscRegistry,
        registrar: Registrar,
    }

    fn fixture_with(registry: MiscRegistry) -> Fixture {
        let lines = SimulatedLines::new(32);
        let registrar = Registrar::new(Arc::new(registry.clone()), Arc::new(lines.clone()));
        Fixture {
            lines,
            registry,
            registrar,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(MiscRegistry::new())
    }

    fn led(label: &str, line: i64) -> ConfigNode {
        ConfigNode::new(format!("node-{}", label))
            .with_property(LABEL_PROPERTY, label)
            .with_property(LINE_PROPERTY, toml::Value::Array(vec![line.into()]))
    }

    fn context() -> DriverContext {
        DriverContext::with_capacity("leds", 3).unwrap()
    }

    #[test]
    fn test_registers_valid_child() {
        let f = fixture();
        let mut ctx = context();
        let node = led("ledgreen", 22);

        let outcome = f.registrar.register(&ResourceDescriptor::new(&node), &mut ctx);
        assert_eq!(
            outcome,
            RegisterOutcome::Registered {
                name: "ledgreen".to_string(),
                minor: 0
            }
        );
        assert_eq!(ctx.len(), 1);
        assert_eq!(f.lines.owner(22).as_deref(), Some("ledgreen"));
        assert_eq!(f.registry.lookup("ledgreen"), Some(0));
    }

    #[test]
    fn test_missing_label() {
        let f = fixture();
        let mut ctx = context();
        let node = ConfigNode::new("bare");

        let outcome = f.registrar.register(&ResourceDescriptor::new(&node), &mut ctx);
        assert_eq!(
            outcome,
            RegisterOutcome::Skipped {
                reason: SkipReason::MissingLabel,
                error: LedError::Configuration {
                    node: "bare".to_string(),
                    property: LABEL_PROPERTY,
                    source: PropertyError::Missing,
                },
            }
        );
        assert!(ctx.is_empty());
        assert_eq!(f.registry.registered(), 0);
    }

    #[test]
    fn test_unknown_label_touches_nothing() {
        let f = fixture();
        let mut ctx = context();
        let node = led("ledpurple", 18);

        let outcome = f.registrar.register(&ResourceDescriptor::new(&node), &mut ctx);
        assert!(matches!(
            outcome,
            RegisterOutcome::Skipped {
                reason: SkipReason::UnknownLabel,
                ..
            }
        ));
        assert_eq!(f.registry.registered(), 0);
        assert_eq!(f.lines.requested(), 0);
    }

    #[test]
    fn test_registration_failure_touches_no_line() {
        let f = fixture_with(MiscRegistry::with_capacity(0));
        let mut ctx = context();
        let node = led("ledred", 17);

        let outcome = f.registrar.register(&ResourceDescriptor::new(&node), &mut ctx);
        assert_eq!(
            outcome,
            RegisterOutcome::Skipped {
                reason: SkipReason::RegistrationFailed,
                error: LedError::Registration {
                    name: "ledred".to_string(),
                    source: RegistryError::NoFreeMinor,
                },
            }
        );
        assert_eq!(f.lines.requested(), 0);
    }

    #[test]
    fn test_line_resolution_failure_deregisters() {
        let f = fixture();
        let mut ctx = context();
        let node = ConfigNode::new("red").with_property(LABEL_PROPERTY, "ledred");

        let outcome = f.registrar.register(&ResourceDescriptor::new(&node), &mut ctx);
        assert!(matches!(
            outcome,
            RegisterOutcome::Skipped {
                reason: SkipReason::LineResolutionFailed,
                ..
            }
        ));
        assert_eq!(f.registry.registered(), 1);
        assert_eq!(f.registry.deregistered(), 1);
        assert!(f.registry.is_empty());
    }

    #[test]
    fn test_line_acquisition_failure_deregisters() {
        let f = fixture();
        let mut ctx = context();
        let _held = f
            .lines
            .request_output(crate::line::LineRef::new(17), "other")
            .unwrap();
        let node = led("ledred", 17);

        let outcome = f.registrar.register(&ResourceDescriptor::new(&node), &mut ctx);
        match outcome {
            RegisterOutcome::Skipped { reason, error } => {
                assert_eq!(reason, SkipReason::LineAcquisitionFailed);
                assert_eq!(
                    error,
                    LedError::LineUnavailable {
                        name: "ledred".to_string(),
                        reason: LineFailure::Acquisition(LineError::Busy {
                            offset: 17,
                            owner: "other".to_string(),
                        }),
                    }
                );
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(f.registry.is_empty());
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_capacity_reached_inspects_nothing() {
        let f = fixture();
        let mut ctx = DriverContext::with_capacity("leds", 1).unwrap();
        let red = led("ledred", 17);
        let blue = led("ledblue", 19);

        f.registrar.register(&ResourceDescriptor::new(&red), &mut ctx);
        let outcome = f.registrar.register(&ResourceDescriptor::new(&blue), &mut ctx);

        assert_eq!(outcome, RegisterOutcome::CapacityReached);
        assert_eq!(f.registry.registered(), 1);
        assert_eq!(f.lines.requested(), 1);
    }
}
