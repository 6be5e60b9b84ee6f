//! Live evaluation objects.
//!
//! These are the factory's collaborators: thin handles identified by their
//! canonical full name, chained by ownership (attribute → device →
//! authority) so that the factory itself can hold weak references only.
//! Value polling and expression evaluation live outside the naming core.
//!
//! Devices and attributes take a registration callback at construction and
//! invoke it before the new instance is returned; the factory injects a
//! callback that stores the instance in its cache.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::FactoryError;
use crate::evaluator::Evaluator;

/// The top-level scope object. Only one authority exists per factory.
#[derive(Debug)]
pub struct Authority {
    fullname: String,
}

impl Authority {
    /// Creates an authority with the given canonical full name.
    #[must_use]
    pub fn new(fullname: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            fullname: fullname.into(),
        })
    }

    /// The canonical full name, e.g. `eval://localhost`.
    #[must_use]
    pub fn fullname(&self) -> &str {
        &self.fullname
    }
}

/// A named container grouping computed attributes, backed by an evaluator
/// implementation.
pub struct Device {
    fullname: String,
    authority: Arc<Authority>,
    implementation: Arc<dyn Evaluator>,
}

impl Device {
    /// Constructs a device and registers it through `store` before
    /// returning it.
    ///
    /// # Errors
    ///
    /// Propagates the registration error, typically
    /// [`FactoryError::DoubleRegistration`].
    pub fn new(
        fullname: impl Into<String>,
        authority: Arc<Authority>,
        implementation: Arc<dyn Evaluator>,
        store: impl FnOnce(&Arc<Self>) -> Result<(), FactoryError>,
    ) -> Result<Arc<Self>, FactoryError> {
        let device = Arc::new(Self {
            fullname: fullname.into(),
            authority,
            implementation,
        });
        store(&device)?;
        Ok(device)
    }

    /// The canonical full name, e.g. `eval://localhost/@myeval`.
    #[must_use]
    pub fn fullname(&self) -> &str {
        &self.fullname
    }

    /// The owning authority.
    #[must_use]
    pub fn authority(&self) -> &Arc<Authority> {
        &self.authority
    }

    /// The evaluator implementation backing this device.
    #[must_use]
    pub fn implementation(&self) -> &Arc<dyn Evaluator> {
        &self.implementation
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("fullname", &self.fullname)
            .field("implementation", &self.implementation.name())
            .finish_non_exhaustive()
    }
}

/// An expression-valued computed data point.
#[derive(Debug)]
pub struct Attribute {
    fullname: String,
    device: Arc<Device>,
    polling_period: Duration,
}

impl Attribute {
    /// Constructs an attribute and registers it through `store` before
    /// returning it.
    ///
    /// # Errors
    ///
    /// Propagates the registration error, typically
    /// [`FactoryError::DoubleRegistration`].
    pub fn new(
        fullname: impl Into<String>,
        device: Arc<Device>,
        polling_period: Duration,
        store: impl FnOnce(&Arc<Self>) -> Result<(), FactoryError>,
    ) -> Result<Arc<Self>, FactoryError> {
        let attribute = Arc::new(Self {
            fullname: fullname.into(),
            device,
            polling_period,
        });
        store(&attribute)?;
        Ok(attribute)
    }

    /// The canonical full name, e.g. `eval://localhost/@DefaultEvaluator/2+3`.
    #[must_use]
    pub fn fullname(&self) -> &str {
        &self.fullname
    }

    /// The owning device.
    #[must_use]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// The refresh period this attribute was resolved with.
    #[must_use]
    pub fn polling_period(&self) -> Duration {
        self.polling_period
    }
}
