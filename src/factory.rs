//! The eval object factory.
//!
//! Maps canonical names to singleton-per-name live instances. The factory
//! holds weak references only: objects stay alive exactly as long as some
//! external owner keeps them, and cache entries are pruned once their weak
//! handle no longer upgrades.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::attribute::AttributeName;
use crate::authority::AuthorityName;
use crate::constants::{DEFAULT_AUTHORITY, DEFAULT_POLLING_PERIOD, SCHEME};
use crate::device::{DeviceName, EvaluatorRef};
use crate::error::FactoryError;
use crate::evaluator::{DefaultEvaluator, Evaluator, EvaluatorRegistry};
use crate::grammar::Element;
use crate::model::{Attribute, Authority, Device};

/// Caller-tunable options for [`EvalFactory::resolve_attribute_with`].
///
/// The registration callback is always injected by the factory and is not
/// part of the options.
#[derive(Debug, Clone, Default)]
pub struct AttributeOptions {
    polling_period: Option<Duration>,
}

impl AttributeOptions {
    /// Creates options with every field defaulted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the factory-wide default polling period.
    #[must_use]
    pub fn polling_period(mut self, period: Duration) -> Self {
        self.polling_period = Some(period);
        self
    }
}

/// Cache and constructor for live Authority/Device/Attribute instances.
///
/// The factory is an explicitly constructed value — create one per process
/// (or per test) and pass it by reference; there is no global state.
///
/// ```
/// use std::sync::Arc;
/// use eval_uri::EvalFactory;
///
/// let factory = EvalFactory::new();
/// let attr = factory.resolve_attribute("eval:2+3").unwrap();
/// let again = factory.resolve_attribute("eval:2+3").unwrap();
/// assert!(Arc::ptr_eq(&attr, &again));
/// assert_eq!(attr.fullname(), "eval://localhost/@DefaultEvaluator/2+3");
/// ```
pub struct EvalFactory {
    authority: Mutex<Option<Arc<Authority>>>,
    devices: Mutex<HashMap<String, Weak<Device>>>,
    attributes: Mutex<HashMap<String, Weak<Attribute>>>,
    /// Per-name construction locks: concurrent first-time resolution of one
    /// name waits for the first builder instead of racing it.
    building: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    evaluators: EvaluatorRegistry,
    default_polling_period: Duration,
}

impl Default for EvalFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl EvalFactory {
    /// Creates a factory with empty caches and the default polling period.
    #[must_use]
    pub fn new() -> Self {
        Self {
            authority: Mutex::new(None),
            devices: Mutex::new(HashMap::new()),
            attributes: Mutex::new(HashMap::new()),
            building: Mutex::new(HashMap::new()),
            evaluators: EvaluatorRegistry::new(),
            default_polling_period: DEFAULT_POLLING_PERIOD,
        }
    }

    /// Overrides the polling period applied to attributes resolved without
    /// an explicit one.
    #[must_use]
    pub fn with_default_polling_period(mut self, period: Duration) -> Self {
        self.default_polling_period = period;
        self
    }

    /// The registry consulted for dotted `module.Class` device tokens.
    /// Register plugin implementations here before resolving their names.
    #[must_use]
    pub fn evaluators(&self) -> &EvaluatorRegistry {
        &self.evaluators
    }

    /// Returns the authority object, constructing it on first call.
    ///
    /// `name` defaults to the single supported authority; anything else must
    /// still validate against the authority grammar. Construction is
    /// idempotent: every call returns the same instance.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::InvalidName`] if `name` fails the authority
    /// grammar.
    pub fn resolve_authority(&self, name: Option<&str>) -> Result<Arc<Authority>, FactoryError> {
        let default = format!("{SCHEME}:{DEFAULT_AUTHORITY}");
        let name = name.unwrap_or(&default);
        let parsed = AuthorityName::parse(name)?;

        let mut slot = self.authority.lock();
        if let Some(existing) = slot.as_ref() {
            return Ok(Arc::clone(existing));
        }
        let authority = Authority::new(parsed.canonical_forms().complete);
        *slot = Some(Arc::clone(&authority));
        Ok(authority)
    }

    /// Returns the device for `name`, constructing it (and its authority)
    /// on first use.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::InvalidName`] if the device grammar rejects
    /// `name`, and [`FactoryError::ClassLoad`] if the name requests a dotted
    /// class with no registered constructor.
    pub fn resolve_device(&self, name: &str) -> Result<Arc<Device>, FactoryError> {
        if let Some(device) = lookup(&self.devices, name) {
            return Ok(device);
        }
        let parsed = DeviceName::parse(name)?;
        let fullname = parsed.canonical_forms().complete;
        let result = self.build_device(&fullname, &parsed);
        self.prune_build_locks();
        result
    }

    /// Returns the attribute for `name` with default options.
    ///
    /// # Errors
    ///
    /// See [`EvalFactory::resolve_attribute_with`].
    pub fn resolve_attribute(&self, name: &str) -> Result<Arc<Attribute>, FactoryError> {
        self.resolve_attribute_with(name, AttributeOptions::default())
    }

    /// Returns the attribute for `name`, constructing it (and its device
    /// and authority) on first use.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::InvalidName`] if the attribute grammar
    /// rejects `name` or the device grammar rejects the embedded device
    /// segment, and [`FactoryError::ClassLoad`] if the device segment
    /// requests an unregistered dotted class.
    pub fn resolve_attribute_with(
        &self,
        name: &str,
        options: AttributeOptions,
    ) -> Result<Arc<Attribute>, FactoryError> {
        if let Some(attribute) = lookup(&self.attributes, name) {
            return Ok(attribute);
        }
        let parsed = AttributeName::parse(name)?;
        let fullname = parsed.canonical_forms().complete;
        let result = self.build_attribute(&fullname, &parsed, options);
        self.prune_build_locks();
        result
    }

    /// Classifies an absolute name, device grammar first.
    #[must_use]
    pub fn find_element(&self, name: &str) -> Option<Element> {
        if DeviceName::is_valid(name) {
            Some(Element::Device)
        } else if AttributeName::is_valid(name) {
            Some(Element::Attribute)
        } else {
            debug!(name, "no element grammar accepts this name");
            None
        }
    }

    /// Number of live devices in the cache (dead entries pruned first).
    #[must_use]
    pub fn cached_device_count(&self) -> usize {
        let mut devices = self.devices.lock();
        devices.retain(|_, weak| weak.strong_count() > 0);
        devices.len()
    }

    /// Number of live attributes in the cache (dead entries pruned first).
    #[must_use]
    pub fn cached_attribute_count(&self) -> usize {
        let mut attributes = self.attributes.lock();
        attributes.retain(|_, weak| weak.strong_count() > 0);
        attributes.len()
    }

    fn build_device(
        &self,
        fullname: &str,
        parsed: &DeviceName,
    ) -> Result<Arc<Device>, FactoryError> {
        let build_lock = self.build_lock(fullname);
        let _guard = build_lock.lock();
        if let Some(device) = lookup(&self.devices, fullname) {
            return Ok(device);
        }

        let implementation: Arc<dyn Evaluator> = match parsed.evaluator() {
            EvaluatorRef::Class(class) => self.evaluators.load(class).inspect_err(|_| {
                warn!(class = %class, "failed to load evaluator class");
            })?,
            EvaluatorRef::Instance(_) => Arc::new(DefaultEvaluator),
        };

        let authority_name = format!(
            "{SCHEME}:{}",
            parsed.authority().unwrap_or(DEFAULT_AUTHORITY)
        );
        let authority = self.resolve_authority(Some(&authority_name))?;

        debug!(fullname, "constructing device");
        Device::new(fullname, authority, implementation, |device| {
            self.store_device(device)
        })
    }

    fn build_attribute(
        &self,
        fullname: &str,
        parsed: &AttributeName,
        options: AttributeOptions,
    ) -> Result<Arc<Attribute>, FactoryError> {
        let build_lock = self.build_lock(fullname);
        let _guard = build_lock.lock();
        if let Some(attribute) = lookup(&self.attributes, fullname) {
            return Ok(attribute);
        }

        let device = self.resolve_device(&parsed.device_name())?;
        let polling_period = options
            .polling_period
            .unwrap_or(self.default_polling_period);

        debug!(fullname, "constructing attribute");
        Attribute::new(fullname, device, polling_period, |attribute| {
            self.store_attribute(attribute)
        })
    }

    fn store_device(&self, device: &Arc<Device>) -> Result<(), FactoryError> {
        let mut devices = self.devices.lock();
        let name = device.fullname();
        if let Some(existing) = devices.get(name).and_then(Weak::upgrade) {
            if Arc::ptr_eq(&existing, device) {
                debug!(name, "device already registered; ignoring");
                return Ok(());
            }
            return Err(FactoryError::DoubleRegistration {
                element: Element::Device,
                fullname: name.to_string(),
            });
        }
        devices.insert(name.to_string(), Arc::downgrade(device));
        Ok(())
    }

    fn store_attribute(&self, attribute: &Arc<Attribute>) -> Result<(), FactoryError> {
        let mut attributes = self.attributes.lock();
        let name = attribute.fullname();
        if let Some(existing) = attributes.get(name).and_then(Weak::upgrade) {
            if Arc::ptr_eq(&existing, attribute) {
                debug!(name, "attribute already registered; ignoring");
                return Ok(());
            }
            return Err(FactoryError::DoubleRegistration {
                element: Element::Attribute,
                fullname: name.to_string(),
            });
        }
        attributes.insert(name.to_string(), Arc::downgrade(attribute));
        Ok(())
    }

    fn build_lock(&self, fullname: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            self.building
                .lock()
                .entry(fullname.to_string())
                .or_default(),
        )
    }

    /// Drops construction locks nobody is waiting on.
    fn prune_build_locks(&self) {
        self.building
            .lock()
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

impl std::fmt::Debug for EvalFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalFactory")
            .field("devices", &self.devices.lock().len())
            .field("attributes", &self.attributes.lock().len())
            .field("evaluators", &self.evaluators)
            .finish_non_exhaustive()
    }
}

/// Cache lookup that prunes a dead entry instead of returning it.
fn lookup<T>(cache: &Mutex<HashMap<String, Weak<T>>>, name: &str) -> Option<Arc<T>> {
    let mut map = cache.lock();
    match map.get(name).map(Weak::upgrade) {
        Some(Some(live)) => Some(live),
        Some(None) => {
            map.remove(name);
            None
        }
        None => None,
    }
}
