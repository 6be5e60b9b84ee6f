//! Pluggable device implementations.
//!
//! A device URI may name a dotted `module.Class` token instead of a bare
//! instance name. Those classes are resolved against an explicit registry
//! rather than an ad hoc runtime import path: implementations are
//! registered up front under their dotted name and constructed on demand.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::ClassLoadError;

/// Capability contract implemented by pluggable device backends.
///
/// Expression evaluation itself happens in the collaborating business
/// objects; this trait covers what the naming core needs from an
/// implementation: an identifier for diagnostics and the extra symbols the
/// implementation contributes to the expression namespace.
pub trait Evaluator: Send + Sync {
    /// Identifier reported in diagnostics.
    fn name(&self) -> &str;

    /// Symbols this implementation makes available to expressions, beyond
    /// plain substitutions.
    fn provides(&self) -> Vec<String> {
        Vec::new()
    }
}

/// The built-in implementation backing bare-named devices.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEvaluator;

impl Evaluator for DefaultEvaluator {
    fn name(&self) -> &str {
        "DefaultEvaluator"
    }
}

/// Constructor stored per registered class.
pub type EvaluatorCtor = Arc<dyn Fn() -> Arc<dyn Evaluator> + Send + Sync>;

/// Registry mapping dotted class names to evaluator constructors.
///
/// ```
/// use std::sync::Arc;
/// use eval_uri::{Evaluator, EvaluatorRegistry};
///
/// struct SineEvaluator;
/// impl Evaluator for SineEvaluator {
///     fn name(&self) -> &str {
///         "SineEvaluator"
///     }
///     fn provides(&self) -> Vec<String> {
///         vec!["sin".to_string()]
///     }
/// }
///
/// let registry = EvaluatorRegistry::new();
/// registry.register("mymod.SineEvaluator", || Arc::new(SineEvaluator));
/// let evaluator = registry.load("mymod.SineEvaluator").unwrap();
/// assert_eq!(evaluator.name(), "SineEvaluator");
/// assert!(registry.load("mymod.Missing").is_err());
/// ```
#[derive(Default)]
pub struct EvaluatorRegistry {
    ctors: RwLock<HashMap<String, EvaluatorCtor>>,
}

impl EvaluatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor under a dotted class name, replacing any
    /// previous registration for that name.
    pub fn register<F>(&self, class: &str, ctor: F)
    where
        F: Fn() -> Arc<dyn Evaluator> + Send + Sync + 'static,
    {
        self.ctors.write().insert(class.to_string(), Arc::new(ctor));
    }

    /// Returns true if `class` has a registered constructor.
    #[must_use]
    pub fn is_registered(&self, class: &str) -> bool {
        self.ctors.read().contains_key(class)
    }

    /// The registered class names, sorted.
    #[must_use]
    pub fn classes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.ctors.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Constructs an evaluator for `class`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassLoadError`] if no constructor is registered under
    /// `class`.
    pub fn load(&self, class: &str) -> Result<Arc<dyn Evaluator>, ClassLoadError> {
        let ctor = self.ctors.read().get(class).cloned();
        match ctor {
            Some(ctor) => Ok(ctor()),
            None => Err(ClassLoadError {
                class: class.to_string(),
            }),
        }
    }
}

impl fmt::Debug for EvaluatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluatorRegistry")
            .field("classes", &self.classes())
            .finish()
    }
}
