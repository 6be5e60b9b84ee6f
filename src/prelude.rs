//! Convenient re-exports for glob imports.
//!
//! ```rust
//! use eval_uri::prelude::*;
//!
//! let name = AttributeName::parse("eval:2+3").unwrap();
//! assert_eq!(name.canonical_forms().short, "2+3");
//! ```

pub use crate::{
    // Name grammar
    AttributeName, AuthorityName, CanonicalName, DeviceName, Element, EvaluatorRef, GrammarMode,
    // Scanner and rewriter
    expand, quoted_spans, references, scan_balanced, strip_quoted, Substitutions,
    // Factory and model
    Attribute, AttributeOptions, Authority, DefaultEvaluator, Device, EvalFactory, Evaluator,
    EvaluatorCtor, EvaluatorRegistry,
    // Errors
    ClassLoadError, FactoryError, InvalidNameError, InvalidNameKind, ScanError,
    // Constants
    DEFAULT_AUTHORITY, DEFAULT_DATABASE, DEFAULT_DEVICE, DEFAULT_POLLING_PERIOD, SCHEME,
    SCHEME_LONG,
};
