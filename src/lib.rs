//! Parser, validator and object factory for the `eval://` URI scheme.
//!
//! Eval URIs name *synthetic* data points: computed attributes whose value
//! is a mathematical expression, grouped under evaluator devices in a
//! single local authority. This crate implements the name grammar (both the
//! modern strict syntax and the backward-compatible legacy syntax), the
//! expression substitution/reference sub-grammars, and the identity cache
//! that turns canonical names into live, reusable instances.
//!
//! # URI structure
//!
//! ```text
//! strict:  eval://<authority>/<device>/<attribute-expr>[#<cfgkey>]
//! legacy:  eval://db=<name>;dev=<name>;<expr>?<k=v;...>?configuration=<cfgkey>
//! ```
//!
//! The scheme may also be spelled `evaluation`. The device segment is
//! `@<name>` or `@<dotted.Class>`; the attribute segment is an optional
//! `key=value;...` substitution prefix followed by an expression, which may
//! embed `{<attribute-name>}` references and quoted literal spans. Legacy
//! names are accepted only when the strict grammar fails, and both
//! grammars normalize equivalent names to the same canonical forms.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use eval_uri::{AttributeName, EvalFactory};
//!
//! // Parse a name and inspect its canonical forms.
//! let name = AttributeName::parse("eval://localhost/@myeval/a=2;a*x").unwrap();
//! assert_eq!(name.canonical_forms().complete, "eval://localhost/@myeval/2*x");
//! assert_eq!(name.canonical_forms().short, "a*x");
//!
//! // Resolve names to live objects; identity is preserved per name.
//! let factory = EvalFactory::new();
//! let attr = factory.resolve_attribute("eval:2+3").unwrap();
//! let again = factory.resolve_attribute("eval:2+3").unwrap();
//! assert!(Arc::ptr_eq(&attr, &again));
//! ```
//!
//! # Scope
//!
//! Expression *evaluation* and value transport are out of scope: the crate
//! locates and rewrites the textual references and substitutions inside an
//! expression, and manages object identity, nothing more.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod attribute;
mod authority;
mod constants;
mod device;
mod error;
mod evaluator;
mod factory;
mod grammar;
mod model;
pub mod prelude;
mod scanner;
mod subst;

pub use attribute::AttributeName;
pub use authority::AuthorityName;
pub use constants::{
    DEFAULT_AUTHORITY, DEFAULT_DATABASE, DEFAULT_DEVICE, DEFAULT_POLLING_PERIOD, SCHEME,
    SCHEME_LONG,
};
pub use device::{DeviceName, EvaluatorRef};
pub use error::{ClassLoadError, FactoryError, InvalidNameError, InvalidNameKind, ScanError};
pub use evaluator::{DefaultEvaluator, Evaluator, EvaluatorCtor, EvaluatorRegistry};
pub use factory::{AttributeOptions, EvalFactory};
pub use grammar::{CanonicalName, Element, GrammarMode};
pub use model::{Attribute, Authority, Device};
pub use scanner::{quoted_spans, scan_balanced, strip_quoted};
pub use subst::{expand, references, Substitutions};

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use crate::{AttributeName, CanonicalName, Element, GrammarMode};

    #[test]
    fn canonical_name_round_trips_through_json() {
        let forms = AttributeName::parse("eval:a=2;a+b")
            .unwrap()
            .canonical_forms();
        let json = serde_json::to_string(&forms).unwrap();
        let back: CanonicalName = serde_json::from_str(&json).unwrap();
        assert_eq!(forms, back);
    }

    #[test]
    fn mode_and_element_serialize_as_strings() {
        assert_eq!(
            serde_json::to_string(&GrammarMode::Strict).unwrap(),
            "\"Strict\""
        );
        assert_eq!(
            serde_json::to_string(&Element::Device).unwrap(),
            "\"Device\""
        );
    }
}
