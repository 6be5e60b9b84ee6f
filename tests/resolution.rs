//! End-to-end resolution tests: names in, cached object graphs out.

use std::sync::Arc;
use std::time::Duration;

use eval_uri::{
    AttributeOptions, Element, EvalFactory, Evaluator, FactoryError,
};

struct TableEvaluator;

impl Evaluator for TableEvaluator {
    fn name(&self) -> &str {
        "TableEvaluator"
    }

    fn provides(&self) -> Vec<String> {
        vec!["lookup".to_string()]
    }
}

#[test]
fn attribute_resolution_builds_the_graph_bottom_up() {
    let factory = EvalFactory::new();
    let attr = factory
        .resolve_attribute("eval://localhost/@myeval/a=2;a*x")
        .unwrap();

    assert_eq!(attr.fullname(), "eval://localhost/@myeval/2*x");
    assert_eq!(attr.device().fullname(), "eval://localhost/@myeval");
    assert_eq!(attr.device().authority().fullname(), "eval://localhost");
}

#[test]
fn equivalent_spellings_share_one_instance() {
    let factory = EvalFactory::new();
    let legacy = factory.resolve_attribute("eval://a+b?a=2;b=3").unwrap();
    let strict = factory
        .resolve_attribute("eval:a=2;b=3;a+b")
        .unwrap();
    assert!(Arc::ptr_eq(&legacy, &strict));
    assert_eq!(factory.cached_attribute_count(), 1);
}

#[test]
fn plugin_classes_resolve_through_the_registry() {
    let factory = EvalFactory::new();
    factory
        .evaluators()
        .register("tables.TableEvaluator", || Arc::new(TableEvaluator));

    let attr = factory
        .resolve_attribute("eval:@tables.TableEvaluator/lookup(x)")
        .unwrap();
    let implementation = attr.device().implementation();
    assert_eq!(implementation.name(), "TableEvaluator");
    assert_eq!(implementation.provides(), vec!["lookup".to_string()]);
}

#[test]
fn unregistered_class_fails_resolution_without_side_effects() {
    let factory = EvalFactory::new();
    let result = factory.resolve_attribute("eval:@mypkg.MyEvaluator/1+2");
    assert!(matches!(
        result,
        Err(FactoryError::ClassLoad(ref e)) if e.class == "mypkg.MyEvaluator"
    ));
    assert_eq!(factory.cached_attribute_count(), 0);
    assert_eq!(factory.cached_device_count(), 0);
}

#[test]
fn invalid_names_identify_the_input() {
    let factory = EvalFactory::new();
    let err = factory.resolve_attribute("eval:2;3").unwrap_err();
    assert!(err.to_string().contains("eval:2;3"));
}

#[test]
fn options_set_the_polling_period() {
    let factory = EvalFactory::new();
    let options = AttributeOptions::new().polling_period(Duration::from_secs(1));
    let attr = factory.resolve_attribute_with("eval:x*9", options).unwrap();
    assert_eq!(attr.polling_period(), Duration::from_secs(1));
}

#[test]
fn concurrent_first_resolution_yields_one_instance() {
    let factory = EvalFactory::new();
    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| factory.resolve_attribute("eval:7*6").unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let first = &results[0];
    for other in &results[1..] {
        assert!(Arc::ptr_eq(first, other));
    }
    assert_eq!(factory.cached_attribute_count(), 1);
    assert_eq!(factory.cached_device_count(), 1);
}

#[test]
fn dropping_all_owners_allows_reconstruction() {
    let factory = EvalFactory::new();
    {
        let _attr = factory.resolve_attribute("eval:5-4").unwrap();
        assert_eq!(factory.cached_attribute_count(), 1);
    }
    assert_eq!(factory.cached_attribute_count(), 0);

    let rebuilt = factory.resolve_attribute("eval:5-4").unwrap();
    assert_eq!(rebuilt.fullname(), "eval://localhost/@DefaultEvaluator/5-4");
    assert_eq!(factory.cached_attribute_count(), 1);
}

#[test]
fn find_element_classifies_names() {
    let factory = EvalFactory::new();
    assert_eq!(
        factory.find_element("eval://localhost/@myeval"),
        Some(Element::Device)
    );
    assert_eq!(
        factory.find_element("eval://localhost/@myeval/x+1"),
        Some(Element::Attribute)
    );
    assert_eq!(factory.find_element("not-a-name"), None);
}
