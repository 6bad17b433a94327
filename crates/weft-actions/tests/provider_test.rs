use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Map, Value, json};
use weft_actions::{ActionFactory, ActionProvider, FactoryRegistry};
use weft_config::ActionFactoryOptions;
use weft_fragment::{
  Action, ActionError, ActionRef, ClientRequest, FALLBACK_TRANSITION, FnAction, Fragment,
  FragmentContext, FragmentResult, SUCCESS_TRANSITION,
};

/// Produces an action that writes `product` into the payload, or fails when
/// configured with `"fail": true`.
struct ProductFactory {
  calls: Arc<AtomicUsize>,
}

impl ActionFactory for ProductFactory {
  fn name(&self) -> &str {
    "product"
  }

  fn create(
    &self,
    alias: &str,
    config: &Value,
    _do_action: Option<ActionRef>,
  ) -> Result<ActionRef, ActionError> {
    let calls = self.calls.clone();
    let fail = config.get("fail").and_then(Value::as_bool).unwrap_or(false);
    let alias = alias.to_string();
    Ok(Arc::new(FnAction::sync(move |ctx| {
      calls.fetch_add(1, Ordering::SeqCst);
      if fail {
        return Err(ActionError::failed(alias.as_str(), "backend unavailable"));
      }
      let mut fragment = ctx.into_fragment();
      fragment.append_payload("product", json!({"name": "lamp"}));
      Ok(FragmentResult::success(fragment))
    })))
  }
}

fn provider(fail: bool, calls: Arc<AtomicUsize>) -> ActionProvider {
  let mut registry = FactoryRegistry::with_defaults();
  registry.register(ProductFactory { calls });

  let mut options = BTreeMap::new();
  options.insert(
    "product-source".to_string(),
    ActionFactoryOptions::new("product", json!({ "fail": fail })),
  );
  options.insert(
    "product-cache".to_string(),
    ActionFactoryOptions::new(
      "in-memory-cache",
      json!({"payloadKey": "product", "cacheKey": "product-{{ request.params.id }}"}),
    )
    .with_do_action("product-source"),
  );
  options.insert(
    "product-cb".to_string(),
    ActionFactoryOptions::new(
      "cb",
      json!({"circuitBreakerOptions": {"timeout": 1000, "maxFailures": 2}, "logLevel": "info"}),
    )
    .with_do_action("product-cache"),
  );
  options.insert(
    "to-body".to_string(),
    ActionFactoryOptions::new("payload-to-body", json!({"key": "product"})),
  );
  ActionProvider::new(options, Arc::new(registry))
}

fn context() -> FragmentContext {
  let fragment = Fragment::with_id("f", "snippet", Map::new(), "");
  FragmentContext::new(
    fragment,
    Arc::new(ClientRequest::new("/").with_param("id", "9")),
  )
}

#[tokio::test]
async fn test_chain_runs_through_breaker_and_cache() {
  let calls = Arc::new(AtomicUsize::new(0));
  let provider = provider(false, calls.clone());
  let action = provider.get("product-cb").unwrap().unwrap();

  let first = action.apply(context()).await.unwrap();
  assert_eq!(first.transition(), SUCCESS_TRANSITION);
  assert_eq!(first.fragment.payload()["product"], json!({"name": "lamp"}));
  let log = first.log.unwrap();
  assert_eq!(log["alias"], json!("product-cb"));
  assert_eq!(log["logs"]["invocationCount"], json!(1));

  action.apply(context()).await.unwrap();
  assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_chain_falls_back_when_source_fails() {
  let calls = Arc::new(AtomicUsize::new(0));
  let provider = provider(true, calls.clone());
  let action = provider.get("product-cb").unwrap().unwrap();

  let result = action.apply(context()).await.unwrap();
  assert_eq!(result.transition(), FALLBACK_TRANSITION);
  assert!(result.fragment.payload().is_empty());
}

#[tokio::test]
async fn test_cacheable_chain_is_shared() {
  let calls = Arc::new(AtomicUsize::new(0));
  let provider = provider(false, calls);
  let a = provider.get("product-cb").unwrap().unwrap();
  let b = provider.get("product-cb").unwrap().unwrap();
  assert!(Arc::ptr_eq(&a, &b));

  let c = provider.get("to-body").unwrap().unwrap();
  let d = provider.get("to-body").unwrap().unwrap();
  assert!(!Arc::ptr_eq(&c, &d));
}

#[test]
fn test_unknown_alias_is_none() {
  let provider = provider(false, Arc::new(AtomicUsize::new(0)));
  assert!(provider.get("missing").unwrap().is_none());
  assert!(provider.get("").unwrap().is_none());
}

#[test]
fn test_cache_without_do_action_is_rejected() {
  let mut options = BTreeMap::new();
  options.insert(
    "bare-cache".to_string(),
    ActionFactoryOptions::new(
      "in-memory-cache",
      json!({"payloadKey": "product", "cacheKey": "k"}),
    ),
  );
  let provider = ActionProvider::new(options, Arc::new(FactoryRegistry::with_defaults()));
  let err = provider.get("bare-cache").err().unwrap();
  assert!(matches!(err, ActionError::DoActionNotDefined { .. }));
}
