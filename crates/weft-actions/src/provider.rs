//! Alias resolution with `doAction` composition.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};
use weft_config::ActionFactoryOptions;
use weft_fragment::{ActionError, ActionRef};

use crate::factory::FactoryRegistry;

/// Resolves action aliases into actions.
///
/// A `doAction` is resolved before the action wrapping it, so chains are
/// built innermost first. Actions from cacheable factories are built at most
/// once per alias and shared afterwards; other factories build a fresh action
/// on every call. `doAction` cycles are not detected.
pub struct ActionProvider {
  options: BTreeMap<String, ActionFactoryOptions>,
  registry: Arc<FactoryRegistry>,
  cache: RwLock<HashMap<String, ActionRef>>,
}

impl ActionProvider {
  pub fn new(options: BTreeMap<String, ActionFactoryOptions>, registry: Arc<FactoryRegistry>) -> Self {
    Self {
      options,
      registry,
      cache: RwLock::new(HashMap::new()),
    }
  }

  /// Resolve `alias`.
  ///
  /// Blank aliases, unknown aliases and unknown factories yield `Ok(None)`.
  /// `Err` means a factory rejected its configuration.
  pub fn get(&self, alias: &str) -> Result<Option<ActionRef>, ActionError> {
    if alias.trim().is_empty() {
      return Ok(None);
    }

    {
      let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
      if let Some(action) = cache.get(alias) {
        return Ok(Some(action.clone()));
      }
    }

    let Some(options) = self.options.get(alias) else {
      warn!(alias, "action_not_configured");
      return Ok(None);
    };
    let Some(factory) = self.registry.get(&options.factory) else {
      warn!(alias, factory = %options.factory, "action_factory_not_found");
      return Ok(None);
    };

    let do_action = match options.do_action.as_deref() {
      Some(inner) => self.get(inner)?,
      None => None,
    };

    let action = factory.create(alias, &options.config, do_action)?;
    debug!(alias, factory = %options.factory, "action_created");

    if !factory.cacheable() {
      return Ok(Some(action));
    }

    // concurrent builders of the same alias converge on the first insert
    let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
    Ok(Some(cache.entry(alias.to_string()).or_insert(action).clone()))
  }

  pub fn aliases(&self) -> impl Iterator<Item = &str> {
    self.options.keys().map(String::as_str)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  use serde_json::{Map, Value, json};
  use weft_fragment::{ClientRequest, FnAction, Fragment, FragmentContext, FragmentResult};

  use crate::factory::ActionFactory;

  /// Appends its alias to the payload `trail`, then delegates to `doAction`.
  struct TrailFactory {
    name: &'static str,
    cacheable: bool,
    created: Arc<AtomicUsize>,
  }

  impl ActionFactory for TrailFactory {
    fn name(&self) -> &str {
      self.name
    }

    fn cacheable(&self) -> bool {
      self.cacheable
    }

    fn create(
      &self,
      alias: &str,
      _config: &Value,
      do_action: Option<ActionRef>,
    ) -> Result<ActionRef, ActionError> {
      self.created.fetch_add(1, Ordering::SeqCst);
      let alias = alias.to_string();
      Ok(Arc::new(FnAction::new(move |ctx: FragmentContext| {
        let alias = alias.clone();
        let do_action = do_action.clone();
        async move {
          let ctx = match do_action {
            Some(inner) => {
              let request = Arc::new(ctx.client_request().clone());
              let result = inner.apply(ctx).await?;
              FragmentContext::new(result.fragment, request)
            }
            None => ctx,
          };
          let mut fragment = ctx.into_fragment();
          let mut trail = fragment
            .payload()
            .get("trail")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
          trail.push(json!(alias));
          fragment.append_payload("trail", Value::Array(trail));
          Ok(FragmentResult::success(fragment))
        }
      })))
    }
  }

  fn provider(cacheable: bool) -> (ActionProvider, Arc<AtomicUsize>) {
    let created = Arc::new(AtomicUsize::new(0));
    let mut registry = FactoryRegistry::new();
    registry.register(TrailFactory {
      name: "trail",
      cacheable,
      created: created.clone(),
    });

    let mut options = BTreeMap::new();
    options.insert("inner".to_string(), ActionFactoryOptions::new("trail", json!({})));
    options.insert(
      "outer".to_string(),
      ActionFactoryOptions::new("trail", json!({})).with_do_action("inner"),
    );
    options.insert("orphan".to_string(), ActionFactoryOptions::new("unknown", json!({})));
    (ActionProvider::new(options, Arc::new(registry)), created)
  }

  fn context() -> FragmentContext {
    FragmentContext::new(
      Fragment::with_id("f", "snippet", Map::new(), ""),
      Arc::new(ClientRequest::default()),
    )
  }

  #[test]
  fn test_blank_and_unknown_aliases_resolve_to_none() {
    let (provider, _) = provider(true);
    assert!(provider.get("").unwrap().is_none());
    assert!(provider.get("   ").unwrap().is_none());
    assert!(provider.get("missing").unwrap().is_none());
    assert!(provider.get("orphan").unwrap().is_none());
  }

  #[tokio::test]
  async fn test_do_action_chain_runs_innermost_first() {
    let (provider, created) = provider(false);
    let action = provider.get("outer").unwrap().unwrap();
    assert_eq!(created.load(Ordering::SeqCst), 2);

    let result = action.apply(context()).await.unwrap();
    assert_eq!(result.fragment.payload()["trail"], json!(["inner", "outer"]));
  }

  #[test]
  fn test_cacheable_actions_built_once_per_alias() {
    let (provider, created) = provider(true);
    let first = provider.get("outer").unwrap().unwrap();
    let second = provider.get("outer").unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(created.load(Ordering::SeqCst), 2);

    let inner = provider.get("inner").unwrap().unwrap();
    assert_eq!(created.load(Ordering::SeqCst), 2);
    drop(inner);
  }

  #[test]
  fn test_non_cacheable_actions_built_every_time() {
    let (provider, created) = provider(false);
    let first = provider.get("inner").unwrap().unwrap();
    let second = provider.get("inner").unwrap().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(created.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn test_concurrent_cacheable_resolution_converges() {
    let (provider, _) = provider(true);
    let provider = Arc::new(provider);
    let handles: Vec<_> = (0..8)
      .map(|_| {
        let provider = provider.clone();
        std::thread::spawn(move || provider.get("inner").unwrap().unwrap())
      })
      .collect();
    let actions: Vec<ActionRef> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let retained = provider.get("inner").unwrap().unwrap();
    assert!(actions.iter().all(|a| Arc::ptr_eq(a, &retained)));
  }
}
