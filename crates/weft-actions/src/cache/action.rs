use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};
use weft_config::CacheActionOptions;
use weft_fragment::{
  Action, ActionError, ActionInvocation, ActionLogLevel, ActionLogger, ActionRef,
  FragmentContext, FragmentResult, SUCCESS_TRANSITION,
};

use super::Cache;

const CACHE_KEY: &str = "cache_key";
const CACHE_HIT: &str = "cache_hit";
const CACHE_MISS: &str = "cache_miss";
const CACHE_PASS: &str = "cache_pass";
const CACHE_GET_FAILURE: &str = "cache_get_failure";
const CACHE_PUT_FAILURE: &str = "cache_put_failure";
const CACHE_KEY_FAILURE: &str = "cache_key_failure";

/// Wraps a `doAction` with lookup-before-compute caching.
///
/// The cache key is a minijinja template rendered against
/// `{ payload, config, request }` of the incoming fragment context. On a hit
/// the cached value is put into the payload under `payloadKey` and the
/// `doAction` is skipped. On a miss the `doAction` runs and, if it succeeds
/// and produced `payloadKey`, its value is stored. Failures become an `_error`
/// result carrying the input fragment; only fatal errors propagate.
pub struct CacheAction {
  alias: String,
  options: CacheActionOptions,
  cache: Arc<dyn Cache>,
  do_action: ActionRef,
  log_level: ActionLogLevel,
}

impl CacheAction {
  pub fn new(
    alias: impl Into<String>,
    options: CacheActionOptions,
    cache: Arc<dyn Cache>,
    do_action: ActionRef,
    log_level: ActionLogLevel,
  ) -> Self {
    Self {
      alias: alias.into(),
      options,
      cache,
      do_action,
      log_level,
    }
  }

  fn render_key(&self, context: &FragmentContext) -> Result<String, minijinja::Error> {
    let fragment = context.fragment();
    let data = json!({
      "payload": fragment.payload(),
      "config": fragment.configuration(),
      "request": context.client_request(),
    });
    let env = minijinja::Environment::new();
    env.render_str(&self.options.cache_key, minijinja::Value::from_serialize(&data))
  }

  fn error_result(context: FragmentContext, logger: &ActionLogger) -> FragmentResult {
    FragmentResult::error(context.into_fragment()).with_log(logger.to_json())
  }
}

#[async_trait]
impl Action for CacheAction {
  async fn apply(&self, context: FragmentContext) -> Result<FragmentResult, ActionError> {
    let mut logger = ActionLogger::new(&self.alias, self.log_level);
    let payload_key = self.options.payload_key.as_str();

    let key = match self.render_key(&context) {
      Ok(key) => key,
      Err(e) => {
        warn!(alias = %self.alias, error = %e, "cache_key_render_failed");
        logger.error(CACHE_KEY_FAILURE, e.to_string());
        return Ok(Self::error_result(context, &logger));
      }
    };

    match self.cache.get(&key).await {
      Ok(Some(value)) => {
        debug!(alias = %self.alias, cache_key = %key, "cache_hit");
        logger.info(CACHE_HIT, json!({ CACHE_KEY: key, "cached_value": value }));
        let mut fragment = context.into_fragment();
        fragment.append_payload(payload_key, value);
        return Ok(FragmentResult::success(fragment).with_log(logger.to_json()));
      }
      Ok(None) => {}
      Err(e) => {
        warn!(alias = %self.alias, cache_key = %key, error = %e, "cache_get_failed");
        logger.error(CACHE_GET_FAILURE, json!({ CACHE_KEY: key, "error": e.to_string() }));
        if self.options.fail_when_cache_get_fails {
          return Ok(Self::error_result(context, &logger));
        }
      }
    }

    let invocation = ActionInvocation::invoke(self.do_action.as_ref(), context.clone()).await;
    let computed = match &invocation.result {
      Ok(result) if result.transition() == SUCCESS_TRANSITION => {
        result.fragment.payload().get(payload_key).cloned()
      }
      Err(e) if e.is_fatal() => return Err(e.clone()),
      _ => {
        debug!(alias = %self.alias, cache_key = %key, "cache_do_action_failed");
        logger.error_invocation(&invocation);
        return Ok(Self::error_result(context, &logger));
      }
    };
    logger.info_invocation(&invocation);

    match computed {
      Some(value) => match self.cache.put(&key, value.clone()).await {
        Ok(()) => {
          debug!(alias = %self.alias, cache_key = %key, "cache_miss");
          logger.info(CACHE_MISS, json!({ CACHE_KEY: key, "computed_value": value }));
        }
        Err(e) => {
          warn!(alias = %self.alias, cache_key = %key, error = %e, "cache_put_failed");
          logger.error(CACHE_PUT_FAILURE, json!({ CACHE_KEY: key, "error": e.to_string() }));
          if self.options.fail_when_cache_put_fails {
            return Ok(Self::error_result(context, &logger));
          }
        }
      },
      None => {
        logger.error(CACHE_PASS, json!({ CACHE_KEY: key }));
      }
    }

    let result = invocation.result?;
    Ok(result.with_log(logger.to_json()))
  }
}

