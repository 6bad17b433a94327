//! Simple built-in actions that transform a fragment without I/O.

use std::sync::Arc;

use serde_json::{Map, Value};
use weft_fragment::{
  ActionError, ActionLogLevel, ActionLogger, ActionRef, FnAction, FragmentResult,
};

use crate::factory::ActionFactory;

fn reject_do_action(alias: &str, do_action: &Option<ActionRef>, name: &str) -> Result<(), ActionError> {
  match do_action {
    Some(_) => Err(ActionError::configuration(
      alias,
      format!("{name} action does not support doAction"),
    )),
    None => Ok(()),
  }
}

fn log_level(alias: &str, config: &Value) -> Result<ActionLogLevel, ActionError> {
  ActionLogLevel::from_config(config, ActionLogLevel::Error)
    .map_err(|e| ActionError::configuration(alias, e.to_string()))
}

fn non_blank<'a>(alias: &str, config: &'a Value, key: &str) -> Result<&'a str, ActionError> {
  match config.get(key).and_then(Value::as_str) {
    Some(value) if !value.trim().is_empty() => Ok(value),
    _ => Err(ActionError::configuration(
      alias,
      format!("'{key}' must be configured"),
    )),
  }
}

/// Value at a dotted path such as `user.address.city`.
fn lookup<'a>(root: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
  let mut segments = path.split('.');
  let mut current = root.get(segments.next()?)?;
  for segment in segments {
    current = current.as_object()?.get(segment)?;
  }
  Some(current)
}

/// Put `value` at a dotted path, creating intermediate objects. A non-object
/// in the way is replaced.
fn insert(root: &mut Map<String, Value>, path: &str, value: Value) {
  match path.split_once('.') {
    None => {
      root.insert(path.to_string(), value);
    }
    Some((head, rest)) => {
      let child = root
        .entry(head.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
      if !child.is_object() {
        *child = Value::Object(Map::new());
      }
      if let Value::Object(map) = child {
        insert(map, rest, value);
      }
    }
  }
}

/// `inline-body`: replace the body with `config.body`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineBodyActionFactory;

impl ActionFactory for InlineBodyActionFactory {
  fn name(&self) -> &str {
    "inline-body"
  }

  fn cacheable(&self) -> bool {
    true
  }

  fn create(
    &self,
    alias: &str,
    config: &Value,
    do_action: Option<ActionRef>,
  ) -> Result<ActionRef, ActionError> {
    reject_do_action(alias, &do_action, "Inline body")?;
    let level = log_level(alias, config)?;
    let body = config
      .get("body")
      .and_then(Value::as_str)
      .unwrap_or_default()
      .to_string();
    let alias = alias.to_string();

    Ok(Arc::new(FnAction::sync(move |ctx| {
      let mut logger = ActionLogger::new(&alias, level);
      let mut fragment = ctx.into_fragment();
      logger.info("originalBody", fragment.body());
      logger.info("body", body.as_str());
      fragment.set_body(body.as_str());
      Ok(FragmentResult::success(fragment).with_log(logger.to_json()))
    })))
  }
}

/// `inline-payload`: put `config.payload` into the payload under
/// `config.alias`, defaulting to the action alias.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlinePayloadActionFactory;

impl ActionFactory for InlinePayloadActionFactory {
  fn name(&self) -> &str {
    "inline-payload"
  }

  fn cacheable(&self) -> bool {
    true
  }

  fn create(
    &self,
    alias: &str,
    config: &Value,
    do_action: Option<ActionRef>,
  ) -> Result<ActionRef, ActionError> {
    reject_do_action(alias, &do_action, "Inline payload")?;
    let level = log_level(alias, config)?;
    let value = config
      .get("payload")
      .cloned()
      .ok_or_else(|| ActionError::configuration(alias, "'payload' must be configured"))?;
    let key = config
      .get("alias")
      .and_then(Value::as_str)
      .unwrap_or(alias)
      .to_string();
    let alias = alias.to_string();

    Ok(Arc::new(FnAction::sync(move |ctx| {
      let mut logger = ActionLogger::new(&alias, level);
      let mut fragment = ctx.into_fragment();
      fragment.append_payload(key.as_str(), value.clone());
      logger.info("key", key.as_str());
      logger.info("value", value.clone());
      Ok(FragmentResult::success(fragment).with_log(logger.to_json()))
    })))
  }
}

/// `copy-payload-key`: copy the payload value at `config.from` to `config.to`.
/// Missing sources leave the payload unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyPayloadKeyActionFactory;

impl ActionFactory for CopyPayloadKeyActionFactory {
  fn name(&self) -> &str {
    "copy-payload-key"
  }

  fn cacheable(&self) -> bool {
    true
  }

  fn create(
    &self,
    alias: &str,
    config: &Value,
    do_action: Option<ActionRef>,
  ) -> Result<ActionRef, ActionError> {
    reject_do_action(alias, &do_action, "CopyPayloadKey")?;
    let from = non_blank(alias, config, "from")?.to_string();
    let to = non_blank(alias, config, "to")?.to_string();

    Ok(Arc::new(FnAction::sync(move |ctx| {
      let mut fragment = ctx.into_fragment();
      if let Some(value) = lookup(fragment.payload(), &from).cloned() {
        let mut payload = fragment.payload().clone();
        insert(&mut payload, &to, value);
        fragment.merge_in_payload(payload);
      }
      Ok(FragmentResult::success(fragment))
    })))
  }
}

/// `payload-to-body`: set the body to the pretty JSON of the payload object at
/// `config.key`, or of the whole payload when no key is configured. Ends with
/// `_error` when the key does not hold an object.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadToBodyActionFactory;

impl ActionFactory for PayloadToBodyActionFactory {
  fn name(&self) -> &str {
    "payload-to-body"
  }

  fn create(
    &self,
    alias: &str,
    config: &Value,
    do_action: Option<ActionRef>,
  ) -> Result<ActionRef, ActionError> {
    reject_do_action(alias, &do_action, "Payload to body")?;
    let key = config.get("key").and_then(Value::as_str).map(str::to_string);
    let alias = alias.to_string();

    Ok(Arc::new(FnAction::sync(move |ctx| {
      let mut fragment = ctx.into_fragment();
      let source = match &key {
        Some(key) => lookup(fragment.payload(), key).and_then(Value::as_object),
        None => Some(fragment.payload()),
      };
      let Some(source) = source else {
        return Ok(FragmentResult::error(fragment));
      };
      let body = serde_json::to_string_pretty(source)
        .map_err(|e| ActionError::failed(alias.as_str(), e.to_string()))?;
      fragment.set_body(body);
      Ok(FragmentResult::success(fragment))
    })))
  }
}
