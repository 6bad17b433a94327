use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::fragment::Fragment;

/// Metadata of the client request a fragment batch is processed for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientRequest {
  #[serde(default)]
  pub path: String,
  #[serde(default)]
  pub headers: BTreeMap<String, String>,
  #[serde(default)]
  pub params: BTreeMap<String, String>,
}

impl ClientRequest {
  pub fn new(path: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      ..Default::default()
    }
  }

  pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.insert(name.into(), value.into());
    self
  }

  pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.params.insert(name.into(), value.into());
    self
  }
}

/// Input of a single action invocation.
///
/// The fragment is an owned snapshot. Actions build their result from it and
/// never reach back into the caller's state.
#[derive(Debug, Clone)]
pub struct FragmentContext {
  fragment: Fragment,
  client_request: Arc<ClientRequest>,
}

impl FragmentContext {
  pub fn new(fragment: Fragment, client_request: Arc<ClientRequest>) -> Self {
    Self {
      fragment,
      client_request,
    }
  }

  pub fn fragment(&self) -> &Fragment {
    &self.fragment
  }

  pub fn client_request(&self) -> &ClientRequest {
    &self.client_request
  }

  /// Take the fragment out of the context to build a result from it.
  pub fn into_fragment(self) -> Fragment {
    self.fragment
  }
}
