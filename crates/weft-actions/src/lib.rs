//! Weft Actions
//!
//! Everything needed to turn configured aliases into runnable actions:
//!
//! - [`ActionFactory`] builds an action from its alias, config and `doAction`
//! - [`FactoryRegistry`] holds the factories known to a process
//! - [`ActionProvider`] resolves aliases, composing `doAction` chains and
//!   memoizing actions built by cacheable factories
//!
//! Built-in factories:
//!
//! | name               | action |
//! |--------------------|--------|
//! | `cb`               | [`CircuitBreakerAction`] |
//! | `in-memory-cache`  | [`CacheAction`] over an [`InMemoryCache`] |
//! | `inline-body`      | replace the fragment body |
//! | `inline-payload`   | put a fixed value into the payload |
//! | `copy-payload-key` | copy a payload value to another key |
//! | `payload-to-body`  | render a payload value as the body |

mod cache;
mod circuit_breaker;
mod factory;
mod library;
mod provider;

pub use cache::{Cache, CacheAction, CacheError, InMemoryCache, InMemoryCacheActionFactory};
pub use circuit_breaker::{
  CircuitBreaker, CircuitBreakerAction, CircuitBreakerActionFactory, CircuitState,
};
pub use factory::{ActionFactory, FactoryRegistry};
pub use library::{
  CopyPayloadKeyActionFactory, InlineBodyActionFactory, InlinePayloadActionFactory,
  PayloadToBodyActionFactory,
};
pub use provider::ActionProvider;
