mod error;
mod resolver;
mod tasks;

pub use error::ResolveError;
pub use resolver::{ActionSource, COMPOSITE_NODE_ID, Resolver, StandardResolver};
pub use tasks::Tasks;
