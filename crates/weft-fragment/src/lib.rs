//! Weft Fragment
//!
//! Core data model shared by the engine and every action implementation:
//!
//! - [`Fragment`]: a unit of page content (body, payload, configuration)
//! - [`FragmentContext`]: the fragment snapshot plus client request metadata
//!   handed to an action
//! - [`FragmentResult`]: what an action hands back (new fragment, transition, log)
//! - [`Action`]: the asynchronous fragment transformer contract
//! - [`ActionLogger`]: structured per-action logs attached to results

mod action;
mod error;
mod fragment;
mod log;
mod request;
mod result;

pub use action::{Action, ActionInvocation, ActionRef, CallbackAction, FnAction, ResultSender};
pub use error::ActionError;
pub use fragment::Fragment;
pub use log::{
  ActionInvocationLog, ActionLog, ActionLogLevel, ActionLogger, InvalidLogLevel, LOG_LEVEL_KEY,
};
pub use request::{ClientRequest, FragmentContext};
pub use result::{ERROR_TRANSITION, FALLBACK_TRANSITION, FragmentResult, SUCCESS_TRANSITION};
