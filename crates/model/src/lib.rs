//! A narrow protocol between the orchestration core and generation
//! services.
//!
//! This crate defines how flows talk to a generative model: the messages
//! that make up a conversation, the request sent to a provider, and the
//! streaming response a provider hands back. The core never depends on a
//! concrete provider, so any service that can speak this protocol (tool
//! calls included) can drive every flow.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod message;
mod provider;
mod request;
mod response;

pub use error::*;
pub use message::*;
pub use provider::*;
pub use request::*;
pub use response::*;
