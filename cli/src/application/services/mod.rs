//! Application services: use-case orchestration.
//!
//! Each service module implements a single use-case by composing domain logic
//! with port trait calls. Services import only from `crate::domain` and
//! `crate::application::ports`: never from `crate::infra`, `crate::commands`,
//! or `crate::output`.

pub mod cluster;
pub mod diagnostics;
pub mod fanout;
pub mod scenarios;
pub mod sequencer;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;
