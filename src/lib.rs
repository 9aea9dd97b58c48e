//! Durafsm: durable finite state machines
//!
//! Durafsm drives host business objects (clusters, deployments, VMs, ...)
//! through a caller-defined state graph. It guarantees that at most one
//! transition per instance is in flight, and that an in-flight transition
//! survives a process crash through a redo log.
//!
//! # Core Concepts
//!
//! - **StateFrame / Transition**: plain values describing the state graph
//! - **Group**: one instance of a state machine, with a single admission slot
//! - **Event**: the ticket for one transition attempt, resolved by the host
//! - **RedoLog**: the storage port for log rows and checkpoint records
//! - **Recovery**: rebuilds groups and re-delivers interrupted transitions
//!
//! # Example
//!
//! ```rust
//! use durafsm::builder::GroupBuilder;
//! use durafsm::core::Transition;
//! use durafsm::frames;
//! use durafsm::redo::{EventStatus, TableLog};
//! use std::sync::Arc;
//!
//! frames! {
//!     INIT = 0;
//!     CREATED = 1;
//!     CREATE_FAILED = 2, final;
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let group = GroupBuilder::new(Arc::new(TableLog::in_memory().unwrap()))
//!     .initial(INIT)
//!     .transition(Transition::new("create", INIT, CREATED, CREATE_FAILED))
//!     .persist("cluster", "cluster-1")
//!     .await
//!     .unwrap();
//! let mut events = group.watch_events().unwrap();
//!
//! group.submit("create", b"spec".to_vec()).await.unwrap();
//!
//! let doing = events.recv().await.unwrap();
//! assert_eq!(doing.status(), EventStatus::Doing);
//! doing.complete(Vec::new()).await.unwrap();
//!
//! let done = events.recv().await.unwrap();
//! assert_eq!(done.status(), EventStatus::Done);
//! assert_eq!(group.present_state(), CREATED);
//! # });
//! ```

pub mod builder;
pub mod core;
pub mod group;
pub mod policy;
pub mod recovery;
pub mod redo;

// Re-export commonly used types
pub use builder::{BuildError, GroupBuilder, TransitionBuilder};
pub use crate::core::{StateFrame, StateId, Transition, TransitionTable};
pub use group::{Alert, Event, Group, GroupError};
pub use policy::{GroupPolicy, PolicyBuilder, StallStrategy};
pub use recovery::{Recovery, RecoveryReport};
pub use redo::{CheckpointRecord, EventStatus, LogRow, RedoError, RedoLog, TableLog};
