//! Sentinel Permissions - hierarchical permission resolution for command
//! servers.
//!
//! This crate provides:
//! - Dotted permission nodes with trailing wildcards and negation
//! - Permission sets with specificity-based lookup
//! - Group inheritance resolved breadth-first with cycle detection
//! - A total evaluator (every failure is a deny) with a revision-stamped
//!   decision cache
//! - A concurrent store, an async backend boundary and a command gate
//!
//! # Precedence
//!
//! A profile's effective set lists its own nodes first, then each joined
//! group's nodes, then inherited groups breadth-first. By default the most
//! specific matching node wins regardless of where it came from, and ties go
//! to the earlier entry, so a profile's own `-build` beats an inherited
//! `build`. [`PrecedenceMode::Source`] instead lets the first source with any
//! match decide.
//!
//! # Example
//!
//! ```
//! use sentinel_permissions::{Group, PermissionStore, Profile, ProfileId};
//!
//! let store = PermissionStore::default();
//! store
//!     .load_groups([Group::new("default").with_permissions(["build", "move"]).unwrap()])
//!     .unwrap();
//!
//! let profile = Profile::new(ProfileId::new())
//!     .with_group("default")
//!     .with_permissions(["-build", "chat.*"])
//!     .unwrap();
//! let id = profile.id;
//! store.load_profile(profile).unwrap();
//!
//! assert!(!store.has_effective_permission(&id, "build"));
//! assert!(store.has_effective_permission(&id, "chat.say"));
//! assert!(store.has_effective_permission(&id, "move"));
//! assert!(!store.has_effective_permission(&id, "fly"));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod matcher;
pub mod prelude;

mod backend;
mod cache;
mod document;
mod error;
mod evaluator;
mod gate;
mod group;
mod node;
mod profile;
mod record;
mod resolver;
mod service;
mod set;
mod settings;
mod store;

pub use backend::{MemoryBackend, PermissionBackend};
pub use cache::{CacheStats, DecisionCache};
pub use document::PermissionDocument;
pub use error::{PermissionError, PermissionResult};
pub use evaluator::{DIAGNOSTICS_TARGET, Decision, PermissionEvaluator, parse_query};
pub use gate::{Actor, ActorKind, CommandGate};
pub use group::{Group, GroupGraph, GroupId};
pub use node::PermissionNode;
pub use profile::{Profile, ProfileId, ProfileMutation};
pub use record::{GroupRecord, ProfileRecord};
pub use resolver::{EffectiveEntry, EffectiveSet, GrantSource, resolve_effective};
pub use service::PermissionService;
pub use set::PermissionSet;
pub use settings::{CacheSettings, MissingGroupPolicy, PermissionSettings, PrecedenceMode};
pub use store::{PermissionStore, StagedProfile};
