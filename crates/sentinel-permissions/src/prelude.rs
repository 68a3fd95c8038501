//! Prelude module - commonly used types for convenient import.
//!
//! Use `use sentinel_permissions::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use sentinel_permissions::prelude::*;
//! use std::sync::Arc;
//!
//! let store = Arc::new(PermissionStore::default());
//! let profile = Profile::new(ProfileId::new())
//!     .with_permissions(["home.*"])
//!     .unwrap();
//! let id = profile.id;
//! store.load_profile(profile).unwrap();
//!
//! let gate = CommandGate::new(store);
//! assert!(gate.authorize(&Actor::identity(id, "steve"), Some("home.set")));
//! assert!(gate.authorize(&Actor::console(), Some("server.stop")));
//! ```

// Errors
pub use crate::{PermissionError, PermissionResult};

// Nodes and sets
pub use crate::{PermissionNode, PermissionSet};

// Profiles and groups
pub use crate::{Group, GroupGraph, GroupId, Profile, ProfileId, ProfileMutation};

// Evaluation
pub use crate::{Decision, EffectiveEntry, EffectiveSet, GrantSource, PermissionEvaluator};
pub use crate::{MissingGroupPolicy, PermissionSettings, PrecedenceMode};

// Store, service and gate
pub use crate::{Actor, ActorKind, CommandGate};
pub use crate::{MemoryBackend, PermissionBackend, PermissionDocument, PermissionService};
pub use crate::{PermissionStore, StagedProfile};
