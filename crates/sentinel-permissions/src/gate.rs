//! Command gate: the dispatch-side check run before a command executes.
//!
//! The evaluator only ever answers for profiles. Whether an actor is
//! privileged (console, scheduled jobs) is decided by whoever resolved the
//! actor and is carried in [`ActorKind`]; the gate lets those actors through
//! without consulting the evaluator.

use std::fmt;
use std::sync::Arc;

use crate::profile::ProfileId;
use crate::store::PermissionStore;

/// How an actor is authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorKind {
    /// An actor backed by a profile; checks go to the evaluator.
    Identity(ProfileId),
    /// An actor trusted by identity (console, system tasks).
    Privileged,
}

/// Someone attempting to run a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Authorization class.
    pub kind: ActorKind,
    /// Display name for logs.
    pub name: String,
}

impl Actor {
    /// A profile-backed actor.
    #[must_use]
    pub fn identity(profile_id: ProfileId, name: impl Into<String>) -> Self {
        Self {
            kind: ActorKind::Identity(profile_id),
            name: name.into(),
        }
    }

    /// The console.
    #[must_use]
    pub fn console() -> Self {
        Self {
            kind: ActorKind::Privileged,
            name: "console".to_string(),
        }
    }

    /// The profile behind this actor, if any.
    #[must_use]
    pub fn profile_id(&self) -> Option<ProfileId> {
        match self.kind {
            ActorKind::Identity(id) => Some(id),
            ActorKind::Privileged => None,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ActorKind::Identity(id) => write!(f, "{} ({id})", self.name),
            ActorKind::Privileged => write!(f, "{} (privileged)", self.name),
        }
    }
}

/// Decides whether an actor may run a command.
#[derive(Debug, Clone)]
pub struct CommandGate {
    store: Arc<PermissionStore>,
}

impl CommandGate {
    /// Create a gate over a store.
    #[must_use]
    pub fn new(store: Arc<PermissionStore>) -> Self {
        Self { store }
    }

    /// Whether `actor` may run a command requiring `required`.
    ///
    /// Commands without a required permission are open to everyone.
    /// Privileged actors are always allowed. Identity actors whose profile is
    /// not loaded are denied.
    #[must_use]
    pub fn authorize(&self, actor: &Actor, required: Option<&str>) -> bool {
        let Some(permission) = required else {
            return true;
        };

        let allowed = match actor.kind {
            ActorKind::Privileged => true,
            ActorKind::Identity(profile_id) => {
                self.store.has_effective_permission(&profile_id, permission)
            },
        };

        if !allowed {
            tracing::debug!(actor = %actor, permission, "Command denied");
        }
        allowed
    }
}
