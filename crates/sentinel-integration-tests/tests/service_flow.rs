//! Documents, backends, the async service and the command gate together.

use std::sync::Arc;

use async_trait::async_trait;
use sentinel_permissions::{
    Actor, GroupId, GroupRecord, MemoryBackend, PermissionBackend, PermissionDocument,
    PermissionError, PermissionResult, PermissionService, PermissionSettings, ProfileId,
    ProfileMutation, ProfileRecord,
};
use tokio::sync::Mutex;

const DOCUMENT: &str = r#"
[[groups]]
id = "default"
name = "Default"
weight = 1
permissions = ["build", "move", "chat.*"]

[[groups]]
id = "mod"
name = "Moderator"
prefix = "[Mod]"
weight = 50
inherits = ["default"]
permissions = ["kick|console|1712000000", "-chat.shout"]

[[profiles]]
id = "0f8fad5b-d9cb-469f-a165-70867728950e"
name = "steve"
permissions = ["-build", "home.*"]
groups = ["default"]

[[profiles]]
id = "7c9e6679-7425-40de-944b-e07fc1f90ae7"
name = "alex"
groups = ["MOD|console|1712000000|null|"]
"#;

async fn service_from(document: &PermissionDocument) -> (PermissionService, Arc<MemoryBackend>) {
    let backend = Arc::new(document.clone().into_backend());
    let service = PermissionService::new(backend.clone(), PermissionSettings::default());
    service.load_groups().await.unwrap();
    for record in &document.profiles {
        service.load_profile(&record.id).await.unwrap();
    }
    (service, backend)
}

fn id_of(document: &PermissionDocument, name: &str) -> ProfileId {
    document.find_profile(name).unwrap().id
}

#[tokio::test]
async fn test_document_round_trip_through_service() {
    let document = PermissionDocument::from_toml_str(DOCUMENT).unwrap();
    let (service, _) = service_from(&document).await;
    let steve = id_of(&document, "steve");
    let alex = id_of(&document, "alex");

    assert!(!service.has_effective_permission(&steve, "build"));
    assert!(service.has_effective_permission(&steve, "move"));
    assert!(service.has_effective_permission(&steve, "home.set"));

    assert!(service.has_effective_permission(&alex, "kick"));
    assert!(service.has_effective_permission(&alex, "chat.say"));
    assert!(!service.has_effective_permission(&alex, "chat.shout"));

    let primary = service.store().primary_group(&alex).unwrap();
    assert_eq!(primary.prefix, "[Mod]");
}

#[tokio::test]
async fn test_persisted_changes_survive_reload() {
    let document = PermissionDocument::from_toml_str(DOCUMENT).unwrap();
    let (service, backend) = service_from(&document).await;
    let steve = id_of(&document, "steve");

    service
        .apply(
            &steve,
            vec![
                ProfileMutation::Grant("build".into()),
                ProfileMutation::JoinGroup(GroupId::new("mod")),
            ],
        )
        .await
        .unwrap();
    service.grant_group(&GroupId::new("mod"), "ban").await.unwrap();

    // A second service over the same backend sees the persisted state.
    let fresh = PermissionService::new(backend, PermissionSettings::default());
    fresh.load_groups().await.unwrap();
    fresh.load_profile(&steve).await.unwrap();
    for permission in ["build", "kick", "ban", "move"] {
        assert!(fresh.has_effective_permission(&steve, permission), "{permission}");
    }
}

#[tokio::test]
async fn test_gate_over_service() {
    let document = PermissionDocument::from_toml_str(DOCUMENT).unwrap();
    let (service, _) = service_from(&document).await;
    let gate = service.gate();
    let steve = Actor::identity(id_of(&document, "steve"), "steve");

    assert!(gate.authorize(&steve, None));
    assert!(gate.authorize(&steve, Some("home.delete")));
    assert!(!gate.authorize(&steve, Some("build")));
    assert!(gate.authorize(&Actor::console(), Some("build")));

    service.unload_profile(&id_of(&document, "steve"));
    assert!(!gate.authorize(&steve, Some("home.delete")));
}

#[tokio::test]
async fn test_unknown_profile_in_backend() {
    let document = PermissionDocument::from_toml_str(DOCUMENT).unwrap();
    let (service, _) = service_from(&document).await;
    assert!(matches!(
        service.load_profile(&ProfileId::new()).await,
        Err(PermissionError::UnknownProfile { .. })
    ));
}

/// Backend that records the order of saves.
struct RecordingBackend {
    inner: MemoryBackend,
    saves: Mutex<Vec<String>>,
}

#[async_trait]
impl PermissionBackend for RecordingBackend {
    async fn load_profile(&self, profile_id: &ProfileId) -> PermissionResult<Option<ProfileRecord>> {
        self.inner.load_profile(profile_id).await
    }

    async fn load_groups(&self) -> PermissionResult<Vec<GroupRecord>> {
        self.inner.load_groups().await
    }

    async fn save_profile(&self, record: &ProfileRecord) -> PermissionResult<()> {
        self.saves.lock().await.push(format!("profile {}", record.id));
        self.inner.save_profile(record).await
    }

    async fn save_group(&self, record: &GroupRecord) -> PermissionResult<()> {
        self.saves.lock().await.push(format!("group {}", record.id));
        self.inner.save_group(record).await
    }

    async fn delete_group(&self, group_id: &str) -> PermissionResult<bool> {
        self.saves.lock().await.push(format!("delete {group_id}"));
        self.inner.delete_group(group_id).await
    }
}

#[tokio::test]
async fn test_custom_backend_sees_every_write() {
    let document = PermissionDocument::from_toml_str(DOCUMENT).unwrap();
    let backend = Arc::new(RecordingBackend {
        inner: document.clone().into_backend(),
        saves: Mutex::new(Vec::new()),
    });
    let service = PermissionService::new(backend.clone(), PermissionSettings::default());
    service.load_groups().await.unwrap();
    let steve = id_of(&document, "steve");
    service.load_profile(&steve).await.unwrap();

    service.grant(&steve, "fly").await.unwrap();
    // Granting a node the profile already has writes nothing.
    service.grant(&steve, "fly").await.unwrap();
    service.delete_group(&GroupId::new("default")).await.unwrap();

    let saves = backend.saves.lock().await.clone();
    assert_eq!(
        saves,
        vec![
            format!("profile {steve}"),
            "delete default".to_string(),
            "group mod".to_string(),
        ]
    );
    assert!(!service.has_effective_permission(&steve, "move"));
    assert!(service.has_effective_permission(&steve, "fly"));
}

#[tokio::test]
async fn test_json_document() {
    let json = serde_json::json!({
        "groups": [{ "id": "default", "permissions": ["move"] }],
        "profiles": [{
            "id": "0f8fad5b-d9cb-469f-a165-70867728950e",
            "ranks": ["default"],
        }],
    });
    let document = PermissionDocument::from_json_str(&json.to_string()).unwrap();
    let (service, _) = service_from(&document).await;
    let id = document.profiles[0].id;
    assert!(service.has_effective_permission(&id, "move"));
}
