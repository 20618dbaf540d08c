use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::permissions::{self, Permission, ROLES};
use crate::database::models::{CreateProfile, Profile, UpdateProfile};
use crate::database::{RecordStore, StoreError};
use crate::filter::{FieldValue, Predicate, RecordOrder, SearchRequest, SortDirection};
use crate::services::error::ServiceError;
use crate::services::list_service::ListService;
use crate::services::page::PageResult;

const NAME_LEN: std::ops::RangeInclusive<usize> = 3..=100;
const SLUG_LEN: std::ops::RangeInclusive<usize> = 3..=50;
const MAX_DESCRIPTION_LEN: usize = 500;

/// Profiles are the stored permission sets behind a user's roles.
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn RecordStore<Profile>>,
    listing: ListService<Profile>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn RecordStore<Profile>>) -> Self {
        let listing = ListService::new(store.clone());
        Self { store, listing }
    }

    pub async fn list(&self, request: &SearchRequest) -> Result<PageResult<Profile>, ServiceError> {
        self.listing.list(request).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Profile, ServiceError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Profile not found".to_string()))
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Profile>, ServiceError> {
        let predicate = Predicate::live().equals("slug", FieldValue::Text(slug.to_string()));
        let order = RecordOrder::new("id", SortDirection::Asc);
        Ok(self.store.find(&predicate, &order, 0, 1).await?.into_iter().next())
    }

    pub async fn create(&self, input: CreateProfile, actor: Uuid) -> Result<Profile, ServiceError> {
        let mut errors = HashMap::new();
        check_name(&input.name, &mut errors);
        check_slug(&input.slug, &mut errors);
        check_description(&input.description, &mut errors);
        check_permissions(&input.permissions, &mut errors);
        if !errors.is_empty() {
            return Err(ServiceError::validation("Invalid profile", errors));
        }

        let name = input.name.trim().to_string();
        let slug = input.slug.trim().to_lowercase();
        self.ensure_unique("name", &name, None).await?;
        self.ensure_unique("slug", &slug, None).await?;

        let now = Utc::now();
        let profile = Profile {
            id: Uuid::new_v4(),
            name,
            slug,
            description: input.description.trim().to_string(),
            permissions: dedup(input.permissions),
            active: true,
            is_system: false,
            created_at: now,
            updated_at: now,
            created_by: Some(actor),
            updated_by: Some(actor),
            deleted_at: None,
            deleted_by: None,
        };

        let profile = self.store.insert(profile).await?;
        info!(id = %profile.id, slug = %profile.slug, "profile created");
        Ok(profile)
    }

    pub async fn update(&self, id: Uuid, input: UpdateProfile, actor: Uuid) -> Result<Profile, ServiceError> {
        if input.is_empty() {
            return Err(ServiceError::validation("No fields to update", HashMap::new()));
        }

        let mut errors = HashMap::new();
        if let Some(name) = &input.name {
            check_name(name, &mut errors);
        }
        if let Some(description) = &input.description {
            check_description(description, &mut errors);
        }
        if let Some(permissions) = &input.permissions {
            check_permissions(permissions, &mut errors);
        }
        if !errors.is_empty() {
            return Err(ServiceError::validation("Invalid profile", errors));
        }

        let mut profile = self.get(id).await?;

        if profile.is_system && input.active == Some(false) {
            return Err(ServiceError::Rejected("Cannot deactivate a system profile".to_string()));
        }
        if profile.is_system && input.permissions.is_some() {
            return Err(ServiceError::Rejected("Cannot modify system profile permissions".to_string()));
        }

        if let Some(name) = input.name {
            let name = name.trim().to_string();
            if name != profile.name {
                self.ensure_unique("name", &name, Some(id)).await?;
            }
            profile.name = name;
        }
        if let Some(description) = input.description {
            profile.description = description.trim().to_string();
        }
        if let Some(permissions) = input.permissions {
            profile.permissions = dedup(permissions);
        }
        if let Some(active) = input.active {
            profile.active = active;
        }

        self.save(profile, actor).await
    }

    /// Replaces the permission set of a custom profile.
    pub async fn update_permissions(
        &self,
        id: Uuid,
        permissions: Vec<String>,
        actor: Uuid,
    ) -> Result<Profile, ServiceError> {
        let mut errors = HashMap::new();
        check_permissions(&permissions, &mut errors);
        if !errors.is_empty() {
            return Err(ServiceError::validation("Invalid permissions", errors));
        }

        let mut profile = self.get(id).await?;
        if profile.is_system {
            return Err(ServiceError::Rejected("Cannot modify system profile permissions".to_string()));
        }
        profile.permissions = dedup(permissions);
        let profile = self.save(profile, actor).await?;
        info!(id = %id, count = profile.permissions.len(), "profile permissions replaced");
        Ok(profile)
    }

    /// Soft delete; built-in profiles are refused.
    pub async fn delete(&self, id: Uuid, actor: Uuid) -> Result<(), ServiceError> {
        let not_found = || ServiceError::NotFound("Profile not found or already deleted".to_string());
        let mut profile = self.store.get(id).await?.ok_or_else(not_found)?;
        if profile.is_system {
            return Err(ServiceError::Rejected("Cannot delete a system profile".to_string()));
        }

        let now = Utc::now();
        profile.active = false;
        profile.deleted_at = Some(now);
        profile.deleted_by = Some(actor);
        profile.updated_at = now;
        profile.updated_by = Some(actor);

        match self.store.update(profile).await {
            Ok(_) => {
                info!(id = %id, "profile deleted");
                Ok(())
            }
            Err(StoreError::NotFound(_)) => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }

    /// Union of the permissions of every active profile named in `roles`,
    /// with `manage` grants expanded. Unknown or inactive roles grant nothing.
    pub async fn resolve(&self, roles: &[String]) -> Result<BTreeSet<Permission>, ServiceError> {
        let mut granted = Vec::new();
        for role in roles {
            match self.find_by_slug(role).await? {
                Some(profile) if profile.active => {
                    // Names are validated on write; anything else is ignored.
                    granted.extend(profile.permissions.iter().filter_map(|p| p.parse::<Permission>().ok()));
                }
                _ => debug!(role = %role, "role does not name an active profile"),
            }
        }
        Ok(permissions::expand(granted))
    }

    /// Whether `slug` names a live, active profile.
    pub async fn is_assignable(&self, slug: &str) -> Result<bool, ServiceError> {
        Ok(matches!(self.find_by_slug(slug).await?, Some(p) if p.active))
    }

    /// Inserts any built-in profile that is missing. Returns how many were added.
    pub async fn seed_system_profiles(&self) -> Result<usize, ServiceError> {
        let now = Utc::now();
        let mut added = 0;
        for slug in ROLES {
            if self.find_by_slug(slug).await?.is_none() {
                self.store.insert(Profile::system(slug, now)).await?;
                added += 1;
            }
        }
        if added > 0 {
            info!(added, "seeded system profiles");
        }
        Ok(added)
    }

    async fn save(&self, mut profile: Profile, actor: Uuid) -> Result<Profile, ServiceError> {
        profile.updated_at = Utc::now();
        profile.updated_by = Some(actor);
        Ok(self.store.update(profile).await?)
    }

    async fn ensure_unique(&self, field: &str, value: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        let mut predicate = Predicate::live().equals(field, FieldValue::Text(value.to_string()));
        if let Some(id) = except {
            predicate = predicate.not_equals("id", FieldValue::Uuid(id));
        }
        if self.store.count(&predicate).await? > 0 {
            return Err(ServiceError::Conflict(format!("A profile with {} {} already exists", field, value)));
        }
        Ok(())
    }
}

fn dedup(permissions: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    permissions.into_iter().filter(|p| seen.insert(p.clone())).collect()
}

fn check_name(name: &str, errors: &mut HashMap<String, String>) {
    if !NAME_LEN.contains(&name.trim().chars().count()) {
        errors.insert("name".into(), format!("must be {} to {} characters", NAME_LEN.start(), NAME_LEN.end()));
    }
}

fn check_slug(slug: &str, errors: &mut HashMap<String, String>) {
    let slug = slug.trim();
    if !SLUG_LEN.contains(&slug.len()) || !slug.chars().all(|c| c.is_ascii_alphanumeric()) {
        errors.insert(
            "slug".into(),
            format!("must be {} to {} letters or digits", SLUG_LEN.start(), SLUG_LEN.end()),
        );
    }
}

fn check_description(description: &str, errors: &mut HashMap<String, String>) {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        errors.insert("description".into(), format!("must be at most {} characters", MAX_DESCRIPTION_LEN));
    }
}

fn check_permissions(names: &[String], errors: &mut HashMap<String, String>) {
    if let Err(unknown) = permissions::parse_all(names) {
        errors.insert("permissions".into(), format!("unknown permissions: {}", unknown.join(", ")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    fn service() -> ProfileService {
        ProfileService::new(Arc::new(MemoryStore::with_records(Profile::system_defaults())))
    }

    fn input(name: &str, slug: &str, permissions: &[&str]) -> CreateProfile {
        CreateProfile {
            name: name.into(),
            slug: slug.into(),
            description: String::new(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn roles(r: &[&str]) -> Vec<String> {
        r.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn resolves_system_roles_with_manage_expanded() {
        let svc = service();
        let admin = svc.resolve(&roles(&["administrador"])).await.unwrap();
        assert!(admin.contains(&Permission::ExpedienteDelete));

        let abogado = svc.resolve(&roles(&["abogado"])).await.unwrap();
        assert!(abogado.contains(&Permission::ExpedienteRead));
        assert!(!abogado.contains(&Permission::ExpedienteCreate));

        assert!(svc.resolve(&roles(&["invitado"])).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn custom_profile_grants_its_stored_permissions() {
        let svc = service();
        let actor = Uuid::new_v4();
        let archivo = svc
            .create(input("Archivero", "Archivero", &["expediente:read", "expediente:update", "expediente:read"]), actor)
            .await
            .unwrap();
        assert_eq!(archivo.slug, "archivero");
        assert_eq!(archivo.permissions, vec!["expediente:read", "expediente:update"]);
        assert!(!archivo.is_system);

        let granted = svc.resolve(&roles(&["archivero"])).await.unwrap();
        assert!(granted.contains(&Permission::ExpedienteUpdate));
        assert!(!granted.contains(&Permission::ExpedienteDelete));

        svc.update_permissions(archivo.id, vec!["dashboard:view".into()], actor).await.unwrap();
        let granted = svc.resolve(&roles(&["archivero"])).await.unwrap();
        assert_eq!(granted.into_iter().collect::<Vec<_>>(), vec![Permission::DashboardView]);

        let deactivate = UpdateProfile { active: Some(false), ..Default::default() };
        svc.update(archivo.id, deactivate, actor).await.unwrap();
        assert!(svc.resolve(&roles(&["archivero"])).await.unwrap().is_empty());
        assert!(!svc.is_assignable("archivero").await.unwrap());
    }

    #[tokio::test]
    async fn rejects_duplicates_and_bad_input() {
        let svc = service();
        let actor = Uuid::nil();
        assert!(matches!(
            svc.create(input("Otro juez", "juez", &[]), actor).await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(
            svc.create(input("Juez", "juez2", &[]), actor).await,
            Err(ServiceError::Conflict(_))
        ));

        match svc.create(input("X", "a-b", &["user:fly"]), actor).await.unwrap_err() {
            ServiceError::Validation { field_errors, .. } => {
                assert!(field_errors.contains_key("name"));
                assert!(field_errors.contains_key("slug"));
                assert!(field_errors["permissions"].contains("user:fly"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn system_profiles_are_protected() {
        let svc = service();
        let actor = Uuid::nil();
        let juez = svc.find_by_slug("juez").await.unwrap().unwrap();

        assert!(matches!(svc.delete(juez.id, actor).await, Err(ServiceError::Rejected(_))));
        assert!(matches!(
            svc.update_permissions(juez.id, vec![], actor).await,
            Err(ServiceError::Rejected(_))
        ));
        let deactivate = UpdateProfile { active: Some(false), ..Default::default() };
        assert!(matches!(svc.update(juez.id, deactivate, actor).await, Err(ServiceError::Rejected(_))));

        let rename = UpdateProfile { description: Some("Magistrado".into()), ..Default::default() };
        assert_eq!(svc.update(juez.id, rename, actor).await.unwrap().description, "Magistrado");
    }

    #[tokio::test]
    async fn soft_delete_frees_the_slug() {
        let svc = service();
        let actor = Uuid::new_v4();
        let temp = svc.create(input("Temporal", "temporal", &[]), actor).await.unwrap();

        svc.delete(temp.id, actor).await.unwrap();
        assert!(matches!(svc.get(temp.id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(svc.delete(temp.id, actor).await, Err(ServiceError::NotFound(_))));
        svc.create(input("Temporal", "temporal", &[]), actor).await.unwrap();
    }

    #[tokio::test]
    async fn seeding_only_adds_missing_profiles() {
        let svc = ProfileService::new(Arc::new(MemoryStore::<Profile>::new()));
        assert_eq!(svc.seed_system_profiles().await.unwrap(), ROLES.len());
        assert_eq!(svc.seed_system_profiles().await.unwrap(), 0);

        let page = svc.list(&SearchRequest::new(1, 10)).await.unwrap();
        assert_eq!(page.total, ROLES.len() as u64);
    }
}
