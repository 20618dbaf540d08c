use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::database::models::{ChangePassword, CreateUser, UpdateOwnUser, UpdateUser, User};
use crate::database::{RecordStore, StoreError};
use crate::filter::{FieldValue, Predicate, SearchRequest};
use crate::services::error::ServiceError;
use crate::services::list_service::ListService;
use crate::services::page::PageResult;
use crate::services::profile_service::ProfileService;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn RecordStore<User>>,
    listing: ListService<User>,
    profiles: ProfileService,
}

impl UserService {
    /// Roles are checked against `profiles` when they are assigned.
    pub fn new(store: Arc<dyn RecordStore<User>>, profiles: ProfileService) -> Self {
        let listing = ListService::new(store.clone());
        Self { store, listing, profiles }
    }

    pub async fn list(&self, request: &SearchRequest) -> Result<PageResult<User>, ServiceError> {
        self.listing.list(request).await
    }

    pub async fn get(&self, id: Uuid) -> Result<User, ServiceError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    pub async fn create(&self, input: CreateUser, actor: Option<Uuid>) -> Result<User, ServiceError> {
        let mut errors = HashMap::new();
        check_email(&input.email, &mut errors);
        check_password(&input.password, &mut errors);
        check_required("nombre", &input.nombre, &mut errors);
        check_required("apellido", &input.apellido, &mut errors);
        check_required("documento", &input.documento, &mut errors);
        self.check_roles(&input.roles, &mut errors).await?;
        if !errors.is_empty() {
            return Err(ServiceError::validation("Invalid user", errors));
        }

        let email = input.email.trim().to_lowercase();
        let documento = input.documento.trim().to_string();
        self.ensure_unique("email", &email, None).await?;
        self.ensure_unique("documento", &documento, None).await?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            password_hash: hash_password(&input.password)?,
            nombre: input.nombre.trim().to_string(),
            apellido: input.apellido.trim().to_string(),
            documento,
            telefono: input.telefono.trim().to_string(),
            roles: input.roles,
            activo: true,
            created_at: now,
            updated_at: now,
            created_by: actor,
            updated_by: actor,
            deleted_at: None,
            deleted_by: None,
        };

        let user = self.store.insert(user).await?;
        info!(id = %user.id, email = %user.email, "user created");
        Ok(user)
    }

    pub async fn update(&self, id: Uuid, input: UpdateUser, actor: Uuid) -> Result<User, ServiceError> {
        if input.is_empty() {
            return Err(ServiceError::validation("No fields to update", HashMap::new()));
        }

        let mut errors = HashMap::new();
        if let Some(email) = &input.email {
            check_email(email, &mut errors);
        }
        if let Some(password) = &input.password {
            check_password(password, &mut errors);
        }
        if let Some(nombre) = &input.nombre {
            check_required("nombre", nombre, &mut errors);
        }
        if let Some(apellido) = &input.apellido {
            check_required("apellido", apellido, &mut errors);
        }
        if let Some(documento) = &input.documento {
            check_required("documento", documento, &mut errors);
        }
        if let Some(roles) = &input.roles {
            self.check_roles(roles, &mut errors).await?;
        }
        if !errors.is_empty() {
            return Err(ServiceError::validation("Invalid user", errors));
        }

        let mut user = self.get(id).await?;

        if let Some(email) = input.email {
            let email = email.trim().to_lowercase();
            if email != user.email {
                self.ensure_unique("email", &email, Some(id)).await?;
            }
            user.email = email;
        }
        if let Some(documento) = input.documento {
            let documento = documento.trim().to_string();
            if documento != user.documento {
                self.ensure_unique("documento", &documento, Some(id)).await?;
            }
            user.documento = documento;
        }
        if let Some(password) = input.password {
            user.password_hash = hash_password(&password)?;
        }
        if let Some(nombre) = input.nombre {
            user.nombre = nombre.trim().to_string();
        }
        if let Some(apellido) = input.apellido {
            user.apellido = apellido.trim().to_string();
        }
        if let Some(telefono) = input.telefono {
            user.telefono = telefono.trim().to_string();
        }
        if let Some(roles) = input.roles {
            user.roles = roles;
        }
        if let Some(activo) = input.activo {
            user.activo = activo;
        }

        user.updated_at = Utc::now();
        user.updated_by = Some(actor);
        Ok(self.store.update(user).await?)
    }

    /// Changes the caller's own name and phone; nothing else is reachable.
    pub async fn update_own(&self, id: Uuid, input: UpdateOwnUser) -> Result<User, ServiceError> {
        self.update(id, input.into(), id).await
    }

    /// Replaces the caller's password after checking the current one.
    pub async fn change_password(&self, id: Uuid, input: ChangePassword) -> Result<(), ServiceError> {
        let mut errors = HashMap::new();
        check_required("current_password", &input.current_password, &mut errors);
        check_password_field("new_password", &input.new_password, &mut errors);
        if !errors.is_empty() {
            return Err(ServiceError::validation("Invalid password change", errors));
        }

        let mut user = self.get(id).await?;
        if !verify_password(&input.current_password, &user.password_hash) {
            return Err(ServiceError::Rejected("Current password is incorrect".to_string()));
        }

        user.password_hash = hash_password(&input.new_password)?;
        user.updated_at = Utc::now();
        user.updated_by = Some(id);
        self.store.update(user).await?;
        info!(id = %id, "password changed");
        Ok(())
    }

    /// Soft delete; the account is also deactivated.
    pub async fn delete(&self, id: Uuid, actor: Uuid) -> Result<(), ServiceError> {
        let not_found = || ServiceError::NotFound("User not found or already deleted".to_string());
        let mut user = self.store.get(id).await?.ok_or_else(not_found)?;

        let now = Utc::now();
        user.activo = false;
        user.deleted_at = Some(now);
        user.deleted_by = Some(actor);
        user.updated_at = now;
        user.updated_by = Some(actor);

        match self.store.update(user).await {
            Ok(_) => {
                info!(id = %id, "user deleted");
                Ok(())
            }
            Err(StoreError::NotFound(_)) => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }

    async fn check_roles(&self, roles: &[String], errors: &mut HashMap<String, String>) -> Result<(), ServiceError> {
        for role in roles {
            if !self.profiles.is_assignable(role).await? {
                errors.insert("roles".into(), format!("'{}' is not an active profile", role));
                break;
            }
        }
        Ok(())
    }

    async fn ensure_unique(&self, field: &str, value: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        let mut predicate = Predicate::live().equals(field, FieldValue::Text(value.to_string()));
        if let Some(id) = except {
            predicate = predicate.not_equals("id", FieldValue::Uuid(id));
        }
        if self.store.count(&predicate).await? > 0 {
            return Err(ServiceError::Conflict(format!("A user with {} {} already exists", field, value)));
        }
        Ok(())
    }
}

fn check_email(email: &str, errors: &mut HashMap<String, String>) {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if !valid {
        errors.insert("email".into(), "must be a valid email address".into());
    }
}

fn check_password(password: &str, errors: &mut HashMap<String, String>) {
    check_password_field("password", password, errors);
}

fn check_password_field(field: &str, password: &str, errors: &mut HashMap<String, String>) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.insert(field.into(), format!("must be at least {} characters", MIN_PASSWORD_LEN));
    }
}

fn check_required(field: &str, value: &str, errors: &mut HashMap<String, String>) {
    if value.trim().is_empty() {
        errors.insert(field.into(), "This field is required".into());
    }
}
