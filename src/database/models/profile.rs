use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::auth::permissions::{default_permissions, ROLES};
use crate::database::entity::Entity;
use crate::filter::{FieldKind, FieldSpec, FieldValue};

/// A named permission set. Users reference profiles by slug in their roles.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub permissions: Vec<String>,
    pub active: bool,
    /// Built-in profiles cannot be deleted, deactivated or have their
    /// permissions replaced.
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<Uuid>,
}

impl Entity for Profile {
    const TABLE: &'static str = "profiles";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::sort_only("id", FieldKind::Uuid),
        FieldSpec::new("name", FieldKind::Text),
        FieldSpec::new("slug", FieldKind::Text),
        FieldSpec::new("description", FieldKind::Text),
        FieldSpec::new("active", FieldKind::Bool),
        FieldSpec::new("is_system", FieldKind::Bool),
        FieldSpec::sort_only("created_at", FieldKind::Timestamp),
        FieldSpec::sort_only("updated_at", FieldKind::Timestamp),
        FieldSpec::hidden("deleted_at", FieldKind::Timestamp),
    ];
    const DATE_FIELD: &'static str = "created_at";

    fn id(&self) -> Uuid {
        self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "id" => FieldValue::Uuid(self.id),
            "name" => FieldValue::Text(self.name.clone()),
            "slug" => FieldValue::Text(self.slug.clone()),
            "description" => FieldValue::Text(self.description.clone()),
            "active" => FieldValue::Bool(self.active),
            "is_system" => FieldValue::Bool(self.is_system),
            "created_at" => FieldValue::Timestamp(self.created_at),
            "updated_at" => FieldValue::Timestamp(self.updated_at),
            "deleted_at" => FieldValue::Timestamp(self.deleted_at?),
            _ => return None,
        };
        Some(value)
    }

    fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl Profile {
    /// Built-in profile for one of [`ROLES`] with its default permissions.
    pub fn system(slug: &str, now: DateTime<Utc>) -> Self {
        let (name, description) = match slug {
            "administrador" => ("Administrador", "Acceso completo al sistema"),
            "juez" => ("Juez", "Consulta y actualización de expedientes"),
            "secretario" => ("Secretario", "Registro y actualización de expedientes"),
            "abogado" => ("Abogado", "Consulta de expedientes"),
            other => (other, ""),
        };
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slug.to_string(),
            description: description.to_string(),
            permissions: default_permissions(slug).iter().map(|p| p.as_str().to_string()).collect(),
            active: true,
            is_system: true,
            created_at: now,
            updated_at: now,
            created_by: None,
            updated_by: None,
            deleted_at: None,
            deleted_by: None,
        }
    }

    pub fn system_defaults() -> Vec<Self> {
        let now = Utc::now();
        ROLES.iter().map(|slug| Self::system(slug, now)).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProfile {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfile {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
    pub active: Option<bool>,
}

impl UpdateProfile {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.permissions.is_none() && self.active.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_defaults_cover_every_role() {
        let profiles = Profile::system_defaults();
        assert_eq!(profiles.len(), ROLES.len());
        assert!(profiles.iter().all(|p| p.is_system && p.active));

        let abogado = profiles.iter().find(|p| p.slug == "abogado").unwrap();
        assert_eq!(abogado.name, "Abogado");
        assert!(abogado.permissions.contains(&"expediente:read".to_string()));
    }
}
