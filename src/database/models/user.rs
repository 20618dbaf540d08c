use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::entity::Entity;
use crate::filter::{FieldKind, FieldSpec, FieldValue};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub nombre: String,
    pub apellido: String,
    pub documento: String,
    pub telefono: String,
    pub roles: Vec<String>,
    pub activo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<Uuid>,
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::sort_only("id", FieldKind::Uuid),
        FieldSpec::new("email", FieldKind::Text),
        FieldSpec::new("nombre", FieldKind::Text),
        FieldSpec::new("apellido", FieldKind::Text),
        FieldSpec::new("documento", FieldKind::Text),
        FieldSpec::new("telefono", FieldKind::Text),
        FieldSpec::new("activo", FieldKind::Bool),
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
            "email" => FieldValue::Text(self.email.clone()),
            "nombre" => FieldValue::Text(self.nombre.clone()),
            "apellido" => FieldValue::Text(self.apellido.clone()),
            "documento" => FieldValue::Text(self.documento.clone()),
            "telefono" => FieldValue::Text(self.telefono.clone()),
            "activo" => FieldValue::Bool(self.activo),
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

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub password: String,
    pub nombre: String,
    pub apellido: String,
    pub documento: String,
    #[serde(default)]
    pub telefono: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub password: Option<String>,
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub documento: Option<String>,
    pub telefono: Option<String>,
    pub roles: Option<Vec<String>>,
    pub activo: Option<bool>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.password.is_none()
            && self.nombre.is_none()
            && self.apellido.is_none()
            && self.documento.is_none()
            && self.telefono.is_none()
            && self.roles.is_none()
            && self.activo.is_none()
    }
}

/// Body of `PUT /api/users/profile`: the fields a user may change on their
/// own account.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOwnUser {
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub telefono: Option<String>,
}

impl From<UpdateOwnUser> for UpdateUser {
    fn from(own: UpdateOwnUser) -> Self {
        UpdateUser { nombre: own.nombre, apellido: own.apellido, telefono: own.telefono, ..Default::default() }
    }
}

/// Body of `PUT /api/users/password`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangePassword {
    pub current_password: String,
    pub new_password: String,
}
