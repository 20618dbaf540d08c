use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::entity::Entity;
use crate::filter::{FieldKind, FieldSpec, FieldValue};

pub const GRADOS: &[&str] = &[
    "GRAL", "CRL", "TTE CRL", "MY", "CAP", "TTE", "STTE", "TCO", "SSOO", "EC", "TROPA",
];

pub const SITUACIONES_MILITARES: &[&str] = &["Actividad", "Retiro"];

pub const ESTADOS: &[&str] = &["dentro", "fuera"];

/// Whether the physical file is inside or outside the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Estado {
    #[default]
    Dentro,
    Fuera,
}

impl Estado {
    pub fn as_str(&self) -> &'static str {
        match self {
            Estado::Dentro => "dentro",
            Estado::Fuera => "fuera",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Expediente {
    pub id: Uuid,
    pub grado: String,
    pub apellidos_nombres: String,
    pub numero_paginas: i32,
    pub situacion_militar: String,
    pub cip: String,
    pub estado: String,
    pub ubicacion: String,
    pub orden: i32,
    pub fecha_registro: DateTime<Utc>,
    pub fecha_actualizacion: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub updated_by: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<Uuid>,
}

impl Entity for Expediente {
    const TABLE: &'static str = "expedientes";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::sort_only("id", FieldKind::Uuid),
        FieldSpec::new("grado", FieldKind::Enum(GRADOS)),
        FieldSpec::new("apellidos_nombres", FieldKind::Text),
        FieldSpec::new("numero_paginas", FieldKind::Integer),
        FieldSpec::new("situacion_militar", FieldKind::Enum(SITUACIONES_MILITARES)),
        FieldSpec::new("cip", FieldKind::Text),
        FieldSpec::new("estado", FieldKind::Enum(ESTADOS)),
        FieldSpec::new("ubicacion", FieldKind::Text),
        FieldSpec::new("orden", FieldKind::Integer),
        FieldSpec::sort_only("fecha_registro", FieldKind::Timestamp),
        FieldSpec::sort_only("fecha_actualizacion", FieldKind::Timestamp),
        FieldSpec::sort_only("created_at", FieldKind::Timestamp),
        FieldSpec::sort_only("updated_at", FieldKind::Timestamp),
        FieldSpec::hidden("created_by", FieldKind::Uuid),
        FieldSpec::hidden("updated_by", FieldKind::Uuid),
        FieldSpec::hidden("deleted_at", FieldKind::Timestamp),
        FieldSpec::hidden("deleted_by", FieldKind::Uuid),
    ];
    const DATE_FIELD: &'static str = "fecha_registro";

    fn id(&self) -> Uuid {
        self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "id" => FieldValue::Uuid(self.id),
            "grado" => FieldValue::Text(self.grado.clone()),
            "apellidos_nombres" => FieldValue::Text(self.apellidos_nombres.clone()),
            "numero_paginas" => FieldValue::Integer(self.numero_paginas as i64),
            "situacion_militar" => FieldValue::Text(self.situacion_militar.clone()),
            "cip" => FieldValue::Text(self.cip.clone()),
            "estado" => FieldValue::Text(self.estado.clone()),
            "ubicacion" => FieldValue::Text(self.ubicacion.clone()),
            "orden" => FieldValue::Integer(self.orden as i64),
            "fecha_registro" => FieldValue::Timestamp(self.fecha_registro),
            "fecha_actualizacion" => FieldValue::Timestamp(self.fecha_actualizacion),
            "created_at" => FieldValue::Timestamp(self.created_at),
            "updated_at" => FieldValue::Timestamp(self.updated_at),
            "created_by" => FieldValue::Uuid(self.created_by),
            "updated_by" => FieldValue::Uuid(self.updated_by),
            "deleted_at" => FieldValue::Timestamp(self.deleted_at?),
            "deleted_by" => FieldValue::Uuid(self.deleted_by?),
            _ => return None,
        };
        Some(value)
    }

    fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Body of `POST /api/expedientes`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateExpediente {
    pub grado: String,
    pub apellidos_nombres: String,
    pub numero_paginas: i32,
    pub situacion_militar: String,
    pub cip: String,
    pub orden: i32,
    #[serde(default)]
    pub ubicacion: Option<String>,
    #[serde(default)]
    pub estado: Option<Estado>,
    #[serde(default)]
    pub fecha_registro: Option<DateTime<Utc>>,
}

/// Body of `PUT /api/expedientes/:id`. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateExpediente {
    pub grado: Option<String>,
    pub apellidos_nombres: Option<String>,
    pub numero_paginas: Option<i32>,
    pub situacion_militar: Option<String>,
    pub cip: Option<String>,
    pub estado: Option<Estado>,
    pub ubicacion: Option<String>,
    pub orden: Option<i32>,
}

impl UpdateExpediente {
    pub fn is_empty(&self) -> bool {
        self.grado.is_none()
            && self.apellidos_nombres.is_none()
            && self.numero_paginas.is_none()
            && self.situacion_militar.is_none()
            && self.cip.is_none()
            && self.estado.is_none()
            && self.ubicacion.is_none()
            && self.orden.is_none()
    }
}

/// Two-letter shelf code from the first surname, padded with `Z`.
/// Upper-casing happens first, so an expanding letter still yields two.
pub fn derive_ubicacion(apellidos_nombres: &str) -> String {
    let first = apellidos_nombres.split_whitespace().next().unwrap_or("");
    let mut code: String = first.chars().flat_map(char::to_uppercase).take(2).collect();
    while code.chars().count() < 2 {
        code.push('Z');
    }
    code
}

/// Filing order: grado rank (GRAL = 1) times 1000 plus situación rank
/// (Actividad = 1) times 100. Unknown values rank 0.
pub fn derive_orden(grado: &str, situacion_militar: &str) -> i32 {
    let rank = |catalogue: &[&str], value: &str| {
        catalogue
            .iter()
            .position(|c| c.eq_ignore_ascii_case(value.trim()))
            .map_or(0, |i| i as i32 + 1)
    };
    rank(GRADOS, grado) * 1000 + rank(SITUACIONES_MILITARES, situacion_militar) * 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_location_from_first_surname() {
        assert_eq!(derive_ubicacion("perez gomez, juan"), "PE");
        assert_eq!(derive_ubicacion("  Ñuñez Rojas"), "ÑU");
        assert_eq!(derive_ubicacion("O"), "OZ");
        assert_eq!(derive_ubicacion(""), "ZZ");
        assert_eq!(derive_ubicacion("ßa Lopez"), "SS");
    }

    #[test]
    fn orden_ranks_grado_then_situacion() {
        assert_eq!(derive_orden("GRAL", "Actividad"), 1100);
        assert_eq!(derive_orden("cap", "retiro"), 5200);
        assert_eq!(derive_orden("TROPA", "Actividad"), 11100);
        assert!(derive_orden("CRL", "Retiro") < derive_orden("TTE CRL", "Actividad"));
    }

    #[test]
    fn estado_defaults_to_dentro() {
        assert_eq!(Estado::default(), Estado::Dentro);
        assert_eq!(Estado::Fuera.as_str(), "fuera");
    }

    #[test]
    fn update_emptiness() {
        assert!(UpdateExpediente::default().is_empty());
        let update = UpdateExpediente { orden: Some(2), ..Default::default() };
        assert!(!update.is_empty());
    }
}
