use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "user:create")]
    UserCreate,
    #[serde(rename = "user:read")]
    UserRead,
    #[serde(rename = "user:update")]
    UserUpdate,
    #[serde(rename = "user:delete")]
    UserDelete,
    #[serde(rename = "user:manage")]
    UserManage,
    #[serde(rename = "profile:read")]
    ProfileRead,
    #[serde(rename = "profile:create")]
    ProfileCreate,
    #[serde(rename = "profile:update")]
    ProfileUpdate,
    #[serde(rename = "profile:delete")]
    ProfileDelete,
    #[serde(rename = "expediente:create")]
    ExpedienteCreate,
    #[serde(rename = "expediente:read")]
    ExpedienteRead,
    #[serde(rename = "expediente:update")]
    ExpedienteUpdate,
    #[serde(rename = "expediente:delete")]
    ExpedienteDelete,
    #[serde(rename = "expediente:manage")]
    ExpedienteManage,
    #[serde(rename = "system:admin")]
    SystemAdmin,
    #[serde(rename = "system:read")]
    SystemRead,
    #[serde(rename = "dashboard:view")]
    DashboardView,
    #[serde(rename = "dashboard:stats")]
    DashboardStats,
    #[serde(rename = "dashboard:export")]
    DashboardExport,
}

use Permission::*;

/// Slugs of the built-in profiles seeded on startup.
pub const ROLES: &[&str] = &["administrador", "juez", "secretario", "abogado"];

/// Entry of the permission catalogue served to profile editors.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
}

impl Permission {
    pub const ALL: &'static [Permission] = &[
        UserCreate,
        UserRead,
        UserUpdate,
        UserDelete,
        UserManage,
        ProfileRead,
        ProfileCreate,
        ProfileUpdate,
        ProfileDelete,
        ExpedienteCreate,
        ExpedienteRead,
        ExpedienteUpdate,
        ExpedienteDelete,
        ExpedienteManage,
        SystemAdmin,
        SystemRead,
        DashboardView,
        DashboardStats,
        DashboardExport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserCreate => "user:create",
            UserRead => "user:read",
            UserUpdate => "user:update",
            UserDelete => "user:delete",
            UserManage => "user:manage",
            ProfileRead => "profile:read",
            ProfileCreate => "profile:create",
            ProfileUpdate => "profile:update",
            ProfileDelete => "profile:delete",
            ExpedienteCreate => "expediente:create",
            ExpedienteRead => "expediente:read",
            ExpedienteUpdate => "expediente:update",
            ExpedienteDelete => "expediente:delete",
            ExpedienteManage => "expediente:manage",
            SystemAdmin => "system:admin",
            SystemRead => "system:read",
            DashboardView => "dashboard:view",
            DashboardStats => "dashboard:stats",
            DashboardExport => "dashboard:export",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            UserCreate => "Crear usuarios",
            UserRead => "Ver usuarios",
            UserUpdate => "Actualizar usuarios",
            UserDelete => "Eliminar usuarios",
            UserManage => "Gestionar usuarios",
            ProfileRead => "Ver perfiles",
            ProfileCreate => "Crear perfiles",
            ProfileUpdate => "Actualizar perfiles",
            ProfileDelete => "Eliminar perfiles",
            ExpedienteCreate => "Crear expedientes",
            ExpedienteRead => "Ver expedientes",
            ExpedienteUpdate => "Actualizar expedientes",
            ExpedienteDelete => "Eliminar expedientes",
            ExpedienteManage => "Gestionar expedientes",
            SystemAdmin => "Administrador del sistema",
            SystemRead => "Consultar el sistema",
            DashboardView => "Ver dashboard",
            DashboardStats => "Ver estadísticas del dashboard",
            DashboardExport => "Exportar datos del dashboard",
        }
    }

    /// The resource prefix, e.g. `expediente` for `expediente:read`.
    pub fn category(&self) -> &'static str {
        self.as_str().split(':').next().unwrap_or_default()
    }

    pub fn info(&self) -> PermissionInfo {
        PermissionInfo { name: self.as_str(), description: self.description(), category: self.category() }
    }

    /// Operations a `manage` grant expands to.
    fn implied(&self) -> &'static [Permission] {
        match self {
            UserManage => &[UserCreate, UserRead, UserUpdate, UserDelete],
            ExpedienteManage => &[ExpedienteCreate, ExpedienteRead, ExpedienteUpdate, ExpedienteDelete],
            _ => &[],
        }
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .find(|p| p.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown permission '{}'", s))
    }
}

/// Permission set a built-in profile starts with.
pub fn default_permissions(slug: &str) -> &'static [Permission] {
    match slug {
        "administrador" => &[
            UserManage,
            ProfileRead,
            ProfileCreate,
            ProfileUpdate,
            ProfileDelete,
            ExpedienteManage,
            SystemAdmin,
            SystemRead,
            DashboardView,
            DashboardStats,
            DashboardExport,
        ],
        "juez" => &[
            UserRead,
            ProfileRead,
            ExpedienteRead,
            ExpedienteUpdate,
            SystemRead,
            DashboardView,
            DashboardStats,
        ],
        "secretario" => &[
            UserRead,
            ProfileRead,
            ExpedienteCreate,
            ExpedienteRead,
            ExpedienteUpdate,
            SystemRead,
            DashboardView,
            DashboardStats,
        ],
        "abogado" => &[ProfileRead, ExpedienteRead, SystemRead, DashboardView],
        _ => &[],
    }
}

/// Adds every permission implied by a `manage` grant.
pub fn expand<I>(granted: I) -> BTreeSet<Permission>
where
    I: IntoIterator<Item = Permission>,
{
    let mut out = BTreeSet::new();
    for permission in granted {
        out.insert(permission);
        out.extend(permission.implied().iter().copied());
    }
    out
}

/// Parses stored permission names; unknown names are returned as the error.
pub fn parse_all(names: &[String]) -> Result<Vec<Permission>, Vec<String>> {
    let mut parsed = Vec::with_capacity(names.len());
    let mut unknown = Vec::new();
    for name in names {
        match name.parse::<Permission>() {
            Ok(p) => parsed.push(p),
            Err(_) => unknown.push(name.clone()),
        }
    }
    if unknown.is_empty() {
        Ok(parsed)
    } else {
        Err(unknown)
    }
}

pub fn catalog() -> Vec<PermissionInfo> {
    Permission::ALL.iter().map(Permission::info).collect()
}
