use sqlx::PgPool;
use tracing::info;

use crate::database::manager::DatabaseError;

/// Idempotent bootstrap DDL. Uniqueness only applies to live rows so a
/// soft-deleted record never blocks re-registration.
pub const BOOTSTRAP_STATEMENTS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS "expedientes" (
        "id" UUID PRIMARY KEY,
        "grado" TEXT NOT NULL,
        "apellidos_nombres" TEXT NOT NULL,
        "numero_paginas" INTEGER NOT NULL CHECK ("numero_paginas" >= 1),
        "situacion_militar" TEXT NOT NULL,
        "cip" TEXT NOT NULL,
        "estado" TEXT NOT NULL DEFAULT 'dentro' CHECK ("estado" IN ('dentro', 'fuera')),
        "ubicacion" TEXT NOT NULL,
        "orden" INTEGER NOT NULL CHECK ("orden" >= 1),
        "fecha_registro" TIMESTAMPTZ NOT NULL,
        "fecha_actualizacion" TIMESTAMPTZ NOT NULL,
        "created_at" TIMESTAMPTZ NOT NULL,
        "updated_at" TIMESTAMPTZ NOT NULL,
        "created_by" UUID NOT NULL,
        "updated_by" UUID NOT NULL,
        "deleted_at" TIMESTAMPTZ,
        "deleted_by" UUID
    )"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS "expedientes_cip_live"
        ON "expedientes" ("cip") WHERE "deleted_at" IS NULL"#,
    r#"CREATE INDEX IF NOT EXISTS "expedientes_fecha_registro"
        ON "expedientes" ("fecha_registro")"#,
    r#"CREATE TABLE IF NOT EXISTS "users" (
        "id" UUID PRIMARY KEY,
        "email" TEXT NOT NULL,
        "password_hash" TEXT NOT NULL,
        "nombre" TEXT NOT NULL,
        "apellido" TEXT NOT NULL,
        "documento" TEXT NOT NULL,
        "telefono" TEXT NOT NULL DEFAULT '',
        "roles" TEXT[] NOT NULL DEFAULT '{}',
        "activo" BOOLEAN NOT NULL DEFAULT TRUE,
        "created_at" TIMESTAMPTZ NOT NULL,
        "updated_at" TIMESTAMPTZ NOT NULL,
        "created_by" UUID,
        "updated_by" UUID,
        "deleted_at" TIMESTAMPTZ,
        "deleted_by" UUID
    )"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS "users_email_live"
        ON "users" ("email") WHERE "deleted_at" IS NULL"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS "users_documento_live"
        ON "users" ("documento") WHERE "deleted_at" IS NULL"#,
    r#"CREATE TABLE IF NOT EXISTS "profiles" (
        "id" UUID PRIMARY KEY,
        "name" TEXT NOT NULL,
        "slug" TEXT NOT NULL,
        "description" TEXT NOT NULL DEFAULT '',
        "permissions" TEXT[] NOT NULL DEFAULT '{}',
        "active" BOOLEAN NOT NULL DEFAULT TRUE,
        "is_system" BOOLEAN NOT NULL DEFAULT FALSE,
        "created_at" TIMESTAMPTZ NOT NULL,
        "updated_at" TIMESTAMPTZ NOT NULL,
        "created_by" UUID,
        "updated_by" UUID,
        "deleted_at" TIMESTAMPTZ,
        "deleted_by" UUID
    )"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS "profiles_slug_live"
        ON "profiles" ("slug") WHERE "deleted_at" IS NULL"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS "profiles_name_live"
        ON "profiles" ("name") WHERE "deleted_at" IS NULL"#,
];

pub async fn bootstrap(pool: &PgPool) -> Result<(), DatabaseError> {
    let mut tx = pool.begin().await?;
    for statement in BOOTSTRAP_STATEMENTS {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    info!("Applied {} bootstrap statements", BOOTSTRAP_STATEMENTS.len());
    Ok(())
}
