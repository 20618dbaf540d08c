use async_trait::async_trait;
use sqlx::{postgres::PgRow, FromRow, PgPool};
use uuid::Uuid;

use crate::database::entity::Entity;
use crate::database::models::{Expediente, Profile, User};
use crate::database::query_builder::QueryBuilder;
use crate::database::store::{RecordStore, StoreError};
use crate::filter::{FieldValue, Predicate, RecordOrder};

/// Row-level writes for a record type stored in Postgres.
#[async_trait]
pub trait PgPersist: Entity + for<'r> FromRow<'r, PgRow> + Send + Unpin {
    async fn pg_insert(&self, pool: &PgPool) -> Result<Self, sqlx::Error>;

    /// Returns `None` when no live row carries this id.
    async fn pg_update(&self, pool: &PgPool) -> Result<Option<Self>, sqlx::Error>;
}

pub struct PgStore<T> {
    pool: PgPool,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> PgStore<T> {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, _phantom: std::marker::PhantomData }
    }
}

#[async_trait]
impl<T: PgPersist> RecordStore<T> for PgStore<T> {
    async fn count(&self, predicate: &Predicate) -> Result<u64, StoreError> {
        let count = QueryBuilder::<T>::new()?
            .predicate(predicate.clone())?
            .count(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn find(
        &self,
        predicate: &Predicate,
        order: &RecordOrder,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<T>, StoreError> {
        let rows = QueryBuilder::<T>::new()?
            .predicate(predicate.clone())?
            .order(order.clone())?
            .window(limit as i64, skip as i64)?
            .select_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        let rows = QueryBuilder::<T>::new()?
            .predicate(Predicate::live().equals("id", FieldValue::Uuid(id)))?
            .window(1, 0)?
            .select_all(&self.pool)
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, record: T) -> Result<T, StoreError> {
        Ok(record.pg_insert(&self.pool).await?)
    }

    async fn update(&self, record: T) -> Result<T, StoreError> {
        record
            .pg_update(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(record.id()))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl PgPersist for Expediente {
    async fn pg_insert(&self, pool: &PgPool) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Expediente>(
            r#"INSERT INTO "expedientes" (
                "id", "grado", "apellidos_nombres", "numero_paginas", "situacion_militar",
                "cip", "estado", "ubicacion", "orden", "fecha_registro", "fecha_actualizacion",
                "created_at", "updated_at", "created_by", "updated_by", "deleted_at", "deleted_by"
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING *"#,
        )
        .bind(self.id)
        .bind(&self.grado)
        .bind(&self.apellidos_nombres)
        .bind(self.numero_paginas)
        .bind(&self.situacion_militar)
        .bind(&self.cip)
        .bind(&self.estado)
        .bind(&self.ubicacion)
        .bind(self.orden)
        .bind(self.fecha_registro)
        .bind(self.fecha_actualizacion)
        .bind(self.created_at)
        .bind(self.updated_at)
        .bind(self.created_by)
        .bind(self.updated_by)
        .bind(self.deleted_at)
        .bind(self.deleted_by)
        .fetch_one(pool)
        .await
    }

    async fn pg_update(&self, pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Expediente>(
            r#"UPDATE "expedientes" SET
                "grado" = $2, "apellidos_nombres" = $3, "numero_paginas" = $4,
                "situacion_militar" = $5, "cip" = $6, "estado" = $7, "ubicacion" = $8,
                "orden" = $9, "fecha_actualizacion" = $10, "updated_at" = $11,
                "updated_by" = $12, "deleted_at" = $13, "deleted_by" = $14
            WHERE "id" = $1 AND "deleted_at" IS NULL
            RETURNING *"#,
        )
        .bind(self.id)
        .bind(&self.grado)
        .bind(&self.apellidos_nombres)
        .bind(self.numero_paginas)
        .bind(&self.situacion_militar)
        .bind(&self.cip)
        .bind(&self.estado)
        .bind(&self.ubicacion)
        .bind(self.orden)
        .bind(self.fecha_actualizacion)
        .bind(self.updated_at)
        .bind(self.updated_by)
        .bind(self.deleted_at)
        .bind(self.deleted_by)
        .fetch_optional(pool)
        .await
    }
}

#[async_trait]
impl PgPersist for User {
    async fn pg_insert(&self, pool: &PgPool) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO "users" (
                "id", "email", "password_hash", "nombre", "apellido", "documento", "telefono",
                "roles", "activo", "created_at", "updated_at", "created_by", "updated_by",
                "deleted_at", "deleted_by"
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *"#,
        )
        .bind(self.id)
        .bind(&self.email)
        .bind(&self.password_hash)
        .bind(&self.nombre)
        .bind(&self.apellido)
        .bind(&self.documento)
        .bind(&self.telefono)
        .bind(&self.roles)
        .bind(self.activo)
        .bind(self.created_at)
        .bind(self.updated_at)
        .bind(self.created_by)
        .bind(self.updated_by)
        .bind(self.deleted_at)
        .bind(self.deleted_by)
        .fetch_one(pool)
        .await
    }

    async fn pg_update(&self, pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"UPDATE "users" SET
                "email" = $2, "password_hash" = $3, "nombre" = $4, "apellido" = $5,
                "documento" = $6, "telefono" = $7, "roles" = $8, "activo" = $9,
                "updated_at" = $10, "updated_by" = $11, "deleted_at" = $12, "deleted_by" = $13
            WHERE "id" = $1 AND "deleted_at" IS NULL
            RETURNING *"#,
        )
        .bind(self.id)
        .bind(&self.email)
        .bind(&self.password_hash)
        .bind(&self.nombre)
        .bind(&self.apellido)
        .bind(&self.documento)
        .bind(&self.telefono)
        .bind(&self.roles)
        .bind(self.activo)
        .bind(self.updated_at)
        .bind(self.updated_by)
        .bind(self.deleted_at)
        .bind(self.deleted_by)
        .fetch_optional(pool)
        .await
    }
}

#[async_trait]
impl PgPersist for Profile {
    async fn pg_insert(&self, pool: &PgPool) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            r#"INSERT INTO "profiles" (
                "id", "name", "slug", "description", "permissions", "active", "is_system",
                "created_at", "updated_at", "created_by", "updated_by", "deleted_at", "deleted_by"
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *"#,
        )
        .bind(self.id)
        .bind(&self.name)
        .bind(&self.slug)
        .bind(&self.description)
        .bind(&self.permissions)
        .bind(self.active)
        .bind(self.is_system)
        .bind(self.created_at)
        .bind(self.updated_at)
        .bind(self.created_by)
        .bind(self.updated_by)
        .bind(self.deleted_at)
        .bind(self.deleted_by)
        .fetch_one(pool)
        .await
    }

    async fn pg_update(&self, pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            r#"UPDATE "profiles" SET
                "name" = $2, "description" = $3, "permissions" = $4, "active" = $5,
                "updated_at" = $6, "updated_by" = $7, "deleted_at" = $8, "deleted_by" = $9
            WHERE "id" = $1 AND "deleted_at" IS NULL
            RETURNING *"#,
        )
        .bind(self.id)
        .bind(&self.name)
        .bind(&self.description)
        .bind(&self.permissions)
        .bind(self.active)
        .bind(self.updated_at)
        .bind(self.updated_by)
        .bind(self.deleted_at)
        .bind(self.deleted_by)
        .fetch_optional(pool)
        .await
    }
}
