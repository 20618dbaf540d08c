use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::models::expediente::{
    derive_orden, derive_ubicacion, CreateExpediente, Estado, Expediente, UpdateExpediente, ESTADOS,
    GRADOS, SITUACIONES_MILITARES,
};
use crate::database::RecordStore;
use crate::filter::{FieldValue, Predicate, RecordOrder, SearchRequest, SortDirection};
use crate::services::error::ServiceError;
use crate::services::list_service::ListService;
use crate::services::page::PageResult;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExpedienteStats {
    pub total_expedientes: u64,
    pub expedientes_dentro: u64,
    pub expedientes_fuera: u64,
    pub personal_actividad: u64,
    pub personal_retiro: u64,
    pub porcentaje_dentro: f64,
    pub porcentaje_fuera: f64,
    pub por_grado: BTreeMap<String, u64>,
    pub total_paginas: u64,
    /// Ten busiest shelf codes, largest first.
    pub por_ubicacion: Vec<UbicacionStats>,
    pub temporal: TemporalStats,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UbicacionStats {
    pub ubicacion: String,
    pub total: u64,
    pub porcentaje: f64,
    pub total_paginas: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TemporalStats {
    /// Registered within the last 30 days.
    pub ultimos_30_dias: u64,
    /// The twelve most recent months with registrations, newest first.
    pub por_mes: Vec<MonthlyCount>,
    pub por_ano: Vec<YearlyCount>,
    pub tendencia: Trend,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthlyCount {
    pub ano: i32,
    pub mes: u32,
    pub mes_nombre: &'static str,
    pub total: u64,
    pub porcentaje: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct YearlyCount {
    pub ano: i32,
    pub total: u64,
    pub porcentaje: f64,
}

/// Newest month compared with the one before it.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Creciente,
    Decreciente,
    Estable,
}

const STATS_BATCH: u64 = 500;
const TOP_UBICACIONES: usize = 10;
const MONTHS_SHOWN: usize = 12;
const MESES: [&str; 12] = [
    "Enero", "Febrero", "Marzo", "Abril", "Mayo", "Junio", "Julio", "Agosto", "Septiembre", "Octubre",
    "Noviembre", "Diciembre",
];

#[derive(Clone)]
pub struct ExpedienteService {
    store: Arc<dyn RecordStore<Expediente>>,
    listing: ListService<Expediente>,
}

impl ExpedienteService {
    pub fn new(store: Arc<dyn RecordStore<Expediente>>) -> Self {
        let listing = ListService::new(store.clone());
        Self { store, listing }
    }

    pub async fn list(&self, request: &SearchRequest) -> Result<PageResult<Expediente>, ServiceError> {
        self.listing.list(request).await
    }

    pub async fn health_check(&self) -> Result<(), ServiceError> {
        Ok(self.store.health_check().await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Expediente, ServiceError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Expediente not found".to_string()))
    }

    pub async fn create(&self, input: CreateExpediente, actor: Uuid) -> Result<Expediente, ServiceError> {
        let mut errors = HashMap::new();
        check_grado(&input.grado, &mut errors);
        check_situacion(&input.situacion_militar, &mut errors);
        check_required("apellidos_nombres", &input.apellidos_nombres, &mut errors);
        check_required("cip", &input.cip, &mut errors);
        check_min_one("numero_paginas", input.numero_paginas, &mut errors);
        check_min_one("orden", input.orden, &mut errors);
        if !errors.is_empty() {
            return Err(ServiceError::validation("Invalid expediente", errors));
        }

        let cip = input.cip.trim().to_string();
        self.ensure_cip_available(&cip, None).await?;

        let ubicacion = match input.ubicacion.as_deref().map(str::trim) {
            Some(u) if !u.is_empty() => u.to_string(),
            _ => derive_ubicacion(&input.apellidos_nombres),
        };

        let now = Utc::now();
        let record = Expediente {
            id: Uuid::new_v4(),
            grado: canonical(GRADOS, &input.grado),
            apellidos_nombres: input.apellidos_nombres.trim().to_string(),
            numero_paginas: input.numero_paginas,
            situacion_militar: canonical(SITUACIONES_MILITARES, &input.situacion_militar),
            cip,
            estado: input.estado.unwrap_or_default().as_str().to_string(),
            ubicacion,
            orden: input.orden,
            fecha_registro: input.fecha_registro.unwrap_or(now),
            fecha_actualizacion: now,
            created_at: now,
            updated_at: now,
            created_by: actor,
            updated_by: actor,
            deleted_at: None,
            deleted_by: None,
        };

        let record = self.store.insert(record).await?;
        info!(id = %record.id, cip = %record.cip, "expediente created");
        Ok(record)
    }

    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateExpediente,
        actor: Uuid,
    ) -> Result<Expediente, ServiceError> {
        if input.is_empty() {
            return Err(ServiceError::validation("No fields to update", HashMap::new()));
        }

        let mut errors = HashMap::new();
        if let Some(grado) = &input.grado {
            check_grado(grado, &mut errors);
        }
        if let Some(situacion) = &input.situacion_militar {
            check_situacion(situacion, &mut errors);
        }
        if let Some(nombre) = &input.apellidos_nombres {
            check_required("apellidos_nombres", nombre, &mut errors);
        }
        if let Some(cip) = &input.cip {
            check_required("cip", cip, &mut errors);
        }
        if let Some(ubicacion) = &input.ubicacion {
            check_required("ubicacion", ubicacion, &mut errors);
        }
        if let Some(n) = input.numero_paginas {
            check_min_one("numero_paginas", n, &mut errors);
        }
        if let Some(n) = input.orden {
            check_min_one("orden", n, &mut errors);
        }
        if !errors.is_empty() {
            return Err(ServiceError::validation("Invalid expediente", errors));
        }

        let mut record = self.get(id).await?;
        let rename = input.apellidos_nombres.is_some() && input.ubicacion.is_none();
        let rerank = (input.grado.is_some() || input.situacion_militar.is_some()) && input.orden.is_none();

        if let Some(cip) = input.cip {
            let cip = cip.trim().to_string();
            if cip != record.cip {
                self.ensure_cip_available(&cip, Some(id)).await?;
            }
            record.cip = cip;
        }
        if let Some(grado) = input.grado {
            record.grado = canonical(GRADOS, &grado);
        }
        if let Some(situacion) = input.situacion_militar {
            record.situacion_militar = canonical(SITUACIONES_MILITARES, &situacion);
        }
        if let Some(nombre) = input.apellidos_nombres {
            record.apellidos_nombres = nombre.trim().to_string();
        }
        if let Some(ubicacion) = input.ubicacion {
            record.ubicacion = ubicacion.trim().to_string();
        }
        if let Some(n) = input.numero_paginas {
            record.numero_paginas = n;
        }
        if let Some(n) = input.orden {
            record.orden = n;
        }
        if let Some(estado) = input.estado {
            record.estado = estado.as_str().to_string();
        }

        // Derived columns follow their sources unless the caller set them too.
        if rename {
            record.ubicacion = derive_ubicacion(&record.apellidos_nombres);
        }
        if rerank {
            record.orden = derive_orden(&record.grado, &record.situacion_militar);
        }

        self.save(record, actor).await
    }

    pub async fn update_estado(&self, id: Uuid, estado: Estado, actor: Uuid) -> Result<Expediente, ServiceError> {
        let mut record = self.get(id).await?;
        record.estado = estado.as_str().to_string();
        let record = self.save(record, actor).await?;
        info!(id = %id, estado = estado.as_str(), "expediente estado changed");
        Ok(record)
    }

    /// Soft delete. Deleting twice reports not found.
    pub async fn delete(&self, id: Uuid, actor: Uuid) -> Result<(), ServiceError> {
        let not_found = || ServiceError::NotFound("Expediente not found or already deleted".to_string());
        let mut record = self.store.get(id).await?.ok_or_else(not_found)?;

        let now = Utc::now();
        record.deleted_at = Some(now);
        record.deleted_by = Some(actor);
        record.updated_at = now;
        record.updated_by = actor;

        match self.store.update(record).await {
            Ok(_) => {
                info!(id = %id, "expediente deleted");
                Ok(())
            }
            Err(crate::database::StoreError::NotFound(_)) => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }

    /// Dashboard figures from one pass over the live records.
    pub async fn stats(&self) -> Result<ExpedienteStats, ServiceError> {
        self.stats_at(Utc::now()).await
    }

    async fn stats_at(&self, now: DateTime<Utc>) -> Result<ExpedienteStats, ServiceError> {
        let live = Predicate::live();
        let order = RecordOrder::new("id", SortDirection::Asc);
        let mut tally = Tally::new(now);
        let mut skip = 0;
        loop {
            let batch = self.store.find(&live, &order, skip, STATS_BATCH).await?;
            let fetched = batch.len() as u64;
            for record in &batch {
                tally.add(record);
            }
            if fetched < STATS_BATCH {
                break;
            }
            skip += fetched;
        }
        debug!(scanned = tally.total, "expediente stats computed");
        Ok(tally.finish())
    }

    async fn save(&self, mut record: Expediente, actor: Uuid) -> Result<Expediente, ServiceError> {
        let now = Utc::now();
        record.updated_at = now;
        record.fecha_actualizacion = now;
        record.updated_by = actor;
        Ok(self.store.update(record).await?)
    }

    async fn ensure_cip_available(&self, cip: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        let mut predicate = Predicate::live().equals("cip", FieldValue::Text(cip.to_string()));
        if let Some(id) = except {
            predicate = predicate.not_equals("id", FieldValue::Uuid(id));
        }
        if self.store.count(&predicate).await? > 0 {
            return Err(ServiceError::Conflict(format!("An expediente with CIP {} already exists", cip)));
        }
        Ok(())
    }
}

/// Running counters for `stats`.
struct Tally {
    since: DateTime<Utc>,
    total: u64,
    dentro: u64,
    fuera: u64,
    actividad: u64,
    retiro: u64,
    paginas: u64,
    por_grado: BTreeMap<String, u64>,
    por_ubicacion: HashMap<String, (u64, u64)>,
    por_mes: BTreeMap<(i32, u32), u64>,
    por_ano: BTreeMap<i32, u64>,
    recientes: u64,
}

impl Tally {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            since: now - Duration::days(30),
            total: 0,
            dentro: 0,
            fuera: 0,
            actividad: 0,
            retiro: 0,
            paginas: 0,
            por_grado: BTreeMap::new(),
            por_ubicacion: HashMap::new(),
            por_mes: BTreeMap::new(),
            por_ano: BTreeMap::new(),
            recientes: 0,
        }
    }

    fn add(&mut self, record: &Expediente) {
        let paginas = u64::try_from(record.numero_paginas).unwrap_or(0);
        self.total += 1;
        self.paginas += paginas;

        if record.estado == ESTADOS[0] {
            self.dentro += 1;
        } else if record.estado == ESTADOS[1] {
            self.fuera += 1;
        }
        if record.situacion_militar == SITUACIONES_MILITARES[0] {
            self.actividad += 1;
        } else if record.situacion_militar == SITUACIONES_MILITARES[1] {
            self.retiro += 1;
        }
        *self.por_grado.entry(record.grado.clone()).or_default() += 1;

        let shelf = self.por_ubicacion.entry(record.ubicacion.clone()).or_default();
        shelf.0 += 1;
        shelf.1 += paginas;

        let fecha = record.fecha_registro;
        *self.por_mes.entry((fecha.year(), fecha.month())).or_default() += 1;
        *self.por_ano.entry(fecha.year()).or_default() += 1;
        if fecha >= self.since {
            self.recientes += 1;
        }
    }

    fn finish(self) -> ExpedienteStats {
        let total = self.total;

        let mut por_ubicacion: Vec<UbicacionStats> = self
            .por_ubicacion
            .into_iter()
            .map(|(ubicacion, (n, paginas))| UbicacionStats {
                ubicacion,
                total: n,
                porcentaje: percentage(n, total),
                total_paginas: paginas,
            })
            .collect();
        por_ubicacion.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.ubicacion.cmp(&b.ubicacion)));
        por_ubicacion.truncate(TOP_UBICACIONES);

        let meses: Vec<((i32, u32), u64)> = self.por_mes.into_iter().rev().take(MONTHS_SHOWN).collect();
        let total_meses: u64 = meses.iter().map(|(_, n)| n).sum();
        let por_mes: Vec<MonthlyCount> = meses
            .into_iter()
            .map(|((ano, mes), n)| MonthlyCount {
                ano,
                mes,
                mes_nombre: MESES[(mes as usize).saturating_sub(1) % 12],
                total: n,
                porcentaje: percentage(n, total_meses),
            })
            .collect();

        let tendencia = match por_mes.as_slice() {
            [latest, previous, ..] if latest.total > previous.total => Trend::Creciente,
            [latest, previous, ..] if latest.total < previous.total => Trend::Decreciente,
            _ => Trend::Estable,
        };

        let por_ano = self
            .por_ano
            .into_iter()
            .rev()
            .map(|(ano, n)| YearlyCount { ano, total: n, porcentaje: percentage(n, total) })
            .collect();

        ExpedienteStats {
            total_expedientes: total,
            expedientes_dentro: self.dentro,
            expedientes_fuera: self.fuera,
            personal_actividad: self.actividad,
            personal_retiro: self.retiro,
            porcentaje_dentro: percentage(self.dentro, total),
            porcentaje_fuera: percentage(self.fuera, total),
            por_grado: self.por_grado,
            total_paginas: self.paginas,
            por_ubicacion,
            temporal: TemporalStats {
                ultimos_30_dias: self.recientes,
                por_mes,
                por_ano,
                tendencia,
            },
        }
    }
}

fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

/// Canonical spelling of a domain value, matched case-insensitively.
fn canonical(allowed: &[&str], value: &str) -> String {
    let value = value.trim();
    allowed
        .iter()
        .find(|a| a.eq_ignore_ascii_case(value))
        .map(|a| a.to_string())
        .unwrap_or_else(|| value.to_string())
}

fn check_grado(grado: &str, errors: &mut HashMap<String, String>) {
    if !GRADOS.iter().any(|g| g.eq_ignore_ascii_case(grado.trim())) {
        errors.insert("grado".into(), format!("must be one of {}", GRADOS.join(", ")));
    }
}

fn check_situacion(situacion: &str, errors: &mut HashMap<String, String>) {
    if !SITUACIONES_MILITARES.iter().any(|s| s.eq_ignore_ascii_case(situacion.trim())) {
        errors.insert(
            "situacion_militar".into(),
            format!("must be one of {}", SITUACIONES_MILITARES.join(", ")),
        );
    }
}

fn check_required(field: &str, value: &str, errors: &mut HashMap<String, String>) {
    if value.trim().is_empty() {
        errors.insert(field.into(), "This field is required".into());
    }
}

fn check_min_one(field: &str, value: i32, errors: &mut HashMap<String, String>) {
    if value < 1 {
        errors.insert(field.into(), "must be at least 1".into());
    }
}
