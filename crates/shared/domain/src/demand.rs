//! Unmet medication demand records and their aggregations.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::constants::{
    FULL_COVERAGE, MIN_PRODUCT_LENGTH, MIN_SERVICE_TYPE_LENGTH, TOP_CRITICAL_PRODUCTS,
    UNSPECIFIED_FACILITY,
};
use crate::error::{DomainError, DomainResult};

/// One requested-vs-available observation for a product at a facility.
///
/// Collections written by the browser application use Spanish field names
/// and numeric ids; both are accepted on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandRecord {
    #[serde(deserialize_with = "deserialize_record_id")]
    pub id: Uuid,
    #[serde(alias = "usuario_registra")]
    pub recorded_by: String,
    #[serde(alias = "establecimiento")]
    pub facility: String,
    #[serde(alias = "producto")]
    pub product: String,
    #[serde(alias = "tipo_servicio", default)]
    pub service_type: String,
    #[serde(alias = "cantidad_requerida")]
    pub requested: f64,
    #[serde(alias = "cantidad_disponible")]
    pub available: f64,
    #[serde(alias = "demanda_no_satisfecha")]
    pub unmet: f64,
    #[serde(alias = "cobertura")]
    pub coverage: f64,
    #[serde(alias = "fecha")]
    pub date: NaiveDate,
    #[serde(alias = "fecha_registro_sistema")]
    pub recorded_at: DateTime<Utc>,
    #[serde(alias = "observaciones", default)]
    pub notes: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordId {
    Uuid(Uuid),
    Legacy(f64),
}

/// Numeric ids map to a fixed UUID built from their bit pattern, so the
/// same legacy record gets the same id on every read.
fn deserialize_record_id<'de, D>(deserializer: D) -> Result<Uuid, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RecordId::deserialize(deserializer)? {
        RecordId::Uuid(id) => id,
        RecordId::Legacy(number) => Uuid::from_u64_pair(0, number.to_bits()),
    })
}

impl DemandRecord {
    /// Build a record from validated input, computing the derived quantities.
    pub fn new(input: NewDemand, recorded_by: impl Into<String>) -> DomainResult<Self> {
        input.validate()?;

        Ok(Self {
            id: Uuid::new_v4(),
            recorded_by: recorded_by.into(),
            facility: input.facility.trim().to_string(),
            product: input.product.trim().to_string(),
            service_type: input.service_type.trim().to_string(),
            requested: input.requested,
            available: input.available,
            unmet: unmet(input.requested, input.available),
            coverage: coverage(input.requested, input.available),
            date: input.date,
            recorded_at: Utc::now(),
            notes: input.notes.trim().to_string(),
        })
    }
}

/// Demand record input
#[derive(Debug, Clone, Deserialize)]
pub struct NewDemand {
    pub facility: String,
    pub product: String,
    pub service_type: String,
    pub requested: f64,
    pub available: f64,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: String,
}

impl NewDemand {
    /// Collect every problem with the input into a single validation error.
    pub fn validate(&self) -> DomainResult<()> {
        let mut errors = Vec::new();

        if self.facility.trim().is_empty() {
            errors.push("a facility is required".to_string());
        }
        if self.product.trim().chars().count() < MIN_PRODUCT_LENGTH {
            errors.push("a valid product is required".to_string());
        }
        if self.service_type.trim().chars().count() < MIN_SERVICE_TYPE_LENGTH {
            errors.push("a service type is required".to_string());
        }
        let requested_ok = self.requested.is_finite() && self.requested >= 0.0;
        let available_ok = self.available.is_finite() && self.available >= 0.0;
        if !requested_ok {
            errors.push("requested quantity must be a number greater than or equal to 0".to_string());
        }
        if !available_ok {
            errors.push("available quantity must be a number greater than or equal to 0".to_string());
        }
        if requested_ok && available_ok && self.available > self.requested {
            errors.push("available quantity cannot exceed the requested quantity".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::validation(errors.join(". ")))
        }
    }
}

/// Requested quantity not covered by stock.
pub fn unmet(requested: f64, available: f64) -> f64 {
    (requested - available).max(0.0)
}

/// Percentage of the request covered, rounded to 2 decimals.
pub fn coverage(requested: f64, available: f64) -> f64 {
    if requested > 0.0 {
        round2(available / requested * 100.0)
    } else {
        FULL_COVERAGE
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Product with unmet demand, summed over records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalProduct {
    pub product: String,
    pub total_unmet: f64,
    pub records: usize,
}

/// Products with unmet demand, largest shortfall first.
pub fn critical_products(records: &[DemandRecord]) -> Vec<CriticalProduct> {
    rank_critical(records)
}

fn rank_critical<'a>(records: impl IntoIterator<Item = &'a DemandRecord>) -> Vec<CriticalProduct> {
    let mut by_product: HashMap<&str, CriticalProduct> = HashMap::new();

    for record in records.into_iter().filter(|r| r.unmet > 0.0) {
        let entry = by_product
            .entry(record.product.as_str())
            .or_insert_with(|| CriticalProduct {
                product: record.product.clone(),
                total_unmet: 0.0,
                records: 0,
            });
        entry.total_unmet += record.unmet;
        entry.records += 1;
    }

    let mut products: Vec<_> = by_product.into_values().collect();
    products.sort_by(|a, b| {
        b.total_unmet
            .total_cmp(&a.total_unmet)
            .then_with(|| a.product.cmp(&b.product))
    });
    products
}

/// Per-facility aggregation used by reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilitySummary {
    pub facility: String,
    pub records: usize,
    pub distinct_products: usize,
    pub total_requested: f64,
    pub total_available: f64,
    pub total_unmet: f64,
    pub average_coverage: f64,
    pub service_types: usize,
    pub top_critical: Vec<CriticalProduct>,
}

/// Group `records` by facility, sorted by facility name.
pub fn summarize_by_facility(records: &[DemandRecord]) -> Vec<FacilitySummary> {
    let mut groups: BTreeMap<&str, Vec<&DemandRecord>> = BTreeMap::new();
    for record in records {
        let facility = if record.facility.is_empty() {
            UNSPECIFIED_FACILITY
        } else {
            record.facility.as_str()
        };
        groups.entry(facility).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|(facility, group)| {
            let products: BTreeSet<&str> = group.iter().map(|r| r.product.as_str()).collect();
            let service_types: BTreeSet<&str> = group
                .iter()
                .map(|r| r.service_type.as_str())
                .filter(|s| !s.is_empty())
                .collect();
            let total_requested: f64 = group.iter().map(|r| r.requested).sum();
            let total_available: f64 = group.iter().map(|r| r.available).sum();
            let total_unmet: f64 = group.iter().map(|r| r.unmet).sum();

            let mut top_critical = rank_critical(group.iter().copied());
            top_critical.truncate(TOP_CRITICAL_PRODUCTS);

            FacilitySummary {
                facility: facility.to_string(),
                records: group.len(),
                distinct_products: products.len(),
                total_requested,
                total_available,
                total_unmet,
                average_coverage: coverage(total_requested, total_available),
                service_types: service_types.len(),
                top_critical,
            }
        })
        .collect()
}
