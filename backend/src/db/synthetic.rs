//! Demo data generator.
//!
//! Produces plausible ERP rows for every department so the dashboard and the
//! report pipeline can run without a database. With a fixed seed the
//! generated values are reproducible; dates are always relative to "now".

use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDateTime, SubsecRound};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::SourceResult;
use super::source::DataSource;
use crate::models::{Department, Record};

/// Number of rows generated per department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCounts {
    #[serde(default = "default_purchase")]
    pub purchase: usize,
    #[serde(default = "default_production")]
    pub production: usize,
    #[serde(default = "default_packing")]
    pub packing: usize,
    #[serde(default = "default_shipment")]
    pub shipment: usize,
}

fn default_purchase() -> usize {
    50
}

fn default_production() -> usize {
    60
}

fn default_packing() -> usize {
    45
}

fn default_shipment() -> usize {
    40
}

impl Default for RecordCounts {
    fn default() -> Self {
        Self {
            purchase: default_purchase(),
            production: default_production(),
            packing: default_packing(),
            shipment: default_shipment(),
        }
    }
}

impl RecordCounts {
    pub fn for_department(&self, department: Department) -> usize {
        match department {
            Department::Purchase => self.purchase,
            Department::Production => self.production,
            Department::Packing => self.packing,
            Department::Shipment => self.shipment,
        }
    }
}

/// [`DataSource`] backed by a seeded random generator.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    seed: Option<u64>,
    counts: RecordCounts,
}

impl SyntheticSource {
    pub fn new(seed: Option<u64>, counts: RecordCounts) -> Self {
        Self { seed, counts }
    }

    fn rng_for(&self, department: Department) -> StdRng {
        match self.seed {
            Some(seed) => {
                let offset = Department::ALL
                    .iter()
                    .position(|d| *d == department)
                    .unwrap_or(0) as u64;
                StdRng::seed_from_u64(seed.wrapping_add(offset))
            }
            None => StdRng::from_entropy(),
        }
    }

    /// Generate the rows of one department without going through the trait.
    pub fn generate(&self, department: Department) -> Vec<Record> {
        let mut rng = self.rng_for(department);
        let now = Local::now().naive_local().trunc_subsecs(0);
        let n = self.counts.for_department(department);
        (1..=n)
            .map(|i| match department {
                Department::Purchase => purchase_row(&mut rng, i, now),
                Department::Production => production_row(&mut rng, i, now),
                Department::Packing => packing_row(&mut rng, i, now),
                Department::Shipment => shipment_row(&mut rng, i, now),
            })
            .collect()
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new(None, RecordCounts::default())
    }
}

#[async_trait]
impl DataSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn fetch(&self, department: Department) -> SourceResult<Vec<Record>> {
        let records = self.generate(department);
        info!(department = %department, records = records.len(), "Generated synthetic records");
        Ok(records)
    }
}

fn pick<R: Rng>(rng: &mut R, options: &[&str]) -> String {
    options.choose(rng).copied().unwrap_or_default().to_string()
}

/// Pick a status with the given relative weights.
fn pick_weighted<R: Rng>(rng: &mut R, options: &[(&str, u32)]) -> String {
    let total: u32 = options.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen_range(0..total.max(1));
    for (value, weight) in options {
        if roll < *weight {
            return value.to_string();
        }
        roll -= weight;
    }
    options.last().map(|(v, _)| v.to_string()).unwrap_or_default()
}

fn days_ago<R: Rng>(rng: &mut R, now: NaiveDateTime, max_days: i64) -> NaiveDateTime {
    now - Duration::days(rng.gen_range(0..max_days))
}

fn days_ahead<R: Rng>(rng: &mut R, now: NaiveDateTime, max_days: i64) -> NaiveDateTime {
    now + Duration::days(rng.gen_range(1..max_days))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn purchase_row<R: Rng>(rng: &mut R, i: usize, now: NaiveDateTime) -> Record {
    let quantity: i64 = rng.gen_range(100..1000);
    let unit_price = round2(rng.gen_range(10.0..100.0));
    Record::new()
        .with("po_id", format!("PO{:04}", i))
        .with("vendor_name", pick(rng, &["Vendor A", "Vendor B", "Vendor C", "Vendor D"]))
        .with(
            "item_name",
            pick(rng, &["Raw Material A", "Raw Material B", "Component X", "Component Y"]),
        )
        .with("quantity", quantity)
        .with("unit_price", unit_price)
        .with("amount", round2(quantity as f64 * unit_price))
        .with("order_date", days_ago(rng, now, 30))
        .with("delivery_date", days_ahead(rng, now, 15))
        .with(
            "status",
            pick_weighted(rng, &[("Pending", 3), ("Approved", 4), ("Delivered", 3)]),
        )
}

fn production_row<R: Rng>(rng: &mut R, i: usize, now: NaiveDateTime) -> Record {
    Record::new()
        .with("production_id", format!("PROD{:04}", i))
        .with("product_name", pick(rng, &["Product A", "Product B", "Product C", "Product D"]))
        .with("batch_no", format!("B{:03}", i))
        .with("quantity", rng.gen_range(500i64..5000))
        .with("unit", pick(rng, &["KG", "PCS", "LTR"]))
        .with("start_date", days_ago(rng, now, 20))
        .with("end_date", days_ahead(rng, now, 10))
        .with(
            "status",
            pick_weighted(rng, &[("Completed", 5), ("In Progress", 3), ("Pending", 2)]),
        )
        .with("department", pick(rng, &["Dept A", "Dept B", "Dept C"]))
}

fn packing_row<R: Rng>(rng: &mut R, i: usize, now: NaiveDateTime) -> Record {
    Record::new()
        .with("packing_id", format!("PACK{:04}", i))
        .with("product_name", pick(rng, &["Product A", "Product B", "Product C"]))
        .with("quantity", rng.gen_range(100i64..1000))
        .with("package_type", pick(rng, &["Box", "Carton", "Pallet"]))
        .with("packing_date", days_ago(rng, now, 15))
        .with(
            "status",
            pick_weighted(rng, &[("Completed", 12), ("In Progress", 5), ("Pending", 3)]),
        )
        .with("operator", pick(rng, &["Operator 1", "Operator 2", "Operator 3"]))
}

fn shipment_row<R: Rng>(rng: &mut R, i: usize, now: NaiveDateTime) -> Record {
    Record::new()
        .with("shipment_id", format!("SHIP{:04}", i))
        .with(
            "customer_name",
            pick(rng, &["Customer A", "Customer B", "Customer C", "Customer D"]),
        )
        .with(
            "destination",
            pick(rng, &["Mumbai", "Delhi", "Bangalore", "Chennai", "Kolkata"]),
        )
        .with("quantity", rng.gen_range(50i64..500))
        .with("shipment_date", days_ago(rng, now, 10))
        .with("expected_delivery", days_ahead(rng, now, 7))
        .with(
            "status",
            pick_weighted(
                rng,
                &[("Dispatched", 3), ("In Transit", 3), ("Pending", 2), ("Delivered", 2)],
            ),
        )
        .with("transporter", pick(rng, &["Transport A", "Transport B", "Transport C"]))
}
