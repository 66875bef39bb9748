//! Vendor plan repository contracts and SQLite implementation.

use crate::model::vendor_plan::{PlanDuration, VendorPlan};
use crate::model::VendorPlanId;
use crate::repo::{get_json, get_uuid, invalid_value, to_json, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const PLAN_SELECT_SQL: &str = "SELECT
    id, name, price, duration, features, created_at, updated_at
FROM vendor_plans";

pub trait VendorPlanRepository {
    fn insert_plan(&self, plan: &VendorPlan) -> RepoResult<()>;
    fn update_plan(&self, plan: &VendorPlan) -> RepoResult<()>;
    fn get_plan(&self, id: VendorPlanId) -> RepoResult<Option<VendorPlan>>;
    /// Lists plans cheapest first.
    fn list_plans(&self) -> RepoResult<Vec<VendorPlan>>;
    fn delete_plan(&self, id: VendorPlanId) -> RepoResult<()>;
}

pub struct SqliteVendorPlanRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVendorPlanRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl VendorPlanRepository for SqliteVendorPlanRepository<'_> {
    fn insert_plan(&self, plan: &VendorPlan) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO vendor_plans (id, name, price, duration, features, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                plan.id.to_string(),
                plan.name.as_str(),
                plan.price,
                plan.duration.as_str(),
                to_json(&plan.features)?,
                plan.created_at,
                plan.updated_at,
            ],
        )?;
        Ok(())
    }

    fn update_plan(&self, plan: &VendorPlan) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE vendor_plans
             SET name = ?2, price = ?3, duration = ?4, features = ?5, updated_at = ?6
             WHERE id = ?1;",
            params![
                plan.id.to_string(),
                plan.name.as_str(),
                plan.price,
                plan.duration.as_str(),
                to_json(&plan.features)?,
                plan.updated_at,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("vendor plan", plan.id));
        }
        Ok(())
    }

    fn get_plan(&self, id: VendorPlanId) -> RepoResult<Option<VendorPlan>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PLAN_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_plan_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_plans(&self) -> RepoResult<Vec<VendorPlan>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PLAN_SELECT_SQL} ORDER BY price ASC, created_at ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut plans = Vec::new();
        while let Some(row) = rows.next()? {
            plans.push(parse_plan_row(row)?);
        }
        Ok(plans)
    }

    fn delete_plan(&self, id: VendorPlanId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM vendor_plans WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("vendor plan", id));
        }
        Ok(())
    }
}

fn parse_plan_row(row: &Row<'_>) -> RepoResult<VendorPlan> {
    let duration: String = row.get("duration")?;
    Ok(VendorPlan {
        id: get_uuid(row, "id")?,
        name: row.get("name")?,
        price: row.get("price")?,
        duration: PlanDuration::parse(&duration)
            .ok_or_else(|| invalid_value("vendor_plans.duration", &duration))?,
        features: get_json(row, "features")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
