use super::{AppointmentCounts, ClinicStats, DbPool, InvoiceTotals};
use anyhow::Result;
use tracing::debug;

use crate::services::assistant::ClinicDataProvider;

/// Read-only queries against the clinic tables (see `sql/clinic_schema.sql`)
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn appointment_counts(&self, clinic_id: &str) -> Result<AppointmentCounts> {
        let counts = sqlx::query_as::<_, AppointmentCounts>(
            r#"SELECT
                COUNT(*) AS total_appointments,
                COUNT(*) FILTER (WHERE appointment_date = CURRENT_DATE) AS todays_appointments,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending_appointments,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed_appointments,
                COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled_appointments,
                COUNT(DISTINCT patient_id) AS total_patients
               FROM appointments
               WHERE clinic_id = $1"#,
        )
        .bind(clinic_id)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(counts)
    }

    pub async fn invoice_totals(&self, clinic_id: &str) -> Result<InvoiceTotals> {
        let totals = sqlx::query_as::<_, InvoiceTotals>(
            r#"SELECT
                COALESCE(SUM(amount) FILTER (WHERE status = 'paid'), 0)::float8 AS total_revenue,
                COUNT(*) FILTER (WHERE status <> 'paid') AS unpaid_invoices
               FROM invoices
               WHERE clinic_id = $1"#,
        )
        .bind(clinic_id)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(totals)
    }
}

#[async_trait::async_trait]
impl ClinicDataProvider for Repository {
    async fn clinic_stats(&self, clinic_id: &str) -> Result<ClinicStats> {
        let (appointments, invoices) = tokio::try_join!(
            self.appointment_counts(clinic_id),
            self.invoice_totals(clinic_id),
        )?;

        debug!(
            "Clinic {} stats: {} appointments, {} unpaid invoices",
            clinic_id, appointments.total_appointments, invoices.unpaid_invoices
        );

        Ok(ClinicStats::from_parts(appointments, invoices))
    }
}
