use serde::Serialize;
use sqlx::FromRow;

/// Appointment counters for one clinic
#[derive(Debug, Clone, Default, FromRow)]
pub struct AppointmentCounts {
    pub total_appointments: i64,
    pub todays_appointments: i64,
    pub pending_appointments: i64,
    pub completed_appointments: i64,
    pub cancelled_appointments: i64,
    pub total_patients: i64,
}

/// Invoice totals for one clinic
#[derive(Debug, Clone, Default, FromRow)]
pub struct InvoiceTotals {
    pub total_revenue: f64,
    pub unpaid_invoices: i64,
}

/// Live operational snapshot handed to the clinic assistant
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClinicStats {
    pub total_appointments: i64,
    pub todays_appointments: i64,
    pub pending_appointments: i64,
    pub completed_appointments: i64,
    pub cancelled_appointments: i64,
    pub total_patients: i64,
    pub total_revenue: f64,
    pub unpaid_invoices: i64,
}

impl ClinicStats {
    pub fn from_parts(appointments: AppointmentCounts, invoices: InvoiceTotals) -> Self {
        Self {
            total_appointments: appointments.total_appointments,
            todays_appointments: appointments.todays_appointments,
            pending_appointments: appointments.pending_appointments,
            completed_appointments: appointments.completed_appointments,
            cancelled_appointments: appointments.cancelled_appointments,
            total_patients: appointments.total_patients,
            total_revenue: invoices.total_revenue,
            unpaid_invoices: invoices.unpaid_invoices,
        }
    }

    /// Prompt-ready listing
    pub fn render(&self) -> String {
        format!(
            "Total appointments: {}\n\
             Appointments today: {}\n\
             Pending appointments: {}\n\
             Completed appointments: {}\n\
             Cancelled appointments: {}\n\
             Distinct patients: {}\n\
             Revenue from paid invoices: {:.2}\n\
             Unpaid invoices: {}",
            self.total_appointments,
            self.todays_appointments,
            self.pending_appointments,
            self.completed_appointments,
            self.cancelled_appointments,
            self.total_patients,
            self.total_revenue,
            self.unpaid_invoices,
        )
    }
}
