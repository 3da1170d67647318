pub mod dashboard;
pub mod ledger;
pub mod lifecycle;
pub mod memory;
pub mod repair;
pub mod supabase;

pub use ledger::AppointmentLedger;
pub use lifecycle::AppointmentLifecycleService;
pub use memory::InMemoryAppointmentLedger;
pub use supabase::SupabaseAppointmentLedger;
