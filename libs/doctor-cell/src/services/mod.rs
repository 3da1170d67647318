pub mod calendar;
pub mod memory;
pub mod store;
pub mod supabase;

pub use calendar::{available_slots, clinic_local_time, compute_available_slots, SlotCalendar};
pub use memory::InMemoryDoctorStore;
pub use store::{DoctorDirectory, ReservationStore};
pub use supabase::SupabaseDoctorStore;
