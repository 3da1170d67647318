pub mod memory;
pub mod store;
pub mod supabase;

pub use memory::InMemoryPatientStore;
pub use store::PatientDirectory;
pub use supabase::SupabasePatientStore;
