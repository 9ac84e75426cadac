pub mod booking;
pub mod lifecycle;
pub mod memory;
pub mod store;
pub mod validator;

pub use booking::AppointmentBookingService;
pub use lifecycle::AppointmentLifecycleService;
pub use memory::InMemoryAppointmentStore;
pub use store::{AppointmentStore, SupabaseAppointmentStore};
pub use validator::BookingValidator;
