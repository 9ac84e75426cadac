pub mod calendar;
pub mod doctor;
pub mod profession;

pub use calendar::{build_calendar, CalendarBuilder};
pub use doctor::DoctorService;
pub use profession::ProfessionService;
