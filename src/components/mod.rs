pub mod assistant;
pub mod google_calendar;
pub mod intent;

pub use assistant::Assistant;
pub use google_calendar::GoogleCalendarHandle;
