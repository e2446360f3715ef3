pub mod registration;

pub use registration::{RegistrationError, RegistrationService};
