mod auth;
mod health_check;
mod user;

pub use auth::{change_password, login, refresh, register, RegistrationResponse};
pub use health_check::{health_check, not_found};
pub use user::{get_profile, update_info};
