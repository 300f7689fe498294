pub mod password;
pub mod registration;
pub mod session;
pub mod social;

pub use password::{confirm_password_reset, request_password_reset};
pub use registration::register;
pub use session::{login, logout};
pub use social::{google_callback, google_login};
