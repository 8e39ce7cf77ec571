//! Core domain records
//!
//! Records are plain data plus validation. `Client` and `Admin` are composed
//! over a `User`; persistence goes through the `Persist` port.

mod admin;
mod client;
pub mod credentials;
pub mod result;
pub mod sanitize;
mod user;

pub use admin::{Admin, MIN_PASSWORD_LEN};
pub use client::{Client, MAX_BALANCE, MAX_PIN_LEN, MIN_PIN_LEN};
pub use user::{User, UserChanges};
