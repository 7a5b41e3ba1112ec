//! Domain records stored through `EntityStore`

pub mod account;
pub mod macros;
pub mod villa;
pub mod villa_number;

pub use account::Account;
pub use villa::{Villa, seed_villas};
pub use villa_number::VillaNumber;
