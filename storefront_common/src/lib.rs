mod basis_points;
mod naira;

pub mod helpers;
pub mod op;
mod secret;

pub use basis_points::{BasisPoints, RateParseError};
pub use naira::{Naira, NairaConversionError, NAIRA_CURRENCY_CODE};
pub use secret::Secret;
