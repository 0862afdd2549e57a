// Field-level parsers for the two noisy record fields: price and upload time.

pub mod price;
pub mod time;

pub use price::{PriceField, parse_price};
pub use time::parse_upload_time;
