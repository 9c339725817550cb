pub mod forecast;
pub mod record;

pub use forecast::*;
pub use record::*;
