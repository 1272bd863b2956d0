//! Row and cell models

mod row;
mod value;

pub use row::*;
pub use value::*;
