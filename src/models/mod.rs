pub mod catalog;
pub mod classification;
pub mod document;
pub mod enums;
pub mod field;
pub mod result;

pub use classification::*;
pub use document::*;
pub use enums::*;
pub use field::*;
pub use result::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid value '{value}' for {field}")]
    InvalidEnum { field: String, value: String },
}
