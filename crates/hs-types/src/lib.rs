pub mod errors;
pub mod trial;
pub mod value;

pub use errors::*;
pub use trial::*;
pub use value::*;
