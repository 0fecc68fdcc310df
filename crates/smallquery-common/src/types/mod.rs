//! Wire types shared by the client and the remote execution unit.
//!
//! Every type here has a canonical JSON form; see each type for its layout.

mod envelope;
mod mapping;
mod request;
mod value;

pub use envelope::{FunctionError, QueryResponse};
pub use mapping::TableMapping;
pub use request::{QueryRequest, Upload};
pub use value::Value;
