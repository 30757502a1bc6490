pub mod error;
pub mod types;
pub mod value;

pub use error::{MappingError, Result};
pub use types::{CollectionKind, TypeInformation};
pub use value::{Bean, TYPE_HINT_KEY, Value};
