mod error;
mod mapping;
mod shape;

pub use error::{functions::*, MarshalError, MarshalErrorKind};
pub use mapping::{Access, HostView, Map, MapMut};
pub use shape::Shape;
