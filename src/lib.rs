pub mod bits;
pub mod boxes;
pub mod error;
pub mod field;
pub mod instance;
pub mod json_api;
pub mod known_layouts;
pub mod layout;
pub mod registry;

pub use boxes::FourCC;
pub use error::{BitError, FieldError, LayoutError};
pub use field::{FieldKind, FieldSpec, FieldValue, LengthMode};
pub use instance::BoxInstance;
pub use json_api::{JsonBox, decode_to_json};
pub use known_layouts::KnownLayout;
pub use layout::{LayoutBuilder, LayoutDescriptor};
pub use registry::{Registry, default_registry};
