//! Typed attributes
//!
//! Model run arguments are typed attributes. Each argument name must be
//! declared in an [`ArgumentDefinitions`] set that fixes its
//! [`AttributeType`] and optional default value.
//!
//! ```rust
//! use modelrun_db::attribute::{ArgumentDefinitions, Attribute};
//!
//! let definitions = ArgumentDefinitions::with_defaults();
//! let arguments = definitions
//!     .validate_arguments(&[Attribute::new("gabor_orientations", 10)])
//!     .unwrap();
//!
//! assert_eq!(arguments["gabor_orientations"].value, 10);
//! assert_eq!(arguments["max_eccentricity"].value, 12);
//! ```

mod definition;
mod types;

pub use definition::{ArgumentDefinitions, Attribute, AttributeDefinition};
pub use types::AttributeType;
