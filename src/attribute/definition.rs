//! Attribute definitions and the definition set used to type-check run arguments

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::AttributeType;
use crate::error::ValidationError;

/// A named, typed value (e.g. a model run argument).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name. Matches the identifier of its definition.
    pub name: String,
    /// Attribute value.
    pub value: Value,
}

impl Attribute {
    /// Create a new attribute.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Definition of a permitted attribute: its type and optional default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    #[serde(rename = "id")]
    identifier: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "type")]
    data_type: AttributeType,
    #[serde(rename = "default", default, skip_serializing_if = "Option::is_none")]
    default_value: Option<Value>,
}

impl AttributeDefinition {
    /// Create a definition without a default value.
    #[must_use]
    pub fn new(
        identifier: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        data_type: AttributeType,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            description: description.into(),
            data_type,
            default_value: None,
        }
    }

    /// Set the value used when a run does not supply this argument.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Get the identifier arguments refer to.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Get the human-readable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Get the declared type.
    #[must_use]
    pub const fn data_type(&self) -> &AttributeType {
        &self.data_type
    }

    /// Get the default value, if any.
    #[must_use]
    pub const fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }
}

/// The set of argument definitions that are valid for a model run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentDefinitions {
    definitions: BTreeMap<String, AttributeDefinition>,
}

impl ArgumentDefinitions {
    /// Create an empty definition set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Definition set containing the default arguments of the predictive
    /// model.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut set = Self::new();
        set.extend([
            AttributeDefinition::new(
                "gabor_orientations",
                "Gabor Orientations",
                "Number of Gabor filter orientations",
                AttributeType::Int,
            )
            .with_default(8),
            AttributeDefinition::new(
                "max_eccentricity",
                "Max. Eccentricity",
                "Maximum eccentricity (in degrees) of the visual field",
                AttributeType::Float,
            )
            .with_default(12),
            AttributeDefinition::new(
                "normalized_pixels_per_degree",
                "Normalized Pixels per Degree",
                "Pixels per degree after image normalization",
                AttributeType::Float,
            ),
            AttributeDefinition::new(
                "stimulus_edge_value",
                "Stimulus Edge Value",
                "Value used to fill the stimulus beyond the aperture",
                AttributeType::Float,
            )
            .with_default(0.5),
            AttributeDefinition::new(
                "aperture_edge_width",
                "Aperture Edge Width",
                "Width (in degrees) of the aperture's smoothed edge",
                AttributeType::Float,
            ),
            AttributeDefinition::new(
                "aperture_radius",
                "Aperture Radius",
                "Radius (in degrees) of the stimulus aperture",
                AttributeType::Float,
            ),
        ]);
        set
    }

    /// Add definitions, replacing existing ones with the same identifier.
    pub fn extend<I>(&mut self, definitions: I)
    where
        I: IntoIterator<Item = AttributeDefinition>,
    {
        for definition in definitions {
            self.definitions
                .insert(definition.identifier.clone(), definition);
        }
    }

    /// Get a definition by identifier.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeDefinition> {
        self.definitions.get(name)
    }

    /// Number of definitions in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Check if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Type-check a single value against its definition.
    ///
    /// # Errors
    ///
    /// `UnknownArgument` if the name is not defined, `InvalidValue` if the
    /// value does not match the declared type.
    pub fn validate(&self, name: &str, value: Value) -> Result<Attribute, ValidationError> {
        let definition = self
            .get(name)
            .ok_or_else(|| ValidationError::UnknownArgument(name.to_string()))?;
        definition
            .data_type
            .validate(&value)
            .map_err(|reason| ValidationError::invalid_value(name, reason))?;
        Ok(Attribute::new(name, value))
    }

    /// Parse a textual value against its definition.
    ///
    /// # Errors
    ///
    /// Same as [`ArgumentDefinitions::validate`].
    pub fn parse(&self, name: &str, text: &str) -> Result<Attribute, ValidationError> {
        let definition = self
            .get(name)
            .ok_or_else(|| ValidationError::UnknownArgument(name.to_string()))?;
        let value = definition
            .data_type
            .parse(text)
            .map_err(|reason| ValidationError::invalid_value(name, reason))?;
        Ok(Attribute::new(name, value))
    }

    /// Validate a run's argument list and fill in defaults for every defined
    /// argument that was not supplied.
    ///
    /// # Errors
    ///
    /// `DuplicateArgument` if a name appears twice, `UnknownArgument` for a
    /// name outside the set, `InvalidValue` on a type mismatch. Unknown names
    /// are never dropped silently.
    pub fn validate_arguments(
        &self,
        arguments: &[Attribute],
    ) -> Result<BTreeMap<String, Attribute>, ValidationError> {
        let mut seen = HashSet::with_capacity(arguments.len());
        for arg in arguments {
            if !seen.insert(arg.name.as_str()) {
                return Err(ValidationError::DuplicateArgument(arg.name.clone()));
            }
        }

        let mut validated = BTreeMap::new();
        for arg in arguments {
            let attribute = self.validate(&arg.name, arg.value.clone())?;
            validated.insert(attribute.name.clone(), attribute);
        }

        for (name, definition) in &self.definitions {
            if validated.contains_key(name) {
                continue;
            }
            if let Some(default) = &definition.default_value {
                validated.insert(name.clone(), Attribute::new(name.clone(), default.clone()));
            }
        }
        Ok(validated)
    }
}

impl FromIterator<AttributeDefinition> for ArgumentDefinitions {
    fn from_iter<I: IntoIterator<Item = AttributeDefinition>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}
