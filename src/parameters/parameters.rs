//! Parameters collection implementation
//!
//! This module provides the Parameters struct, an insertion-ordered collection
//! of named Parameter objects. Models own one of these; the fit machinery
//! addresses entries either by name or by their stable position.

use crate::parameters::parameter::{Parameter, ParameterError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// A collection of parameters owned by a model
///
/// Iteration order is insertion order, and positions returned by
/// [`Parameters::index_of`] stay valid until a parameter is removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Parameters {
    /// Map of parameter names to Parameter objects
    params: IndexMap<String, Parameter>,
}

impl Parameters {
    /// Create a new empty parameters collection
    ///
    /// # Examples
    ///
    /// ```
    /// use minopt_rs::parameters::Parameters;
    ///
    /// let params = Parameters::new();
    /// assert_eq!(params.len(), 0);
    /// ```
    pub fn new() -> Self {
        Self {
            params: IndexMap::new(),
        }
    }

    /// Add a parameter to the collection
    ///
    /// # Returns
    ///
    /// `Ok(())` if the parameter was added, or an error if a parameter with
    /// the same name already exists
    ///
    /// # Examples
    ///
    /// ```
    /// use minopt_rs::parameters::{Parameter, Parameters};
    ///
    /// let mut params = Parameters::new();
    /// params.add(Parameter::new("mean", 0.0)).unwrap();
    /// assert!(params.add(Parameter::new("mean", 1.0)).is_err());
    /// ```
    pub fn add(&mut self, param: Parameter) -> Result<(), ParameterError> {
        if self.params.contains_key(param.name()) {
            return Err(ParameterError::DuplicateParameter {
                name: param.name().to_string(),
            });
        }

        self.params.insert(param.name().to_string(), param);
        Ok(())
    }

    /// Add a new floating parameter with the given name and value
    pub fn add_param(&mut self, name: &str, value: f64) -> Result<(), ParameterError> {
        self.add(Parameter::new(name, value))
    }

    /// Add a new floating parameter with the given name, value, and bounds
    pub fn add_param_with_bounds(
        &mut self,
        name: &str,
        value: f64,
        min: f64,
        max: f64,
    ) -> Result<(), ParameterError> {
        self.add(Parameter::with_bounds(name, value, min, max)?)
    }

    /// Get a parameter by name
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.get(name)
    }

    /// Get a mutable reference to a parameter by name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.params.get_mut(name)
    }

    /// Get a parameter by position
    pub fn get_index(&self, index: usize) -> Option<&Parameter> {
        self.params.get_index(index).map(|(_, p)| p)
    }

    /// Get a mutable reference to a parameter by position
    pub fn get_index_mut(&mut self, index: usize) -> Option<&mut Parameter> {
        self.params.get_index_mut(index).map(|(_, p)| p)
    }

    /// Position of a parameter in the collection
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.params.get_index_of(name)
    }

    /// Check whether a parameter with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// Remove a parameter, keeping the order of the remaining ones
    pub fn remove(&mut self, name: &str) -> Option<Parameter> {
        self.params.shift_remove(name)
    }

    /// Number of parameters in the collection
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Names of all parameters, in order
    pub fn names(&self) -> Vec<String> {
        self.params.keys().cloned().collect()
    }

    /// Iterate over the parameters, in order
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.values()
    }

    /// Iterate mutably over the parameters, in order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Parameter> {
        self.params.values_mut()
    }

    /// Values of all parameters, in order
    pub fn values(&self) -> Vec<f64> {
        self.params.values().map(|p| p.value()).collect()
    }

    /// Parameters that are not constant
    pub fn floating(&self) -> Vec<&Parameter> {
        self.params.values().filter(|p| !p.is_constant()).collect()
    }

    /// Parameters that are constant
    pub fn constants(&self) -> Vec<&Parameter> {
        self.params.values().filter(|p| p.is_constant()).collect()
    }

    /// Set the value of a named parameter
    ///
    /// # Returns
    ///
    /// The value actually stored (after clamping), or an error if the name is unknown
    pub fn set_value(&mut self, name: &str, value: f64) -> Result<f64, ParameterError> {
        let param = self
            .params
            .get_mut(name)
            .ok_or_else(|| ParameterError::ParameterNotFound {
                name: name.to_string(),
            })?;
        param.set_value(value);
        Ok(param.value())
    }

    /// Set the constant flag of a named parameter
    pub fn set_constant(&mut self, name: &str, constant: bool) -> Result<(), ParameterError> {
        let param = self
            .params
            .get_mut(name)
            .ok_or_else(|| ParameterError::ParameterNotFound {
                name: name.to_string(),
            })?;
        param.set_constant(constant);
        Ok(())
    }

    /// Reset all parameters to their initial values
    pub fn reset(&mut self) {
        for param in self.params.values_mut() {
            param.reset();
        }
    }
}

/// Errors that can occur when saving or loading parameters
#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl Parameters {
    /// Save parameters to a JSON file
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), SerializationError> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Save parameters to a JSON string
    pub fn to_json(&self) -> Result<String, SerializationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load parameters from a JSON file
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, SerializationError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load parameters from a JSON string
    ///
    /// # Examples
    ///
    /// ```
    /// use minopt_rs::parameters::Parameters;
    ///
    /// let json = r#"{
    ///   "params": {
    ///     "mean": {
    ///       "name": "mean",
    ///       "value": 1.5,
    ///       "init_value": 1.5,
    ///       "constant": false,
    ///       "bounds": { "min": 0.0, "max": null },
    ///       "stderr": null,
    ///       "asym_errors": null
    ///     }
    ///   }
    /// }"#;
    ///
    /// let params = Parameters::from_json(json).unwrap();
    /// assert_eq!(params.get("mean").unwrap().value(), 1.5);
    /// assert!(params.get("mean").unwrap().has_min());
    /// ```
    pub fn from_json(json: &str) -> Result<Self, SerializationError> {
        Ok(serde_json::from_str(json)?)
    }
}
