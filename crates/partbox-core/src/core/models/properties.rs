use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Default tolerance used when comparing property sets.
pub const PROPERTY_TOLERANCE: f64 = 1e-15;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PropertyError {
    #[error("Property '{name}' not found")]
    NotFound { name: String },
    #[error("Property '{name}' already exists")]
    AlreadyExists { name: String },
}

/// An ordered, open-ended set of named scalar properties.
///
/// Used both for physical parameters declared in particle templates
/// (`epsilon`, `sigma`, `cutoff`, `charge`, bond `length`, ...) and for
/// transient annotations such as cell-list caches. Insertion order is kept
/// so that property tables read back in the order they were declared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct Properties {
    entries: Vec<(String, f64)>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new property, failing if the name is already present.
    pub fn add(&mut self, name: &str, value: f64) -> Result<(), PropertyError> {
        if self.contains(name) {
            return Err(PropertyError::AlreadyExists {
                name: name.to_string(),
            });
        }
        self.entries.push((name.to_string(), value));
        Ok(())
    }

    /// Adds a property, or overwrites its value if the name already exists.
    pub fn add_or_set(&mut self, name: &str, value: f64) {
        match self.position(name) {
            Some(index) => self.entries[index].1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Sets the value of an existing property.
    pub fn set(&mut self, name: &str, value: f64) -> Result<(), PropertyError> {
        let index = self.position(name).ok_or_else(|| PropertyError::NotFound {
            name: name.to_string(),
        })?;
        self.entries[index].1 = value;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.position(name).map(|index| self.entries[index].1)
    }

    /// Returns the value of a property, or a descriptive error if absent.
    pub fn value(&self, name: &str) -> Result<f64, PropertyError> {
        self.get(name).ok_or_else(|| PropertyError::NotFound {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<f64> {
        self.position(name).map(|index| self.entries.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Returns true if both sets hold the same names with values equal within `tolerance`.
    ///
    /// Order of declaration is ignored.
    pub fn is_equal(&self, other: &Properties, tolerance: f64) -> bool {
        self.len() == other.len()
            && self.iter().all(|(name, value)| {
                other
                    .get(name)
                    .is_some_and(|other_value| (value - other_value).abs() <= tolerance)
            })
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }
}

impl From<BTreeMap<String, f64>> for Properties {
    fn from(map: BTreeMap<String, f64>) -> Self {
        Self {
            entries: map.into_iter().collect(),
        }
    }
}

impl From<Properties> for BTreeMap<String, f64> {
    fn from(properties: Properties) -> Self {
        properties.entries.into_iter().collect()
    }
}

impl<'a> FromIterator<(&'a str, f64)> for Properties {
    fn from_iter<I: IntoIterator<Item = (&'a str, f64)>>(iter: I) -> Self {
        let mut properties = Properties::new();
        for (name, value) in iter {
            properties.add_or_set(name, value);
        }
        properties
    }
}

impl fmt::Display for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        write!(f, "{{{}}}", rendered.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_rejects_duplicate_names() {
        let mut props = Properties::new();
        props.add("epsilon", 1.0).unwrap();
        assert_eq!(
            props.add("epsilon", 2.0),
            Err(PropertyError::AlreadyExists {
                name: "epsilon".to_string()
            })
        );
        assert_eq!(props.get("epsilon"), Some(1.0));
    }

    #[test]
    fn add_or_set_overwrites_existing_value() {
        let mut props = Properties::new();
        props.add_or_set("cell0", 4.0);
        props.add_or_set("cell0", 7.0);
        assert_eq!(props.len(), 1);
        assert_eq!(props.get("cell0"), Some(7.0));
    }

    #[test]
    fn set_fails_for_missing_property() {
        let mut props = Properties::new();
        let err = props.set("sigma", 1.0).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn value_reports_missing_property_by_name() {
        let props: Properties = [("sigma", 3.0)].into_iter().collect();
        assert_eq!(props.value("sigma").unwrap(), 3.0);
        assert_eq!(
            props.value("charge"),
            Err(PropertyError::NotFound {
                name: "charge".to_string()
            })
        );
    }

    #[test]
    fn remove_returns_value_and_drops_entry() {
        let mut props: Properties = [("cell0", 3.0), ("cell1", 1.0)].into_iter().collect();
        assert_eq!(props.remove("cell0"), Some(3.0));
        assert!(!props.contains("cell0"));
        assert_eq!(props.remove("cell0"), None);
        assert_eq!(props.names().collect::<Vec<_>>(), vec!["cell1"]);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let props: Properties = [("sigma", 1.0), ("epsilon", 2.0), ("cutoff", 3.0)]
            .into_iter()
            .collect();
        assert_eq!(
            props.names().collect::<Vec<_>>(),
            vec!["sigma", "epsilon", "cutoff"]
        );
    }

    #[test]
    fn is_equal_ignores_order_and_respects_tolerance() {
        let a: Properties = [("sigma", 1.0), ("epsilon", 2.0)].into_iter().collect();
        let b: Properties = [("epsilon", 2.0 + 1e-12), ("sigma", 1.0)]
            .into_iter()
            .collect();
        assert!(a.is_equal(&b, 1e-10));
        assert!(!a.is_equal(&b, PROPERTY_TOLERANCE));

        let c: Properties = [("sigma", 1.0)].into_iter().collect();
        assert!(!a.is_equal(&c, 1.0));
    }

    #[test]
    fn display_lists_name_value_pairs() {
        let props: Properties = [("sigma", 1.5), ("charge", -0.5)].into_iter().collect();
        assert_eq!(props.to_string(), "{sigma=1.5, charge=-0.5}");
    }
}
