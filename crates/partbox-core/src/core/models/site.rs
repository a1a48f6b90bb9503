use super::properties::Properties;
use nalgebra::Point3;

/// A site of a particle template.
///
/// Template sites carry the global site type, the template layout position
/// (the initial position of every instance) and the properties declared for
/// the site type.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub site_type: usize,        // Global site type
    pub position: Point3<f64>,   // Template-relative layout position
    pub properties: Properties,  // Properties of the site type
}

impl Site {
    pub fn new(site_type: usize, position: Point3<f64>, properties: Properties) -> Self {
        Self {
            site_type,
            position,
            properties,
        }
    }

    pub fn property(&self, name: &str) -> Option<f64> {
        self.properties.get(name)
    }
}

/// A site of a live particle.
///
/// Only instance state is stored here: the (relabelable) site type, the
/// current position and dynamic properties such as cell-list caches.
/// Physical parameters are looked up through the site type.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleSite {
    pub(crate) site_type: usize,
    pub(crate) position: Point3<f64>,
    pub(crate) properties: Properties,
}

impl ParticleSite {
    pub(crate) fn new(site_type: usize, position: Point3<f64>) -> Self {
        Self {
            site_type,
            position,
            properties: Properties::new(),
        }
    }

    pub fn site_type(&self) -> usize {
        self.site_type
    }

    pub fn position(&self) -> &Point3<f64> {
        &self.position
    }

    /// Dynamic properties attached to this instance site.
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains(name)
    }

    pub fn property(&self, name: &str) -> Option<f64> {
        self.properties.get(name)
    }
}
