use super::ParamsError;
use super::constants::PhysicalConstants;
use crate::core::models::catalog::UniqueTypes;

/// How the pair value of a model parameter is derived from two site values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixingRule {
    /// `sqrt(a * b)`
    GeometricMean,
    /// `(a + b) / 2`, or zero if either value is zero.
    Average,
    /// `a * b`
    Product,
}

impl MixingRule {
    pub fn mix(&self, a: f64, b: f64) -> f64 {
        match self {
            Self::GeometricMean => (a * b).sqrt(),
            Self::Average => {
                if a == 0.0 || b == 0.0 {
                    0.0
                } else {
                    0.5 * (a + b)
                }
            }
            Self::Product => a * b,
        }
    }

    fn for_name(name: &str) -> Self {
        match name {
            "epsilon" => Self::GeometricMean,
            "charge" => Self::Product,
            _ => Self::Average,
        }
    }
}

/// One named parameter tabulated per site type, with its mixed pair table.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParam {
    name: String,
    rule: MixingRule,
    values: Vec<f64>,
    mixed: Vec<Vec<f64>>,
    overridden: Vec<Vec<bool>>,
}

impl ModelParam {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rule: MixingRule::for_name(name),
            values: Vec::new(),
            mixed: Vec::new(),
            overridden: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rule(&self) -> MixingRule {
        self.rule
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn value(&self, site_type: usize) -> Option<f64> {
        self.values.get(site_type).copied()
    }

    pub fn mixed_value(&self, type1: usize, type2: usize) -> Option<f64> {
        self.mixed.get(type1)?.get(type2).copied()
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }

    pub fn mixed_max(&self) -> f64 {
        self.mixed.iter().flatten().copied().fold(0.0, f64::max)
    }

    /// Recomputes the pair table, keeping explicitly overridden entries.
    fn mix(&mut self) {
        let n = self.values.len();
        self.overridden.resize(n, Vec::new());
        self.mixed.resize(n, Vec::new());
        for i in 0..n {
            self.overridden[i].resize(n, false);
            self.mixed[i].resize(n, 0.0);
            for j in 0..n {
                if !self.overridden[i][j] {
                    self.mixed[i][j] = self.rule.mix(self.values[i], self.values[j]);
                }
            }
        }
    }
}

const BUILT_IN: [&str; 4] = ["epsilon", "sigma", "cutoff", "charge"];

/// Per-site-type model parameter tables derived from unique types.
///
/// The built-in parameters `epsilon`, `sigma`, `cutoff` and `charge` always
/// exist; any other property declared on a site type becomes an additional
/// parameter with average mixing. Site types lacking a property get zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    params: Vec<ModelParam>,
    constants: PhysicalConstants,
}

impl ModelParams {
    pub fn new(constants: PhysicalConstants) -> Self {
        Self {
            params: BUILT_IN.iter().map(|name| ModelParam::new(name)).collect(),
            constants,
        }
    }

    /// Tabulates every site type not yet present, then remixes.
    ///
    /// Existing values, including explicit overrides, are left untouched.
    pub fn update(&mut self, unique_types: &UniqueTypes, num_site_types: usize) {
        for site_type in 0..num_site_types {
            if let Some(site) = unique_types.site(site_type) {
                for (name, _) in site.properties.iter() {
                    if self.index_of(name).is_none() {
                        let mut param = ModelParam::new(name);
                        param.values = vec![0.0; self.num_site_types()];
                        self.params.push(param);
                    }
                }
            }
        }
        for param in &mut self.params {
            for site_type in param.values.len()..num_site_types {
                let value = unique_types
                    .site(site_type)
                    .and_then(|site| site.property(&param.name))
                    .unwrap_or(0.0);
                param.values.push(value);
            }
            param.mix();
        }
    }

    pub fn num_site_types(&self) -> usize {
        self.params.first().map_or(0, |p| p.values.len())
    }

    pub fn physical_constants(&self) -> &PhysicalConstants {
        &self.constants
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(ModelParam::name)
    }

    pub fn param(&self, name: &str) -> Result<&ModelParam, ParamsError> {
        self.index_of(name)
            .map(|i| &self.params[i])
            .ok_or_else(|| ParamsError::UnknownProperty {
                name: name.to_string(),
            })
    }

    pub fn value(&self, name: &str, site_type: usize) -> Result<f64, ParamsError> {
        let param = self.param(name)?;
        param.value(site_type).ok_or(ParamsError::SiteTypeOutOfRange {
            site_type,
            num_site_types: param.values.len(),
        })
    }

    pub fn mixed_value(&self, name: &str, type1: usize, type2: usize) -> Result<f64, ParamsError> {
        let param = self.param(name)?;
        param
            .mixed_value(type1, type2)
            .ok_or(ParamsError::SiteTypeOutOfRange {
                site_type: type1.max(type2),
                num_site_types: param.values.len(),
            })
    }

    /// Overrides the value of one site type and remixes the pair table.
    pub fn set(&mut self, name: &str, site_type: usize, value: f64) -> Result<(), ParamsError> {
        let param = self.param_mut(name, site_type)?;
        param.values[site_type] = value;
        param.mix();
        Ok(())
    }

    /// Overrides one mixed pair value (symmetrically); later remixing keeps it.
    pub fn set_mixed(
        &mut self,
        name: &str,
        type1: usize,
        type2: usize,
        value: f64,
    ) -> Result<(), ParamsError> {
        let param = self.param_mut(name, type1.max(type2))?;
        for (i, j) in [(type1, type2), (type2, type1)] {
            param.mixed[i][j] = value;
            param.overridden[i][j] = true;
        }
        Ok(())
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    fn param_mut(&mut self, name: &str, site_type: usize) -> Result<&mut ModelParam, ParamsError> {
        let index = self.index_of(name).ok_or_else(|| ParamsError::UnknownProperty {
            name: name.to_string(),
        })?;
        let param = &mut self.params[index];
        if site_type >= param.values.len() {
            return Err(ParamsError::SiteTypeOutOfRange {
                site_type,
                num_site_types: param.values.len(),
            });
        }
        Ok(param)
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        Self::new(PhysicalConstants::default())
    }
}
