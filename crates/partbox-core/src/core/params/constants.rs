use super::ParamsError;
use phf::{Map, phf_map};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

/// A set of fundamental physical constants in SI units.
///
/// Serialized by name only; deserialization looks the name up again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalConstants {
    name: &'static str,
    boltzmann_constant: f64,  // J/K
    avogadro_constant: f64,   // 1/mol
    elementary_charge: f64,   // C
    permittivity_vacuum: f64, // F/m
}

static CONSTANT_SETS: Map<&'static str, PhysicalConstants> = phf_map! {
    "CODATA2010" => PhysicalConstants {
        name: "CODATA2010",
        boltzmann_constant: 1.3806488e-23,
        avogadro_constant: 6.02214129e23,
        elementary_charge: 1.602176565e-19,
        permittivity_vacuum: 8.854187817e-12,
    },
    "CODATA2014" => PhysicalConstants {
        name: "CODATA2014",
        boltzmann_constant: 1.38064852e-23,
        avogadro_constant: 6.022140857e23,
        elementary_charge: 1.6021766208e-19,
        permittivity_vacuum: 8.854187817e-12,
    },
    "CODATA2018" => PhysicalConstants {
        name: "CODATA2018",
        boltzmann_constant: 1.380649e-23,
        avogadro_constant: 6.02214076e23,
        elementary_charge: 1.602176634e-19,
        permittivity_vacuum: 8.8541878128e-12,
    },
};

pub const DEFAULT_PHYSICAL_CONSTANTS: &str = "CODATA2018";

impl PhysicalConstants {
    /// Looks up a named constant set, e.g. `"CODATA2010"`.
    pub fn by_name(name: &str) -> Result<Self, ParamsError> {
        CONSTANT_SETS
            .get(name)
            .copied()
            .ok_or_else(|| ParamsError::UnrecognizedClass {
                name: name.to_string(),
            })
    }

    /// Names of every available constant set.
    pub fn available() -> impl Iterator<Item = &'static str> {
        CONSTANT_SETS.keys().copied()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn boltzmann_constant(&self) -> f64 {
        self.boltzmann_constant
    }

    pub fn avogadro_constant(&self) -> f64 {
        self.avogadro_constant
    }

    pub fn elementary_charge(&self) -> f64 {
        self.elementary_charge
    }

    pub fn permittivity_vacuum(&self) -> f64 {
        self.permittivity_vacuum
    }

    /// Molar gas constant `R = kB * NA` in J/(mol K).
    pub fn ideal_gas_constant(&self) -> f64 {
        self.boltzmann_constant * self.avogadro_constant
    }

    /// Converts `q_i q_j / r` with charges in elementary units and distance in
    /// Angstrom to kJ/mol.
    pub fn charge_conversion(&self) -> f64 {
        self.elementary_charge.powi(2)
            / (4.0 * std::f64::consts::PI * self.permittivity_vacuum * 1e-10)
            / 1e3
            * self.avogadro_constant
    }
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        CONSTANT_SETS[DEFAULT_PHYSICAL_CONSTANTS]
    }
}

impl FromStr for PhysicalConstants {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::by_name(s.trim())
    }
}

impl TryFrom<String> for PhysicalConstants {
    type Error = ParamsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PhysicalConstants> for String {
    fn from(constants: PhysicalConstants) -> Self {
        constants.name.to_string()
    }
}

impl Serialize for PhysicalConstants {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}

impl<'de> Deserialize<'de> for PhysicalConstants {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Self::try_from(name).map_err(de::Error::custom)
    }
}

impl fmt::Display for PhysicalConstants {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_sets_carry_their_boltzmann_constant() {
        assert_eq!(
            PhysicalConstants::by_name("CODATA2010").unwrap().boltzmann_constant(),
            1.3806488e-23
        );
        assert_eq!(PhysicalConstants::default().boltzmann_constant(), 1.380649e-23);
        assert_eq!(PhysicalConstants::default().name(), "CODATA2018");
    }

    #[test]
    fn unknown_name_is_not_recognized() {
        let err = "bananas".parse::<PhysicalConstants>().unwrap_err();
        assert!(
            err.to_string()
                .contains("The class name \"bananas\" is not recognized")
        );
    }

    #[test]
    fn derived_constants_are_consistent() {
        let c = PhysicalConstants::default();
        assert!((c.ideal_gas_constant() - 8.314462618).abs() < 1e-8);
        assert!((c.charge_conversion() - 1389.35457).abs() < 1e-3);
    }

    #[test]
    fn constants_serialize_by_name() {
        #[derive(Debug, Serialize, Deserialize)]
        struct Wrapper {
            constants: PhysicalConstants,
        }
        let text = toml::to_string(&Wrapper {
            constants: PhysicalConstants::by_name("CODATA2014").unwrap(),
        })
        .unwrap();
        assert_eq!(text.trim(), "constants = \"CODATA2014\"");
        let back: Wrapper = toml::from_str(&text).unwrap();
        assert_eq!(back.constants.name(), "CODATA2014");
        let err = toml::from_str::<Wrapper>("constants = \"bananas\"").unwrap_err();
        assert!(err.to_string().contains("\"bananas\" is not recognized"));
    }

    #[test]
    fn available_lists_every_set() {
        let mut names: Vec<_> = PhysicalConstants::available().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["CODATA2010", "CODATA2014", "CODATA2018"]);
    }
}
