use super::properties::Properties;

/// A bond of a particle template.
///
/// Bonds connect two or more sites of the same particle type (two for bonds,
/// three for angles, four for dihedrals) and carry the properties declared
/// for their bond type, e.g. equilibrium `length` and tolerance `delta`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bond {
    pub bond_type: usize,       // Global bond type
    pub sites: Vec<usize>,      // Indices of the bonded sites within the particle type
    pub properties: Properties, // Properties of the bond type
}

impl Bond {
    pub fn new(bond_type: usize, sites: Vec<usize>, properties: Properties) -> Self {
        Self {
            bond_type,
            sites,
            properties,
        }
    }

    pub fn num_sites(&self) -> usize {
        self.sites.len()
    }

    pub fn site(&self, index: usize) -> Option<usize> {
        self.sites.get(index).copied()
    }

    pub fn contains(&self, site: usize) -> bool {
        self.sites.contains(&site)
    }

    pub fn property(&self, name: &str) -> Option<f64> {
        self.properties.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn harmonic_bond(sites: Vec<usize>) -> Bond {
        let props: Properties = [("length", 1.0), ("delta", 0.000001)].into_iter().collect();
        Bond::new(0, sites, props)
    }

    #[test]
    fn bond_new_initializes_fields_correctly() {
        let bond = harmonic_bond(vec![0, 2]);
        assert_eq!(bond.bond_type, 0);
        assert_eq!(bond.num_sites(), 2);
        assert_eq!(bond.site(0), Some(0));
        assert_eq!(bond.site(1), Some(2));
        assert_eq!(bond.site(2), None);
        assert_eq!(bond.property("length"), Some(1.0));
        assert_eq!(bond.property("delta"), Some(0.000001));
    }

    #[test]
    fn bond_contains_returns_true_for_member_sites() {
        let bond = harmonic_bond(vec![1, 0, 2]);
        assert!(bond.contains(0));
        assert!(bond.contains(1));
        assert!(bond.contains(2));
    }

    #[test]
    fn bond_contains_returns_false_for_unrelated_site() {
        let bond = harmonic_bond(vec![0, 1]);
        assert!(!bond.contains(5));
    }
}
