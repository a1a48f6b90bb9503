//! Particle templates shared by the engine tests.

use crate::core::models::particle::ParticleTypeDescriptor;
use crate::core::models::properties::Properties;

/// Three-site water: oxygen (site type 0) at the origin and two hydrogens
/// (site type 1), with two O-H bonds and one H-O-H angle.
pub(crate) fn spce() -> ParticleTypeDescriptor {
    let mut desc = ParticleTypeDescriptor::new("data.spce");
    let o = desc.add_site_type(props(&[
        ("epsilon", 0.650169581),
        ("sigma", 3.16555789),
        ("cutoff", 10.0),
        ("charge", -0.8476),
    ]));
    let h = desc.add_site_type(props(&[
        ("epsilon", 0.0),
        ("sigma", 0.0),
        ("cutoff", 10.0),
        ("charge", 0.4238),
    ]));
    desc.add_site(o, &[0.0, 0.0, 0.0])
        .add_site(h, &[1.0, 0.0, 0.0])
        .add_site(h, &[-0.333313, 0.942816, 0.0]);
    let oh = desc.add_bond_type(props(&[("length", 1.0), ("delta", 0.000001)]));
    let hoh = desc.add_bond_type(props(&[("degrees", 109.47), ("delta", 0.000001)]));
    desc.add_bond(oh, &[0, 1])
        .add_bond(oh, &[0, 2])
        .add_bond(hoh, &[1, 0, 2]);
    desc
}

/// Single Lennard-Jones site.
pub(crate) fn lj() -> ParticleTypeDescriptor {
    monatomic("data.lj")
}

/// Single Lennard-Jones site registered under a different source.
pub(crate) fn atom() -> ParticleTypeDescriptor {
    monatomic("data.atom")
}

fn monatomic(source: &str) -> ParticleTypeDescriptor {
    let mut desc = ParticleTypeDescriptor::new(source);
    let t = desc.add_site_type(props(&[("epsilon", 1.0), ("sigma", 1.0), ("cutoff", 3.0)]));
    desc.add_site(t, &[0.0, 0.0, 0.0]);
    desc
}

fn props(entries: &[(&str, f64)]) -> Properties {
    entries.iter().copied().collect()
}
