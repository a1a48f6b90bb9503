use slotmap::new_key_type;

new_key_type! {
    pub struct ParticleId;
}

/// Handle to one site of a live particle, as stored in cell-list occupant sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteRef {
    pub particle: ParticleId, // Stable ID of the owning particle
    pub site: usize,          // Index of the site within the particle
}

impl SiteRef {
    pub fn new(particle: ParticleId, site: usize) -> Self {
        Self { particle, site }
    }
}
