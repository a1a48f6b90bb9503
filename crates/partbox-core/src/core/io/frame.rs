use super::traits::StateFile;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Malformed frame record {record}: {message}")]
    Malformed { record: usize, message: String },
}

/// Positions of one particle's sites, in site order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleFrame {
    pub particle_type: usize,
    pub positions: Vec<Point3<f64>>,
}

/// Site coordinates of every particle, in particle order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub particles: Vec<ParticleFrame>,
}

impl Frame {
    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    pub fn num_sites(&self) -> usize {
        self.particles.iter().map(|p| p.positions.len()).sum()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SiteRecord {
    particle: usize,
    particle_type: usize,
    site: usize,
    x: f64,
    y: f64,
    z: f64,
}

/// CSV coordinate frame with one record per site:
/// `particle,particle_type,site,x,y,z`.
///
/// Records must list particles in order, starting from zero, and the sites
/// of each particle in order.
pub struct FrameFile;

impl StateFile for FrameFile {
    type Data = Frame;
    type Error = FrameError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self::Data, Self::Error> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut frame = Frame::default();
        for (index, result) in csv_reader.deserialize::<SiteRecord>().enumerate() {
            let record = result?;
            let malformed = |message: String| FrameError::Malformed {
                record: index,
                message,
            };
            if record.particle == frame.particles.len() {
                frame.particles.push(ParticleFrame {
                    particle_type: record.particle_type,
                    positions: Vec::new(),
                });
            }
            let expected = frame.particles.len().saturating_sub(1);
            if record.particle != expected {
                return Err(malformed(format!(
                    "particle {} is out of order (expected {expected} or {})",
                    record.particle,
                    expected + 1
                )));
            }
            let particle = &mut frame.particles[expected];
            if particle.particle_type != record.particle_type {
                return Err(malformed(format!(
                    "particle {} changes type from {} to {}",
                    record.particle, particle.particle_type, record.particle_type
                )));
            }
            if record.site != particle.positions.len() {
                return Err(malformed(format!(
                    "site {} of particle {} is out of order (expected {})",
                    record.site,
                    record.particle,
                    particle.positions.len()
                )));
            }
            particle
                .positions
                .push(Point3::new(record.x, record.y, record.z));
        }
        Ok(frame)
    }

    fn write_to(data: &Self::Data, writer: &mut impl Write) -> Result<(), Self::Error> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for (particle, entry) in data.particles.iter().enumerate() {
            for (site, position) in entry.positions.iter().enumerate() {
                csv_writer.serialize(SiteRecord {
                    particle,
                    particle_type: entry.particle_type,
                    site,
                    x: position.x,
                    y: position.y,
                    z: position.z,
                })?;
            }
        }
        csv_writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn read(text: &str) -> Result<Frame, FrameError> {
        FrameFile::read_from(&mut text.as_bytes())
    }

    #[test]
    fn records_group_into_particles() {
        let frame = read(
            "particle,particle_type,site,x,y,z\n\
             0,0,0,0.0,0.0,0.0\n\
             0,0,1,1.0,0.0,0.0\n\
             1,1,0,2.5,-1.5,0.25\n",
        )
        .unwrap();
        assert_eq!(frame.num_particles(), 2);
        assert_eq!(frame.num_sites(), 3);
        assert_eq!(frame.particles[1].particle_type, 1);
        assert_eq!(frame.particles[1].positions[0], Point3::new(2.5, -1.5, 0.25));
    }

    #[test]
    fn out_of_order_records_are_rejected() {
        let skipped_particle = read("particle,particle_type,site,x,y,z\n1,0,0,0,0,0\n");
        assert!(matches!(skipped_particle, Err(FrameError::Malformed { record: 0, .. })));

        let skipped_site =
            read("particle,particle_type,site,x,y,z\n0,0,0,0,0,0\n0,0,2,0,0,0\n");
        assert!(matches!(skipped_site, Err(FrameError::Malformed { record: 1, .. })));

        let revisited = read(
            "particle,particle_type,site,x,y,z\n0,0,0,0,0,0\n1,0,0,0,0,0\n0,0,1,0,0,0\n",
        );
        assert!(matches!(revisited, Err(FrameError::Malformed { record: 2, .. })));

        let retyped = read("particle,particle_type,site,x,y,z\n0,0,0,0,0,0\n0,1,1,0,0,0\n");
        assert!(matches!(retyped, Err(FrameError::Malformed { record: 1, .. })));
    }

    #[test]
    fn non_numeric_coordinate_is_a_csv_error() {
        let result = read("particle,particle_type,site,x,y,z\n0,0,0,a,0,0\n");
        assert!(matches!(result, Err(FrameError::Csv(_))));
    }

    #[test]
    fn written_frame_reads_back_from_disk() {
        let frame = Frame {
            particles: vec![
                ParticleFrame {
                    particle_type: 0,
                    positions: vec![Point3::new(2.0, -1.66, 0.005783), Point3::new(0.1, 0.2, 0.3)],
                },
                ParticleFrame {
                    particle_type: 1,
                    positions: vec![Point3::new(-3.49, 3.4, 1e-12)],
                },
            ],
        };
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame.csv");
        FrameFile::write_to_path(&frame, &path).unwrap();
        assert_eq!(FrameFile::read_from_path(&path).unwrap(), frame);
    }
}
