use super::materials::{Material, MaterialDatabase, MaterialError};
use nalgebra::{Point3, Vector3};
use slotmap::{SlotMap, new_key_type};
use thiserror::Error;
use tracing::debug;

new_key_type! {
    pub struct VolumeId;
}

const AXES: [char; 3] = ['x', 'y', 'z'];

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("Volume '{volume}' has an invalid half-extent along {axis}: {value} (must be positive and finite)")]
    InvalidExtent {
        volume: String,
        axis: char,
        value: f64,
    },

    #[error(
        "Detector does not fit inside the world along {axis}: detector reaches {detector_reach} mm, world half-extent is {world_half_extent} mm"
    )]
    DetectorExceedsWorld {
        axis: char,
        detector_reach: f64,
        world_half_extent: f64,
    },

    #[error("Geometry is missing the {0} volume")]
    MissingVolume(&'static str),

    #[error(transparent)]
    Material(#[from] MaterialError),
}

/// Name, half-extents and material of one box volume, as supplied by configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeSpec {
    pub name: String,
    pub half_extents: Vector3<f64>,
    pub material: String,
}

impl VolumeSpec {
    pub fn new(name: &str, half_extents: Vector3<f64>, material: &str) -> Self {
        Self {
            name: name.to_string(),
            half_extents,
            material: material.to_string(),
        }
    }
}

/// Axis-aligned box centred on its local origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxSolid {
    half_extents: Vector3<f64>,
}

impl BoxSolid {
    pub fn new(half_extents: Vector3<f64>) -> Self {
        Self { half_extents }
    }

    pub fn half_extents(&self) -> &Vector3<f64> {
        &self.half_extents
    }

    pub fn contains(&self, local: &Point3<f64>) -> bool {
        (0..3).all(|i| local[i].abs() <= self.half_extents[i])
    }

    /// Radius of the smallest sphere around the origin that encloses the box.
    pub fn bounding_radius(&self) -> f64 {
        self.half_extents.norm()
    }

    /// Distance along `dir` from an interior point to the surface.
    pub fn distance_to_out(&self, local: &Point3<f64>, dir: &Vector3<f64>) -> f64 {
        (0..3)
            .filter(|&i| dir[i] != 0.0)
            .map(|i| {
                let face = self.half_extents[i].copysign(dir[i]);
                (face - local[i]) / dir[i]
            })
            .fold(f64::INFINITY, f64::min)
            .max(0.0)
    }

    /// Distance along `dir` from an exterior point to the surface, `None` when the ray misses.
    pub fn distance_to_in(&self, local: &Point3<f64>, dir: &Vector3<f64>) -> Option<f64> {
        let mut t_near = f64::NEG_INFINITY;
        let mut t_far = f64::INFINITY;
        for i in 0..3 {
            let h = self.half_extents[i];
            if dir[i] == 0.0 {
                if local[i].abs() > h {
                    return None;
                }
                continue;
            }
            let t1 = (-h - local[i]) / dir[i];
            let t2 = (h - local[i]) / dir[i];
            t_near = t_near.max(t1.min(t2));
            t_far = t_far.min(t1.max(t2));
        }
        if t_near >= 0.0 && t_near <= t_far {
            Some(t_near)
        } else {
            None
        }
    }
}

/// A placed box: solid, material and offset relative to its mother volume.
#[derive(Debug, Clone)]
pub struct Volume {
    pub name: String,
    pub solid: BoxSolid,
    pub material: Material,
    pub offset: Vector3<f64>,
    pub mother: Option<VolumeId>,
    daughters: Vec<VolumeId>,
}

impl Volume {
    pub fn daughters(&self) -> &[VolumeId] {
        &self.daughters
    }
}

/// The world box with the detector box placed inside it.
///
/// Immutable once built; the transport engine owns it for the rest of the process.
#[derive(Debug, Clone)]
pub struct DetectorGeometry {
    volumes: SlotMap<VolumeId, Volume>,
    world: VolumeId,
    detector: VolumeId,
}

impl DetectorGeometry {
    pub fn world(&self) -> VolumeId {
        self.world
    }

    pub fn detector(&self) -> VolumeId {
        self.detector
    }

    pub fn volume(&self, id: VolumeId) -> Option<&Volume> {
        self.volumes.get(id)
    }

    pub fn volumes_iter(&self) -> impl Iterator<Item = (VolumeId, &Volume)> {
        self.volumes.iter()
    }

    pub fn detector_bounding_radius(&self) -> f64 {
        let detector = &self.volumes[self.detector];
        detector.offset.norm() + detector.solid.bounding_radius()
    }

    /// Distance from the origin to the nearest world face.
    pub fn world_inner_radius(&self) -> f64 {
        self.volumes[self.world].solid.half_extents().min()
    }

    /// Offset of a volume's local origin in world coordinates.
    pub fn global_offset(&self, id: VolumeId) -> Vector3<f64> {
        let mut offset = Vector3::zeros();
        let mut current = Some(id);
        while let Some(vid) = current {
            let volume = &self.volumes[vid];
            offset += volume.offset;
            current = volume.mother;
        }
        offset
    }

    /// Innermost volume containing `point`, or `None` outside the world.
    pub fn locate(&self, point: &Point3<f64>) -> Option<VolumeId> {
        if !self.volumes[self.world].solid.contains(point) {
            return None;
        }
        let mut current = self.world;
        'descend: loop {
            for &daughter in self.volumes[current].daughters() {
                let local = point - self.global_offset(daughter);
                if self.volumes[daughter].solid.contains(&local) {
                    current = daughter;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }

    /// Distance along `dir` to the next boundary seen from inside `current`:
    /// either leaving `current` or entering one of its daughters.
    pub fn next_boundary(&self, point: &Point3<f64>, dir: &Vector3<f64>, current: VolumeId) -> f64 {
        let volume = &self.volumes[current];
        let local = point - self.global_offset(current);
        let to_out = volume.solid.distance_to_out(&local, dir);
        volume
            .daughters()
            .iter()
            .filter_map(|&d| {
                let local = point - self.global_offset(d);
                self.volumes[d].solid.distance_to_in(&local, dir)
            })
            .fold(to_out, f64::min)
    }
}

#[derive(Debug, Default)]
pub struct GeometryBuilder {
    world: Option<VolumeSpec>,
    detector: Option<VolumeSpec>,
    detector_offset: Vector3<f64>,
}

impl GeometryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn world(mut self, spec: VolumeSpec) -> Self {
        self.world = Some(spec);
        self
    }
    pub fn detector(mut self, spec: VolumeSpec) -> Self {
        self.detector = Some(spec);
        self
    }
    pub fn detector_offset(mut self, offset: Vector3<f64>) -> Self {
        self.detector_offset = offset;
        self
    }

    pub fn build(self, materials: &MaterialDatabase) -> Result<DetectorGeometry, GeometryError> {
        let world_spec = self.world.ok_or(GeometryError::MissingVolume("world"))?;
        let detector_spec = self
            .detector
            .ok_or(GeometryError::MissingVolume("detector"))?;

        validate_extents(&world_spec)?;
        validate_extents(&detector_spec)?;
        for (i, axis) in AXES.iter().enumerate() {
            let reach = self.detector_offset[i].abs() + detector_spec.half_extents[i];
            if !(reach < world_spec.half_extents[i]) {
                return Err(GeometryError::DetectorExceedsWorld {
                    axis: *axis,
                    detector_reach: reach,
                    world_half_extent: world_spec.half_extents[i],
                });
            }
        }

        let world_material = materials.find_or_build(&world_spec.material)?;
        let detector_material = materials.find_or_build(&detector_spec.material)?;

        let mut volumes = SlotMap::with_key();
        let world = volumes.insert(Volume {
            name: world_spec.name,
            solid: BoxSolid::new(world_spec.half_extents),
            material: world_material,
            offset: Vector3::zeros(),
            mother: None,
            daughters: Vec::new(),
        });
        let detector = volumes.insert(Volume {
            name: detector_spec.name,
            solid: BoxSolid::new(detector_spec.half_extents),
            material: detector_material,
            offset: self.detector_offset,
            mother: Some(world),
            daughters: Vec::new(),
        });
        volumes[world].daughters.push(detector);

        debug!(
            world = %volumes[world].name,
            detector = %volumes[detector].name,
            "Detector geometry constructed."
        );

        Ok(DetectorGeometry {
            volumes,
            world,
            detector,
        })
    }
}

/// Builds a detector box centred inside a world box.
pub fn build_geometry(
    world: VolumeSpec,
    detector: VolumeSpec,
    materials: &MaterialDatabase,
) -> Result<DetectorGeometry, GeometryError> {
    GeometryBuilder::new()
        .world(world)
        .detector(detector)
        .build(materials)
}

fn validate_extents(spec: &VolumeSpec) -> Result<(), GeometryError> {
    for (i, axis) in AXES.iter().enumerate() {
        let value = spec.half_extents[i];
        if !(value.is_finite() && value > 0.0) {
            return Err(GeometryError::InvalidExtent {
                volume: spec.name.clone(),
                axis: *axis,
                value,
            });
        }
    }
    Ok(())
}
