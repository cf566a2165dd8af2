use na::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use uuid::Uuid;

use crate::config::{OrbitConfig, SweepConfig};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub look_from: Point3<f32>,
    pub look_at: Point3<f32>,
}

/// Scene parameters captured by one snapshot. Fields left at `None` keep the
/// scene's configured value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SnapshotParams {
    pub camera: Option<CameraPose>,
    pub light: Option<Point3<f32>>,
    /// Rigid motion applied to every element on top of its base pose, in the
    /// element's own frame.
    pub element_motion: Option<Isometry3<f32>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub id: Uuid,
    pub params: SnapshotParams,
}

impl Snapshot {
    pub fn new(id: Uuid, params: SnapshotParams) -> Self {
        Self { id, params }
    }
}

/// Stable id for the `index`-th snapshot of the sweep called `name`.
pub fn snapshot_id(name: &str, index: usize) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("sdg/{}/{}", name, index).as_bytes())
}

/// Finite, ordered sequence of snapshots, consumed once.
#[derive(Clone, Debug, Default)]
pub struct Sweep {
    snapshots: Vec<Snapshot>,
}

impl Sweep {
    /// Explicit snapshots when listed, otherwise the product of the camera
    /// orbit, the light orbit and the element yaw steps, camera outermost.
    pub fn from_config(config: &SweepConfig) -> Self {
        let params: Vec<SnapshotParams> = if config.snapshots.is_empty() {
            orbit_product(config)
        } else {
            config
                .snapshots
                .iter()
                .map(|s| SnapshotParams {
                    camera: s.camera.as_ref().map(|c| CameraPose {
                        look_from: Point3::from(c.look_from),
                        look_at: Point3::from(c.look_at),
                    }),
                    light: s.light.map(Point3::from),
                    element_motion: s.yaw.map(|deg| yaw_motion(deg.to_radians())),
                })
                .collect()
        };

        let snapshots = params
            .into_iter()
            .enumerate()
            .map(|(i, params)| Snapshot::new(snapshot_id(&config.name, i), params))
            .collect();

        Self { snapshots }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }
}

impl IntoIterator for Sweep {
    type Item = Snapshot;
    type IntoIter = std::vec::IntoIter<Snapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.snapshots.into_iter()
    }
}

fn yaw_motion(angle: f32) -> Isometry3<f32> {
    Isometry3::from_parts(
        Translation3::identity(),
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), angle),
    )
}

fn orbit_positions(orbit: &Option<OrbitConfig>) -> Vec<Option<(Point3<f32>, Point3<f32>)>> {
    match orbit {
        Some(orbit) => {
            let steps = orbit.steps.max(1);
            let target = Point3::from(orbit.target);
            (0..steps)
                .map(|k| {
                    let angle = orbit.start_angle.to_radians()
                        + 2.0 * std::f32::consts::PI * k as f32 / steps as f32;
                    let position = target
                        + Vector3::new(
                            orbit.radius * angle.cos(),
                            orbit.height,
                            orbit.radius * angle.sin(),
                        );
                    Some((position, target))
                })
                .collect()
        }
        None => vec![None],
    }
}

fn orbit_product(config: &SweepConfig) -> Vec<SnapshotParams> {
    let cameras = orbit_positions(&config.camera_orbit);
    let lights = orbit_positions(&config.light_orbit);
    let yaw_steps = config.element_yaw_steps.max(1);

    let mut params = vec![];
    for camera in &cameras {
        for light in &lights {
            for k in 0..yaw_steps {
                let element_motion = (yaw_steps > 1).then(|| {
                    yaw_motion(2.0 * std::f32::consts::PI * k as f32 / yaw_steps as f32)
                });
                params.push(SnapshotParams {
                    camera: camera.map(|(look_from, look_at)| CameraPose { look_from, look_at }),
                    light: light.map(|(position, _)| position),
                    element_motion,
                });
            }
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CameraPoseConfig, SnapshotConfig};
    use std::collections::HashSet;

    fn orbit(steps: u32) -> OrbitConfig {
        OrbitConfig {
            radius: 5.0,
            height: 1.0,
            steps,
            target: [0.0, 0.0, 0.0],
            start_angle: 0.0,
        }
    }

    #[test]
    fn orbit_product_enumerates_every_combination() {
        let config = SweepConfig {
            camera_orbit: Some(orbit(4)),
            light_orbit: Some(orbit(2)),
            element_yaw_steps: 3,
            ..Default::default()
        };
        let sweep = Sweep::from_config(&config);
        assert_eq!(sweep.len(), 24);

        let ids: HashSet<Uuid> = sweep.into_iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), 24);
    }

    #[test]
    fn ids_are_stable_across_runs() {
        let config = SweepConfig {
            camera_orbit: Some(orbit(3)),
            ..Default::default()
        };
        let a: Vec<Uuid> = Sweep::from_config(&config).into_iter().map(|s| s.id).collect();
        let b: Vec<Uuid> = Sweep::from_config(&config).into_iter().map(|s| s.id).collect();
        assert_eq!(a, b);
        assert_eq!(a[1], snapshot_id(&config.name, 1));
    }

    #[test]
    fn camera_orbit_circles_the_target() {
        let config = SweepConfig {
            camera_orbit: Some(orbit(4)),
            ..Default::default()
        };
        for snapshot in Sweep::from_config(&config) {
            let pose = snapshot.params.camera.unwrap();
            let offset = pose.look_from - pose.look_at;
            assert!((Vector3::new(offset.x, 0.0, offset.z).norm() - 5.0).abs() < 1e-4);
            assert!((offset.y - 1.0).abs() < 1e-6);
            assert!(snapshot.params.element_motion.is_none());
        }
    }

    #[test]
    fn explicit_snapshots_take_precedence() {
        let config = SweepConfig {
            camera_orbit: Some(orbit(8)),
            snapshots: vec![
                SnapshotConfig {
                    camera: Some(CameraPoseConfig {
                        look_from: [0.0, 0.0, 5.0],
                        look_at: [0.0, 0.0, 0.0],
                    }),
                    light: None,
                    yaw: Some(90.0),
                },
                SnapshotConfig::default(),
            ],
            ..Default::default()
        };
        let snapshots: Vec<Snapshot> = Sweep::from_config(&config).into_iter().collect();
        assert_eq!(snapshots.len(), 2);
        assert!(snapshots[0].params.element_motion.is_some());
        assert_eq!(snapshots[1].params, SnapshotParams::default());
    }

    #[test]
    fn empty_config_yields_a_single_snapshot() {
        let sweep = Sweep::from_config(&SweepConfig::default());
        assert_eq!(sweep.len(), 1);
    }
}
