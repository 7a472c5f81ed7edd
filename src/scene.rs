//! Consumer-side scene state.
//!
//! Applies decoded frames the way a viewer does: the mesh topology is fixed
//! by `InitObject`, vertex updates must match it exactly, and silhouettes
//! are replaced wholesale. Every check runs before anything is mutated, so
//! a rejected update leaves the scene as it was.

use serde::Serialize;

use crate::error::SceneError;
use crate::protocol::{
    Event, EventKind, Frame, MeshDelta, MeshSnapshot, SilhouetteArea, SilhouetteBitmap,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Top,
    Bottom,
}

/// What an applied frame changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneUpdate {
    MeshInitialized { vertices: usize, faces: usize },
    MeshUpdated { vertices: usize },
    AreaResized { width: i32, height: i32 },
    SilhouetteUpdated { side: Side, width: i32, height: i32 },
}

#[derive(Debug, Clone, Default)]
pub struct SceneState {
    mesh: Option<MeshSnapshot>,
    area: Option<SilhouetteArea>,
    top: Option<SilhouetteBitmap>,
    bottom: Option<SilhouetteBitmap>,
}

impl SceneState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mesh(&self) -> Option<&MeshSnapshot> {
        self.mesh.as_ref()
    }

    /// Canvas size shared by both silhouettes.
    pub fn area(&self) -> Option<SilhouetteArea> {
        self.area
    }

    pub fn silhouette(&self, side: Side) -> Option<&SilhouetteBitmap> {
        match side {
            Side::Top => self.top.as_ref(),
            Side::Bottom => self.bottom.as_ref(),
        }
    }

    pub fn apply_frame(&mut self, frame: &Frame) -> Result<SceneUpdate, SceneError> {
        let event = Event::from_frame(frame)?;
        self.apply(event)
    }

    pub fn apply(&mut self, event: Event) -> Result<SceneUpdate, SceneError> {
        match event {
            Event::InitObject(mesh) => self.init_mesh(mesh),
            Event::UpdateObject(delta) => self.update_mesh(delta),
            Event::InitSilhouetteArea(area) => {
                self.area = Some(area);
                Ok(SceneUpdate::AreaResized {
                    width: area.width,
                    height: area.height,
                })
            }
            Event::UpdateTopSilhouette(bitmap) => {
                self.update_silhouette(Side::Top, EventKind::UpdateTopSilhouette, bitmap)
            }
            Event::UpdateBottomSilhouette(bitmap) => {
                self.update_silhouette(Side::Bottom, EventKind::UpdateBottomSilhouette, bitmap)
            }
        }
    }

    fn init_mesh(&mut self, mesh: MeshSnapshot) -> Result<SceneUpdate, SceneError> {
        let vertex_count = mesh.vertices.len();
        for (face, indices) in mesh.faces.iter().enumerate() {
            for index in indices.indices() {
                let in_range = usize::try_from(index).is_ok_and(|i| i < vertex_count);
                if !in_range {
                    return Err(SceneError::FaceIndexOutOfRange {
                        face,
                        index,
                        vertex_count,
                    });
                }
            }
        }

        let update = SceneUpdate::MeshInitialized {
            vertices: vertex_count,
            faces: mesh.faces.len(),
        };
        self.mesh = Some(mesh);
        Ok(update)
    }

    fn update_mesh(&mut self, delta: MeshDelta) -> Result<SceneUpdate, SceneError> {
        let mesh = self.mesh.as_mut().ok_or(SceneError::NoMesh)?;
        if delta.vertices.len() != mesh.vertices.len() {
            return Err(SceneError::VertexCountMismatch {
                expected: mesh.vertices.len(),
                actual: delta.vertices.len(),
            });
        }
        mesh.vertices = delta.vertices;
        Ok(SceneUpdate::MeshUpdated {
            vertices: mesh.vertices.len(),
        })
    }

    fn update_silhouette(
        &mut self,
        side: Side,
        kind: EventKind,
        bitmap: SilhouetteBitmap,
    ) -> Result<SceneUpdate, SceneError> {
        let expected = usize::try_from(bitmap.width)
            .ok()
            .zip(usize::try_from(bitmap.height).ok())
            .and_then(|(w, h)| w.checked_mul(h));
        if expected != Some(bitmap.pixel_count()) {
            return Err(SceneError::PixelCountMismatch {
                kind,
                declared: bitmap.pixel_count(),
                width: bitmap.width,
                height: bitmap.height,
            });
        }

        let update = SceneUpdate::SilhouetteUpdated {
            side,
            width: bitmap.width,
            height: bitmap.height,
        };
        match side {
            Side::Top => self.top = Some(bitmap),
            Side::Bottom => self.bottom = Some(bitmap),
        }
        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;
    use crate::protocol::{Face, Vec3};

    fn triangle() -> MeshSnapshot {
        MeshSnapshot::new(
            vec![
                Vec3::new(0.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, -1.0, 0.0),
            ],
            vec![Face::new(0, 1, 2)],
        )
    }

    #[test]
    fn test_init_then_update() {
        let mut scene = SceneState::new();
        assert_eq!(
            scene.apply(Event::InitObject(triangle())),
            Ok(SceneUpdate::MeshInitialized {
                vertices: 3,
                faces: 1
            })
        );

        let moved = vec![
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, -2.0, 0.0),
        ];
        let frame = Event::UpdateObject(MeshDelta::new(moved.clone()))
            .to_frame()
            .unwrap();
        assert_eq!(
            scene.apply_frame(&frame),
            Ok(SceneUpdate::MeshUpdated { vertices: 3 })
        );

        let mesh = scene.mesh().unwrap();
        assert_eq!(mesh.vertices, moved);
        assert_eq!(mesh.faces, vec![Face::new(0, 1, 2)]);
    }

    #[test]
    fn test_update_before_init() {
        let mut scene = SceneState::new();
        let result = scene.apply(Event::UpdateObject(MeshDelta::new(vec![Vec3::default()])));
        assert_eq!(result, Err(SceneError::NoMesh));
        assert!(scene.mesh().is_none());
    }

    #[test]
    fn test_vertex_count_mismatch_discards_update() {
        let mut scene = SceneState::new();
        scene.apply(Event::InitObject(triangle())).unwrap();

        let result = scene.apply(Event::UpdateObject(MeshDelta::new(vec![
            Vec3::new(9.0, 9.0, 9.0),
            Vec3::new(9.0, 9.0, 9.0),
        ])));
        assert_eq!(
            result,
            Err(SceneError::VertexCountMismatch {
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(scene.mesh(), Some(&triangle()));
    }

    #[test]
    fn test_face_index_out_of_range() {
        let mut scene = SceneState::new();
        scene.apply(Event::InitObject(triangle())).unwrap();

        for bad in [3, -1] {
            let mesh = MeshSnapshot::new(triangle().vertices, vec![Face::new(0, 1, bad)]);
            let result = scene.apply(Event::InitObject(mesh));
            assert_eq!(
                result,
                Err(SceneError::FaceIndexOutOfRange {
                    face: 0,
                    index: bad,
                    vertex_count: 3
                })
            );
        }
        assert_eq!(scene.mesh(), Some(&triangle()));
    }

    #[test]
    fn test_silhouettes() {
        let mut scene = SceneState::new();
        scene
            .apply(Event::InitSilhouetteArea(SilhouetteArea::new(2, 1)))
            .unwrap();
        assert_eq!(scene.area(), Some(SilhouetteArea::new(2, 1)));

        let top = SilhouetteBitmap::new(2, 1, vec![10, 20]);
        assert_eq!(
            scene.apply(Event::UpdateTopSilhouette(top.clone())),
            Ok(SceneUpdate::SilhouetteUpdated {
                side: Side::Top,
                width: 2,
                height: 1
            })
        );
        assert_eq!(scene.silhouette(Side::Top), Some(&top));
        assert_eq!(scene.silhouette(Side::Bottom), None);
        assert_eq!(scene.silhouette(Side::Top).unwrap().intensity(1, 0), Some(20));
    }

    #[test]
    fn test_pixel_count_mismatch() {
        let mut scene = SceneState::new();
        let good = SilhouetteBitmap::new(1, 1, vec![5]);
        scene
            .apply(Event::UpdateBottomSilhouette(good.clone()))
            .unwrap();

        let bad = SilhouetteBitmap::new(2, 2, vec![1, 2, 3]);
        assert_eq!(
            scene.apply(Event::UpdateBottomSilhouette(bad)),
            Err(SceneError::PixelCountMismatch {
                kind: EventKind::UpdateBottomSilhouette,
                declared: 3,
                width: 2,
                height: 2
            })
        );
        assert_eq!(scene.silhouette(Side::Bottom), Some(&good));

        let negative = SilhouetteBitmap::new(-1, -1, vec![1]);
        assert!(scene.apply(Event::UpdateTopSilhouette(negative)).is_err());
    }

    #[test]
    fn test_malformed_frame() {
        let mut scene = SceneState::new();
        let frame = Frame::new(EventKind::InitSilhouetteArea, &[1, 0]);
        assert!(matches!(
            scene.apply_frame(&frame),
            Err(SceneError::Protocol(ProtocolError::MalformedFrame { .. }))
        ));
    }
}
