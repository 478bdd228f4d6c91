use cc_core::face::{BoundingBox, FaceDetection, Point};

/// Rescale a detection from a `from` surface to a `to` surface.
///
/// Boxes and landmarks are scaled independently on each axis; everything
/// else is carried over untouched. A zero-sized `from` leaves the
/// detection as is.
///
/// # Example
/// ```
/// use cc_core::face::{BoundingBox, FaceDetection, Point};
/// use cc_vision::scale::resize_detection;
/// let face = FaceDetection {
///     bbox: BoundingBox { x: 10.0, y: 10.0, width: 20.0, height: 20.0, score: 0.9 },
///     landmarks: vec![Point::new(20.0, 20.0)],
///     expressions: Default::default(),
///     age: None,
///     gender: None,
///     gender_probability: 0.0,
/// };
/// let big = resize_detection(&face, (100, 100), (200, 50));
/// assert_eq!(big.landmarks[0], Point::new(40.0, 10.0));
/// assert_eq!(big.bbox.width, 40.0);
/// ```
#[must_use]
pub fn resize_detection(face: &FaceDetection, from: (u32, u32), to: (u32, u32)) -> FaceDetection {
    if from.0 == 0 || from.1 == 0 || from == to {
        return face.clone();
    }
    let sx = to.0 as f32 / from.0 as f32;
    let sy = to.1 as f32 / from.1 as f32;
    FaceDetection {
        bbox: BoundingBox {
            x: face.bbox.x * sx,
            y: face.bbox.y * sy,
            width: face.bbox.width * sx,
            height: face.bbox.height * sy,
            score: face.bbox.score,
        },
        landmarks: face
            .landmarks
            .iter()
            .map(|p| Point::new(p.x * sx, p.y * sy))
            .collect(),
        ..face.clone()
    }
}

/// [`resize_detection`] over a whole result set.
#[must_use]
pub fn resize_results(faces: &[FaceDetection], from: (u32, u32), to: (u32, u32)) -> Vec<FaceDetection> {
    faces.iter().map(|f| resize_detection(f, from, to)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_at(x: f32, y: f32) -> FaceDetection {
        FaceDetection {
            bbox: BoundingBox {
                x,
                y,
                width: 8.0,
                height: 8.0,
                score: 0.5,
            },
            landmarks: vec![Point::new(x, y); 68],
            expressions: Default::default(),
            age: Some(40.0),
            gender: None,
            gender_probability: 0.0,
        }
    }

    #[test]
    fn round_trip_through_scales_is_stable() {
        let face = face_at(32.0, 16.0);
        let up = resize_detection(&face, (64, 32), (640, 320));
        let back = resize_detection(&up, (640, 320), (64, 32));
        assert_eq!(back.bbox, face.bbox);
        assert_eq!(back.age, Some(40.0));
    }

    #[test]
    fn zero_source_is_identity() {
        let face = face_at(3.0, 4.0);
        assert_eq!(resize_detection(&face, (0, 10), (100, 100)), face);
    }

    #[test]
    fn results_scale_every_face() {
        let faces = vec![face_at(1.0, 1.0), face_at(2.0, 2.0)];
        let out = resize_results(&faces, (10, 10), (20, 20));
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].landmarks[27], Point::new(4.0, 4.0));
    }
}
