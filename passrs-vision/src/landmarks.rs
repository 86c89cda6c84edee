use anyhow::Result;
use image::RgbImage;

/// Number of points produced by the Face Mesh topology.
pub const NUM_LANDMARKS: usize = 468;

/// Forehead, at the hairline.
pub const FOREHEAD: usize = 10;
pub const CHIN: usize = 152;
pub const LEFT_EYE: usize = 33;
pub const RIGHT_EYE: usize = 263;

/// Normalized facial keypoint, `[0, 1]` per axis relative to the source image.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// The full 468-point mesh of a single face.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: Vec<Landmark>,
}

impl LandmarkSet {
    /// Build a set from exactly [`NUM_LANDMARKS`] points.
    pub fn new(points: Vec<Landmark>) -> Result<Self> {
        if points.len() != NUM_LANDMARKS {
            anyhow::bail!(
                "expected {} landmarks, got {}",
                NUM_LANDMARKS,
                points.len()
            );
        }
        Ok(Self { points })
    }

    pub fn get(&self, index: usize) -> Landmark {
        self.points[index]
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    pub fn forehead(&self) -> Landmark {
        self.points[FOREHEAD]
    }

    pub fn chin(&self) -> Landmark {
        self.points[CHIN]
    }

    pub fn left_eye(&self) -> Landmark {
        self.points[LEFT_EYE]
    }

    pub fn right_eye(&self) -> Landmark {
        self.points[RIGHT_EYE]
    }

    /// Apply `f` to every point, keeping the index layout.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(Landmark) -> Landmark,
    {
        Self {
            points: self.points.iter().copied().map(f).collect(),
        }
    }
}

/// Anything that can locate one face and return its mesh.
///
/// `Ok(None)` means no face was confidently found. `Err` is reserved for
/// failures of the detector itself (model runtime, tensor shapes).
pub trait LandmarkOracle {
    fn detect(&mut self, image: &RgbImage) -> Result<Option<LandmarkSet>>;
}

impl<T: LandmarkOracle + ?Sized> LandmarkOracle for &mut T {
    fn detect(&mut self, image: &RgbImage) -> Result<Option<LandmarkSet>> {
        (**self).detect(image)
    }
}

impl<T: LandmarkOracle + ?Sized> LandmarkOracle for Box<T> {
    fn detect(&mut self, image: &RgbImage) -> Result<Option<LandmarkSet>> {
        (**self).detect(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_length() {
        assert!(LandmarkSet::new(vec![Landmark::default(); 5]).is_err());
        assert!(LandmarkSet::new(vec![Landmark::default(); NUM_LANDMARKS]).is_ok());
    }

    #[test]
    fn test_named_indices() {
        let mut points = vec![Landmark::default(); NUM_LANDMARKS];
        points[FOREHEAD] = Landmark::new(0.5, 0.1);
        points[CHIN] = Landmark::new(0.5, 0.9);
        points[LEFT_EYE] = Landmark::new(0.4, 0.3);
        points[RIGHT_EYE] = Landmark::new(0.6, 0.3);
        let set = LandmarkSet::new(points).unwrap();

        assert_eq!(set.forehead().y, 0.1);
        assert_eq!(set.chin().y, 0.9);
        assert_eq!(set.left_eye().x, 0.4);
        assert_eq!(set.right_eye().x, 0.6);
    }

    #[test]
    fn test_map_keeps_layout() {
        let set = LandmarkSet::new(vec![Landmark::new(0.25, 0.5); NUM_LANDMARKS]).unwrap();
        let doubled = set.map(|p| Landmark::new(p.x * 2.0, p.y * 2.0));
        assert_eq!(doubled.points().len(), NUM_LANDMARKS);
        assert_eq!(doubled.get(CHIN), Landmark::new(0.5, 1.0));
    }
}
