use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Index of the top of the nose bridge in the 68-point landmark layout.
///
/// This point anchors the face position readout.
pub const NOSE_BRIDGE_LANDMARK: usize = 27;

/// 2D point in pixel coordinates.
///
/// Serialized as a `[x, y]` pair.
///
/// # Example
/// ```
/// use cc_core::face::Point;
/// let p: Point = serde_json::from_str("[1.5, 2.0]").unwrap();
/// assert_eq!(p, Point::new(1.5, 2.0));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f32, f32)", into = "(f32, f32)")]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl Point {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (f32, f32) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// Axis-aligned face bounding box with its detection score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge (pixels).
    pub x: f32,
    /// Top edge (pixels).
    pub y: f32,
    /// Width (pixels).
    pub width: f32,
    /// Height (pixels).
    pub height: f32,
    /// Detection confidence [0.0, 1.0].
    #[serde(default)]
    pub score: f32,
}

/// Facial expression classes reported by the expression model.
///
/// The declaration order is the canonical order used to break ties
/// in [`ExpressionScores::dominant`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Expression {
    Neutral,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgusted,
    Surprised,
}

impl Expression {
    /// All classes, in canonical order.
    pub const ALL: [Expression; 7] = [
        Expression::Neutral,
        Expression::Happy,
        Expression::Sad,
        Expression::Angry,
        Expression::Fearful,
        Expression::Disgusted,
        Expression::Surprised,
    ];

    /// Wire/display label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Expression::Neutral => "neutral",
            Expression::Happy => "happy",
            Expression::Sad => "sad",
            Expression::Angry => "angry",
            Expression::Fearful => "fearful",
            Expression::Disgusted => "disgusted",
            Expression::Surprised => "surprised",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Expression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expression::ALL
            .into_iter()
            .find(|e| e.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown expression '{s}'"))
    }
}

/// Confidence per expression class.
///
/// Stored in canonical order, so argmax does not depend on the order in
/// which the backend listed the labels. Unknown labels are dropped on
/// deserialization.
///
/// # Example
/// ```
/// use cc_core::face::{Expression, ExpressionScores};
/// let mut scores = ExpressionScores::default();
/// scores.set(Expression::Happy, 0.9);
/// assert_eq!(scores.dominant(), Some((Expression::Happy, 0.9)));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, f32>", into = "BTreeMap<String, f32>")]
pub struct ExpressionScores {
    scores: [Option<f32>; 7],
}

impl ExpressionScores {
    /// Build from `(label, confidence)` pairs. Later duplicates overwrite earlier ones.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Expression, f32)>,
    {
        let mut out = Self::default();
        for (expr, conf) in pairs {
            out.set(expr, conf);
        }
        out
    }

    pub fn set(&mut self, expr: Expression, confidence: f32) {
        self.scores[expr.index()] = Some(confidence);
    }

    #[must_use]
    pub fn get(&self, expr: Expression) -> Option<f32> {
        self.scores[expr.index()]
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.iter().all(Option::is_none)
    }

    /// Present classes in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Expression, f32)> + '_ {
        Expression::ALL
            .into_iter()
            .filter_map(|e| self.get(e).map(|c| (e, c)))
    }

    /// Argmax over the present classes.
    ///
    /// Ties go to the class that comes first in canonical order. NaN
    /// confidences never win. Returns `None` when no class is present.
    #[must_use]
    pub fn dominant(&self) -> Option<(Expression, f32)> {
        self.iter()
            .filter(|(_, c)| !c.is_nan())
            .fold(None, |best, (e, c)| match best {
                Some((_, bc)) if c <= bc => best,
                _ => Some((e, c)),
            })
    }
}

impl From<BTreeMap<String, f32>> for ExpressionScores {
    fn from(map: BTreeMap<String, f32>) -> Self {
        let mut out = Self::default();
        for (label, conf) in map {
            match label.parse::<Expression>() {
                Ok(expr) => out.set(expr, conf),
                Err(e) => log::debug!("Expression ignorée : {e}"),
            }
        }
        out
    }
}

impl From<ExpressionScores> for BTreeMap<String, f32> {
    fn from(scores: ExpressionScores) -> Self {
        scores
            .iter()
            .map(|(e, c)| (e.label().to_string(), c))
            .collect()
    }
}

/// Gender label from the age/gender model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Gender::Male => "male",
            Gender::Female => "female",
        })
    }
}

/// One detected face with everything the models report about it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    /// Face bounding box.
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    /// Ordered landmark points (68 for the full landmark model).
    #[serde(default)]
    pub landmarks: Vec<Point>,
    /// Expression confidences.
    #[serde(default)]
    pub expressions: ExpressionScores,
    /// Estimated age in years.
    pub age: Option<f32>,
    /// Estimated gender.
    pub gender: Option<Gender>,
    /// Confidence of the gender estimate.
    #[serde(default)]
    pub gender_probability: f32,
}

impl FaceDetection {
    /// The landmark used for position feedback (nose bridge), if present.
    #[must_use]
    pub fn anchor(&self) -> Option<Point> {
        self.landmarks.get(NOSE_BRIDGE_LANDMARK).copied()
    }

    /// Box caption: `"31y, female"`.
    ///
    /// # Example
    /// ```
    /// use cc_core::face::{FaceDetection, BoundingBox, Gender};
    /// let face = FaceDetection {
    ///     bbox: BoundingBox::default(),
    ///     landmarks: vec![],
    ///     expressions: Default::default(),
    ///     age: Some(30.6),
    ///     gender: Some(Gender::Female),
    ///     gender_probability: 0.9,
    /// };
    /// assert_eq!(face.caption().as_deref(), Some("31y, female"));
    /// ```
    #[must_use]
    pub fn caption(&self) -> Option<String> {
        match (self.age, self.gender) {
            (Some(age), Some(gender)) => Some(format!("{}y, {gender}", age.round() as i32)),
            (Some(age), None) => Some(format!("{}y", age.round() as i32)),
            (None, Some(gender)) => Some(gender.to_string()),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dominant_breaks_ties_in_canonical_order() {
        let a = ExpressionScores::from_pairs([
            (Expression::Happy, 0.4),
            (Expression::Neutral, 0.4),
            (Expression::Sad, 0.2),
        ]);
        let b = ExpressionScores::from_pairs([
            (Expression::Sad, 0.2),
            (Expression::Neutral, 0.4),
            (Expression::Happy, 0.4),
        ]);
        for _ in 0..10 {
            assert_eq!(a.dominant(), Some((Expression::Neutral, 0.4)));
        }
        assert_eq!(a.dominant(), b.dominant());
    }

    #[test]
    fn dominant_skips_nan_and_empty() {
        assert_eq!(ExpressionScores::default().dominant(), None);
        let s = ExpressionScores::from_pairs([(Expression::Neutral, f32::NAN), (Expression::Sad, 0.1)]);
        assert_eq!(s.dominant(), Some((Expression::Sad, 0.1)));
    }

    #[test]
    fn detection_parses_backend_json() {
        let json = r#"{
            "box": {"x": 10, "y": 20, "width": 100, "height": 120, "score": 0.93},
            "landmarks": [[1, 2], [3, 4]],
            "expressions": {"happy": 0.7, "neutral": 0.2, "contempt": 0.1},
            "age": 28.4,
            "gender": "male",
            "gender_probability": 0.8
        }"#;
        let face: FaceDetection = serde_json::from_str(json).unwrap();
        assert_eq!(face.bbox.width, 100.0);
        assert_eq!(face.landmarks[1], Point::new(3.0, 4.0));
        assert_eq!(face.expressions.get(Expression::Happy), Some(0.7));
        assert_eq!(face.expressions.iter().count(), 2);
        assert_eq!(face.gender, Some(Gender::Male));
        assert!(face.anchor().is_none());
        assert_eq!(face.caption().as_deref(), Some("28y, male"));
    }
}
