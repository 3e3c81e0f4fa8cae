use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::docs::types::Rgb;

/// Semantic meaning of a highlighted run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Topic,
    Description,
    Answer,
}

/// Reference color for one role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorSpec {
    pub rgb: Rgb,
    /// Per-channel epsilon. `None` means bit-for-bit equality.
    pub tolerance: Option<f32>,
}

impl ColorSpec {
    pub fn new(rgb: Rgb, tolerance: Option<f32>) -> Result<Self> {
        for (name, value) in [("red", rgb.red), ("green", rgb.green), ("blue", rgb.blue)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                bail!("{} channel {} is outside [0, 1]", name, value);
            }
        }
        if let Some(eps) = tolerance {
            if !eps.is_finite() || eps <= 0.0 {
                bail!("tolerance {} must be a positive number", eps);
            }
        }
        Ok(Self { rgb, tolerance })
    }

    #[cfg(test)]
    pub fn exact(rgb: Rgb) -> Self {
        Self {
            rgb,
            tolerance: None,
        }
    }

    pub fn matches(&self, rgb: Rgb) -> bool {
        let pairs = [
            (self.rgb.red, rgb.red),
            (self.rgb.green, rgb.green),
            (self.rgb.blue, rgb.blue),
        ];
        match self.tolerance {
            None => pairs.iter().all(|(a, b)| a.to_bits() == b.to_bits()),
            Some(eps) => pairs.iter().all(|(a, b)| (a - b).abs() < eps),
        }
    }
}

/// Maps a run's background color to a role.
#[derive(Debug, Clone)]
pub struct ColorClassifier {
    topic: ColorSpec,
    description: ColorSpec,
    answer: ColorSpec,
}

impl ColorClassifier {
    pub fn new(topic: ColorSpec, description: ColorSpec, answer: ColorSpec) -> Self {
        Self {
            topic,
            description,
            answer,
        }
    }

    /// First matching role in topic, description, answer order.
    /// Runs without a background never classify.
    pub fn classify(&self, background: Option<Rgb>) -> Option<Role> {
        let rgb = background?;
        [
            (Role::Topic, &self.topic),
            (Role::Description, &self.description),
            (Role::Answer, &self.answer),
        ]
        .into_iter()
        .find(|(_, spec)| spec.matches(rgb))
        .map(|(role, _)| role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YELLOW: Rgb = Rgb::new(1.0, 0.9490196, 0.8);
    const BLUE: Rgb = Rgb::new(0.7882353, 0.85490197, 0.972549);
    const GREEN: Rgb = Rgb::new(0.8509804, 0.91764706, 0.827451);

    fn classifier(tolerance: Option<f32>) -> ColorClassifier {
        ColorClassifier::new(
            ColorSpec::new(YELLOW, tolerance).unwrap(),
            ColorSpec::new(BLUE, tolerance).unwrap(),
            ColorSpec::new(GREEN, tolerance).unwrap(),
        )
    }

    #[test]
    fn test_exact_match() {
        let c = classifier(None);
        assert_eq!(c.classify(Some(YELLOW)), Some(Role::Topic));
        assert_eq!(c.classify(Some(BLUE)), Some(Role::Description));
        assert_eq!(c.classify(Some(GREEN)), Some(Role::Answer));
    }

    #[test]
    fn test_exact_rejects_round_trip_noise() {
        let c = classifier(None);
        let noisy = Rgb::new(1.0, 0.949_02, 0.8);
        assert_eq!(c.classify(Some(noisy)), None);
    }

    #[test]
    fn test_tolerance_within_epsilon() {
        let c = classifier(Some(0.01));
        for delta in [-0.009_f32, -0.005, 0.0, 0.005, 0.009] {
            let rgb = Rgb::new(GREEN.red + delta, GREEN.green - delta, GREEN.blue + delta);
            assert_eq!(c.classify(Some(rgb)), Some(Role::Answer), "delta {}", delta);
        }
    }

    #[test]
    fn test_tolerance_outside_epsilon() {
        let c = classifier(Some(0.01));
        let rgb = Rgb::new(GREEN.red, GREEN.green + 0.02, GREEN.blue);
        assert_eq!(c.classify(Some(rgb)), None);
    }

    #[test]
    fn test_no_background_is_unclassified() {
        assert_eq!(classifier(Some(0.1)).classify(None), None);
    }

    #[test]
    fn test_white_is_unclassified() {
        assert_eq!(classifier(Some(0.01)).classify(Some(Rgb::new(1.0, 1.0, 1.0))), None);
    }

    #[test]
    fn test_spec_validation() {
        assert!(ColorSpec::new(Rgb::new(1.2, 0.0, 0.0), None).is_err());
        assert!(ColorSpec::new(Rgb::new(f32::NAN, 0.0, 0.0), None).is_err());
        assert!(ColorSpec::new(YELLOW, Some(0.0)).is_err());
        assert!(ColorSpec::new(YELLOW, Some(-1.0)).is_err());
        assert!(ColorSpec::new(YELLOW, Some(0.02)).is_ok());
    }
}
