use serde::Serialize;

/// Colour family a status is rendered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTone {
    Green,
    Red,
    Gray,
}

/// Plant health derived from a disease prediction label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "severity", content = "label", rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Carries the raw label, which is what gets displayed
    Diseased(String),
    /// No prediction yet
    Unknown,
}

impl HealthStatus {
    /// Any label containing "healthy" in any case is healthy; every other label is a disease.
    pub fn classify(prediction: Option<&str>) -> Self {
        match prediction.map(str::trim) {
            None | Some("") => HealthStatus::Unknown,
            Some(label) if label.to_lowercase().contains("healthy") => HealthStatus::Healthy,
            Some(label) => HealthStatus::Diseased(label.to_string()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    pub fn label(&self) -> &str {
        match self {
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Diseased(label) => label.as_str(),
            HealthStatus::Unknown => "Unknown",
        }
    }

    pub fn tone(&self) -> StatusTone {
        match self {
            HealthStatus::Healthy => StatusTone::Green,
            HealthStatus::Diseased(_) => StatusTone::Red,
            HealthStatus::Unknown => StatusTone::Gray,
        }
    }

    pub fn recommendations(&self) -> &'static [&'static str] {
        let label = match self {
            HealthStatus::Unknown => return WAITING,
            HealthStatus::Healthy => return HEALTHY_CARE,
            HealthStatus::Diseased(label) => label.to_lowercase(),
        };

        if label.contains("bacterial") {
            BACTERIAL_CARE
        } else if label.contains("spider") {
            SPIDER_MITE_CARE
        } else if label.contains("blight") {
            BLIGHT_CARE
        } else {
            GENERIC_CARE
        }
    }
}

const WAITING: &[&str] = &["Monitoring plant health...", "Check back for updates"];

const HEALTHY_CARE: &[&str] = &[
    "Continue current care routine",
    "Monitor daily for changes",
    "Maintain proper watering schedule",
];

const BACTERIAL_CARE: &[&str] = &[
    "Apply copper-based fungicide",
    "Improve air circulation",
    "Remove affected leaves",
    "Avoid overhead watering",
];

const SPIDER_MITE_CARE: &[&str] = &[
    "Use insecticidal soap treatment",
    "Apply neem oil spray",
    "Increase humidity around plant",
    "Check for mites regularly",
];

const BLIGHT_CARE: &[&str] = &[
    "Remove affected leaves immediately",
    "Apply fungicide treatment",
    "Improve drainage",
    "Avoid watering leaves directly",
];

const GENERIC_CARE: &[&str] = &[
    "Consult plant care guidelines",
    "Consider professional diagnosis",
    "Monitor closely for changes",
];
