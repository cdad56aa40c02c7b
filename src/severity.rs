use std::fmt;

/// Canonical severity tier. Anything outside the three known labels
/// (case-insensitive) classifies as `Unknown`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tier {
    High,
    Medium,
    Low,
    Unknown,
}

impl Tier {
    pub fn classify(raw: &str) -> Tier {
        match raw.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Tier::High,
            "MEDIUM" => Tier::Medium,
            "LOW" => Tier::Low,
            _ => Tier::Unknown,
        }
    }

    /// Numeric weight used for heatmap cell scoring.
    pub fn weight(self) -> u64 {
        match self {
            Tier::High => 3,
            Tier::Medium => 2,
            Tier::Low => 1,
            Tier::Unknown => 0,
        }
    }

    /// CSS class of the severity badge.
    pub fn badge_class(self) -> &'static str {
        match self {
            Tier::High => "high",
            Tier::Medium => "medium",
            Tier::Low => "low",
            Tier::Unknown => "unknown",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::High => "HIGH",
            Tier::Medium => "MEDIUM",
            Tier::Low => "LOW",
            Tier::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
