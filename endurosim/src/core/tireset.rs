use helpers::general::clamp_pct;
use serde::{Deserialize, Serialize};

/// Compound is the tire material category. Softer compounds are faster but wear out in fewer
/// laps; Intermediate and Wet are the rain compounds.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Compound {
    Soft,
    Medium,
    Hard,
    Intermediate,
    Wet,
}

impl Compound {
    /// from_name maps a free-form compound string onto a Compound.
    pub fn from_name(name: &str) -> Compound {
        match name.to_uppercase().as_str() {
            "SOFT" => Compound::Soft,
            "MEDIUM" => Compound::Medium,
            "HARD" => Compound::Hard,
            "INTERMEDIATE" => Compound::Intermediate,
            "WET" => Compound::Wet,
            _ => Compound::Medium, // neutral fallback
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Compound::Soft => "Soft",
            Compound::Medium => "Medium",
            Compound::Hard => "Hard",
            Compound::Intermediate => "Intermediate",
            Compound::Wet => "Wet",
        }
    }
}

/// * `soft` - (%/lap) Wear rate on the soft compound
/// * `medium` - (%/lap) Wear rate on the medium compound
/// * `hard` - (%/lap) Wear rate on the hard compound
/// * `intermediate` - (%/lap) Wear rate on the intermediate compound
/// * `wet` - (%/lap) Wear rate on the wet compound
#[derive(Debug, Deserialize, Clone)]
pub struct WearPars {
    pub soft: f64,
    pub medium: f64,
    pub hard: f64,
    pub intermediate: f64,
    pub wet: f64,
}

impl WearPars {
    /// rate returns the wear rate of the given compound in percentage points per lap.
    pub fn rate(&self, compound: Compound) -> f64 {
        match compound {
            Compound::Soft => self.soft,
            Compound::Medium => self.medium,
            Compound::Hard => self.hard,
            Compound::Intermediate => self.intermediate,
            Compound::Wet => self.wet,
        }
    }
}

impl Default for WearPars {
    fn default() -> Self {
        WearPars {
            soft: 2.8,
            medium: 1.8,
            hard: 1.1,
            intermediate: 2.0,
            wet: 1.5,
        }
    }
}

/// Tireset tracks the state of the currently fitted set of tires. Wear is kept in [0, 100]
/// no matter how many laps are applied.
#[derive(Debug, Clone)]
pub struct Tireset {
    pub compound: Compound,
    pub wear: f64,
    pub age_laps: u32,
}

impl Tireset {
    pub fn new(compound: Compound) -> Tireset {
        Tireset {
            compound,
            wear: 0.0,
            age_laps: 0,
        }
    }

    /// drive_lap adds one lap of wear to the set.
    pub fn drive_lap(&mut self, wear_pars: &WearPars) {
        self.wear = clamp_pct(self.wear + wear_pars.rate(self.compound));
        self.age_laps += 1;
    }
}
