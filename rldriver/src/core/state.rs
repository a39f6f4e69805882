use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LapPhase {
    Early,
    Mid,
    Late,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PositionBucket {
    Leader,
    Podium,
    Points,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TireAgeBucket {
    Fresh,
    Good,
    Worn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConditionBucket {
    Excellent,
    Good,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GapBucket {
    Close,
    Medium,
    Far,
}

/// Generates the string form and the parser of a bucket enum.
macro_rules! bucket_names {
    ($t:ty, $($variant:path => $name:literal),+ $(,)?) => {
        impl $t {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($variant => $name),+
                }
            }

            fn parse(s: &str) -> Option<$t> {
                match s {
                    $($name => Some($variant),)+
                    _ => None,
                }
            }
        }
    };
}

bucket_names!(LapPhase, LapPhase::Early => "early", LapPhase::Mid => "mid", LapPhase::Late => "late");
bucket_names!(
    PositionBucket,
    PositionBucket::Leader => "leader",
    PositionBucket::Podium => "podium",
    PositionBucket::Points => "points",
    PositionBucket::Back => "back",
);
bucket_names!(
    TireAgeBucket,
    TireAgeBucket::Fresh => "fresh",
    TireAgeBucket::Good => "good",
    TireAgeBucket::Worn => "worn",
);
bucket_names!(
    ConditionBucket,
    ConditionBucket::Excellent => "excellent",
    ConditionBucket::Good => "good",
    ConditionBucket::Poor => "poor",
);
bucket_names!(GapBucket, GapBucket::Close => "close", GapBucket::Medium => "medium", GapBucket::Far => "far");

/// RLState is the raw race situation of a single car as seen by the agent.
#[derive(Debug, Clone, PartialEq)]
pub struct RLState {
    pub lap: u32,
    pub total_laps: u32,
    pub position: u32,
    pub tire_age: u32,
    pub tire_condition: f64,
    pub gap_to_leader: f64,
    pub weather: String,
}

impl RLState {
    /// to_key discretizes the state.
    pub fn to_key(&self) -> StateKey {
        let lap = self.lap as f64;
        let total_laps = self.total_laps as f64;

        let phase = if lap < total_laps * 0.3 {
            LapPhase::Early
        } else if lap < total_laps * 0.7 {
            LapPhase::Mid
        } else {
            LapPhase::Late
        };

        let position = match self.position {
            1 => PositionBucket::Leader,
            2..=3 => PositionBucket::Podium,
            4..=10 => PositionBucket::Points,
            _ => PositionBucket::Back,
        };

        let tire_age = if self.tire_age < 10 {
            TireAgeBucket::Fresh
        } else if self.tire_age < 20 {
            TireAgeBucket::Good
        } else {
            TireAgeBucket::Worn
        };

        let condition = if self.tire_condition > 0.8 {
            ConditionBucket::Excellent
        } else if self.tire_condition > 0.5 {
            ConditionBucket::Good
        } else {
            ConditionBucket::Poor
        };

        let gap = if self.gap_to_leader < 2.0 {
            GapBucket::Close
        } else if self.gap_to_leader < 10.0 {
            GapBucket::Medium
        } else {
            GapBucket::Far
        };

        StateKey {
            phase,
            position,
            tire_age,
            condition,
            gap,
            weather: self.weather.to_owned(),
        }
    }
}

/// StateKey is the discretized state. Its string form, e.g. `mid_podium_good_good_close_dry`, is
/// used for persistence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey {
    pub phase: LapPhase,
    pub position: PositionBucket,
    pub tire_age: TireAgeBucket,
    pub condition: ConditionBucket,
    pub gap: GapBucket,
    pub weather: String,
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}_{}_{}",
            self.phase.as_str(),
            self.position.as_str(),
            self.tire_age.as_str(),
            self.condition.as_str(),
            self.gap.as_str(),
            self.weather
        )
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum StateKeyParseError {
    #[error("state key '{0}' does not have six components")]
    MissingComponent(String),
    #[error("unknown {bucket} bucket '{value}'")]
    UnknownBucket { bucket: &'static str, value: String },
}

fn parse_bucket<T>(
    value: &str,
    bucket: &'static str,
    parse: fn(&str) -> Option<T>,
) -> Result<T, StateKeyParseError> {
    parse(value).ok_or_else(|| StateKeyParseError::UnknownBucket {
        bucket,
        value: value.to_owned(),
    })
}

impl FromStr for StateKey {
    type Err = StateKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // the weather label is the remainder and may itself contain underscores
        let parts: Vec<&str> = s.splitn(6, '_').collect();
        if parts.len() != 6 || parts[5].is_empty() {
            return Err(StateKeyParseError::MissingComponent(s.to_owned()));
        }

        Ok(StateKey {
            phase: parse_bucket(parts[0], "lap phase", LapPhase::parse)?,
            position: parse_bucket(parts[1], "position", PositionBucket::parse)?,
            tire_age: parse_bucket(parts[2], "tire age", TireAgeBucket::parse)?,
            condition: parse_bucket(parts[3], "tire condition", ConditionBucket::parse)?,
            gap: parse_bucket(parts[4], "gap", GapBucket::parse)?,
            weather: parts[5].to_owned(),
        })
    }
}
