use serde::Serialize;
use std::fmt;

/// Reason for a permanent retirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetirementReason {
    Crash,
    Mechanical,
}

impl fmt::Display for RetirementReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RetirementReason::Crash => write!(f, "crash"),
            RetirementReason::Mechanical => write!(f, "mechanical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Racing,
    Pitting,
    Retired(RetirementReason),
}

/// StateHandler tracks the race state of a car and the number of completed laps.
///
/// Transitions: `Racing -> Pitting -> Racing` within a lap, `Racing -> Retired` (terminal).
#[derive(Debug, Clone)]
pub struct StateHandler {
    state: State,
    compl_lap: u32,
}

impl StateHandler {
    pub fn get_state(&self) -> State {
        self.state
    }

    /// act_pit moves the car into the pit lane.
    pub fn act_pit(&mut self) {
        if !matches!(self.state, State::Racing) {
            panic!("Tried to enter the pit lane without racing!")
        }
        self.state = State::Pitting;
    }

    /// deact_pit returns the car from the pit lane to the track.
    pub fn deact_pit(&mut self) {
        if !matches!(self.state, State::Pitting) {
            panic!("Tried to leave the pit lane without being in it!")
        }
        self.state = State::Racing;
    }

    /// retire ends the race of the car, there is no transition out of this state.
    pub fn retire(&mut self, reason: RetirementReason) {
        if !matches!(self.state, State::Racing) {
            panic!("Tried to retire a car that is not racing!")
        }
        self.state = State::Retired(reason);
    }

    pub fn complete_lap(&mut self) {
        if matches!(self.state, State::Retired(_)) {
            panic!("Tried to complete a lap with a retired car!")
        }
        self.compl_lap += 1;
    }

    pub fn get_compl_lap(&self) -> u32 {
        self.compl_lap
    }

    pub fn is_retired(&self) -> bool {
        matches!(self.state, State::Retired(_))
    }

    pub fn get_retirement_reason(&self) -> Option<RetirementReason> {
        match self.state {
            State::Retired(reason) => Some(reason),
            _ => None,
        }
    }
}

impl Default for StateHandler {
    fn default() -> Self {
        StateHandler {
            state: State::Racing,
            compl_lap: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pit_cycle_returns_to_racing() {
        let mut sh = StateHandler::default();
        sh.act_pit();
        assert_eq!(sh.get_state(), State::Pitting);
        sh.deact_pit();
        sh.complete_lap();
        assert_eq!(sh.get_state(), State::Racing);
        assert_eq!(sh.get_compl_lap(), 1);
    }

    #[test]
    fn retirement_is_terminal() {
        let mut sh = StateHandler::default();
        sh.retire(RetirementReason::Crash);
        assert!(sh.is_retired());
        assert_eq!(sh.get_retirement_reason(), Some(RetirementReason::Crash));
    }

    #[test]
    #[should_panic]
    fn retired_car_cannot_pit() {
        let mut sh = StateHandler::default();
        sh.retire(RetirementReason::Mechanical);
        sh.act_pit();
    }
}
