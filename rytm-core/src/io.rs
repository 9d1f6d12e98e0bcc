//! Two-state line abstractions.
//!
//! Driving real pins is a board concern. The core only needs to set a level,
//! read it back, and classify successive input levels as edges.

/// One two-state output line.
pub trait DigitalOutput {
    fn set_high(&mut self);
    fn set_low(&mut self);
    fn is_high(&self) -> bool;

    fn set(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }

    fn toggle(&mut self) {
        let high = self.is_high();
        self.set(!high);
    }
}

/// An output that only remembers its level. Used by hosts without hardware
/// and by tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatchedOutput {
    high: bool,
}

impl LatchedOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DigitalOutput for LatchedOutput {
    fn set_high(&mut self) {
        self.high = true;
    }

    fn set_low(&mut self) {
        self.high = false;
    }

    fn is_high(&self) -> bool {
        self.high
    }
}

/// A jack line with an indicator mirroring it.
///
/// The level reads back from the jack.
#[derive(Debug, Clone, Default)]
pub struct PairedOutput<J, L> {
    pub jack: J,
    pub led: L,
}

impl<J: DigitalOutput, L: DigitalOutput> PairedOutput<J, L> {
    pub fn new(jack: J, led: L) -> Self {
        Self { jack, led }
    }
}

impl<J: DigitalOutput, L: DigitalOutput> DigitalOutput for PairedOutput<J, L> {
    fn set_high(&mut self) {
        self.jack.set_high();
        self.led.set_high();
    }

    fn set_low(&mut self) {
        self.jack.set_low();
        self.led.set_low();
    }

    fn is_high(&self) -> bool {
        self.jack.is_high()
    }
}

/// Transition observed between two samples of an input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEdge {
    Rising,
    Falling,
    Unchanged,
}

/// Classifies successive (already debounced) levels of one input line.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeDetector {
    last: bool,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, level: bool) -> InputEdge {
        let edge = match (self.last, level) {
            (false, true) => InputEdge::Rising,
            (true, false) => InputEdge::Falling,
            _ => InputEdge::Unchanged,
        };
        self.last = level;
        edge
    }

    pub fn level(&self) -> bool {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_from_levels() {
        let mut det = EdgeDetector::new();
        let levels = [false, true, true, false, false, true];
        let edges: Vec<_> = levels.iter().map(|&l| det.process(l)).collect();
        assert_eq!(
            edges,
            vec![
                InputEdge::Unchanged,
                InputEdge::Rising,
                InputEdge::Unchanged,
                InputEdge::Falling,
                InputEdge::Unchanged,
                InputEdge::Rising,
            ]
        );
        assert!(det.level());
    }

    #[test]
    fn paired_output_mirrors_led() {
        let mut out = PairedOutput::new(LatchedOutput::new(), LatchedOutput::new());
        out.set_high();
        assert!(out.jack.is_high() && out.led.is_high());
        out.toggle();
        assert!(!out.is_high());
        assert!(!out.led.is_high());
    }
}
