//! Time-dependent source waveforms.

use std::f64::consts::PI;
use std::fmt;

/// PULSE waveform parameters
///
/// ```text
///       v2 ─────┬─────┐
///              /│     │\
///             / │     │ \
///       v1 ─┘   │     │   └─────
///           td  tr    pw  tf
///           └───────period───────┘
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Pulse {
    pub v1: f64,
    pub v2: f64,
    pub delay: f64,
    pub rise: f64,
    pub fall: f64,
    pub width: f64,
    /// 0 = single pulse
    pub period: f64,
}

impl Pulse {
    pub fn new(v1: f64, v2: f64, delay: f64, rise: f64, fall: f64, width: f64, period: f64) -> Self {
        Self {
            v1,
            v2,
            delay,
            rise,
            fall,
            width,
            period,
        }
    }

    /// Evaluate the waveform at time `t`.
    pub fn evaluate(&self, t: f64) -> f64 {
        if t < self.delay {
            return self.v1;
        }

        let t_rel = if self.period > 0.0 {
            (t - self.delay) % self.period
        } else {
            t - self.delay
        };

        if t_rel < self.rise {
            return self.v1 + (self.v2 - self.v1) * t_rel / self.rise;
        }
        if t_rel < self.rise + self.width {
            return self.v2;
        }
        if t_rel < self.rise + self.width + self.fall {
            let t_fall = t_rel - self.rise - self.width;
            return self.v2 - (self.v2 - self.v1) * t_fall / self.fall;
        }
        self.v1
    }
}

impl fmt::Display for Pulse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pulse({} {} {} {} {} {} {})",
            self.v1, self.v2, self.delay, self.rise, self.fall, self.width, self.period
        )
    }
}

/// Damped sine waveform parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Sine {
    pub offset: f64,
    pub amplitude: f64,
    /// Hz
    pub frequency: f64,
    pub delay: f64,
    /// Exponential damping factor (1/s)
    pub damping: f64,
    /// Degrees
    pub phase: f64,
}

impl Sine {
    pub fn new(offset: f64, amplitude: f64, frequency: f64) -> Self {
        Self {
            offset,
            amplitude,
            frequency,
            delay: 0.0,
            damping: 0.0,
            phase: 0.0,
        }
    }

    /// Evaluate the waveform at time `t`. Before `delay` the output holds
    /// the value the sine has at its own start.
    pub fn evaluate(&self, t: f64) -> f64 {
        let phase = self.phase * PI / 180.0;
        if t < self.delay {
            return self.offset + self.amplitude * phase.sin();
        }
        let t_rel = t - self.delay;
        let envelope = (-t_rel * self.damping).exp();
        self.offset + self.amplitude * envelope * (2.0 * PI * self.frequency * t_rel + phase).sin()
    }
}

impl fmt::Display for Sine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sin({} {} {} {} {} {})",
            self.offset, self.amplitude, self.frequency, self.delay, self.damping, self.phase
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pulse_phases() {
        let p = Pulse::new(0.0, 5.0, 1e-3, 1e-3, 1e-3, 2e-3, 0.0);
        assert_eq!(p.evaluate(0.0), 0.0);
        assert_relative_eq!(p.evaluate(1.5e-3), 2.5, epsilon = 1e-9);
        assert_eq!(p.evaluate(3e-3), 5.0);
        assert_relative_eq!(p.evaluate(4.5e-3), 2.5, epsilon = 1e-9);
        assert_eq!(p.evaluate(10e-3), 0.0);
    }

    #[test]
    fn test_pulse_repeats_with_period() {
        let p = Pulse::new(0.0, 1.0, 0.0, 0.0, 0.0, 1e-3, 2e-3);
        assert_eq!(p.evaluate(0.5e-3), 1.0);
        assert_eq!(p.evaluate(1.5e-3), 0.0);
        assert_eq!(p.evaluate(2.5e-3), 1.0);
    }

    #[test]
    fn test_sine() {
        let s = Sine::new(1.0, 2.0, 1e3);
        assert_relative_eq!(s.evaluate(0.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(s.evaluate(0.25e-3), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sine_holds_before_delay() {
        let s = Sine {
            delay: 1e-3,
            phase: 90.0,
            ..Sine::new(0.0, 1.0, 50.0)
        };
        assert_relative_eq!(s.evaluate(0.5e-3), 1.0, epsilon = 1e-12);
    }
}
