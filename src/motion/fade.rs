/// Linear opacity ramps at the head and tail of a clip.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize)]
pub struct FadeEnvelope {
    /// Fade-in length in seconds.
    pub fade_in: f64,
    /// Fade-out length in seconds.
    pub fade_out: f64,
}

/// Result of fitting an envelope to a clip.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FittedFade {
    /// Envelope safe to apply to the clip.
    pub envelope: FadeEnvelope,
    /// Whether the requested ramps overlapped and had to be shortened.
    pub clamped: bool,
}

impl FadeEnvelope {
    /// Same length in and out.
    pub fn symmetric(fade: f64) -> Self {
        Self {
            fade_in: fade,
            fade_out: fade,
        }
    }

    /// Fit the envelope to a clip of `duration` seconds.
    ///
    /// When `fade_in + fade_out` exceeds the duration, each ramp is clamped to half the
    /// duration so the ramps meet at most in the middle.
    pub fn fit(self, duration: f64) -> FittedFade {
        let fade_in = self.fade_in.max(0.0);
        let fade_out = self.fade_out.max(0.0);
        let duration = duration.max(0.0);
        if fade_in + fade_out <= duration {
            return FittedFade {
                envelope: Self { fade_in, fade_out },
                clamped: false,
            };
        }
        let half = duration * 0.5;
        FittedFade {
            envelope: Self {
                fade_in: fade_in.min(half),
                fade_out: fade_out.min(half),
            },
            clamped: true,
        }
    }

    /// Opacity at `elapsed` seconds into a clip of `duration` seconds: the lower of the two
    /// ramps. Zero outside the clip.
    pub fn opacity(&self, elapsed: f64, duration: f64) -> f32 {
        if !elapsed.is_finite() || elapsed < 0.0 || elapsed > duration {
            return 0.0;
        }
        ramp(elapsed, self.fade_in).min(ramp(duration - elapsed, self.fade_out)) as f32
    }

    /// Opacity with the fade-out held at full, for a clip whose successor is already
    /// dissolving in on top of it. Zero outside the clip.
    pub fn fade_in_opacity(&self, elapsed: f64, duration: f64) -> f32 {
        if !elapsed.is_finite() || elapsed < 0.0 || elapsed > duration {
            return 0.0;
        }
        ramp(elapsed, self.fade_in) as f32
    }
}

fn ramp(t: f64, len: f64) -> f64 {
    if len > 0.0 {
        (t / len).clamp(0.0, 1.0)
    } else {
        1.0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/motion/fade.rs"]
mod tests;
