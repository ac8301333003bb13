use glam::{Quat, Vec3};

/// Keyframe interpolation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    #[default]
    Linear,
    /// Holds the earlier keyframe's value.
    Constant,
    /// Declared but unimplemented; samples fall back to linear.
    Cubic,
}

/// A single keyframe.
#[derive(Debug, Clone, Copy)]
pub struct Keyframe<T> {
    pub time: f32,
    pub value: T,
}

/// Values that can be blended between keyframes.
pub trait Interpolate: Copy {
    fn interpolate(a: Self, b: Self, t: f32) -> Self;
}

impl Interpolate for Vec3 {
    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        a.lerp(b, t)
    }
}

impl Interpolate for Quat {
    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        a.slerp(b, t)
    }
}

/// A time-sorted keyframe list with an interpolation mode.
#[derive(Debug, Clone)]
pub struct AnimationTrack<T: Interpolate> {
    pub keyframes: Vec<Keyframe<T>>,
    pub interpolation: Interpolation,
}

impl<T: Interpolate> AnimationTrack<T> {
    #[must_use]
    pub fn new(interpolation: Interpolation) -> Self {
        Self {
            keyframes: Vec::new(),
            interpolation,
        }
    }

    /// Builds a track from `(time, value)` pairs, sorting them by time.
    #[must_use]
    pub fn from_keyframes(
        keys: impl IntoIterator<Item = (f32, T)>,
        interpolation: Interpolation,
    ) -> Self {
        let mut keyframes: Vec<Keyframe<T>> = keys
            .into_iter()
            .map(|(time, value)| Keyframe { time, value })
            .collect();
        keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self {
            keyframes,
            interpolation,
        }
    }

    pub fn add_keyframe(&mut self, time: f32, value: T) {
        let at = self
            .keyframes
            .partition_point(|k| k.time <= time);
        self.keyframes.insert(at, Keyframe { time, value });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Time of the last keyframe, or zero for an empty track.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.keyframes.last().map_or(0.0, |k| k.time)
    }

    /// Samples the track at `time`.
    ///
    /// Before the first keyframe the first value is returned; after the
    /// last, the last value. In between, the enclosing keyframe pair is
    /// located by a linear scan and interpolated with the normalized
    /// offset. `Constant` holds the earlier keyframe; `Cubic` falls back
    /// to linear.
    #[must_use]
    pub fn sample(&self, time: f32) -> Option<T> {
        let first = self.keyframes.first()?;
        if time <= first.time {
            return Some(first.value);
        }
        let last = self.keyframes.last()?;
        if time >= last.time {
            return Some(last.value);
        }

        let mut index = 0;
        for (i, key) in self.keyframes.iter().enumerate() {
            if key.time <= time {
                index = i;
            } else {
                break;
            }
        }
        let k0 = &self.keyframes[index];
        let k1 = &self.keyframes[index + 1];

        match self.interpolation {
            Interpolation::Constant => Some(k0.value),
            Interpolation::Linear | Interpolation::Cubic => {
                let span = k1.time - k0.time;
                let u = if span > f32::EPSILON {
                    ((time - k0.time) / span).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                Some(T::interpolate(k0.value, k1.value, u))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position_track() -> AnimationTrack<Vec3> {
        AnimationTrack::from_keyframes(
            [
                (0.0, Vec3::ZERO),
                (1.0, Vec3::new(10.0, 0.0, 0.0)),
            ],
            Interpolation::Linear,
        )
    }

    #[test]
    fn linear_sampling_interpolates_and_clamps() {
        let track = position_track();
        assert_eq!(track.sample(0.5), Some(Vec3::new(5.0, 0.0, 0.0)));
        assert_eq!(track.sample(-1.0), Some(Vec3::ZERO));
        assert_eq!(track.sample(2.0), Some(Vec3::new(10.0, 0.0, 0.0)));
    }

    #[test]
    fn constant_holds_earlier_key() {
        let mut track = position_track();
        track.interpolation = Interpolation::Constant;
        assert_eq!(track.sample(0.99), Some(Vec3::ZERO));
        assert_eq!(track.sample(1.0), Some(Vec3::new(10.0, 0.0, 0.0)));
    }

    #[test]
    fn cubic_falls_back_to_linear() {
        let mut track = position_track();
        track.interpolation = Interpolation::Cubic;
        assert_eq!(track.sample(0.5), Some(Vec3::new(5.0, 0.0, 0.0)));
    }

    #[test]
    fn quaternion_track_slerps() {
        let track = AnimationTrack::from_keyframes(
            [
                (0.0, Quat::IDENTITY),
                (1.0, Quat::from_rotation_y(std::f32::consts::PI)),
            ],
            Interpolation::Linear,
        );
        let half = track.sample(0.5).unwrap();
        let rotated = half * Vec3::Z;
        assert!((rotated - Vec3::X).length() < 1e-3);
    }
}
