/// A timeline of frame durations (seconds), either looping or one-shot.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    durations: Vec<f32>,
    looping: bool,
}

impl AnimationClip {
    /// Clip with one entry per frame, in seconds.
    pub fn new(durations: Vec<f32>, looping: bool) -> Self {
        AnimationClip { durations, looping }
    }

    /// `frames` frames of equal length.
    pub fn uniform(frames: usize, frame_time: f32, looping: bool) -> Self {
        Self::new(vec![frame_time; frames], looping)
    }

    /// Whether the clip wraps back to its first frame.
    pub fn looping(&self) -> bool {
        self.looping
    }

    /// Number of frames.
    pub fn frame_count(&self) -> usize {
        self.durations.len()
    }

    /// Length of one pass through the clip, in seconds.
    pub fn total(&self) -> f32 {
        self.durations.iter().sum()
    }

    /// Frame index shown `elapsed` seconds after the clip started.
    pub fn frame_at(&self, elapsed: f32) -> usize {
        let total = self.total();
        if self.durations.is_empty() || total <= 0.0 {
            return 0;
        }
        let mut t = if self.looping {
            elapsed.rem_euclid(total)
        } else {
            elapsed.max(0.0)
        };
        for (i, d) in self.durations.iter().enumerate() {
            if t < *d {
                return i;
            }
            t -= d;
        }
        self.durations.len() - 1
    }
}

/// Plays one clip at a time and counts restarts.
///
/// `cycle` increments every time a clip is (re)started from its first frame,
/// which is what attack damage is keyed on.
#[derive(Debug, Clone)]
pub struct Animator {
    clip: AnimationClip,
    elapsed: f32,
    cycle: u32,
}

impl Animator {
    /// Starts playing `clip` as cycle 0.
    pub fn new(clip: AnimationClip) -> Self {
        Animator {
            clip,
            elapsed: 0.0,
            cycle: 0,
        }
    }

    /// Restart from the first frame of `clip` and begin a new cycle.
    pub fn play(&mut self, clip: &AnimationClip) {
        self.clip = clip.clone();
        self.elapsed = 0.0;
        self.cycle = self.cycle.wrapping_add(1);
    }

    /// Move the playhead forward by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.elapsed += dt.max(0.0);
    }

    /// One-shot clips stop playing once their last frame has elapsed. Looping clips never stop.
    pub fn is_playing(&self) -> bool {
        self.clip.looping || self.elapsed < self.clip.total()
    }

    /// Frame index at the current playhead.
    pub fn frame(&self) -> usize {
        self.clip.frame_at(self.elapsed)
    }

    /// Number of restarts so far.
    pub fn cycle(&self) -> u32 {
        self.cycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looping_clip_wraps_around() {
        let clip = AnimationClip::new(vec![0.1, 0.2], true);
        assert_eq!(clip.frame_at(0.05), 0);
        assert_eq!(clip.frame_at(0.15), 1);
        assert_eq!(clip.frame_at(0.35), 0);
    }

    #[test]
    fn one_shot_clip_stops_on_last_frame() {
        let mut anim = Animator::new(AnimationClip::uniform(1, 1.0, true));
        anim.play(&AnimationClip::uniform(3, 0.1, false));
        assert_eq!(anim.cycle(), 1);
        anim.advance(0.25);
        assert!(anim.is_playing());
        assert_eq!(anim.frame(), 2);
        anim.advance(0.1);
        assert!(!anim.is_playing());
        assert_eq!(anim.frame(), 2);
    }
}
