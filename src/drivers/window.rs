use crate::drivers::buffer::ChannelBuffer;

/// Which part of the buffer is currently pushed to the plot surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WindowState {
    #[default]
    Idle,
    Materialized { lo: usize, hi: usize },
    /// Like `Materialized`, but the upper bound follows newly appended samples.
    LiveTailing { lo: usize, hi: usize },
}

impl WindowState {
    pub fn bounds(&self) -> Option<(usize, usize)> {
        match *self {
            WindowState::Idle => None,
            WindowState::Materialized { lo, hi } | WindowState::LiveTailing { lo, hi } => {
                Some((lo, hi))
            }
        }
    }

    pub fn is_tailing(&self) -> bool {
        matches!(self, WindowState::LiveTailing { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowPolicy {
    /// Samples fetched on each side of the visible range.
    pub cache_margin: usize,
    /// Bound movement (in samples) that forces a re-fetch.
    pub refetch_threshold: usize,
    /// Window span above which live appends shift the lower bound too.
    pub tail_shift_span: usize,
    /// Seconds between the visible upper bound and the newest sample that
    /// still counts as "at the live edge".
    pub follow_tolerance: f64,
}

impl WindowPolicy {
    pub const fn offline() -> Self {
        Self {
            cache_margin: 2000,
            refetch_threshold: 1000,
            tail_shift_span: 100,
            follow_tolerance: 0.5,
        }
    }

    pub const fn live() -> Self {
        Self {
            cache_margin: 800,
            refetch_threshold: 500,
            tail_shift_span: 100,
            follow_tolerance: 0.5,
        }
    }
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self::offline()
    }
}

#[derive(Clone, Debug)]
pub struct WindowManager {
    policy: WindowPolicy,
    state: WindowState,
    materializations: u64,
}

impl WindowManager {
    pub fn new(policy: WindowPolicy) -> Self {
        Self {
            policy,
            state: WindowState::Idle,
            materializations: 0,
        }
    }

    pub fn policy(&self) -> &WindowPolicy {
        &self.policy
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn bounds(&self) -> Option<(usize, usize)> {
        self.state.bounds()
    }

    /// Number of times a fresh slice was handed to the surface.
    pub fn materializations(&self) -> u64 {
        self.materializations
    }

    pub fn reset(&mut self) {
        self.state = WindowState::Idle;
    }

    /// Re-evaluates the window for a new visible time range.
    ///
    /// Returns the new bounds when a re-fetch is needed, `None` when the
    /// current materialization still covers the view. A window that no
    /// longer covers the view is always re-fetched.
    pub fn on_visible_range(
        &mut self,
        buffer: &ChannelBuffer,
        vlo: f64,
        vhi: f64,
    ) -> Option<(usize, usize)> {
        let last = match buffer.last_index() {
            Some(last) if vlo <= vhi => last,
            _ => {
                self.state = WindowState::Idle;
                return None;
            }
        };
        let first_visible = buffer.nearest(vlo)?.index;
        let last_visible = buffer.nearest(vhi)?.index;
        let lo = first_visible.saturating_sub(self.policy.cache_margin);
        let hi = last_visible.saturating_add(self.policy.cache_margin).min(last);

        let refetch = match self.state.bounds() {
            None => true,
            Some((loaded_lo, loaded_hi)) => {
                loaded_lo > first_visible
                    || loaded_hi < last_visible
                    || loaded_lo.abs_diff(lo) > self.policy.refetch_threshold
                    || loaded_hi.abs_diff(hi) > self.policy.refetch_threshold
                    || (last_visible == last && loaded_hi != hi)
            }
        };
        if !refetch {
            return None;
        }
        self.state = if self.state.is_tailing() {
            WindowState::LiveTailing { lo, hi }
        } else {
            WindowState::Materialized { lo, hi }
        };
        self.materializations += 1;
        log::debug!("materialized samples {lo}..={hi} of {}", last + 1);
        Some((lo, hi))
    }

    /// Whether the view counts as riding the live edge.
    ///
    /// `last_time` is the newest sample time before the append; an empty
    /// buffer always follows.
    pub fn should_follow(&self, last_time: Option<f64>, visible_hi: f64) -> bool {
        match last_time {
            None => true,
            Some(t) => (t - visible_hi).abs() < self.policy.follow_tolerance,
        }
    }

    /// Applies a live append. When `follow` is set the window tails the new
    /// last index, otherwise tailing is suspended and the bounds are kept.
    ///
    /// Returns the bounds when they changed.
    pub fn on_data_appended(&mut self, follow: bool, new_last: usize) -> Option<(usize, usize)> {
        if !follow {
            if let WindowState::LiveTailing { lo, hi } = self.state {
                self.state = WindowState::Materialized { lo, hi };
            }
            return None;
        }
        let (lo, hi) = match self.state.bounds() {
            None => {
                self.materializations += 1;
                (0, new_last)
            }
            Some((old_lo, old_hi)) => {
                let hi = new_last;
                let lo = if hi.saturating_sub(old_lo) > self.policy.tail_shift_span {
                    old_lo + hi.saturating_sub(old_hi)
                } else {
                    old_lo
                };
                (lo.min(hi), hi)
            }
        };
        let changed = self.state.bounds() != Some((lo, hi));
        self.state = WindowState::LiveTailing { lo, hi };
        changed.then_some((lo, hi))
    }
}

impl Default for WindowManager {
    fn default() -> Self {
        Self::new(WindowPolicy::default())
    }
}
