/// Result of a nearest-time lookup on a sorted time axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NearestSample {
    pub time: f64,
    pub index: usize,
}

impl NearestSample {
    /// `(time, index)` form with `(0.0, -1)` standing for "no data".
    pub fn to_sentinel(found: Option<NearestSample>) -> (f64, isize) {
        match found {
            Some(s) => (s.time, s.index as isize),
            None => (0.0, -1),
        }
    }
}

/// Finds the sample closest to `t` in an ascending time axis.
///
/// Queries before the first sample clamp to index 0 and queries at or past
/// the last sample clamp to the last index. Between two samples the strictly
/// closer one wins; an exact tie resolves to the lower index.
pub fn nearest(times: &[f64], t: f64) -> Option<NearestSample> {
    let last = times.len().checked_sub(1)?;
    let pos = times.partition_point(|&x| x < t);
    if pos == 0 {
        return Some(NearestSample {
            time: times[0],
            index: 0,
        });
    }
    if pos > last {
        return Some(NearestSample {
            time: times[last],
            index: last,
        });
    }
    let before = times[pos - 1];
    let after = times[pos];
    let index = if (after - t) < (t - before) { pos } else { pos - 1 };
    Some(NearestSample {
        time: times[index],
        index,
    })
}
