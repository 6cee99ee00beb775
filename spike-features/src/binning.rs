use common::{Error, Result};
use nalgebra::DVector;

/// Relative tolerance when checking stimulus frame times for uniform spacing
const FRAME_INTERVAL_TOLERANCE: f64 = 1e-6;

/// Strictly increasing bin edges. `n + 1` edges delimit `n` half open bins `[e_i, e_i+1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct BinEdges(Vec<f64>);

impl BinEdges {
    /// Create bin edges, checking they are finite and strictly increasing
    pub fn new(edges: Vec<f64>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(Error::InvalidInput(format!(
                "need at least 2 bin edges, got {}",
                edges.len()
            )));
        }
        if edges.iter().any(|e| !e.is_finite()) {
            return Err(Error::InvalidInput("bin edges must be finite".to_string()));
        }
        if let Some(i) = edges.windows(2).position(|w| w[1] <= w[0]) {
            return Err(Error::InvalidInput(format!(
                "bin edges are not strictly increasing at index {}: {} -> {}",
                i,
                edges[i],
                edges[i + 1]
            )));
        }

        Ok(Self(edges))
    }

    /// Edges `i * dt` for `i` in `0..=num_bins`
    pub fn uniform(dt: f64, num_bins: usize) -> Result<Self> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(Error::InvalidInput(format!("bin width must be positive, got {}", dt)));
        }
        Self::new((0..=num_bins).map(|i| i as f64 * dt).collect())
    }

    /// Number of bins delimited by the edges
    #[inline(always)]
    pub fn num_bins(&self) -> usize {
        self.0.len() - 1
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Derive the sampling interval from stimulus frame timestamps.
/// Fails if the frames are not uniformly spaced.
pub fn frame_interval(frame_times: &[f64]) -> Result<f64> {
    if frame_times.len() < 2 {
        return Err(Error::InvalidInput(format!(
            "need at least 2 frame times to derive the frame interval, got {}",
            frame_times.len()
        )));
    }
    let n = frame_times.len();
    let dt = (frame_times[n - 1] - frame_times[0]) / (n - 1) as f64;
    if !dt.is_finite() || dt <= 0.0 {
        return Err(Error::InvalidInput(format!("invalid frame interval {}", dt)));
    }
    if let Some(i) = frame_times
        .windows(2)
        .position(|w| ((w[1] - w[0]) - dt).abs() > FRAME_INTERVAL_TOLERANCE * dt)
    {
        return Err(Error::InvalidInput(format!(
            "stimulus frames are not uniformly sampled: interval {} at frame {} vs mean {}",
            frame_times[i + 1] - frame_times[i],
            i,
            dt
        )));
    }

    Ok(dt)
}

/// Number of spikes observed in each bin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinnedSpikeCounts(Vec<u32>);

impl BinnedSpikeCounts {
    #[inline(always)]
    pub fn counts(&self) -> &[u32] {
        &self.0
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of binned spikes
    pub fn total(&self) -> u64 {
        self.0.iter().map(|c| *c as u64).sum()
    }

    /// The counts as regression targets
    pub fn to_targets(&self) -> DVector<f64> {
        DVector::from_iterator(self.0.len(), self.0.iter().map(|c| *c as f64))
    }
}

impl From<Vec<u32>> for BinnedSpikeCounts {
    fn from(counts: Vec<u32>) -> Self {
        Self(counts)
    }
}

/// Count the spikes falling into each bin.
/// Spikes before the first edge or at or beyond the last edge are dropped.
///
/// # Arguments:
/// spike_times: Non decreasing spike timestamps
/// edges: The bin edges, on the same time axis
pub fn bin_spikes(spike_times: &[f64], edges: &BinEdges) -> Result<BinnedSpikeCounts> {
    if spike_times.iter().any(|t| !t.is_finite()) {
        return Err(Error::InvalidInput("spike times must be finite".to_string()));
    }
    if let Some(i) = spike_times.windows(2).position(|w| w[1] < w[0]) {
        return Err(Error::InvalidInput(format!(
            "spike times are not sorted at index {}: {} -> {}",
            i,
            spike_times[i],
            spike_times[i + 1]
        )));
    }

    let e = edges.as_slice();
    let num_bins = edges.num_bins();
    let mut counts = vec![0_u32; num_bins];

    let first = spike_times.partition_point(|t| *t < e[0]);
    let mut bin = 0;
    for t in &spike_times[first..] {
        if *t >= e[num_bins] {
            break;
        }
        while *t >= e[bin + 1] {
            bin += 1;
        }
        counts[bin] += 1;
    }

    let counts = BinnedSpikeCounts(counts);
    debug!(
        "binned {} of {} spikes into {} bins",
        counts.total(),
        spike_times.len(),
        num_bins
    );

    Ok(counts)
}
