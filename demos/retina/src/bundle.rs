use std::{fs::File, io::BufReader, path::Path};

use nanorand::{Rng, WyRand};
use serde::{Deserialize, Serialize};

use crate::RunError;

/// The recorded data: a stimulus, its frame times and the spike times of every unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct DataBundle {
    /// One stimulus sample per frame
    pub(crate) stimulus: Vec<f64>,
    /// Onset of each frame in seconds, uniformly spaced
    pub(crate) stimulus_times: Vec<f64>,
    /// Spike times in seconds, one sequence per recorded unit
    pub(crate) spike_times: Vec<Vec<f64>>,
}

impl DataBundle {
    /// Load the bundle from a json file
    pub(crate) fn load(path: &Path) -> Result<Self, RunError> {
        let f = File::open(path)?;
        let bundle: Self = serde_json::from_reader(BufReader::new(f))?;
        bundle.check()?;
        info!(
            "loaded {} frames and {} units from {}",
            bundle.stimulus.len(),
            bundle.spike_times.len(),
            path.display()
        );

        Ok(bundle)
    }

    fn check(&self) -> Result<(), RunError> {
        if self.stimulus.len() != self.stimulus_times.len() {
            return Err(RunError::Bundle(format!(
                "{} stimulus samples but {} frame times",
                self.stimulus.len(),
                self.stimulus_times.len()
            )));
        }
        if self.spike_times.is_empty() {
            return Err(RunError::Bundle("no units recorded".to_string()));
        }
        Ok(())
    }

    /// Simulate linear-nonlinear-poisson units driven by gaussian white noise.
    /// Each unit gets a biphasic filter with its own latency and polarity.
    ///
    /// # Arguments:
    /// seed: Optional seed for the Rng
    /// num_frames: Length of the stimulus
    /// dt: Frame interval in seconds
    /// num_units: Number of simulated units
    pub(crate) fn synthetic(seed: Option<u64>, num_frames: usize, dt: f64, num_units: usize) -> Self {
        let mut rng = match seed {
            Some(seed) => WyRand::new_seed(seed),
            None => WyRand::new(),
        };

        // sum of twelve uniforms, approximately standard normal
        let stimulus: Vec<f64> = (0..num_frames)
            .map(|_| (0..12).map(|_| rng.generate::<f64>()).sum::<f64>() - 6.0)
            .collect();
        let stimulus_times: Vec<f64> = (0..num_frames).map(|i| i as f64 * dt).collect();

        let spike_times = (0..num_units)
            .map(|u| {
                let filter = biphasic_filter(SYNTHETIC_FILTER_LEN, 1.5 + u as f64, u % 2 == 0);
                let mut times = Vec::new();
                for i in 0..num_frames {
                    let drive: f64 = filter
                        .iter()
                        .enumerate()
                        .filter(|(lag, _)| *lag <= i)
                        .map(|(lag, w)| w * stimulus[i - lag])
                        .sum();
                    let n = poisson_sample(&mut rng, (SYNTHETIC_CONSTANT + drive).exp());
                    let mut bin_spikes: Vec<f64> =
                        (0..n).map(|_| (i as f64 + rng.generate::<f64>()) * dt).collect();
                    bin_spikes.sort_by(|a, b| a.total_cmp(b));
                    times.extend(bin_spikes);
                }
                times
            })
            .collect::<Vec<Vec<f64>>>();
        info!(
            "simulated {} frames, spike counts per unit: {:?}",
            num_frames,
            spike_times.iter().map(|t| t.len()).collect::<Vec<usize>>()
        );

        Self {
            stimulus,
            stimulus_times,
            spike_times,
        }
    }
}

/// Log rate of the simulated units at zero stimulus, in spikes per frame
const SYNTHETIC_CONSTANT: f64 = -2.5;
/// Number of frames the simulated units integrate over
const SYNTHETIC_FILTER_LEN: usize = 20;

/// Filter weights indexed by lag, most recent frame first
fn biphasic_filter(len: usize, latency: f64, on: bool) -> Vec<f64> {
    let sign = if on { 1.0 } else { -1.0 };
    (0..len)
        .map(|lag| {
            let t = lag as f64 / latency;
            sign * 0.5 * t * (-t).exp() * (std::f64::consts::PI * t / 2.0).cos()
        })
        .collect()
}

/// Knuth's multiplication method, the rates here are small
fn poisson_sample(rng: &mut WyRand, rate: f64) -> usize {
    let limit = (-rate).exp();
    let mut k = 0;
    let mut p = rng.generate::<f64>();
    while p > limit {
        k += 1;
        p *= rng.generate::<f64>();
    }
    k
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_bundle_is_consistent() {
        let bundle = DataBundle::synthetic(Some(0), 2000, 0.01, 3);

        assert!(bundle.check().is_ok());
        assert_eq!(bundle.spike_times.len(), 3);
        for times in bundle.spike_times.iter() {
            assert!(!times.is_empty());
            assert!(times.windows(2).all(|w| w[0] <= w[1]));
            assert!(times.iter().all(|t| *t >= 0.0 && *t < 20.0));
        }
    }

    #[test]
    fn synthetic_bundle_is_reproducible() {
        assert_eq!(
            DataBundle::synthetic(Some(7), 500, 0.01, 2),
            DataBundle::synthetic(Some(7), 500, 0.01, 2)
        );
    }

    #[test]
    fn bundle_from_json() {
        let json = r#"{"stimulus": [0.0, 1.0], "stimulus_times": [0.0, 0.1], "spike_times": [[0.05], []]}"#;
        let bundle: DataBundle = serde_json::from_str(json).unwrap();

        assert!(bundle.check().is_ok());
        assert_eq!(bundle.spike_times[0], vec![0.05]);
    }

    #[test]
    fn bundle_length_mismatch() {
        let bundle = DataBundle {
            stimulus: vec![0.0; 3],
            stimulus_times: vec![0.0; 2],
            spike_times: vec![vec![]],
        };

        assert!(matches!(bundle.check(), Err(RunError::Bundle(_))));
    }
}
