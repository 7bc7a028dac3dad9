//! Peak detection on sampled curves
//!
//! A peak is a sample higher than both neighbours; a flat plateau counts once, at
//! its middle index. Candidates are then filtered by topographic prominence and by
//! their width at half prominence.

/// Filter thresholds for [`find_peaks`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakCriteria {
    /// Minimum prominence, in curve units
    pub min_prominence: f64,

    /// Minimum width at half prominence, in samples
    pub min_width: f64,
}

/// A detected peak with its measured shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub index: usize,
    pub prominence: f64,
    pub left_base: usize,
    pub right_base: usize,
    pub width: f64,
}

/// Indices of peaks in `data` meeting `criteria`, in increasing order
pub fn find_peaks(data: &[f64], criteria: PeakCriteria) -> Vec<usize> {
    analyze_peaks(data)
        .into_iter()
        .filter(|p| p.prominence >= criteria.min_prominence)
        .filter(|p| p.width >= criteria.min_width)
        .map(|p| p.index)
        .collect()
}

/// All local maxima of `data` with prominence and width measured
pub fn analyze_peaks(data: &[f64]) -> Vec<Peak> {
    local_maxima(data)
        .into_iter()
        .map(|index| {
            let (prominence, left_base, right_base) = prominence(data, index);
            let width = width_at_half_prominence(data, index, prominence, left_base, right_base);
            Peak {
                index,
                prominence,
                left_base,
                right_base,
                width,
            }
        })
        .collect()
}

/// Local maxima, excluding the first and last sample
pub fn local_maxima(data: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if data.len() < 3 {
        return peaks;
    }

    let last = data.len() - 1;
    let mut i = 1;
    while i < last {
        if data[i - 1] < data[i] {
            let mut ahead = i + 1;
            while ahead < last && data[ahead] == data[i] {
                ahead += 1;
            }
            if data[ahead] < data[i] {
                let left_edge = i;
                let right_edge = ahead - 1;
                peaks.push((left_edge + right_edge) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Prominence of the peak at `peak` and the indices of its left and right bases
fn prominence(data: &[f64], peak: usize) -> (f64, usize, usize) {
    let height = data[peak];

    let mut left_min = height;
    let mut left_base = peak;
    for i in (0..=peak).rev() {
        if data[i] > height {
            break;
        }
        if data[i] < left_min {
            left_min = data[i];
            left_base = i;
        }
    }

    let mut right_min = height;
    let mut right_base = peak;
    for (i, &value) in data.iter().enumerate().skip(peak) {
        if value > height {
            break;
        }
        if value < right_min {
            right_min = value;
            right_base = i;
        }
    }

    (height - left_min.max(right_min), left_base, right_base)
}

/// Interpolated width of the peak where the curve crosses `peak - prominence / 2`
fn width_at_half_prominence(
    data: &[f64],
    peak: usize,
    prominence: f64,
    left_base: usize,
    right_base: usize,
) -> f64 {
    let height = data[peak] - prominence * 0.5;

    let mut i = peak;
    while left_base < i && height < data[i] {
        i -= 1;
    }
    let mut left_ip = i as f64;
    if data[i] < height {
        left_ip += (height - data[i]) / (data[i + 1] - data[i]);
    }

    let mut i = peak;
    while i < right_base && height < data[i] {
        i += 1;
    }
    let mut right_ip = i as f64;
    if data[i] < height {
        right_ip -= (height - data[i]) / (data[i - 1] - data[i]);
    }

    right_ip - left_ip
}

#[cfg(test)]
mod tests {
    use super::*;

    const CRITERIA: PeakCriteria = PeakCriteria {
        min_prominence: 2.0,
        min_width: 1.0,
    };

    #[test]
    fn test_local_maxima_simple_and_plateau() {
        assert_eq!(local_maxima(&[0.0, 2.0, 0.0, 3.0, 3.0, 3.0, 1.0]), vec![1, 4]);
        // Plateau of even length picks the left middle
        assert_eq!(local_maxima(&[0.0, 5.0, 5.0, 0.0]), vec![1]);
        // Borders are never peaks
        assert!(local_maxima(&[5.0, 1.0, 0.0]).is_empty());
        // A plateau running into the border is not a peak
        assert!(local_maxima(&[0.0, 5.0, 5.0]).is_empty());
        assert!(local_maxima(&[1.0, 2.0]).is_empty());
    }

    #[test]
    fn test_prominence_uses_higher_base() {
        let data = [100.0, 120.0, 110.0, 130.0, 100.0];
        let peaks = analyze_peaks(&data);
        assert_eq!(peaks.len(), 2);

        assert_eq!(peaks[0].index, 1);
        assert!((peaks[0].prominence - 10.0).abs() < 1e-12);
        assert_eq!(peaks[0].left_base, 0);
        assert_eq!(peaks[0].right_base, 2);

        assert_eq!(peaks[1].index, 3);
        assert!((peaks[1].prominence - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_width_interpolation() {
        let data = [100.0, 120.0, 110.0, 130.0, 100.0];
        let peaks = analyze_peaks(&data);
        assert!((peaks[0].width - 0.75).abs() < 1e-12);
        assert!((peaks[1].width - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_find_peaks_filters() {
        let data = [100.0, 120.0, 110.0, 130.0, 100.0];
        assert_eq!(find_peaks(&data, CRITERIA), vec![3]);

        // Bumps smaller than the prominence threshold are ignored
        let data = [0.0, 1.0, 0.0, 1.5, 0.5, 1.0, 0.0];
        assert!(find_peaks(&data, CRITERIA).is_empty());
    }

    #[test]
    fn test_broad_hill_is_detected() {
        let data: Vec<f64> = (0..21)
            .map(|i| 100.0 - ((i as f64) - 10.0).powi(2) * 0.5)
            .collect();
        assert_eq!(find_peaks(&data, CRITERIA), vec![10]);
    }
}
