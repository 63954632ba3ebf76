// Technical indicators

use std::collections::VecDeque;

/// Simple Moving Average
pub struct SMA {
    period: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl SMA {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            values: VecDeque::with_capacity(period + 1),
            sum: 0.0,
        }
    }

    pub fn update(&mut self, value: f64) -> Option<f64> {
        self.values.push_back(value);
        self.sum += value;
        if self.values.len() > self.period {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
            }
        }
        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        if self.period > 0 && self.values.len() == self.period {
            Some(self.sum / self.period as f64)
        } else {
            None
        }
    }
}

/// Exponentially weighted mean with the recursive (non-adjusted) form:
/// `y0 = x0`, `y_t = (1 - alpha) * y_{t-1} + alpha * x_t`.
///
/// The recursion runs from the first observation, but no value is reported
/// until `min_periods` observations have been seen.
pub struct EWM {
    alpha: f64,
    min_periods: usize,
    current: Option<f64>,
    count: usize,
}

impl EWM {
    pub fn with_alpha(alpha: f64, min_periods: usize) -> Self {
        Self {
            alpha,
            min_periods,
            current: None,
            count: 0,
        }
    }

    /// `alpha = 2 / (span + 1)`, defined after `span` observations.
    pub fn with_span(span: usize) -> Self {
        Self::with_alpha(2.0 / (span as f64 + 1.0), span)
    }

    pub fn update(&mut self, value: f64) -> Option<f64> {
        self.count += 1;
        let next = match self.current {
            None => value,
            Some(prev) => prev + self.alpha * (value - prev),
        };
        self.current = Some(next);
        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        if self.count >= self.min_periods.max(1) {
            self.current
        } else {
            None
        }
    }
}

/// MACD (Moving Average Convergence Divergence)
pub struct MACD {
    fast_ema: EWM,
    slow_ema: EWM,
    signal_ema: EWM,
}

impl MACD {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        Self {
            fast_ema: EWM::with_span(fast),
            slow_ema: EWM::with_span(slow),
            signal_ema: EWM::with_span(signal),
        }
    }

    /// Feed a close; returns the histogram (MACD line minus signal line) once defined.
    ///
    /// The signal line only sees defined MACD values, so it is seeded by the
    /// first one and needs `signal` of them before it reports.
    pub fn update(&mut self, value: f64) -> Option<f64> {
        let fast_val = self.fast_ema.update(value);
        let slow_val = self.slow_ema.update(value);

        match (fast_val, slow_val) {
            (Some(f), Some(s)) => {
                let macd = f - s;
                self.signal_ema.update(macd).map(|sig| macd - sig)
            }
            _ => None,
        }
    }
}

/// RSI (Relative Strength Index) over exponentially smoothed gains and losses
/// with `alpha = 1 / period`.
///
/// The first close has no predecessor and contributes a zero gain and loss,
/// so the indicator is defined from the `period`-th close onward.
pub struct RSI {
    avg_gain: EWM,
    avg_loss: EWM,
    prev_value: Option<f64>,
}

impl RSI {
    pub fn new(period: usize) -> Self {
        let alpha = 1.0 / period.max(1) as f64;
        Self {
            avg_gain: EWM::with_alpha(alpha, period),
            avg_loss: EWM::with_alpha(alpha, period),
            prev_value: None,
        }
    }

    pub fn update(&mut self, value: f64) -> Option<f64> {
        let change = self.prev_value.map_or(0.0, |prev| value - prev);
        self.prev_value = Some(value);
        self.avg_gain.update(change.max(0.0));
        self.avg_loss.update((-change).max(0.0));
        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        match (self.avg_gain.value(), self.avg_loss.value()) {
            (Some(avg_gain), Some(avg_loss)) => {
                if avg_loss == 0.0 {
                    Some(100.0)
                } else {
                    let rs = avg_gain / avg_loss;
                    Some(100.0 - 100.0 / (1.0 + rs))
                }
            }
            _ => None,
        }
    }
}

/// Mean of the defined values an indicator produces over `closes`; NaN if none.
pub fn mean_defined<F>(closes: &[f64], mut step: F) -> f64
where
    F: FnMut(f64) -> Option<f64>,
{
    let (sum, n) = closes
        .iter()
        .filter_map(|&c| step(c))
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

/// Last defined SMA value over `closes`, if the series is long enough.
pub fn last_sma(closes: &[f64], period: usize) -> Option<f64> {
    let mut sma = SMA::new(period);
    closes.iter().fold(None, |_, &c| sma.update(c))
}


#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_sma_basic() {
        let mut sma = SMA::new(3);
        assert_eq!(sma.update(1.0), None);
        assert_eq!(sma.update(2.0), None);
        assert_eq!(sma.update(3.0), Some(2.0));
        assert_eq!(sma.update(4.0), Some(3.0));
        assert_eq!(sma.update(5.0), Some(4.0));
    }

    #[test]
    fn test_ewm_seeded_with_first_value() {
        // span 3: alpha 0.5, reported from the third value
        let mut ewm = EWM::with_span(3);
        assert_eq!(ewm.update(2.0), None);
        assert_eq!(ewm.update(4.0), None);
        // 2 -> 3 -> 4.5
        assert_abs_diff_eq!(ewm.update(6.0).unwrap(), 4.5, epsilon = 1e-12);
        assert_abs_diff_eq!(ewm.update(8.0).unwrap(), 6.25, epsilon = 1e-12);
    }

    #[test]
    fn test_rsi_all_gains() {
        let mut rsi = RSI::new(3);
        assert_eq!(rsi.update(1.0), None);
        assert_eq!(rsi.update(2.0), None);
        assert_abs_diff_eq!(rsi.update(3.0).unwrap(), 100.0, epsilon = 1e-10);
        assert_abs_diff_eq!(rsi.update(4.0).unwrap(), 100.0, epsilon = 1e-10);
    }

    #[test]
    fn test_rsi_first_change_counts_as_zero() {
        // alpha 0.5: gains 0, 1, 0 -> 0, 0.5, 0.25; losses 0, 0, 0.5 -> 0, 0, 0.25
        let mut rsi = RSI::new(2);
        assert_eq!(rsi.update(10.0), None);
        assert_abs_diff_eq!(rsi.update(11.0).unwrap(), 100.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rsi.update(10.5).unwrap(), 50.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rsi_defined_from_period_th_close() {
        let mut rsi = RSI::new(14);
        let out: Vec<Option<f64>> = (0..14).map(|i| rsi.update(100.0 + i as f64)).collect();
        assert!(out[..13].iter().all(Option::is_none));
        assert_eq!(out[13], Some(100.0));
    }

    #[test]
    fn test_macd_histogram_by_hand() {
        // fast span 2 (alpha 2/3), slow span 3 (alpha 1/2), signal span 2.
        // fast: 1, 5/3, 29/9, 173/27    slow: 1, 3/2, 11/4, 43/8
        // macd from the third close: 17/36, 223/216
        // signal: 17/36, then 17/36 + 2/3 * (223/216 - 17/36)
        let mut macd = MACD::new(2, 3, 2);
        assert_eq!(macd.update(1.0), None);
        assert_eq!(macd.update(2.0), None);
        assert_eq!(macd.update(4.0), None);
        assert_abs_diff_eq!(macd.update(8.0).unwrap(), 121.0 / 648.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mean_defined_and_last_sma() {
        let closes = [1.0, 2.0, 3.0, 4.0];
        let mut sma = SMA::new(2);
        // SMA(2) values: 1.5, 2.5, 3.5
        assert_abs_diff_eq!(mean_defined(&closes, |c| sma.update(c)), 2.5);
        assert_eq!(last_sma(&closes, 2), Some(3.5));
        assert_eq!(last_sma(&closes, 5), None);
        let mut never = SMA::new(10);
        assert!(mean_defined(&closes, |c| never.update(c)).is_nan());
    }
}
