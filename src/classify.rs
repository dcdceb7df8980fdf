//! Classification against clinical decision limits.

/// Validated, strictly ascending set of decision limits.
///
/// `n` limits induce `n + 1` ordered categories. A value equal to a limit
/// lies at-or-below it.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionLimits {
    limits: Vec<f64>,
}

impl DecisionLimits {
    /// Wrap limits that were already checked to be strictly ascending.
    pub fn new(limits: &[f64]) -> Self {
        debug_assert!(limits.windows(2).all(|pair| pair[0] < pair[1]));
        Self {
            limits: limits.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.limits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.limits
    }

    /// Number of limits `val` strictly exceeds.
    pub fn category(&self, val: f64) -> usize {
        self.limits.partition_point(|&limit| limit < val)
    }

    /// Whether `val` lies above the limit `i_lim`.
    pub fn is_above(&self, i_lim: usize, val: f64) -> bool {
        val > self.limits[i_lim]
    }

    /// Labels of the limits, rendered with `decimal_places` decimals.
    pub fn names(&self, decimal_places: u32) -> Vec<String> {
        let prec = decimal_places as usize;
        self.limits
            .iter()
            .map(|limit| format!("{limit:.prec$}"))
            .collect()
    }
}
