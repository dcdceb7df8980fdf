use crate::classify::DecisionLimits;

/// Ratio of two counts, defined as 0 when the denominator is 0.
pub fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Binary confusion counts against a single decision limit.
///
/// "Above the limit" is the positive condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Confusion {
    pub tp: u64,
    pub fn_: u64,
    pub tn: u64,
    pub fp: u64,
}

impl Confusion {
    pub fn add(&mut self, truth: bool, test: bool) {
        match (truth, test) {
            (true, true) => self.tp += 1,
            (true, false) => self.fn_ += 1,
            (false, false) => self.tn += 1,
            (false, true) => self.fp += 1,
        }
    }

    pub fn merge(&mut self, other: &Self) {
        self.tp += other.tp;
        self.fn_ += other.fn_;
        self.tn += other.tn;
        self.fp += other.fp;
    }

    pub fn total(&self) -> u64 {
        self.tp + self.fn_ + self.tn + self.fp
    }

    pub fn agreement(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    pub fn sensitivity(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn specificity(&self) -> f64 {
        ratio(self.tn, self.tn + self.fp)
    }
}

/// Comparison counts of one grid point.
///
/// Workers fill local tallies that are then combined with [`Tally::merge`],
/// an associative and commutative sum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    n_cmp: u64,
    n_match: u64,
    per_limit: Vec<Confusion>,
}

impl Tally {
    pub fn new(n_limits: usize) -> Self {
        Self {
            n_cmp: 0,
            n_match: 0,
            per_limit: vec![Confusion::default(); n_limits],
        }
    }

    /// Record one comparison of a true value with its simulated value.
    pub fn add(&mut self, limits: &DecisionLimits, truth: f64, simulated: f64) {
        self.n_cmp += 1;
        if limits.category(truth) == limits.category(simulated) {
            self.n_match += 1;
        }
        for (i_lim, confusion) in self.per_limit.iter_mut().enumerate() {
            confusion.add(limits.is_above(i_lim, truth), limits.is_above(i_lim, simulated));
        }
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.n_cmp += other.n_cmp;
        self.n_match += other.n_match;
        for (confusion, other) in self.per_limit.iter_mut().zip(&other.per_limit) {
            confusion.merge(other);
        }
        self
    }

    pub fn comparisons(&self) -> u64 {
        self.n_cmp
    }

    pub fn per_limit(&self) -> &[Confusion] {
        &self.per_limit
    }

    /// Fraction of comparisons whose full category matches.
    pub fn agreement(&self) -> f64 {
        ratio(self.n_match, self.n_cmp)
    }

    /// Confusion counts pooled over all decision limits.
    pub fn pooled(&self) -> Confusion {
        let mut pooled = Confusion::default();
        for confusion in &self.per_limit {
            pooled.merge(confusion);
        }
        pooled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_denominators_are_zero() {
        let confusion = Confusion::default();
        assert_eq!(confusion.agreement(), 0.0);
        assert_eq!(confusion.sensitivity(), 0.0);
        assert_eq!(confusion.specificity(), 0.0);
        assert_eq!(Tally::new(2).agreement(), 0.0);
    }

    #[test]
    fn confusion_rates() {
        let mut confusion = Confusion::default();
        for (truth, test) in [(true, true), (true, true), (true, false), (false, false), (false, true)] {
            confusion.add(truth, test);
        }
        assert_eq!(confusion.total(), 5);
        assert!((confusion.sensitivity() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(confusion.specificity(), 0.5);
        assert_eq!(confusion.agreement(), 0.6);
    }

    #[test]
    fn tally_counts_categories_and_limits() {
        let limits = DecisionLimits::new(&[5.0, 10.0]);
        let mut tally = Tally::new(limits.len());
        tally.add(&limits, 4.0, 4.5);
        tally.add(&limits, 6.0, 11.0);
        tally.add(&limits, 12.0, 9.0);
        tally.add(&limits, 5.0, 5.0);

        assert_eq!(tally.comparisons(), 4);
        assert_eq!(tally.agreement(), 0.5);

        let lower = tally.per_limit()[0];
        assert_eq!(lower, Confusion { tp: 2, fn_: 0, tn: 2, fp: 0 });
        let upper = tally.per_limit()[1];
        assert_eq!(upper, Confusion { tp: 0, fn_: 1, tn: 2, fp: 1 });

        let pooled = tally.pooled();
        assert_eq!(pooled, Confusion { tp: 2, fn_: 1, tn: 4, fp: 1 });
    }

    #[test]
    fn merge_matches_sequential_accumulation() {
        let limits = DecisionLimits::new(&[1.0, 2.0, 3.0]);
        let pairs = [(0.5, 1.5), (1.5, 1.5), (2.5, 3.5), (3.5, 0.5), (2.0, 2.1)];

        let mut whole = Tally::new(limits.len());
        for &(truth, simulated) in &pairs {
            whole.add(&limits, truth, simulated);
        }

        let mut left = Tally::new(limits.len());
        let mut right = Tally::new(limits.len());
        for &(truth, simulated) in &pairs[..2] {
            left.add(&limits, truth, simulated);
        }
        for &(truth, simulated) in &pairs[2..] {
            right.add(&limits, truth, simulated);
        }

        assert_eq!(right.clone().merge(left.clone()), whole);
        assert_eq!(left.merge(right), whole);
    }
}
