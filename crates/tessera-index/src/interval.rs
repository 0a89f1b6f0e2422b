/// Closed interval carrying a payload value.
#[derive(Debug, Clone)]
pub struct Interval<P, V> {
    pub min: P,
    pub max: P,
    pub value: V,
}

impl<P, V> Interval<P, V> {
    /// Creates an interval; callers guarantee `min <= max`.
    #[must_use]
    pub fn new(min: P, max: P, value: V) -> Self {
        Self { min, max, value }
    }
}

/// Immutable interval index over closed intervals.
///
/// Built once per view snapshot and never mutated, so a flat representation
/// sorted by interval start is enough: an overlap query prunes everything
/// starting past the query's upper bound and filters the rest by end point.
pub struct IntervalTree<P, V> {
    entries: Vec<Interval<P, V>>,
}

impl<P: Ord + Clone, V: Clone> IntervalTree<P, V> {
    /// Builds the index from intervals in any order.
    #[must_use]
    pub fn build(mut entries: Vec<Interval<P, V>>) -> Self {
        entries.sort_by(|a, b| a.min.cmp(&b.min).then_with(|| a.max.cmp(&b.max)));
        Self { entries }
    }

    /// Number of intervals in the index.
    #[must_use]
    pub fn interval_count(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Values of every interval overlapping the closed query interval
    /// `[min, max]`, boundaries inclusive.
    #[must_use]
    pub fn search_overlap(&self, min: &P, max: &P) -> Vec<V> {
        let end = self.entries.partition_point(|e| e.min <= *max);
        self.entries[..end]
            .iter()
            .filter(|e| e.max >= *min)
            .map(|e| e.value.clone())
            .collect()
    }

    /// Values of every interval whose end point reaches `min` or beyond,
    /// i.e. overlap with the half-open query `[min, +inf)`.
    #[must_use]
    pub fn search_from(&self, min: &P) -> Vec<V> {
        self.entries
            .iter()
            .filter(|e| e.max >= *min)
            .map(|e| e.value.clone())
            .collect()
    }

    /// Values of every interval starting at `max` or below, i.e. overlap
    /// with the half-open query `(-inf, max]`.
    #[must_use]
    pub fn search_to(&self, max: &P) -> Vec<V> {
        let end = self.entries.partition_point(|e| e.min <= *max);
        self.entries[..end].iter().map(|e| e.value.clone()).collect()
    }

    /// Values of all intervals.
    #[must_use]
    pub fn values(&self) -> Vec<V> {
        self.entries.iter().map(|e| e.value.clone()).collect()
    }
}
