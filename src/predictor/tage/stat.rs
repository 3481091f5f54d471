
/// Container for [`crate::TagePredictor`] runtime stats.
#[derive(Clone, Debug)]
pub struct TageStats {
    /// Number of conditional branch updates
    pub clk: usize,

    /// Correct predictions when the base component was the provider
    pub base_hits: usize,

    /// Misses when the base component was the provider
    pub base_miss: usize,

    /// Correct predictions from each tagged component (as the provider)
    pub comp_hits: Vec<usize>,

    /// Misses from each tagged component (as the provider)
    pub comp_miss: Vec<usize>,

    /// Number of times the alternate prediction overrode the provider
    pub alt_used: usize,

    /// Successful allocations
    pub alcs: usize,

    /// Allocations forced into an entry that was still useful
    pub forced_alcs: usize,

    /// Mispredictions from the longest-history component, where there is
    /// nowhere left to allocate
    pub failed_alcs: usize,

    /// Number of times all 'useful' counters were aged
    pub agings: usize,
}
impl TageStats {
    pub fn new(num_comp: usize) -> Self {
        Self {
            clk: 0,
            base_hits: 0,
            base_miss: 0,
            comp_hits: vec![0; num_comp],
            comp_miss: vec![0; num_comp],
            alt_used: 0,
            alcs: 0,
            forced_alcs: 0,
            failed_alcs: 0,
            agings: 0,
        }
    }
}
