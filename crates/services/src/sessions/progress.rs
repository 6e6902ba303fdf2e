/// Aggregated view of attempt progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    /// Zero-based position of the exercise on screen.
    pub current_index: usize,
    pub elapsed_seconds: u64,
    pub is_complete: bool,
}
