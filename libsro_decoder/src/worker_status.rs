/// Progress message sent from the processing thread to the UI
#[derive(Debug, Clone, Default)]
pub struct WorkerStatus {
    /// Fraction of the current file's events handled, 0.0 to 1.0
    pub progress: f32,
    /// Position of the current file in the configured input list
    pub file_index: usize,
    pub n_files: usize,
}

impl WorkerStatus {
    pub fn new(progress: f32, file_index: usize, n_files: usize) -> Self {
        Self {
            progress,
            file_index,
            n_files,
        }
    }

    /// Progress across the whole list of input files
    pub fn overall_progress(&self) -> f32 {
        if self.n_files == 0 {
            return 1.0;
        }
        (self.file_index as f32 + self.progress.clamp(0.0, 1.0)) / self.n_files as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_progress() {
        assert_eq!(WorkerStatus::new(0.5, 0, 2).overall_progress(), 0.25);
        assert_eq!(WorkerStatus::new(1.0, 1, 2).overall_progress(), 1.0);
        assert_eq!(WorkerStatus::new(0.0, 0, 0).overall_progress(), 1.0);
    }
}
