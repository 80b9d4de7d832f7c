use crate::constants::*;
use crate::error::{SimError, SimResult};

/// Sizes and cost model of one simulated machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MmuConfig {
    pub page_size: usize,
    pub ram_bytes: usize,
    pub hit_cost: u64,
    pub fault_cost: u64,
}

impl MmuConfig {
    /// Number of RAM frames, `ram_bytes / page_size` rounded down.
    pub fn frame_count(&self) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        self.ram_bytes / self.page_size
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.page_size == 0 {
            return Err(SimError::Config("page size must be positive".to_string()));
        }
        if self.frame_count() == 0 {
            return Err(SimError::Config(format!(
                "RAM of {} bytes cannot hold a single {}-byte page",
                self.ram_bytes, self.page_size
            )));
        }
        Ok(())
    }
}

impl Default for MmuConfig {
    fn default() -> Self {
        MmuConfig {
            page_size: PAGE_SIZE,
            ram_bytes: RAM_SIZE,
            hit_cost: HIT_COST,
            fault_cost: FAULT_COST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_100_frames() {
        let config = MmuConfig::default();
        assert_eq!(config.frame_count(), 100);
        assert_eq!(config.frame_count(), NUM_FRAMES);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_tiny_ram() {
        let config = MmuConfig { ram_bytes: 1000, ..MmuConfig::default() };
        assert_eq!(config.frame_count(), 0);
        assert!(matches!(config.validate(), Err(SimError::Config(_))));

        let config = MmuConfig { page_size: 0, ..MmuConfig::default() };
        assert!(config.validate().is_err());
    }
}
