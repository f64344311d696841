/// Bid increment policy.
/// The minimum step a new bid must add on top of the current highest bid is a
/// tiered function of the current price. Tiers are configuration, not code:
/// they can be overridden via `INCREMENT_TIERS` (see `Config`).
// region:    --- Imports
use serde::{Deserialize, Serialize};
// endregion: --- Imports

// region:    --- IncrementPolicy

/// One tier: prices strictly below `upper_bound` use `step`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IncrementTier {
    pub upper_bound: i64,
    pub step: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncrementPolicy {
    /// Sorted ascending by upper_bound.
    tiers: Vec<IncrementTier>,
    /// Step applied at or above the last tier's bound.
    top_step: i64,
}

impl Default for IncrementPolicy {
    fn default() -> Self {
        Self {
            tiers: vec![
                IncrementTier { upper_bound: 100, step: 1 },
                IncrementTier { upper_bound: 1_000, step: 5 },
                IncrementTier { upper_bound: 10_000, step: 25 },
            ],
            top_step: 100,
        }
    }
}

impl IncrementPolicy {
    pub fn new(mut tiers: Vec<IncrementTier>, top_step: i64) -> Self {
        tiers.sort_by_key(|t| t.upper_bound);
        Self { tiers, top_step }
    }

    /// Minimum amount a new bid must exceed the current price by.
    pub fn increment(&self, current_price: i64) -> i64 {
        for tier in &self.tiers {
            if current_price < tier.upper_bound {
                return tier.step;
            }
        }
        self.top_step
    }

    /// Parses the `INCREMENT_TIERS` format: comma-separated `bound:step`
    /// entries followed by a final `:step` catch-all, e.g.
    /// `100:1,1000:5,10000:25,:100`.
    pub fn parse(spec: &str) -> Result<Self, String> {
        let mut tiers = Vec::new();
        let mut top_step = None;

        for entry in spec.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let (bound, step) = entry
                .split_once(':')
                .ok_or_else(|| format!("invalid tier entry: {entry}"))?;
            let step: i64 = step
                .trim()
                .parse()
                .map_err(|_| format!("invalid step in tier entry: {entry}"))?;
            if step < 1 {
                return Err(format!("tier step must be at least 1: {entry}"));
            }
            if bound.trim().is_empty() {
                top_step = Some(step);
            } else {
                let upper_bound: i64 = bound
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid bound in tier entry: {entry}"))?;
                tiers.push(IncrementTier { upper_bound, step });
            }
        }

        let top_step = top_step.ok_or_else(|| "missing catch-all `:step` entry".to_string())?;
        Ok(Self::new(tiers, top_step))
    }
}

// endregion: --- IncrementPolicy

// endregion: --- Tests
