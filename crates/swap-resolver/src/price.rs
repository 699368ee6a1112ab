use async_trait::async_trait;
use swap_core::{SwapError, TokenSymbol, MAX_PRICE_DEVIATION};

/// External price source consulted by `validatePricing` (SPEC_FULL §4.4,
/// step 2). Implementations are free to quote from an oracle, a DEX pool, or
/// a fixed book for tests — the engine only needs the implied ratio.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Quoted units of `quote` per one unit of `base`.
    async fn ratio(&self, base: &TokenSymbol, quote: &TokenSymbol) -> Result<f64, SwapError>;
}

/// Checks a swap's implied ratio (`expected_amount / source_amount`) against
/// the oracle's quoted ratio, accepting deviation up to the smaller of
/// [`MAX_PRICE_DEVIATION`] and the swap's own `slippage_tolerance`.
pub async fn validate_pricing(
    oracle: &dyn PriceOracle,
    source_token: &TokenSymbol,
    target_token: &TokenSymbol,
    source_amount: u128,
    expected_amount: u128,
    slippage_tolerance: f64,
) -> Result<(), SwapError> {
    if source_amount == 0 {
        return Err(SwapError::ZeroAmount);
    }
    let implied = expected_amount as f64 / source_amount as f64;
    let quoted = oracle.ratio(source_token, target_token).await?;
    let deviation = ((implied - quoted) / quoted).abs();
    let band = MAX_PRICE_DEVIATION.min(slippage_tolerance.max(0.0));
    if deviation > band {
        return Err(SwapError::PriceUnreasonable { deviation });
    }
    Ok(())
}

/// A fixed-book oracle for tests and small deployments without a live feed.
pub struct FixedRatioOracle {
    ratio: f64,
}

impl FixedRatioOracle {
    pub fn new(ratio: f64) -> Self {
        Self { ratio }
    }
}

#[async_trait]
impl PriceOracle for FixedRatioOracle {
    async fn ratio(&self, _base: &TokenSymbol, _quote: &TokenSymbol) -> Result<f64, SwapError> {
        Ok(self.ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepts_price_within_band() {
        let oracle = FixedRatioOracle::new(1.0);
        validate_pricing(&oracle, &TokenSymbol("A".into()), &TokenSymbol("B".into()), 1000, 995, 0.05)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejects_price_outside_band() {
        let oracle = FixedRatioOracle::new(1.0);
        let err = validate_pricing(&oracle, &TokenSymbol("A".into()), &TokenSymbol("B".into()), 1000, 500, 0.05)
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::PriceUnreasonable { .. }));
    }
}
