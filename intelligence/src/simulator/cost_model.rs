//! USD cost formulas
//!
//! Pure and deterministic. Non-finite inputs are rejected as `InvalidInput`.

use crate::error::{OptimizationError, Result};

const GWEI: f64 = 1e-9;

/// Gas cost in USD of `gas_units` at `gas_price_gwei`
///
/// Inputs at or below zero yield a zero cost rather than an error.
pub fn gas_cost_usd(gas_units: f64, gas_price_gwei: f64, native_token_price_usd: f64) -> Result<f64> {
    ensure_finite("gasUnits", gas_units)?;
    ensure_finite("gasPriceGwei", gas_price_gwei)?;
    ensure_finite("nativeTokenPriceUSD", native_token_price_usd)?;

    if gas_units <= 0.0 || gas_price_gwei <= 0.0 || native_token_price_usd <= 0.0 {
        return Ok(0.0);
    }
    Ok(gas_units * gas_price_gwei * GWEI * native_token_price_usd)
}

/// Bridge fee in USD: flat fee plus a proportional fee in basis points
pub fn bridge_fee_usd(amount_usd: f64, base_fee_usd: f64, fee_bps: f64) -> Result<f64> {
    ensure_non_negative("amountUSD", amount_usd)?;
    ensure_non_negative("baseFeeUSD", base_fee_usd)?;
    ensure_non_negative("feeBPS", fee_bps)?;

    Ok(base_fee_usd + amount_usd * fee_bps / 10_000.0)
}

/// Estimated slippage cost in USD for a swap of `amount_usd`
pub fn slippage_cost_usd(amount_usd: f64, slippage_pct: f64) -> Result<f64> {
    ensure_non_negative("amountUSD", amount_usd)?;
    ensure_non_negative("slippagePct", slippage_pct)?;

    Ok(amount_usd * slippage_pct / 100.0)
}

fn ensure_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(OptimizationError::invalid_input(format!("{} must be finite, got {}", name, value)))
    }
}

fn ensure_non_negative(name: &str, value: f64) -> Result<()> {
    ensure_finite(name, value)?;
    if value < 0.0 {
        return Err(OptimizationError::invalid_input(format!(
            "{} must not be negative, got {}",
            name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_gas_cost() {
        // 150k gas at 60 gwei with ETH at $2000
        assert!(approx(gas_cost_usd(150_000.0, 60.0, 2000.0).unwrap(), 18.0));
        assert!(approx(gas_cost_usd(150_000.0, 0.1, 2000.0).unwrap(), 0.03));
    }

    #[test]
    fn test_gas_cost_clamps_non_positive_inputs() {
        assert_eq!(gas_cost_usd(0.0, 60.0, 2000.0).unwrap(), 0.0);
        assert_eq!(gas_cost_usd(150_000.0, -1.0, 2000.0).unwrap(), 0.0);
        assert_eq!(gas_cost_usd(150_000.0, 60.0, 0.0).unwrap(), 0.0);
    }

    #[test]
    fn test_non_finite_inputs_rejected() {
        assert!(matches!(
            gas_cost_usd(150_000.0, f64::NAN, 2000.0),
            Err(OptimizationError::InvalidInput(_))
        ));
        assert!(gas_cost_usd(f64::INFINITY, 1.0, 1.0).is_err());
        assert!(bridge_fee_usd(1000.0, f64::NAN, 10.0).is_err());
        assert!(slippage_cost_usd(f64::INFINITY, 0.5).is_err());
    }

    #[test]
    fn test_bridge_fee() {
        // $2 flat + 10 bps of $1000
        assert!(approx(bridge_fee_usd(1000.0, 2.0, 10.0).unwrap(), 3.0));
        assert!(approx(bridge_fee_usd(0.0, 2.0, 10.0).unwrap(), 2.0));
        assert!(bridge_fee_usd(1000.0, -2.0, 10.0).is_err());
    }

    #[test]
    fn test_slippage_cost() {
        assert!(approx(slippage_cost_usd(1000.0, 0.5).unwrap(), 5.0));
        assert_eq!(slippage_cost_usd(1000.0, 0.0).unwrap(), 0.0);
        assert!(slippage_cost_usd(1000.0, -0.5).is_err());
    }
}
