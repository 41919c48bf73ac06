//! The gas pricing escalation policy: a small pure-function module the Orchestrator
//! calls on every resubmission, unit-tested independently of it.

use ptx_types::app::GasPricing;
use ptx_types::error::PubTxError;

/// Gas pricing configuration, named directly after the node config's
/// `GasPrice.{increasePercentage, increaseMax, fixed, useNodeEstimate}` table.
#[derive(Clone, Debug, PartialEq)]
pub struct GasPriceConfig {
    /// Percentage bump applied per resubmission attempt (e.g. `12` for a
    /// ~12% escalation).
    pub increase_percentage: u64,
    /// The maximum total percentage increase allowed over the first
    /// attempt's price before escalation is refused.
    pub increase_max: u64,
    /// A fixed price to use instead of a node estimate, if set.
    pub fixed: Option<u128>,
    /// Whether to prefer the node's own fee estimate over `fixed` on the
    /// first attempt.
    pub use_node_estimate: bool,
}

impl Default for GasPriceConfig {
    fn default() -> Self {
        Self { increase_percentage: 12, increase_max: 100, fixed: None, use_node_estimate: true }
    }
}

/// The pricing strategy for a signer's very first submission attempt.
/// `node_estimate` is whatever a live RPC client's fee estimation returned;
/// callers using [`crate::rpc::MockEthRpcClient`] pass `None`.
pub fn initial_price(config: &GasPriceConfig, node_estimate: Option<u128>) -> GasPricing {
    let fee = if config.use_node_estimate {
        node_estimate.or(config.fixed)
    } else {
        config.fixed.or(node_estimate)
    };
    GasPricing::Eip1559 { max_fee_per_gas: fee, max_priority_fee_per_gas: fee.map(|f| f / 10) }
}

/// Escalates `previous` by `config.increase_percentage`, bounded by
/// `config.increase_max` over `first`. Returns
/// [`PubTxError::GasPriceExceededMax`] once the cap would be exceeded.
pub fn next_price(
    config: &GasPriceConfig,
    signer: impl std::fmt::Display,
    first: &GasPricing,
    previous: &GasPricing,
) -> Result<GasPricing, PubTxError> {
    let bump = |value: u128| -> Option<u128> {
        let bumped = value.saturating_mul(100 + config.increase_percentage as u128) / 100;
        let cap = base_of(first)?.saturating_mul(100 + config.increase_max as u128) / 100;
        if bumped > cap {
            None
        } else {
            Some(bumped)
        }
    };

    let exceeded = || PubTxError::GasPriceExceededMax { signer: signer.to_string() };

    match previous {
        GasPricing::Legacy { gas_price: Some(price) } => {
            Ok(GasPricing::Legacy { gas_price: Some(bump(*price).ok_or_else(exceeded)?) })
        }
        GasPricing::Eip1559 { max_fee_per_gas: Some(fee), max_priority_fee_per_gas: tip } => {
            let bumped_fee = bump(*fee).ok_or_else(exceeded)?;
            let bumped_tip = match tip {
                Some(t) => Some(bump(*t).ok_or_else(exceeded)?),
                None => None,
            };
            Ok(GasPricing::Eip1559 { max_fee_per_gas: Some(bumped_fee), max_priority_fee_per_gas: bumped_tip })
        }
        // Nothing concrete to escalate from (no price was ever set); keep
        // the previous strategy unchanged rather than guessing a base.
        other => Ok(other.clone()),
    }
}

fn base_of(pricing: &GasPricing) -> Option<u128> {
    match pricing {
        GasPricing::Legacy { gas_price } => *gas_price,
        GasPricing::Eip1559 { max_fee_per_gas, .. } => *max_fee_per_gas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_price_prefers_fixed_when_node_estimate_is_disabled() {
        let config = GasPriceConfig { use_node_estimate: false, fixed: Some(5_000), ..Default::default() };
        let pricing = initial_price(&config, Some(9_000));
        assert_eq!(pricing, GasPricing::Eip1559 { max_fee_per_gas: Some(5_000), max_priority_fee_per_gas: Some(500) });
    }

    #[test]
    fn next_price_escalates_legacy_pricing_by_the_configured_percentage() {
        let config = GasPriceConfig { increase_percentage: 10, increase_max: 100, ..Default::default() };
        let first = GasPricing::Legacy { gas_price: Some(1_000) };
        let next = next_price(&config, "0xabc", &first, &first).unwrap();
        assert_eq!(next, GasPricing::Legacy { gas_price: Some(1_100) });
    }

    #[test]
    fn next_price_refuses_to_escalate_past_the_configured_maximum() {
        let config = GasPriceConfig { increase_percentage: 50, increase_max: 20, ..Default::default() };
        let first = GasPricing::Legacy { gas_price: Some(1_000) };
        let err = next_price(&config, "0xabc", &first, &first).unwrap_err();
        assert_eq!(err.to_string(), PubTxError::GasPriceExceededMax { signer: "0xabc".into() }.to_string());
    }

    #[test]
    fn repeated_escalation_eventually_hits_the_cap() {
        let config = GasPriceConfig { increase_percentage: 25, increase_max: 60, ..Default::default() };
        let first = GasPricing::Eip1559 { max_fee_per_gas: Some(1_000), max_priority_fee_per_gas: Some(100) };
        let second = next_price(&config, "0xdef", &first, &first).expect("first bump should succeed");
        let result = next_price(&config, "0xdef", &first, &second);
        assert!(result.is_err(), "a second 25% bump should exceed a 60% cap");
    }
}
