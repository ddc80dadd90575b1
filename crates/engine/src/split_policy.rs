//! Split policy resolution.
//!
//! [`resolve`] turns a total amount, a [`SplitStrategy`] and the strategy
//! parameters into one amount per participant. It is a pure function: no
//! storage, no clock, same output for the same input.
//!
//! All strategies guarantee `sum(amounts) == total` exactly. Rounding drift is
//! spread over the participants, leftover units going to the earliest ones. A
//! participant with a zero percentage or weight never receives drift:
//!
//! ```rust
//! use engine::{MoneyCents, SplitParams, SplitStrategy, split_policy::resolve};
//!
//! let participants = vec!["a".to_string(), "b".to_string(), "c".to_string()];
//! let shares = resolve(
//!     MoneyCents::new(100),
//!     SplitStrategy::Equal,
//!     &participants,
//!     &SplitParams::None,
//! )
//! .unwrap();
//! let amounts: Vec<i64> = shares.iter().map(|(_, amount)| amount.cents()).collect();
//! assert_eq!(amounts, vec![34, 33, 33]);
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{EngineError, MoneyCents, ResultEngine};

/// 100% expressed in basis points.
pub const FULL_PERCENT_BPS: i64 = 10_000;

/// Accepted distance (in basis points) between the percentage total and 100%.
pub const PERCENT_TOLERANCE_BPS: i64 = 1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SplitStrategy {
    #[default]
    Equal,
    Percentage,
    Custom,
    Shares,
}

impl SplitStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "EQUAL",
            Self::Percentage => "PERCENTAGE",
            Self::Custom => "CUSTOM",
            Self::Shares => "SHARES",
        }
    }
}

impl TryFrom<&str> for SplitStrategy {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "EQUAL" => Ok(Self::Equal),
            "PERCENTAGE" => Ok(Self::Percentage),
            "CUSTOM" => Ok(Self::Custom),
            "SHARES" => Ok(Self::Shares),
            other => Err(EngineError::InvalidInput(format!(
                "invalid split strategy: {other}"
            ))),
        }
    }
}

/// One participant's parameter: basis points, minor units or a weight,
/// depending on the enclosing [`SplitParams`] variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portion {
    pub user_id: String,
    pub value: i64,
}

impl Portion {
    pub fn new(user_id: impl Into<String>, value: i64) -> Self {
        Self {
            user_id: user_id.into(),
            value,
        }
    }
}

/// Strategy specific parameters, persisted as the split expense custom rules.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "portions", rename_all = "snake_case")]
pub enum SplitParams {
    /// `EQUAL` takes no parameters.
    #[default]
    None,
    /// `PERCENTAGE`: basis points per participant, summing to 10000.
    Percentages(Vec<Portion>),
    /// `CUSTOM`: explicit minor-unit amounts, summing to the total.
    Amounts(Vec<Portion>),
    /// `SHARES`: integer weights.
    Weights(Vec<Portion>),
}

impl SplitParams {
    fn kind_name(&self) -> &'static str {
        match self {
            Self::None => "no",
            Self::Percentages(_) => "percentage",
            Self::Amounts(_) => "amount",
            Self::Weights(_) => "weight",
        }
    }
}

/// Splits `total` between `participants`.
///
/// The result keeps the participants order.
pub fn resolve(
    total: MoneyCents,
    strategy: SplitStrategy,
    participants: &[String],
    params: &SplitParams,
) -> ResultEngine<Vec<(String, MoneyCents)>> {
    if participants.is_empty() {
        return Err(EngineError::EmptyParticipants);
    }
    if !total.is_positive() {
        return Err(EngineError::InvalidAmount(
            "total amount must be > 0".to_string(),
        ));
    }
    let mut seen = HashSet::with_capacity(participants.len());
    for participant in participants {
        if !seen.insert(participant.as_str()) {
            return Err(EngineError::InvalidInput(format!(
                "duplicate participant: {participant}"
            )));
        }
    }

    let amounts = match (strategy, params) {
        (SplitStrategy::Equal, SplitParams::None) => split_equal(total, participants.len()),
        (SplitStrategy::Percentage, SplitParams::Percentages(portions)) => {
            let bps = portion_values(participants, portions)?;
            let sum: i128 = bps.iter().map(|v| i128::from(*v)).sum();
            if (sum - i128::from(FULL_PERCENT_BPS)).abs() > i128::from(PERCENT_TOLERANCE_BPS) {
                return Err(EngineError::InvalidPercentageTotal(
                    i64::try_from(sum).unwrap_or(i64::MAX),
                ));
            }
            split_weighted(total, &bps, i128::from(FULL_PERCENT_BPS))?
        }
        (SplitStrategy::Custom, SplitParams::Amounts(portions)) => {
            let amounts = portion_values(participants, portions)?;
            let sum: i128 = amounts.iter().map(|v| i128::from(*v)).sum();
            if sum != i128::from(total.cents()) {
                return Err(EngineError::SumMismatch {
                    expected: total,
                    actual: MoneyCents::new(i64::try_from(sum).unwrap_or(i64::MAX)),
                });
            }
            amounts.into_iter().map(MoneyCents::new).collect()
        }
        (SplitStrategy::Shares, SplitParams::Weights(portions)) => {
            let weights = portion_values(participants, portions)?;
            let sum: i128 = weights.iter().map(|v| i128::from(*v)).sum();
            if sum <= 0 {
                return Err(EngineError::StrategyParamsMismatch(
                    "total weight must be > 0".to_string(),
                ));
            }
            split_weighted(total, &weights, sum)?
        }
        (strategy, params) => {
            return Err(EngineError::StrategyParamsMismatch(format!(
                "{} split does not take {} parameters",
                strategy.as_str(),
                params.kind_name()
            )));
        }
    };

    Ok(participants.iter().cloned().zip(amounts).collect())
}

/// Maps portions onto the participants order, rejecting gaps, strangers,
/// duplicates and negative values.
fn portion_values(participants: &[String], portions: &[Portion]) -> ResultEngine<Vec<i64>> {
    let mut by_user: HashMap<&str, i64> = HashMap::with_capacity(portions.len());
    for portion in portions {
        if portion.value < 0 {
            return Err(EngineError::StrategyParamsMismatch(format!(
                "negative value for {}",
                portion.user_id
            )));
        }
        if by_user.insert(portion.user_id.as_str(), portion.value).is_some() {
            return Err(EngineError::StrategyParamsMismatch(format!(
                "duplicate value for {}",
                portion.user_id
            )));
        }
    }
    if by_user.len() != participants.len() {
        return Err(EngineError::StrategyParamsMismatch(format!(
            "expected {} values, got {}",
            participants.len(),
            by_user.len()
        )));
    }
    participants
        .iter()
        .map(|participant| {
            by_user.get(participant.as_str()).copied().ok_or_else(|| {
                EngineError::StrategyParamsMismatch(format!("missing value for {participant}"))
            })
        })
        .collect()
}

fn split_equal(total: MoneyCents, count: usize) -> Vec<MoneyCents> {
    let base = total.cents() / count as i64;
    let mut amounts = vec![base; count];
    absorb_drift(&mut amounts, &vec![true; count], total.cents());
    amounts.into_iter().map(MoneyCents::new).collect()
}

fn split_weighted(total: MoneyCents, weights: &[i64], denominator: i128) -> ResultEngine<Vec<MoneyCents>> {
    let overflow = || EngineError::InvalidAmount("amount too large".to_string());
    let mut amounts = weights
        .iter()
        .map(|weight| {
            total
                .mul_div_round(i128::from(*weight), denominator)
                .map(MoneyCents::cents)
                .ok_or_else(overflow)
        })
        .collect::<ResultEngine<Vec<i64>>>()?;
    let eligible: Vec<bool> = weights.iter().map(|weight| *weight > 0).collect();
    absorb_drift(&mut amounts, &eligible, total.cents());
    Ok(amounts.into_iter().map(MoneyCents::new).collect())
}

/// Spreads the rounding drift so the amounts sum to `total`.
///
/// A positive drift is shared evenly between the `eligible` participants, the
/// leftover units going to the earliest ones. A negative drift is taken back the
/// same way from the non zero amounts. Amounts never go below zero.
fn absorb_drift(amounts: &mut [i64], eligible: &[bool], total: i64) {
    let sum: i128 = amounts.iter().map(|v| i128::from(*v)).sum();
    let drift = i128::from(total) - sum;
    if drift > 0 {
        let takers: Vec<usize> = (0..amounts.len()).filter(|i| eligible[*i]).collect();
        if takers.is_empty() {
            return;
        }
        let count = takers.len() as i128;
        let (each, extra) = (drift / count, drift % count);
        for (rank, index) in takers.into_iter().enumerate() {
            let bump = each + i128::from((rank as i128) < extra);
            amounts[index] = (i128::from(amounts[index]) + bump) as i64;
        }
        return;
    }

    // Each round either clears the drift or empties at least one amount.
    let mut owed = -drift;
    while owed > 0 {
        let givers: Vec<usize> = (0..amounts.len()).filter(|i| amounts[*i] > 0).collect();
        if givers.is_empty() {
            break;
        }
        let count = givers.len() as i128;
        let (each, extra) = (owed / count, owed % count);
        for (rank, index) in givers.into_iter().enumerate() {
            let wanted = each + i128::from((rank as i128) < extra);
            let taken = wanted.min(i128::from(amounts[index]));
            amounts[index] -= taken as i64;
            owed -= taken;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn cents(shares: &[(String, MoneyCents)]) -> Vec<i64> {
        shares.iter().map(|(_, amount)| amount.cents()).collect()
    }

    #[test]
    fn equal_gives_remainder_to_first_participants() {
        let shares = resolve(
            MoneyCents::new(100),
            SplitStrategy::Equal,
            &users(&["a", "b", "c"]),
            &SplitParams::None,
        )
        .unwrap();
        assert_eq!(cents(&shares), vec![34, 33, 33]);
        assert_eq!(shares[0].0, "a");

        let shares = resolve(
            MoneyCents::new(200),
            SplitStrategy::Equal,
            &users(&["a", "b", "c"]),
            &SplitParams::None,
        )
        .unwrap();
        assert_eq!(cents(&shares), vec![67, 67, 66]);
    }

    #[test]
    fn equal_is_exact_and_within_one_unit() {
        for total in [1_i64, 7, 99, 100, 101, 1_000_003, 12_345_678] {
            for n in 1..=9_usize {
                let participants: Vec<String> = (0..n).map(|i| format!("u{i}")).collect();
                let shares = resolve(
                    MoneyCents::new(total),
                    SplitStrategy::Equal,
                    &participants,
                    &SplitParams::None,
                )
                .unwrap();
                let sum: MoneyCents = shares.iter().map(|(_, a)| *a).sum();
                assert_eq!(sum.cents(), total);
                let floor = total / n as i64;
                assert!(shares
                    .iter()
                    .all(|(_, a)| a.cents() == floor || a.cents() == floor + 1));
            }
        }
    }

    #[test]
    fn percentage_sums_exactly() {
        let params = SplitParams::Percentages(vec![
            Portion::new("a", 3_333),
            Portion::new("b", 3_333),
            Portion::new("c", 3_334),
        ]);
        let shares = resolve(
            MoneyCents::new(1_001),
            SplitStrategy::Percentage,
            &users(&["a", "b", "c"]),
            &params,
        )
        .unwrap();
        let sum: MoneyCents = shares.iter().map(|(_, a)| *a).sum();
        assert_eq!(sum, MoneyCents::new(1_001));
        // Each share rounds up to 334; the extra cent is taken back from "a".
        assert_eq!(cents(&shares), vec![333, 334, 334]);
    }

    #[test]
    fn percentage_accepts_tolerance_and_absorbs_drift() {
        // 9999 bps is within the 0.01% tolerance; the missing cent goes to "a".
        let params = SplitParams::Percentages(vec![
            Portion::new("a", 5_000),
            Portion::new("b", 4_999),
        ]);
        let shares = resolve(
            MoneyCents::new(10_000),
            SplitStrategy::Percentage,
            &users(&["a", "b"]),
            &params,
        )
        .unwrap();
        assert_eq!(cents(&shares), vec![5_001, 4_999]);
    }

    #[test]
    fn large_drift_is_spread_in_one_pass() {
        // 10001 bps over-allocates by total / 10000; it is taken back evenly.
        let params = SplitParams::Percentages(vec![
            Portion::new("a", 5_001),
            Portion::new("b", 5_000),
        ]);
        let shares = resolve(
            MoneyCents::new(10_000_000_000_000),
            SplitStrategy::Percentage,
            &users(&["a", "b"]),
            &params,
        )
        .unwrap();
        assert_eq!(cents(&shares), vec![5_000_500_000_000, 4_999_500_000_000]);

        let total = i64::MAX / 2;
        let shares = resolve(
            MoneyCents::new(total),
            SplitStrategy::Percentage,
            &users(&["a", "b"]),
            &params,
        )
        .unwrap();
        let sum: i128 = shares.iter().map(|(_, a)| i128::from(a.cents())).sum();
        assert_eq!(sum, i128::from(total));
        assert!(shares.iter().all(|(_, a)| a.cents() >= 0));
    }

    #[test]
    fn zero_percentage_gets_no_drift() {
        let params = SplitParams::Percentages(vec![
            Portion::new("a", 0),
            Portion::new("b", 3_334),
            Portion::new("c", 3_333),
            Portion::new("d", 3_333),
        ]);
        let shares = resolve(
            MoneyCents::new(10),
            SplitStrategy::Percentage,
            &users(&["a", "b", "c", "d"]),
            &params,
        )
        .unwrap();
        assert_eq!(cents(&shares), vec![0, 4, 3, 3]);
    }

    #[test]
    fn percentage_rejects_bad_total() {
        let params = SplitParams::Percentages(vec![
            Portion::new("a", 5_000),
            Portion::new("b", 4_000),
        ]);
        let err = resolve(
            MoneyCents::new(100),
            SplitStrategy::Percentage,
            &users(&["a", "b"]),
            &params,
        )
        .unwrap_err();
        assert_eq!(err, EngineError::InvalidPercentageTotal(9_000));
    }

    #[test]
    fn custom_requires_exact_sum() {
        let params = SplitParams::Amounts(vec![Portion::new("a", 60), Portion::new("b", 30)]);
        let err = resolve(
            MoneyCents::new(100),
            SplitStrategy::Custom,
            &users(&["a", "b"]),
            &params,
        )
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::SumMismatch {
                expected: MoneyCents::new(100),
                actual: MoneyCents::new(90),
            }
        );

        let params = SplitParams::Amounts(vec![Portion::new("b", 30), Portion::new("a", 70)]);
        let shares = resolve(
            MoneyCents::new(100),
            SplitStrategy::Custom,
            &users(&["a", "b"]),
            &params,
        )
        .unwrap();
        assert_eq!(cents(&shares), vec![70, 30]);
    }

    #[test]
    fn shares_split_by_weight() {
        let params = SplitParams::Weights(vec![
            Portion::new("a", 2),
            Portion::new("b", 1),
            Portion::new("c", 1),
        ]);
        let shares = resolve(
            MoneyCents::new(1_001),
            SplitStrategy::Shares,
            &users(&["a", "b", "c"]),
            &params,
        )
        .unwrap();
        let sum: MoneyCents = shares.iter().map(|(_, a)| *a).sum();
        assert_eq!(sum, MoneyCents::new(1_001));
        // 500.5 rounds up to 501, the two 250.25 round down: no drift left.
        assert_eq!(cents(&shares), vec![501, 250, 250]);
    }

    #[test]
    fn zero_weight_gets_no_drift() {
        let params = SplitParams::Weights(vec![
            Portion::new("a", 0),
            Portion::new("b", 3),
            Portion::new("c", 3),
            Portion::new("d", 3),
        ]);
        let shares = resolve(
            MoneyCents::new(10),
            SplitStrategy::Shares,
            &users(&["a", "b", "c", "d"]),
            &params,
        )
        .unwrap();
        assert_eq!(cents(&shares), vec![0, 4, 3, 3]);
    }

    #[test]
    fn zero_weights_are_rejected() {
        let params = SplitParams::Weights(vec![Portion::new("a", 0), Portion::new("b", 0)]);
        let err = resolve(
            MoneyCents::new(100),
            SplitStrategy::Shares,
            &users(&["a", "b"]),
            &params,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::StrategyParamsMismatch(_)));
    }

    #[test]
    fn params_must_match_strategy_and_participants() {
        let participants = users(&["a", "b"]);
        let err = resolve(
            MoneyCents::new(100),
            SplitStrategy::Custom,
            &participants,
            &SplitParams::None,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::StrategyParamsMismatch(_)));

        let err = resolve(
            MoneyCents::new(100),
            SplitStrategy::Equal,
            &participants,
            &SplitParams::Weights(vec![Portion::new("a", 1), Portion::new("b", 1)]),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::StrategyParamsMismatch(_)));

        let err = resolve(
            MoneyCents::new(100),
            SplitStrategy::Custom,
            &participants,
            &SplitParams::Amounts(vec![Portion::new("a", 50), Portion::new("z", 50)]),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::StrategyParamsMismatch(_)));

        let err = resolve(
            MoneyCents::new(100),
            SplitStrategy::Custom,
            &participants,
            &SplitParams::Amounts(vec![Portion::new("a", 150), Portion::new("b", -50)]),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::StrategyParamsMismatch(_)));
    }

    #[test]
    fn empty_and_duplicate_participants_are_rejected() {
        let err = resolve(
            MoneyCents::new(100),
            SplitStrategy::Equal,
            &[],
            &SplitParams::None,
        )
        .unwrap_err();
        assert_eq!(err, EngineError::EmptyParticipants);

        let err = resolve(
            MoneyCents::new(100),
            SplitStrategy::Equal,
            &users(&["a", "a"]),
            &SplitParams::None,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn resolve_is_deterministic() {
        let participants = users(&["a", "b", "c", "d"]);
        let params = SplitParams::Weights(vec![
            Portion::new("a", 3),
            Portion::new("b", 7),
            Portion::new("c", 11),
            Portion::new("d", 13),
        ]);
        let first = resolve(MoneyCents::new(9_999), SplitStrategy::Shares, &participants, &params)
            .unwrap();
        let second = resolve(MoneyCents::new(9_999), SplitStrategy::Shares, &participants, &params)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn strategy_round_trips_through_str() {
        for strategy in [
            SplitStrategy::Equal,
            SplitStrategy::Percentage,
            SplitStrategy::Custom,
            SplitStrategy::Shares,
        ] {
            assert_eq!(SplitStrategy::try_from(strategy.as_str()).unwrap(), strategy);
        }
        assert!(SplitStrategy::try_from("equal").is_err());
    }
}
