//! Fixed-point currency amounts and the frozen reward split.

use super::TaskDomainError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Amount of currency in its smallest unit.
///
/// Serialized as a decimal string so values above `u64::MAX` survive JSON
/// round trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(u128);

impl Amount {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// One whole currency unit (10^18 smallest units).
    pub const UNIT: Self = Self(1_000_000_000_000_000_000);

    /// Creates an amount from smallest units.
    #[must_use]
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// Returns the value in smallest units.
    #[must_use]
    pub const fn value(self) -> u128 {
        self.0
    }

    /// Returns `true` when the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::AmountOverflow`] on overflow.
    pub const fn checked_add(self, other: Self) -> Result<Self, TaskDomainError> {
        match self.0.checked_add(other.0) {
            Some(value) => Ok(Self(value)),
            None => Err(TaskDomainError::AmountOverflow),
        }
    }

    /// Subtracts `other` from this amount.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::AmountOverflow`] when `other` is larger.
    pub const fn checked_sub(self, other: Self) -> Result<Self, TaskDomainError> {
        match self.0.checked_sub(other.0) {
            Some(value) => Ok(Self(value)),
            None => Err(TaskDomainError::AmountOverflow),
        }
    }

    /// Returns `percent` hundredths of this amount, rounded down.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::AmountOverflow`] when the intermediate
    /// product does not fit.
    pub const fn percent(self, percent: u128) -> Result<Self, TaskDomainError> {
        match self.0.checked_mul(percent) {
            Some(product) => match product.checked_div(100) {
                Some(value) => Ok(Self(value)),
                None => Err(TaskDomainError::AmountOverflow),
            },
            None => Err(TaskDomainError::AmountOverflow),
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<u128>()
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// Reward split frozen when a task is created.
///
/// `developer_reward + auditor_pool + protocol_fee == reward` holds exactly:
/// the fee and developer share round down and the auditor pool absorbs the
/// rounding remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSplit {
    reward: Amount,
    developer_reward: Amount,
    auditor_pool: Amount,
    protocol_fee: Amount,
}

impl RewardSplit {
    /// Share of the reward paid to the developer, in percent.
    pub const DEVELOPER_PERCENT: u128 = 67;
    /// Share of the reward reserved per auditor seat, in percent.
    pub const AUDITOR_SEAT_PERCENT: u128 = 10;
    /// Share of the reward skimmed to the treasury, in percent.
    pub const PROTOCOL_FEE_PERCENT: u128 = 3;

    /// Computes the split for an announced reward.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidReward`] for a zero reward and
    /// [`TaskDomainError::AmountOverflow`] when the reward is too large to
    /// take percentages of.
    pub fn from_reward(reward: Amount) -> Result<Self, TaskDomainError> {
        if reward.is_zero() {
            return Err(TaskDomainError::InvalidReward);
        }
        let protocol_fee = reward.percent(Self::PROTOCOL_FEE_PERCENT)?;
        let developer_reward = reward.percent(Self::DEVELOPER_PERCENT)?;
        let auditor_pool = reward
            .checked_sub(developer_reward)?
            .checked_sub(protocol_fee)?;
        Ok(Self {
            reward,
            developer_reward,
            auditor_pool,
            protocol_fee,
        })
    }

    /// Returns the announced reward.
    #[must_use]
    pub const fn reward(&self) -> Amount {
        self.reward
    }

    /// Returns the developer's share.
    #[must_use]
    pub const fn developer_reward(&self) -> Amount {
        self.developer_reward
    }

    /// Returns the pool shared by majority auditors.
    #[must_use]
    pub const fn auditor_pool(&self) -> Amount {
        self.auditor_pool
    }

    /// Returns the fee sent to the treasury at task start.
    #[must_use]
    pub const fn protocol_fee(&self) -> Amount {
        self.protocol_fee
    }

    /// Returns the amount an escrow holds once the fee is skimmed.
    ///
    /// # Errors
    ///
    /// Never fails for a split built by [`RewardSplit::from_reward`]; the
    /// checked subtraction guards deserialized values.
    pub const fn escrowed(&self) -> Result<Amount, TaskDomainError> {
        self.reward.checked_sub(self.protocol_fee)
    }

    /// Returns the pool share of the majority auditor at `position` when
    /// `majority_size` auditors share the pool.
    ///
    /// The remainder of an uneven division goes one unit at a time to the
    /// earliest positions, so the shares always sum to the whole pool.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::AmountOverflow`] when `majority_size` is
    /// zero or `position` is outside the majority.
    pub fn auditor_share(
        &self,
        majority_size: usize,
        position: usize,
    ) -> Result<Amount, TaskDomainError> {
        if position >= majority_size {
            return Err(TaskDomainError::AmountOverflow);
        }
        let divisor = u128::try_from(majority_size).map_err(|_| TaskDomainError::AmountOverflow)?;
        let index = u128::try_from(position).map_err(|_| TaskDomainError::AmountOverflow)?;
        let pool = self.auditor_pool.value();
        let base = pool
            .checked_div(divisor)
            .ok_or(TaskDomainError::AmountOverflow)?;
        let remainder = pool
            .checked_rem(divisor)
            .ok_or(TaskDomainError::AmountOverflow)?;
        let bonus = u128::from(index < remainder);
        base.checked_add(bonus)
            .map(Amount::new)
            .ok_or(TaskDomainError::AmountOverflow)
    }
}
