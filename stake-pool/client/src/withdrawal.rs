//! Withdrawal planning: share price and fee arithmetic, minimum amount
//! validation, and the choice of stake account a withdrawal splits from.
//!
//! Nothing here touches the network. Balances are fetched by
//! [`crate::client::StakingClient`] and passed in.

use {
    crate::{
        error::{StakingClientError, WithdrawalTooSmall},
        state::{Fee, StakePool, ValidatorStakeInfo},
    },
    log::info,
    solana_sdk::pubkey::Pubkey,
    std::fmt,
};

/// Fixed-point scale of [`SharePrice`]
pub const SHARE_PRICE_SCALE: u64 = 1_000_000_000;

/// Divide, rounding half away from zero, and narrow to `u64`.
fn div_round(numerator: u128, denominator: u128) -> Option<u64> {
    if denominator == 0 {
        return None;
    }
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    let quotient = if remainder >= denominator - remainder {
        quotient.checked_add(1)?
    } else {
        quotient
    };
    u64::try_from(quotient).ok()
}

/// Lamports per pool token, truncated to nine decimal places.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SharePrice {
    scaled: u128,
}

impl SharePrice {
    /// `floor(total_lamports * 1e9 / pool_token_supply) / 1e9`
    pub fn new(total_lamports: u64, pool_token_supply: u64) -> Result<Self, StakingClientError> {
        if pool_token_supply == 0 {
            return Err(StakingClientError::ZeroPoolTokenSupply);
        }
        let scaled = (total_lamports as u128)
            .checked_mul(SHARE_PRICE_SCALE as u128)
            .ok_or(StakingClientError::CalculationFailure)?
            / pool_token_supply as u128;
        Ok(Self { scaled })
    }

    /// Price multiplied by [`SHARE_PRICE_SCALE`]
    pub fn scaled(&self) -> u128 {
        self.scaled
    }

    /// Lamports the given pool tokens are worth, rounded to nearest
    pub fn pool_tokens_to_lamports(&self, pool_tokens: u64) -> Option<u64> {
        div_round(
            (pool_tokens as u128).checked_mul(self.scaled)?,
            SHARE_PRICE_SCALE as u128,
        )
    }

    /// Pool tokens the given lamports are worth, rounded to nearest.
    /// `None` if the price is zero.
    pub fn lamports_to_pool_tokens(&self, lamports: u64) -> Option<u64> {
        div_round(
            (lamports as u128).checked_mul(SHARE_PRICE_SCALE as u128)?,
            self.scaled,
        )
    }

    /// Pool tokens that burn into `lamports` after `fee` is taken, rounded
    /// once to nearest. `None` if the price is zero.
    pub fn lamports_with_fee_to_pool_tokens(&self, lamports: u64, fee: &Fee) -> Option<u64> {
        if fee.denominator == 0 {
            return self.lamports_to_pool_tokens(lamports);
        }
        let denominator = fee.denominator as u128;
        let numerator = (lamports as u128)
            .checked_mul(denominator.checked_add(fee.numerator as u128)?)?
            .checked_mul(SHARE_PRICE_SCALE as u128)?;
        div_round(numerator, denominator.checked_mul(self.scaled)?)
    }
}

impl fmt::Display for SharePrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = SHARE_PRICE_SCALE as u128;
        write!(f, "{}.{:09}", self.scaled / scale, self.scaled % scale)
    }
}

impl Fee {
    /// `amount * (1 + numerator / denominator)`, rounded to nearest.
    /// A zero denominator means no fee.
    pub fn apply_to(&self, amount: u64) -> Option<u64> {
        if self.denominator == 0 {
            return Some(amount);
        }
        let fee = div_round(
            amount as u128 * self.numerator as u128,
            self.denominator as u128,
        )?;
        amount.checked_add(fee)
    }

    /// Fee rate as a percentage, for display
    pub fn percent(&self) -> f64 {
        if self.denominator == 0 {
            0.0
        } else {
            self.numerator as f64 * 100.0 / self.denominator as f64
        }
    }
}

impl fmt::Display for Fee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({}%)",
            self.numerator,
            self.denominator,
            self.percent()
        )
    }
}

/// Smallest withdrawal, in lamports before fees, that leaves a valid stake
/// account behind. Saturates if the fee pushes it past `u64::MAX`.
pub fn minimum_withdrawal_lamports(min_lamports_on_stake_account: u64, withdrawal_fee: &Fee) -> u64 {
    withdrawal_fee
        .apply_to(min_lamports_on_stake_account)
        .unwrap_or(u64::MAX)
}

/// Reject withdrawals that can never leave a valid stake account behind.
/// Equality with the minimum is accepted.
pub fn validate_withdrawal_amount(
    expected_lamports: u64,
    min_lamports_on_stake_account: u64,
    withdrawal_fee: &Fee,
) -> Result<(), WithdrawalTooSmall> {
    let minimum_lamports =
        minimum_withdrawal_lamports(min_lamports_on_stake_account, withdrawal_fee);
    if expected_lamports < minimum_lamports {
        Err(WithdrawalTooSmall {
            expected_lamports,
            minimum_lamports,
            minimum_pool_tokens: None,
        })
    } else {
        Ok(())
    }
}

/// Everything known about one withdrawal before any stake account balance is read
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WithdrawalRequest {
    /// Validator the user asked to withdraw from
    pub vote_account_address: Pubkey,
    /// Pool tokens to burn
    pub pool_tokens: u64,
    /// Current exchange rate
    pub share_price: SharePrice,
    /// Lamports the pool tokens are worth at that rate
    pub expected_lamports: u64,
    /// Balance every stake account must keep
    pub min_lamports_on_stake_account: u64,
    /// Fee the pool charges on stake withdrawals
    pub withdrawal_fee: Fee,
}

impl WithdrawalRequest {
    /// Price `pool_tokens` against a stake pool snapshot
    pub fn new(
        stake_pool: &StakePool,
        vote_account_address: Pubkey,
        pool_tokens: u64,
        min_lamports_on_stake_account: u64,
    ) -> Result<Self, StakingClientError> {
        if pool_tokens == 0 {
            return Err(StakingClientError::InvalidAmount);
        }
        let share_price = stake_pool.share_price()?;
        let expected_lamports = share_price
            .pool_tokens_to_lamports(pool_tokens)
            .ok_or(StakingClientError::CalculationFailure)?;
        info!(
            "Share price {}: {} pool tokens are worth {} lamports",
            share_price, pool_tokens, expected_lamports
        );

        Ok(Self {
            vote_account_address,
            pool_tokens,
            share_price,
            expected_lamports,
            min_lamports_on_stake_account,
            withdrawal_fee: stake_pool.stake_withdrawal_fee,
        })
    }

    /// Check the request against the minimum withdrawal, reporting the
    /// minimum in pool tokens as well when it is too small
    pub fn validate(&self) -> Result<(), WithdrawalTooSmall> {
        validate_withdrawal_amount(
            self.expected_lamports,
            self.min_lamports_on_stake_account,
            &self.withdrawal_fee,
        )
        .map_err(|e| WithdrawalTooSmall {
            minimum_pool_tokens: self.share_price.lamports_to_pool_tokens(e.minimum_lamports),
            ..e
        })
    }

    fn covered_by(&self, balance: u64) -> bool {
        balance
            .checked_sub(self.min_lamports_on_stake_account)
            .map_or(false, |available| self.expected_lamports <= available)
    }

    fn above_minimum(&self, balance: u64) -> bool {
        balance > self.min_lamports_on_stake_account
    }
}

/// Which stake account a withdrawal splits from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StakeSource {
    /// The validator's active stake account
    Validator,
    /// The validator's transient stake account
    Transient,
    /// The pool's reserve stake account
    Reserve,
}

/// What the target validator's active stake account can provide
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidatorStakeAssessment {
    /// It covers the whole withdrawal
    Sufficient,
    /// It is above the minimum but holds less than the withdrawal. The request
    /// is not shrunk; the pool program caps what it pays out.
    Partial {
        /// Lamports above the minimum balance
        available_lamports: u64,
        /// Pool tokens, fee included, that would withdraw exactly that much
        max_pool_tokens: Option<u64>,
    },
    /// It is at or below the minimum balance
    AtMinimum,
}

/// Live balances of the candidate accounts, plus the pool's validator list
#[derive(Clone, Copy, Debug)]
pub struct CandidateBalances<'a> {
    /// Lamports on the target validator's active stake account
    pub validator_stake_lamports: u64,
    /// Lamports on the target validator's transient stake account
    pub transient_stake_lamports: u64,
    /// Every validator in the pool
    pub validators: &'a [ValidatorStakeInfo],
}

/// Decide whether the target validator's active stake account serves the
/// withdrawal on its own
pub fn assess_validator_stake(
    request: &WithdrawalRequest,
    validator_stake_lamports: u64,
) -> ValidatorStakeAssessment {
    if request.covered_by(validator_stake_lamports) {
        info!(
            "Validator stake account covers the withdrawal: expected {} balance {} minimum {}",
            request.expected_lamports,
            validator_stake_lamports,
            request.min_lamports_on_stake_account
        );
        return ValidatorStakeAssessment::Sufficient;
    }

    if !request.above_minimum(validator_stake_lamports) {
        return ValidatorStakeAssessment::AtMinimum;
    }

    let available_lamports = validator_stake_lamports - request.min_lamports_on_stake_account;
    let max_pool_tokens = request
        .share_price
        .lamports_with_fee_to_pool_tokens(available_lamports, &request.withdrawal_fee);
    info!(
        "Validator stake account must be drained first: balance {} available {} expected {} minimum {}",
        validator_stake_lamports,
        available_lamports,
        request.expected_lamports,
        request.min_lamports_on_stake_account
    );
    if let Some(max_pool_tokens) = max_pool_tokens {
        info!(
            "Largest withdrawal from this validator is {} pool tokens ({} lamports plus {} withdrawal fee)",
            max_pool_tokens, available_lamports, request.withdrawal_fee
        );
    }

    ValidatorStakeAssessment::Partial {
        available_lamports,
        max_pool_tokens,
    }
}

/// Choose the stake account to split for a withdrawal.
///
/// A transient account is only used once every validator's active stake is at
/// the minimum, and the reserve only once every transient stake is as well.
/// `None` means a higher tier still holds stake elsewhere and must be drained
/// first.
pub fn select_stake_account(
    request: &WithdrawalRequest,
    candidates: &CandidateBalances,
) -> Option<StakeSource> {
    match assess_validator_stake(request, candidates.validator_stake_lamports) {
        ValidatorStakeAssessment::Sufficient | ValidatorStakeAssessment::Partial { .. } => {
            return Some(StakeSource::Validator)
        }
        ValidatorStakeAssessment::AtMinimum => {}
    }

    let with_active_stake: Vec<_> = candidates
        .validators
        .iter()
        .filter(|validator| {
            validator.vote_account_address != request.vote_account_address
                && request.above_minimum(validator.active_stake_lamports)
        })
        .collect();
    if !with_active_stake.is_empty() {
        info!("Found validators with active stake, withdraw from these validators first:");
        for validator in with_active_stake {
            info!(
                "- validator {} active stake {} lamports",
                validator.vote_account_address, validator.active_stake_lamports
            );
        }
        return None;
    }
    info!("All validator stake accounts are at minimum balance");

    if request.covered_by(candidates.transient_stake_lamports) {
        info!("Withdrawing from the transient stake account");
        return Some(StakeSource::Transient);
    }

    let with_transient_stake: Vec<_> = candidates
        .validators
        .iter()
        .filter(|validator| request.above_minimum(validator.transient_stake_lamports))
        .collect();
    if !with_transient_stake.is_empty() {
        info!("Found validators with transient stake, withdraw from these validators first:");
        for validator in with_transient_stake {
            info!(
                "- validator {} transient stake {} lamports",
                validator.vote_account_address, validator.transient_stake_lamports
            );
        }
        return None;
    }
    info!("All transient stake accounts are at minimum balance, withdrawing from the reserve");

    Some(StakeSource::Reserve)
}
