//! Reads pool state from a ledger and plans withdrawals against it

use {
    crate::{
        config::PoolConfig,
        error::StakingClientError,
        ledger::LedgerClient,
        state::{
            decode_access, decode_stake_pool, decode_user_status, decode_validator_list, Access,
            StakePool, UserStatus, ValidatorList,
        },
        withdrawal::{
            assess_validator_stake, select_stake_account, CandidateBalances, StakeSource,
            ValidatorStakeAssessment, WithdrawalRequest,
        },
        MINIMUM_ACTIVE_STAKE,
    },
    log::{debug, info},
    solana_sdk::{pubkey::Pubkey, stake::state::StakeStateV2},
    spl_associated_token_account::get_associated_token_address_with_program_id,
};

/// Outcome of planning a withdrawal
#[derive(Clone, Debug, PartialEq)]
pub struct WithdrawalPlan {
    /// Pool snapshot the request was priced against
    pub stake_pool: StakePool,
    /// The priced request
    pub request: WithdrawalRequest,
    /// Chosen tier, `None` while a higher tier holds stake elsewhere
    pub source: Option<StakeSource>,
    /// Address of the chosen stake account
    pub stake_account: Option<Pubkey>,
}

/// Pool client over any [`LedgerClient`]
pub struct StakingClient<L> {
    ledger: L,
    config: PoolConfig,
}

impl<L: LedgerClient> StakingClient<L> {
    /// Create a client for the pool described by `config`
    pub fn new(ledger: L, config: PoolConfig) -> Self {
        Self { ledger, config }
    }

    /// Underlying ledger
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    async fn get_required_account(&self, address: &Pubkey) -> Result<Vec<u8>, StakingClientError> {
        self.ledger
            .get_account_data(address)
            .await?
            .ok_or(StakingClientError::AccountNotFound(*address))
    }

    /// Fetch and decode the stake pool account
    pub async fn fetch_stake_pool(&self) -> Result<StakePool, StakingClientError> {
        let data = self.get_required_account(&self.config.stake_pool).await?;
        decode_stake_pool(&data)
    }

    /// Fetch and decode a validator list account
    pub async fn fetch_validator_list(
        &self,
        validator_list_address: &Pubkey,
    ) -> Result<ValidatorList, StakingClientError> {
        let data = self.get_required_account(validator_list_address).await?;
        decode_validator_list(&data)
    }

    /// Balance a stake account must keep after a withdrawal: the larger of
    /// the minimum delegation and the minimum active stake, plus rent
    pub async fn min_lamports_on_stake_account(&self) -> Result<u64, StakingClientError> {
        let minimum_delegation = self.ledger.get_stake_minimum_delegation().await?;
        let rent_exemption = self
            .ledger
            .get_minimum_balance_for_rent_exemption(StakeStateV2::size_of())
            .await?;
        let minimum = minimum_delegation
            .max(MINIMUM_ACTIVE_STAKE)
            .checked_add(rent_exemption)
            .ok_or(StakingClientError::CalculationFailure)?;
        debug!(
            "Minimum stake account balance {} (delegation {} rent {})",
            minimum, minimum_delegation, rent_exemption
        );
        Ok(minimum)
    }

    async fn select_source(
        &self,
        stake_pool: &StakePool,
        request: &WithdrawalRequest,
    ) -> Result<Option<StakeSource>, StakingClientError> {
        let vote_account_address = &request.vote_account_address;
        let validator_stake_address = self.config.validator_stake_address(vote_account_address);
        let validator_stake_lamports = self.ledger.get_balance(&validator_stake_address).await?;
        debug!(
            "Validator stake account {} holds {} lamports",
            validator_stake_address, validator_stake_lamports
        );

        if assess_validator_stake(request, validator_stake_lamports)
            != ValidatorStakeAssessment::AtMinimum
        {
            return Ok(Some(StakeSource::Validator));
        }

        let validator_list = self
            .fetch_validator_list(&stake_pool.validator_list)
            .await?;
        let transient_stake_address = self.config.transient_stake_address(vote_account_address);
        let transient_stake_lamports = self.ledger.get_balance(&transient_stake_address).await?;
        debug!(
            "Transient stake account {} holds {} lamports",
            transient_stake_address, transient_stake_lamports
        );

        Ok(select_stake_account(
            request,
            &CandidateBalances {
                validator_stake_lamports,
                transient_stake_lamports,
                validators: &validator_list.validators,
            },
        ))
    }

    fn source_address(
        &self,
        stake_pool: &StakePool,
        vote_account_address: &Pubkey,
        source: StakeSource,
    ) -> Pubkey {
        match source {
            StakeSource::Validator => self.config.validator_stake_address(vote_account_address),
            StakeSource::Transient => self.config.transient_stake_address(vote_account_address),
            StakeSource::Reserve => stake_pool.reserve_stake,
        }
    }

    /// Choose the stake account a withdrawal of `pool_tokens` from
    /// `vote_account_address` should split from.
    ///
    /// `None` means a higher tier still holds stake on some validator and
    /// must be drained first.
    pub async fn select_withdrawal_account(
        &self,
        stake_pool: &StakePool,
        vote_account_address: &Pubkey,
        pool_tokens: u64,
    ) -> Result<Option<Pubkey>, StakingClientError> {
        let min_lamports = self.min_lamports_on_stake_account().await?;
        let request =
            WithdrawalRequest::new(stake_pool, *vote_account_address, pool_tokens, min_lamports)?;
        let source = self.select_source(stake_pool, &request).await?;
        Ok(source.map(|source| self.source_address(stake_pool, vote_account_address, source)))
    }

    /// Price, validate and route a withdrawal of `pool_tokens` from
    /// `vote_account_address`
    pub async fn plan_withdrawal(
        &self,
        vote_account_address: &Pubkey,
        pool_tokens: u64,
    ) -> Result<WithdrawalPlan, StakingClientError> {
        if pool_tokens == 0 {
            return Err(StakingClientError::InvalidAmount);
        }
        let stake_pool = self.fetch_stake_pool().await?;
        let min_lamports = self.min_lamports_on_stake_account().await?;
        let request =
            WithdrawalRequest::new(&stake_pool, *vote_account_address, pool_tokens, min_lamports)?;
        request.validate()?;

        let source = self.select_source(&stake_pool, &request).await?;
        let stake_account =
            source.map(|source| self.source_address(&stake_pool, vote_account_address, source));
        match stake_account {
            Some(stake_account) => info!("Withdrawing from stake account {}", stake_account),
            None => info!(
                "No stake account can serve this withdrawal yet, try again later or pick another validator"
            ),
        }

        Ok(WithdrawalPlan {
            stake_pool,
            request,
            source,
            stake_account,
        })
    }

    /// Fetch the staker program's access account
    pub async fn fetch_access(&self) -> Result<Access, StakingClientError> {
        let data = self
            .get_required_account(&self.config.access_address())
            .await?;
        decode_access(&data)
    }

    /// Whitelist status of `user`; a user without a status account has none
    pub async fn fetch_user_status(&self, user: &Pubkey) -> Result<UserStatus, StakingClientError> {
        match self
            .ledger
            .get_account_data(&self.config.user_status_address(user))
            .await?
        {
            Some(data) => decode_user_status(&data),
            None => Ok(UserStatus::default()),
        }
    }

    /// Whether `owner` already holds an associated account for the pool mint
    pub async fn pool_token_account_exists(
        &self,
        stake_pool: &StakePool,
        owner: &Pubkey,
    ) -> Result<bool, StakingClientError> {
        let address = get_associated_token_address_with_program_id(
            owner,
            &stake_pool.pool_mint,
            &stake_pool.token_program_id,
        );
        Ok(self.ledger.get_account_data(&address).await?.is_some())
    }
}
