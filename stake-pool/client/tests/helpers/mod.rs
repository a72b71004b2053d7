#![allow(dead_code)]

use {
    async_trait::async_trait,
    borsh::BorshSerialize,
    liquid_staking_client::{
        client::StakingClient,
        config::PoolConfig,
        error::StakingClientError,
        ledger::LedgerClient,
        program,
        state::{
            discriminator, AccountType, Access, Fee, StakePool, UserStatus, ValidatorListHeader,
            ValidatorStakeInfo,
        },
    },
    solana_program_test::{BanksClient, ProgramTest, ProgramTestContext},
    solana_sdk::{
        account::{Account as SolanaAccount, AccountSharedData},
        hash::Hash,
        native_token::LAMPORTS_PER_SOL,
        pubkey::Pubkey,
        signature::{Keypair, Signer},
        stake::{self, state::StakeStateV2},
        transaction::Transaction,
    },
    std::convert::TryInto,
};

pub const TOTAL_LAMPORTS: u64 = 100 * LAMPORTS_PER_SOL;
pub const POOL_TOKEN_SUPPLY: u64 = 95 * LAMPORTS_PER_SOL;

/// Ledger backed by a test bank
pub struct BanksLedger {
    banks_client: BanksClient,
    payer: Keypair,
    recent_blockhash: Hash,
}

impl BanksLedger {
    pub fn new(context: &ProgramTestContext) -> Self {
        Self {
            banks_client: context.banks_client.clone(),
            payer: context.payer.insecure_clone(),
            recent_blockhash: context.last_blockhash,
        }
    }
}

fn ledger_error(e: impl std::error::Error + Send + Sync + 'static) -> StakingClientError {
    StakingClientError::Ledger(Box::new(e))
}

#[async_trait]
impl LedgerClient for BanksLedger {
    async fn get_account_data(
        &self,
        address: &Pubkey,
    ) -> Result<Option<Vec<u8>>, StakingClientError> {
        let account = self
            .banks_client
            .clone()
            .get_account(*address)
            .await
            .map_err(ledger_error)?;
        Ok(account.map(|account| account.data))
    }

    async fn get_balance(&self, address: &Pubkey) -> Result<u64, StakingClientError> {
        self.banks_client
            .clone()
            .get_balance(*address)
            .await
            .map_err(ledger_error)
    }

    async fn get_stake_minimum_delegation(&self) -> Result<u64, StakingClientError> {
        let transaction = Transaction::new_signed_with_payer(
            &[stake::instruction::get_minimum_delegation()],
            Some(&self.payer.pubkey()),
            &[&self.payer],
            self.recent_blockhash,
        );
        let mut data = self
            .banks_client
            .clone()
            .simulate_transaction(transaction)
            .await
            .map_err(ledger_error)?
            .simulation_details
            .and_then(|details| details.return_data)
            .ok_or_else(|| StakingClientError::Ledger("no return data".into()))?
            .data;
        data.resize(8, 0);
        Ok(u64::from_le_bytes(data.try_into().unwrap()))
    }

    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, StakingClientError> {
        let rent = self
            .banks_client
            .clone()
            .get_rent()
            .await
            .map_err(ledger_error)?;
        Ok(rent.minimum_balance(data_len))
    }
}

pub fn program_test() -> ProgramTest {
    ProgramTest::default()
}

/// Accounts of a pool planted directly into the bank
pub struct PoolAccounts {
    pub config: PoolConfig,
    pub stake_pool: StakePool,
}

impl PoolAccounts {
    pub fn new() -> Self {
        let config = PoolConfig {
            stake_pool: Pubkey::new_unique(),
            ..PoolConfig::default()
        };
        let stake_pool = StakePool {
            account_type: AccountType::StakePool,
            validator_list: Pubkey::new_unique(),
            reserve_stake: Pubkey::new_unique(),
            pool_mint: Pubkey::new_unique(),
            manager_fee_account: Pubkey::new_unique(),
            token_program_id: spl_token::id(),
            total_lamports: TOTAL_LAMPORTS,
            pool_token_supply: POOL_TOKEN_SUPPLY,
            stake_withdrawal_fee: Fee {
                denominator: 10_000,
                numerator: 0,
            },
            ..StakePool::default()
        };
        Self { config, stake_pool }
    }

    pub fn plant_stake_pool(&self, context: &mut ProgramTestContext) {
        let mut data = self.stake_pool.try_to_vec().unwrap();
        // newer program versions carry more fields
        data.extend_from_slice(&[0; 64]);
        set_data(context, &self.config.stake_pool, program::id(), data);
    }

    pub fn plant_validator_list(
        &self,
        context: &mut ProgramTestContext,
        validators: &[ValidatorStakeInfo],
    ) {
        set_data(
            context,
            &self.stake_pool.validator_list,
            program::id(),
            validator_list_data(validators),
        );
    }

    /// Fund a validator's active and transient stake accounts
    pub fn plant_validator(
        &self,
        context: &mut ProgramTestContext,
        vote: &Pubkey,
        active_lamports: u64,
        transient_lamports: u64,
    ) {
        set_stake(context, &self.config.validator_stake_address(vote), active_lamports);
        set_stake(
            context,
            &self.config.transient_stake_address(vote),
            transient_lamports,
        );
    }

    pub fn plant_access(&self, context: &mut ProgramTestContext, access: &Access) {
        let mut data = discriminator("account:Access").to_vec();
        data.extend(access.try_to_vec().unwrap());
        set_data(
            context,
            &self.config.access_address(),
            self.config.staker_program_id,
            data,
        );
    }

    pub fn plant_user_status(
        &self,
        context: &mut ProgramTestContext,
        user: &Pubkey,
        status: &UserStatus,
    ) {
        let mut data = discriminator("account:UserStatus").to_vec();
        data.extend(status.try_to_vec().unwrap());
        set_data(
            context,
            &self.config.user_status_address(user),
            self.config.staker_program_id,
            data,
        );
    }

    pub fn client(&self, context: &ProgramTestContext) -> StakingClient<BanksLedger> {
        StakingClient::new(BanksLedger::new(context), self.config)
    }
}

pub fn set_data(context: &mut ProgramTestContext, address: &Pubkey, owner: Pubkey, data: Vec<u8>) {
    let account = SolanaAccount {
        lamports: LAMPORTS_PER_SOL,
        data,
        owner,
        executable: false,
        rent_epoch: 0,
    };
    context.set_account(address, &AccountSharedData::from(account));
}

pub fn set_stake(context: &mut ProgramTestContext, address: &Pubkey, lamports: u64) {
    if lamports == 0 {
        return;
    }
    let account = SolanaAccount {
        lamports,
        data: vec![0; StakeStateV2::size_of()],
        owner: stake::program::id(),
        executable: false,
        rent_epoch: 0,
    };
    context.set_account(address, &AccountSharedData::from(account));
}

pub fn validator(vote: Pubkey, active: u64, transient: u64) -> ValidatorStakeInfo {
    ValidatorStakeInfo {
        active_stake_lamports: active,
        transient_stake_lamports: transient,
        vote_account_address: vote,
        ..ValidatorStakeInfo::default()
    }
}

pub fn validator_list_data(validators: &[ValidatorStakeInfo]) -> Vec<u8> {
    let mut data = ValidatorListHeader {
        account_type: AccountType::ValidatorList,
        max_validators: validators.len() as u32,
    }
    .try_to_vec()
    .unwrap();
    data.extend_from_slice(&(validators.len() as u32).to_le_bytes());
    for validator in validators {
        data.extend(validator.try_to_vec().unwrap());
    }
    data
}

pub async fn min_lamports(client: &StakingClient<BanksLedger>) -> u64 {
    client.min_lamports_on_stake_account().await.unwrap()
}
