//! On-chain account layouts of the stake pool and staker programs

use {
    crate::{error::StakingClientError, withdrawal::SharePrice},
    borsh::{BorshDeserialize, BorshSerialize},
    log::warn,
    num_derive::FromPrimitive,
    num_traits::FromPrimitive,
    solana_sdk::{hash::hash, pubkey::Pubkey},
};

/// Byte length of the validator list header: type tag plus max validators
pub const VALIDATOR_LIST_HEADER_LEN: usize = 5;

/// Byte length of one packed `ValidatorStakeInfo`
pub const VALIDATOR_STAKE_INFO_LEN: usize = 73;

/// Length of an anchor account or instruction discriminator
pub const DISCRIMINATOR_LEN: usize = 8;

/// Enum representing the account type managed by the stake pool program
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub enum AccountType {
    /// If the account has not been initialized, the enum will be 0
    #[default]
    Uninitialized,
    /// Stake pool
    StakePool,
    /// Validator stake list
    ValidatorList,
}

/// Fee rate as a ratio, minted on deposits or charged on withdrawals
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct Fee {
    /// denominator of the fee ratio
    pub denominator: u64,
    /// numerator of the fee ratio
    pub numerator: u64,
}

/// Lockup applied to stake accounts created by the pool
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct Lockup {
    /// UnixTimestamp at which this stake will allow withdrawal
    pub unix_timestamp: i64,
    /// epoch height at which this stake will allow withdrawal
    pub epoch: u64,
    /// custodian signature on a transaction exempts the operation from lockup
    pub custodian: Pubkey,
}

/// Initialized stake pool state.
///
/// Newer program versions append fields; decoding reads this prefix and
/// ignores the rest of the account.
#[derive(Clone, Debug, Default, PartialEq, BorshDeserialize, BorshSerialize)]
pub struct StakePool {
    /// Account type, must be StakePool currently
    pub account_type: AccountType,
    /// Manager authority, allows for updating the staker, manager, and fee account
    pub manager: Pubkey,
    /// Staker authority, allows for adding and removing validators, and managing stake
    /// distribution
    pub staker: Pubkey,
    /// Stake deposit authority
    pub stake_deposit_authority: Pubkey,
    /// Stake withdrawal authority bump seed
    pub stake_withdraw_bump_seed: u8,
    /// Validator stake list storage account
    pub validator_list: Pubkey,
    /// Reserve stake account, holds deactivated stake
    pub reserve_stake: Pubkey,
    /// Pool Mint
    pub pool_mint: Pubkey,
    /// Manager fee account
    pub manager_fee_account: Pubkey,
    /// Pool token program id
    pub token_program_id: Pubkey,
    /// Total stake under management
    pub total_lamports: u64,
    /// Total supply of pool tokens
    pub pool_token_supply: u64,
    /// Last epoch the `total_lamports` field was updated
    pub last_update_epoch: u64,
    /// Lockup that all stakes in the pool must have
    pub lockup: Lockup,
    /// Fee taken as a proportion of rewards each epoch
    pub epoch_fee: Fee,
    /// Fee for next epoch
    pub next_epoch_fee: Option<Fee>,
    /// Preferred deposit validator vote account pubkey
    pub preferred_deposit_validator_vote_address: Option<Pubkey>,
    /// Preferred withdraw validator vote account pubkey
    pub preferred_withdraw_validator_vote_address: Option<Pubkey>,
    /// Fee assessed on stake deposits
    pub stake_deposit_fee: Fee,
    /// Fee assessed on withdrawals
    pub stake_withdrawal_fee: Fee,
    /// Future stake withdrawal fee, to be set for the following epoch
    pub next_stake_withdrawal_fee: Option<Fee>,
    /// Fees paid out to referrers on referred stake deposits
    pub stake_referral_fee: u8,
    /// Toggles whether the `DepositSol` instruction requires a signature from
    /// this `sol_deposit_authority`
    pub sol_deposit_authority: Option<Pubkey>,
    /// Fee assessed on SOL deposits
    pub sol_deposit_fee: Fee,
    /// Fees paid out to referrers on referred SOL deposits
    pub sol_referral_fee: u8,
    /// Toggles whether the `WithdrawSol` instruction requires a signature from
    /// the `sol_withdraw_authority`
    pub sol_withdraw_authority: Option<Pubkey>,
    /// Fee assessed on SOL withdrawals
    pub sol_withdrawal_fee: Fee,
    /// Future SOL withdrawal fee, to be set for the following epoch
    pub next_sol_withdrawal_fee: Option<Fee>,
    /// Last epoch's total pool tokens, used only for APR estimation
    pub last_epoch_pool_token_supply: u64,
    /// Last epoch's total lamports, used only for APR estimation
    pub last_epoch_total_lamports: u64,
}

impl StakePool {
    /// Exchange rate from pool tokens to lamports
    pub fn share_price(&self) -> Result<SharePrice, StakingClientError> {
        SharePrice::new(self.total_lamports, self.pool_token_supply)
    }
}

/// Status of the stake account in the validator list, for accounting
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
pub enum StakeStatus {
    /// Stake account is active, there may be a transient stake as well
    Active,
    /// Only transient stake account exists, when a transient stake is
    /// deactivating during validator removal
    DeactivatingTransient,
    /// No more validator stake accounts exist, entry ready for removal
    ReadyForRemoval,
    /// Only the validator stake account is deactivating, no transient stake
    /// account exists
    DeactivatingValidator,
    /// Both the transient and validator stake account are deactivating
    DeactivatingAll,
}

/// Header of the validator list account
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct ValidatorListHeader {
    /// Account type, must be ValidatorList currently
    pub account_type: AccountType,
    /// Maximum allowable number of validators
    pub max_validators: u32,
}

/// Information about a validator in the pool
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct ValidatorStakeInfo {
    /// Amount of lamports on the validator stake account, including rent
    pub active_stake_lamports: u64,
    /// Amount of transient stake delegated to this validator
    pub transient_stake_lamports: u64,
    /// Last epoch the active and transient stake lamports fields were updated
    pub last_update_epoch: u64,
    /// Transient account seed suffix
    pub transient_seed_suffix: u64,
    /// Unused space, initially meant to specify the end of seed suffixes
    pub unused: u32,
    /// Validator account seed suffix
    pub validator_seed_suffix: u32,
    /// Status of the validator stake account
    pub status: u8,
    /// Validator vote account address
    pub vote_account_address: Pubkey,
}

impl ValidatorStakeInfo {
    /// Decoded status, `None` for values newer than this client
    pub fn stake_status(&self) -> Option<StakeStatus> {
        StakeStatus::from_u8(self.status)
    }
}

/// The validators of a pool, without empty slots
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidatorList {
    /// Data outside of the validator list, separated out for cheaper deserializations
    pub header: ValidatorListHeader,
    /// List of stake info for each validator in the pool
    pub validators: Vec<ValidatorStakeInfo>,
}

impl ValidatorList {
    /// Entry for a vote account, if the pool tracks it
    pub fn find(&self, vote_account_address: &Pubkey) -> Option<&ValidatorStakeInfo> {
        self.validators
            .iter()
            .find(|validator| validator.vote_account_address == *vote_account_address)
    }
}

/// Permission state of the staker program
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct Access {
    /// Owner of the staker program
    pub owner: Pubkey,
    /// Account holding the pool's staker authority
    pub stake_manager: Pubkey,
    /// Whether deposits are paused
    pub is_paused: bool,
    /// Owner nominated to take over, until claimed
    pub pending_owner: Option<Pubkey>,
}

/// Whitelist status of a user
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub enum WhitelistUserStatus {
    /// Never whitelisted, or cleared
    #[default]
    None,
    /// Allowed to deposit
    Whitelisted,
    /// Barred from depositing
    Blacklisted,
}

/// Whitelist record of one user
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct UserStatus {
    /// Current status
    pub status: WhitelistUserStatus,
}

/// First eight bytes of the sha256 of `preimage`, as anchor prefixes
/// accounts (`account:<Name>`) and instructions (`global:<name>`)
pub fn discriminator(preimage: &str) -> [u8; DISCRIMINATOR_LEN] {
    let mut discriminator = [0; DISCRIMINATOR_LEN];
    discriminator.copy_from_slice(&hash(preimage.as_bytes()).to_bytes()[..DISCRIMINATOR_LEN]);
    discriminator
}

fn decode_error(account: &'static str, reason: impl ToString) -> StakingClientError {
    StakingClientError::Decode {
        account,
        reason: reason.to_string(),
    }
}

/// Deserialize the stake pool from account data. Bytes past the known layout
/// are ignored.
pub fn decode_stake_pool(data: &[u8]) -> Result<StakePool, StakingClientError> {
    let stake_pool =
        StakePool::deserialize(&mut &data[..]).map_err(|e| decode_error("stake pool", e))?;
    if stake_pool.account_type != AccountType::StakePool {
        return Err(decode_error(
            "stake pool",
            format!("unexpected account type {:?}", stake_pool.account_type),
        ));
    }
    Ok(stake_pool)
}

/// Deserialize the validator list from account data.
///
/// Decoding stops at the last complete record if the declared length runs
/// past the end of the buffer, and entries with a default vote account are
/// skipped.
pub fn decode_validator_list(data: &[u8]) -> Result<ValidatorList, StakingClientError> {
    let records_start = VALIDATOR_LIST_HEADER_LEN + 4;
    if data.len() < records_start {
        return Err(decode_error(
            "validator list",
            format!("{} bytes is shorter than the header", data.len()),
        ));
    }

    let header = ValidatorListHeader::deserialize(&mut &data[..VALIDATOR_LIST_HEADER_LEN])
        .map_err(|e| decode_error("validator list", e))?;
    if header.account_type != AccountType::ValidatorList {
        return Err(decode_error(
            "validator list",
            format!("unexpected account type {:?}", header.account_type),
        ));
    }

    let mut len = [0; 4];
    len.copy_from_slice(&data[VALIDATOR_LIST_HEADER_LEN..records_start]);
    let len = u32::from_le_bytes(len) as usize;

    let records = &data[records_start..];
    let available = records.len() / VALIDATOR_STAKE_INFO_LEN;
    if available < len {
        warn!(
            "Validator list declares {} entries but holds {}, ignoring the rest",
            len, available
        );
    }

    let mut validators = Vec::with_capacity(len.min(available));
    for mut record in records.chunks_exact(VALIDATOR_STAKE_INFO_LEN).take(len) {
        let validator = ValidatorStakeInfo::deserialize(&mut record)
            .map_err(|e| decode_error("validator list", e))?;
        if validator.vote_account_address != Pubkey::default() {
            validators.push(validator);
        }
    }

    Ok(ValidatorList { header, validators })
}

fn decode_anchor_account<T: BorshDeserialize>(
    account: &'static str,
    name: &str,
    data: &[u8],
) -> Result<T, StakingClientError> {
    if data.len() < DISCRIMINATOR_LEN {
        return Err(decode_error(account, "missing discriminator"));
    }
    let (prefix, mut body) = data.split_at(DISCRIMINATOR_LEN);
    if prefix != discriminator(&format!("account:{}", name)) {
        return Err(decode_error(account, "discriminator mismatch"));
    }
    T::deserialize(&mut body).map_err(|e| decode_error(account, e))
}

/// Deserialize the staker program's access account.
pub fn decode_access(data: &[u8]) -> Result<Access, StakingClientError> {
    decode_anchor_account("access", "Access", data)
}

/// Deserialize a user's whitelist status account.
pub fn decode_user_status(data: &[u8]) -> Result<UserStatus, StakingClientError> {
    decode_anchor_account("user status", "UserStatus", data)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn assert_decode_error<T: std::fmt::Debug>(result: Result<T, StakingClientError>) {
        match result {
            Err(StakingClientError::Decode { .. }) => {}
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    pub(crate) fn validator(vote: Pubkey, active: u64, transient: u64) -> ValidatorStakeInfo {
        ValidatorStakeInfo {
            active_stake_lamports: active,
            transient_stake_lamports: transient,
            last_update_epoch: 500,
            vote_account_address: vote,
            ..ValidatorStakeInfo::default()
        }
    }

    pub(crate) fn validator_list_data(
        declared_len: u32,
        validators: &[ValidatorStakeInfo],
    ) -> Vec<u8> {
        let mut data = ValidatorListHeader {
            account_type: AccountType::ValidatorList,
            max_validators: 10,
        }
        .try_to_vec()
        .unwrap();
        data.extend_from_slice(&declared_len.to_le_bytes());
        for validator in validators {
            data.extend(validator.try_to_vec().unwrap());
        }
        data
    }

    #[test]
    fn validator_stake_info_packs_to_documented_size() {
        let info = validator(Pubkey::new_unique(), 1, 2);
        assert_eq!(info.try_to_vec().unwrap().len(), VALIDATOR_STAKE_INFO_LEN);
        assert_eq!(info.stake_status(), Some(StakeStatus::Active));
    }

    #[test]
    fn stake_pool_ignores_trailing_bytes() {
        let stake_pool = StakePool {
            account_type: AccountType::StakePool,
            reserve_stake: Pubkey::new_unique(),
            total_lamports: 1_000_000_000_000,
            pool_token_supply: 950_000_000_000,
            stake_withdrawal_fee: Fee {
                denominator: 1000,
                numerator: 1,
            },
            preferred_withdraw_validator_vote_address: Some(Pubkey::new_unique()),
            ..StakePool::default()
        };
        let mut data = stake_pool.try_to_vec().unwrap();
        data.extend_from_slice(&[7; 128]);

        assert_eq!(decode_stake_pool(&data).unwrap(), stake_pool);
    }

    #[test]
    fn stake_pool_rejects_wrong_type_and_short_data() {
        let data = StakePool::default().try_to_vec().unwrap();
        assert_decode_error(decode_stake_pool(&data));

        let data = StakePool {
            account_type: AccountType::StakePool,
            ..StakePool::default()
        }
        .try_to_vec()
        .unwrap();
        assert_decode_error(decode_stake_pool(&data[..100]));
    }

    #[test]
    fn validator_list_skips_default_vote_accounts() {
        let real = validator(Pubkey::new_unique(), 5_000_000_000, 0);
        let empty = ValidatorStakeInfo::default();
        let data = validator_list_data(2, &[real, empty]);

        let list = decode_validator_list(&data).unwrap();
        assert_eq!(list.header.max_validators, 10);
        assert_eq!(list.validators, vec![real]);
        assert_eq!(list.find(&real.vote_account_address), Some(&real));
    }

    #[test]
    fn validator_list_stops_at_buffer_end() {
        let first = validator(Pubkey::new_unique(), 1, 0);
        let second = validator(Pubkey::new_unique(), 2, 0);
        let mut data = validator_list_data(5, &[first, second]);
        // half of a third record
        data.extend_from_slice(&[1; VALIDATOR_STAKE_INFO_LEN / 2]);

        let list = decode_validator_list(&data).unwrap();
        assert_eq!(list.validators, vec![first, second]);
    }

    #[test]
    fn validator_list_reads_only_declared_entries() {
        let first = validator(Pubkey::new_unique(), 1, 0);
        let second = validator(Pubkey::new_unique(), 2, 0);
        let data = validator_list_data(1, &[first, second]);

        assert_eq!(decode_validator_list(&data).unwrap().validators, vec![first]);
    }

    #[test]
    fn validator_list_rejects_bad_header() {
        assert_decode_error(decode_validator_list(&[2, 10, 0, 0]));

        let mut data = validator_list_data(0, &[]);
        data[0] = 1;
        assert_decode_error(decode_validator_list(&data));
    }

    #[test]
    fn anchor_accounts() {
        let access = Access {
            owner: Pubkey::new_unique(),
            stake_manager: Pubkey::new_unique(),
            is_paused: true,
            pending_owner: None,
        };
        let mut data = discriminator("account:Access").to_vec();
        data.extend(access.try_to_vec().unwrap());
        assert_eq!(decode_access(&data).unwrap(), access);

        // an access account is not a user status account
        assert_decode_error(decode_user_status(&data));

        let mut data = discriminator("account:UserStatus").to_vec();
        data.push(2);
        assert_eq!(
            decode_user_status(&data).unwrap().status,
            WhitelistUserStatus::Blacklisted
        );

        assert_decode_error(decode_user_status(&data[..4]));
    }
}
