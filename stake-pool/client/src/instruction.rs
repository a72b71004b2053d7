//! Instruction builders for the staker and stake pool programs

#![allow(clippy::too_many_arguments)]

use {
    crate::{
        config::PoolConfig,
        state::{StakePool, DISCRIMINATOR_LEN},
    },
    solana_sdk::{
        instruction::{AccountMeta, Instruction},
        pubkey::Pubkey,
        stake::{self, state::StakeStateV2},
        system_instruction, system_program, sysvar,
    },
    spl_associated_token_account::{
        get_associated_token_address_with_program_id,
        instruction::create_associated_token_account_idempotent,
    },
};

/// Anchor discriminators of the staker program instructions
pub mod discriminator {
    /// `global:deposit`
    pub const DEPOSIT: [u8; 8] = [242, 35, 198, 137, 82, 225, 242, 182];
    /// `global:deposit_to_specific_validator`
    pub const DEPOSIT_TO_SPECIFIC_VALIDATOR: [u8; 8] = [147, 165, 155, 96, 40, 204, 154, 167];
    /// `global:add_user_to_whitelist`
    pub const ADD_USER_TO_WHITELIST: [u8; 8] = [244, 177, 124, 12, 22, 50, 139, 152];
    /// `global:add_user_to_blacklist`
    pub const ADD_USER_TO_BLACKLIST: [u8; 8] = [61, 245, 43, 161, 144, 46, 122, 228];
    /// `global:clear_user_status`
    pub const CLEAR_USER_STATUS: [u8; 8] = [241, 8, 63, 62, 144, 246, 193, 9];
    /// `global:pause`
    pub const PAUSE: [u8; 8] = [211, 22, 221, 251, 74, 121, 193, 47];
    /// `global:unpause`
    pub const UNPAUSE: [u8; 8] = [169, 144, 4, 38, 10, 141, 188, 255];
}

/// Index of `WithdrawStake` in the stake pool program's instruction enum
pub const WITHDRAW_STAKE_INDEX: u8 = 10;

fn anchor_data(discriminator: [u8; DISCRIMINATOR_LEN], args: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(DISCRIMINATOR_LEN + args.len());
    data.extend_from_slice(&discriminator);
    data.extend_from_slice(args);
    data
}

fn staker_instruction(
    config: &PoolConfig,
    mut accounts: Vec<AccountMeta>,
    data: Vec<u8>,
) -> Instruction {
    // anchor event cpi accounts close every staker instruction
    accounts.push(AccountMeta::new_readonly(config.event_authority(), false));
    accounts.push(AccountMeta::new_readonly(config.staker_program_id, false));
    Instruction {
        program_id: config.staker_program_id,
        accounts,
        data,
    }
}

/// User's associated account for the pool mint
pub fn pool_token_address(stake_pool: &StakePool, owner: &Pubkey) -> Pubkey {
    get_associated_token_address_with_program_id(
        owner,
        &stake_pool.pool_mint,
        &stake_pool.token_program_id,
    )
}

/// Create the user's pool token account, paid for by the user
pub fn create_pool_token_account(stake_pool: &StakePool, user: &Pubkey) -> Instruction {
    create_associated_token_account_idempotent(
        user,
        user,
        &stake_pool.pool_mint,
        &stake_pool.token_program_id,
    )
}

/// Deposit `lamports` into the pool reserve through the staker program.
///
///   0. `[w, s]` User
///   1. `[w]` User whitelist status
///   2. `[w]` Access
///   3. `[w]` Stake pool
///   4. `[w]` SOL deposit authority
///   5. `[w]` Withdraw authority
///   6. `[w]` Reserve stake account
///   7. `[w]` User pool token account
///   8. `[w]` Manager fee account
///   9. `[w]` Pool token mint
///   10. `[w]` Referral fee account
///   11. `[]` Token program
///   12. `[]` Stake pool program
///   13. `[]` System program
pub fn deposit(
    config: &PoolConfig,
    stake_pool: &StakePool,
    user: &Pubkey,
    referrer_pool_token_account: Option<&Pubkey>,
    lamports: u64,
) -> Instruction {
    let user_pool_token_account = pool_token_address(stake_pool, user);
    let accounts = vec![
        AccountMeta::new(*user, true),
        AccountMeta::new(config.user_status_address(user), false),
        AccountMeta::new(config.access_address(), false),
        AccountMeta::new(config.stake_pool, false),
        AccountMeta::new(config.deposit_authority, false),
        AccountMeta::new(config.withdraw_authority(), false),
        AccountMeta::new(stake_pool.reserve_stake, false),
        AccountMeta::new(user_pool_token_account, false),
        AccountMeta::new(stake_pool.manager_fee_account, false),
        AccountMeta::new(stake_pool.pool_mint, false),
        AccountMeta::new(
            *referrer_pool_token_account.unwrap_or(&user_pool_token_account),
            false,
        ),
        AccountMeta::new_readonly(stake_pool.token_program_id, false),
        AccountMeta::new_readonly(config.stake_pool_program_id, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    staker_instruction(
        config,
        accounts,
        anchor_data(discriminator::DEPOSIT, &lamports.to_le_bytes()),
    )
}

/// Deposit `lamports` and delegate them to one validator of the pool.
///
///   0. `[w, s]` User
///   1. `[w]` User whitelist status
///   2. `[w]` Access
///   3. `[]` Staker authority
///   4. `[w]` Stake pool
///   5. `[w]` SOL deposit authority
///   6. `[w]` Withdraw authority
///   7. `[w]` Reserve stake account
///   8. `[w]` User pool token account
///   9. `[w]` Manager fee account
///   10. `[w]` Pool token mint
///   11. `[w]` Referral fee account
///   12. `[]` Token program
///   13. `[w]` Validator list
///   14. `[w]` Ephemeral stake account
///   15. `[w]` Transient stake account
///   16. `[w]` Validator stake account
///   17. `[w]` Validator vote account
///   18. `[]` Clock sysvar
///   19. `[]` Stake history sysvar
///   20. `[]` Stake config
///   21. `[]` Stake program
///   22. `[]` Stake pool program
///   23. `[]` System program
pub fn deposit_to_specific_validator(
    config: &PoolConfig,
    stake_pool: &StakePool,
    user: &Pubkey,
    vote_account_address: &Pubkey,
    referrer_pool_token_account: Option<&Pubkey>,
    lamports: u64,
) -> Instruction {
    let user_pool_token_account = pool_token_address(stake_pool, user);
    #[allow(deprecated)]
    let stake_config = stake::config::id();
    let accounts = vec![
        AccountMeta::new(*user, true),
        AccountMeta::new(config.user_status_address(user), false),
        AccountMeta::new(config.access_address(), false),
        AccountMeta::new_readonly(config.staker_authority(), false),
        AccountMeta::new(config.stake_pool, false),
        AccountMeta::new(config.deposit_authority, false),
        AccountMeta::new(config.withdraw_authority(), false),
        AccountMeta::new(stake_pool.reserve_stake, false),
        AccountMeta::new(user_pool_token_account, false),
        AccountMeta::new(stake_pool.manager_fee_account, false),
        AccountMeta::new(stake_pool.pool_mint, false),
        AccountMeta::new(
            *referrer_pool_token_account.unwrap_or(&user_pool_token_account),
            false,
        ),
        AccountMeta::new_readonly(stake_pool.token_program_id, false),
        AccountMeta::new(stake_pool.validator_list, false),
        AccountMeta::new(config.ephemeral_stake_address(), false),
        AccountMeta::new(config.transient_stake_address(vote_account_address), false),
        AccountMeta::new(config.validator_stake_address(vote_account_address), false),
        AccountMeta::new(*vote_account_address, false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
        AccountMeta::new_readonly(sysvar::stake_history::id(), false),
        AccountMeta::new_readonly(stake_config, false),
        AccountMeta::new_readonly(stake::program::id(), false),
        AccountMeta::new_readonly(config.stake_pool_program_id, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    staker_instruction(
        config,
        accounts,
        anchor_data(
            discriminator::DEPOSIT_TO_SPECIFIC_VALIDATOR,
            &lamports.to_le_bytes(),
        ),
    )
}

fn user_status_instruction(
    config: &PoolConfig,
    discriminator: [u8; DISCRIMINATOR_LEN],
    agent: &Pubkey,
    user: &Pubkey,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new(*agent, true),
        AccountMeta::new(config.user_status_address(user), false),
        AccountMeta::new_readonly(config.agent_address(agent), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    staker_instruction(config, accounts, anchor_data(discriminator, user.as_ref()))
}

/// Allow `user` to deposit. `agent` must hold an agent account.
///
///   0. `[w, s]` Agent
///   1. `[w]` User whitelist status
///   2. `[]` Agent account
///   3. `[]` System program
pub fn add_user_to_whitelist(config: &PoolConfig, agent: &Pubkey, user: &Pubkey) -> Instruction {
    user_status_instruction(config, discriminator::ADD_USER_TO_WHITELIST, agent, user)
}

/// Bar `user` from depositing. Accounts as in [`add_user_to_whitelist`].
pub fn add_user_to_blacklist(config: &PoolConfig, agent: &Pubkey, user: &Pubkey) -> Instruction {
    user_status_instruction(config, discriminator::ADD_USER_TO_BLACKLIST, agent, user)
}

/// Reset `user` to no status. Accounts as in [`add_user_to_whitelist`].
pub fn clear_user_status(config: &PoolConfig, agent: &Pubkey, user: &Pubkey) -> Instruction {
    user_status_instruction(config, discriminator::CLEAR_USER_STATUS, agent, user)
}

fn access_instruction(
    config: &PoolConfig,
    discriminator: [u8; DISCRIMINATOR_LEN],
    owner: &Pubkey,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new(*owner, true),
        AccountMeta::new(config.access_address(), false),
    ];
    staker_instruction(config, accounts, anchor_data(discriminator, &[]))
}

/// Pause deposits.
///
///   0. `[w, s]` Owner
///   1. `[w]` Access
pub fn pause(config: &PoolConfig, owner: &Pubkey) -> Instruction {
    access_instruction(config, discriminator::PAUSE, owner)
}

/// Resume deposits. Accounts as in [`pause`].
pub fn unpause(config: &PoolConfig, owner: &Pubkey) -> Instruction {
    access_instruction(config, discriminator::UNPAUSE, owner)
}

/// Allocate an uninitialized stake account to receive withdrawn stake
pub fn create_stake_account(
    payer: &Pubkey,
    stake_account: &Pubkey,
    rent_exempt_lamports: u64,
) -> Instruction {
    system_instruction::create_account(
        payer,
        stake_account,
        rent_exempt_lamports,
        StakeStateV2::size_of() as u64,
        &stake::program::id(),
    )
}

/// Burn `pool_tokens` and split the stake they are worth out of
/// `stake_to_split` into `stake_to_receive`.
///
///   0. `[w]` Stake pool
///   1. `[w]` Validator list
///   2. `[]` Withdraw authority
///   3. `[w]` Validator, transient or reserve stake account to split
///   4. `[w]` Uninitialized stake account to receive the withdrawal
///   5. `[]` New withdraw and staker authority of the received stake
///   6. `[s]` Pool token transfer authority
///   7. `[w]` User pool token account
///   8. `[w]` Manager fee account
///   9. `[w]` Pool token mint
///   10. `[]` Clock sysvar
///   11. `[]` Token program
///   12. `[]` Stake program
pub fn withdraw_stake(
    config: &PoolConfig,
    stake_pool: &StakePool,
    stake_to_split: &Pubkey,
    stake_to_receive: &Pubkey,
    user: &Pubkey,
    pool_tokens: u64,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new(config.stake_pool, false),
        AccountMeta::new(stake_pool.validator_list, false),
        AccountMeta::new_readonly(config.withdraw_authority(), false),
        AccountMeta::new(*stake_to_split, false),
        AccountMeta::new(*stake_to_receive, false),
        AccountMeta::new_readonly(*user, false),
        AccountMeta::new_readonly(*user, true),
        AccountMeta::new(pool_token_address(stake_pool, user), false),
        AccountMeta::new(stake_pool.manager_fee_account, false),
        AccountMeta::new(stake_pool.pool_mint, false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
        AccountMeta::new_readonly(stake_pool.token_program_id, false),
        AccountMeta::new_readonly(stake::program::id(), false),
    ];

    let mut data = vec![WITHDRAW_STAKE_INDEX];
    data.extend_from_slice(&pool_tokens.to_le_bytes());

    Instruction {
        program_id: config.stake_pool_program_id,
        accounts,
        data,
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::state, test_case::test_case};

    #[test_case(discriminator::DEPOSIT, "deposit")]
    #[test_case(discriminator::DEPOSIT_TO_SPECIFIC_VALIDATOR, "deposit_to_specific_validator")]
    #[test_case(discriminator::ADD_USER_TO_WHITELIST, "add_user_to_whitelist")]
    #[test_case(discriminator::ADD_USER_TO_BLACKLIST, "add_user_to_blacklist")]
    #[test_case(discriminator::CLEAR_USER_STATUS, "clear_user_status")]
    #[test_case(discriminator::PAUSE, "pause")]
    #[test_case(discriminator::UNPAUSE, "unpause")]
    fn discriminators_match_instruction_names(discriminator: [u8; 8], name: &str) {
        assert_eq!(
            discriminator,
            state::discriminator(&format!("global:{}", name))
        );
    }

    fn stake_pool() -> StakePool {
        StakePool {
            validator_list: Pubkey::new_unique(),
            reserve_stake: Pubkey::new_unique(),
            pool_mint: Pubkey::new_unique(),
            manager_fee_account: Pubkey::new_unique(),
            token_program_id: spl_token::id(),
            ..StakePool::default()
        }
    }

    #[test]
    fn deposit_encoding() {
        let config = PoolConfig::default();
        let stake_pool = stake_pool();
        let user = Pubkey::new_unique();

        let instruction = deposit(&config, &stake_pool, &user, None, 1_500_000_000);
        assert_eq!(instruction.program_id, config.staker_program_id);
        assert_eq!(&instruction.data[..8], &discriminator::DEPOSIT);
        assert_eq!(&instruction.data[8..], &1_500_000_000u64.to_le_bytes());
        assert_eq!(instruction.accounts.len(), 16);
        assert!(instruction.accounts[0].is_signer);
        assert_eq!(
            instruction.accounts[1].pubkey,
            config.user_status_address(&user)
        );
        // referral fees go back to the user without a referrer
        assert_eq!(instruction.accounts[10].pubkey, instruction.accounts[7].pubkey);
        assert_eq!(instruction.accounts[14].pubkey, config.event_authority());
        assert_eq!(instruction.accounts[15].pubkey, config.staker_program_id);
    }

    #[test]
    fn deposit_to_specific_validator_derives_stake_accounts() {
        let config = PoolConfig::default();
        let stake_pool = stake_pool();
        let user = Pubkey::new_unique();
        let vote = Pubkey::new_unique();
        let referrer = Pubkey::new_unique();

        let instruction =
            deposit_to_specific_validator(&config, &stake_pool, &user, &vote, Some(&referrer), 7);
        assert_eq!(instruction.accounts.len(), 26);
        assert_eq!(instruction.accounts[11].pubkey, referrer);
        assert_eq!(instruction.accounts[14].pubkey, config.ephemeral_stake_address());
        assert_eq!(
            instruction.accounts[15].pubkey,
            config.transient_stake_address(&vote)
        );
        assert_eq!(
            instruction.accounts[16].pubkey,
            config.validator_stake_address(&vote)
        );
        assert_eq!(instruction.accounts[17].pubkey, vote);
        assert_eq!(&instruction.data[8..], &7u64.to_le_bytes());
    }

    #[test]
    fn user_status_instructions_carry_user() {
        let config = PoolConfig::default();
        let agent = Pubkey::new_unique();
        let user = Pubkey::new_unique();

        for instruction in [
            add_user_to_whitelist(&config, &agent, &user),
            add_user_to_blacklist(&config, &agent, &user),
            clear_user_status(&config, &agent, &user),
        ] {
            assert_eq!(&instruction.data[8..], user.as_ref());
            assert_eq!(instruction.accounts[0].pubkey, agent);
            assert!(instruction.accounts[0].is_signer);
            assert_eq!(instruction.accounts[2].pubkey, config.agent_address(&agent));
            assert_eq!(instruction.accounts.len(), 6);
        }
    }

    #[test]
    fn pause_has_no_arguments() {
        let config = PoolConfig::default();
        let owner = Pubkey::new_unique();
        assert_eq!(pause(&config, &owner).data, discriminator::PAUSE);
        assert_eq!(unpause(&config, &owner).accounts.len(), 4);
    }

    #[test]
    fn withdraw_stake_encoding() {
        let config = PoolConfig::default();
        let stake_pool = stake_pool();
        let split = Pubkey::new_unique();
        let receive = Pubkey::new_unique();
        let user = Pubkey::new_unique();

        let instruction = withdraw_stake(&config, &stake_pool, &split, &receive, &user, 42);
        assert_eq!(instruction.program_id, config.stake_pool_program_id);
        assert_eq!(instruction.data[0], WITHDRAW_STAKE_INDEX);
        assert_eq!(&instruction.data[1..], &42u64.to_le_bytes());
        assert_eq!(instruction.accounts.len(), 13);
        assert_eq!(instruction.accounts[3].pubkey, split);
        assert!(instruction.accounts[6].is_signer);
        assert!(!instruction.accounts[5].is_signer);

        let create = create_stake_account(&user, &receive, 2_282_880);
        assert_eq!(create.program_id, system_program::id());
    }
}
