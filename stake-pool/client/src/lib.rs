#![deny(missing_docs)]

//! A client for depositing into, withdrawing from, and administering a
//! liquid staking pool fronted by the staker program

pub mod client;
pub mod config;
pub mod error;
pub mod instruction;
pub mod ledger;
pub mod state;
pub mod withdrawal;

// export current sdk types for downstream users building with a different sdk version
pub use solana_sdk;
use solana_sdk::pubkey::Pubkey;

/// Program ids of the mainnet deployment
pub mod program {
    solana_sdk::declare_id!("SPoo1Ku8WFXoNDMHPsrGSTSG1Y47rzgn41SLUNakuHy");

    /// The staker program, which gates deposits and administers the pool
    pub mod staker {
        solana_sdk::declare_id!("6EZAJVrNQdnBJU6ULxXSDaEoK6fN7C3iXTCkZKRWDdGM");
    }
}

const TRANSIENT_STAKE_PREFIX: &[u8] = b"transient";
const EPHEMERAL_STAKE_PREFIX: &[u8] = b"ephemeral";
const WITHDRAW_AUTHORITY_PREFIX: &[u8] = b"withdraw";
const ACCESS_PREFIX: &[u8] = b"access";
const STAKER_AUTHORITY_PREFIX: &[u8] = b"staker";
const USER_STATUS_PREFIX: &[u8] = b"user";
const AGENT_PREFIX: &[u8] = b"agent";
const EVENT_AUTHORITY_PREFIX: &[u8] = b"__event_authority";

/// Decimals of the pool token mint, identical to native SOL
pub const POOL_TOKEN_DECIMALS: u8 = 9;

/// Staked lamports a validator stake account must keep so merges do not
/// mismatch on credits observed
pub const MINIMUM_ACTIVE_STAKE: u64 = 1_000_000;

fn find_staker_address(program_id: &Pubkey, prefix: &[u8], key: Option<&Pubkey>) -> (Pubkey, u8) {
    match key {
        Some(key) => Pubkey::find_program_address(&[prefix, key.as_ref()], program_id),
        None => Pubkey::find_program_address(&[prefix], program_id),
    }
}

/// Find the active stake account the pool keeps for a validator vote account.
pub fn find_validator_stake_address(
    program_id: &Pubkey,
    vote_account_address: &Pubkey,
    stake_pool_address: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[vote_account_address.as_ref(), stake_pool_address.as_ref()],
        program_id,
    )
}

/// Find the transient stake account the pool uses while moving stake to or
/// from a validator.
pub fn find_transient_stake_address(
    program_id: &Pubkey,
    vote_account_address: &Pubkey,
    stake_pool_address: &Pubkey,
    seed: u64,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            TRANSIENT_STAKE_PREFIX,
            vote_account_address.as_ref(),
            stake_pool_address.as_ref(),
            &seed.to_le_bytes(),
        ],
        program_id,
    )
}

/// Find the ephemeral stake account used to stage validator deposits.
pub fn find_ephemeral_stake_address(
    program_id: &Pubkey,
    stake_pool_address: &Pubkey,
    seed: u64,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            EPHEMERAL_STAKE_PREFIX,
            stake_pool_address.as_ref(),
            &seed.to_le_bytes(),
        ],
        program_id,
    )
}

/// Find the pool's withdraw authority.
pub fn find_withdraw_authority_address(
    program_id: &Pubkey,
    stake_pool_address: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[stake_pool_address.as_ref(), WITHDRAW_AUTHORITY_PREFIX],
        program_id,
    )
}

/// Find the staker program's global access account.
pub fn find_access_address(staker_program_id: &Pubkey) -> (Pubkey, u8) {
    find_staker_address(staker_program_id, ACCESS_PREFIX, None)
}

/// Find the staker program's authority over the pool.
pub fn find_staker_authority_address(staker_program_id: &Pubkey) -> (Pubkey, u8) {
    find_staker_address(staker_program_id, STAKER_AUTHORITY_PREFIX, None)
}

/// Find the account recording whether a user is whitelisted or blacklisted.
pub fn find_user_status_address(staker_program_id: &Pubkey, user: &Pubkey) -> (Pubkey, u8) {
    find_staker_address(staker_program_id, USER_STATUS_PREFIX, Some(user))
}

/// Find the account marking a signer as an access-control agent.
pub fn find_agent_address(staker_program_id: &Pubkey, agent: &Pubkey) -> (Pubkey, u8) {
    find_staker_address(staker_program_id, AGENT_PREFIX, Some(agent))
}

/// Find the anchor event authority of the staker program.
pub fn find_event_authority_address(staker_program_id: &Pubkey) -> (Pubkey, u8) {
    find_staker_address(staker_program_id, EVENT_AUTHORITY_PREFIX, None)
}

#[cfg(test)]
mod tests {
    use {super::*, std::str::FromStr};

    #[test]
    fn program_ids() {
        assert_eq!(
            program::id(),
            Pubkey::from_str("SPoo1Ku8WFXoNDMHPsrGSTSG1Y47rzgn41SLUNakuHy").unwrap()
        );
        assert_ne!(program::id(), program::staker::id());
    }

    #[test]
    fn transient_seed_changes_address() {
        let vote = Pubkey::new_unique();
        let pool = Pubkey::new_unique();

        let (first, _) = find_transient_stake_address(&program::id(), &vote, &pool, 0);
        let (second, _) = find_transient_stake_address(&program::id(), &vote, &pool, 1);
        let (active, _) = find_validator_stake_address(&program::id(), &vote, &pool);

        assert_ne!(first, second);
        assert_ne!(first, active);
        assert_eq!(
            first,
            find_transient_stake_address(&program::id(), &vote, &pool, 0).0
        );
    }

    #[test]
    fn user_status_is_per_user() {
        let alice = Pubkey::new_unique();
        let bob = Pubkey::new_unique();
        let staker = program::staker::id();

        assert_ne!(
            find_user_status_address(&staker, &alice).0,
            find_user_status_address(&staker, &bob).0
        );
        assert_ne!(
            find_user_status_address(&staker, &alice).0,
            find_agent_address(&staker, &alice).0
        );
    }
}
