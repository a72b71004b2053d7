//! Pool configuration

use {
    crate::{
        find_access_address, find_agent_address, find_ephemeral_stake_address,
        find_event_authority_address, find_staker_authority_address,
        find_transient_stake_address, find_user_status_address, find_validator_stake_address,
        find_withdraw_authority_address, program,
    },
    solana_sdk::{pubkey, pubkey::Pubkey},
};

/// The mainnet stake pool account
pub const MAINNET_STAKE_POOL: Pubkey = pubkey!("EyKyx9LKz7Qbp6PSbBRoMdt8iNYp8PvFVupQTQRMY9AM");

/// The mainnet SOL deposit authority, owned by the staker program
pub const MAINNET_DEPOSIT_AUTHORITY: Pubkey =
    pubkey!("BLTSuAqaoaUUjLRVdanFXGBi2fef5pwhKN23kCMVgX2T");

/// Identifies one deployment of the pool.
///
/// Everything else the client needs (reserve, mint, validator list, fee
/// accounts) is read from the stake pool account itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Stake pool program
    pub stake_pool_program_id: Pubkey,
    /// Staker program fronting the pool
    pub staker_program_id: Pubkey,
    /// Stake pool account
    pub stake_pool: Pubkey,
    /// Authority the pool requires on SOL and validator deposits
    pub deposit_authority: Pubkey,
    /// Seed index of the transient stake accounts the client addresses
    pub transient_stake_seed: u64,
    /// Seed index of the ephemeral stake account used by validator deposits
    pub ephemeral_stake_seed: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            stake_pool_program_id: program::id(),
            staker_program_id: program::staker::id(),
            stake_pool: MAINNET_STAKE_POOL,
            deposit_authority: MAINNET_DEPOSIT_AUTHORITY,
            transient_stake_seed: 0,
            ephemeral_stake_seed: 0,
        }
    }
}

impl PoolConfig {
    /// Active stake account of a validator in this pool
    pub fn validator_stake_address(&self, vote_account_address: &Pubkey) -> Pubkey {
        find_validator_stake_address(
            &self.stake_pool_program_id,
            vote_account_address,
            &self.stake_pool,
        )
        .0
    }

    /// Transient stake account of a validator in this pool
    pub fn transient_stake_address(&self, vote_account_address: &Pubkey) -> Pubkey {
        find_transient_stake_address(
            &self.stake_pool_program_id,
            vote_account_address,
            &self.stake_pool,
            self.transient_stake_seed,
        )
        .0
    }

    /// Ephemeral stake account of this pool
    pub fn ephemeral_stake_address(&self) -> Pubkey {
        find_ephemeral_stake_address(
            &self.stake_pool_program_id,
            &self.stake_pool,
            self.ephemeral_stake_seed,
        )
        .0
    }

    /// Withdraw authority of this pool
    pub fn withdraw_authority(&self) -> Pubkey {
        find_withdraw_authority_address(&self.stake_pool_program_id, &self.stake_pool).0
    }

    /// Access account of the staker program
    pub fn access_address(&self) -> Pubkey {
        find_access_address(&self.staker_program_id).0
    }

    /// Authority the staker program holds over the pool
    pub fn staker_authority(&self) -> Pubkey {
        find_staker_authority_address(&self.staker_program_id).0
    }

    /// Whitelist status account of a user
    pub fn user_status_address(&self, user: &Pubkey) -> Pubkey {
        find_user_status_address(&self.staker_program_id, user).0
    }

    /// Agent account of a signer
    pub fn agent_address(&self, agent: &Pubkey) -> Pubkey {
        find_agent_address(&self.staker_program_id, agent).0
    }

    /// Event authority of the staker program
    pub fn event_authority(&self) -> Pubkey {
        find_event_authority_address(&self.staker_program_id).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_follow_pool() {
        let vote = Pubkey::new_unique();
        let mainnet = PoolConfig::default();
        let other = PoolConfig {
            stake_pool: Pubkey::new_unique(),
            ..PoolConfig::default()
        };

        assert_ne!(
            mainnet.validator_stake_address(&vote),
            other.validator_stake_address(&vote)
        );
        assert_ne!(
            mainnet.transient_stake_address(&vote),
            other.transient_stake_address(&vote)
        );
        assert_ne!(mainnet.withdraw_authority(), other.withdraw_authority());

        // staker program accounts are global
        assert_eq!(mainnet.access_address(), other.access_address());
        assert_eq!(mainnet.event_authority(), other.event_authority());
    }
}
