//! Error types

use {
    num_derive::FromPrimitive,
    num_traits::FromPrimitive,
    solana_client::client_error::ClientError,
    solana_sdk::{instruction::InstructionError, pubkey::Pubkey, transaction::TransactionError},
    std::fmt,
    thiserror::Error,
};

/// Errors produced while reading pool state or planning a request.
#[derive(Debug, Error)]
pub enum StakingClientError {
    /// A required account does not exist on chain.
    #[error("account {0} not found")]
    AccountNotFound(Pubkey),
    /// Account data is shorter than its layout or carries an unexpected type.
    #[error("failed to decode {account} account: {reason}")]
    Decode {
        /// Kind of account being decoded
        account: &'static str,
        /// What was wrong with the data
        reason: String,
    },
    /// The pool has no tokens outstanding, so no share price exists.
    #[error("stake pool has zero pool token supply")]
    ZeroPoolTokenSupply,
    /// Amounts must be positive.
    #[error("amount must be greater than zero")]
    InvalidAmount,
    /// A calculation overflowed.
    /// (This error should never be surfaced for realistic pool balances.)
    #[error("calculation overflowed")]
    CalculationFailure,
    /// The withdrawal cannot leave a valid stake account behind.
    #[error(transparent)]
    WithdrawalTooSmall(#[from] WithdrawalTooSmall),
    /// The RPC node rejected a request.
    #[error(transparent)]
    Rpc(#[from] Box<ClientError>),
    /// Any other ledger backend failed.
    #[error("ledger request failed: {0}")]
    Ledger(Box<dyn std::error::Error + Send + Sync>),
}

impl From<ClientError> for StakingClientError {
    fn from(e: ClientError) -> Self {
        Self::Rpc(Box::new(e))
    }
}

/// A withdrawal whose expected lamports do not clear the minimum stake
/// account balance plus the withdrawal fee.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WithdrawalTooSmall {
    /// Lamports the requested pool tokens are worth
    pub expected_lamports: u64,
    /// Smallest withdrawal in lamports, before fees
    pub minimum_lamports: u64,
    /// Smallest withdrawal in pool tokens, when a share price is known
    pub minimum_pool_tokens: Option<u64>,
}

impl fmt::Display for WithdrawalTooSmall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "withdrawal too small: expected {} lamports, at least {} required",
            self.expected_lamports, self.minimum_lamports
        )?;
        if let Some(tokens) = self.minimum_pool_tokens {
            write!(f, " ({} pool tokens)", tokens)?;
        }
        Ok(())
    }
}

impl std::error::Error for WithdrawalTooSmall {}

/// Errors that may be returned by the staker program.
#[derive(Clone, Copy, Debug, Eq, Error, FromPrimitive, PartialEq)]
pub enum StakerError {
    // 6000.
    /// The staker program is paused.
    #[error("Contract is paused")]
    ContractPaused = 6000,
    /// Only the owner can call this method.
    #[error("Only the owner can call this method")]
    NotAuthorized,
    /// Unpause requested while not paused.
    #[error("Contract is not paused")]
    NotPaused,
    /// Ownership claimed with no transfer pending.
    #[error("No pending owner set")]
    PendingOwnerNotSet,
    /// Only the pending owner can claim ownership.
    #[error("Only the pending owner can call this method")]
    NotPendingOwner,

    // 6005.
    /// The owner cannot be removed as an agent.
    #[error("Owner cannot be removed")]
    CannotRemoveOwner,
    /// User is already whitelisted.
    #[error("User is already whitelisted")]
    AlreadyWhitelisted,
    /// User is already blacklisted.
    #[error("User is already blacklisted")]
    AlreadyBlacklisted,
    /// User status is already cleared.
    #[error("User status is already cleared")]
    AlreadyCleared,
    /// Deposits require a whitelisted user.
    #[error("User is not whitelisted")]
    UserNotWhitelisted,
}

impl StakerError {
    /// Extract a staker program error from a failed transaction, if it is one
    pub fn from_transaction_error(error: &TransactionError) -> Option<Self> {
        match error {
            TransactionError::InstructionError(_, InstructionError::Custom(code)) => {
                Self::from_u32(*code)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, test_case::test_case};

    #[test_case(6000, Some(StakerError::ContractPaused); "first")]
    #[test_case(6006, Some(StakerError::AlreadyWhitelisted); "middle")]
    #[test_case(6009, Some(StakerError::UserNotWhitelisted); "last")]
    #[test_case(6010, None; "past end")]
    #[test_case(0, None; "stake pool error")]
    fn staker_error_codes(code: u32, expected: Option<StakerError>) {
        let error = TransactionError::InstructionError(1, InstructionError::Custom(code));
        assert_eq!(StakerError::from_transaction_error(&error), expected);
    }

    #[test]
    fn withdrawal_too_small_message() {
        let error = WithdrawalTooSmall {
            expected_lamports: 2_000_000,
            minimum_lamports: 2_282_880,
            minimum_pool_tokens: Some(2_168_736),
        };
        assert_eq!(
            error.to_string(),
            "withdrawal too small: expected 2000000 lamports, at least 2282880 required (2168736 pool tokens)"
        );
    }
}
