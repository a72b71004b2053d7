//! Read access to the ledger

use {
    crate::error::StakingClientError,
    async_trait::async_trait,
    solana_client::nonblocking::rpc_client::RpcClient,
    solana_sdk::pubkey::Pubkey,
};

/// The reads the client needs from a cluster.
///
/// Implemented for the nonblocking [`RpcClient`]; tests substitute a bank.
#[async_trait]
pub trait LedgerClient {
    /// Account data, or `None` if the account does not exist
    async fn get_account_data(
        &self,
        address: &Pubkey,
    ) -> Result<Option<Vec<u8>>, StakingClientError>;

    /// Lamports held by an account, zero if it does not exist
    async fn get_balance(&self, address: &Pubkey) -> Result<u64, StakingClientError>;

    /// Smallest delegation the stake program accepts
    async fn get_stake_minimum_delegation(&self) -> Result<u64, StakingClientError>;

    /// Rent-exempt reserve for an account of `data_len` bytes
    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, StakingClientError>;
}

#[async_trait]
impl LedgerClient for RpcClient {
    async fn get_account_data(
        &self,
        address: &Pubkey,
    ) -> Result<Option<Vec<u8>>, StakingClientError> {
        let account = self
            .get_account_with_commitment(address, self.commitment())
            .await?
            .value;
        Ok(account.map(|account| account.data))
    }

    async fn get_balance(&self, address: &Pubkey) -> Result<u64, StakingClientError> {
        Ok(RpcClient::get_balance(self, address).await?)
    }

    async fn get_stake_minimum_delegation(&self) -> Result<u64, StakingClientError> {
        Ok(RpcClient::get_stake_minimum_delegation(self).await?)
    }

    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, StakingClientError> {
        Ok(RpcClient::get_minimum_balance_for_rent_exemption(self, data_len).await?)
    }
}
