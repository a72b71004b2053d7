use {
    liquid_staking_client::{
        client::WithdrawalPlan,
        state::{Access, StakePool, ValidatorList},
        withdrawal::StakeSource,
    },
    solana_sdk::{native_token::lamports_to_sol, pubkey::Pubkey},
    std::fmt,
};

pub(crate) struct CliStakePool<'a> {
    pub(crate) address: Pubkey,
    pub(crate) stake_pool: &'a StakePool,
    pub(crate) validator_list: &'a ValidatorList,
    pub(crate) access: Option<&'a Access>,
}

impl fmt::Display for CliStakePool<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stake_pool = self.stake_pool;
        writeln!(f, "Stake Pool: {}", self.address)?;
        writeln!(f, "Validator List: {}", stake_pool.validator_list)?;
        writeln!(f, "Manager: {}", stake_pool.manager)?;
        writeln!(f, "Staker: {}", stake_pool.staker)?;
        writeln!(f, "Reserve Stake: {}", stake_pool.reserve_stake)?;
        writeln!(f, "Pool Token Mint: {}", stake_pool.pool_mint)?;
        writeln!(f, "Manager Fee Account: {}", stake_pool.manager_fee_account)?;
        writeln!(f, "Epoch Fee: {}", stake_pool.epoch_fee)?;
        writeln!(f, "Stake Withdrawal Fee: {}", stake_pool.stake_withdrawal_fee)?;
        writeln!(f, "SOL Deposit Fee: {}", stake_pool.sol_deposit_fee)?;
        writeln!(f, "Last Update Epoch: {}", stake_pool.last_update_epoch)?;
        writeln!(
            f,
            "Total Pool Stake: ◎{}",
            lamports_to_sol(stake_pool.total_lamports)
        )?;
        writeln!(
            f,
            "Total Pool Tokens: {}",
            lamports_to_sol(stake_pool.pool_token_supply)
        )?;
        match stake_pool.share_price() {
            Ok(share_price) => writeln!(f, "Share Price: {}", share_price)?,
            Err(_) => writeln!(f, "Share Price: none, no pool tokens outstanding")?,
        }

        if let Some(access) = self.access {
            writeln!(f)?;
            writeln!(f, "Staker Program Owner: {}", access.owner)?;
            writeln!(f, "Stake Manager: {}", access.stake_manager)?;
            if let Some(pending_owner) = access.pending_owner {
                writeln!(f, "Pending Owner: {}", pending_owner)?;
            }
            writeln!(
                f,
                "Deposits: {}",
                if access.is_paused { "paused" } else { "open" }
            )?;
        }

        writeln!(f)?;
        writeln!(
            f,
            "Validators: {} of {}",
            self.validator_list.validators.len(),
            self.validator_list.header.max_validators
        )?;
        for validator in &self.validator_list.validators {
            writeln!(
                f,
                "Vote Account: {}\tActive: ◎{}\tTransient: ◎{}\tLast Update Epoch: {}",
                validator.vote_account_address,
                lamports_to_sol(validator.active_stake_lamports),
                lamports_to_sol(validator.transient_stake_lamports),
                validator.last_update_epoch,
            )?;
        }
        Ok(())
    }
}

pub(crate) struct CliWithdrawalPlan<'a>(pub(crate) &'a WithdrawalPlan);

impl fmt::Display for CliWithdrawalPlan<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let request = &self.0.request;
        writeln!(f, "Validator: {}", request.vote_account_address)?;
        writeln!(f, "Pool Tokens: {}", lamports_to_sol(request.pool_tokens))?;
        writeln!(f, "Share Price: {}", request.share_price)?;
        writeln!(
            f,
            "Expected Stake: ◎{}",
            lamports_to_sol(request.expected_lamports)
        )?;
        writeln!(
            f,
            "Minimum Stake Account Balance: ◎{}",
            lamports_to_sol(request.min_lamports_on_stake_account)
        )?;
        writeln!(f, "Withdrawal Fee: {}", request.withdrawal_fee)?;
        match (self.0.source, self.0.stake_account) {
            (Some(source), Some(stake_account)) => {
                let source = match source {
                    StakeSource::Validator => "validator",
                    StakeSource::Transient => "transient",
                    StakeSource::Reserve => "reserve",
                };
                write!(f, "Split From: {} stake account {}", source, stake_account)
            }
            _ => write!(f, "Split From: none available"),
        }
    }
}
