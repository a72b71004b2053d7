mod output;

use {
    crate::output::{CliStakePool, CliWithdrawalPlan},
    clap::{crate_description, crate_name, crate_version, Arg, ArgMatches, Command},
    liquid_staking_client::{
        client::StakingClient,
        config::PoolConfig,
        error::{StakerError, StakingClientError},
        instruction,
        state::WhitelistUserStatus,
    },
    log::debug,
    solana_clap_v3_utils::{
        input_parsers::{pubkey_of, pubkey_of_signer},
        input_validators::{
            is_url_or_moniker, is_valid_pubkey, is_valid_signer, normalize_to_url_if_moniker,
        },
        keypair::DefaultSigner,
    },
    solana_client::{client_error::ClientError, nonblocking::rpc_client::RpcClient},
    solana_remote_wallet::remote_wallet::RemoteWalletManager,
    solana_sdk::{
        commitment_config::CommitmentConfig,
        instruction::Instruction,
        native_token::{lamports_to_sol, sol_to_lamports},
        pubkey::Pubkey,
        signature::{Keypair, Signature, Signer},
        stake::state::StakeStateV2,
        transaction::Transaction,
    },
    std::{error::Error, process::exit, rc::Rc, str::FromStr},
    strum_macros::{EnumString, IntoStaticStr},
};

type CommandResult = Result<(), Box<dyn Error>>;

struct Config {
    commitment_config: CommitmentConfig,
    default_signer: Box<dyn Signer>,
    json_rpc_url: String,
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
enum CommandName {
    Show,
    Deposit,
    DepositToValidator,
    WithdrawStake,
    Whitelist,
    Blacklist,
    ClearUserStatus,
    UserStatus,
    Pause,
    Unpause,
}

impl CommandName {
    fn name(self) -> &'static str {
        self.into()
    }
}

fn is_positive_amount(amount: &str) -> Result<(), String> {
    match amount.parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount > 0.0 => Ok(()),
        Ok(_) => Err(format!("Amount must be greater than zero: {}", amount)),
        Err(_) => Err(format!("Unable to parse input amount: {}", amount)),
    }
}

fn amount_of(matches: &ArgMatches, name: &str) -> Result<u64, Box<dyn Error>> {
    let amount = matches.value_of_t::<f64>(name)?;
    match sol_to_lamports(amount) {
        0 => Err(StakingClientError::InvalidAmount.into()),
        lamports => Ok(lamports),
    }
}

fn required_pubkey(matches: &ArgMatches, name: &str) -> Result<Pubkey, Box<dyn Error>> {
    pubkey_of(matches, name).ok_or_else(|| format!("Missing {}", name).into())
}

fn pool_config(matches: &ArgMatches) -> PoolConfig {
    let default = PoolConfig::default();
    PoolConfig {
        stake_pool_program_id: pubkey_of(matches, "stake_pool_program_id")
            .unwrap_or(default.stake_pool_program_id),
        staker_program_id: pubkey_of(matches, "staker_program_id")
            .unwrap_or(default.staker_program_id),
        stake_pool: pubkey_of(matches, "stake_pool").unwrap_or(default.stake_pool),
        deposit_authority: pubkey_of(matches, "deposit_authority")
            .unwrap_or(default.deposit_authority),
        ..default
    }
}

fn explain_client_error(error: ClientError) -> Box<dyn Error> {
    match error
        .get_transaction_error()
        .as_ref()
        .and_then(StakerError::from_transaction_error)
    {
        Some(staker_error) => format!("Staker program error: {}", staker_error).into(),
        None => error.into(),
    }
}

async fn send_transaction(
    config: &Config,
    rpc_client: &RpcClient,
    instructions: &[Instruction],
    extra_signers: &[&dyn Signer],
) -> Result<Option<Signature>, Box<dyn Error>> {
    let mut signers: Vec<&dyn Signer> = vec![&*config.default_signer];
    signers.extend_from_slice(extra_signers);

    let recent_blockhash = rpc_client.get_latest_blockhash().await?;
    let mut transaction =
        Transaction::new_with_payer(instructions, Some(&config.default_signer.pubkey()));
    transaction.try_sign(&signers, recent_blockhash)?;

    if config.dry_run {
        let result = rpc_client.simulate_transaction(&transaction).await?;
        println!("Simulation: {:?}", result.value);
        return Ok(None);
    }

    debug!("Sending transaction with {} instructions", instructions.len());
    let signature = rpc_client
        .send_and_confirm_transaction_with_spinner(&transaction)
        .await
        .map_err(explain_client_error)?;
    println!("Signature: {}", signature);
    Ok(Some(signature))
}

async fn command_show(client: &StakingClient<RpcClient>) -> CommandResult {
    let stake_pool = client.fetch_stake_pool().await?;
    let validator_list = client
        .fetch_validator_list(&stake_pool.validator_list)
        .await?;
    let access = match client.fetch_access().await {
        Ok(access) => Some(access),
        Err(StakingClientError::AccountNotFound(_)) => None,
        Err(e) => return Err(e.into()),
    };

    println!(
        "{}",
        CliStakePool {
            address: client.config().stake_pool,
            stake_pool: &stake_pool,
            validator_list: &validator_list,
            access: access.as_ref(),
        }
    );
    Ok(())
}

async fn command_deposit(
    config: &Config,
    client: &StakingClient<RpcClient>,
    vote_account_address: Option<&Pubkey>,
    referrer: Option<&Pubkey>,
    lamports: u64,
) -> CommandResult {
    let user = config.default_signer.pubkey();
    let stake_pool = client.fetch_stake_pool().await?;
    let pool_config = client.config();

    let balance = client.ledger().get_balance(&user).await?;
    if balance < lamports {
        return Err(format!(
            "Insufficient balance: ◎{} required, ◎{} available",
            lamports_to_sol(lamports),
            lamports_to_sol(balance)
        )
        .into());
    }

    let mut instructions = vec![];
    if !client.pool_token_account_exists(&stake_pool, &user).await? {
        println!(
            "Creating pool token account {}",
            instruction::pool_token_address(&stake_pool, &user)
        );
        instructions.push(instruction::create_pool_token_account(&stake_pool, &user));
    }

    match vote_account_address {
        Some(vote_account_address) => {
            println!(
                "Depositing ◎{} to validator {}",
                lamports_to_sol(lamports),
                vote_account_address
            );
            instructions.push(instruction::deposit_to_specific_validator(
                pool_config,
                &stake_pool,
                &user,
                vote_account_address,
                referrer,
                lamports,
            ));
        }
        None => {
            println!("Depositing ◎{}", lamports_to_sol(lamports));
            instructions.push(instruction::deposit(
                pool_config,
                &stake_pool,
                &user,
                referrer,
                lamports,
            ));
        }
    }

    send_transaction(config, client.ledger(), &instructions, &[]).await?;
    Ok(())
}

async fn command_withdraw_stake(
    config: &Config,
    client: &StakingClient<RpcClient>,
    vote_account_address: &Pubkey,
    pool_tokens: u64,
) -> CommandResult {
    let user = config.default_signer.pubkey();
    let plan = match client.plan_withdrawal(vote_account_address, pool_tokens).await {
        Ok(plan) => plan,
        Err(StakingClientError::WithdrawalTooSmall(too_small)) => {
            let mut message = format!(
                "Withdrawal amount too low: expected ◎{}, minimum ◎{} before fees",
                lamports_to_sol(too_small.expected_lamports),
                lamports_to_sol(too_small.minimum_lamports),
            );
            if let Some(minimum_pool_tokens) = too_small.minimum_pool_tokens {
                message.push_str(&format!(
                    ", at least {} pool tokens",
                    lamports_to_sol(minimum_pool_tokens)
                ));
            }
            return Err(message.into());
        }
        Err(e) => return Err(e.into()),
    };
    println!("{}", CliWithdrawalPlan(&plan));

    let stake_to_split = plan.stake_account.ok_or(
        "No stake account can serve this withdrawal yet, try again later or pick another validator",
    )?;

    let stake_receiver = Keypair::new();
    let rent = client
        .ledger()
        .get_minimum_balance_for_rent_exemption(StakeStateV2::size_of())
        .await?;
    println!(
        "Withdrawing {} pool tokens into new stake account {}",
        lamports_to_sol(pool_tokens),
        stake_receiver.pubkey()
    );

    let instructions = [
        instruction::create_stake_account(&user, &stake_receiver.pubkey(), rent),
        instruction::withdraw_stake(
            client.config(),
            &plan.stake_pool,
            &stake_to_split,
            &stake_receiver.pubkey(),
            &user,
            pool_tokens,
        ),
    ];
    send_transaction(config, client.ledger(), &instructions, &[&stake_receiver]).await?;
    Ok(())
}

async fn command_set_user_status(
    config: &Config,
    client: &StakingClient<RpcClient>,
    user: &Pubkey,
    status: WhitelistUserStatus,
) -> CommandResult {
    let agent = config.default_signer.pubkey();
    let current = client.fetch_user_status(user).await?.status;
    if current == status {
        println!("User {} is already {:?}", user, status);
        return Ok(());
    }

    let pool_config = client.config();
    let instruction = match status {
        WhitelistUserStatus::Whitelisted => {
            instruction::add_user_to_whitelist(pool_config, &agent, user)
        }
        WhitelistUserStatus::Blacklisted => {
            instruction::add_user_to_blacklist(pool_config, &agent, user)
        }
        WhitelistUserStatus::None => instruction::clear_user_status(pool_config, &agent, user),
    };
    println!("Setting user {} from {:?} to {:?}", user, current, status);
    send_transaction(config, client.ledger(), &[instruction], &[]).await?;
    Ok(())
}

async fn command_user_status(client: &StakingClient<RpcClient>, user: &Pubkey) -> CommandResult {
    let status = client.fetch_user_status(user).await?;
    println!("User: {}", user);
    println!("Status: {:?}", status.status);
    Ok(())
}

async fn command_set_paused(
    config: &Config,
    client: &StakingClient<RpcClient>,
    paused: bool,
) -> CommandResult {
    let owner = config.default_signer.pubkey();
    let access = client.fetch_access().await?;
    if access.is_paused == paused {
        println!(
            "Deposits are already {}",
            if paused { "paused" } else { "open" }
        );
        return Ok(());
    }
    if access.owner != owner {
        eprintln!(
            "Warning: {} is not the staker program owner {}",
            owner, access.owner
        );
    }

    let instruction = if paused {
        instruction::pause(client.config(), &owner)
    } else {
        instruction::unpause(client.config(), &owner)
    };
    send_transaction(config, client.ledger(), &[instruction], &[]).await?;
    Ok(())
}

fn app<'a>(default_config_file: Option<&'a str>) -> Command<'a> {
    let user_arg = Arg::new("user")
        .value_name("USER_ADDRESS")
        .validator(|s| is_valid_pubkey(s))
        .takes_value(true)
        .required(true)
        .index(1)
        .help("User wallet address");
    let vote_arg = Arg::new("vote_account")
        .value_name("VOTE_ACCOUNT_ADDRESS")
        .validator(|s| is_valid_pubkey(s))
        .takes_value(true)
        .required(true)
        .index(1)
        .help("Vote account of the validator");
    let referrer_arg = Arg::new("referrer")
        .long("referrer")
        .value_name("ADDRESS")
        .validator(|s| is_valid_pubkey(s))
        .takes_value(true)
        .help("Pool token account to receive the referral fees. Defaults to the depositor's pool token account");

    Command::new(crate_name!())
        .about(crate_description!())
        .version(crate_version!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg({
            let arg = Arg::new("config_file")
                .short('C')
                .long("config")
                .value_name("PATH")
                .takes_value(true)
                .global(true)
                .help("Configuration file to use");
            if let Some(config_file) = default_config_file {
                arg.default_value(config_file)
            } else {
                arg
            }
        })
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .takes_value(false)
                .global(true)
                .help("Show additional information"),
        )
        .arg(
            Arg::new("dry_run")
                .long("dry-run")
                .takes_value(false)
                .global(true)
                .help("Simulate transactions instead of executing them"),
        )
        .arg(
            Arg::new("json_rpc_url")
                .short('u')
                .long("url")
                .value_name("URL_OR_MONIKER")
                .takes_value(true)
                .global(true)
                .validator(|s| is_url_or_moniker(s))
                .help(
                    "URL for Solana's JSON RPC or moniker (or their first letter): \
                       [mainnet-beta, testnet, devnet, localhost]",
                ),
        )
        .arg(
            Arg::new("keypair")
                .short('k')
                .long("keypair")
                .value_name("KEYPAIR")
                .validator(|s| is_valid_signer(s))
                .takes_value(true)
                .global(true)
                .help("Signer of transactions and owner of deposited funds [default: cli config keypair]"),
        )
        .arg(
            Arg::new("stake_pool")
                .long("stake-pool")
                .value_name("ADDRESS")
                .validator(|s| is_valid_pubkey(s))
                .takes_value(true)
                .global(true)
                .env("STAKE_POOL_ACCOUNT")
                .help("Stake pool account [default: mainnet pool]"),
        )
        .arg(
            Arg::new("stake_pool_program_id")
                .long("stake-pool-program-id")
                .value_name("ADDRESS")
                .validator(|s| is_valid_pubkey(s))
                .takes_value(true)
                .global(true)
                .env("STAKE_POOL_PROGRAM_ID")
                .help("Stake pool program id"),
        )
        .arg(
            Arg::new("staker_program_id")
                .long("staker-program-id")
                .value_name("ADDRESS")
                .validator(|s| is_valid_pubkey(s))
                .takes_value(true)
                .global(true)
                .env("STAKER_PROGRAM_ID")
                .help("Staker program id"),
        )
        .arg(
            Arg::new("deposit_authority")
                .long("deposit-authority")
                .value_name("ADDRESS")
                .validator(|s| is_valid_pubkey(s))
                .takes_value(true)
                .global(true)
                .env("DEPOSIT_AUTHORITY")
                .help("SOL deposit authority of the stake pool"),
        )
        .subcommand(
            Command::new(CommandName::Show.name())
                .about("Show the stake pool, its share price, fees and validators"),
        )
        .subcommand(
            Command::new(CommandName::Deposit.name())
                .about("Deposit SOL into the pool reserve in exchange for pool tokens")
                .arg(
                    Arg::new("amount")
                        .value_name("AMOUNT")
                        .validator(is_positive_amount)
                        .takes_value(true)
                        .required(true)
                        .index(1)
                        .help("Amount in SOL to deposit"),
                )
                .arg(referrer_arg.clone()),
        )
        .subcommand(
            Command::new(CommandName::DepositToValidator.name())
                .about("Deposit SOL and delegate it to one validator of the pool")
                .arg(vote_arg.clone())
                .arg(
                    Arg::new("amount")
                        .value_name("AMOUNT")
                        .validator(is_positive_amount)
                        .takes_value(true)
                        .required(true)
                        .index(2)
                        .help("Amount in SOL to deposit"),
                )
                .arg(referrer_arg),
        )
        .subcommand(
            Command::new(CommandName::WithdrawStake.name())
                .about("Burn pool tokens for a stake account split from the pool")
                .arg(vote_arg)
                .arg(
                    Arg::new("amount")
                        .value_name("AMOUNT")
                        .validator(is_positive_amount)
                        .takes_value(true)
                        .required(true)
                        .index(2)
                        .help("Amount of pool tokens to withdraw"),
                ),
        )
        .subcommand(
            Command::new(CommandName::Whitelist.name())
                .about("Allow a user to deposit. Requires an agent keypair")
                .arg(user_arg.clone()),
        )
        .subcommand(
            Command::new(CommandName::Blacklist.name())
                .about("Bar a user from depositing. Requires an agent keypair")
                .arg(user_arg.clone()),
        )
        .subcommand(
            Command::new(CommandName::ClearUserStatus.name())
                .about("Reset a user to no status. Requires an agent keypair")
                .arg(user_arg.clone()),
        )
        .subcommand(
            Command::new(CommandName::UserStatus.name())
                .about("Show the whitelist status of a user")
                .arg(user_arg),
        )
        .subcommand(
            Command::new(CommandName::Pause.name())
                .about("Pause deposits. Requires the owner keypair"),
        )
        .subcommand(
            Command::new(CommandName::Unpause.name())
                .about("Resume deposits. Requires the owner keypair"),
        )
}

#[tokio::main]
async fn main() -> CommandResult {
    let default_config_file = solana_cli_config::CONFIG_FILE.as_ref();
    let app_matches = app(default_config_file.map(String::as_str)).get_matches();

    let (command, matches) = app_matches
        .subcommand()
        .ok_or("No command given")?;
    let command = CommandName::from_str(command)?;
    let mut wallet_manager: Option<Rc<RemoteWalletManager>> = None;

    let config = {
        let cli_config = if let Some(config_file) = matches.value_of("config_file") {
            solana_cli_config::Config::load(config_file).unwrap_or_default()
        } else {
            solana_cli_config::Config::default()
        };

        let default_signer = DefaultSigner::new(
            "keypair",
            matches
                .value_of("keypair")
                .map(|s| s.to_string())
                .unwrap_or_else(|| cli_config.keypair_path.clone()),
        );

        let json_rpc_url = normalize_to_url_if_moniker(
            matches
                .value_of("json_rpc_url")
                .unwrap_or(&cli_config.json_rpc_url),
        );

        Config {
            commitment_config: CommitmentConfig::confirmed(),
            default_signer: default_signer
                .signer_from_path(matches, &mut wallet_manager)
                .unwrap_or_else(|err| {
                    eprintln!("error: {}", err);
                    exit(1);
                }),
            json_rpc_url,
            dry_run: matches.is_present("dry_run"),
        }
    };

    if matches.is_present("verbose") {
        solana_logger::setup_with_default(
            "solana=debug,liquid_staking_client=debug,liquid_staking=debug",
        );
    } else {
        solana_logger::setup_with_default(
            "solana=info,liquid_staking_client=info,liquid_staking=info",
        );
    }

    let pool_config = pool_config(matches);
    debug!("JSON RPC URL: {}", config.json_rpc_url);
    debug!("Pool configuration: {:?}", pool_config);

    let rpc_client =
        RpcClient::new_with_commitment(config.json_rpc_url.clone(), config.commitment_config);
    let client = StakingClient::new(rpc_client, pool_config);

    match command {
        CommandName::Show => command_show(&client).await,
        CommandName::Deposit => {
            let amount = amount_of(matches, "amount")?;
            let referrer = pubkey_of(matches, "referrer");
            command_deposit(&config, &client, None, referrer.as_ref(), amount).await
        }
        CommandName::DepositToValidator => {
            let vote_account_address = required_pubkey(matches, "vote_account")?;
            let amount = amount_of(matches, "amount")?;
            let referrer = pubkey_of(matches, "referrer");
            command_deposit(
                &config,
                &client,
                Some(&vote_account_address),
                referrer.as_ref(),
                amount,
            )
            .await
        }
        CommandName::WithdrawStake => {
            let vote_account_address = required_pubkey(matches, "vote_account")?;
            let pool_tokens = amount_of(matches, "amount")?;
            command_withdraw_stake(&config, &client, &vote_account_address, pool_tokens).await
        }
        CommandName::Whitelist | CommandName::Blacklist | CommandName::ClearUserStatus => {
            let user = pubkey_of_signer(matches, "user", &mut wallet_manager)?
                .ok_or("Missing user")?;
            let status = match command {
                CommandName::Whitelist => WhitelistUserStatus::Whitelisted,
                CommandName::Blacklist => WhitelistUserStatus::Blacklisted,
                _ => WhitelistUserStatus::None,
            };
            command_set_user_status(&config, &client, &user, status).await
        }
        CommandName::UserStatus => {
            let user = pubkey_of_signer(matches, "user", &mut wallet_manager)?
                .ok_or("Missing user")?;
            command_user_status(&client, &user).await
        }
        CommandName::Pause => command_set_paused(&config, &client, true).await,
        CommandName::Unpause => command_set_paused(&config, &client, false).await,
    }
}
