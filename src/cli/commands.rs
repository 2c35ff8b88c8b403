//! CLI command implementations

use anyhow::Result;
use dialoguer::{Confirm, Input};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::provider::{
    DryRunProvider, JsonRpcFactory, ProviderFactory, ProviderOptions, ProviderResult,
    WalletProvider,
};
use crate::session::{Notification, SessionManager};
use crate::shell::{render, PrimaryAction, TipForm};
use crate::units;

/// Provider factory for the selected mode
fn provider_factory(dry_run: bool) -> Box<dyn ProviderFactory> {
    if dry_run {
        Box::new(
            |options: &ProviderOptions| -> ProviderResult<Box<dyn WalletProvider>> {
                Ok(Box::new(DryRunProvider::from_options(options)))
            },
        )
    } else {
        Box::new(JsonRpcFactory)
    }
}

fn drain(notifications: &mut broadcast::Receiver<Notification>) {
    while let Ok(notification) = notifications.try_recv() {
        println!("{}", notification);
    }
}

/// Await a session operation unless the user hits Ctrl-C first
async fn interruptible<T>(
    manager: &SessionManager,
    operation: impl Future<Output = crate::Result<T>>,
) -> Option<crate::Result<T>> {
    tokio::select! {
        result = operation => Some(result),
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted - abandoning wallet request");
            manager.close();
            None
        }
    }
}

/// Interactive tipping session
pub async fn run(config: &Config, dry_run: bool) -> Result<()> {
    if dry_run {
        warn!("Running in DRY-RUN mode - tips go to a simulated wallet");
    }

    let manager = Arc::new(SessionManager::new(config.clone()));
    let mut notifications = manager.subscribe();
    let mut form = TipForm::new(&config.tip);

    if let Err(e) = manager.initialize(provider_factory(dry_run).as_ref()).await {
        println!("{}", render(&manager.snapshot().await, config));
        drain(&mut notifications);
        anyhow::bail!("{}", e);
    }

    loop {
        let snapshot = manager.snapshot().await;
        let view = render(&snapshot, config);
        println!("\n{}\n", view);
        drain(&mut notifications);

        let outcome = match view.primary {
            PrimaryAction::Unavailable => anyhow::bail!("Wallet is unavailable"),
            PrimaryAction::Connect { .. } => {
                if !Confirm::new()
                    .with_prompt("Connect wallet?")
                    .default(true)
                    .interact()?
                {
                    break;
                }
                interruptible(&manager, manager.connect())
                    .await
                    .map(|r| r.map(|_| ()))
            }
            PrimaryAction::CreateSubAccount { .. } => {
                if !Confirm::new()
                    .with_prompt("Create a sub-account for tipping?")
                    .default(true)
                    .interact()?
                {
                    break;
                }
                interruptible(&manager, manager.create_sub_account())
                    .await
                    .map(|r| r.map(|_| ()))
            }
            PrimaryAction::TipForm { .. } => {
                form.recipient = Input::<String>::new()
                    .with_prompt("Recipient Address")
                    .default(form.recipient.clone())
                    .interact_text()?;
                form.amount = Input::<String>::new()
                    .with_prompt(format!("Amount ({})", config.chain.native_symbol))
                    .default(form.amount.clone())
                    .interact_text()?;

                form.errors = Default::default();
                let sent =
                    interruptible(&manager, manager.send_tip(&form.recipient, &form.amount)).await;
                match sent {
                    Some(Ok(_)) => {
                        form.reset(&config.tip);
                        Some(Ok(()))
                    }
                    Some(Err(Error::Validation(fields))) => {
                        if let Some(msg) = &fields.recipient {
                            println!("Recipient Address: {}", msg);
                        }
                        if let Some(msg) = &fields.amount {
                            println!("Amount: {}", msg);
                        }
                        form.reject(fields);
                        Some(Ok(()))
                    }
                    Some(Err(e)) => Some(Err(e)),
                    None => None,
                }
            }
        };

        match outcome {
            None => break,
            Some(Ok(())) => {}
            Some(Err(e)) if e.is_recoverable() => debug!("Recoverable failure: {}", e),
            Some(Err(e)) => {
                error!("Session cannot continue: {}", e);
                drain(&mut notifications);
                return Err(e.into());
            }
        }

        if form.errors.is_empty()
            && matches!(view.primary, PrimaryAction::TipForm { .. })
            && !Confirm::new()
                .with_prompt("Send another tip?")
                .default(true)
                .interact()?
        {
            break;
        }
    }

    manager.close();
    println!("\n{}", render(&manager.snapshot().await, config));
    drain(&mut notifications);
    Ok(())
}

/// One-shot tip: connect, optionally create a sub-account, send
pub async fn tip(
    config: &Config,
    recipient: &str,
    amount: &str,
    create_sub_account: bool,
    dry_run: bool,
) -> Result<()> {
    // Reject bad input before touching the wallet
    let request = match config.validation_rules().validate(recipient, amount) {
        Ok(request) => request,
        Err(fields) => anyhow::bail!("Invalid tip: {}", fields),
    };

    if dry_run {
        warn!("Running in DRY-RUN mode - tips go to a simulated wallet");
    }

    let manager = SessionManager::new(config.clone());
    let mut notifications = manager.subscribe();

    let result = async {
        manager.initialize(provider_factory(dry_run).as_ref()).await?;

        let session = manager.connect().await?;
        if session.sub_account.is_none() {
            if !create_sub_account {
                anyhow::bail!(
                    "No sub-account for {}. Rerun with --create-sub-account",
                    config.app.origin
                );
            }
            manager.create_sub_account().await?;
        }

        let tip = manager
            .send_tip(request.recipient.as_str(), &request.amount)
            .await?;
        Ok::<_, anyhow::Error>(tip)
    }
    .await;

    drain(&mut notifications);
    let tip = result?;

    println!("\n=== TIP SENT ===");
    println!("Amount: {} {}", tip.amount, config.chain.native_symbol);
    println!("To: {}", tip.recipient);
    println!("From sub-account: {}", tip.from);
    println!("Request ID: {}", tip.request_id);
    println!(
        "View on {}: {}",
        config.chain.explorer_name,
        tip.explorer_url(&config.chain)
    );

    info!("Tip {} complete", tip.request_id);
    Ok(())
}

/// Offline validation report
pub fn validate(config: &Config, recipient: &str, amount: &str) -> Result<()> {
    match config.validation_rules().validate(recipient, amount) {
        Ok(request) => {
            let value = units::parse_units(&request.amount, config.chain.decimals)?;
            println!("Recipient: {} (ok)", request.recipient);
            println!(
                "Amount: {} {} = {} smallest units ({})",
                request.amount,
                config.chain.native_symbol,
                value,
                units::to_hex_quantity(value)
            );
            Ok(())
        }
        Err(fields) => {
            if let Some(msg) = &fields.recipient {
                println!("Recipient: {}", msg);
            }
            if let Some(msg) = &fields.amount {
                println!("Amount: {}", msg);
            }
            anyhow::bail!("Validation failed")
        }
    }
}

pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}
