//! Interactive settings menu (`--verbose`).

use crate::chain::ChainClient;
use crate::config::{lamports_to_sol, Policy, PolicyStore};
use crate::orchestrator::DailyOperations;
use crate::wallet::WalletIdentity;
use anyhow::Result;
use colored::Colorize;
use core_logic::{DatabaseManager, WalletSecret};
use dialoguer::{theme::ColorfulTheme, Input, Select};
use std::str::FromStr;
use std::sync::Arc;

const ITEMS: [&str; 9] = [
    "Set daily run window (UTC)",
    "Set transaction count range",
    "Set delay range (ms)",
    "Set amount range (SOL)",
    "Set minimum wallet balance (SOL)",
    "Toggle daily timer",
    "Show wallet balances",
    "Run daily operations now",
    "Exit",
];

pub struct Menu<'a, S: PolicyStore> {
    store: &'a S,
    policy: Policy,
    secrets: &'a [WalletSecret],
    chain: Arc<dyn ChainClient>,
    daily: Arc<dyn DailyOperations>,
    db: Option<Arc<DatabaseManager>>,
    theme: ColorfulTheme,
}

fn ask<T>(theme: &ColorfulTheme, prompt: &str, current: T) -> Result<T>
where
    T: Clone + ToString + FromStr,
    <T as FromStr>::Err: ToString + std::fmt::Debug,
{
    Ok(Input::with_theme(theme)
        .with_prompt(prompt)
        .default(current)
        .interact_text()?)
}

impl<'a, S: PolicyStore> Menu<'a, S> {
    pub fn new(
        store: &'a S,
        policy: Policy,
        secrets: &'a [WalletSecret],
        chain: Arc<dyn ChainClient>,
        daily: Arc<dyn DailyOperations>,
    ) -> Self {
        Self {
            store,
            policy,
            secrets,
            chain,
            daily,
            db: None,
            theme: ColorfulTheme::default(),
        }
    }

    /// Adds lifetime transfer totals to the balances view.
    pub fn with_database(mut self, db: Option<Arc<DatabaseManager>>) -> Self {
        self.db = db;
        self
    }

    async fn history(&self, address: &str) -> Option<String> {
        let db = self.db.as_ref()?;
        match db.get_transfer_totals(address).await {
            Ok(totals) => Some(format!(
                "{} sent / {} attempts, {:.6} SOL out",
                totals.sent,
                totals.attempts,
                lamports_to_sol(totals.lamports_sent)
            )),
            Err(e) => Some(format!("history unavailable: {:#}", e)),
        }
    }

    fn print_policy(&self) {
        let p = &self.policy;
        println!("\n{}", "Current settings".bold().cyan());
        println!(
            "  Run window:      {:02}:{:02} - {:02}:{:02} UTC",
            p.execution_hour_min, p.execution_minute, p.execution_hour_max, p.execution_minute
        );
        println!("  Transactions:    {} - {}", p.min_tx_count, p.max_tx_count);
        println!("  Delay:           {} - {} ms", p.min_delay_ms, p.max_delay_ms);
        println!("  Amount:          {} - {} SOL", p.min_amount, p.max_amount);
        println!("  Min balance:     {} SOL", p.min_wallet_balance);
        let timer = if p.daily_timer_enabled {
            "on".green()
        } else {
            "off".yellow()
        };
        println!("  Daily timer:     {}\n", timer);
    }

    fn apply<F: FnOnce(&mut Policy)>(&mut self, edit: F) {
        match self.store.update(&mut self.policy, edit) {
            Ok(()) => println!("{}", "Saved.".green()),
            Err(e) => println!("{} {}", "Not saved:".red(), e),
        }
    }

    /// Returns when the operator picks "Exit".
    pub async fn run(mut self) -> Result<()> {
        loop {
            self.print_policy();
            let choice = Select::with_theme(&self.theme)
                .with_prompt("Choose an option")
                .items(&ITEMS)
                .default(0)
                .interact()?;

            match choice {
                0 => {
                    let p = self.policy.clone();
                    let from = ask(&self.theme, "First hour (0-23)", p.execution_hour_min)?;
                    let to = ask(&self.theme, "Last hour (0-23)", p.execution_hour_max)?;
                    let minute = ask(&self.theme, "Minute (0-59)", p.execution_minute)?;
                    self.apply(|p| {
                        p.execution_hour_min = from;
                        p.execution_hour_max = to;
                        p.execution_minute = minute;
                    });
                }
                1 => {
                    let p = self.policy.clone();
                    let min = ask(&self.theme, "Minimum transactions", p.min_tx_count)?;
                    let max = ask(&self.theme, "Maximum transactions", p.max_tx_count)?;
                    self.apply(|p| {
                        p.min_tx_count = min;
                        p.max_tx_count = max;
                    });
                }
                2 => {
                    let p = self.policy.clone();
                    let min = ask(&self.theme, "Minimum delay (ms)", p.min_delay_ms)?;
                    let max = ask(&self.theme, "Maximum delay (ms)", p.max_delay_ms)?;
                    self.apply(|p| {
                        p.min_delay_ms = min;
                        p.max_delay_ms = max;
                    });
                }
                3 => {
                    let p = self.policy.clone();
                    let min = ask(&self.theme, "Minimum amount (SOL)", p.min_amount)?;
                    let max = ask(&self.theme, "Maximum amount (SOL)", p.max_amount)?;
                    self.apply(|p| {
                        p.min_amount = min;
                        p.max_amount = max;
                    });
                }
                4 => {
                    let current = self.policy.min_wallet_balance;
                    let min = ask(&self.theme, "Minimum wallet balance (SOL)", current)?;
                    self.apply(|p| p.min_wallet_balance = min);
                }
                5 => self.apply(|p| p.daily_timer_enabled = !p.daily_timer_enabled),
                6 => self.show_balances().await,
                7 => {
                    if let Err(e) = self.daily.run_daily_operations().await {
                        println!("{} {:#}", "Daily operations failed:".red(), e);
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    async fn show_balances(&self) {
        println!("\n{}", "Wallet balances".bold().cyan());
        for (index, secret) in self.secrets.iter().enumerate() {
            let wallet = match WalletIdentity::derive(index, secret) {
                Ok(wallet) => wallet,
                Err(e) => {
                    println!("  {:>3}. {}", index + 1, e.to_string().red());
                    continue;
                }
            };
            let address = wallet.address();
            match self.chain.get_balance(&address).await {
                Ok(lamports) => {
                    let sol = lamports_to_sol(lamports);
                    let shown = format!("{:.6} SOL", sol);
                    let shown = if sol < self.policy.min_wallet_balance {
                        shown.yellow()
                    } else {
                        shown.green()
                    };
                    println!("  {:>3}. {}  {}", index + 1, address, shown);
                }
                Err(e) => println!("  {:>3}. {}  {}", index + 1, address, format!("{:#}", e).red()),
            }
            if let Some(history) = self.history(&address.to_string()).await {
                println!("       {}", history.dimmed());
            }
        }
    }
}
