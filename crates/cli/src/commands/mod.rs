//! Command implementations.

pub mod account;
pub mod admin;
pub mod chat;
pub mod shop;
pub mod subscribe;

use std::path::Path;
use std::sync::Arc;

use lumina_core::PaymentId;
use lumina_storefront::auth::{BackendVerifier, CredentialVerifier, LocalVerifier};
use lumina_storefront::backend::BackendClient;
use lumina_storefront::checkout::CheckoutOrchestrator;
use lumina_storefront::gateway::{ChannelGateway, PaymentPrompt};
use lumina_storefront::session::{FileStateStore, SessionManager};
use lumina_storefront::{StorefrontConfig, StorefrontError};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Shared handles for every command.
pub struct Context {
    pub config: StorefrontConfig,
    pub backend: BackendClient,
    pub sessions: SessionManager,
}

impl Context {
    /// Build clients from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the local
    /// accounts file cannot be read.
    pub async fn new(
        config: StorefrontConfig,
        local_accounts: Option<&Path>,
    ) -> Result<Self, StorefrontError> {
        let backend = BackendClient::new(&config.backend)?;

        let verifier: Arc<dyn CredentialVerifier> = match local_accounts {
            Some(path) => {
                let verifier = LocalVerifier::load(path).await?;
                tracing::info!(accounts = verifier.len(), "Using local accounts");
                Arc::new(verifier)
            }
            None => Arc::new(BackendVerifier::new(backend.clone())),
        };
        let store = Arc::new(FileStateStore::new(&config.state_path));

        Ok(Self {
            sessions: SessionManager::new(store, verifier),
            backend,
            config,
        })
    }

    /// An orchestrator wired to a terminal payment prompt.
    pub fn orchestrator(&self, answer: Option<PaymentAnswer>) -> (CheckoutOrchestrator, JoinHandle<()>) {
        let (gateway, prompts) = ChannelGateway::new(1);
        let ui = tokio::spawn(terminal_payment_ui(prompts, answer));
        let orchestrator = CheckoutOrchestrator::new(
            Arc::new(self.backend.clone()),
            Arc::new(gateway),
            &self.config.checkout,
        );
        (orchestrator, ui)
    }
}

/// A payment id supplied up front instead of typed at the prompt.
#[derive(Debug, Clone)]
pub struct PaymentAnswer {
    pub id: String,
    pub signature: Option<String>,
}

/// Line reader over stdin.
pub fn stdin_lines() -> Lines<BufReader<Stdin>> {
    BufReader::new(tokio::io::stdin()).lines()
}

/// Resolve payment prompts from the terminal.
///
/// Entering a payment id confirms the payment, `fail <reason>` declines it,
/// and a blank line or end of input cancels.
#[allow(clippy::print_stdout)]
async fn terminal_payment_ui(mut prompts: mpsc::Receiver<PaymentPrompt>, answer: Option<PaymentAnswer>) {
    let mut lines = stdin_lines();

    while let Some(prompt) = prompts.recv().await {
        let config = prompt.config();
        println!();
        println!("== {} ==", config.merchant.name);
        println!("{}", config.merchant.description);
        println!("Order:  {}", config.order_id);
        println!("Amount: {} {} (minor units)", config.amount, config.currency);
        println!("Payer:  {} <{}> {}", config.prefill.name, config.prefill.email, config.prefill.contact);

        if let Some(answer) = &answer {
            match PaymentId::parse(&answer.id) {
                Some(id) => confirm(prompt, id, answer.signature.clone()),
                None => prompt.cancel(),
            }
            continue;
        }

        println!("Enter payment id to confirm, `fail <reason>` to decline, blank to cancel:");
        let line = lines.next_line().await.ok().flatten().unwrap_or_default();
        let line = line.trim();

        if let Some(reason) = line.strip_prefix("fail") {
            let reason = reason.trim();
            prompt.fail(if reason.is_empty() { "payment declined" } else { reason });
        } else {
            match PaymentId::parse(line) {
                Some(id) => confirm(prompt, id, None),
                None => prompt.cancel(),
            }
        }
    }
}

/// Confirm a payment, warning the customer if the checkout already gave up.
#[allow(clippy::print_stdout)]
fn confirm(prompt: PaymentPrompt, id: PaymentId, signature: Option<String>) {
    let shown = id.to_string();
    if !prompt.succeed(id, signature) {
        println!("{}", late_payment_message(&shown));
    }
}

fn late_payment_message(payment_id: &str) -> String {
    format!(
        "Payment {payment_id} arrived after checkout timed out and was not recorded. \
         Please contact support with this payment id."
    )
}

/// Read one line from stdin, `None` at end of input.
pub async fn read_line(lines: &mut Lines<BufReader<Stdin>>) -> Option<String> {
    lines.next_line().await.ok().flatten()
}

/// Print the user-facing message for a failed command.
#[allow(clippy::print_stderr)]
pub fn report_failure(err: &StorefrontError) {
    eprintln!("Error: {}", err.user_message());
    tracing::debug!(error = %err, "Command failed");
}
