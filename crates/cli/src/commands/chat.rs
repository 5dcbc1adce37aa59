//! Interactive support chat.

use lumina_storefront::StorefrontError;
use lumina_storefront::chat::{ChatConversation, GREETING};

use super::{Context, read_line, stdin_lines};

/// Chat until `exit` or end of input.
///
/// # Errors
///
/// Returns an error if the local state cannot be read.
#[allow(clippy::print_stdout)]
pub async fn run(ctx: &Context) -> Result<(), StorefrontError> {
    let email = ctx.sessions.current().await?.map(|session| session.email);
    let mut conversation =
        ChatConversation::new(ctx.backend.clone(), ctx.config.chat_model.clone(), email);

    println!("{GREETING}");
    println!("(type `exit` to leave)");

    let mut lines = stdin_lines();
    while let Some(line) = read_line(&mut lines).await {
        let input = line.trim();
        if input.eq_ignore_ascii_case("exit") {
            break;
        }
        if let Some(reply) = conversation.send(input).await {
            println!("{reply}");
        }
    }
    Ok(())
}
