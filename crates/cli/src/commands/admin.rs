//! Admin console commands.
//!
//! Both commands require a logged-in session with the admin role.

use lumina_core::UserRole;
use lumina_storefront::StorefrontError;
use lumina_storefront::auth::require_role;

use super::Context;

async fn require_admin(ctx: &Context) -> Result<(), StorefrontError> {
    let current = ctx.sessions.current().await?;
    let session = require_role(current.as_ref(), UserRole::Admin)?;
    tracing::debug!(email = %session.email, "Admin access granted");
    Ok(())
}

/// List registered users.
///
/// # Errors
///
/// Returns an error if the caller is not an admin or the backend call fails.
#[allow(clippy::print_stdout)]
pub async fn users(ctx: &Context) -> Result<(), StorefrontError> {
    require_admin(ctx).await?;

    let users = ctx.backend.list_users().await?;
    if users.is_empty() {
        println!("No users");
        return Ok(());
    }

    println!("NAME                         EMAIL                            PHONE            SUBSCRIPTION");
    for user in &users {
        println!(
            "{:<28} {:<32} {:<16} {}",
            user.name.as_deref().unwrap_or("-"),
            user.email,
            user.phone.as_deref().unwrap_or("-"),
            user.subscription_status.as_deref().unwrap_or("-"),
        );
    }
    println!("{} user(s)", users.len());
    Ok(())
}

/// Ask the analytics endpoint a question.
///
/// # Errors
///
/// Returns an error if the caller is not an admin, the query is blank, or the
/// backend call fails.
#[allow(clippy::print_stdout)]
pub async fn analyze(ctx: &Context, query: &str) -> Result<(), StorefrontError> {
    require_admin(ctx).await?;

    let query = query.trim();
    if query.is_empty() {
        return Err(StorefrontError::Input("query is empty".to_string()));
    }

    let analysis = ctx.backend.admin_analyze(query).await?;
    println!("{analysis}");
    Ok(())
}
