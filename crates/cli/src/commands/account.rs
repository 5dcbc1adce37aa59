//! Login, logout, and profile commands.

use lumina_core::Email;
use lumina_storefront::StorefrontError;
use lumina_storefront::auth::AuthError;

use super::{Context, read_line, stdin_lines};

/// Log in, prompting for the password when it was not passed.
///
/// # Errors
///
/// Returns an error for invalid credentials or if the session cannot be saved.
#[allow(clippy::print_stdout)]
pub async fn login(
    ctx: &Context,
    email: &str,
    password: Option<String>,
) -> Result<(), StorefrontError> {
    let password = match password {
        Some(password) => password,
        None => {
            println!("Password:");
            read_line(&mut stdin_lines()).await.unwrap_or_default()
        }
    };

    let session = ctx.sessions.login(email, password.trim_end()).await?;
    println!("Logged in as {} ({})", session.name, session.role);
    Ok(())
}

/// Log out. The cart is kept.
///
/// # Errors
///
/// Returns an error if the local state cannot be written.
#[allow(clippy::print_stdout)]
pub async fn logout(ctx: &Context) -> Result<(), StorefrontError> {
    if ctx.sessions.logout().await? {
        println!("Logged out");
    } else {
        println!("Not logged in");
    }
    Ok(())
}

/// Show the logged-in user.
///
/// # Errors
///
/// Returns an error if the local state cannot be read.
#[allow(clippy::print_stdout)]
pub async fn whoami(ctx: &Context) -> Result<(), StorefrontError> {
    match ctx.sessions.current().await? {
        Some(session) => {
            println!("{} <{}>", session.name, session.email);
            println!("Role:  {}", session.role);
            if let Some(id) = session.user_id {
                println!("ID:    {id}");
            }
            println!("Since: {}", session.created_at.format("%Y-%m-%d %H:%M UTC"));
        }
        None => println!("Not logged in"),
    }
    Ok(())
}

/// Show the backend's record for `email`, or for the logged-in user.
///
/// # Errors
///
/// Returns an error if no email is known or the lookup fails.
#[allow(clippy::print_stdout)]
pub async fn profile(ctx: &Context, email: Option<&str>) -> Result<(), StorefrontError> {
    let email = match email {
        Some(email) => Email::parse(email).map_err(AuthError::from)?,
        None => ctx
            .sessions
            .current()
            .await?
            .ok_or(AuthError::NotLoggedIn)?
            .email,
    };

    let user = ctx.backend.fetch_user(&email).await?;
    println!("Name:         {}", user.name.as_deref().unwrap_or("-"));
    println!("Email:        {}", user.email);
    println!("Phone:        {}", user.phone.as_deref().unwrap_or("-"));
    println!("Payment:      {}", user.payment_id.as_deref().unwrap_or("-"));
    println!(
        "Subscription: {}",
        user.subscription_status.as_deref().unwrap_or("-")
    );
    for (key, value) in &user.extra {
        println!("{key}: {value}");
    }
    Ok(())
}
