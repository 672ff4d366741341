//! Login and logout

use crate::output::print_success;
use crate::session::Session;
use anyhow::Result;

/// Exchange the admin token for a session credential
pub async fn login(session: &Session, token: &str) -> Result<()> {
    session.client.login(token).await?;
    print_success(&format!("Logged in to {}", session.client.base_url()));
    Ok(())
}

pub fn logout(session: &Session) -> Result<()> {
    session.client.logout()?;
    print_success("Logged out");
    Ok(())
}
