//! Mail delivery abstraction used by the password-reset flow.
//!
//! The sender decides how to deliver (SMTP, API, etc.) and returns
//! `Ok`/`Err`; the caller treats a failure as "the secret never left the
//! building" and rolls back the pending reset state.

use axum::async_trait;
use tracing::info;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Local dev sender that logs the mail instead of delivering it.
#[derive(Clone, Debug)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        info!(to = %to, subject = %subject, body = %body, "mail send stub");
        Ok(())
    }
}
