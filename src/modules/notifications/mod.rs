//! Welcome-mail hook.
//!
//! Subscribes to `UserRegistered` and hands a welcome message to the mail
//! collaborator. Delivery runs synchronously with the registration request,
//! but a failed delivery only logs; it never fails the registration.

use std::sync::Arc;

use async_trait::async_trait;

use shelf_kernel::{InitCtx, Module};

use crate::modules::{AppEvent, SharedBus};

const WELCOME_SUBJECT: &str = "Welcome to Shelf";

/// An outbound message handed to the mail collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Seam to the external mail transport. The real transport lives outside
/// this service.
pub trait Mailer: Send + Sync {
    fn send(&self, mail: &Mail) -> anyhow::Result<()>;
}

/// Mailer that records deliveries in the log.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, mail: &Mail) -> anyhow::Result<()> {
        tracing::info!(to = %mail.to, subject = %mail.subject, "delivering mail");
        Ok(())
    }
}

/// Notifications module: no routes, only the registration hook.
pub struct NotificationsModule {
    bus: SharedBus,
    mailer: Arc<dyn Mailer>,
    from_address: String,
}

impl NotificationsModule {
    pub fn new(bus: SharedBus, mailer: Arc<dyn Mailer>, from_address: String) -> Self {
        Self {
            bus,
            mailer,
            from_address,
        }
    }

    fn welcome_mail(from: &str, username: &str, email: &str) -> Mail {
        Mail {
            from: from.to_string(),
            to: email.to_string(),
            subject: WELCOME_SUBJECT.to_string(),
            body: format!("Hi, {username}. Welcome to Shelf. Enjoy the books and reviews."),
        }
    }
}

#[async_trait]
impl Module for NotificationsModule {
    fn name(&self) -> &'static str {
        "notifications"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let mailer = self.mailer.clone();
        let from = self.from_address.clone();

        self.bus.subscribe(move |event| match event {
            AppEvent::UserRegistered { username, email } => {
                if email.is_empty() {
                    tracing::debug!(%username, "new user has no email address, skipping welcome mail");
                    return;
                }
                let mail = NotificationsModule::welcome_mail(&from, username, email);
                if let Err(err) = mailer.send(&mail) {
                    tracing::warn!(%err, to = %mail.to, "welcome mail delivery failed");
                }
            }
        });

        tracing::info!(module = self.name(), "welcome mail hook subscribed");
        Ok(())
    }
}
