use chrono::{DateTime, Local};
use lettre::{
    address::AddressError,
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use thiserror::Error;

use crate::config::EmailSettings;

/// A single outbound notification that could not be delivered.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("invalid mailbox {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: AddressError,
    },

    #[error("failed to compose message: {0}")]
    Compose(#[from] lettre::error::Error),

    #[error("smtp delivery failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Outbound side of a watch. Both calls block until delivery finishes.
pub trait Notifier {
    fn notify_missing(&mut self, file_name: &str) -> Result<(), NotificationError>;
    fn notify_arrived(&mut self, file_name: &str) -> Result<(), NotificationError>;
}

/// Which presence change a message reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Missing,
    Arrived,
}

impl Notice {
    pub fn subject(self, file_name: &str) -> String {
        match self {
            Notice::Missing => format!("File is missing [{}]", file_name),
            Notice::Arrived => format!("File has arrived {}", file_name),
        }
    }

    pub fn body(self, file_name: &str, at: DateTime<Local>) -> String {
        let text = match self {
            Notice::Missing => format!(
                "The file {} is currently not available. When it arrives I will notify you again.",
                file_name
            ),
            Notice::Arrived => format!(
                "The file {} has arrived and is ready for processing.",
                file_name
            ),
        };
        format!("{}\n\nChecked at {}\n", text, at.format("%Y-%m-%d %H:%M:%S %:z"))
    }
}

/// Sends notices over SMTPS, one connection per message.
pub struct EmailNotifier {
    settings: EmailSettings,
}

impl EmailNotifier {
    pub fn new(settings: EmailSettings) -> Self {
        Self { settings }
    }

    /// Builds the message for `notice` without touching the network
    pub fn compose(
        &self,
        notice: Notice,
        file_name: &str,
        at: DateTime<Local>,
    ) -> Result<Message, NotificationError> {
        let from = mailbox(&self.settings.email_from)?;
        let to = mailbox(&self.settings.email_to)?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(notice.subject(file_name))
            .header(ContentType::TEXT_PLAIN)
            .body(notice.body(file_name, at))?;
        Ok(message)
    }

    fn send(&self, notice: Notice, file_name: &str) -> Result<(), NotificationError> {
        let message = self.compose(notice, file_name, Local::now())?;

        let credentials = Credentials::new(self.settings.user.clone(), self.settings.pass.clone());
        let transport = SmtpTransport::relay(&self.settings.host)?
            .port(self.settings.port)
            .credentials(credentials)
            .build();

        transport.send(&message)?;
        Ok(())
    }
}

impl Notifier for EmailNotifier {
    fn notify_missing(&mut self, file_name: &str) -> Result<(), NotificationError> {
        self.send(Notice::Missing, file_name)
    }

    fn notify_arrived(&mut self, file_name: &str) -> Result<(), NotificationError> {
        self.send(Notice::Arrived, file_name)
    }
}

fn mailbox(address: &str) -> Result<Mailbox, NotificationError> {
    address
        .parse::<Mailbox>()
        .map_err(|source| NotificationError::Address {
            address: address.to_string(),
            source,
        })
}
