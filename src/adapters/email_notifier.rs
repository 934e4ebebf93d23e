//! SMTP email notifier.
//!
//! Credentials come from the `[email]` config section, loaded once at
//! startup. A missing section is a valid configuration: the monitor then
//! runs with a no-op notifier and a logged warning instead of failing.

use crate::domain::detector::TransitionEvent;
use crate::domain::error::TrendwatchError;
use crate::ports::config_port::ConfigPort;
use crate::ports::notify_port::NotifyPort;
use chrono::Local;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use log::{info, warn};

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub sender: String,
    pub password: String,
    pub recipients: Vec<String>,
}

impl EmailConfig {
    /// Read the `[email]` section. Returns `None` when sender or password is
    /// absent; an empty recipient list falls back to the sender address.
    pub fn from_config(config: &dyn ConfigPort) -> Option<Self> {
        let sender = config.get_string("email", "sender")?;
        let password = config.get_string("email", "password")?;
        if sender.trim().is_empty() || password.is_empty() {
            return None;
        }

        let mut recipients: Vec<String> = config
            .get_string("email", "recipients")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if recipients.is_empty() {
            recipients.push(sender.clone());
        }

        Some(Self {
            smtp_host: config
                .get_string("email", "smtp_host")
                .unwrap_or_else(|| "smtp.gmail.com".to_string()),
            smtp_port: config.get_int("email", "smtp_port", 587) as u16,
            sender,
            password,
            recipients,
        })
    }
}

pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn transport(&self) -> Result<SmtpTransport, TrendwatchError> {
        let creds = Credentials::new(self.config.sender.clone(), self.config.password.clone());
        Ok(SmtpTransport::starttls_relay(&self.config.smtp_host)
            .map_err(|e| TrendwatchError::Delivery {
                reason: e.to_string(),
            })?
            .port(self.config.smtp_port)
            .credentials(creds)
            .build())
    }

    /// Test the SMTP connection and credentials without sending anything.
    pub fn validate(&self) -> Result<(), TrendwatchError> {
        let ok = self
            .transport()?
            .test_connection()
            .map_err(|e| TrendwatchError::Delivery {
                reason: e.to_string(),
            })?;
        if ok {
            Ok(())
        } else {
            Err(TrendwatchError::Delivery {
                reason: "SMTP connection test failed".into(),
            })
        }
    }

    fn render_body(event: &TransitionEvent, value: f64) -> String {
        format!(
            "<html>\n<body>\n\
             <h2>{ticker} Trend Change Alert</h2>\n\
             <p><strong>Time:</strong> {time}</p>\n\
             <p><strong>Symbol:</strong> {ticker}</p>\n\
             <p><strong>Change:</strong> {from} &rarr; {to}</p>\n\
             <p><strong>Current Value:</strong> {value}</p>\n\
             <p><strong>Data Date:</strong> {date}</p>\n\
             <br>\n\
             <p>This is an automated alert from trendwatch.</p>\n\
             </body>\n</html>",
            ticker = event.ticker,
            time = Local::now().format("%Y-%m-%d %H:%M:%S"),
            from = event.from,
            to = event.to,
            value = value,
            date = event.date,
        )
    }
}

impl NotifyPort for EmailNotifier {
    fn notify(&self, event: &TransitionEvent, value: f64) -> Result<(), TrendwatchError> {
        let delivery = |reason: String| TrendwatchError::Delivery { reason };

        let mut builder = Message::builder()
            .from(
                self.config
                    .sender
                    .parse()
                    .map_err(|e| delivery(format!("bad sender address: {e}")))?,
            )
            .subject(format!(
                "{} Alert: Changed from {} to {}",
                event.ticker, event.from, event.to
            ))
            .header(ContentType::TEXT_HTML);
        for recipient in &self.config.recipients {
            builder = builder.to(recipient
                .parse()
                .map_err(|e| delivery(format!("bad recipient address {recipient:?}: {e}")))?);
        }

        let message = builder
            .body(Self::render_body(event, value))
            .map_err(|e| delivery(e.to_string()))?;

        self.transport()?
            .send(&message)
            .map_err(|e| delivery(e.to_string()))?;

        info!(
            "notification sent to {}",
            self.config.recipients.join(", ")
        );
        Ok(())
    }
}

/// Notifier used when no email configuration is present.
pub struct NoopNotifier;

impl NotifyPort for NoopNotifier {
    fn notify(&self, event: &TransitionEvent, _value: f64) -> Result<(), TrendwatchError> {
        warn!(
            "email not configured, dropping notification: {} {} -> {} on {}",
            event.ticker, event.from, event.to, event.date
        );
        Ok(())
    }
}
