//! Envoi simulé des e-mails: les messages sont conservés dans une boîte
//! d'envoi en mémoire au lieu d'être remis.

use chrono::{DateTime, Utc};
use log::info;

use crate::utils::input_validation::EmailAddress;

#[derive(Clone, Debug)]
pub struct Email {
    pub to: EmailAddress,
    pub subject: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Default, Debug)]
pub struct Outbox {
    sent: Vec<Email>,
}

impl Outbox {
    pub fn send(&mut self, to: &EmailAddress, subject: &str, body: &str) {
        info!("Sending an email to {to}: {subject}");
        self.sent.push(Email {
            to: to.clone(),
            subject: subject.to_string(),
            body: body.to_string(),
            sent_at: Utc::now(),
        });
    }

    /// Dernier message envoyé à une adresse
    pub fn last_to(&self, to: &EmailAddress) -> Option<&Email> {
        self.sent.iter().rev().find(|email| &email.to == to)
    }

    pub fn len(&self) -> usize {
        self.sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }
}
