//! Messagerie: une seule sorte de conversation, paramétrée par son sujet.
//!
//! Les messages sont numérotés dans l'ordre d'envoi à partir de 1. Un
//! message envoyé est marqué remis mais pas lu. Chaque participant a ses
//! propres accusés de lecture; le message passe à lu quand tous les autres
//! participants l'ont vu.

use std::collections::BTreeSet;

use chrono::Utc;
use log::info;

use crate::models::{Conversation, MemberID, Message, MessageBody};
use crate::utils::input_validation::{long_text, short_text, url, InvalidInput};

impl MessageBody {
    /// Un message texte; un texte vide est refusé
    pub fn text(raw: &str) -> Result<Self, InvalidInput> {
        Ok(MessageBody::Text {
            text: long_text("message", raw)?,
        })
    }

    /// Une pièce jointe, référencée par son nom et son adresse
    pub fn file(name: &str, link: &str) -> Result<Self, InvalidInput> {
        Ok(MessageBody::File {
            name: short_text("file name", name)?,
            url: url("file url", link)?,
        })
    }
}

impl Conversation {
    /// Ajoute un message à la conversation et renvoie son numéro
    pub fn post(&mut self, sender: MemberID, body: MessageBody) -> u32 {
        let id = self.messages.last().map_or(1, |last| last.id + 1);

        self.messages.push(Message {
            id,
            sender,
            body,
            sent_at: Utc::now(),
            delivered: true,
            seen: false,
            seen_by: BTreeSet::new(),
        });
        info!("Message {id} posted in conversation {}", self.id);
        id
    }

    /// Messages des autres participants pas encore lus par `viewer`
    pub fn unread_count(&self, viewer: MemberID) -> usize {
        self.messages
            .iter()
            .filter(|message| message.sender != viewer && !message.seen_by.contains(&viewer))
            .count()
    }

    /// Marque comme lus par `viewer` les messages des autres participants.
    /// Renvoie le nombre de messages nouvellement lus.
    pub fn mark_seen(&mut self, viewer: MemberID) -> usize {
        let participants = &self.participants;
        let mut count = 0;
        for message in self.messages.iter_mut().filter(|message| message.sender != viewer) {
            if message.seen_by.insert(viewer) {
                count += 1;
            }
            let everyone = participants
                .iter()
                .filter(|&&id| id != message.sender)
                .all(|id| message.seen_by.contains(id));
            message.seen = everyone;
        }
        count
    }

    /// Ajoute un participant s'il n'en fait pas déjà partie.
    /// Les messages antérieurs ne sont pas encore lus par le nouveau venu.
    pub fn join(&mut self, member: MemberID) -> bool {
        if self.has_participant(member) {
            return false;
        }
        self.participants.push(member);
        for message in self.messages.iter_mut().filter(|message| message.sender != member) {
            message.seen = false;
        }
        true
    }
}
