use crate::{BotMode, Contact};

/// Mode filter plus free-text search over name and phone.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ContactFilter {
    /// `None` shows every mode.
    pub mode: Option<BotMode>,
    search: String,
}

impl ContactFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: Option<BotMode>) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the search term. It is trimmed and matched case-insensitively
    /// against the name, and verbatim against the phone.
    pub fn with_search(mut self, term: impl AsRef<str>) -> Self {
        self.search = term.as_ref().trim().to_lowercase();
        self
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn matches(&self, contact: &Contact) -> bool {
        if self.mode.is_some_and(|mode| mode != contact.bot_mode) {
            return false;
        }
        self.search.is_empty()
            || contact.name.to_lowercase().contains(&self.search)
            || contact.phone.contains(&self.search)
    }

    /// Matching contacts, in their original order.
    pub fn apply<'a>(&self, contacts: &'a [Contact]) -> Vec<&'a Contact> {
        contacts.iter().filter(|contact| self.matches(contact)).collect()
    }
}

/// Header counters for a contact list.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ContactStats {
    pub total: usize,
    pub bot: usize,
    pub human: usize,
}

impl ContactStats {
    pub fn from_contacts(contacts: &[Contact]) -> Self {
        let bot = contacts
            .iter()
            .filter(|contact| contact.bot_mode == BotMode::Bot)
            .count();
        Self {
            total: contacts.len(),
            bot,
            human: contacts.len() - bot,
        }
    }
}
