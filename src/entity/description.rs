/// Free-text fields attached to a photo. Every field has a `no_*()`
/// predicate used to guard metadata merges: the indexer only fills a field
/// whose predicate holds.
#[derive(Debug, Clone, Default)]
pub struct Description {
    pub photo_id: i64,
    pub description: String,
    pub notes: String,
    pub keywords: String,
    pub subject: String,
    pub artist: String,
    pub copyright: String,
}

impl Description {
    pub fn no_description(&self) -> bool {
        self.description.trim().is_empty()
    }

    pub fn no_notes(&self) -> bool {
        self.notes.trim().is_empty()
    }

    pub fn no_keywords(&self) -> bool {
        self.keywords.trim().is_empty()
    }

    pub fn no_subject(&self) -> bool {
        self.subject.trim().is_empty()
    }

    pub fn no_artist(&self) -> bool {
        self.artist.trim().is_empty()
    }

    pub fn no_copyright(&self) -> bool {
        self.copyright.trim().is_empty()
    }
}
