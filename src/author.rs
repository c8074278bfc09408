use std::fmt;

/// An author entry; authors are not linked to books
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    /// Name, the lookup key
    name: String,
    /// Free-text biography
    biography: String,
}

impl Author {
    #[must_use]
    pub fn new(name: &str, biography: &str) -> Self {
        Self { name: name.to_string(), biography: biography.to_string() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn biography(&self) -> &str {
        &self.biography
    }

    /// Case-insensitive name comparison
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.biography)
    }
}
