//! The caller of a domain operation.

/// Who is performing an operation.
///
/// Supplied per request by the auth collaborator and passed explicitly into
/// every domain operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// A caller with a stable identity.
    Identified(String),
    /// A caller with no identity.
    Anonymous,
}

impl Actor {
    /// Build an actor from an optional id. Blank ids are anonymous.
    #[must_use]
    pub fn from_id(id: Option<&str>) -> Self {
        match id.map(str::trim) {
            Some(id) if !id.is_empty() => Self::Identified(id.to_string()),
            _ => Self::Anonymous,
        }
    }

    /// The actor id, if identified.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Identified(id) => Some(id.as_str()),
            Self::Anonymous => None,
        }
    }

    /// Whether the actor has an identity.
    #[must_use]
    pub const fn is_identified(&self) -> bool {
        matches!(self, Self::Identified(_))
    }
}
