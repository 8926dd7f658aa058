use super::ValidationError;
use std::fmt::{self, Display, Formatter};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RepoActionKind {
    Enable,
    Disable,
    Add,
    GpgKey,
}

impl From<RepoActionKind> for &'static str {
    fn from(kind: RepoActionKind) -> Self {
        match kind {
            RepoActionKind::Enable => "enable",
            RepoActionKind::Disable => "disable",
            RepoActionKind::Add => "add",
            RepoActionKind::GpgKey => "gpgkey",
        }
    }
}

/// An instruction to the package manager about one repository.
///
/// Actions are replayed in the order given, since a later action overrides
/// an earlier one for the same repo id.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RepoAction {
    pub kind:    RepoActionKind,
    pub payload: String,
}

impl RepoAction {
    pub fn new<S: Into<String>>(kind: RepoActionKind, payload: S) -> Self {
        RepoAction { kind, payload: payload.into() }
    }

    /// An `add` action for `repoid=url`.
    pub fn add(repoid: &str, url: &str) -> Self {
        RepoAction::new(RepoActionKind::Add, [repoid, "=", url].concat())
    }

    pub fn gpgkey(repoid: &str, uri: &str) -> Self {
        RepoAction::new(RepoActionKind::GpgKey, [repoid, "=", uri].concat())
    }
}

impl Display for RepoAction {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        write!(fmt, "{} {}", <&'static str>::from(self.kind), self.payload)
    }
}

/// Accumulates repo actions in command-line order.
#[derive(Debug, Default)]
pub struct RepoActions {
    actions: Vec<RepoAction>,
}

impl RepoActions {
    pub fn new() -> Self { Self::default() }

    pub fn push(&mut self, kind: RepoActionKind, value: &str) -> Result<&mut Self, ValidationError> {
        if kind == RepoActionKind::Add && !is_repo_url(value) {
            return Err(ValidationError::InvalidRepo(value.to_owned()));
        }

        self.actions.push(RepoAction::new(kind, value));
        Ok(self)
    }

    pub fn enable(&mut self, repoid: &str) -> Result<&mut Self, ValidationError> {
        self.push(RepoActionKind::Enable, repoid)
    }

    pub fn disable(&mut self, repoid: &str) -> Result<&mut Self, ValidationError> {
        self.push(RepoActionKind::Disable, repoid)
    }

    pub fn add(&mut self, value: &str) -> Result<&mut Self, ValidationError> {
        self.push(RepoActionKind::Add, value)
    }

    pub fn build(self) -> Vec<RepoAction> { self.actions }
}

/// Whether the value has the form `REPOID=[@]URL`.
fn is_repo_url(value: &str) -> bool {
    let mut parts = value.splitn(2, '=');
    match (parts.next(), parts.next()) {
        (Some(repoid), Some(url)) => !repoid.is_empty() && url.contains("://"),
        _ => false,
    }
}
