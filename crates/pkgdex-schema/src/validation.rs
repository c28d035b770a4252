//! Manifest validation vocabulary.
//!
//! A malformed manifest version is reported as a single [`ValidationError`]
//! returned through `Result`. Business-rule violations are collected into a
//! [`ValidationReport`] so that every problem can be shown at once.

use std::fmt;

/// Kind of manifest problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestError {
    /// A required field is empty or missing.
    RequiredFieldMissing,
    /// A field holds a value that cannot be interpreted.
    InvalidFieldValue,
    /// A field is not supported by this deployment.
    FieldNotSupported,
    /// A field value is well formed but not supported by this deployment.
    FieldValueNotSupported,
    /// Two installers share the same (type, architecture, locale, scope).
    DuplicateInstallerEntry,
    /// `PackageFamilyName` declared on an installer type that has none.
    InstallerTypeDoesNotSupportPackageFamilyName,
    /// `ProductCode` declared on an installer type that has none.
    InstallerTypeDoesNotSupportProductCode,
    /// An exe installer declares neither `Silent` nor `SilentWithProgress`.
    ExeInstallerMissingSilentSwitches,
}

impl ManifestError {
    /// Human readable message for the kind.
    pub fn message(self) -> &'static str {
        match self {
            Self::RequiredFieldMissing => "Required field missing",
            Self::InvalidFieldValue => "Invalid field value",
            Self::FieldNotSupported => "Field is not supported",
            Self::FieldValueNotSupported => "Field value is not supported",
            Self::DuplicateInstallerEntry => "Duplicate installer entry found",
            Self::InstallerTypeDoesNotSupportPackageFamilyName => {
                "The specified installer type does not support PackageFamilyName"
            }
            Self::InstallerTypeDoesNotSupportProductCode => {
                "The specified installer type does not support ProductCode"
            }
            Self::ExeInstallerMissingSilentSwitches => {
                "Silent and SilentWithProgress switches are not specified for InstallerType exe"
            }
        }
    }
}

/// Whether a problem blocks acceptance of the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// Informational; the manifest is still accepted.
    Warning,
    /// The manifest must be rejected.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A single manifest problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", self.describe())]
pub struct ValidationError {
    /// What went wrong.
    pub kind: ManifestError,
    /// Name of the offending field, if any.
    pub field: String,
    /// Offending raw value, if any.
    pub value: String,
    /// Whether the problem blocks acceptance.
    pub severity: Severity,
}

impl ValidationError {
    /// Error-severity problem without field context.
    pub fn new(kind: ManifestError) -> Self {
        Self {
            kind,
            field: String::new(),
            value: String::new(),
            severity: Severity::Error,
        }
    }

    /// Error-severity problem on a named field.
    pub fn field(kind: ManifestError, field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Self::new(kind)
        }
    }

    /// Error-severity problem on a named field with its raw value.
    pub fn field_value(
        kind: ManifestError,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            ..Self::new(kind)
        }
    }

    /// Downgrade to a warning.
    pub fn warning(mut self) -> Self {
        self.severity = Severity::Warning;
        self
    }

    fn describe(&self) -> String {
        let mut out = self.kind.message().to_string();
        if !self.field.is_empty() {
            out.push_str(" Field: ");
            out.push_str(&self.field);
        }
        if !self.value.is_empty() {
            out.push_str(" Value: ");
            out.push_str(&self.value);
        }
        out
    }
}

/// All problems found in one manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    errors: Vec<ValidationError>,
}

impl ValidationReport {
    /// Empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem.
    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Every recorded problem, in discovery order.
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// True when at least one problem has [`Severity::Error`].
    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(|e| e.severity == Severity::Error)
    }

    /// Problems of the given kind.
    pub fn of_kind(&self, kind: ManifestError) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }
}

impl IntoIterator for ValidationReport {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "[{}] {error}", error.severity)?;
        }
        Ok(())
    }
}
