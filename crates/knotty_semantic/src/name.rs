use std::fmt;
use std::ops::Deref;

use compact_str::{CompactString, ToCompactString};
use ruff_python_stdlib::identifiers::is_identifier;

/// A validated, absolute dotted module name, e.g. `foo.bar.baz`.
///
/// Never relative (a name never starts with a `.`); relative imports are
/// resolved to an absolute [`ModuleName`] by the caller before one of these
/// is constructed. Two `ModuleName`s with equal components are equal, so a
/// `ModuleName` is a fine map key for the module cache in
/// [`crate::module_resolver::ModuleLoader`].
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ModuleName(CompactString);

impl ModuleName {
    /// Builds a `ModuleName`, rejecting anything that isn't a sequence of
    /// valid identifiers joined by single dots.
    #[must_use]
    pub fn new(name: &str) -> Option<Self> {
        Self::is_valid(name).then(|| Self(CompactString::from(name)))
    }

    #[must_use]
    pub fn new_static(name: &'static str) -> Option<Self> {
        Self::is_valid(name).then(|| Self(CompactString::const_new(name)))
    }

    fn is_valid(name: &str) -> bool {
        !name.is_empty() && name.split('.').all(is_identifier)
    }

    /// Builds a name from already-validated components, escaping any
    /// component that itself contains a literal `.` so the result's dots are
    /// unambiguously hierarchy separators.
    ///
    /// This is the "qualified-name derivation" escaping named in §4.4: a
    /// path component named `my.pkg` becomes the name component `my%20pkg`.
    #[must_use]
    pub fn from_path_components<'a>(components: impl IntoIterator<Item = &'a str>) -> Self {
        let escaped: Vec<CompactString> = components
            .into_iter()
            .map(|part| part.replace('.', "%20").to_compact_string())
            .collect();
        Self(escaped.join(".").to_compact_string())
    }

    #[must_use]
    pub fn components(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.0.split('.')
    }

    #[must_use]
    pub fn parent(&self) -> Option<ModuleName> {
        let (parent, _) = self.0.rsplit_once('.')?;
        Some(Self(parent.to_compact_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn extend(&mut self, other: &ModuleName) {
        self.0.push('.');
        self.0.push_str(other);
    }

    /// This name and all of its ancestors, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = Self> {
        std::iter::successors(Some(self.clone()), Self::parent)
    }

    /// The head component (used by the module loader to bind the first
    /// segment of `import a.b.c` in the caller's scope).
    #[must_use]
    pub fn head(&self) -> &str {
        self.components().next().unwrap_or(&self.0)
    }
}

impl Deref for ModuleName {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::ModuleName;

    #[test]
    fn rejects_relative_and_malformed_names() {
        assert!(ModuleName::new("").is_none());
        assert!(ModuleName::new(".foo").is_none());
        assert!(ModuleName::new("foo.").is_none());
        assert!(ModuleName::new("foo..bar").is_none());
        assert!(ModuleName::new("2000").is_none());
        assert_eq!(ModuleName::new("foo.bar").as_deref(), Some("foo.bar"));
    }

    #[test]
    fn parent_and_ancestors() {
        let name = ModuleName::new_static("foo.bar.baz").unwrap();
        assert_eq!(
            name.parent(),
            Some(ModuleName::new_static("foo.bar").unwrap())
        );
        assert_eq!(
            name.ancestors().collect::<Vec<_>>(),
            vec![
                ModuleName::new_static("foo.bar.baz").unwrap(),
                ModuleName::new_static("foo.bar").unwrap(),
                ModuleName::new_static("foo").unwrap(),
            ]
        );
    }

    #[test]
    fn escapes_literal_dots_in_path_components() {
        // Resolves the Open Question in SPEC_FULL.md §9: a directory or file
        // named `my.pkg` must not be mistaken for two hierarchy levels.
        let name = ModuleName::from_path_components(["my.pkg", "mod"]);
        assert_eq!(name.as_str(), "my%20pkg.mod");
        assert_eq!(name.components().collect::<Vec<_>>(), vec!["my%20pkg", "mod"]);
    }
}
