use crate::selector::{SelectorError, SelectorSpec};

/// Ordered mapping from field name to selector
///
/// Insertion order is the output column order, and names are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    entries: Vec<(String, SelectorSpec)>,
}

impl FieldMap {
    /// Creates an empty field map
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field, rejecting duplicate names
    pub fn insert(&mut self, name: impl Into<String>, spec: SelectorSpec) -> Result<(), SelectorError> {
        let name = name.into();
        if self.contains(&name) {
            return Err(SelectorError::DuplicateField(name));
        }
        self.entries.push((name, spec));
        Ok(())
    }

    /// Builds a field map from `(name, literal)` pairs, parsing each literal
    ///
    /// # Example
    ///
    /// ```
    /// use field_harvest::selector::FieldMap;
    ///
    /// let fields = FieldMap::parse([("Name", ".name"), ("Founded", "TEXT_MATCH:Founded:|span")]).unwrap();
    /// assert_eq!(fields.names().collect::<Vec<_>>(), vec!["Name", "Founded"]);
    /// ```
    pub fn parse<I, N, L>(pairs: I) -> Result<Self, SelectorError>
    where
        I: IntoIterator<Item = (N, L)>,
        N: Into<String>,
        L: AsRef<str>,
    {
        let mut map = Self::new();
        for (name, literal) in pairs {
            map.insert(name, SelectorSpec::parse(literal.as_ref())?)?;
        }
        Ok(map)
    }

    /// Returns true if a field with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Looks up a field's selector
    pub fn get(&self, name: &str) -> Option<&SelectorSpec> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, spec)| spec)
    }

    /// Iterates over `(name, selector)` in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SelectorSpec)> {
        self.entries.iter().map(|(n, s)| (n.as_str(), s))
    }

    /// Iterates over field names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
