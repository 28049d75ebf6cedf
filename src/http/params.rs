//! Ordered query/form parameter multimap.

/// Request parameters collected from the query string and, for
/// `application/x-www-form-urlencoded` bodies, from the form body.
///
/// Entries keep request order and a name may repeat (`id=1&id=2`). Names are
/// case-sensitive.
///
/// # Examples
///
/// ```
/// use reqbind::http::ParamMap;
///
/// let params = ParamMap::parse("id=1&id=2&name=hello+world");
/// assert_eq!(params.first("id"), Some("1"));
/// assert_eq!(params.all("id").collect::<Vec<_>>(), vec!["1", "2"]);
/// assert_eq!(params.first("name"), Some("hello world"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamMap {
    entries: Vec<(String, String)>,
}

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes an urlencoded string (`a=1&b=x%20y`). A key without `=` gets an
    /// empty value.
    pub fn parse(encoded: &str) -> Self {
        let entries = url::form_urlencoded::parse(encoded.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { entries }
    }

    /// Appends one entry.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Appends every entry of `other`, after the existing ones.
    pub fn extend(&mut self, other: ParamMap) {
        self.entries.extend(other.entries);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == name)
    }

    /// First value for `name`.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// All values for `name`, in request order.
    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Distinct names in order of first appearance.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for (k, _) in &self.entries {
            if !names.contains(&k.as_str()) {
                names.push(k);
            }
        }
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for ParamMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
