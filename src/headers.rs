use std::fmt;

use http::{HeaderName, HeaderValue};

use crate::Error;

/// Ordered multi-value header map with case-insensitive names.
///
/// The casing of the first insertion of a name is kept for output. Values are
/// kept in insertion order per name, and names in order of first insertion.
///
/// ```
/// use ricochet::Headers;
///
/// let mut headers = Headers::new();
/// headers.append("Set-Cookie", "a=1").unwrap();
/// headers.append("set-cookie", "b=2").unwrap();
///
/// assert_eq!(headers.get("SET-COOKIE"), Some("a=1"));
/// assert_eq!(headers.get_all("Set-Cookie"), &["a=1", "b=2"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    name: String,
    values: Vec<String>,
}

impl Headers {
    /// Create an empty header map.
    pub fn new() -> Self {
        Headers::default()
    }

    /// Add a value, keeping any previous values for the same name.
    pub fn append(&mut self, name: &str, value: &str) -> Result<(), Error> {
        check(name, value)?;

        match self.position(name) {
            Some(i) => self.entries[i].values.push(value.to_string()),
            None => self.entries.push(Entry {
                name: name.to_string(),
                values: vec![value.to_string()],
            }),
        }

        Ok(())
    }

    /// Set a value, replacing all previous values for the same name.
    ///
    /// The header keeps its position if it already existed.
    pub fn insert(&mut self, name: &str, value: &str) -> Result<(), Error> {
        check(name, value)?;

        match self.position(name) {
            Some(i) => self.entries[i].values = vec![value.to_string()],
            None => self.entries.push(Entry {
                name: name.to_string(),
                values: vec![value.to_string()],
            }),
        }

        Ok(())
    }

    /// Remove all values for a name. Returns the removed values.
    pub fn remove(&mut self, name: &str) -> Vec<String> {
        match self.position(name) {
            Some(i) => self.entries.remove(i).values,
            None => vec![],
        }
    }

    /// First value for a name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(|v| v.as_str())
    }

    /// All values for a name, in insertion order.
    pub fn get_all(&self, name: &str) -> &[String] {
        match self.position(name) {
            Some(i) => &self.entries[i].values,
            None => &[],
        }
    }

    /// Tell if the name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Tell if the name is present with a value, compared case-insensitively.
    pub fn has(&self, name: &str, value: &str) -> bool {
        self.get_all(name)
            .iter()
            .any(|v| v.eq_ignore_ascii_case(value))
    }

    /// Header names, in order of first insertion.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// All `(name, value)` pairs, one per value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|e| e.values.iter().map(move |v| (e.name.as_str(), v.as_str())))
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Tell if there are no headers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.name.eq_ignore_ascii_case(name))
    }
}

fn check(name: &str, value: &str) -> Result<(), Error> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::BadHeader(e.to_string()))?;
    HeaderValue::from_str(value).map_err(|e| Error::BadHeader(e.to_string()))?;
    Ok(())
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            write!(f, "{}: {}\r\n", name, value)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_lookup() {
        let mut h = Headers::new();
        h.append("Content-Type", "text/plain").unwrap();

        assert_eq!(h.get("content-type"), Some("text/plain"));
        assert_eq!(h.get("CONTENT-TYPE"), Some("text/plain"));
        assert!(h.contains("Content-type"));
        assert!(h.has("content-type", "TEXT/PLAIN"));
        assert_eq!(h.get("x-missing"), None);
    }

    #[test]
    fn keeps_first_casing_and_order() {
        let mut h = Headers::new();
        h.append("X-B", "1").unwrap();
        h.append("X-A", "2").unwrap();
        h.append("x-b", "3").unwrap();

        let names: Vec<_> = h.names().collect();
        assert_eq!(names, ["X-B", "X-A"]);

        let pairs: Vec<_> = h.iter().collect();
        assert_eq!(pairs, [("X-B", "1"), ("X-B", "3"), ("X-A", "2")]);
        assert_eq!(h.to_string(), "X-B: 1\r\nX-B: 3\r\nX-A: 2\r\n");
    }

    #[test]
    fn insert_replaces() {
        let mut h = Headers::new();
        h.append("Accept", "a").unwrap();
        h.append("Accept", "b").unwrap();
        h.insert("ACCEPT", "c").unwrap();

        assert_eq!(h.get_all("accept"), &["c"]);
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn remove_all_values() {
        let mut h = Headers::new();
        h.append("Accept", "a").unwrap();
        h.append("accept", "b").unwrap();

        assert_eq!(h.remove("ACCEPT"), vec!["a", "b"]);
        assert!(h.is_empty());
        assert!(h.remove("accept").is_empty());
    }

    #[test]
    fn bad_header() {
        let mut h = Headers::new();
        assert!(matches!(
            h.append("Invalid\0Header", "value"),
            Err(Error::BadHeader(_))
        ));
        assert!(matches!(
            h.append("x-ok", "line\r\nbreak"),
            Err(Error::BadHeader(_))
        ));
        assert!(h.is_empty());
    }
}
