use std::collections::HashMap;

/// Bidirectional mapping between category strings and dense integer codes.
///
/// Codes start at 0 and are assigned in first-seen order, so the position of
/// a string in [`CatMap::categories`] is its code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatMap {
    codes: HashMap<String, usize>,
    back: Vec<String>,
}

impl CatMap {
    /// Create an empty encoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the code for `value`, assigning the next free code if unseen.
    pub fn cat_to_num(&mut self, value: &str) -> usize {
        if let Some(&code) = self.codes.get(value) {
            return code;
        }
        let code = self.back.len();
        self.codes.insert(value.to_string(), code);
        self.back.push(value.to_string());
        code
    }

    /// Return the code for `value` without assigning one.
    #[must_use]
    pub fn code(&self, value: &str) -> Option<usize> {
        self.codes.get(value).copied()
    }

    /// Return the string for `code`.
    #[must_use]
    pub fn num_to_cat(&self, code: usize) -> Option<&str> {
        self.back.get(code).map(String::as_str)
    }

    /// Return the number of distinct categories seen.
    #[must_use]
    pub fn n_cats(&self) -> usize {
        self.back.len()
    }

    /// Return all categories in code order.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.back
    }
}

#[cfg(test)]
mod tests {
    use super::CatMap;

    #[test]
    fn codes_follow_first_seen_order() {
        let mut map = CatMap::new();
        assert_eq!(map.cat_to_num("b"), 0);
        assert_eq!(map.cat_to_num("a"), 1);
        assert_eq!(map.cat_to_num("b"), 0);
        assert_eq!(map.cat_to_num("c"), 2);
        assert_eq!(map.n_cats(), 3);
        assert_eq!(map.categories(), &["b", "a", "c"]);
    }

    #[test]
    fn round_trip() {
        let mut map = CatMap::new();
        for v in ["x", "y", "x", "z", "y"] {
            let code = map.cat_to_num(v);
            assert_eq!(map.num_to_cat(code), Some(v));
        }
    }

    #[test]
    fn unknown_lookups() {
        let map = CatMap::new();
        assert_eq!(map.code("missing"), None);
        assert_eq!(map.num_to_cat(0), None);
    }
}
