use std::collections::HashSet;

const MAX_SUFFIX: u32 = 999;

/// Hands out `<prefix>_<n>` identifiers that are unused anywhere in one tree.
///
/// The minter is built from a snapshot of the identifiers in use and records
/// every id it hands out, so several inserts in a row stay distinct.
#[derive(Clone, Debug, Default)]
pub struct IdentifierMinter {
    used: HashSet<String>,
}

impl IdentifierMinter {
    pub fn new<I, S>(used: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            used: used.into_iter().map(Into::into).collect(),
        }
    }

    /// Smallest free `<prefix>_<n>` with `n` in `1..=999`, else `<prefix>_new`.
    pub fn mint(&mut self, prefix: &str) -> String {
        let id = (1..=MAX_SUFFIX)
            .map(|n| format!("{prefix}_{n}"))
            .find(|cand| !self.used.contains(cand))
            .unwrap_or_else(|| {
                log::warn!("Identifier space for {prefix} exhausted");
                format!("{prefix}_new")
            });
        self.used.insert(id.clone());
        id
    }

    pub fn is_used(&self, id: &str) -> bool {
        self.used.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_smallest_free() {
        let mut m = IdentifierMinter::new(["widget_1", "widget_3"]);
        assert_eq!(m.mint("widget"), "widget_2");
        assert_eq!(m.mint("widget"), "widget_4");
        assert_eq!(m.mint("group"), "group_1");
    }

    #[test]
    fn test_mint_overflow() {
        let used: Vec<String> = (1..=999).map(|n| format!("tab_{n}")).collect();
        let mut m = IdentifierMinter::new(used);
        assert_eq!(m.mint("tab"), "tab_new");
        assert!(m.is_used("tab_new"));
    }
}
