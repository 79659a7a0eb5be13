/// Which attribute of which element carries translatable text.
///
/// `selector` is an element local name or `*`. A `*` inside `context` is replaced with the
/// matched element's name, so `*.name` on `<Item name=".."/>` yields the context `Item.name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRule {
    pub selector: String,
    pub context: String,
    pub attribute: String,
}

impl ExtractionRule {
    pub fn new(
        selector: impl Into<String>,
        context: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            selector: selector.into(),
            context: context.into(),
            attribute: attribute.into(),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.selector == "*"
    }

    pub fn matches(&self, element: &str, attribute: &str) -> bool {
        self.attribute == attribute && (self.is_wildcard() || self.selector == element)
    }

    pub fn context_for(&self, element: &str) -> String {
        self.context.replace('*', element)
    }

    /// Needle looked for in an XSLT template's `match` expression.
    pub(crate) fn template_needle(&self) -> &str {
        if self.is_wildcard() {
            self.context.split('.').next().unwrap_or("*")
        } else {
            &self.selector
        }
    }
}

/// Built-in rules: every `name` and `text` attribute anywhere in the content tree.
pub fn default_rules() -> Vec<ExtractionRule> {
    vec![
        ExtractionRule::new("*", "*.name", "name"),
        ExtractionRule::new("*", "*.text", "text"),
    ]
}

/// First rule claiming `(element, attribute)`; earlier rules shadow later ones.
pub(crate) fn rule_for<'a>(
    rules: &'a [ExtractionRule],
    element: &str,
    attribute: &str,
) -> Option<&'a ExtractionRule> {
    rules.iter().find(|r| r.matches(element, attribute))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specific_rule_shadows_wildcard() {
        let mut rules = vec![ExtractionRule::new("Hero", "Hero.text", "text")];
        rules.extend(default_rules());
        let r = rule_for(&rules, "Hero", "text").unwrap();
        assert_eq!(r.context_for("Hero"), "Hero.text");
        let r = rule_for(&rules, "Item", "name").unwrap();
        assert_eq!(r.context_for("Item"), "Item.name");
        assert!(rule_for(&rules, "Item", "id").is_none());
    }

    #[test]
    fn template_needle_falls_back_to_context_head() {
        assert_eq!(ExtractionRule::new("*", "*.name", "name").template_needle(), "*");
        assert_eq!(
            ExtractionRule::new("*", "Settlement.name", "name").template_needle(),
            "Settlement"
        );
        assert_eq!(
            ExtractionRule::new("Kingdom", "Kingdom.title", "title").template_needle(),
            "Kingdom"
        );
    }
}
