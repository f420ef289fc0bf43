//! Namespace and `use` import tracking for class names

use std::collections::HashMap;

/// Namespace state at a point in a file.
#[derive(Debug, Clone, Default)]
pub struct NameContext {
    namespace: String,
    /// Lowercased alias -> fully qualified name.
    imports: HashMap<String, String>,
}

impl NameContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Enter a namespace; imports of the previous one are forgotten.
    pub fn enter_namespace(&mut self, namespace: &str) {
        self.namespace = namespace.trim_matches('\\').to_string();
        self.imports.clear();
    }

    pub fn import(&mut self, alias: &str, qualified: &str) {
        self.imports
            .insert(alias.to_ascii_lowercase(), qualified.trim_start_matches('\\').to_string());
    }

    /// Fully qualified name of a class-like declared here.
    pub fn declare(&self, name: &str) -> String {
        if self.namespace.is_empty() {
            name.to_string()
        } else {
            format!("{}\\{}", self.namespace, name)
        }
    }

    /// Resolve a class reference as written in source.
    pub fn resolve_class(&self, name: &str) -> String {
        if let Some(qualified) = name.strip_prefix('\\') {
            return qualified.to_string();
        }
        if name.get(..10).is_some_and(|p| p.eq_ignore_ascii_case("namespace\\")) {
            return self.declare(&name[10..]);
        }

        let (first, tail) = match name.split_once('\\') {
            Some((first, tail)) => (first, Some(tail)),
            None => (name, None),
        };
        if let Some(imported) = self.imports.get(&first.to_ascii_lowercase()) {
            return match tail {
                Some(tail) => format!("{}\\{}", imported, tail),
                None => imported.clone(),
            };
        }

        self.declare(name)
    }

    /// Record the imports of a `use` statement given its source text.
    ///
    /// Function and constant imports are ignored.
    pub fn import_statement(&mut self, text: &str) {
        for (alias, qualified) in parse_use(text) {
            self.import(&alias, &qualified);
        }
    }
}

/// The namespace name of a `namespace` statement's source text.
pub fn namespace_name(text: &str) -> String {
    let rest = text.trim_start();
    let rest = rest.get(9..).unwrap_or("");
    rest.trim_start()
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '\\')
        .collect()
}

fn strip_keyword<'t>(text: &'t str, keyword: &str) -> Option<&'t str> {
    let head = text.get(..keyword.len())?;
    let rest = &text[keyword.len()..];
    (head.eq_ignore_ascii_case(keyword) && rest.starts_with(char::is_whitespace)).then(|| rest.trim_start())
}

fn parse_use(text: &str) -> Vec<(String, String)> {
    let body = text.trim().trim_end_matches(';').trim();
    let Some(body) = strip_keyword(body, "use") else {
        return Vec::new();
    };
    if strip_keyword(body, "function").is_some() || strip_keyword(body, "const").is_some() {
        return Vec::new();
    }

    let mut imports = Vec::new();
    if let Some((prefix, group)) = body.split_once('{') {
        let prefix = prefix.trim().trim_end_matches('\\');
        let group = group.trim_end().trim_end_matches('}');
        for item in group.split(',') {
            let item = item.trim();
            if item.is_empty() || strip_keyword(item, "function").is_some() || strip_keyword(item, "const").is_some() {
                continue;
            }
            if let Some((name, alias)) = use_item(item) {
                imports.push((alias, format!("{}\\{}", prefix, name)));
            }
        }
    } else {
        for item in body.split(',') {
            if let Some((name, alias)) = use_item(item.trim()) {
                imports.push((alias, name));
            }
        }
    }
    imports
}

/// `Foo\Bar as Baz` -> (`Foo\Bar`, `Baz`); the alias defaults to the last segment.
fn use_item(item: &str) -> Option<(String, String)> {
    let mut words = item.split_whitespace();
    let name = words.next()?.trim_start_matches('\\').to_string();
    let alias = match (words.next(), words.next()) {
        (Some(keyword), Some(alias)) if keyword.eq_ignore_ascii_case("as") => alias.to_string(),
        _ => name.rsplit('\\').next().unwrap_or(&name).to_string(),
    };
    (!name.is_empty()).then_some((name, alias))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_in_global_namespace() {
        let names = NameContext::new();
        assert_eq!(names.resolve_class("Foo"), "Foo");
        assert_eq!(names.resolve_class("\\Foo\\Bar"), "Foo\\Bar");
    }

    #[test]
    fn test_resolve_relative_to_namespace() {
        let mut names = NameContext::new();
        names.enter_namespace("App\\Models");
        assert_eq!(names.resolve_class("User"), "App\\Models\\User");
        assert_eq!(names.resolve_class("namespace\\User"), "App\\Models\\User");
        assert_eq!(names.declare("Post"), "App\\Models\\Post");
    }

    #[test]
    fn test_use_imports() {
        let mut names = NameContext::new();
        names.enter_namespace("App");
        names.import_statement("use Foo\\Bar, Baz\\Qux as Q;");
        names.import_statement("use Lib\\{One, Two as Deux};");
        names.import_statement("use function Lib\\helper;");

        assert_eq!(names.resolve_class("Bar"), "Foo\\Bar");
        assert_eq!(names.resolve_class("q"), "Baz\\Qux");
        assert_eq!(names.resolve_class("Deux"), "Lib\\Two");
        assert_eq!(names.resolve_class("One\\Inner"), "Lib\\One\\Inner");
        assert_eq!(names.resolve_class("helper"), "App\\helper");
    }

    #[test]
    fn test_entering_namespace_clears_imports() {
        let mut names = NameContext::new();
        names.import_statement("use Foo\\Bar;");
        names.enter_namespace("Other");
        assert_eq!(names.resolve_class("Bar"), "Other\\Bar");
    }

    #[test]
    fn test_namespace_name() {
        assert_eq!(namespace_name("namespace App\\Http;"), "App\\Http");
        assert_eq!(namespace_name("namespace Foo { }"), "Foo");
        assert_eq!(namespace_name("namespace { }"), "");
    }
}
