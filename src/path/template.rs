use std::fmt;
use std::mem;

/// One piece of a `{{placeholder}}` template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    Literal(String),
    Placeholder(String),
}

/// A string with `{{name}}` placeholders, parsed once.
///
/// `\{{` writes a literal `{{`. Parsing is total: unterminated or empty
/// placeholders are kept as literal text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Template {
    parts: Vec<TemplatePart>,
}

impl Template {
    pub fn parse(source: &str) -> Self {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(start) = rest.find("{{") {
            if rest[..start].ends_with('\\') {
                literal.push_str(&rest[..start - 1]);
                literal.push_str("{{");
                rest = &rest[start + 2..];
                continue;
            }

            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) if !after[..end].trim().is_empty() => {
                    literal.push_str(&rest[..start]);
                    if !literal.is_empty() {
                        parts.push(TemplatePart::Literal(mem::take(&mut literal)));
                    }
                    parts.push(TemplatePart::Placeholder(after[..end].trim().to_string()));
                    rest = &after[end + 2..];
                }
                _ => {
                    literal.push_str(&rest[..start + 2]);
                    rest = after;
                }
            }
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            parts.push(TemplatePart::Literal(literal));
        }
        Self { parts }
    }

    pub fn parts(&self) -> &[TemplatePart] {
        &self.parts
    }

    pub fn has_placeholders(&self) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part, TemplatePart::Placeholder(_)))
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|part| match part {
            TemplatePart::Placeholder(name) => Some(name.as_str()),
            TemplatePart::Literal(_) => None,
        })
    }

    /// Replaces every placeholder `lookup` knows with literal text.
    ///
    /// Unknown placeholders survive, so the result can be substituted again
    /// later (e.g. `{{index}}` left for the repeater pass). Substituted text is
    /// never re-scanned for placeholders.
    pub fn substitute<F>(&self, mut lookup: F) -> Template
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut parts: Vec<TemplatePart> = Vec::with_capacity(self.parts.len());
        for part in &self.parts {
            let next = match part {
                TemplatePart::Placeholder(name) => match lookup(name) {
                    Some(text) => TemplatePart::Literal(text),
                    None => part.clone(),
                },
                TemplatePart::Literal(_) => part.clone(),
            };
            match (parts.last_mut(), next) {
                (Some(TemplatePart::Literal(prev)), TemplatePart::Literal(text)) => {
                    prev.push_str(&text)
                }
                (_, next) => parts.push(next),
            }
        }
        Template { parts }
    }

    /// Renders the final text, asking `lookup` for every placeholder.
    pub fn render<F>(&self, mut lookup: F) -> String
    where
        F: FnMut(&str) -> String,
    {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                TemplatePart::Literal(text) => out.push_str(text),
                TemplatePart::Placeholder(name) => out.push_str(&lookup(name)),
            }
        }
        out
    }
}

/// Renders back to source form: literals escaped, placeholders as `{{name}}`.
impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                TemplatePart::Literal(text) => write!(f, "{}", escape(text))?,
                TemplatePart::Placeholder(name) => write!(f, "{{{{{}}}}}", name)?,
            }
        }
        Ok(())
    }
}

/// Escapes text so it survives a later `Template::parse` unchanged.
pub fn escape(text: &str) -> String {
    text.replace("{{", "\\{{")
}
