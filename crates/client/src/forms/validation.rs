//! Declarative field validation.
//!
//! A [`Schema`] is a list of [`Field`]s plus cross-field checks. Every failing
//! rule of a field contributes a message; a type mismatch stops the remaining
//! rules of that field. Cross-field checks only run once every field passed.

use bizdesk_shared::FieldErrors;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$")
        .expect("valid email pattern")
});
static UPPERCASE: Lazy<Regex> = Lazy::new(|| Regex::new("[A-Z]").expect("valid pattern"));
static LOWERCASE: Lazy<Regex> = Lazy::new(|| Regex::new("[a-z]").expect("valid pattern"));
static DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new("[0-9]").expect("valid pattern"));
static SPECIAL: Lazy<Regex> = Lazy::new(|| Regex::new("[^A-Za-z0-9]").expect("valid pattern"));

pub fn is_email(value: &str) -> bool {
    !value.starts_with('.') && !value.contains("..") && EMAIL.is_match(value)
}

pub fn is_url(value: &str) -> bool {
    url::Url::parse(value).is_ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    String,
    Array,
}

enum Rule {
    Required(String),
    MinLen(usize, String),
    MaxLen(usize, String),
    Pattern(Regex, String),
    Email(String),
    Url(String),
}

impl Rule {
    fn check(&self, value: &str) -> Option<&str> {
        let chars = value.chars().count();
        let failed = match self {
            Rule::Required(_) => value.is_empty(),
            Rule::MinLen(min, _) => chars < *min,
            Rule::MaxLen(max, _) => chars > *max,
            Rule::Pattern(re, _) => !re.is_match(value),
            Rule::Email(_) => !is_email(value),
            Rule::Url(_) => !is_url(value),
        };
        failed.then(|| self.message())
    }

    fn message(&self) -> &str {
        match self {
            Rule::Required(m)
            | Rule::MinLen(_, m)
            | Rule::MaxLen(_, m)
            | Rule::Pattern(_, m)
            | Rule::Email(m)
            | Rule::Url(m) => m,
        }
    }
}

/// Rules for one named field.
pub struct Field {
    name: &'static str,
    kind: Kind,
    trim: bool,
    rules: Vec<Rule>,
    each: Vec<Rule>,
}

impl Field {
    pub fn string(name: &'static str) -> Self {
        Self {
            name,
            kind: Kind::String,
            trim: false,
            rules: Vec::new(),
            each: Vec::new(),
        }
    }

    /// A list of strings; rules added with [`Field::each`] apply per item.
    pub fn array(name: &'static str) -> Self {
        Self {
            kind: Kind::Array,
            ..Self::string(name)
        }
    }

    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    pub fn required(mut self, message: impl Into<String>) -> Self {
        self.rules.push(Rule::Required(message.into()));
        self
    }

    pub fn min_len(mut self, min: usize, message: impl Into<String>) -> Self {
        self.rules.push(Rule::MinLen(min, message.into()));
        self
    }

    pub fn max_len(mut self, max: usize, message: impl Into<String>) -> Self {
        self.rules.push(Rule::MaxLen(max, message.into()));
        self
    }

    pub fn pattern(mut self, pattern: Regex, message: impl Into<String>) -> Self {
        self.rules.push(Rule::Pattern(pattern, message.into()));
        self
    }

    pub fn email(mut self, message: impl Into<String>) -> Self {
        self.rules.push(Rule::Email(message.into()));
        self
    }

    pub fn url(mut self, message: impl Into<String>) -> Self {
        self.rules.push(Rule::Url(message.into()));
        self
    }

    /// Minimum length applied to every item of an array field.
    pub fn each_min_len(mut self, min: usize, message: impl Into<String>) -> Self {
        self.each.push(Rule::MinLen(min, message.into()));
        self
    }

    /// Password complexity: length between 8 and 100, at least one
    /// uppercase letter, lowercase letter, digit and special character.
    pub fn password(self) -> Self {
        self.trim()
            .min_len(8, "Password must be at least 8 characters long")
            .max_len(100, "Password must be less than 100 characters")
            .pattern(UPPERCASE.clone(), "Password must contain at least one uppercase letter")
            .pattern(LOWERCASE.clone(), "Password must contain at least one lowercase letter")
            .pattern(DIGIT.clone(), "Password must contain at least one number")
            .pattern(SPECIAL.clone(), "Password must contain at least one special character")
    }

    fn validate(&self, value: Option<&mut Value>, errors: &mut FieldErrors) {
        match (self.kind, value) {
            (Kind::String, Some(Value::String(s))) => {
                if self.trim {
                    *s = s.trim().to_string();
                }
                for message in self.rules.iter().filter_map(|r| r.check(s)) {
                    errors.push(self.name, message);
                }
            }
            (Kind::Array, Some(Value::Array(items))) => {
                for item in items.iter_mut() {
                    let Value::String(s) = item else {
                        errors.push(self.name, "Expected string");
                        return;
                    };
                    if self.trim {
                        *s = s.trim().to_string();
                    }
                    for message in self.each.iter().filter_map(|r| r.check(s)) {
                        errors.push(self.name, message);
                    }
                }
            }
            (Kind::String, _) => errors.push(self.name, "Expected string"),
            (Kind::Array, _) => errors.push(self.name, "Expected array"),
        }
    }
}

type Predicate = Box<dyn Fn(&Map<String, Value>) -> bool + Send + Sync>;

struct CrossCheck {
    path: &'static str,
    message: String,
    predicate: Predicate,
}

#[derive(Default)]
pub struct Schema {
    fields: Vec<Field>,
    checks: Vec<CrossCheck>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// `field` must equal `other` after trimming. The message lands on `field`.
    pub fn equals(self, field: &'static str, other: &'static str, message: impl Into<String>) -> Self {
        self.check(field, message, move |values| values.get(field) == values.get(other))
    }

    /// Arbitrary cross-field rule; failure reports `message` on `path`.
    pub fn check(
        mut self,
        path: &'static str,
        message: impl Into<String>,
        predicate: impl Fn(&Map<String, Value>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.checks.push(CrossCheck {
            path,
            message: message.into(),
            predicate: Box::new(predicate),
        });
        self
    }

    /// Validate `input`, returning the (trimmed) values on success.
    pub fn validate<I: Serialize>(&self, input: &I) -> Result<Map<String, Value>, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut values = match serde_json::to_value(input) {
            Ok(Value::Object(values)) => values,
            _ => {
                errors.push("form", "Expected object");
                return Err(errors);
            }
        };

        for field in &self.fields {
            field.validate(values.get_mut(field.name), &mut errors);
        }

        if errors.is_empty() {
            for check in &self.checks {
                if !(check.predicate)(&values) {
                    errors.push(check.path, check.message.clone());
                }
            }
        }

        if errors.is_empty() {
            Ok(values)
        } else {
            Err(errors)
        }
    }
}
