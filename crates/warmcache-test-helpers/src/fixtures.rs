//! Test fixtures - values and application types for cache tests

use indexmap::IndexMap;
use warmcache_core::codec::take_field;
use warmcache_core::{CodecError, Reconstruct, Value};

/// A nested value touching every shape the codec knows
pub fn nested_value() -> Value {
    vec![
        ("id", Value::Int(42)),
        ("name", Value::from("widget")),
        ("price", Value::Float(19.99)),
        ("active", Value::Bool(true)),
        ("parent", Value::Null),
        (
            "tags",
            Value::from(vec![Value::from("blue"), Value::from("small")]),
        ),
        (
            "dimensions",
            vec![("w", 10), ("h", 4)].into_iter().collect(),
        ),
    ]
    .into_iter()
    .collect()
}

/// `{"foo": "bar", "baz": "boom"}`
pub fn foo_bar() -> Value {
    vec![("foo", "bar"), ("baz", "boom")].into_iter().collect()
}

/// An application record restored from its attribute map
#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub name: String,
    pub age: i64,
    pub email: Option<String>,
}

impl Person {
    pub fn new(name: &str, age: i64) -> Self {
        Self {
            name: name.to_string(),
            age,
            email: None,
        }
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }
}

impl Reconstruct for Person {
    const TYPE_TAG: &'static str = "person";

    fn to_fields(&self) -> IndexMap<String, Value> {
        let mut fields = IndexMap::new();
        fields.insert("name".to_string(), Value::from(self.name.as_str()));
        fields.insert("age".to_string(), Value::Int(self.age));
        fields.insert("email".to_string(), Value::from(self.email.clone()));
        fields
    }

    fn from_fields(mut fields: IndexMap<String, Value>) -> Result<Self, CodecError> {
        let name = match take_field(&mut fields, "name")? {
            Value::Str(name) => name,
            other => return Err(invalid("name", &other)),
        };
        let age = match take_field(&mut fields, "age")? {
            Value::Int(age) => age,
            other => return Err(invalid("age", &other)),
        };
        let email = match fields.shift_remove("email") {
            Some(Value::Str(email)) => Some(email),
            Some(Value::Null) | None => None,
            Some(other) => return Err(invalid("email", &other)),
        };

        Ok(Person { name, age, email })
    }
}

/// One page of a paginated listing, rebuilt from items and counters
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Person>,
    pub total: i64,
    pub per_page: i64,
    pub current_page: i64,
}

impl Page {
    pub fn last_page(&self) -> i64 {
        if self.per_page <= 0 {
            return 1;
        }
        ((self.total + self.per_page - 1) / self.per_page).max(1)
    }
}

impl Reconstruct for Page {
    const TYPE_TAG: &'static str = "page";

    fn to_fields(&self) -> IndexMap<String, Value> {
        let mut fields = IndexMap::new();
        fields.insert(
            "items".to_string(),
            Value::List(self.items.iter().map(Value::object).collect()),
        );
        fields.insert("total".to_string(), Value::Int(self.total));
        fields.insert("perPage".to_string(), Value::Int(self.per_page));
        fields.insert("currentPage".to_string(), Value::Int(self.current_page));
        fields
    }

    fn from_fields(mut fields: IndexMap<String, Value>) -> Result<Self, CodecError> {
        let items = match take_field(&mut fields, "items")? {
            Value::List(items) => items
                .into_iter()
                .map(Value::reconstruct::<Person>)
                .collect::<Result<Vec<_>, _>>()?,
            other => return Err(invalid("items", &other)),
        };
        let mut int = |name: &str| match take_field(&mut fields, name)? {
            Value::Int(n) => Ok(n),
            other => Err(invalid(name, &other)),
        };

        Ok(Page {
            items,
            total: int("total")?,
            per_page: int("perPage")?,
            current_page: int("currentPage")?,
        })
    }
}

fn invalid(field: &str, found: &Value) -> CodecError {
    CodecError::InvalidField {
        field: field.to_string(),
        reason: format!("unexpected {}", found.kind()),
    }
}
