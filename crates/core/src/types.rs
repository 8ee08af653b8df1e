use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single record as stored and returned by a resource handler
pub type Record = Map<String, Value>;

/// An operation on a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
    List,
    Create,
    Retrieve,
    Update,
    Destroy,
    Custom(String),
}

impl Verb {
    /// Standard verbs in the order they are published
    pub const STANDARD: [Verb; 5] = [
        Verb::List,
        Verb::Create,
        Verb::Retrieve,
        Verb::Update,
        Verb::Destroy,
    ];

    /// The literal action name
    pub fn as_str(&self) -> &str {
        match self {
            Verb::List => "list",
            Verb::Create => "create",
            Verb::Retrieve => "retrieve",
            Verb::Update => "update",
            Verb::Destroy => "destroy",
            Verb::Custom(name) => name,
        }
    }

    /// Whether `name` is one of the five standard verbs
    pub fn is_standard_name(name: &str) -> bool {
        Self::STANDARD.iter().any(|verb| verb.as_str() == name)
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Something a resource handler declares it can do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    List,
    Create,
    Retrieve,
    Update,
    Destroy,
    Custom(CustomAction),
}

impl Capability {
    pub fn verb(&self) -> Verb {
        match self {
            Capability::List => Verb::List,
            Capability::Create => Verb::Create,
            Capability::Retrieve => Verb::Retrieve,
            Capability::Update => Verb::Update,
            Capability::Destroy => Verb::Destroy,
            Capability::Custom(action) => Verb::Custom(action.name.clone()),
        }
    }

    /// Capabilities for full CRUD support
    pub fn crud() -> Vec<Capability> {
        vec![
            Capability::List,
            Capability::Create,
            Capability::Retrieve,
            Capability::Update,
            Capability::Destroy,
        ]
    }
}

/// A named non-CRUD operation exposed by a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomAction {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Operates on a single record addressed by `id`
    pub detail: bool,
    /// Body fields accepted by the action
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl CustomAction {
    /// An action over the whole collection
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            detail: false,
            fields: Vec::new(),
        }
    }

    /// An action on one record
    pub fn detail(name: impl Into<String>) -> Self {
        Self {
            detail: true,
            ..Self::collection(name)
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }
}

/// Storage-level kind of a field, as a serializer would declare it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FieldKind {
    Text { max_length: Option<usize> },
    Email { max_length: Option<usize> },
    Date,
    DateTime,
    Integer,
    Float,
    Boolean,
    Choice { choices: Vec<String> },
    Nested { fields: Vec<FieldSpec> },
}

/// Field declaration of a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    /// Returned by the handler but never accepted on write
    #[serde(default)]
    pub read_only: bool,
    /// Accepted on write but never returned
    #[serde(default)]
    pub write_only: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub help_text: Option<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            read_only: false,
            write_only: false,
            unique: false,
            default: None,
            help_text: None,
        }
    }

    pub fn text(name: impl Into<String>, max_length: Option<usize>) -> Self {
        Self::new(name, FieldKind::Text { max_length })
    }

    pub fn email(name: impl Into<String>, max_length: Option<usize>) -> Self {
        Self::new(name, FieldKind::Email { max_length })
    }

    pub fn choice<S: Into<String>>(name: impl Into<String>, choices: impl IntoIterator<Item = S>) -> Self {
        Self::new(
            name,
            FieldKind::Choice {
                choices: choices.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_help_text(mut self, help_text: impl Into<String>) -> Self {
        self.help_text = Some(help_text.into());
        self
    }
}

/// Everything a handler reports about itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    pub namespace: String,
    pub name: String,
    pub capabilities: Vec<Capability>,
    /// Fields of the resource, in declaration order
    pub fields: Vec<FieldSpec>,
}

/// A call into a handler's execution surface
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub verb: Verb,
    pub id: Option<String>,
    pub payload: Record,
}

impl ActionRequest {
    pub fn new(verb: Verb) -> Self {
        Self {
            verb,
            id: None,
            payload: Record::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_payload(mut self, payload: Record) -> Self {
        self.payload = payload;
        self
    }
}
