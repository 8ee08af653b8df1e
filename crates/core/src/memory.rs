// In-memory resource store with serializer-style field validation

use crate::error::{ExecutionError, FieldError, MetadataError};
use crate::handler::ResourceHandler;
use crate::types::{
    ActionRequest, Capability, CustomAction, FieldKind, FieldSpec, Record, ResourceMetadata, Verb,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::RwLock;

type CollectionFilter = Box<dyn Fn(&Record) -> bool + Send + Sync>;
type DetailMutation = Box<dyn Fn(&mut Record, &Record) -> Result<(), ExecutionError> + Send + Sync>;
type ComputedValue = Box<dyn Fn(&Record) -> Value + Send + Sync>;
type StoredForm = Box<dyn Fn(&Value) -> Value + Send + Sync>;

enum CustomOp {
    /// Lists the records matching a predicate
    Collection(CollectionFilter),
    /// Mutates one record using the validated body
    Detail(DetailMutation),
}

struct RegisteredAction {
    action: CustomAction,
    op: CustomOp,
}

#[derive(Default)]
struct Store {
    next_id: u64,
    records: BTreeMap<u64, Record>,
}

/// Resource handler keeping its records in memory
pub struct MemoryResource {
    namespace: String,
    name: String,
    standard: Vec<Verb>,
    fields: Vec<FieldSpec>,
    custom: Vec<RegisteredAction>,
    computed: Vec<(String, ComputedValue)>,
    stored_forms: Vec<(String, StoredForm)>,
    list_fields: Option<Vec<String>>,
    timestamps: bool,
    store: RwLock<Store>,
}

impl MemoryResource {
    /// A resource supporting all five standard actions and no fields yet
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            standard: Verb::STANDARD.to_vec(),
            fields: Vec::new(),
            custom: Vec::new(),
            computed: Vec::new(),
            stored_forms: Vec::new(),
            list_fields: None,
            timestamps: false,
            store: RwLock::new(Store::default()),
        }
    }

    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Restrict the standard actions the resource supports
    pub fn with_standard_actions(mut self, verbs: impl IntoIterator<Item = Verb>) -> Self {
        self.standard = verbs
            .into_iter()
            .filter(|verb| !matches!(verb, Verb::Custom(_)))
            .collect();
        self
    }

    /// Add a read-only field derived from the stored record on every read
    pub fn with_computed_field(
        mut self,
        field: FieldSpec,
        compute: impl Fn(&Record) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.computed.push((field.name.clone(), Box::new(compute)));
        self.fields.push(field.read_only());
        self
    }

    /// Store `field` in a transformed form, e.g. a digest instead of a secret
    pub fn with_stored_form(
        mut self,
        field: impl Into<String>,
        transform: impl Fn(&Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.stored_forms.push((field.into(), Box::new(transform)));
        self
    }

    /// Fields returned by `list` and collection actions; `id` is always kept
    pub fn with_list_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.list_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Maintain `created_at` and `updated_at` on every record
    pub fn with_timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }

    pub fn with_collection_action(
        mut self,
        action: CustomAction,
        filter: impl Fn(&Record) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.custom.push(RegisteredAction {
            action: CustomAction { detail: false, ..action },
            op: CustomOp::Collection(Box::new(filter)),
        });
        self
    }

    pub fn with_detail_action(
        mut self,
        action: CustomAction,
        mutation: impl Fn(&mut Record, &Record) -> Result<(), ExecutionError> + Send + Sync + 'static,
    ) -> Self {
        self.custom.push(RegisteredAction {
            action: CustomAction { detail: true, ..action },
            op: CustomOp::Detail(Box::new(mutation)),
        });
        self
    }

    /// Insert a record through the same validation as `create`
    pub fn seed(&self, payload: Record) -> Result<Record, ExecutionError> {
        self.create(&payload)
    }

    pub fn len(&self) -> usize {
        self.store.read().map(|store| store.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn list(&self, filter: Option<&CollectionFilter>) -> Result<Value, ExecutionError> {
        let store = self.store.read().map_err(|_| poisoned())?;
        let records = store
            .records
            .values()
            .filter(|record| filter.map_or(true, |f| f(*record)))
            .map(|record| Value::Object(self.list_view(record)))
            .collect();
        Ok(Value::Array(records))
    }

    fn create(&self, payload: &Record) -> Result<Record, ExecutionError> {
        let mut store = self.store.write().map_err(|_| poisoned())?;
        let cleaned = self.validate(&self.fields, payload, false, Some((&*store, None)))?;
        let cleaned = self.stored(cleaned);

        store.next_id += 1;
        let id = store.next_id;

        let mut record = Record::new();
        record.insert("id".to_string(), Value::from(id));
        record.extend(cleaned);
        if self.timestamps {
            let now = Value::String(Utc::now().to_rfc3339());
            record.insert("created_at".to_string(), now.clone());
            record.insert("updated_at".to_string(), now);
        }

        let public = self.public_view(&record);
        store.records.insert(id, record);
        tracing::debug!("Created {} {} in {}", self.name, id, self.namespace);
        Ok(public)
    }

    fn retrieve(&self, id: u64) -> Result<Record, ExecutionError> {
        let store = self.store.read().map_err(|_| poisoned())?;
        store
            .records
            .get(&id)
            .map(|record| self.public_view(record))
            .ok_or_else(|| self.not_found(id))
    }

    fn update(&self, id: u64, payload: &Record) -> Result<Record, ExecutionError> {
        let mut store = self.store.write().map_err(|_| poisoned())?;
        if !store.records.contains_key(&id) {
            return Err(self.not_found(id));
        }

        let cleaned = self.validate(&self.fields, payload, true, Some((&*store, Some(id))))?;
        let cleaned = self.stored(cleaned);
        let timestamps = self.timestamps;
        let record = store.records.get_mut(&id).ok_or_else(|| self.not_found(id))?;
        record.extend(cleaned);
        if timestamps {
            record.insert(
                "updated_at".to_string(),
                Value::String(Utc::now().to_rfc3339()),
            );
        }

        tracing::debug!("Updated {} {} in {}", self.name, id, self.namespace);
        Ok(self.public_view(record))
    }

    fn destroy(&self, id: u64) -> Result<Value, ExecutionError> {
        let mut store = self.store.write().map_err(|_| poisoned())?;
        store.records.remove(&id).ok_or_else(|| self.not_found(id))?;
        tracing::debug!("Deleted {} {} from {}", self.name, id, self.namespace);
        Ok(serde_json::json!({ "id": id }))
    }

    fn run_custom(&self, name: &str, id: Option<&str>, payload: &Record) -> Result<Value, ExecutionError> {
        let registered = self
            .custom
            .iter()
            .find(|registered| registered.action.name == name)
            .ok_or_else(|| ExecutionError::Unsupported(name.to_string()))?;

        let body = self.validate(&registered.action.fields, payload, false, None)?;

        match &registered.op {
            CustomOp::Collection(filter) => self.list(Some(filter)),
            CustomOp::Detail(mutation) => {
                let id = self.parse_id(id)?;
                let mut store = self.store.write().map_err(|_| poisoned())?;
                let record = store.records.get_mut(&id).ok_or_else(|| self.not_found(id))?;
                mutation(record, &body)?;
                if self.timestamps {
                    record.insert(
                        "updated_at".to_string(),
                        Value::String(Utc::now().to_rfc3339()),
                    );
                }
                Ok(Value::Object(self.public_view(record)))
            }
        }
    }

    /// Validate a write payload, returning only the accepted fields.
    ///
    /// Every failing field is reported, in field declaration order. Read-only
    /// and undeclared keys are dropped. With `partial` set, missing fields are
    /// left alone instead of being required or defaulted.
    fn validate(
        &self,
        fields: &[FieldSpec],
        payload: &Record,
        partial: bool,
        uniqueness: Option<(&Store, Option<u64>)>,
    ) -> Result<Record, ExecutionError> {
        let mut cleaned = Record::new();
        let mut errors = Vec::new();

        for field in fields.iter().filter(|field| !field.read_only) {
            let Some(value) = payload.get(&field.name) else {
                if partial {
                    continue;
                }
                if field.required {
                    errors.push(FieldError::new(&field.name, "This field is required."));
                } else if let Some(default) = &field.default {
                    cleaned.insert(field.name.clone(), default.clone());
                }
                continue;
            };

            match check_value(&field.name, &field.kind, value) {
                Ok(()) => {
                    if field.unique {
                        if let Some((store, exclude)) = uniqueness {
                            let stored = self.stored_value(&field.name, value);
                            let taken = store
                                .records
                                .iter()
                                .filter(|(id, _)| Some(**id) != exclude)
                                .any(|(_, record)| record.get(&field.name) == Some(&stored));
                            if taken {
                                errors.push(FieldError::new(
                                    &field.name,
                                    format!("{} with this {} already exists.", self.name, field.name),
                                ));
                                continue;
                            }
                        }
                    }
                    cleaned.insert(field.name.clone(), value.clone());
                }
                Err(mut field_errors) => errors.append(&mut field_errors),
            }
        }

        if errors.is_empty() {
            Ok(cleaned)
        } else {
            Err(ExecutionError::Validation(errors))
        }
    }

    fn stored(&self, mut cleaned: Record) -> Record {
        for (field, transform) in &self.stored_forms {
            if let Some(value) = cleaned.get_mut(field) {
                *value = transform(value);
            }
        }
        cleaned
    }

    fn stored_value(&self, field: &str, value: &Value) -> Value {
        self.stored_forms
            .iter()
            .find(|(name, _)| name == field)
            .map_or_else(|| value.clone(), |(_, transform)| transform(value))
    }

    fn public_view(&self, record: &Record) -> Record {
        let mut view: Record = record
            .iter()
            .filter(|(key, _)| {
                !self
                    .fields
                    .iter()
                    .any(|field| field.write_only && &field.name == *key)
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        for (name, compute) in &self.computed {
            view.insert(name.clone(), compute(record));
        }
        view
    }

    fn list_view(&self, record: &Record) -> Record {
        let mut view = self.public_view(record);
        if let Some(fields) = &self.list_fields {
            view.retain(|key, _| key == "id" || fields.iter().any(|field| field == key));
        }
        view
    }

    fn parse_id(&self, id: Option<&str>) -> Result<u64, ExecutionError> {
        let id = id.ok_or_else(|| {
            ExecutionError::Validation(vec![FieldError::new("id", "This field is required.")])
        })?;
        id.trim().parse().map_err(|_| ExecutionError::NotFound {
            resource: self.name.clone(),
            id: id.to_string(),
        })
    }

    fn not_found(&self, id: u64) -> ExecutionError {
        ExecutionError::NotFound {
            resource: self.name.clone(),
            id: id.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl ResourceHandler for MemoryResource {
    fn metadata(&self) -> Result<ResourceMetadata, MetadataError> {
        let mut capabilities: Vec<Capability> = self
            .standard
            .iter()
            .filter_map(|verb| match verb {
                Verb::List => Some(Capability::List),
                Verb::Create => Some(Capability::Create),
                Verb::Retrieve => Some(Capability::Retrieve),
                Verb::Update => Some(Capability::Update),
                Verb::Destroy => Some(Capability::Destroy),
                Verb::Custom(_) => None,
            })
            .collect();
        capabilities.extend(
            self.custom
                .iter()
                .map(|registered| Capability::Custom(registered.action.clone())),
        );

        Ok(ResourceMetadata {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            capabilities,
            fields: self.fields.clone(),
        })
    }

    async fn execute(&self, request: ActionRequest) -> Result<Value, ExecutionError> {
        if !matches!(request.verb, Verb::Custom(_)) && !self.standard.contains(&request.verb) {
            return Err(ExecutionError::Unsupported(request.verb.to_string()));
        }

        match &request.verb {
            Verb::List => self.list(None),
            Verb::Create => self.create(&request.payload).map(Value::Object),
            Verb::Retrieve => {
                let id = self.parse_id(request.id.as_deref())?;
                self.retrieve(id).map(Value::Object)
            }
            Verb::Update => {
                let id = self.parse_id(request.id.as_deref())?;
                self.update(id, &request.payload).map(Value::Object)
            }
            Verb::Destroy => {
                let id = self.parse_id(request.id.as_deref())?;
                self.destroy(id)
            }
            Verb::Custom(name) => self.run_custom(name, request.id.as_deref(), &request.payload),
        }
    }
}

fn poisoned() -> ExecutionError {
    ExecutionError::Unavailable("record store lock poisoned".to_string())
}

fn check_value(path: &str, kind: &FieldKind, value: &Value) -> Result<(), Vec<FieldError>> {
    let fail = |reason: String| Err(vec![FieldError::new(path, reason)]);

    if value.is_null() {
        return fail("This field may not be null.".to_string());
    }

    match kind {
        FieldKind::Text { max_length } => {
            let Some(text) = value.as_str() else {
                return fail("Not a valid string.".to_string());
            };
            check_length(path, text, *max_length)
        }
        FieldKind::Email { max_length } => {
            let Some(text) = value.as_str() else {
                return fail("Not a valid string.".to_string());
            };
            if !is_valid_email(text) {
                return fail("Enter a valid email address.".to_string());
            }
            check_length(path, text, *max_length)
        }
        FieldKind::Date => match value.as_str() {
            Some(text) if NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok() => Ok(()),
            _ => fail("Date has wrong format. Use one of these formats instead: YYYY-MM-DD.".to_string()),
        },
        FieldKind::DateTime => match value.as_str() {
            Some(text) if DateTime::parse_from_rfc3339(text).is_ok() => Ok(()),
            _ => fail("Datetime has wrong format. Use RFC 3339.".to_string()),
        },
        FieldKind::Integer => {
            if value.as_i64().is_some() {
                Ok(())
            } else {
                fail("A valid integer is required.".to_string())
            }
        }
        FieldKind::Float => {
            if value.is_number() {
                Ok(())
            } else {
                fail("A valid number is required.".to_string())
            }
        }
        FieldKind::Boolean => {
            if value.is_boolean() {
                Ok(())
            } else {
                fail("Must be a valid boolean.".to_string())
            }
        }
        FieldKind::Choice { choices } => match value.as_str() {
            Some(choice) if choices.iter().any(|c| c == choice) => Ok(()),
            _ => fail(format!("\"{}\" is not a valid choice.", display_value(value))),
        },
        FieldKind::Nested { fields } => {
            let Some(object) = value.as_object() else {
                return fail("Expected a dictionary of items.".to_string());
            };
            let mut errors = Vec::new();
            for field in fields.iter().filter(|field| !field.read_only) {
                let child = format!("{}.{}", path, field.name);
                match object.get(&field.name) {
                    Some(value) => {
                        if let Err(mut nested) = check_value(&child, &field.kind, value) {
                            errors.append(&mut nested);
                        }
                    }
                    None if field.required => {
                        errors.push(FieldError::new(child, "This field is required."));
                    }
                    None => {}
                }
            }
            if errors.is_empty() {
                Ok(())
            } else {
                Err(errors)
            }
        }
    }
}

fn check_length(path: &str, text: &str, max_length: Option<usize>) -> Result<(), Vec<FieldError>> {
    match max_length {
        Some(max) if text.chars().count() > max => Err(vec![FieldError::new(
            path,
            format!("Ensure this field has no more than {} characters.", max),
        )]),
        _ => Ok(()),
    }
}

fn is_valid_email(text: &str) -> bool {
    if text.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = text.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
