//! Read-modify-write of the `variables` field on process-instance and task documents.
//!
//! Every variable mutation reads the parent's whole bucket map, changes it in
//! memory and writes the whole map back with a partial update. Nothing guards
//! against a concurrent writer on the same document: two updates to different
//! variables of one document can race and the later write wins.

use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use flowquery_core::{QueryError, QueryResult};
use flowquery_model::{
    BucketError, ProcessInstance, Task, Variable, VariableBuckets, VariableParent, VariableScope,
};

use crate::config::IndexesConfig;
use crate::read_model::{
    DocumentFinder, DocumentRepository, DocumentStore, ProcessInstanceRepository, Repository,
    StoreError, TaskRepository, UpdateRequest,
};

const VARIABLES_FIELD: &str = "variables";

pub struct VariableUpdater<S> {
    process_instances: ProcessInstanceRepository<S>,
    tasks: TaskRepository<S>,
    store: S,
    indexes: IndexesConfig,
    finder: DocumentFinder,
}

impl<S> VariableUpdater<S>
where
    S: DocumentStore + Clone,
{
    pub fn new(store: S, indexes: IndexesConfig) -> Self {
        Self {
            process_instances: DocumentRepository::new(store.clone(), &indexes.process_instance_index),
            tasks: DocumentRepository::new(store.clone(), &indexes.task_index),
            store,
            indexes,
            finder: DocumentFinder::new(),
        }
    }

    /// Replace value and last-updated time of an existing variable.
    ///
    /// The variable is matched by name inside the bucket of its type; the
    /// stored entry keeps its identity and creation fields.
    pub fn update_variable(&self, updated: &Variable) -> QueryResult<()> {
        let suffix = parent_suffix(updated);
        let mut variables = self.find_variables_from_parent(updated)?;

        variables
            .update_value(
                &updated.variable_type,
                &updated.name,
                updated.value.clone(),
                updated.last_updated_time,
            )
            .map_err(|err| match err {
                BucketError::EmptyBucket { variable_type } => QueryError::missing_variables(format!(
                    "Unable to find variables for type: {variable_type}{suffix}"
                )),
                BucketError::VariableNotFound { name, .. } => QueryError::variable_not_found(format!(
                    "Unable to find variable with name: {name}{suffix}"
                )),
            })?;

        debug!(variable = %updated.name, variable_type = %updated.variable_type, "updating variable value");
        self.write_variables(updated, variables).map_err(|e| {
            QueryError::persistence(
                format!("Unable to update variable with name: {}{suffix}", updated.name),
                e,
            )
        })
    }

    /// Soft-delete: flag the variable, keep it in its bucket.
    pub fn mark_variable_as_deleted<V>(&self, instance: &V) -> QueryResult<()>
    where
        V: VariableScope + ?Sized,
    {
        let name = instance.name();
        let mut variables = self.find_variables_from_parent(instance)?;

        variables
            .mark_deleted(instance.variable_type(), name)
            .map_err(|err| match (err, instance.parent()) {
                (BucketError::EmptyBucket { .. }, VariableParent::Task(id)) => {
                    QueryError::missing_variables(format!("Task with the given id: '{id}' has no variables"))
                }
                (BucketError::EmptyBucket { .. }, VariableParent::ProcessInstance(id)) => {
                    QueryError::missing_variables(format!(
                        "ProcessInstance with the given id: '{id}' has no variables"
                    ))
                }
                (BucketError::VariableNotFound { .. }, VariableParent::Task(id)) => {
                    QueryError::variable_not_found(format!(
                        "Unable to find variable with  name '{name}' from task '{id}'"
                    ))
                }
                (BucketError::VariableNotFound { .. }, VariableParent::ProcessInstance(id)) => {
                    QueryError::variable_not_found(format!(
                        "Unable to find variable with  name '{name}' from process instance '{id}'"
                    ))
                }
            })?;

        debug!(variable = %name, "marking variable as deleted");
        self.write_variables(instance, variables).map_err(|e| {
            QueryError::persistence(
                format!(
                    "Unable to mark as deleted variable with name: {name}{}",
                    parent_suffix(instance)
                ),
                e,
            )
        })
    }

    /// Variables of the parent document, empty when the document has none yet.
    ///
    /// Fails when the parent document itself does not exist.
    pub fn find_variables_from_parent<V>(&self, instance: &V) -> QueryResult<VariableBuckets>
    where
        V: VariableScope + ?Sized,
    {
        let variables = match instance.parent() {
            VariableParent::Task(id) => {
                self.finder
                    .find_by_id::<Task, _>(&self.tasks, id, format!("Unable to find task with the given id: {id}"))?
                    .variables
            }
            VariableParent::ProcessInstance(id) => {
                self.finder
                    .find_by_id::<ProcessInstance, _>(
                        &self.process_instances,
                        id,
                        format!("Unable to find process instance with the given id: {id}"),
                    )?
                    .variables
            }
        };
        Ok(variables)
    }

    /// Like [`Self::find_variables_from_parent`] but a missing parent is `None`.
    pub fn find_variables_if_parent_exists<V>(
        &self,
        instance: &V,
    ) -> Result<Option<VariableBuckets>, StoreError>
    where
        V: VariableScope + ?Sized,
    {
        Ok(match instance.parent() {
            VariableParent::Task(id) => self.tasks.find_by_id(id)?.map(|t| t.variables),
            VariableParent::ProcessInstance(id) => {
                self.process_instances.find_by_id(id)?.map(|pi| pi.variables)
            }
        })
    }

    /// Partial-update target for the variable's parent document.
    pub fn update_request<V>(&self, instance: &V) -> UpdateRequest
    where
        V: VariableScope + ?Sized,
    {
        match instance.parent() {
            VariableParent::Task(id) => {
                UpdateRequest::new(&self.indexes.task_index, &self.indexes.task_document_type, id)
            }
            VariableParent::ProcessInstance(id) => UpdateRequest::new(
                &self.indexes.process_instance_index,
                &self.indexes.process_instance_document_type,
                id,
            ),
        }
    }

    /// Write the whole bucket map back as the parent's `variables` field.
    pub fn write_variables<V>(&self, instance: &V, variables: VariableBuckets) -> Result<(), StoreError>
    where
        V: VariableScope + ?Sized,
    {
        let mut doc = Map::new();
        doc.insert(VARIABLES_FIELD.to_string(), serde_json::to_value(variables)?);
        self.store
            .update(self.update_request(instance).doc(JsonValue::Object(doc)))
    }
}

/// " from task with the given id: T1" / " from process instance with the given id: P1".
fn parent_suffix<V>(instance: &V) -> String
where
    V: VariableScope + ?Sized,
{
    match instance.parent() {
        VariableParent::Task(id) => format!(" from task with the given id: {id}"),
        VariableParent::ProcessInstance(id) => format!(" from process instance with the given id: {id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_model::store::testing::ReadOnlyStore;
    use crate::read_model::InMemoryDocumentStore;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Keeps every partial update it receives, then applies it to the inner store.
    #[derive(Default)]
    struct RecordingStore {
        inner: InMemoryDocumentStore,
        updates: Mutex<Vec<UpdateRequest>>,
    }

    impl DocumentStore for RecordingStore {
        fn get(&self, index: &str, id: &str) -> Result<Option<JsonValue>, StoreError> {
            self.inner.get(index, id)
        }

        fn index(&self, index: &str, id: &str, document: JsonValue) -> Result<(), StoreError> {
            self.inner.index(index, id, document)
        }

        fn update(&self, request: UpdateRequest) -> Result<(), StoreError> {
            self.updates.lock().unwrap().push(request.clone());
            self.inner.update(request)
        }
    }

    fn legacy_time() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(1986, 7, 15, 0, 0, 0).unwrap()
    }

    fn stored_variable(process_instance_id: Option<&str>, task_id: Option<&str>) -> Variable {
        let mut var = Variable::new("var", "string", "oldValue").with_last_updated_time(legacy_time());
        var.process_instance_id = process_instance_id.map(str::to_string);
        var.task_id = task_id.map(str::to_string);
        var
    }

    fn updated_variable(now: chrono::DateTime<Utc>) -> Variable {
        Variable::new("var", "string", "content").with_last_updated_time(now)
    }

    fn setup() -> (Arc<InMemoryDocumentStore>, VariableUpdater<Arc<InMemoryDocumentStore>>) {
        let store = Arc::new(InMemoryDocumentStore::new());
        let updater = VariableUpdater::new(store.clone(), IndexesConfig::default());
        (store, updater)
    }

    fn seed_process_instance(store: &Arc<InMemoryDocumentStore>) {
        let mut pi = ProcessInstance::new("processInstanceId");
        pi.variables.upsert(stored_variable(Some("processInstanceId"), None));
        let repo: ProcessInstanceRepository<_> = DocumentRepository::new(store.clone(), "process_instance");
        repo.save(&pi).unwrap();
    }

    fn seed_task(store: &Arc<InMemoryDocumentStore>) {
        let mut task = Task::new("taskId");
        task.variables.upsert(stored_variable(None, Some("taskId")));
        let repo: TaskRepository<_> = DocumentRepository::new(store.clone(), "task");
        repo.save(&task).unwrap();
    }

    fn stored_process_variables(store: &Arc<InMemoryDocumentStore>) -> VariableBuckets {
        let repo: ProcessInstanceRepository<_> = DocumentRepository::new(store.clone(), "process_instance");
        repo.find_by_id("processInstanceId").unwrap().unwrap().variables
    }

    #[test]
    fn update_variable_updates_process_instance_variable() {
        let (store, updater) = setup();
        seed_process_instance(&store);
        let now = Utc::now();

        updater
            .update_variable(&updated_variable(now).with_process_instance_id("processInstanceId"))
            .unwrap();

        let variables = stored_process_variables(&store);
        let var = variables.find("string", "var").unwrap();
        assert_eq!(var.variable_type, "string");
        assert_eq!(var.value, json!("content"));
        assert_eq!(var.last_updated_time, Some(now));
        assert_eq!(var.process_instance_id.as_deref(), Some("processInstanceId"));
    }

    #[test]
    fn update_variable_updates_task_variable() {
        let (store, updater) = setup();
        seed_task(&store);
        let now = Utc::now();

        updater.update_variable(&updated_variable(now).with_task_id("taskId")).unwrap();

        let repo: TaskRepository<_> = DocumentRepository::new(store.clone(), "task");
        let task = repo.find_by_id("taskId").unwrap().unwrap();
        let var = task.variables.find("string", "var").unwrap();
        assert_eq!(var.value, json!("content"));
        assert_eq!(var.last_updated_time, Some(now));
        assert_eq!(var.task_id.as_deref(), Some("taskId"));
    }

    #[test]
    fn update_variable_fails_on_empty_bucket() {
        let (store, updater) = setup();
        seed_process_instance(&store);

        let err = updater
            .update_variable(&Variable::new("var", "integer", 1).with_process_instance_id("processInstanceId"))
            .unwrap_err();

        assert!(matches!(err, QueryError::MissingVariables(_)));
        assert_eq!(
            err.to_string(),
            "Unable to find variables for type: integer from process instance with the given id: processInstanceId"
        );
    }

    #[test]
    fn update_variable_treats_null_bucket_as_missing() {
        let (store, updater) = setup();
        store
            .index(
                "process_instance",
                "P1",
                json!({ "id": "P1", "status": "RUNNING", "variables": { "integer": null } }),
            )
            .unwrap();

        let err = updater
            .update_variable(&Variable::new("amount", "integer", 1).with_process_instance_id("P1"))
            .unwrap_err();
        assert!(matches!(err, QueryError::MissingVariables(_)));
        assert_eq!(
            err.to_string(),
            "Unable to find variables for type: integer from process instance with the given id: P1"
        );

        let err = updater
            .mark_variable_as_deleted(&Variable::new("amount", "integer", 1).with_process_instance_id("P1"))
            .unwrap_err();
        assert_eq!(err.to_string(), "ProcessInstance with the given id: 'P1' has no variables");
    }

    #[test]
    fn update_variable_fails_on_unknown_name() {
        let (store, updater) = setup();
        seed_task(&store);

        let err = updater
            .update_variable(&Variable::new("other", "string", "x").with_task_id("taskId"))
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Unable to find variable with name: other from task with the given id: taskId"
        );
    }

    #[test]
    fn update_variable_fails_when_parent_missing() {
        let (_store, updater) = setup();

        let err = updater
            .update_variable(&updated_variable(Utc::now()).with_task_id("ghost"))
            .unwrap_err();

        assert!(matches!(err, QueryError::NotFound(_)));
        assert_eq!(err.to_string(), "Unable to find task with the given id: ghost");
    }

    #[test]
    fn update_variable_wraps_store_failure() {
        let store = Arc::new(ReadOnlyStore::default());
        let mut pi = ProcessInstance::new("processInstanceId");
        pi.variables.upsert(stored_variable(Some("processInstanceId"), None));
        store
            .inner
            .index("process_instance", "processInstanceId", serde_json::to_value(&pi).unwrap())
            .unwrap();
        let updater = VariableUpdater::new(store, IndexesConfig::default());

        let err = updater
            .update_variable(&updated_variable(Utc::now()).with_process_instance_id("processInstanceId"))
            .unwrap_err();

        assert!(matches!(err, QueryError::Persistence { .. }));
        assert_eq!(
            err.to_string(),
            "Unable to update variable with name: var from process instance with the given id: processInstanceId"
        );
    }

    #[test]
    fn mark_variable_as_deleted_works_for_process_instance() {
        let (store, updater) = setup();
        seed_process_instance(&store);

        updater
            .mark_variable_as_deleted(&updated_variable(Utc::now()).with_process_instance_id("processInstanceId"))
            .unwrap();

        let variables = stored_process_variables(&store);
        let bucket = variables.bucket("string").unwrap();
        assert_eq!(bucket.len(), 1);
        let var = bucket.find_by_name("var").unwrap();
        assert!(var.marked_as_deleted);
        // Soft delete leaves the value alone.
        assert_eq!(var.value, json!("oldValue"));
    }

    #[test]
    fn mark_variable_as_deleted_works_for_task() {
        let (store, updater) = setup();
        seed_task(&store);

        updater
            .mark_variable_as_deleted(&updated_variable(Utc::now()).with_task_id("taskId"))
            .unwrap();

        let repo: TaskRepository<_> = DocumentRepository::new(store.clone(), "task");
        let task = repo.find_by_id("taskId").unwrap().unwrap();
        assert!(task.variables.find("string", "var").unwrap().marked_as_deleted);
    }

    #[test]
    fn mark_variable_as_deleted_messages_distinguish_empty_bucket() {
        let (store, updater) = setup();
        seed_task(&store);

        let err = updater
            .mark_variable_as_deleted(&Variable::new("var", "json", 1).with_task_id("taskId"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Task with the given id: 'taskId' has no variables");

        let err = updater
            .mark_variable_as_deleted(&Variable::new("nope", "string", 1).with_task_id("taskId"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unable to find variable with  name 'nope' from task 'taskId'"
        );
    }

    #[test]
    fn find_variables_from_parent_is_empty_for_document_without_variables() {
        let (store, updater) = setup();
        let repo: ProcessInstanceRepository<_> = DocumentRepository::new(store.clone(), "process_instance");
        repo.save(&ProcessInstance::new("P1")).unwrap();

        let variables = updater
            .find_variables_from_parent(&Variable::new("v", "string", 1).with_process_instance_id("P1"))
            .unwrap();

        assert!(variables.is_empty());
    }

    #[test]
    fn partial_update_carries_only_the_variables_field() {
        let store = Arc::new(RecordingStore::default());
        let mut pi = ProcessInstance::new("processInstanceId");
        pi.business_key = Some("order-42".to_string());
        pi.variables.upsert(stored_variable(Some("processInstanceId"), None));
        store
            .inner
            .index("process_instance", "processInstanceId", serde_json::to_value(&pi).unwrap())
            .unwrap();
        let updater = VariableUpdater::new(store.clone(), IndexesConfig::default());
        let now = Utc::now();

        updater
            .update_variable(&updated_variable(now).with_process_instance_id("processInstanceId"))
            .unwrap();

        let updates = store.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        let body = updates[0].source().as_object().unwrap();
        assert_eq!(body.keys().collect::<Vec<_>>(), vec!["variables"]);
        let variables: VariableBuckets = serde_json::from_value(body["variables"].clone()).unwrap();
        assert_eq!(variables.find("string", "var").unwrap().value, json!("content"));

        let stored = store.inner.get("process_instance", "processInstanceId").unwrap().unwrap();
        assert_eq!(stored["businessKey"], json!("order-42"));
    }

    #[test]
    fn update_request_targets_parent_index() {
        let indexes = IndexesConfig {
            task_index: "tasks".to_string(),
            ..IndexesConfig::default()
        };
        let updater = VariableUpdater::new(Arc::new(InMemoryDocumentStore::new()), indexes);

        let task_var = Variable::new("v", "string", 1)
            .with_process_instance_id("P1")
            .with_task_id("T1");
        let request = updater.update_request(&task_var);
        assert_eq!((request.index(), request.doc_type(), request.id()), ("tasks", "_doc", "T1"));

        let process_var = Variable::new("v", "string", 1).with_process_instance_id("P1");
        let request = updater.update_request(&process_var);
        assert_eq!(request.index(), "process_instance");
        assert_eq!(request.id(), "P1");
    }
}
