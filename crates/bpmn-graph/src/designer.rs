//! Designer facade
//!
//! Wires a command bus, an element store, a model codec and a readiness gate
//! together and exposes the public graph operations. Every query returns
//! export records rather than live elements.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, span, warn, Level};

use crate::codec::{attach_codec, read_reply, DiagramDocument, JsonModelCodec, ModelCodec};
use crate::core::{
    topics, CommandBus, DesignerConfig, Element, ElementRepository, ReadinessGate, Result,
};
use crate::engine::{
    export_element, resolve_selection, set_export_data, ElementCloner, ExportRecord,
    FrontTraversal, PropertyMerger, PropertyPatch, Scale, UpdateOutcome,
};
use crate::store::{BusRepository, ElementStore, SharedStore};

/// Entry point for editing one diagram
///
/// The repository type decides how the engines reach the store:
/// [`SharedStore`] directly, [`BusRepository`] through bus requests.
pub struct Designer<R: ElementRepository = SharedStore> {
    repo: R,
    store: SharedStore,
    bus: Arc<CommandBus>,
    config: DesignerConfig,
    gate: ReadinessGate,
}

impl Designer<SharedStore> {
    /// Create a designer whose engines access the store directly
    pub fn new(config: DesignerConfig) -> Result<Self> {
        Self::assemble(config, |store, _| store.clone())
    }
}

impl Designer<BusRepository> {
    /// Create a designer whose engines reach the store only through the bus
    pub fn over_bus(config: DesignerConfig) -> Result<Self> {
        Self::assemble(config, |_, bus| BusRepository::new(Arc::clone(bus)))
    }
}

impl<R: ElementRepository> Designer<R> {
    fn assemble<F>(config: DesignerConfig, make_repo: F) -> Result<Self>
    where
        F: FnOnce(&SharedStore, &Arc<CommandBus>) -> R,
    {
        let bus = CommandBus::shared();
        let store = SharedStore::new(ElementStore::new());
        store.attach(&bus)?;
        attach_codec(&bus, Arc::new(JsonModelCodec::new()))?;
        let repo = make_repo(&store, &bus);
        debug!(scale = config.scale, readonly = config.readonly, "Designer assembled");
        Ok(Self {
            repo,
            store,
            bus,
            config,
            gate: ReadinessGate::opened(),
        })
    }

    /// Gate imports on an external readiness signal
    pub fn with_readiness(mut self, gate: ReadinessGate) -> Self {
        self.gate = gate;
        self
    }

    /// Swap the model codec answering `model.import`/`model.export`
    pub fn replace_codec(&self, codec: Arc<dyn ModelCodec>) -> Result<()> {
        self.bus.unsubscribe(topics::MODEL_IMPORT);
        self.bus.unsubscribe(topics::MODEL_EXPORT);
        attach_codec(&self.bus, codec)
    }

    pub fn bus(&self) -> &Arc<CommandBus> {
        &self.bus
    }

    pub fn config(&self) -> &DesignerConfig {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Handle to the readiness gate, for the collaborator that opens it
    pub fn readiness(&self) -> &ReadinessGate {
        &self.gate
    }

    /// Whether a shape kind may be created under the current configuration
    pub fn is_supported(&self, bpmn_name: &str) -> bool {
        self.config.is_supported(bpmn_name)
    }

    /// Export records of every element
    pub fn get_all_elements(&self) -> Vec<ExportRecord> {
        self.repo.elements().iter().map(export_element).collect()
    }

    /// Export record of the root process
    pub fn get_root_element(&self) -> Option<ExportRecord> {
        let process = self.repo.process();
        set_export_data(process.as_ref().map(Into::into))
    }

    /// Nearest upstream element that is not a sequence flow
    pub fn get_front_element(&self, selected: Option<&str>) -> Result<Option<ExportRecord>> {
        let element = resolve_selection(&self.repo, selected)?;
        let front = FrontTraversal::new(&self.repo).front_element(&element);
        Ok(set_export_data(front.as_ref().map(Into::into)))
    }

    /// Every upstream element, nearest first
    pub fn get_front_elements(&self, selected: Option<&str>) -> Result<Vec<ExportRecord>> {
        let element = resolve_selection(&self.repo, selected)?;
        let fronts = FrontTraversal::new(&self.repo).front_elements(&element);
        Ok(fronts.iter().map(export_element).collect())
    }

    /// Upstream elements of one BPMN kind
    pub fn get_front_elements_by_bpmn(
        &self,
        selected: Option<&str>,
        bpmn_name: &str,
    ) -> Result<Vec<ExportRecord>> {
        let element = resolve_selection(&self.repo, selected)?;
        let fronts = FrontTraversal::new(&self.repo).front_elements_by_bpmn(&element, bpmn_name);
        Ok(fronts.iter().map(export_element).collect())
    }

    /// Patch an element, notify the renderer and run the callback
    pub fn update_properties<F>(
        &self,
        id: &str,
        patch: &PropertyPatch,
        callback: F,
    ) -> Result<UpdateOutcome>
    where
        F: FnOnce(),
    {
        if self.config.readonly {
            warn!(element_id = id, "Designer is read-only, update ignored");
            return Ok(UpdateOutcome::ReadOnly);
        }
        PropertyMerger::new(&self.repo)
            .with_renderer(&self.bus)
            .update_properties(id, patch, callback)
    }

    /// Patch the root process and run the callback
    pub fn update_process_properties<F>(
        &self,
        patch: &PropertyPatch,
        callback: F,
    ) -> Result<UpdateOutcome>
    where
        F: FnOnce(),
    {
        if self.config.readonly {
            warn!("Designer is read-only, process update ignored");
            return Ok(UpdateOutcome::ReadOnly);
        }
        PropertyMerger::new(&self.repo).update_process_properties(patch, callback)
    }

    /// Clone an element by id; `None` when it is missing or malformed
    pub fn clone_element(&self, id: &str) -> Result<Option<Element>> {
        let Some(element) = self.repo.element(id) else {
            debug!(element_id = id, "Nothing to clone");
            return Ok(None);
        };
        ElementCloner::with_prefix(&self.repo, self.config.id_prefix.as_str())
            .clone_element(&element)
    }

    /// Scale a value by the configured canvas scale
    pub fn set_scale(&self, value: &Value) -> Value {
        value.set_scale(self.config.scale)
    }

    /// Undo [`set_scale`](Self::set_scale)
    pub fn restore_scale(&self, value: &Value) -> Value {
        value.restore_scale(self.config.scale)
    }

    /// Replace the graph with a serialized diagram
    ///
    /// Waits for the readiness gate first. Every imported element is passed
    /// through `shape.create`. Returns the number of elements loaded.
    pub fn import(&self, text: &str) -> Result<usize> {
        let import_span = span!(Level::INFO, "import_diagram", input_len = text.len());
        let _enter = import_span.enter();

        self.gate
            .wait(self.config.ready_timeout_ms.map(Duration::from_millis))?;

        let reply = self
            .bus
            .request(topics::MODEL_IMPORT, Some(Value::String(text.to_string())));
        let document: DiagramDocument =
            serde_json::from_value(read_reply(topics::MODEL_IMPORT, reply, "document")?)?;

        self.store.load(document.process, Vec::new())?;
        let count = document.elements.len();
        for element in document.elements {
            self.repo.create_shape(element)?;
        }
        info!(element_count = count, "Diagram imported");
        Ok(count)
    }

    /// [`import`](Self::import) with an error-first callback
    pub fn import_bpmn<F>(&self, text: &str, callback: F)
    where
        F: FnOnce(Result<usize>),
    {
        let result = self.import(text);
        if let Err(e) = &result {
            warn!(error = %e, "Diagram import failed");
        }
        callback(result);
    }

    /// Serialize the current graph
    pub fn export(&self) -> Result<String> {
        let export_span = span!(Level::INFO, "export_diagram");
        let _enter = export_span.enter();

        let document = DiagramDocument::from_repository(&self.repo);
        let reply = self
            .bus
            .request(topics::MODEL_EXPORT, Some(serde_json::to_value(&document)?));
        let text = match read_reply(topics::MODEL_EXPORT, reply, "text")? {
            Value::String(text) => text,
            other => other.to_string(),
        };
        info!(
            element_count = document.elements.len(),
            output_len = text.len(),
            "Diagram exported"
        );
        Ok(text)
    }

    /// [`export`](Self::export) with an error-first callback
    pub fn export_bpmn<F>(&self, callback: F)
    where
        F: FnOnce(Result<String>),
    {
        let result = self.export();
        if let Err(e) = &result {
            warn!(error = %e, "Diagram export failed");
        }
        callback(result);
    }

    /// Release keyboard state and every bus subscription
    ///
    /// Afterwards every query reads empty and every update is a no-op for a
    /// bus-backed designer.
    pub fn destroy(&self) {
        self.bus.notify(topics::KEY_CLEAR, Value::Null);
        self.bus.destroy();
        info!("Designer destroyed");
    }
}
