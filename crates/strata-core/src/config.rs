//! Entity configuration
//!
//! Configs are immutable once built and shared through `Arc`, so one data
//! node config can feed several task configs and one task config several
//! pipeline configs.

use crate::connector::IN_MEMORY;
use crate::scope::Scope;
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, TimeZone, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Data node configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DataNodeConfig {
    id: String,
    storage_type: String,
    scope: Scope,
    default_data: Option<Value>,
    properties: IndexMap<String, Value>,
}

impl DataNodeConfig {
    /// Create config with the in-memory storage type and `PIPELINE` scope
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            storage_type: IN_MEMORY.to_string(),
            scope: Scope::default(),
            default_data: None,
            properties: IndexMap::new(),
        }
    }

    /// Set scope
    #[must_use]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Set connector storage type
    #[must_use]
    pub fn with_storage_type(mut self, storage_type: impl Into<String>) -> Self {
        self.storage_type = storage_type.into();
        self
    }

    /// Set value written when a data node is created
    #[must_use]
    pub fn with_default_data(mut self, value: Value) -> Self {
        self.default_data = Some(value);
        self
    }

    /// Add a free-form property copied onto realized data nodes
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Config id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Connector storage type
    #[inline]
    #[must_use]
    pub fn storage_type(&self) -> &str {
        &self.storage_type
    }

    /// Declared scope
    #[inline]
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Default value
    #[inline]
    #[must_use]
    pub fn default_data(&self) -> Option<&Value> {
        self.default_data.as_ref()
    }

    /// Properties
    #[inline]
    #[must_use]
    pub fn properties(&self) -> &IndexMap<String, Value> {
        &self.properties
    }
}

/// Task configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TaskConfig {
    id: String,
    function: String,
    inputs: Vec<Arc<DataNodeConfig>>,
    outputs: Vec<Arc<DataNodeConfig>>,
}

impl TaskConfig {
    /// Create config running the registered function `function`
    #[must_use]
    pub fn new(id: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            function: function.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Append an input
    #[must_use]
    pub fn with_input(mut self, input: Arc<DataNodeConfig>) -> Self {
        self.inputs.push(input);
        self
    }

    /// Append several inputs
    #[must_use]
    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = Arc<DataNodeConfig>>) -> Self {
        self.inputs.extend(inputs);
        self
    }

    /// Append an output
    #[must_use]
    pub fn with_output(mut self, output: Arc<DataNodeConfig>) -> Self {
        self.outputs.push(output);
        self
    }

    /// Append several outputs
    #[must_use]
    pub fn with_outputs(mut self, outputs: impl IntoIterator<Item = Arc<DataNodeConfig>>) -> Self {
        self.outputs.extend(outputs);
        self
    }

    /// Config id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Registered function name
    #[inline]
    #[must_use]
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Input configs in position order
    #[inline]
    #[must_use]
    pub fn inputs(&self) -> &[Arc<DataNodeConfig>] {
        &self.inputs
    }

    /// Output configs in position order
    #[inline]
    #[must_use]
    pub fn outputs(&self) -> &[Arc<DataNodeConfig>] {
        &self.outputs
    }

    /// Inputs followed by outputs
    pub fn data_node_configs(&self) -> impl Iterator<Item = &Arc<DataNodeConfig>> {
        self.inputs.iter().chain(&self.outputs)
    }

    /// Narrowest scope among the task's data nodes
    #[must_use]
    pub fn effective_scope(&self) -> Scope {
        Scope::narrowest(self.data_node_configs().map(|dn| dn.scope()))
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    id: String,
    tasks: Vec<Arc<TaskConfig>>,
}

impl PipelineConfig {
    /// Create config over `tasks`, kept in the given order
    #[must_use]
    pub fn new(id: impl Into<String>, tasks: Vec<Arc<TaskConfig>>) -> Self {
        Self {
            id: id.into(),
            tasks,
        }
    }

    /// Config id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Task configs
    #[inline]
    #[must_use]
    pub fn tasks(&self) -> &[Arc<TaskConfig>] {
        &self.tasks
    }

    /// Narrowest scope among the tasks' effective scopes
    #[must_use]
    pub fn effective_scope(&self) -> Scope {
        Scope::narrowest(self.tasks.iter().map(|t| t.effective_scope()))
    }
}

/// Scenario configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioConfig {
    id: String,
    pipelines: Vec<Arc<PipelineConfig>>,
    frequency: Option<Frequency>,
    properties: IndexMap<String, Value>,
}

impl ScenarioConfig {
    /// Create config over `pipelines`, without a cycle
    #[must_use]
    pub fn new(id: impl Into<String>, pipelines: Vec<Arc<PipelineConfig>>) -> Self {
        Self {
            id: id.into(),
            pipelines,
            frequency: None,
            properties: IndexMap::new(),
        }
    }

    /// Attach scenarios to cycles of `frequency`
    #[must_use]
    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    /// Add a property copied onto created scenarios
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Config id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Pipeline configs
    #[inline]
    #[must_use]
    pub fn pipelines(&self) -> &[Arc<PipelineConfig>] {
        &self.pipelines
    }

    /// Cycle frequency
    #[inline]
    #[must_use]
    pub fn frequency(&self) -> Option<Frequency> {
        self.frequency
    }

    /// Properties
    #[inline]
    #[must_use]
    pub fn properties(&self) -> &IndexMap<String, Value> {
        &self.properties
    }
}

/// Length of a business cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Calendar day
    Daily,
    /// ISO week starting Monday
    Weekly,
    /// Calendar month
    Monthly,
    /// Calendar quarter
    Quarterly,
    /// Calendar year
    Yearly,
}

impl Frequency {
    /// Lower-case frequency name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Yearly => "yearly",
        }
    }

    /// Half-open `[start, end)` period containing `date`, in UTC.
    ///
    /// `None` only when the period falls outside the representable calendar.
    #[must_use]
    pub fn period(self, date: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let day = date.date_naive();
        let (start, end) = match self {
            Frequency::Daily => (day, day.checked_add_days(Days::new(1))?),
            Frequency::Weekly => {
                let start = day.checked_sub_days(Days::new(u64::from(
                    day.weekday().num_days_from_monday(),
                )))?;
                (start, start.checked_add_days(Days::new(7))?)
            }
            Frequency::Monthly => {
                let start = NaiveDate::from_ymd_opt(day.year(), day.month(), 1)?;
                (start, start.checked_add_months(Months::new(1))?)
            }
            Frequency::Quarterly => {
                let first_month = (day.month0() / 3) * 3 + 1;
                let start = NaiveDate::from_ymd_opt(day.year(), first_month, 1)?;
                (start, start.checked_add_months(Months::new(3))?)
            }
            Frequency::Yearly => {
                let start = NaiveDate::from_ymd_opt(day.year(), 1, 1)?;
                (start, start.checked_add_months(Months::new(12))?)
            }
        };
        Some((midnight(start)?, midnight(end)?))
    }
}

fn midnight(day: NaiveDate) -> Option<DateTime<Utc>> {
    day.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive))
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
