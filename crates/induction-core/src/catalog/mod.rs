//! Task catalog
//!
//! Binds a `(task_id, task_category)` pair to its rule, its query budget,
//! and the sample and held-out test cases used for grading. Budgets come
//! from a [`TaskTable`] (the `tasks.json` shape); rules and case inputs come
//! from [`TaskDefinition`]s.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::rules::RuleHandle;
use crate::value::{IoPair, Value};
use crate::{InductionError, Result};

pub mod builtin;

/// Task family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Numerical,
    Lexical,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 2] = [TaskCategory::Numerical, TaskCategory::Lexical];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Numerical => "numerical",
            TaskCategory::Lexical => "lexical",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskCategory {
    type Err = InductionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "numerical" => Ok(TaskCategory::Numerical),
            "lexical" => Ok(TaskCategory::Lexical),
            other => Err(InductionError::InvalidConfig(format!(
                "Invalid task category: {}",
                other
            ))),
        }
    }
}

/// Query budget of one task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Total number of inputs a session may evaluate
    pub total_queries: usize,
    /// Maximum inputs per query call
    pub query_batch_size: usize,
}

impl TaskConfig {
    pub fn new(total_queries: usize, query_batch_size: usize) -> Result<Self> {
        if total_queries == 0 || query_batch_size == 0 {
            return Err(InductionError::InvalidConfig(format!(
                "total_queries and query_batch_size must be positive, got {} and {}",
                total_queries, query_batch_size
            )));
        }
        Ok(Self {
            total_queries,
            query_batch_size,
        })
    }
}

/// One row of the task table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub total_queries: usize,
    pub query_batch_size: usize,
}

impl TaskEntry {
    pub fn new(id: impl Into<String>, total_queries: usize, query_batch_size: usize) -> Self {
        Self {
            id: id.into(),
            name: None,
            total_queries,
            query_batch_size,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn config(&self) -> Result<TaskConfig> {
        TaskConfig::new(self.total_queries, self.query_batch_size)
    }
}

/// Task budgets grouped by category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTable {
    #[serde(default)]
    pub numerical: Vec<TaskEntry>,
    #[serde(default)]
    pub lexical: Vec<TaskEntry>,
}

impl TaskTable {
    /// Load a task table from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let table: Self = serde_json::from_str(&content)?;
        table.validate()?;
        Ok(table)
    }

    pub fn entries(&self, category: TaskCategory) -> &[TaskEntry] {
        match category {
            TaskCategory::Numerical => &self.numerical,
            TaskCategory::Lexical => &self.lexical,
        }
    }

    pub fn find(&self, task_id: &str, category: TaskCategory) -> Option<&TaskEntry> {
        self.entries(category).iter().find(|entry| entry.id == task_id)
    }

    /// Reject non-positive budgets and duplicate ids within a category
    pub fn validate(&self) -> Result<()> {
        for category in TaskCategory::ALL {
            let mut seen = HashSet::new();
            for entry in self.entries(category) {
                if !seen.insert(entry.id.as_str()) {
                    return Err(InductionError::InvalidConfig(format!(
                        "duplicate task {} in {} tasks",
                        entry.id, category
                    )));
                }
                entry.config()?;
            }
        }
        Ok(())
    }
}

/// Rule plus the inputs of its sample and held-out test cases
#[derive(Debug, Clone)]
pub struct TaskDefinition {
    pub category: TaskCategory,
    pub rule: RuleHandle,
    pub sample_inputs: Vec<Value>,
    pub test_inputs: Vec<Value>,
}

/// Everything a session needs about its task
#[derive(Debug, Clone)]
pub struct TaskBinding {
    pub task_id: String,
    pub category: TaskCategory,
    pub rule: RuleHandle,
    pub config: TaskConfig,
    pub sample_cases: Arc<Vec<IoPair>>,
    pub test_cases: Arc<Vec<IoPair>>,
}

#[derive(Debug)]
struct PreparedTask {
    rule: RuleHandle,
    sample_cases: Arc<Vec<IoPair>>,
    test_cases: Arc<Vec<IoPair>>,
}

/// Lookup from `(task_id, category)` to a [`TaskBinding`]
#[derive(Debug)]
pub struct TaskCatalog {
    tasks: HashMap<(TaskCategory, String), PreparedTask>,
    table: TaskTable,
}

impl TaskCatalog {
    pub fn new(definitions: Vec<TaskDefinition>, table: TaskTable) -> Self {
        let mut tasks = HashMap::new();
        for definition in definitions {
            let name = definition.rule.name().to_string();
            let prepared = PreparedTask {
                sample_cases: Arc::new(evaluate_cases(&definition.rule, definition.sample_inputs)),
                test_cases: Arc::new(evaluate_cases(&definition.rule, definition.test_inputs)),
                rule: definition.rule,
            };
            tasks.insert((definition.category, name), prepared);
        }

        for category in TaskCategory::ALL {
            for entry in table.entries(category) {
                if !tasks.contains_key(&(category, entry.id.clone())) {
                    tracing::warn!("Task {} in {} tasks has no rule definition", entry.id, category);
                }
            }
        }

        Self { tasks, table }
    }

    /// Built-in rules with their default budgets
    pub fn builtin() -> Self {
        Self::new(builtin::definitions(), builtin::default_table())
    }

    /// Built-in rules with budgets from `table`
    pub fn with_table(table: TaskTable) -> Self {
        Self::new(builtin::definitions(), table)
    }

    pub fn table(&self) -> &TaskTable {
        &self.table
    }

    /// Fail if any table entry names a rule the catalog does not define
    pub fn validate(&self) -> Result<()> {
        self.table.validate()?;
        for category in TaskCategory::ALL {
            for entry in self.table.entries(category) {
                if !self.tasks.contains_key(&(category, entry.id.clone())) {
                    return Err(InductionError::InvalidConfig(format!(
                        "Task {} in {} tasks has no rule definition",
                        entry.id, category
                    )));
                }
            }
        }
        Ok(())
    }

    /// Resolve a task; a missing rule or table entry is a configuration error
    pub fn bind(&self, task_id: &str, category: TaskCategory) -> Result<TaskBinding> {
        let missing = || InductionError::InvalidTaskConfig {
            task_id: task_id.to_string(),
            category: category.to_string(),
        };
        let entry = self.table.find(task_id, category).ok_or_else(missing)?;
        let prepared = self
            .tasks
            .get(&(category, task_id.to_string()))
            .ok_or_else(missing)?;

        Ok(TaskBinding {
            task_id: task_id.to_string(),
            category,
            rule: Arc::clone(&prepared.rule),
            config: entry.config()?,
            sample_cases: Arc::clone(&prepared.sample_cases),
            test_cases: Arc::clone(&prepared.test_cases),
        })
    }
}

fn evaluate_cases(rule: &RuleHandle, inputs: Vec<Value>) -> Vec<IoPair> {
    inputs
        .into_iter()
        .filter_map(|raw| {
            let input = raw.normalize();
            if let Err(reason) = rule.validate_input(&input) {
                tracing::warn!("Dropping case {} for {}: {}", input, rule.name(), reason);
                return None;
            }
            rule.predicate(&input).map(|output| IoPair::new(input, output))
        })
        .collect()
}
