//! Task actions and the context they run in

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::environment::RuntimeEnvironment;

/// Error type task actions fail with
pub type ActionError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// What a task action returns
pub type ActionResult = std::result::Result<Value, ActionError>;

/// Boxed future used by closure-based actions
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Options passed to a task, keyed by option name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskArgs(BTreeMap<String, Value>);

impl TaskArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Flag lookup; absent flags are `false`
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for TaskArgs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Returned by [`TaskContext::invoke_previous`] when the running action is
/// the oldest implementation of its task.
#[derive(Debug, thiserror::Error)]
#[error("task '{task}' has no previous implementation to invoke")]
pub struct NoPreviousAction {
    pub task: String,
}

/// A task's executable body
#[async_trait]
pub trait TaskAction: Send + Sync {
    async fn run(&self, ctx: TaskContext<'_>) -> ActionResult;
}

/// Adapts a closure into a [`TaskAction`]
///
/// ```
/// use zkit_core::tasks::{FnAction, TaskContribution};
///
/// let hello = TaskContribution::new(
///     "hello",
///     FnAction::new(|ctx| Box::pin(async move {
///         Ok(serde_json::json!(format!("hello from {}", ctx.name())))
///     })),
/// );
/// assert_eq!(hello.name, "hello");
/// ```
pub struct FnAction<F>(F);

impl<F> FnAction<F> {
    pub fn new(f: F) -> Self
    where
        F: for<'a> Fn(TaskContext<'a>) -> BoxFuture<'a, ActionResult> + Send + Sync + 'static,
    {
        Self(f)
    }
}

#[async_trait]
impl<F> TaskAction for FnAction<F>
where
    F: for<'a> Fn(TaskContext<'a>) -> BoxFuture<'a, ActionResult> + Send + Sync + 'static,
{
    async fn run(&self, ctx: TaskContext<'_>) -> ActionResult {
        (self.0)(ctx).await
    }
}

/// Everything an action receives for one call
///
/// `previous` holds the implementations this action replaced, newest first;
/// [`invoke_previous`](Self::invoke_previous) calls the head of that slice
/// and hands it the rest.
#[derive(Clone, Copy)]
pub struct TaskContext<'a> {
    name: &'a str,
    args: &'a TaskArgs,
    env: &'a RuntimeEnvironment,
    cancellation: &'a CancellationToken,
    previous: &'a [Arc<dyn TaskAction>],
}

impl<'a> TaskContext<'a> {
    pub(crate) fn new(
        name: &'a str,
        args: &'a TaskArgs,
        env: &'a RuntimeEnvironment,
        cancellation: &'a CancellationToken,
        previous: &'a [Arc<dyn TaskAction>],
    ) -> Self {
        Self {
            name,
            args,
            env,
            cancellation,
            previous,
        }
    }

    /// Name of the task being run
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn args(&self) -> &'a TaskArgs {
        self.args
    }

    pub fn env(&self) -> &'a RuntimeEnvironment {
        self.env
    }

    /// Cancellation signal for the whole run; long I/O should watch it
    pub fn cancellation(&self) -> &'a CancellationToken {
        self.cancellation
    }

    /// Whether an older implementation exists
    pub fn has_previous(&self) -> bool {
        !self.previous.is_empty()
    }

    /// Run the implementation this action replaced, with the same arguments
    pub async fn invoke_previous(&self) -> ActionResult {
        self.invoke_previous_with(self.args).await
    }

    /// Run the implementation this action replaced, with other arguments
    pub async fn invoke_previous_with(&self, args: &TaskArgs) -> ActionResult {
        let Some((next, older)) = self.previous.split_first() else {
            return Err(Box::new(NoPreviousAction {
                task: self.name.to_string(),
            }));
        };
        tracing::trace!(task = self.name, remaining = older.len(), "invoking previous implementation");
        next.run(TaskContext::new(
            self.name,
            args,
            self.env,
            self.cancellation,
            older,
        ))
        .await
    }
}
