//! Running the per-method passes over many methods at once.
//!
//! Methods never share state: each one is parsed into its own graph and processor and handed to a
//! job that owns them. A job runs on a rayon thread, or on a dedicated thread when a timeout is
//! configured, so that a method stuck in a pass can be abandoned without stalling the rest.

use crate::ast::StatementGraph;
use crate::vars::{
    ConstantStrings, LocalVariableTable, VarProcessor, parse_local_variable_table,
};
use crate::{DecompilerOptions, MethodDecompileError, process_method};
use core::any::Any;
use core::time::Duration;
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;

/// Raw body of a `LocalVariableTable` or `LocalVariableTypeTable` attribute.
#[derive(Clone, Debug)]
pub struct LvtAttribute {
    pub bytes: Vec<u8>,
    pub is_lvtt: bool,
}

/// One method as produced by the structuring stage.
#[derive(Clone, Debug)]
pub struct MethodInput {
    pub name: String,
    pub descriptor: String,
    /// `None` for static methods.
    pub this_class: Option<String>,
    pub graph: StatementGraph,
    pub lvt_attributes: Vec<LvtAttribute>,
}

#[derive(Clone, Debug)]
pub struct ProcessedMethod {
    pub graph: StatementGraph,
    pub processor: VarProcessor,
}

#[derive(Debug)]
pub struct MethodReport {
    pub name: String,
    pub result: Result<ProcessedMethod, MethodDecompileError>,
}

#[derive(Debug)]
pub enum WorkerOutcome<T> {
    Finished(Result<T, MethodDecompileError>),
    TimedOut,
}

type Slot<T> = (Mutex<Option<Result<T, MethodDecompileError>>>, Condvar);

/// A job running on its own thread. The result is handed over through a condition variable.
pub struct MethodWorker<T> {
    name: String,
    slot: Arc<Slot<T>>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

fn run_guarded<T>(
    job: impl FnOnce() -> Result<T, MethodDecompileError>,
) -> Result<T, MethodDecompileError> {
    panic::catch_unwind(AssertUnwindSafe(job))
        .unwrap_or_else(|payload| Err(MethodDecompileError::Panicked(panic_message(&*payload))))
}

impl<T: Send + 'static> MethodWorker<T> {
    pub fn spawn<F>(name: impl Into<String>, job: F) -> Self
    where
        F: FnOnce() -> Result<T, MethodDecompileError> + Send + 'static,
    {
        let name = name.into();
        let slot: Arc<Slot<T>> = Arc::new((Mutex::new(None), Condvar::new()));

        let thread_slot = Arc::clone(&slot);
        let spawned = thread::Builder::new()
            .name(format!("method {name}"))
            .spawn(move || {
                let result = run_guarded(job);
                let (lock, signal) = &*thread_slot;
                // The lock is only ever held to move the result in or out, so poisoning carries
                // no meaning here.
                *lock.lock().unwrap_or_else(PoisonError::into_inner) = Some(result);
                signal.notify_all();
            });
        if let Err(error) = spawned {
            *slot.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(Err(error.into()));
        }

        Self { name, slot }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Blocks until the job finishes or `timeout` elapses. Without a timeout, waits indefinitely.
    ///
    /// A worker that timed out is abandoned: its thread keeps running to completion, but the
    /// result is dropped.
    pub fn wait(self, timeout: Option<Duration>) -> WorkerOutcome<T> {
        let (lock, signal) = &*self.slot;
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut guard = match timeout {
            None => signal
                .wait_while(guard, |result| result.is_none())
                .unwrap_or_else(PoisonError::into_inner),
            Some(timeout) => {
                signal
                    .wait_timeout_while(guard, timeout, |result| result.is_none())
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
        };
        match guard.take() {
            Some(result) => WorkerOutcome::Finished(result),
            None => {
                log::warn!("Abandoning method `{}` after {timeout:?}", self.name);
                WorkerOutcome::TimedOut
            }
        }
    }
}

// Builds the variable processor and the debug table of a method.
fn prepare(
    method: &MethodInput,
    strings: &impl ConstantStrings,
    options: &DecompilerOptions,
) -> Result<VarProcessor, MethodDecompileError> {
    let mut processor =
        VarProcessor::new(method.descriptor.as_bytes(), method.this_class.as_deref())?;

    // The value table goes first so that type-table entries only contribute signatures.
    let mut attributes: Vec<&LvtAttribute> = method.lvt_attributes.iter().collect();
    attributes.sort_by_key(|attribute| attribute.is_lvtt);
    let mut table: Option<LocalVariableTable> = None;
    for attribute in attributes {
        let parsed = parse_local_variable_table(&attribute.bytes, attribute.is_lvtt, strings)?;
        match &mut table {
            Some(table) => table.merge_lvts(&parsed, options.lvt_merge_key),
            None => table = Some(parsed),
        }
    }
    if let Some(table) = table {
        processor.set_lvt(table);
    }
    Ok(processor)
}

fn process(
    mut graph: StatementGraph,
    mut processor: VarProcessor,
    options: &DecompilerOptions,
) -> Result<ProcessedMethod, MethodDecompileError> {
    process_method(&mut graph, &mut processor, options)?;
    Ok(ProcessedMethod { graph, processor })
}

fn decompile_method(
    method: MethodInput,
    strings: &impl ConstantStrings,
    options: &DecompilerOptions,
) -> Result<ProcessedMethod, MethodDecompileError> {
    let processor = prepare(&method, strings, options)?;
    let graph = method.graph;
    match options.method_timeout {
        None => run_guarded(|| process(graph, processor, options)),
        Some(timeout) => {
            let job_options = options.clone();
            let worker =
                MethodWorker::spawn(method.name, move || process(graph, processor, &job_options));
            match worker.wait(Some(timeout)) {
                WorkerOutcome::Finished(result) => result,
                WorkerOutcome::TimedOut => Err(MethodDecompileError::TimedOut(timeout)),
            }
        }
    }
}

/// Processes independent methods in parallel. Every method gets a report; a failure only affects
/// the method it happened in.
pub fn decompile_methods(
    methods: Vec<MethodInput>,
    strings: &(impl ConstantStrings + Sync),
    options: &DecompilerOptions,
) -> Vec<MethodReport> {
    methods
        .into_par_iter()
        .map(|method| {
            let name = method.name.clone();
            let result = decompile_method(method, strings, options);
            if let Err(error) = &result {
                log::warn!("Failed to process method `{name}`: {error}");
            }
            MethodReport { name, result }
        })
        .collect()
}
