//! Per-target fan-out of lifecycle operations.
//!
//! Targets are processed sequentially and independently; one target's failure
//! never short-circuits the rest of the batch.
use crate::lifecycle;
use crate::registry::TargetConfig;
use crate::runtime::ContainerRuntime;

/// Lifecycle operation applied uniformly across a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Start,
    Stop,
    Remove,
}

impl Operation {
    fn gerund(self) -> &'static str {
        match self {
            Operation::Start => "Starting",
            Operation::Stop => "Stopping",
            Operation::Remove => "Removing",
        }
    }
}

/// Aggregate outcome of one batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: usize,
    pub total: usize,
}

impl BatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.total
    }
}

/// Apply `operation` to every target, printing each outcome as it completes.
pub fn run_batch(
    runtime: &dyn ContainerRuntime,
    targets: &[TargetConfig],
    operation: Operation,
) -> BatchReport {
    let mut succeeded = 0;
    for target in targets {
        println!("{} {}:", operation.gerund(), target.name);
        let result = match operation {
            Operation::Start => lifecycle::start_container(runtime, target),
            Operation::Stop => lifecycle::stop_container(runtime, target),
            Operation::Remove => lifecycle::remove_container(runtime, target),
        };
        match result {
            Ok(()) => succeeded += 1,
            Err(err) => {
                tracing::error!(fixture = %target.name, "operation failed: {err:#}");
                println!("  Failed: {err:#}");
            }
        }
    }

    let report = BatchReport {
        succeeded,
        total: targets.len(),
    };
    println!();
    if report.all_succeeded() {
        println!("{}/{} targets succeeded", report.succeeded, report.total);
    } else {
        println!(
            "Warning: {}/{} targets succeeded",
            report.succeeded, report.total
        );
    }
    report
}
