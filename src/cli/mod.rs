//! Workflow orchestration behind the command-line entry points

pub mod orchestration;

pub use orchestration::{
    run_publish_workflow, run_stamp_workflow, BuildTarget, PublishWorkflowArgs, WorkflowResult,
};
