//! Progress observer (§4.9): the orchestrator publishes one event per
//! completed stage; the CLI renders them with `indicatif`.

use std::sync::mpsc::Sender;

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub stage_name: &'static str,
    pub step_number: u32,
    pub total_steps: u32,
}

pub const TOTAL_STAGES: u32 = 9;

pub fn publish(sender: Option<&Sender<ProgressEvent>>, stage_name: &'static str, step_number: u32) {
    if let Some(sender) = sender {
        let _ = sender.send(ProgressEvent { stage_name, step_number, total_steps: TOTAL_STAGES });
    }
}
