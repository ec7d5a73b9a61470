//! Progress notifications emitted while a scan runs.
//!
//! Reporting never blocks and never fails: events go to an unbounded channel
//! and are silently dropped once the receiver has gone away.

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// Pipeline stage a progress event or error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStage {
    Preprocessing,
    Recognition,
    Translation,
    Extraction,
}

impl std::fmt::Display for ScanStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScanStage::Preprocessing => "preprocessing",
            ScanStage::Recognition => "recognition",
            ScanStage::Translation => "translation",
            ScanStage::Extraction => "extraction",
        };
        f.write_str(name)
    }
}

/// One progress notification: a status label and a completion ratio in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub stage: ScanStage,
    pub status: String,
    pub progress: f32,
}

impl ProgressEvent {
    /// Text suitable for a status line, e.g. `Processing: 45%` while text is recognized
    pub fn display_message(&self) -> String {
        if self.status == "recognizing text" {
            format!("Processing: {}%", (self.progress * 100.0).round() as u32)
        } else {
            self.status.clone()
        }
    }
}

/// Cheap, cloneable handle used by each stage to publish progress
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    sender: Option<UnboundedSender<ProgressEvent>>,
    stage: ScanStage,
}

impl ProgressReporter {
    pub fn new(sender: UnboundedSender<ProgressEvent>) -> Self {
        Self {
            sender: Some(sender),
            stage: ScanStage::Preprocessing,
        }
    }

    /// A reporter that discards everything
    pub fn disabled() -> Self {
        Self {
            sender: None,
            stage: ScanStage::Preprocessing,
        }
    }

    /// Same channel, tagged with another stage
    pub fn for_stage(&self, stage: ScanStage) -> Self {
        Self {
            sender: self.sender.clone(),
            stage,
        }
    }

    pub fn stage(&self) -> ScanStage {
        self.stage
    }

    pub fn report(&self, status: impl Into<String>, progress: f32) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(ProgressEvent {
                stage: self.stage,
                status: status.into(),
                progress: progress.clamp(0.0, 1.0),
            });
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::disabled()
    }
}
