//! Recorded oracle conversations.
//! This module exists so a run can be saved, inspected and replayed offline.
//! It does not own any decision the agent makes while replaying.

use std::fs;
use std::io;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::oracle::Oracle;
use crate::perception::PerceptionVariant;
use crate::types::{Observation, Pos};

pub const TRANSCRIPT_FORMAT_VERSION: u16 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub target: Pos,
    pub observations: Vec<Observation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub format_version: u16,
    pub variant: PerceptionVariant,
    pub goal: Pos,
    pub exchanges: Vec<Exchange>,
    pub answer: Option<i32>,
}

impl Transcript {
    pub fn new(variant: PerceptionVariant, goal: Pos) -> Self {
        Self {
            format_version: TRANSCRIPT_FORMAT_VERSION,
            variant,
            goal,
            exchanges: Vec::new(),
            answer: None,
        }
    }

    /// Writes through a temporary sibling and renames it into place.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;

        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, path)?;

        Ok(())
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        let transcript: Self = serde_json::from_str(&content)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        if transcript.format_version != TRANSCRIPT_FORMAT_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported transcript version {}", transcript.format_version),
            ));
        }
        Ok(transcript)
    }
}

/// Forwards to an inner oracle and keeps a copy of every exchange.
pub struct RecordingOracle<O> {
    inner: O,
    transcript: Transcript,
}

impl<O: Oracle> RecordingOracle<O> {
    pub fn new(inner: O, variant: PerceptionVariant, goal: Pos) -> Self {
        Self { inner, transcript: Transcript::new(variant, goal) }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn into_parts(self) -> (O, Transcript) {
        (self.inner, self.transcript)
    }
}

impl<O: Oracle> Oracle for RecordingOracle<O> {
    fn request_move(&mut self, target: Pos) -> Result<Vec<Observation>> {
        let observations = self.inner.request_move(target)?;
        self.transcript.exchanges.push(Exchange { target, observations: observations.clone() });
        Ok(observations)
    }

    fn finish(&mut self, answer: i32) -> Result<()> {
        self.inner.finish(answer)?;
        self.transcript.answer = Some(answer);
        Ok(())
    }
}

/// Answers from a saved transcript. Any request that differs from the recording is a
/// protocol error.
pub struct ReplayOracle {
    transcript: Transcript,
    cursor: usize,
    answer: Option<i32>,
}

impl ReplayOracle {
    pub fn new(transcript: Transcript) -> Self {
        Self { transcript, cursor: 0, answer: None }
    }

    pub fn consumed(&self) -> usize {
        self.cursor
    }

    pub fn answer(&self) -> Option<i32> {
        self.answer
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor == self.transcript.exchanges.len()
    }
}

impl Oracle for ReplayOracle {
    fn request_move(&mut self, target: Pos) -> Result<Vec<Observation>> {
        let Some(exchange) = self.transcript.exchanges.get(self.cursor) else {
            return Err(AgentError::Protocol(format!(
                "replay diverged: move {} to {target} was never recorded",
                self.cursor + 1
            )));
        };
        if exchange.target != target {
            return Err(AgentError::Protocol(format!(
                "replay diverged at move {}: recorded {}, requested {target}",
                self.cursor + 1,
                exchange.target
            )));
        }
        self.cursor += 1;
        Ok(exchange.observations.clone())
    }

    fn finish(&mut self, answer: i32) -> Result<()> {
        if let Some(recorded) = self.transcript.answer
            && recorded != answer
        {
            warn!("replayed answer {answer} differs from recorded answer {recorded}");
        }
        self.answer = Some(answer);
        Ok(())
    }
}
