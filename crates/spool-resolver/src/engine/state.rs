use rustc_hash::FxHashMap;

use crate::engine::{Criterion, Information, Provider};

/// A single recorded mutation, holding the value it replaced.
enum Change<'p, P: Provider> {
    Criterion {
        identifier: P::Identifier,
        previous: Option<Criterion<'p, P>>,
    },
    Pin {
        identifier: P::Identifier,
        previous: Option<P::Candidate>,
    },
}

/// The mutations made since the previous frame was opened, and the pin that closed the frame.
struct Frame<'p, P: Provider> {
    changes: Vec<Change<'p, P>>,
    pin: Option<(P::Identifier, P::Candidate)>,
}

impl<P: Provider> Default for Frame<'_, P> {
    fn default() -> Self {
        Self {
            changes: Vec::new(),
            pin: None,
        }
    }
}

/// The mutable state of a resolution: the current pins and criteria, plus an undo log.
///
/// Every mutation is recorded in the topmost frame. The bottom frame holds the root requirements
/// and is never reverted; every other frame is closed by exactly one pin. Backtracking reverts
/// whole frames, newest first, which restores the state as it was just before the frame's pin was
/// attempted.
pub(crate) struct State<'p, P: Provider> {
    pub(crate) mapping: FxHashMap<P::Identifier, P::Candidate>,
    pub(crate) criteria: FxHashMap<P::Identifier, Criterion<'p, P>>,
    /// The causes of the most recent backtrack. Not part of the undo log.
    pub(crate) backtrack_causes: Vec<Information<P>>,
    frames: Vec<Frame<'p, P>>,
}

impl<'p, P: Provider> State<'p, P> {
    pub(crate) fn new() -> Self {
        Self {
            mapping: FxHashMap::default(),
            criteria: FxHashMap::default(),
            backtrack_causes: Vec::new(),
            frames: vec![Frame::default()],
        }
    }

    /// The number of frames, including the root frame.
    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Open a new frame on top of the current one.
    pub(crate) fn push_frame(&mut self) {
        self.frames.push(Frame::default());
    }

    fn record(&mut self, change: Change<'p, P>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.changes.push(change);
        }
    }

    pub(crate) fn set_criterion(&mut self, identifier: P::Identifier, criterion: Criterion<'p, P>) {
        let previous = self.criteria.insert(identifier.clone(), criterion);
        self.record(Change::Criterion {
            identifier,
            previous,
        });
    }

    /// Pin the identifier to the candidate, closing the topmost frame.
    pub(crate) fn pin(&mut self, identifier: P::Identifier, candidate: P::Candidate) {
        let previous = self.mapping.insert(identifier.clone(), candidate.clone());
        self.record(Change::Pin {
            identifier: identifier.clone(),
            previous,
        });
        if let Some(frame) = self.frames.last_mut() {
            frame.pin = Some((identifier, candidate));
        }
    }

    /// The pin that closed the topmost frame, if any.
    pub(crate) fn last_pin(&self) -> Option<&(P::Identifier, P::Candidate)> {
        self.frames.last().and_then(|frame| frame.pin.as_ref())
    }

    /// Undo every change in the topmost frame and remove it.
    ///
    /// The root frame is never removed.
    pub(crate) fn revert_frame(&mut self) -> Option<(P::Identifier, P::Candidate)> {
        if self.frames.len() <= 1 {
            return None;
        }
        let frame = self.frames.pop()?;
        for change in frame.changes.into_iter().rev() {
            match change {
                Change::Criterion {
                    identifier,
                    previous: Some(criterion),
                } => {
                    self.criteria.insert(identifier, criterion);
                }
                Change::Criterion {
                    identifier,
                    previous: None,
                } => {
                    self.criteria.remove(&identifier);
                }
                Change::Pin {
                    identifier,
                    previous: Some(candidate),
                } => {
                    self.mapping.insert(identifier, candidate);
                }
                Change::Pin {
                    identifier,
                    previous: None,
                } => {
                    self.mapping.remove(&identifier);
                }
            }
        }
        frame.pin
    }
}
