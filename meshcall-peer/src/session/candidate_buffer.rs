use std::collections::VecDeque;

/// Remote ICE candidates that arrived before a remote description was set.
///
/// The transport rejects candidates until it has a remote description, and
/// the signaling channel does not order `ice-candidate` relative to
/// `offer`/`answer`, so early candidates wait here in arrival order.
#[derive(Debug, Default)]
pub struct CandidateBuffer {
    queue: VecDeque<String>,
}

impl CandidateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, candidate: String) {
        self.queue.push_back(candidate);
    }

    /// Takes every buffered candidate, oldest first.
    pub fn drain(&mut self) -> Vec<String> {
        self.queue.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
