use crate::error::Result;
use crate::types::{Observation, Pos};

/// The simulator seen from the agent: one move request, one answer.
pub trait Oracle {
    /// Moves the agent to `target` and returns everything visible from there.
    fn request_move(&mut self, target: Pos) -> Result<Vec<Observation>>;

    /// Reports the final answer. No request may follow.
    fn finish(&mut self, answer: i32) -> Result<()>;
}

impl<O: Oracle + ?Sized> Oracle for &mut O {
    fn request_move(&mut self, target: Pos) -> Result<Vec<Observation>> {
        (**self).request_move(target)
    }

    fn finish(&mut self, answer: i32) -> Result<()> {
        (**self).finish(answer)
    }
}
