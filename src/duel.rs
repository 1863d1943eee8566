//! The run loop.
//!
//! [`Duel`] owns the state, the script host and the process stack. `run()`
//! drives the stack until it empties or a request frame asks for input;
//! `respond()` feeds the answer back. The loop is iterative, so nested
//! processes never grow the native call stack. Whenever the stack runs dry
//! with trigger effects parked, they are chained before the loop idles.

use tracing::{debug, warn};

use crate::actions::Actions;
use crate::decision::{Response, ResponseError, RunState, SelectRequest};
use crate::game_state::DuelState;
use crate::handlers::chain::ChainTriggers;
use crate::options::DuelOptions;
use crate::process::{Flow, Frame, Process};
use crate::query::Ctx;
use crate::script::ScriptHost;

pub struct Duel {
    pub state: DuelState,
    script: Box<dyn ScriptHost>,
    stack: Vec<Frame>,
    pending: Option<SelectRequest>,
}

impl Duel {
    pub fn new(options: DuelOptions, script: Box<dyn ScriptHost>) -> Self {
        Self {
            state: DuelState::new(options),
            script,
            stack: Vec::new(),
            pending: None,
        }
    }

    pub fn with_state(state: DuelState, script: Box<dyn ScriptHost>) -> Self {
        Self {
            state,
            script,
            stack: Vec::new(),
            pending: None,
        }
    }

    pub fn push(&mut self, process: Process) {
        self.push_frame(Frame::new(process));
    }

    pub fn pending(&self) -> Option<&SelectRequest> {
        self.pending.as_ref()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_idle(&self) -> bool {
        self.stack.is_empty()
    }

    /// Run until the stack empties or a player must decide something.
    pub fn run(&mut self) -> RunState {
        loop {
            if let Some(request) = &self.pending {
                return RunState::NeedsInput(request.clone());
            }
            if self.stack.is_empty() && !self.state.core.pending_triggers.is_empty() {
                self.push(Process::ChainTriggers(ChainTriggers::new()));
                continue;
            }
            let Some(frame) = self.stack.last_mut() else {
                self.state.groups.clear();
                return RunState::Idle;
            };
            let step = frame.step;
            let mut ctx = Ctx::new(&mut self.state, self.script.as_mut());
            let flow = frame.process.step(&mut ctx, step);
            let children = ctx.into_queue();
            match flow {
                Flow::Continue(next) => frame.step = next,
                Flow::Done => {
                    if let Some(done) = self.stack.pop() {
                        debug!(process = done.process.name(), step, "process finished");
                    }
                }
                Flow::NeedsInput(request) => {
                    debug!(
                        kind = request.kind(),
                        player = request.player().0,
                        "waiting for input"
                    );
                    self.pending = Some(request);
                }
            }
            for child in children.into_iter().rev() {
                debug!(process = child.process.name(), step = child.step, "process pushed");
                self.stack.push(child);
            }
        }
    }

    /// Answer the pending request. A rejected answer leaves it pending.
    pub fn respond(&mut self, response: Response) -> Result<(), ResponseError> {
        let Some(request) = &self.pending else {
            return Err(ResponseError::NoRequestPending);
        };
        if let Err(err) = request.apply(&response, &mut self.state.returns, &mut self.state.return_cards) {
            warn!(kind = request.kind(), %err, "answer rejected");
            return Err(err);
        }
        self.pending = None;
        self.stack.pop();
        Ok(())
    }
}

impl Actions for Duel {
    fn state(&mut self) -> &mut DuelState {
        &mut self.state
    }

    fn push_frame(&mut self, frame: Frame) {
        debug!(process = frame.process.name(), step = frame.step, "process pushed");
        self.stack.push(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::SelectRequest;
    use crate::events::EventScope;
    use crate::ids::PlayerId;
    use crate::process::tracer::Tracer;
    use crate::script::NullScript;

    fn duel() -> Duel {
        Duel::new(DuelOptions::default(), Box::new(NullScript))
    }

    fn trace(duel: &Duel) -> Vec<u32> {
        duel.state
            .event_log
            .iter()
            .filter(|r| r.scope == EventScope::Single)
            .map(|r| r.event.code)
            .collect()
    }

    #[test]
    fn test_children_resolve_before_parent_resumes() {
        let mut d = duel();
        let a = Tracer {
            label: 2,
            children: vec![Tracer::leaf(4)],
            steps: 2,
        };
        let b = Tracer {
            label: 3,
            children: Vec::new(),
            steps: 2,
        };
        d.push(Process::Tracer(Tracer {
            label: 1,
            children: vec![a, b],
            steps: 2,
        }));
        assert_eq!(d.run(), RunState::Idle);
        assert_eq!(trace(&d), vec![100, 200, 400, 201, 300, 301, 101]);
    }

    #[test]
    fn test_suspension_is_idempotent() {
        let mut d = duel();
        d.push(Process::Request(SelectRequest::YesNo {
            player: PlayerId::ZERO,
            description: 5,
        }));
        let first = d.run();
        let second = d.run();
        assert_eq!(first, second);
        assert!(matches!(first, RunState::NeedsInput(SelectRequest::YesNo { .. })));
        assert_eq!(d.depth(), 1);
    }

    #[test]
    fn test_respond_without_request() {
        let mut d = duel();
        assert_eq!(d.respond(Response::YesNo(true)), Err(ResponseError::NoRequestPending));
    }

    #[test]
    fn test_rejected_answer_keeps_request() {
        let mut d = duel();
        d.push(Process::Request(SelectRequest::Option {
            player: PlayerId::ONE,
            options: vec![1, 2],
        }));
        d.run();
        assert!(d.respond(Response::Option(5)).is_err());
        assert!(d.pending().is_some());
        assert!(d.respond(Response::Option(1)).is_ok());
        assert_eq!(d.state.returns.get(0), 1);
        assert_eq!(d.run(), RunState::Idle);
    }
}
