//! Process frames and dispatch.
//!
//! Every game action is a [`Process`]: a handler struct holding everything it
//! needs to resume, plus the `step` it is at. A frame's `step` is the only
//! control position that survives a suspension; handlers never keep state in
//! locals across steps.

use tracing::warn;

use crate::decision::SelectRequest;
use crate::handlers::adjust::{SelfDestroy, SelfDestroyUnique, SelfToGrave, TrapMonsterAdjust};
use crate::handlers::chain::{
    ActivateEffect, AddChain, ChainTriggers, ExecuteCost, ExecuteOperation, ExecuteTarget, SolveChain,
    SolveContinuous,
};
use crate::handlers::control::{ControlAdjust, GetControl, SwapControl};
use crate::handlers::destroy::{Destroy, DestroyReplace};
use crate::handlers::draw::{DiscardDeck, Draw};
use crate::handlers::equip::Equip;
use crate::handlers::life::{Damage, PayLpCost, Recover};
use crate::handlers::move_to_field::MoveToField;
use crate::handlers::overlay::{RemoveCounter, RemoveOverlay, XyzOverlay};
use crate::handlers::position::ChangePos;
use crate::handlers::random::{TossCoin, TossDice};
use crate::handlers::release::{Release, ReleaseReplace};
use crate::handlers::replace::OperationReplace;
use crate::handlers::send_to::{SendTo, SendToReplace};
use crate::handlers::special_summon::{SpSummon, SpSummonRule, SpSummonRuleGroup, SpSummonStep};
use crate::handlers::spell_set::{SpellSet, SpellSetGroup};
use crate::handlers::summon::{FlipSummon, MonsterSet, SummonRule};
use crate::handlers::tribute::{SelectRelease, SelectTribute};
use crate::query::Ctx;

/// What a handler step asks the scheduler to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Keep the frame on top and run it again at this step.
    Continue(u16),
    /// Pop the frame; results are in the returns channel.
    Done,
    /// Suspend the run loop until the request is answered.
    NeedsInput(SelectRequest),
}

/// Fallback for a step value a handler does not know.
pub fn unknown_step(process: &'static str, step: u16) -> Flow {
    warn!(process, step, "unknown step reached, finishing process");
    Flow::Done
}

/// A process plus its resume position.
#[derive(Debug, Clone)]
pub struct Frame {
    pub step: u16,
    pub process: Process,
}

impl Frame {
    pub fn new(process: Process) -> Self {
        Self { step: 0, process }
    }

    /// Enter a process at a later step (variant entry points).
    pub fn at(step: u16, process: Process) -> Self {
        Self { step, process }
    }
}

/// Every action kind the engine can run.
#[derive(Debug, Clone)]
pub enum Process {
    Draw(Draw),
    DiscardDeck(DiscardDeck),
    Damage(Damage),
    Recover(Recover),
    PayLpCost(PayLpCost),
    RemoveCounter(RemoveCounter),
    RemoveOverlay(RemoveOverlay),
    XyzOverlay(XyzOverlay),
    GetControl(GetControl),
    SwapControl(SwapControl),
    ControlAdjust(ControlAdjust),
    SelfDestroyUnique(SelfDestroyUnique),
    SelfDestroy(SelfDestroy),
    SelfToGrave(SelfToGrave),
    TrapMonsterAdjust(TrapMonsterAdjust),
    Equip(Equip),
    SummonRule(SummonRule),
    FlipSummon(FlipSummon),
    MonsterSet(MonsterSet),
    SpellSet(SpellSet),
    SpellSetGroup(SpellSetGroup),
    SpSummonRule(SpSummonRule),
    SpSummonRuleGroup(SpSummonRuleGroup),
    SpSummonStep(SpSummonStep),
    SpSummon(SpSummon),
    DestroyReplace(DestroyReplace),
    Destroy(Destroy),
    ReleaseReplace(ReleaseReplace),
    Release(Release),
    SendToReplace(SendToReplace),
    SendTo(SendTo),
    MoveToField(MoveToField),
    ChangePos(ChangePos),
    OperationReplace(OperationReplace),
    ActivateEffect(ActivateEffect),
    ChainTriggers(ChainTriggers),
    AddChain(AddChain),
    SolveChain(SolveChain),
    ExecuteCost(ExecuteCost),
    ExecuteTarget(ExecuteTarget),
    ExecuteOperation(ExecuteOperation),
    SolveContinuous(SolveContinuous),
    SelectRelease(SelectRelease),
    SelectTribute(SelectTribute),
    TossCoin(TossCoin),
    TossDice(TossDice),
    /// A pending player decision.
    Request(SelectRequest),
    #[cfg(test)]
    Tracer(tracer::Tracer),
}

impl Process {
    pub fn name(&self) -> &'static str {
        match self {
            Process::Draw(_) => "Draw",
            Process::DiscardDeck(_) => "DiscardDeck",
            Process::Damage(_) => "Damage",
            Process::Recover(_) => "Recover",
            Process::PayLpCost(_) => "PayLpCost",
            Process::RemoveCounter(_) => "RemoveCounter",
            Process::RemoveOverlay(_) => "RemoveOverlay",
            Process::XyzOverlay(_) => "XyzOverlay",
            Process::GetControl(_) => "GetControl",
            Process::SwapControl(_) => "SwapControl",
            Process::ControlAdjust(_) => "ControlAdjust",
            Process::SelfDestroyUnique(_) => "SelfDestroyUnique",
            Process::SelfDestroy(_) => "SelfDestroy",
            Process::SelfToGrave(_) => "SelfToGrave",
            Process::TrapMonsterAdjust(_) => "TrapMonsterAdjust",
            Process::Equip(_) => "Equip",
            Process::SummonRule(_) => "SummonRule",
            Process::FlipSummon(_) => "FlipSummon",
            Process::MonsterSet(_) => "MonsterSet",
            Process::SpellSet(_) => "SpellSet",
            Process::SpellSetGroup(_) => "SpellSetGroup",
            Process::SpSummonRule(_) => "SpSummonRule",
            Process::SpSummonRuleGroup(_) => "SpSummonRuleGroup",
            Process::SpSummonStep(_) => "SpSummonStep",
            Process::SpSummon(_) => "SpSummon",
            Process::DestroyReplace(_) => "DestroyReplace",
            Process::Destroy(_) => "Destroy",
            Process::ReleaseReplace(_) => "ReleaseReplace",
            Process::Release(_) => "Release",
            Process::SendToReplace(_) => "SendToReplace",
            Process::SendTo(_) => "SendTo",
            Process::MoveToField(_) => "MoveToField",
            Process::ChangePos(_) => "ChangePos",
            Process::OperationReplace(_) => "OperationReplace",
            Process::ActivateEffect(_) => "ActivateEffect",
            Process::ChainTriggers(_) => "ChainTriggers",
            Process::AddChain(_) => "AddChain",
            Process::SolveChain(_) => "SolveChain",
            Process::ExecuteCost(_) => "ExecuteCost",
            Process::ExecuteTarget(_) => "ExecuteTarget",
            Process::ExecuteOperation(_) => "ExecuteOperation",
            Process::SolveContinuous(_) => "SolveContinuous",
            Process::SelectRelease(_) => "SelectRelease",
            Process::SelectTribute(_) => "SelectTribute",
            Process::TossCoin(_) => "TossCoin",
            Process::TossDice(_) => "TossDice",
            Process::Request(_) => "Request",
            #[cfg(test)]
            Process::Tracer(_) => "Tracer",
        }
    }

    /// Run one step of this process.
    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match self {
            Process::Draw(p) => p.step(ctx, step),
            Process::DiscardDeck(p) => p.step(ctx, step),
            Process::Damage(p) => p.step(ctx, step),
            Process::Recover(p) => p.step(ctx, step),
            Process::PayLpCost(p) => p.step(ctx, step),
            Process::RemoveCounter(p) => p.step(ctx, step),
            Process::RemoveOverlay(p) => p.step(ctx, step),
            Process::XyzOverlay(p) => p.step(ctx, step),
            Process::GetControl(p) => p.step(ctx, step),
            Process::SwapControl(p) => p.step(ctx, step),
            Process::ControlAdjust(p) => p.step(ctx, step),
            Process::SelfDestroyUnique(p) => p.step(ctx, step),
            Process::SelfDestroy(p) => p.step(ctx, step),
            Process::SelfToGrave(p) => p.step(ctx, step),
            Process::TrapMonsterAdjust(p) => p.step(ctx, step),
            Process::Equip(p) => p.step(ctx, step),
            Process::SummonRule(p) => p.step(ctx, step),
            Process::FlipSummon(p) => p.step(ctx, step),
            Process::MonsterSet(p) => p.step(ctx, step),
            Process::SpellSet(p) => p.step(ctx, step),
            Process::SpellSetGroup(p) => p.step(ctx, step),
            Process::SpSummonRule(p) => p.step(ctx, step),
            Process::SpSummonRuleGroup(p) => p.step(ctx, step),
            Process::SpSummonStep(p) => p.step(ctx, step),
            Process::SpSummon(p) => p.step(ctx, step),
            Process::DestroyReplace(p) => p.step(ctx, step),
            Process::Destroy(p) => p.step(ctx, step),
            Process::ReleaseReplace(p) => p.step(ctx, step),
            Process::Release(p) => p.step(ctx, step),
            Process::SendToReplace(p) => p.step(ctx, step),
            Process::SendTo(p) => p.step(ctx, step),
            Process::MoveToField(p) => p.step(ctx, step),
            Process::ChangePos(p) => p.step(ctx, step),
            Process::OperationReplace(p) => p.step(ctx, step),
            Process::ActivateEffect(p) => p.step(ctx, step),
            Process::ChainTriggers(p) => p.step(ctx, step),
            Process::AddChain(p) => p.step(ctx, step),
            Process::SolveChain(p) => p.step(ctx, step),
            Process::ExecuteCost(p) => p.step(ctx, step),
            Process::ExecuteTarget(p) => p.step(ctx, step),
            Process::ExecuteOperation(p) => p.step(ctx, step),
            Process::SolveContinuous(p) => p.step(ctx, step),
            Process::SelectRelease(p) => p.step(ctx, step),
            Process::SelectTribute(p) => p.step(ctx, step),
            Process::TossCoin(p) => p.step(ctx, step),
            Process::TossDice(p) => p.step(ctx, step),
            Process::Request(request) => match step {
                // Surfacing has no side effects, so re-running a suspended
                // request yields the same request.
                0 => Flow::NeedsInput(request.clone()),
                _ => Flow::Done,
            },
            #[cfg(test)]
            Process::Tracer(p) => p.step(ctx, step),
        }
    }
}

/// Instrumented process for scheduler tests: logs every invocation and
/// pushes its children at step 0.
#[cfg(test)]
pub(crate) mod tracer {
    use super::{Flow, Process};
    use crate::query::Ctx;

    #[derive(Debug, Clone)]
    pub struct Tracer {
        pub label: u32,
        pub children: Vec<Tracer>,
        pub steps: u16,
    }

    impl Tracer {
        pub fn leaf(label: u32) -> Self {
            Self {
                label,
                children: Vec::new(),
                steps: 1,
            }
        }

        pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
            ctx.state.event_log.push(crate::events::EventRecord {
                scope: crate::events::EventScope::Single,
                event: crate::events::GameEvent::new(self.label * 100 + u32::from(step)),
            });
            if step == 0 {
                for child in self.children.drain(..) {
                    ctx.push(Process::Tracer(child));
                }
            }
            if step + 1 >= self.steps {
                Flow::Done
            } else {
                Flow::Continue(step + 1)
            }
        }
    }
}
