//! Property-based checks of the transition graph and terminal invariants.

use crate::TestMachine;
use pledge::prelude::*;
use proptest::prelude::*;
use quickcheck::quickcheck;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

#[derive(Debug, Clone)]
enum Op {
    Progress(f64),
    Fulfill(i32),
    Reject,
    Cancel,
    RejectFlaggedCancel,
    Pause,
    Resume,
    AddCompletion,
    RemoveCompletion(usize),
    AddProgress,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0.0..1.0f64).prop_map(Op::Progress),
        1 => any::<i32>().prop_map(Op::Fulfill),
        1 => Just(Op::Reject),
        1 => Just(Op::Cancel),
        1 => Just(Op::RejectFlaggedCancel),
        3 => Just(Op::Pause),
        3 => Just(Op::Resume),
        3 => Just(Op::AddCompletion),
        2 => (0usize..8).prop_map(Op::RemoveCompletion),
        2 => Just(Op::AddProgress),
    ]
}

/// Reference model: which transitions are legal from which state.
fn expected(state: State, op: &Op) -> (bool, State) {
    use State::{Cancelled, Fulfilled, Paused, Rejected, Running};
    match (op, state) {
        (Op::Progress(_), Running) => (true, Running),
        (Op::Fulfill(_), Running) => (true, Fulfilled),
        (Op::Reject, Running | Paused) => (true, Rejected),
        (Op::Cancel | Op::RejectFlaggedCancel, Running | Paused) => (true, Cancelled),
        (Op::Pause, Running) => (true, Paused),
        (Op::Resume, Paused) => (true, Running),
        (Op::AddCompletion | Op::AddProgress, s) if s.is_active() => (true, s),
        (_, s) => (false, s),
    }
}

proptest! {
    #[test]
    fn prop_transitions_follow_graph(
        start_paused in any::<bool>(),
        ops in prop::collection::vec(op(), 0..64),
    ) {
        let finishes = Arc::new(AtomicUsize::new(0));
        let fired = Arc::new(AtomicUsize::new(0));
        let machine: TestMachine = {
            let finishes = finishes.clone();
            StateMachine::builder()
                .options(MachineOptions::new().with_paused(start_paused))
                .build(move || { finishes.fetch_add(1, Ordering::SeqCst); })
        };

        let mut model = machine.state();
        let mut live_completions = Vec::new();

        for op in &ops {
            let (legal, next) = expected(model, op);
            let reported = match op.clone() {
                Op::Progress(p) => machine.handle_progress(p),
                Op::Fulfill(v) => machine.handle_fulfill(v),
                Op::Reject => machine.handle_reject("rejected".to_string()),
                Op::Cancel => machine.handle_cancel(None),
                Op::RejectFlaggedCancel => machine.handle_reject_info(ErrorInfo {
                    error: Some("flagged".to_string()),
                    is_cancelled: true,
                }),
                Op::Pause => machine.handle_pause(),
                Op::Resume => machine.handle_resume(),
                Op::AddCompletion => {
                    let fired = fired.clone();
                    let token = machine.add_completion_handler(move || {
                        fired.fetch_add(1, Ordering::SeqCst);
                    });
                    if let Some(token) = token {
                        live_completions.push(token);
                    }
                    token.is_some()
                }
                Op::RemoveCompletion(index) => {
                    if index < live_completions.len() {
                        let token = live_completions[index];
                        // Settled machines have already fired and released their handlers.
                        let removed = machine.remove_completion_handler(token);
                        prop_assert_eq!(removed, model.is_active());
                        if removed {
                            live_completions.remove(index);
                        }
                    }
                    prop_assert_eq!(machine.state(), model);
                    continue;
                }
                Op::AddProgress => machine.add_progress_handler(|_, _| {}).is_some(),
            };

            prop_assert_eq!(reported, legal, "op {:?} from {}", op, model);
            model = next;
            prop_assert_eq!(machine.state(), model);
        }

        if model.is_terminal() {
            prop_assert_eq!(finishes.load(Ordering::SeqCst), 1);
            prop_assert_eq!(fired.load(Ordering::SeqCst), live_completions.len());
            prop_assert_eq!(machine.progress(), None);
            prop_assert_eq!(machine.progress_handler_count(), 0);
            prop_assert_eq!(machine.completion_handler_count(), 0);
            prop_assert!(!machine.handle_pause());
            prop_assert!(!machine.handle_resume());
        } else {
            prop_assert_eq!(finishes.load(Ordering::SeqCst), 0);
            prop_assert_eq!(fired.load(Ordering::SeqCst), 0);
            prop_assert_eq!(machine.completion_handler_count(), live_completions.len());
        }

        let snapshot = machine.snapshot();
        prop_assert!(snapshot.value.is_none() || snapshot.error_info.is_none());
        prop_assert_eq!(snapshot.value.is_some(), model == State::Fulfilled);
    }

    #[test]
    fn prop_init_resume_runs_once(
        resumes in 1usize..8,
        pause_between in any::<bool>(),
    ) {
        let runs = Arc::new(AtomicUsize::new(0));
        let machine: TestMachine = {
            let runs = runs.clone();
            StateMachine::builder()
                .paused()
                .init_resume(move || { runs.fetch_add(1, Ordering::SeqCst); })
                .build(|| {})
        };

        for _ in 0..resumes {
            machine.handle_resume();
            if pause_between {
                machine.handle_pause();
            }
        }
        prop_assert_eq!(runs.load(Ordering::SeqCst), 1);
        prop_assert!(!machine.has_init_resume());
    }
}

quickcheck! {
    fn qc_weakified_never_retains_progress(values: Vec<f64>) -> bool {
        let machine: TestMachine = StateMachine::builder().weakified().build(|| {});
        let previous_seen = Arc::new(AtomicUsize::new(0));
        {
            let previous_seen = previous_seen.clone();
            machine
                .add_progress_handler(move |previous, _| {
                    if previous.is_some() {
                        previous_seen.fetch_add(1, Ordering::SeqCst);
                    }
                })
                .unwrap();
        }
        values
            .into_iter()
            .all(|p| machine.handle_progress(p) && machine.progress().is_none())
            && previous_seen.load(Ordering::SeqCst) == 0
    }

    fn qc_completion_handlers_fire_once(handlers: u8, attempts: Vec<u8>) -> bool {
        let machine: TestMachine = StateMachine::builder().build(|| {});
        let fired = Arc::new(AtomicUsize::new(0));
        for _ in 0..handlers {
            let fired = fired.clone();
            machine.add_completion_handler(move || {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        }

        let mut first_settle = None;
        for (i, attempt) in attempts.iter().enumerate() {
            let settled = match attempt % 3 {
                0 => machine.handle_fulfill(i32::from(*attempt)),
                1 => machine.handle_reject("no".to_string()),
                _ => machine.handle_cancel(None),
            };
            if settled {
                if first_settle.is_some() {
                    return false;
                }
                first_settle = Some(i);
            }
        }

        let expected = if first_settle.is_some() { usize::from(handlers) } else { 0 };
        fired.load(Ordering::SeqCst) == expected
    }
}
