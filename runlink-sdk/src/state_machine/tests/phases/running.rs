use mockall::predicate::eq;

use runlink_core::{
    message::{Order, Report},
    Phase,
};

use crate::state_machine::{
    io::MockIO,
    tests::utils::machine,
    ParticipantError,
    Running,
    StateMachine,
    Step,
    TransitionOutcome,
};

#[tokio::test]
async fn finished_device_reports_fin() {
    let mut io = MockIO::new();
    io.expect_poll_order().returning(|_| Ok(None));
    io.expect_is_finished().times(1).return_const(true);
    io.expect_send_report()
        .with(eq(Report::Finished {
            name: "d1".parse().unwrap(),
        }))
        .times(1)
        .returning(|_| Ok(()));
    io.expect_notify_phase()
        .with(eq(Phase::Finished))
        .times(1)
        .return_const(());

    let (phase, _handle) = machine(Running, io);
    let outcome = phase.step().await.unwrap();
    assert!(matches!(
        outcome,
        TransitionOutcome::Complete(StateMachine::Finished(_))
    ));
}

#[tokio::test]
async fn unfinished_device_keeps_running() {
    let mut io = MockIO::new();
    io.expect_poll_order().returning(|_| Ok(None));
    io.expect_is_finished().returning(|| false);

    let (phase, _handle) = machine(Running, io);
    let outcome = phase.step().await.unwrap();
    assert!(matches!(
        outcome,
        TransitionOutcome::Pending(StateMachine::Running(_))
    ));
}

#[tokio::test]
async fn abort_takes_precedence_over_fin() {
    let mut io = MockIO::new();
    io.expect_poll_order().returning(|_| Ok(Some(Order::Abort)));
    // The device must not be polled once the abort is queued.
    io.expect_is_finished().times(0);
    io.expect_notify_phase()
        .with(eq(Phase::Manual))
        .times(1)
        .return_const(());

    let (phase, _handle) = machine(Running, io);
    let outcome = phase.step().await.unwrap();
    assert!(matches!(
        outcome,
        TransitionOutcome::Complete(StateMachine::Manual(_))
    ));
}

#[tokio::test]
async fn load_while_running_is_a_violation() {
    let mut io = MockIO::new();
    io.expect_poll_order()
        .returning(|_| Ok(Some(Order::Load { section: 3 })));

    let (phase, _handle) = machine(Running, io);
    let err = phase.step().await.unwrap_err();
    assert!(matches!(
        err,
        ParticipantError::UnexpectedOrder {
            order: Order::Load { section: 3 },
            phase: Phase::Running,
        }
    ));
}
