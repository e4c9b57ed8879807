use mockall::predicate::eq;

use runlink_core::{
    message::{Order, Report},
    Phase,
};

use crate::state_machine::{
    io::MockIO,
    tests::utils::machine,
    Command,
    Finished,
    StateMachine,
    Step,
    TransitionOutcome,
};

#[tokio::test]
async fn load_prepares_the_next_section() {
    let mut io = MockIO::new();
    io.expect_poll_order()
        .returning(|_| Ok(Some(Order::Load { section: 7 })));
    io.expect_on_load_section()
        .with(eq(7u32))
        .times(1)
        .return_const(());
    io.expect_send_report()
        .with(eq(Report::Ready {
            name: "d1".parse().unwrap(),
        }))
        .times(1)
        .returning(|_| Ok(()));
    io.expect_notify_phase()
        .with(eq(Phase::Ready))
        .times(1)
        .return_const(());

    let (phase, _handle) = machine(Finished, io);
    let outcome = phase.step().await.unwrap();
    assert!(matches!(
        outcome,
        TransitionOutcome::Complete(StateMachine::Ready(_))
    ));
}

#[tokio::test]
async fn exit_ends_the_run() {
    let mut io = MockIO::new();
    io.expect_poll_order().returning(|_| Ok(Some(Order::Exit)));
    io.expect_notify_phase()
        .with(eq(Phase::Manual))
        .times(1)
        .return_const(());

    let (phase, _handle) = machine(Finished, io);
    let outcome = phase.step().await.unwrap();
    assert!(matches!(
        outcome,
        TransitionOutcome::Complete(StateMachine::Manual(_))
    ));
}

#[tokio::test]
async fn master_finished_is_forwarded_upstream() {
    let mut io = MockIO::new();
    io.expect_poll_order().returning(|_| Ok(None));
    io.expect_send_report()
        .with(eq(Report::MasterFinished))
        .times(1)
        .returning(|_| Ok(()));

    let (phase, handle) = machine(Finished, io);
    handle.send(Command::MasterFinished).unwrap();
    let outcome = phase.step().await.unwrap();
    assert!(matches!(
        outcome,
        TransitionOutcome::Pending(StateMachine::Finished(_))
    ));
}
