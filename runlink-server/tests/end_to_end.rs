//! Whole-system tests: a coordinator and in-process participants
//! talking over real sockets on ephemeral ports.

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use tokio::{task::JoinHandle, time::sleep};

use runlink_core::Phase;
use runlink_sdk::{
    DeviceHooks,
    Participant,
    ParticipantError,
    ParticipantHandle,
    ParticipantSettings,
};
use runlink_server::{
    coordinator::{CoordinatorError, CoordinatorHandle, CoordinatorService},
    settings::RunSettings,
    traits::RunPlan,
    transport::{FanIn, FanOut},
};

/// A plan that hands out a fixed list of sections and records what the
/// coordinator reports back.
#[derive(Clone, Default)]
struct ChainPlan {
    sections: Arc<Mutex<Vec<u32>>>,
    run_times: Arc<AtomicU32>,
    /// One entry per `transition_time` call: whether an elapsed time
    /// was passed (`false` marks the first-section sentinel).
    transitions: Arc<Mutex<Vec<bool>>>,
    /// Set once the plan has been asked for a section and had none
    /// left.
    exhausted: Arc<AtomicBool>,
}

impl ChainPlan {
    fn with_sections(sections: Vec<u32>) -> Self {
        Self {
            sections: Arc::new(Mutex::new(sections)),
            ..Self::default()
        }
    }
}

impl RunPlan for ChainPlan {
    fn next_section(&mut self) -> Option<u32> {
        let mut sections = self.sections.lock().unwrap();
        if sections.is_empty() {
            self.exhausted.store(true, Ordering::SeqCst);
            None
        } else {
            Some(sections.remove(0))
        }
    }

    fn transition_time(&mut self, elapsed: Option<Duration>) {
        self.transitions.lock().unwrap().push(elapsed.is_some());
    }

    fn run_time(&mut self, _elapsed: Duration) {
        self.run_times.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hooks whose `is_finished` answer is controlled by the test.
#[derive(Clone)]
struct GatedHooks {
    finished: Arc<AtomicBool>,
    starts: Arc<AtomicU32>,
    loads: Arc<Mutex<Vec<u32>>>,
}

impl GatedHooks {
    fn new() -> Self {
        Self {
            finished: Arc::new(AtomicBool::new(false)),
            starts: Arc::new(AtomicU32::new(0)),
            loads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn finish(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }
}

impl DeviceHooks for GatedHooks {
    fn is_finished(&mut self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    fn on_start(&mut self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_load_section(&mut self, section: u32) {
        self.loads.lock().unwrap().push(section);
    }
}

fn run_settings() -> RunSettings {
    RunSettings {
        greet_delay: 10,
        finish_timeout: 200,
        manual_poll: 1,
        experiment_poll: 10,
        discovery_window: 50,
    }
}

type CoordinatorTask = JoinHandle<Result<(), CoordinatorError>>;
type ParticipantTask = JoinHandle<Result<(), ParticipantError>>;

async fn spawn_coordinator(
    plan: Box<dyn RunPlan>,
) -> (CoordinatorHandle, CoordinatorTask, SocketAddr, SocketAddr) {
    let fan_in = FanIn::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let fan_out = FanOut::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let fan_in_addr = fan_in.local_addr();
    let fan_out_addr = fan_out.local_addr();
    let (service, handle) = CoordinatorService::new(fan_in, fan_out, plan, run_settings());
    let task = tokio::spawn(service.run());
    (handle, task, fan_in_addr, fan_out_addr)
}

fn participant_settings(
    name: &str,
    fan_in: SocketAddr,
    fan_out: SocketAddr,
) -> ParticipantSettings {
    let mut settings = ParticipantSettings::new(name.parse().unwrap(), "127.0.0.1");
    settings.fan_in = fan_in.to_string();
    settings.fan_out = fan_out.to_string();
    settings.registration_retry = Duration::from_millis(50);
    settings.manual_poll = Duration::from_millis(1);
    settings.experiment_poll = Duration::from_millis(10);
    settings
}

/// Spawn a participant and wait until it is registered.
async fn spawn_device(
    name: &str,
    fan_in: SocketAddr,
    fan_out: SocketAddr,
    hooks: GatedHooks,
) -> (ParticipantHandle, ParticipantTask) {
    let (participant, mut handle) =
        Participant::new(participant_settings(name, fan_in, fan_out), hooks);
    let task = tokio::spawn(participant.run());
    handle.wait_until_registered().await.unwrap();
    (handle, task)
}

#[tokio::test]
async fn single_device_single_section() {
    let plan = ChainPlan::default();
    let (handle, coordinator, fan_in, fan_out) = spawn_coordinator(Box::new(plan.clone())).await;

    let hooks = GatedHooks::new();
    let (mut d1, d1_task) = spawn_device("d1", fan_in, fan_out, hooks.clone()).await;
    let mut events = handle.events();
    events.wait_for_devices(1).await.unwrap();

    d1.send_buffered();
    d1.wait_for_phase(Phase::Ready).await.unwrap();
    handle.send_buffered();
    handle.send_start();
    d1.wait_for_phase(Phase::Running).await.unwrap();

    hooks.finish();
    d1.wait_for_phase(Phase::Manual).await.unwrap();
    events.wait_for_phase(Phase::Manual).await.unwrap();

    assert_eq!(hooks.starts.load(Ordering::SeqCst), 1);
    assert!(hooks.loads.lock().unwrap().is_empty());
    assert_eq!(plan.run_times.load(Ordering::SeqCst), 1);
    // A single-shot run sees exactly the first-section sentinel.
    assert_eq!(*plan.transitions.lock().unwrap(), vec![false]);

    handle.shutdown();
    coordinator.await.unwrap().unwrap();
    d1_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn two_devices_two_section_chain() {
    let plan = ChainPlan::with_sections(vec![7]);
    let (handle, coordinator, fan_in, fan_out) = spawn_coordinator(Box::new(plan.clone())).await;

    let hooks_1 = GatedHooks::new();
    let hooks_2 = GatedHooks::new();
    let (mut d1, d1_task) = spawn_device("d1", fan_in, fan_out, hooks_1.clone()).await;
    let (mut d2, d2_task) = spawn_device("d2", fan_in, fan_out, hooks_2.clone()).await;
    let mut events = handle.events();
    events.wait_for_devices(2).await.unwrap();

    d1.send_buffered();
    d2.send_buffered();
    d1.wait_for_phase(Phase::Ready).await.unwrap();
    d2.wait_for_phase(Phase::Ready).await.unwrap();
    handle.send_buffered();
    handle.send_start();
    d1.wait_for_phase(Phase::Running).await.unwrap();
    d2.wait_for_phase(Phase::Running).await.unwrap();

    // Both sections complete as soon as they are polled from here on,
    // so the chain runs to the end on its own.
    hooks_1.finish();
    hooks_2.finish();
    d1.wait_for_phase(Phase::Manual).await.unwrap();
    d2.wait_for_phase(Phase::Manual).await.unwrap();
    events.wait_for_phase(Phase::Manual).await.unwrap();

    for hooks in [&hooks_1, &hooks_2] {
        assert_eq!(hooks.starts.load(Ordering::SeqCst), 2);
        assert_eq!(*hooks.loads.lock().unwrap(), vec![7]);
    }
    assert_eq!(plan.run_times.load(Ordering::SeqCst), 2);
    assert_eq!(*plan.transitions.lock().unwrap(), vec![false, true]);

    handle.shutdown();
    coordinator.await.unwrap().unwrap();
    d1_task.await.unwrap().unwrap();
    d2_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn zero_device_run_does_not_hang() {
    let plan = ChainPlan::default();
    let (handle, coordinator, _fan_in, _fan_out) =
        spawn_coordinator(Box::new(plan.clone())).await;

    handle.send_buffered();
    handle.send_start();

    tokio::time::timeout(Duration::from_secs(5), async {
        while !plan.exhausted.load(Ordering::SeqCst) {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("the empty roster should satisfy the transition predicates");

    let mut events = handle.events();
    events.wait_for_phase(Phase::Manual).await.unwrap();

    handle.shutdown();
    coordinator.await.unwrap().unwrap();
}

#[tokio::test]
async fn finish_timeout_aborts_the_run() {
    let plan = ChainPlan::default();
    let (handle, coordinator, fan_in, fan_out) = spawn_coordinator(Box::new(plan.clone())).await;

    let hooks_1 = GatedHooks::new();
    let hooks_2 = GatedHooks::new();
    let (mut d1, d1_task) = spawn_device("d1", fan_in, fan_out, hooks_1.clone()).await;
    let (mut d2, d2_task) = spawn_device("d2", fan_in, fan_out, hooks_2.clone()).await;

    d1.send_buffered();
    d2.send_buffered();
    d1.wait_for_phase(Phase::Ready).await.unwrap();
    d2.wait_for_phase(Phase::Ready).await.unwrap();
    handle.send_buffered();
    handle.send_start();
    d1.wait_for_phase(Phase::Running).await.unwrap();
    d2.wait_for_phase(Phase::Running).await.unwrap();

    // d1 finishes, d2 never does.
    hooks_1.finish();
    d1.wait_for_phase(Phase::Finished).await.unwrap();
    d1.send_master_finished();

    // After the finish timeout the coordinator aborts on its own and
    // every device returns to manual.
    let mut events = handle.events();
    events.wait_for_phase(Phase::Manual).await.unwrap();
    d1.wait_for_phase(Phase::Manual).await.unwrap();
    d2.wait_for_phase(Phase::Manual).await.unwrap();
    assert_eq!(plan.run_times.load(Ordering::SeqCst), 0);

    handle.shutdown();
    coordinator.await.unwrap().unwrap();
    d1_task.await.unwrap().unwrap();
    d2_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn abort_from_a_participant_reaches_everyone() {
    let plan = ChainPlan::default();
    let (handle, coordinator, fan_in, fan_out) = spawn_coordinator(Box::new(plan.clone())).await;

    let hooks_1 = GatedHooks::new();
    let hooks_2 = GatedHooks::new();
    let (mut d1, d1_task) = spawn_device("d1", fan_in, fan_out, hooks_1.clone()).await;
    let (mut d2, d2_task) = spawn_device("d2", fan_in, fan_out, hooks_2.clone()).await;

    d1.send_buffered();
    d2.send_buffered();
    d1.wait_for_phase(Phase::Ready).await.unwrap();
    d2.wait_for_phase(Phase::Ready).await.unwrap();
    handle.send_buffered();
    handle.send_start();
    d1.wait_for_phase(Phase::Running).await.unwrap();
    d2.wait_for_phase(Phase::Running).await.unwrap();

    d1.abort();

    let mut events = handle.events();
    events.wait_for_phase(Phase::Manual).await.unwrap();
    d1.wait_for_phase(Phase::Manual).await.unwrap();
    d2.wait_for_phase(Phase::Manual).await.unwrap();

    handle.shutdown();
    coordinator.await.unwrap().unwrap();
    d1_task.await.unwrap().unwrap();
    d2_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn shutdown_mid_run_tears_everything_down() {
    let plan = ChainPlan::default();
    let (handle, coordinator, fan_in, fan_out) = spawn_coordinator(Box::new(plan.clone())).await;

    let hooks = GatedHooks::new();
    let (mut d1, d1_task) = spawn_device("d1", fan_in, fan_out, hooks.clone()).await;

    d1.send_buffered();
    d1.wait_for_phase(Phase::Ready).await.unwrap();
    handle.send_buffered();
    handle.send_start();
    d1.wait_for_phase(Phase::Running).await.unwrap();

    // The device never finishes; shut the whole session down mid-run.
    handle.shutdown();
    coordinator.await.unwrap().unwrap();
    d1_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn registration_retries_until_the_coordinator_listens() {
    let fan_in = FanIn::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let fan_out = FanOut::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let fan_in_addr = fan_in.local_addr();
    let fan_out_addr = fan_out.local_addr();

    // The participant comes up long before the coordinator's event
    // loop and keeps re-sending `hello`.
    let hooks = GatedHooks::new();
    let (participant, mut d1) = Participant::new(
        participant_settings("d1", fan_in_addr, fan_out_addr),
        hooks,
    );
    let d1_task = tokio::spawn(participant.run());
    sleep(Duration::from_millis(200)).await;

    let plan = ChainPlan::default();
    let (service, handle) =
        CoordinatorService::new(fan_in, fan_out, Box::new(plan), run_settings());
    let coordinator = tokio::spawn(service.run());

    d1.wait_until_registered().await.unwrap();
    // The repeated `hello`s must not duplicate the roster entry.
    assert_eq!(handle.events().device_count(), 1);

    handle.shutdown();
    coordinator.await.unwrap().unwrap();
    d1_task.await.unwrap().unwrap();
}
